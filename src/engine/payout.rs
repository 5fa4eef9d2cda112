use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::round2;
use crate::engine::settings::{ensure_non_negative, SettingsStore, Validate};
use crate::error::AppError;
use crate::models::fare::CourierPayment;
use crate::models::payout::{
    CourierEarnings, EarningsSummary, PayoutDetail, PayoutReport, ReportPeriod,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayoutSettings {
    pub minimum_payout_amount: f64,
    pub payout_processing_fee: f64,
    pub weekly_payout_day: Weekday,
}

impl Default for PayoutSettings {
    fn default() -> Self {
        Self {
            minimum_payout_amount: 25.00,
            payout_processing_fee: 1.50,
            weekly_payout_day: Weekday::Sun,
        }
    }
}

impl Validate for PayoutSettings {
    const KIND: &'static str = "payout";

    fn validate(&self) -> Result<(), AppError> {
        ensure_non_negative("minimum_payout_amount", self.minimum_payout_amount)?;
        ensure_non_negative("payout_processing_fee", self.payout_processing_fee)?;
        if self.minimum_payout_amount < self.payout_processing_fee {
            return Err(AppError::Configuration(format!(
                "minimum_payout_amount ({:.2}) must cover payout_processing_fee ({:.2})",
                self.minimum_payout_amount, self.payout_processing_fee
            )));
        }
        Ok(())
    }
}

pub struct PayoutAggregator {
    settings: SettingsStore<PayoutSettings>,
}

impl PayoutAggregator {
    pub fn new(settings: PayoutSettings) -> Result<Self, AppError> {
        Ok(Self {
            settings: SettingsStore::new(settings)?,
        })
    }

    pub fn settings(&self) -> PayoutSettings {
        self.settings.snapshot().as_ref().clone()
    }

    pub fn update_settings(&self, next: PayoutSettings) -> Result<PayoutSettings, AppError> {
        Ok(self.settings.replace(next)?.as_ref().clone())
    }

    pub fn generate_report(
        &self,
        earnings: &[CourierEarnings],
        period: ReportPeriod,
        generated_at: DateTime<Utc>,
    ) -> Result<PayoutReport, AppError> {
        if period.end < period.start {
            return Err(AppError::InvalidInput(format!(
                "report period ends ({}) before it starts ({})",
                period.end, period.start
            )));
        }

        let settings = self.settings.snapshot();
        let mut total_payouts = 0.0;
        let mut eligible_couriers = 0usize;
        let mut payout_details = Vec::with_capacity(earnings.len());

        for courier in earnings {
            ensure_amount(&courier.courier_id, "weekly_earnings", courier.weekly_earnings)?;
            ensure_amount(&courier.courier_id, "efficiency_bonus", courier.efficiency_bonus)?;

            let total_earnings = courier.weekly_earnings + courier.efficiency_bonus;
            let is_eligible = total_earnings >= settings.minimum_payout_amount;

            let (processing_fee, payout_amount, reason) = if is_eligible {
                eligible_couriers += 1;
                let payout = total_earnings - settings.payout_processing_fee;
                total_payouts += payout;
                (settings.payout_processing_fee, round2(payout), None)
            } else {
                (
                    0.0,
                    0.0,
                    Some(format!(
                        "Below minimum payout threshold (£{:.2})",
                        settings.minimum_payout_amount
                    )),
                )
            };

            payout_details.push(PayoutDetail {
                courier_id: courier.courier_id.clone(),
                courier_name: courier.courier_name.clone(),
                bank_account: courier.bank_account.clone(),
                weekly_earnings: round2(courier.weekly_earnings),
                efficiency_bonus: round2(courier.efficiency_bonus),
                total_earnings: round2(total_earnings),
                processing_fee,
                payout_amount,
                is_eligible,
                reason,
            });
        }

        let report = PayoutReport {
            report_period: period.label(),
            total_couriers: earnings.len(),
            eligible_couriers,
            total_payouts: round2(total_payouts),
            processing_fees: round2(eligible_couriers as f64 * settings.payout_processing_fee),
            minimum_payout_threshold: settings.minimum_payout_amount,
            payout_details,
            generated_at,
        };

        info!(
            period = %report.report_period,
            total_couriers = report.total_couriers,
            eligible_couriers = report.eligible_couriers,
            total_payouts = report.total_payouts,
            "payout report generated"
        );

        Ok(report)
    }

    pub fn next_payout_date(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        next_payout_date(self.settings.snapshot().weekly_payout_day, from)
    }
}

/// Next payout weekday strictly after `from`'s date, at 09:00:00 UTC. A reference on
/// the payout day itself rolls over to the following week.
pub fn next_payout_date(payout_day: Weekday, from: DateTime<Utc>) -> DateTime<Utc> {
    let today = from.weekday().num_days_from_monday() as i64;
    let target = payout_day.num_days_from_monday() as i64;

    let mut days_ahead = (target - today).rem_euclid(7);
    if days_ahead == 0 {
        days_ahead = 7;
    }

    let date = from.date_naive() + Duration::days(days_ahead);
    date.and_time(NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default())
        .and_utc()
}

pub fn summarize_earnings(
    courier_id: &str,
    period: ReportPeriod,
    payments: &[CourierPayment],
) -> EarningsSummary {
    let mut summary = EarningsSummary {
        courier_id: courier_id.to_string(),
        period: period.label(),
        total_deliveries: payments.len(),
        base_payments: 0.0,
        distance_payments: 0.0,
        time_payments: 0.0,
        efficiency_bonuses: 0.0,
        peak_hour_bonuses: 0.0,
        weather_bonuses: 0.0,
        long_distance_bonuses: 0.0,
        total_earnings: 0.0,
        average_per_delivery: 0.0,
    };

    for payment in payments {
        summary.base_payments += payment.base_payment;
        summary.distance_payments += payment.distance_payment;
        summary.time_payments += payment.time_payment;
        summary.efficiency_bonuses += payment.efficiency_bonus;
        summary.peak_hour_bonuses += payment.peak_hour_bonus;
        summary.weather_bonuses += payment.weather_bonus;
        summary.long_distance_bonuses += payment.long_distance_bonus;
        summary.total_earnings += payment.total_payment;
    }

    if !payments.is_empty() {
        summary.average_per_delivery = summary.total_earnings / payments.len() as f64;
    }

    summary.base_payments = round2(summary.base_payments);
    summary.distance_payments = round2(summary.distance_payments);
    summary.time_payments = round2(summary.time_payments);
    summary.efficiency_bonuses = round2(summary.efficiency_bonuses);
    summary.peak_hour_bonuses = round2(summary.peak_hour_bonuses);
    summary.weather_bonuses = round2(summary.weather_bonuses);
    summary.long_distance_bonuses = round2(summary.long_distance_bonuses);
    summary.total_earnings = round2(summary.total_earnings);
    summary.average_per_delivery = round2(summary.average_per_delivery);
    summary
}

fn ensure_amount(courier_id: &str, field: &str, value: f64) -> Result<(), AppError> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::InvalidInput(format!(
            "{field} for courier {courier_id} must be a finite value >= 0, got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, NaiveDate, TimeZone, Timelike, Utc, Weekday};

    use super::{next_payout_date, summarize_earnings, PayoutAggregator, PayoutSettings};
    use crate::engine::fare::{courier_payment, FareRates};
    use crate::engine::time::Weather;
    use crate::error::AppError;
    use crate::models::payout::{BankAccount, CourierEarnings, ReportPeriod};

    fn period() -> ReportPeriod {
        ReportPeriod {
            start: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 3, 8).unwrap(),
        }
    }

    fn earnings(id: &str, weekly: f64, bonus: f64) -> CourierEarnings {
        CourierEarnings {
            courier_id: id.to_string(),
            courier_name: format!("Courier {id}"),
            bank_account: Some(BankAccount {
                account_holder: format!("Courier {id}"),
                account_number: "12345678".to_string(),
                sort_code: "12-34-56".to_string(),
                bank_name: "Test Bank".to_string(),
            }),
            weekly_earnings: weekly,
            efficiency_bonus: bonus,
        }
    }

    #[test]
    fn below_threshold_courier_is_not_paid() {
        let aggregator = PayoutAggregator::new(PayoutSettings::default()).unwrap();
        let report = aggregator
            .generate_report(&[earnings("a", 20.00, 3.00)], period(), Utc::now())
            .unwrap();

        let detail = &report.payout_details[0];
        assert_eq!(detail.total_earnings, 23.00);
        assert!(!detail.is_eligible);
        assert_eq!(detail.payout_amount, 0.0);
        assert_eq!(detail.processing_fee, 0.0);
        assert_eq!(
            detail.reason.as_deref(),
            Some("Below minimum payout threshold (£25.00)")
        );
        assert_eq!(report.eligible_couriers, 0);
        assert_eq!(report.total_payouts, 0.0);
        assert_eq!(report.processing_fees, 0.0);
    }

    #[test]
    fn eligible_couriers_are_paid_net_of_fee() {
        let aggregator = PayoutAggregator::new(PayoutSettings::default()).unwrap();
        let report = aggregator
            .generate_report(
                &[
                    earnings("a", 120.40, 10.00),
                    earnings("b", 25.00, 0.0),
                    earnings("c", 10.00, 2.00),
                ],
                period(),
                Utc::now(),
            )
            .unwrap();

        assert_eq!(report.report_period, "2026-03-02 to 2026-03-08");
        assert_eq!(report.total_couriers, 3);
        assert_eq!(report.eligible_couriers, 2);
        assert_eq!(report.payout_details[0].payout_amount, 128.90);
        assert_eq!(report.payout_details[1].payout_amount, 23.50);
        assert!(report.payout_details[1].is_eligible);
        assert_eq!(report.total_payouts, 152.40);
        assert_eq!(report.processing_fees, 3.00);
        assert_eq!(report.minimum_payout_threshold, 25.00);
    }

    #[test]
    fn fee_above_minimum_payout_is_rejected() {
        let err = PayoutAggregator::new(PayoutSettings {
            minimum_payout_amount: 0.0,
            payout_processing_fee: 1.50,
            ..PayoutSettings::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, AppError::Configuration(_)));

        let aggregator = PayoutAggregator::new(PayoutSettings::default()).unwrap();
        let err = aggregator
            .update_settings(PayoutSettings {
                minimum_payout_amount: 1.00,
                payout_processing_fee: 1.50,
                ..PayoutSettings::default()
            })
            .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert_eq!(aggregator.settings(), PayoutSettings::default());
    }

    #[test]
    fn payout_at_minimum_equal_to_fee_is_never_negative() {
        let aggregator = PayoutAggregator::new(PayoutSettings {
            minimum_payout_amount: 1.50,
            payout_processing_fee: 1.50,
            ..PayoutSettings::default()
        })
        .unwrap();
        let report = aggregator
            .generate_report(
                &[earnings("a", 0.50, 0.0), earnings("b", 1.50, 0.0)],
                period(),
                Utc::now(),
            )
            .unwrap();

        assert!(!report.payout_details[0].is_eligible);
        assert_eq!(report.payout_details[0].payout_amount, 0.0);
        assert!(report.payout_details[1].is_eligible);
        assert_eq!(report.payout_details[1].payout_amount, 0.0);
        assert_eq!(report.total_payouts, 0.0);
    }

    #[test]
    fn negative_earnings_and_inverted_periods_are_rejected() {
        let aggregator = PayoutAggregator::new(PayoutSettings::default()).unwrap();
        assert!(matches!(
            aggregator.generate_report(&[earnings("a", -1.0, 0.0)], period(), Utc::now()),
            Err(AppError::InvalidInput(_))
        ));

        let inverted = ReportPeriod {
            start: period().end,
            end: period().start,
        };
        assert!(aggregator.generate_report(&[], inverted, Utc::now()).is_err());
    }

    #[test]
    fn next_payout_is_strictly_in_the_future() {
        // 2026-03-04 is a Wednesday.
        let wednesday = Utc.with_ymd_and_hms(2026, 3, 4, 15, 45, 12).unwrap();
        let next = next_payout_date(Weekday::Sun, wednesday);
        assert_eq!(next.date_naive(), NaiveDate::from_ymd_opt(2026, 3, 8).unwrap());
        assert_eq!((next.hour(), next.minute(), next.second()), (9, 0, 0));

        let sunday_morning = Utc.with_ymd_and_hms(2026, 3, 8, 7, 0, 0).unwrap();
        let next = next_payout_date(Weekday::Sun, sunday_morning);
        assert_eq!(next.date_naive(), NaiveDate::from_ymd_opt(2026, 3, 15).unwrap());
        assert_eq!(next.weekday(), Weekday::Sun);

        let next = next_payout_date(Weekday::Mon, wednesday);
        assert_eq!(next.date_naive(), NaiveDate::from_ymd_opt(2026, 3, 9).unwrap());
    }

    #[test]
    fn earnings_summary_totals_components() {
        let rates = FareRates::default();
        let payments = vec![
            courier_payment(&rates, 6.0, 25, 80.0, true, Weather::Rain).unwrap(),
            courier_payment(&rates, 2.0, 12, 50.0, false, Weather::Normal).unwrap(),
        ];

        let summary = summarize_earnings("a", period(), &payments);
        assert_eq!(summary.total_deliveries, 2);
        assert_eq!(summary.base_payments, 7.00);
        assert_eq!(summary.total_earnings, 26.05);
        assert!((summary.average_per_delivery - 13.025).abs() <= 0.005 + 1e-9);

        let empty = summarize_earnings("a", period(), &[]);
        assert_eq!(empty.total_deliveries, 0);
        assert_eq!(empty.average_per_delivery, 0.0);
    }
}
