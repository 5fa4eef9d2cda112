use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BankAccount {
    pub account_holder: String,
    pub account_number: String,
    pub sort_code: String,
    pub bank_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierEarnings {
    pub courier_id: String,
    #[serde(default)]
    pub courier_name: String,
    #[serde(default)]
    pub bank_account: Option<BankAccount>,
    pub weekly_earnings: f64,
    #[serde(default)]
    pub efficiency_bonus: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportPeriod {
    pub fn label(&self) -> String {
        format!(
            "{} to {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutDetail {
    pub courier_id: String,
    pub courier_name: String,
    pub bank_account: Option<BankAccount>,
    pub weekly_earnings: f64,
    pub efficiency_bonus: f64,
    pub total_earnings: f64,
    pub processing_fee: f64,
    pub payout_amount: f64,
    pub is_eligible: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutReport {
    pub report_period: String,
    pub total_couriers: usize,
    pub eligible_couriers: usize,
    pub total_payouts: f64,
    pub processing_fees: f64,
    pub minimum_payout_threshold: f64,
    pub payout_details: Vec<PayoutDetail>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EarningsSummary {
    pub courier_id: String,
    pub period: String,
    pub total_deliveries: usize,
    pub base_payments: f64,
    pub distance_payments: f64,
    pub time_payments: f64,
    pub efficiency_bonuses: f64,
    pub peak_hour_bonuses: f64,
    pub weather_bonuses: f64,
    pub long_distance_bonuses: f64,
    pub total_earnings: f64,
    pub average_per_delivery: f64,
}
