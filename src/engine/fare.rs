use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::round2;
use crate::engine::settings::{ensure_non_negative, ensure_percentage, SettingsStore, Validate};
use crate::engine::time::{ensure_distance, estimate_delivery_minutes, is_peak_hour, Weather};
use crate::error::AppError;
use crate::geo::estimate_distance;
use crate::models::fare::{
    CourierPayment, CourierRateBreakdown, CustomerCharge, CustomerRateBreakdown, FareQuote,
    FareQuoteInputs,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FareRates {
    pub base_delivery_rate: f64,
    pub distance_rate_per_km: f64,
    pub time_rate_per_minute: f64,
    pub efficiency_bonus_threshold: f64,
    pub efficiency_bonus_rate: f64,
    pub peak_hour_bonus_rate: f64,
    pub weather_bonus_rate: f64,
    pub long_distance_bonus_rate: f64,
    pub long_distance_threshold_km: f64,

    pub customer_base_fee: f64,
    pub customer_distance_rate: f64,
    pub customer_time_rate: f64,
    pub peak_hour_surcharge_rate: f64,
    pub weather_surcharge_rate: f64,
    pub long_distance_surcharge_rate: f64,
    pub profit_margin_multiplier: f64,
}

impl Default for FareRates {
    fn default() -> Self {
        Self {
            base_delivery_rate: 3.50,
            distance_rate_per_km: 0.75,
            time_rate_per_minute: 0.15,
            efficiency_bonus_threshold: 70.0,
            efficiency_bonus_rate: 0.25,
            peak_hour_bonus_rate: 0.20,
            weather_bonus_rate: 0.15,
            long_distance_bonus_rate: 0.10,
            long_distance_threshold_km: 5.0,

            customer_base_fee: 2.99,
            customer_distance_rate: 0.50,
            customer_time_rate: 0.10,
            peak_hour_surcharge_rate: 0.15,
            weather_surcharge_rate: 0.10,
            long_distance_surcharge_rate: 0.05,
            profit_margin_multiplier: 1.35,
        }
    }
}

impl Validate for FareRates {
    const KIND: &'static str = "fare_rates";

    fn validate(&self) -> Result<(), AppError> {
        ensure_non_negative("base_delivery_rate", self.base_delivery_rate)?;
        ensure_non_negative("distance_rate_per_km", self.distance_rate_per_km)?;
        ensure_non_negative("time_rate_per_minute", self.time_rate_per_minute)?;
        ensure_percentage("efficiency_bonus_threshold", self.efficiency_bonus_threshold)?;
        ensure_non_negative("efficiency_bonus_rate", self.efficiency_bonus_rate)?;
        ensure_non_negative("peak_hour_bonus_rate", self.peak_hour_bonus_rate)?;
        ensure_non_negative("weather_bonus_rate", self.weather_bonus_rate)?;
        ensure_non_negative("long_distance_bonus_rate", self.long_distance_bonus_rate)?;
        ensure_non_negative("long_distance_threshold_km", self.long_distance_threshold_km)?;

        ensure_non_negative("customer_base_fee", self.customer_base_fee)?;
        ensure_non_negative("customer_distance_rate", self.customer_distance_rate)?;
        ensure_non_negative("customer_time_rate", self.customer_time_rate)?;
        ensure_non_negative("peak_hour_surcharge_rate", self.peak_hour_surcharge_rate)?;
        ensure_non_negative("weather_surcharge_rate", self.weather_surcharge_rate)?;
        ensure_non_negative(
            "long_distance_surcharge_rate",
            self.long_distance_surcharge_rate,
        )?;

        if !self.profit_margin_multiplier.is_finite() || self.profit_margin_multiplier < 1.0 {
            return Err(AppError::Configuration(format!(
                "profit_margin_multiplier must be >= 1.0, got {}",
                self.profit_margin_multiplier
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FareRatesPatch {
    pub base_delivery_rate: Option<f64>,
    pub distance_rate_per_km: Option<f64>,
    pub time_rate_per_minute: Option<f64>,
    pub efficiency_bonus_threshold: Option<f64>,
    pub efficiency_bonus_rate: Option<f64>,
    pub customer_base_fee: Option<f64>,
    pub customer_distance_rate: Option<f64>,
    pub customer_time_rate: Option<f64>,
    pub profit_margin_multiplier: Option<f64>,
}

impl FareRatesPatch {
    pub fn apply(&self, current: &FareRates) -> FareRates {
        FareRates {
            base_delivery_rate: self.base_delivery_rate.unwrap_or(current.base_delivery_rate),
            distance_rate_per_km: self
                .distance_rate_per_km
                .unwrap_or(current.distance_rate_per_km),
            time_rate_per_minute: self
                .time_rate_per_minute
                .unwrap_or(current.time_rate_per_minute),
            efficiency_bonus_threshold: self
                .efficiency_bonus_threshold
                .unwrap_or(current.efficiency_bonus_threshold),
            efficiency_bonus_rate: self
                .efficiency_bonus_rate
                .unwrap_or(current.efficiency_bonus_rate),
            customer_base_fee: self.customer_base_fee.unwrap_or(current.customer_base_fee),
            customer_distance_rate: self
                .customer_distance_rate
                .unwrap_or(current.customer_distance_rate),
            customer_time_rate: self.customer_time_rate.unwrap_or(current.customer_time_rate),
            profit_margin_multiplier: self
                .profit_margin_multiplier
                .unwrap_or(current.profit_margin_multiplier),
            ..current.clone()
        }
    }
}

/// Courier payout for one delivery.
///
/// Every bonus is a percentage of the same base+distance+time subtotal, so bonuses
/// never compound on each other. The long-distance bonus applies strictly above the
/// threshold and only to the distance component.
pub fn courier_payment(
    rates: &FareRates,
    distance_km: f64,
    delivery_minutes: u32,
    efficiency_percentage: f64,
    is_peak_hour: bool,
    weather: Weather,
) -> Result<CourierPayment, AppError> {
    ensure_distance(distance_km)?;
    ensure_efficiency(efficiency_percentage)?;

    let base_payment = rates.base_delivery_rate;
    let distance_payment = distance_km * rates.distance_rate_per_km;
    let time_payment = f64::from(delivery_minutes) * rates.time_rate_per_minute;
    let subtotal = base_payment + distance_payment + time_payment;

    let efficiency_bonus = if efficiency_percentage >= rates.efficiency_bonus_threshold {
        subtotal * rates.efficiency_bonus_rate
    } else {
        0.0
    };
    let peak_hour_bonus = if is_peak_hour {
        subtotal * rates.peak_hour_bonus_rate
    } else {
        0.0
    };
    let weather_bonus = if weather.is_adverse() {
        subtotal * rates.weather_bonus_rate
    } else {
        0.0
    };
    let long_distance_bonus = if distance_km > rates.long_distance_threshold_km {
        distance_payment * rates.long_distance_bonus_rate
    } else {
        0.0
    };

    let total_payment = subtotal
        + efficiency_bonus
        + peak_hour_bonus
        + weather_bonus
        + long_distance_bonus;

    Ok(CourierPayment {
        base_payment: round2(base_payment),
        distance_payment: round2(distance_payment),
        time_payment: round2(time_payment),
        efficiency_bonus: round2(efficiency_bonus),
        peak_hour_bonus: round2(peak_hour_bonus),
        weather_bonus: round2(weather_bonus),
        long_distance_bonus: round2(long_distance_bonus),
        total_payment: round2(total_payment),
        breakdown: CourierRateBreakdown {
            base_rate: rates.base_delivery_rate,
            distance_rate_per_km: rates.distance_rate_per_km,
            time_rate_per_minute: rates.time_rate_per_minute,
            efficiency_threshold: rates.efficiency_bonus_threshold,
            efficiency_bonus_rate: rates.efficiency_bonus_rate,
            peak_hour_bonus_rate: rates.peak_hour_bonus_rate,
            weather_bonus_rate: rates.weather_bonus_rate,
            long_distance_bonus_rate: rates.long_distance_bonus_rate,
        },
    })
}

pub fn customer_charge(
    rates: &FareRates,
    distance_km: f64,
    delivery_minutes: u32,
    is_peak_hour: bool,
    weather: Weather,
) -> Result<CustomerCharge, AppError> {
    ensure_distance(distance_km)?;

    let base_fee = rates.customer_base_fee;
    let distance_charge = distance_km * rates.customer_distance_rate;
    let time_charge = f64::from(delivery_minutes) * rates.customer_time_rate;
    let core = base_fee + distance_charge + time_charge;

    let peak_hour_surcharge = if is_peak_hour {
        core * rates.peak_hour_surcharge_rate
    } else {
        0.0
    };
    let weather_surcharge = if weather.is_adverse() {
        core * rates.weather_surcharge_rate
    } else {
        0.0
    };
    let long_distance_surcharge = if distance_km > rates.long_distance_threshold_km {
        distance_charge * rates.long_distance_surcharge_rate
    } else {
        0.0
    };

    let subtotal = core + peak_hour_surcharge + weather_surcharge + long_distance_surcharge;
    let total_charge = round2(subtotal * rates.profit_margin_multiplier);

    Ok(CustomerCharge {
        base_fee: round2(base_fee),
        distance_charge: round2(distance_charge),
        time_charge: round2(time_charge),
        peak_hour_surcharge: round2(peak_hour_surcharge),
        weather_surcharge: round2(weather_surcharge),
        long_distance_surcharge: round2(long_distance_surcharge),
        subtotal: round2(subtotal),
        profit_margin: round2(total_charge - subtotal),
        total_charge,
        breakdown: CustomerRateBreakdown {
            base_fee: rates.customer_base_fee,
            distance_rate_per_km: rates.customer_distance_rate,
            time_rate_per_minute: rates.customer_time_rate,
            profit_margin_multiplier: rates.profit_margin_multiplier,
        },
    })
}

fn ensure_efficiency(efficiency_percentage: f64) -> Result<(), AppError> {
    if !efficiency_percentage.is_finite() || !(0.0..=100.0).contains(&efficiency_percentage) {
        return Err(AppError::InvalidInput(format!(
            "efficiency percentage must be within [0, 100], got {efficiency_percentage}"
        )));
    }
    Ok(())
}

pub struct FareEngine {
    rates: SettingsStore<FareRates>,
}

impl FareEngine {
    pub fn new(rates: FareRates) -> Result<Self, AppError> {
        Ok(Self {
            rates: SettingsStore::new(rates)?,
        })
    }

    pub fn rates(&self) -> FareRates {
        self.rates.snapshot().as_ref().clone()
    }

    pub fn replace_rates(&self, rates: FareRates) -> Result<FareRates, AppError> {
        Ok(self.rates.replace(rates)?.as_ref().clone())
    }

    pub fn update_rates(&self, patch: &FareRatesPatch) -> Result<FareRates, AppError> {
        Ok(self.rates.update(|current| patch.apply(current))?.as_ref().clone())
    }

    pub fn quote(
        &self,
        inputs: &FareQuoteInputs,
        now: DateTime<Utc>,
    ) -> Result<FareQuote, AppError> {
        if !inputs.order_value.is_finite() || inputs.order_value < 0.0 {
            return Err(AppError::InvalidInput(format!(
                "order value must be a finite value >= 0, got {}",
                inputs.order_value
            )));
        }

        let rates = self.rates.snapshot();
        let weather = Weather::from_tag(&inputs.weather);
        let peak = inputs.is_peak_hour.unwrap_or_else(|| is_peak_hour(now));

        let distance_km = estimate_distance(&inputs.pickup, &inputs.dropoff)?;
        let minutes = estimate_delivery_minutes(distance_km, peak, weather)?;

        let courier_payment = courier_payment(
            &rates,
            distance_km,
            minutes,
            inputs.efficiency_percentage,
            peak,
            weather,
        )?;
        let customer_charge = customer_charge(&rates, distance_km, minutes, peak, weather)?;

        debug!(
            distance_km,
            minutes,
            courier_total = courier_payment.total_payment,
            customer_total = customer_charge.total_charge,
            "fare quoted"
        );

        Ok(FareQuote {
            courier_payment,
            customer_charge,
            distance_km,
            estimated_delivery_minutes: minutes,
            is_peak_hour: peak,
            weather: weather.as_str().to_string(),
            order_value: inputs.order_value,
            calculated_at: now,
        })
    }

    pub fn efficiency_bonus(&self, efficiency_percentage: f64, base_payment: f64) -> f64 {
        let rates = self.rates.snapshot();
        if efficiency_percentage >= rates.efficiency_bonus_threshold {
            round2(base_payment * rates.efficiency_bonus_rate)
        } else {
            0.0
        }
    }
}
