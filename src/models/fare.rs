use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::courier::GeoPoint;

fn default_weather() -> String {
    "normal".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FareQuoteInputs {
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub efficiency_percentage: f64,
    pub order_value: f64,
    #[serde(default)]
    pub is_peak_hour: Option<bool>,
    #[serde(default = "default_weather")]
    pub weather: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourierRateBreakdown {
    pub base_rate: f64,
    pub distance_rate_per_km: f64,
    pub time_rate_per_minute: f64,
    pub efficiency_threshold: f64,
    pub efficiency_bonus_rate: f64,
    pub peak_hour_bonus_rate: f64,
    pub weather_bonus_rate: f64,
    pub long_distance_bonus_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourierPayment {
    pub base_payment: f64,
    pub distance_payment: f64,
    pub time_payment: f64,
    pub efficiency_bonus: f64,
    pub peak_hour_bonus: f64,
    pub weather_bonus: f64,
    pub long_distance_bonus: f64,
    pub total_payment: f64,
    pub breakdown: CourierRateBreakdown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerRateBreakdown {
    pub base_fee: f64,
    pub distance_rate_per_km: f64,
    pub time_rate_per_minute: f64,
    pub profit_margin_multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerCharge {
    pub base_fee: f64,
    pub distance_charge: f64,
    pub time_charge: f64,
    pub peak_hour_surcharge: f64,
    pub weather_surcharge: f64,
    pub long_distance_surcharge: f64,
    pub subtotal: f64,
    pub profit_margin: f64,
    pub total_charge: f64,
    pub breakdown: CustomerRateBreakdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FareQuote {
    pub courier_payment: CourierPayment,
    pub customer_charge: CustomerCharge,
    pub distance_km: f64,
    pub estimated_delivery_minutes: u32,
    pub is_peak_hour: bool,
    pub weather: String,
    pub order_value: f64,
    pub calculated_at: DateTime<Utc>,
}
