use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

const PICKUP_MINUTES: f64 = 5.0;
const HANDOFF_MINUTES: f64 = 3.0;
const TRAVEL_MINUTES_PER_KM: f64 = 2.0;
const PEAK_HOUR_MULTIPLIER: f64 = 1.20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Weather {
    Normal,
    Rain,
    Snow,
    Storm,
}

impl Weather {
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "rain" => Weather::Rain,
            "snow" => Weather::Snow,
            "storm" => Weather::Storm,
            _ => Weather::Normal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Weather::Normal => "normal",
            Weather::Rain => "rain",
            Weather::Snow => "snow",
            Weather::Storm => "storm",
        }
    }

    pub fn is_adverse(&self) -> bool {
        !matches!(self, Weather::Normal)
    }

    pub fn time_multiplier(&self) -> f64 {
        match self {
            Weather::Normal => 1.00,
            Weather::Rain => 1.15,
            Weather::Snow => 1.30,
            Weather::Storm => 1.40,
        }
    }
}

/// Lunch (11:00-14:59) and dinner (17:00-20:59) windows, by UTC hour.
pub fn is_peak_hour(at: DateTime<Utc>) -> bool {
    let hour = at.hour();
    (11..=14).contains(&hour) || (17..=20).contains(&hour)
}

/// Multipliers compound: base, then peak, then weather, then rounding (ties to even).
pub fn estimate_delivery_minutes(
    distance_km: f64,
    is_peak_hour: bool,
    weather: Weather,
) -> Result<u32, AppError> {
    ensure_distance(distance_km)?;

    let mut minutes = PICKUP_MINUTES + TRAVEL_MINUTES_PER_KM * distance_km + HANDOFF_MINUTES;
    if is_peak_hour {
        minutes *= PEAK_HOUR_MULTIPLIER;
    }
    minutes *= weather.time_multiplier();

    let rounded = minutes.round_ties_even();
    if rounded > u32::MAX as f64 {
        return Err(AppError::InvalidInput(format!(
            "distance {distance_km} km yields an unrepresentable duration"
        )));
    }

    Ok(rounded as u32)
}

pub(crate) fn ensure_distance(distance_km: f64) -> Result<(), AppError> {
    if !distance_km.is_finite() || distance_km < 0.0 {
        return Err(AppError::InvalidInput(format!(
            "distance must be a finite value >= 0, got {distance_km}"
        )));
    }
    Ok(())
}
