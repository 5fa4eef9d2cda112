use std::env;

use crate::engine::fare::FareRates;
use crate::engine::payout::PayoutSettings;
use crate::engine::priority::{PrioritySettings, TieBreak};
use crate::engine::settings::Validate;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub ranking_seed: Option<u64>,
    pub priority: PrioritySettings,
    pub fares: FareRates,
    pub payouts: PayoutSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let priority_defaults = PrioritySettings::default();
        let fare_defaults = FareRates::default();
        let payout_defaults = PayoutSettings::default();

        let config = Self {
            http_port: parse_or_default(&lookup, "HTTP_PORT", 3000)?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            ranking_seed: parse_optional(&lookup, "RANKING_SEED")?,
            priority: PrioritySettings {
                points_per_acceptance: parse_or_default(
                    &lookup,
                    "POINTS_PER_ACCEPTANCE",
                    priority_defaults.points_per_acceptance,
                )?,
                points_per_penalized_rejection: parse_or_default(
                    &lookup,
                    "POINTS_PER_PENALIZED_REJECTION",
                    priority_defaults.points_per_penalized_rejection,
                )?,
                efficiency_threshold_for_bonus: parse_or_default(
                    &lookup,
                    "EFFICIENCY_THRESHOLD_FOR_BONUS",
                    priority_defaults.efficiency_threshold_for_bonus,
                )?,
                bonus_amount_per_order: parse_or_default(
                    &lookup,
                    "BONUS_AMOUNT_PER_ORDER",
                    priority_defaults.bonus_amount_per_order,
                )?,
                preparation_grace_period_minutes: parse_or_default(
                    &lookup,
                    "GRACE_PERIOD_MINUTES",
                    priority_defaults.preparation_grace_period_minutes,
                )?,
            },
            fares: FareRates {
                base_delivery_rate: parse_or_default(
                    &lookup,
                    "BASE_DELIVERY_RATE",
                    fare_defaults.base_delivery_rate,
                )?,
                distance_rate_per_km: parse_or_default(
                    &lookup,
                    "DISTANCE_RATE_PER_KM",
                    fare_defaults.distance_rate_per_km,
                )?,
                time_rate_per_minute: parse_or_default(
                    &lookup,
                    "TIME_RATE_PER_MINUTE",
                    fare_defaults.time_rate_per_minute,
                )?,
                customer_base_fee: parse_or_default(
                    &lookup,
                    "CUSTOMER_BASE_FEE",
                    fare_defaults.customer_base_fee,
                )?,
                profit_margin_multiplier: parse_or_default(
                    &lookup,
                    "PROFIT_MARGIN_MULTIPLIER",
                    fare_defaults.profit_margin_multiplier,
                )?,
                ..fare_defaults
            },
            payouts: PayoutSettings {
                minimum_payout_amount: parse_or_default(
                    &lookup,
                    "MIN_PAYOUT_AMOUNT",
                    payout_defaults.minimum_payout_amount,
                )?,
                payout_processing_fee: parse_or_default(
                    &lookup,
                    "PAYOUT_PROCESSING_FEE",
                    payout_defaults.payout_processing_fee,
                )?,
                weekly_payout_day: parse_or_default(
                    &lookup,
                    "PAYOUT_WEEKDAY",
                    payout_defaults.weekly_payout_day,
                )?,
            },
        };

        config.priority.validate()?;
        config.fares.validate()?;
        config.payouts.validate()?;

        Ok(config)
    }

    pub fn tie_break(&self) -> TieBreak {
        match self.ranking_seed {
            Some(seed) => TieBreak::Seeded(seed),
            None => TieBreak::Entropy,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            ranking_seed: None,
            priority: PrioritySettings::default(),
            fares: FareRates::default(),
            payouts: PayoutSettings::default(),
        }
    }
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_optional(lookup, key)?.unwrap_or(default))
}

fn parse_optional<F, T>(lookup: &F, key: &str) -> Result<Option<T>, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|err| AppError::Configuration(format!("invalid {key}: {err}"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Weekday;

    use super::Config;
    use crate::engine::priority::TieBreak;
    use crate::error::AppError;

    fn load(vars: &[(&str, &str)]) -> Result<Config, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.http_port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.tie_break(), TieBreak::Entropy);
        assert_eq!(config.priority.preparation_grace_period_minutes, 10);
        assert_eq!(config.fares.profit_margin_multiplier, 1.35);
        assert_eq!(config.payouts.weekly_payout_day, Weekday::Sun);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("HTTP_PORT", "8080"),
            ("RANKING_SEED", " 42 "),
            ("GRACE_PERIOD_MINUTES", "15"),
            ("PAYOUT_WEEKDAY", "Fri"),
            ("MIN_PAYOUT_AMOUNT", "30"),
        ])
        .unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.tie_break(), TieBreak::Seeded(42));
        assert_eq!(config.priority.preparation_grace_period_minutes, 15);
        assert_eq!(config.payouts.weekly_payout_day, Weekday::Fri);
        assert_eq!(config.payouts.minimum_payout_amount, 30.0);
    }

    #[test]
    fn unparseable_values_stop_startup() {
        for (key, value) in [
            ("PAYOUT_WEEKDAY", "funday"),
            ("HTTP_PORT", "eighty"),
            ("RANKING_SEED", "-1"),
            ("POINTS_PER_ACCEPTANCE", "2.5"),
        ] {
            let err = load(&[(key, value)]).unwrap_err();
            assert!(matches!(err, AppError::Configuration(ref msg) if msg.contains(key)));
        }
    }

    #[test]
    fn out_of_range_values_stop_startup() {
        for (key, value) in [
            ("PROFIT_MARGIN_MULTIPLIER", "0.5"),
            ("EFFICIENCY_THRESHOLD_FOR_BONUS", "150"),
            ("POINTS_PER_PENALIZED_REJECTION", "3"),
            ("PAYOUT_PROCESSING_FEE", "-1"),
            ("MIN_PAYOUT_AMOUNT", "1.0"),
        ] {
            assert!(
                matches!(load(&[(key, value)]), Err(AppError::Configuration(_))),
                "{key}={value} should be rejected"
            );
        }
    }
}
