use std::sync::Mutex;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};

use crate::engine::settings::{ensure_non_negative, ensure_percentage, SettingsStore, Validate};
use crate::error::AppError;
use crate::models::courier::CourierEfficiencyRecord;

const BONUS_PRIORITY_POINTS: f64 = 100.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrioritySettings {
    pub points_per_acceptance: i64,
    pub points_per_penalized_rejection: i64,
    pub efficiency_threshold_for_bonus: f64,
    pub bonus_amount_per_order: f64,
    pub preparation_grace_period_minutes: u32,
}

impl Default for PrioritySettings {
    fn default() -> Self {
        Self {
            points_per_acceptance: 2,
            points_per_penalized_rejection: -5,
            efficiency_threshold_for_bonus: 70.0,
            bonus_amount_per_order: 1.0,
            preparation_grace_period_minutes: 10,
        }
    }
}

impl Validate for PrioritySettings {
    const KIND: &'static str = "priority";

    fn validate(&self) -> Result<(), AppError> {
        if self.points_per_acceptance < 0 {
            return Err(AppError::Configuration(format!(
                "points_per_acceptance must be >= 0, got {}",
                self.points_per_acceptance
            )));
        }
        if self.points_per_penalized_rejection > 0 {
            return Err(AppError::Configuration(format!(
                "points_per_penalized_rejection must be <= 0, got {}",
                self.points_per_penalized_rejection
            )));
        }
        ensure_percentage(
            "efficiency_threshold_for_bonus",
            self.efficiency_threshold_for_bonus,
        )?;
        ensure_non_negative("bonus_amount_per_order", self.bonus_amount_per_order)?;
        Ok(())
    }
}

/// How exact ties in reliability are broken when ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    Seeded(u64),
    Entropy,
    Disabled,
}

pub struct TieBreaker {
    rng: Option<Mutex<Pcg64Mcg>>,
}

impl TieBreaker {
    pub fn new(policy: TieBreak) -> Self {
        let rng = match policy {
            TieBreak::Seeded(seed) => Some(Pcg64Mcg::seed_from_u64(seed)),
            TieBreak::Entropy => Some(Pcg64Mcg::from_entropy()),
            TieBreak::Disabled => None,
        };
        Self {
            rng: rng.map(Mutex::new),
        }
    }

    pub fn next(&self) -> f64 {
        match &self.rng {
            Some(rng) => {
                let mut guard = match rng.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                guard.r#gen::<f64>()
            }
            None => 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCourier {
    pub courier_id: String,
    pub priority_score: f64,
    pub total_points: i64,
    pub efficiency_percentage: f64,
    pub bonus_eligible: bool,
}

pub fn efficiency_percentage(accepted: u64, penalized_rejections: u64) -> f64 {
    let counted = accepted as f64 + penalized_rejections as f64;
    if counted == 0.0 {
        return 100.0;
    }
    accepted as f64 / counted * 100.0
}

pub fn points_for(
    settings: &PrioritySettings,
    accepted: u64,
    penalized_rejections: u64,
) -> Result<i64, AppError> {
    let earned = scaled_points(accepted, settings.points_per_acceptance);
    let lost = scaled_points(penalized_rejections, settings.points_per_penalized_rejection);
    earned
        .zip(lost)
        .and_then(|(earned, lost)| earned.checked_add(lost))
        .ok_or_else(|| {
            AppError::InvalidInput(format!(
                "point total overflows: {accepted} accepted, {penalized_rejections} penalized"
            ))
        })
}

fn scaled_points(count: u64, per_event: i64) -> Option<i64> {
    i64::try_from(count).ok()?.checked_mul(per_event)
}

pub fn base_priority(record: &CourierEfficiencyRecord) -> f64 {
    let mut score = record.total_points as f64;
    if record.bonus_eligible {
        score += BONUS_PRIORITY_POINTS;
    }
    score
}

pub struct PriorityScorer {
    settings: SettingsStore<PrioritySettings>,
    tie_breaker: TieBreaker,
}

impl PriorityScorer {
    pub fn new(settings: PrioritySettings, tie_break: TieBreak) -> Result<Self, AppError> {
        Ok(Self {
            settings: SettingsStore::new(settings)?,
            tie_breaker: TieBreaker::new(tie_break),
        })
    }

    pub fn settings(&self) -> PrioritySettings {
        self.settings.snapshot().as_ref().clone()
    }

    pub fn snapshot(&self) -> std::sync::Arc<PrioritySettings> {
        self.settings.snapshot()
    }

    pub fn update_settings(&self, next: PrioritySettings) -> Result<PrioritySettings, AppError> {
        Ok(self.settings.replace(next)?.as_ref().clone())
    }

    pub fn priority_score(&self, record: &CourierEfficiencyRecord) -> f64 {
        base_priority(record) + self.tie_breaker.next()
    }

    pub fn rank(&self, records: &[CourierEfficiencyRecord]) -> Vec<RankedCourier> {
        let mut ranked: Vec<RankedCourier> = records
            .iter()
            .map(|record| RankedCourier {
                courier_id: record.courier_id.clone(),
                priority_score: self.priority_score(record),
                total_points: record.total_points,
                efficiency_percentage: record.efficiency_percentage,
                bonus_eligible: record.bonus_eligible,
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.priority_score
                .total_cmp(&a.priority_score)
                .then_with(|| a.courier_id.cmp(&b.courier_id))
        });
        ranked
    }
}

pub fn derive_record(
    settings: &PrioritySettings,
    record: &mut CourierEfficiencyRecord,
) -> Result<(), AppError> {
    record.total_points = points_for(
        settings,
        record.accepted_count,
        record.penalized_rejection_count,
    )?;
    refresh_efficiency(settings, record);
    Ok(())
}

pub(crate) fn refresh_efficiency(
    settings: &PrioritySettings,
    record: &mut CourierEfficiencyRecord,
) {
    record.efficiency_percentage =
        efficiency_percentage(record.accepted_count, record.penalized_rejection_count);
    record.bonus_eligible = record.efficiency_percentage >= settings.efficiency_threshold_for_bonus;
}
