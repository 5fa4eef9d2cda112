use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::engine::penalty::penalty_applies;
use crate::engine::priority::{
    derive_record, refresh_efficiency, PriorityScorer, PrioritySettings,
};
use crate::error::AppError;
use crate::models::courier::{
    ActionKind, ActionOutcome, CourierActionEvent, CourierEfficiencyRecord,
};

struct CourierEntry {
    record: CourierEfficiencyRecord,
    actions: Vec<CourierActionEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedAction {
    pub penalty_applied: bool,
    pub outcome: ActionOutcome,
    pub event: CourierActionEvent,
    pub record: CourierEfficiencyRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordAmendment {
    pub expected_version: u64,
    pub accepted_count: u64,
    pub rejected_count: u64,
    pub penalized_rejection_count: u64,
}

// Every mutation runs under the courier's entry lock.
#[derive(Default)]
pub struct EfficiencyLedger {
    couriers: DashMap<String, CourierEntry>,
}

impl EfficiencyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.couriers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.couriers.is_empty()
    }

    pub fn record_action(
        &self,
        scorer: &PriorityScorer,
        courier_id: &str,
        action: ActionKind,
        order_id: &str,
        preparation_start_time: Option<DateTime<Utc>>,
        decided_at: DateTime<Utc>,
    ) -> Result<RecordedAction, AppError> {
        ensure_id("courier_id", courier_id)?;
        ensure_id("order_id", order_id)?;

        let settings = scorer.snapshot();

        let outcome = match action {
            ActionKind::Accept => ActionOutcome::Accepted,
            ActionKind::Reject => {
                if penalty_applies(
                    preparation_start_time,
                    decided_at,
                    settings.preparation_grace_period_minutes,
                ) {
                    ActionOutcome::RejectedPenalized
                } else {
                    ActionOutcome::RejectedUnpenalized
                }
            }
        };
        let penalty_applied = outcome == ActionOutcome::RejectedPenalized;

        let event = CourierActionEvent {
            id: Uuid::new_v4(),
            courier_id: courier_id.to_string(),
            order_id: order_id.to_string(),
            action,
            outcome,
            timestamp: decided_at,
            penalty_applied,
            preparation_start_time,
        };

        let mut entry = self
            .couriers
            .entry(courier_id.to_string())
            .or_insert_with(|| CourierEntry {
                record: CourierEfficiencyRecord::new(courier_id, decided_at),
                actions: Vec::new(),
            });

        let mut record = entry.record.clone();
        apply_outcome(&settings, &mut record, outcome)?;
        refresh_efficiency(&settings, &mut record);
        record.version = bump(record.version, courier_id)?;
        record.last_updated = decided_at;

        entry.record = record.clone();
        entry.actions.push(event.clone());
        drop(entry);

        info!(
            courier_id,
            order_id,
            action = action.as_str(),
            outcome = outcome.as_str(),
            total_points = record.total_points,
            efficiency = record.efficiency_percentage,
            "courier action recorded"
        );

        Ok(RecordedAction {
            penalty_applied,
            outcome,
            event,
            record,
        })
    }

    pub fn record(&self, courier_id: &str) -> Option<CourierEfficiencyRecord> {
        self.couriers
            .get(courier_id)
            .map(|entry| entry.record.clone())
    }

    pub fn records(&self) -> Vec<CourierEfficiencyRecord> {
        self.couriers
            .iter()
            .map(|entry| entry.value().record.clone())
            .collect()
    }

    pub fn actions(&self, courier_id: &str) -> Option<Vec<CourierActionEvent>> {
        self.couriers
            .get(courier_id)
            .map(|entry| entry.actions.clone())
    }

    pub fn amend_record(
        &self,
        scorer: &PriorityScorer,
        courier_id: &str,
        amendment: &RecordAmendment,
        amended_at: DateTime<Utc>,
    ) -> Result<CourierEfficiencyRecord, AppError> {
        if amendment.penalized_rejection_count > amendment.rejected_count {
            return Err(AppError::InvalidInput(format!(
                "penalized rejections ({}) exceed rejections ({})",
                amendment.penalized_rejection_count, amendment.rejected_count
            )));
        }

        let settings = scorer.snapshot();
        let mut entry = self
            .couriers
            .get_mut(courier_id)
            .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} has no record")))?;

        let current = &entry.record;
        if current.version != amendment.expected_version {
            return Err(AppError::ConcurrencyConflict {
                courier_id: courier_id.to_string(),
                expected: amendment.expected_version,
                actual: current.version,
            });
        }

        let mut record = current.clone();
        record.accepted_count = amendment.accepted_count;
        record.rejected_count = amendment.rejected_count;
        record.penalized_rejection_count = amendment.penalized_rejection_count;
        derive_record(&settings, &mut record)?;
        record.version = bump(record.version, courier_id)?;
        record.last_updated = amended_at;

        entry.record = record.clone();
        drop(entry);

        info!(courier_id, version = record.version, "courier record amended");
        Ok(record)
    }
}

fn apply_outcome(
    settings: &PrioritySettings,
    record: &mut CourierEfficiencyRecord,
    outcome: ActionOutcome,
) -> Result<(), AppError> {
    let overflow = || {
        AppError::InvalidInput(format!(
            "counters for courier {} cannot absorb another action",
            record.courier_id
        ))
    };

    let (accepted, rejected, penalized, delta) = match outcome {
        ActionOutcome::Accepted => (1, 0, 0, settings.points_per_acceptance),
        ActionOutcome::RejectedPenalized => (0, 1, 1, settings.points_per_penalized_rejection),
        ActionOutcome::RejectedUnpenalized => (0, 1, 0, 0),
    };

    let accepted_count = record.accepted_count.checked_add(accepted).ok_or_else(overflow)?;
    let rejected_count = record.rejected_count.checked_add(rejected).ok_or_else(overflow)?;
    let penalized_rejection_count = record
        .penalized_rejection_count
        .checked_add(penalized)
        .ok_or_else(overflow)?;
    let total_points = record.total_points.checked_add(delta).ok_or_else(overflow)?;

    record.accepted_count = accepted_count;
    record.rejected_count = rejected_count;
    record.penalized_rejection_count = penalized_rejection_count;
    record.total_points = total_points;
    Ok(())
}

fn bump(version: u64, courier_id: &str) -> Result<u64, AppError> {
    version.checked_add(1).ok_or_else(|| {
        AppError::Internal(format!("version counter exhausted for courier {courier_id}"))
    })
}

fn ensure_id(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{field} cannot be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::{Duration, TimeZone, Utc};

    use super::{EfficiencyLedger, RecordAmendment};
    use crate::engine::priority::{PriorityScorer, PrioritySettings, TieBreak};
    use crate::error::AppError;
    use crate::models::courier::{ActionKind, ActionOutcome};

    fn scorer() -> PriorityScorer {
        PriorityScorer::new(PrioritySettings::default(), TieBreak::Disabled).unwrap()
    }

    #[test]
    fn first_action_creates_record() {
        let ledger = EfficiencyLedger::new();
        let now = Utc::now();

        let recorded = ledger
            .record_action(&scorer(), "c-1", ActionKind::Accept, "o-1", None, now)
            .unwrap();

        assert_eq!(recorded.outcome, ActionOutcome::Accepted);
        assert!(!recorded.penalty_applied);
        assert_eq!(recorded.record.total_points, 2);
        assert_eq!(recorded.record.accepted_count, 1);
        assert_eq!(recorded.record.version, 1);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn penalized_and_unpenalized_rejections_are_counted_separately() {
        let ledger = EfficiencyLedger::new();
        let scorer = scorer();
        let started = Utc.with_ymd_and_hms(2026, 5, 1, 18, 0, 0).unwrap();

        let late = ledger
            .record_action(
                &scorer,
                "c-1",
                ActionKind::Reject,
                "o-1",
                Some(started),
                started + Duration::minutes(10),
            )
            .unwrap();
        assert_eq!(late.outcome, ActionOutcome::RejectedUnpenalized);
        assert_eq!(late.record.total_points, 0);
        assert_eq!(late.record.efficiency_percentage, 100.0);

        let early = ledger
            .record_action(
                &scorer,
                "c-1",
                ActionKind::Reject,
                "o-2",
                Some(started),
                started + Duration::minutes(10) - Duration::seconds(1),
            )
            .unwrap();
        assert!(early.penalty_applied);
        assert_eq!(early.record.total_points, -5);
        assert_eq!(early.record.rejected_count, 2);
        assert_eq!(early.record.penalized_rejection_count, 1);
        assert_eq!(early.record.efficiency_percentage, 0.0);
        assert!(!early.record.bonus_eligible);

        let log = ledger.actions("c-1").unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].order_id, "o-1");
        assert!(log[1].penalty_applied);
    }

    #[test]
    fn rejection_without_preparation_start_is_penalized() {
        let ledger = EfficiencyLedger::new();
        let recorded = ledger
            .record_action(&scorer(), "c-1", ActionKind::Reject, "o-1", None, Utc::now())
            .unwrap();
        assert_eq!(recorded.outcome, ActionOutcome::RejectedPenalized);
    }

    #[test]
    fn empty_ids_are_rejected() {
        let ledger = EfficiencyLedger::new();
        let err = ledger
            .record_action(&scorer(), " ", ActionKind::Accept, "o-1", None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(ledger.is_empty());
    }

    #[test]
    fn racing_decisions_for_one_courier_are_not_lost() {
        let ledger = Arc::new(EfficiencyLedger::new());
        let scorer = Arc::new(scorer());

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let ledger = Arc::clone(&ledger);
                let scorer = Arc::clone(&scorer);
                thread::spawn(move || {
                    for i in 0..50 {
                        let action = if worker % 2 == 0 {
                            ActionKind::Accept
                        } else {
                            ActionKind::Reject
                        };
                        ledger
                            .record_action(
                                &scorer,
                                "shared",
                                action,
                                &format!("o-{worker}-{i}"),
                                None,
                                Utc::now(),
                            )
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let record = ledger.record("shared").unwrap();
        assert_eq!(record.accepted_count, 200);
        assert_eq!(record.penalized_rejection_count, 200);
        assert_eq!(record.total_points, 200 * 2 - 200 * 5);
        assert_eq!(record.version, 400);
        assert_eq!(record.efficiency_percentage, 50.0);
        assert_eq!(ledger.actions("shared").unwrap().len(), 400);
    }

    #[test]
    fn amendment_with_stale_version_conflicts() {
        let ledger = EfficiencyLedger::new();
        let scorer = scorer();
        ledger
            .record_action(&scorer, "c-1", ActionKind::Accept, "o-1", None, Utc::now())
            .unwrap();

        let amendment = RecordAmendment {
            expected_version: 1,
            accepted_count: 10,
            rejected_count: 3,
            penalized_rejection_count: 2,
        };
        let amended = ledger
            .amend_record(&scorer, "c-1", &amendment, Utc::now())
            .unwrap();
        assert_eq!(amended.total_points, 10);
        assert_eq!(amended.version, 2);
        assert!(amended.bonus_eligible);

        let err = ledger
            .amend_record(&scorer, "c-1", &amendment, Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::ConcurrencyConflict {
                expected: 1,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn oversized_amendment_is_rejected_and_leaves_record_intact() {
        let ledger = EfficiencyLedger::new();
        let scorer = scorer();
        ledger
            .record_action(&scorer, "c-1", ActionKind::Accept, "o-1", None, Utc::now())
            .unwrap();
        let before = ledger.record("c-1").unwrap();

        let err = ledger
            .amend_record(
                &scorer,
                "c-1",
                &RecordAmendment {
                    expected_version: 1,
                    accepted_count: 1 << 62,
                    rejected_count: 0,
                    penalized_rejection_count: 0,
                },
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let after = ledger.record("c-1").unwrap();
        assert_eq!(after.accepted_count, before.accepted_count);
        assert_eq!(after.total_points, before.total_points);
        assert_eq!(after.version, before.version);
        assert_eq!(after.last_updated, before.last_updated);
    }

    #[test]
    fn saturated_counter_rejects_further_actions() {
        let ledger = EfficiencyLedger::new();
        let scorer = PriorityScorer::new(
            PrioritySettings {
                points_per_acceptance: 0,
                ..PrioritySettings::default()
            },
            TieBreak::Disabled,
        )
        .unwrap();
        ledger
            .record_action(&scorer, "c-1", ActionKind::Accept, "o-1", None, Utc::now())
            .unwrap();
        ledger
            .amend_record(
                &scorer,
                "c-1",
                &RecordAmendment {
                    expected_version: 1,
                    accepted_count: u64::MAX,
                    rejected_count: 0,
                    penalized_rejection_count: 0,
                },
                Utc::now(),
            )
            .unwrap();

        let err = ledger
            .record_action(&scorer, "c-1", ActionKind::Accept, "o-2", None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let record = ledger.record("c-1").unwrap();
        assert_eq!(record.accepted_count, u64::MAX);
        assert_eq!(record.version, 2);
        assert_eq!(ledger.actions("c-1").unwrap().len(), 1);
    }

    #[test]
    fn amending_unknown_courier_is_not_found() {
        let ledger = EfficiencyLedger::new();
        let amendment = RecordAmendment {
            expected_version: 0,
            accepted_count: 1,
            rejected_count: 0,
            penalized_rejection_count: 0,
        };
        assert!(matches!(
            ledger.amend_record(&scorer(), "ghost", &amendment, Utc::now()),
            Err(AppError::NotFound(_))
        ));
    }
}
