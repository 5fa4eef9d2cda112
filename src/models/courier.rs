use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Accept,
    Reject,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Accept => "accept",
            ActionKind::Reject => "reject",
        }
    }
}

impl FromStr for ActionKind {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "accept" => Ok(ActionKind::Accept),
            "reject" => Ok(ActionKind::Reject),
            other => Err(AppError::InvalidInput(format!(
                "unknown action: {other}, expected accept/reject"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    Accepted,
    RejectedPenalized,
    RejectedUnpenalized,
}

impl ActionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionOutcome::Accepted => "accepted",
            ActionOutcome::RejectedPenalized => "rejected_penalized",
            ActionOutcome::RejectedUnpenalized => "rejected_unpenalized",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierEfficiencyRecord {
    pub courier_id: String,
    pub total_points: i64,
    pub accepted_count: u64,
    pub rejected_count: u64,
    pub penalized_rejection_count: u64,
    pub efficiency_percentage: f64,
    pub bonus_eligible: bool,
    pub version: u64,
    pub last_updated: DateTime<Utc>,
}

impl CourierEfficiencyRecord {
    pub fn new(courier_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            courier_id: courier_id.into(),
            total_points: 0,
            accepted_count: 0,
            rejected_count: 0,
            penalized_rejection_count: 0,
            efficiency_percentage: 100.0,
            bonus_eligible: true,
            version: 0,
            last_updated: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierActionEvent {
    pub id: Uuid,
    pub courier_id: String,
    pub order_id: String,
    pub action: ActionKind,
    pub outcome: ActionOutcome,
    pub timestamp: DateTime<Utc>,
    pub penalty_applied: bool,
    pub preparation_start_time: Option<DateTime<Utc>>,
}
