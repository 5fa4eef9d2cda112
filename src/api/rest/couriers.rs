use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::ledger::{RecordAmendment, RecordedAction};
use crate::engine::priority::{base_priority, RankedCourier};
use crate::error::AppError;
use crate::models::courier::{ActionKind, CourierActionEvent, CourierEfficiencyRecord};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers/ranking", get(ranking))
        .route("/couriers/rank", post(rank_records))
        .route("/couriers/:id/actions", post(record_action).get(list_actions))
        .route("/couriers/:id/efficiency", get(efficiency).put(amend_efficiency))
}

#[derive(Deserialize)]
pub struct CourierActionRequest {
    pub action: String,
    pub order_id: String,
    #[serde(default)]
    pub preparation_start_time: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct EfficiencySummary {
    pub record: CourierEfficiencyRecord,
    pub base_priority: f64,
    pub bonus_amount_per_order: f64,
}

async fn record_action(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<CourierActionRequest>,
) -> Result<Json<RecordedAction>, AppError> {
    let action: ActionKind = payload.action.parse()?;

    let recorded = state.ledger.record_action(
        &state.scorer,
        &id,
        action,
        &payload.order_id,
        payload.preparation_start_time,
        Utc::now(),
    )?;

    state
        .metrics
        .courier_actions_total
        .with_label_values(&[recorded.outcome.as_str()])
        .inc();
    state
        .metrics
        .courier_efficiency_percentage
        .with_label_values(&[recorded.record.courier_id.as_str()])
        .set(recorded.record.efficiency_percentage);

    Ok(Json(recorded))
}

async fn list_actions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CourierActionEvent>>, AppError> {
    let actions = state
        .ledger
        .actions(&id)
        .ok_or_else(|| AppError::NotFound(format!("courier {} has no record", id)))?;

    Ok(Json(actions))
}

async fn efficiency(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EfficiencySummary>, AppError> {
    let record = state
        .ledger
        .record(&id)
        .ok_or_else(|| AppError::NotFound(format!("courier {} has no record", id)))?;

    let bonus_amount_per_order = if record.bonus_eligible {
        state.scorer.settings().bonus_amount_per_order
    } else {
        0.0
    };

    Ok(Json(EfficiencySummary {
        base_priority: base_priority(&record),
        bonus_amount_per_order,
        record,
    }))
}

async fn amend_efficiency(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<RecordAmendment>,
) -> Result<Json<CourierEfficiencyRecord>, AppError> {
    let record = state
        .ledger
        .amend_record(&state.scorer, &id, &payload, Utc::now())?;

    state
        .metrics
        .courier_efficiency_percentage
        .with_label_values(&[record.courier_id.as_str()])
        .set(record.efficiency_percentage);

    Ok(Json(record))
}

async fn ranking(State(state): State<Arc<AppState>>) -> Json<Vec<RankedCourier>> {
    let records = state.ledger.records();
    Json(state.scorer.rank(&records))
}

async fn rank_records(
    State(state): State<Arc<AppState>>,
    Json(records): Json<Vec<CourierEfficiencyRecord>>,
) -> Json<Vec<RankedCourier>> {
    Json(state.scorer.rank(&records))
}
