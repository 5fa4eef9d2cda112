use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Json;
use axum::Router;

use crate::engine::fare::{FareRates, FareRatesPatch};
use crate::engine::payout::PayoutSettings;
use crate::engine::priority::PrioritySettings;
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/settings/priority", get(get_priority).put(put_priority))
        .route("/settings/fares", get(get_fares).put(put_fares).patch(patch_fares))
        .route("/settings/payouts", get(get_payouts).put(put_payouts))
}

async fn get_priority(State(state): State<Arc<AppState>>) -> Json<PrioritySettings> {
    Json(state.scorer.settings())
}

async fn put_priority(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PrioritySettings>,
) -> Result<Json<PrioritySettings>, AppError> {
    let result = state.scorer.update_settings(payload);
    state.metrics.record_settings_update("priority", &result);
    result.map(Json)
}

async fn get_fares(State(state): State<Arc<AppState>>) -> Json<FareRates> {
    Json(state.fares.rates())
}

async fn put_fares(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FareRates>,
) -> Result<Json<FareRates>, AppError> {
    let result = state.fares.replace_rates(payload);
    state.metrics.record_settings_update("fares", &result);
    result.map(Json)
}

async fn patch_fares(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FareRatesPatch>,
) -> Result<Json<FareRates>, AppError> {
    let result = state.fares.update_rates(&payload);
    state.metrics.record_settings_update("fares", &result);
    result.map(Json)
}

async fn get_payouts(State(state): State<Arc<AppState>>) -> Json<PayoutSettings> {
    Json(state.payouts.settings())
}

async fn put_payouts(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PayoutSettings>,
) -> Result<Json<PayoutSettings>, AppError> {
    let result = state.payouts.update_settings(payload);
    state.metrics.record_settings_update("payouts", &result);
    result.map(Json)
}
