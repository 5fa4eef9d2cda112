use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine::time::{estimate_delivery_minutes, Weather};
use crate::error::AppError;
use crate::geo::estimate_distance;
use crate::models::courier::GeoPoint;
use crate::models::fare::{FareQuote, FareQuoteInputs};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/quotes", post(quote_fare))
        .route("/estimates/distance", post(distance_estimate))
        .route("/estimates/time", post(time_estimate))
}

#[derive(Deserialize)]
pub struct DistanceRequest {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
}

#[derive(Serialize)]
pub struct DistanceResponse {
    pub distance_km: f64,
}

#[derive(Deserialize)]
pub struct TimeRequest {
    pub distance_km: f64,
    #[serde(default)]
    pub is_peak_hour: bool,
    #[serde(default)]
    pub weather: Option<String>,
}

#[derive(Serialize)]
pub struct TimeResponse {
    pub estimated_delivery_minutes: u32,
    pub weather: &'static str,
}

async fn quote_fare(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FareQuoteInputs>,
) -> Result<Json<FareQuote>, AppError> {
    let start = Instant::now();
    let result = state.fares.quote(&payload, Utc::now());
    let outcome = if result.is_ok() { "success" } else { "error" };

    state
        .metrics
        .quote_latency_seconds
        .with_label_values(&[outcome])
        .observe(start.elapsed().as_secs_f64());
    state
        .metrics
        .fare_quotes_total
        .with_label_values(&[outcome])
        .inc();

    match result {
        Ok(quote) => Ok(Json(quote)),
        Err(err) => {
            warn!(error = %err, "fare quote rejected");
            Err(err)
        }
    }
}

async fn distance_estimate(
    Json(payload): Json<DistanceRequest>,
) -> Result<Json<DistanceResponse>, AppError> {
    let distance_km = estimate_distance(&payload.origin, &payload.destination)?;
    Ok(Json(DistanceResponse { distance_km }))
}

async fn time_estimate(Json(payload): Json<TimeRequest>) -> Result<Json<TimeResponse>, AppError> {
    let weather = Weather::from_tag(payload.weather.as_deref().unwrap_or("normal"));
    let minutes = estimate_delivery_minutes(payload.distance_km, payload.is_peak_hour, weather)?;

    Ok(Json(TimeResponse {
        estimated_delivery_minutes: minutes,
        weather: weather.as_str(),
    }))
}
