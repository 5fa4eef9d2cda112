use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Datelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::engine::payout::summarize_earnings;
use crate::error::AppError;
use crate::models::fare::CourierPayment;
use crate::models::payout::{CourierEarnings, EarningsSummary, PayoutReport, ReportPeriod};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/payouts/report", post(payout_report))
        .route("/payouts/next-date", get(next_payout_date))
        .route("/payouts/earnings-summary", post(earnings_summary))
}

#[derive(Deserialize)]
pub struct PayoutReportRequest {
    pub period: ReportPeriod,
    pub couriers: Vec<CourierEarnings>,
}

#[derive(Deserialize)]
pub struct NextPayoutQuery {
    pub from: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct NextPayoutResponse {
    pub next_payout_date: DateTime<Utc>,
    pub weekday: Weekday,
}

#[derive(Deserialize)]
pub struct EarningsSummaryRequest {
    pub courier_id: String,
    pub period: ReportPeriod,
    pub payments: Vec<CourierPayment>,
}

async fn payout_report(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PayoutReportRequest>,
) -> Result<Json<PayoutReport>, AppError> {
    let report = state
        .payouts
        .generate_report(&payload.couriers, payload.period, Utc::now())?;
    Ok(Json(report))
}

async fn next_payout_date(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NextPayoutQuery>,
) -> Json<NextPayoutResponse> {
    let next = state
        .payouts
        .next_payout_date(query.from.unwrap_or_else(Utc::now));

    Json(NextPayoutResponse {
        next_payout_date: next,
        weekday: next.weekday(),
    })
}

async fn earnings_summary(
    Json(payload): Json<EarningsSummaryRequest>,
) -> Result<Json<EarningsSummary>, AppError> {
    if payload.period.end < payload.period.start {
        return Err(AppError::InvalidInput(
            "report period ends before it starts".to_string(),
        ));
    }

    Ok(Json(summarize_earnings(
        &payload.courier_id,
        payload.period,
        &payload.payments,
    )))
}
