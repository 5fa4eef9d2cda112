use crate::config::Config;
use crate::engine::fare::FareEngine;
use crate::engine::ledger::EfficiencyLedger;
use crate::engine::payout::PayoutAggregator;
use crate::engine::priority::PriorityScorer;
use crate::error::AppError;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub fares: FareEngine,
    pub scorer: PriorityScorer,
    pub payouts: PayoutAggregator,
    pub ledger: EfficiencyLedger,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        Ok(Self {
            fares: FareEngine::new(config.fares.clone())?,
            scorer: PriorityScorer::new(config.priority.clone(), config.tie_break())?,
            payouts: PayoutAggregator::new(config.payouts.clone())?,
            ledger: EfficiencyLedger::new(),
            metrics: Metrics::new()?,
        })
    }
}
