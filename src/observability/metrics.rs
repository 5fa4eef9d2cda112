use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::error::AppError;

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub fare_quotes_total: IntCounterVec,
    pub quote_latency_seconds: HistogramVec,
    pub courier_actions_total: IntCounterVec,
    pub courier_efficiency_percentage: GaugeVec,
    pub settings_updates_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, AppError> {
        let registry = Registry::new();

        let fare_quotes_total = IntCounterVec::new(
            Opts::new("fare_quotes_total", "Total fare quotes by outcome"),
            &["outcome"],
        )
        .map_err(metric_error)?;

        let quote_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "quote_latency_seconds",
                "Latency of fare quote computation in seconds",
            ),
            &["outcome"],
        )
        .map_err(metric_error)?;

        let courier_actions_total = IntCounterVec::new(
            Opts::new("courier_actions_total", "Courier decisions by outcome"),
            &["outcome"],
        )
        .map_err(metric_error)?;

        let courier_efficiency_percentage = GaugeVec::new(
            Opts::new(
                "courier_efficiency_percentage",
                "Current courier efficiency percentage [0..100]",
            ),
            &["courier_id"],
        )
        .map_err(metric_error)?;

        let settings_updates_total = IntCounterVec::new(
            Opts::new("settings_updates_total", "Administrative settings updates"),
            &["kind", "outcome"],
        )
        .map_err(metric_error)?;

        registry
            .register(Box::new(fare_quotes_total.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(quote_latency_seconds.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(courier_actions_total.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(courier_efficiency_percentage.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(settings_updates_total.clone()))
            .map_err(metric_error)?;

        Ok(Self {
            registry,
            fare_quotes_total,
            quote_latency_seconds,
            courier_actions_total,
            courier_efficiency_percentage,
            settings_updates_total,
        })
    }

    pub fn record_settings_update<T>(&self, kind: &str, result: &Result<T, AppError>) {
        let outcome = if result.is_ok() { "accepted" } else { "rejected" };
        self.settings_updates_total
            .with_label_values(&[kind, outcome])
            .inc();
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

fn metric_error(err: prometheus::Error) -> AppError {
    AppError::Internal(format!("metric registration failed: {err}"))
}
