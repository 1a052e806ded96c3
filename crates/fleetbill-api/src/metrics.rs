//! Prometheus metrics served at `/metrics`

use fleetbill_common::BillingRow;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Billing counters and the registry that exports them
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    calculations: IntCounterVec,
    batch_rows: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let calculations = IntCounterVec::new(
            Opts::new(
                "fleetbill_calculations_total",
                "Trip cost calculations by billing model and outcome",
            ),
            &["model", "outcome"],
        )?;
        registry.register(Box::new(calculations.clone()))?;

        let batch_rows = IntCounterVec::new(
            Opts::new(
                "fleetbill_batch_rows_total",
                "Billing batch rows by status",
            ),
            &["status"],
        )?;
        registry.register(Box::new(batch_rows.clone()))?;

        Ok(Self {
            registry,
            calculations,
            batch_rows,
        })
    }

    /// Count one single-trip calculation
    pub fn record_calculation(&self, model: &str, outcome: &str) {
        self.calculations.with_label_values(&[model, outcome]).inc();
    }

    /// Count the rows of a priced batch
    pub fn record_batch(&self, rows: &[BillingRow]) {
        for row in rows {
            self.batch_rows.with_label_values(&[row.status.as_str()]).inc();
        }
    }

    pub fn calculations(&self, model: &str, outcome: &str) -> u64 {
        self.calculations.with_label_values(&[model, outcome]).get()
    }

    pub fn batch_rows(&self, status: &str) -> u64 {
        self.batch_rows.with_label_values(&[status]).get()
    }

    pub fn encode(&self) -> Result<String, prometheus::Error> {
        encode(&self.registry)
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

pub fn encode(registry: &Registry) -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).to_string())
}
