use anyhow::{Error as AnyhowError, Result};
use log::warn;
use prometheus::{
    histogram_opts, opts, Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge, Registry,
    TextEncoder,
};

#[derive(Debug)]
pub struct Metrics {
    // Providers
    pub provider_request_times: HistogramVec,
    provider_errors: IntCounterVec,

    // Aggregator
    pub epoch_computation_times: Histogram,
    benign_skips: IntCounterVec,
    pub fatal_errors: IntCounter,
    slot_tasks_in_flight: IntGauge,
    income_records: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        Ok(Self {
            provider_request_times: HistogramVec::new(
                histogram_opts!(
                    "EPOCH_REWARDS_PROVIDER_REQUEST_TIMES",
                    "Times for reward provider requests",
                ),
                &["request"],
            )?,

            provider_errors: IntCounterVec::new(
                opts!(
                    "EPOCH_REWARDS_PROVIDER_ERRORS",
                    "Number of failed reward provider requests",
                ),
                &["request"],
            )?,

            epoch_computation_times: Histogram::with_opts(histogram_opts!(
                "EPOCH_REWARDS_COMPUTATION_TIMES",
                "Times for computing rewards of a whole epoch",
            ))?,

            benign_skips: IntCounterVec::new(
                opts!(
                    "EPOCH_REWARDS_BENIGN_SKIPS",
                    "Number of provider calls skipped due to expected protocol conditions",
                ),
                &["reason"],
            )?,

            fatal_errors: IntCounter::new(
                "EPOCH_REWARDS_FATAL_ERRORS",
                "Number of epoch computations aborted by a fatal error",
            )?,

            slot_tasks_in_flight: IntGauge::new(
                "EPOCH_REWARDS_SLOT_TASKS_IN_FLIGHT",
                "Number of per-slot tasks currently running",
            )?,

            income_records: IntGauge::new(
                "EPOCH_REWARDS_INCOME_RECORDS",
                "Number of validator income records in the last computed epoch",
            )?,
        })
    }

    pub fn register_with_default_metrics(&self) -> Result<()> {
        self.register(prometheus::default_registry())
    }

    pub fn register(&self, registry: &Registry) -> Result<()> {
        registry.register(Box::new(self.provider_request_times.clone()))?;
        registry.register(Box::new(self.provider_errors.clone()))?;
        registry.register(Box::new(self.epoch_computation_times.clone()))?;
        registry.register(Box::new(self.benign_skips.clone()))?;
        registry.register(Box::new(self.fatal_errors.clone()))?;
        registry.register(Box::new(self.slot_tasks_in_flight.clone()))?;
        registry.register(Box::new(self.income_records.clone()))?;

        Ok(())
    }

    pub fn register_provider_error(&self, request: &str) {
        match self.provider_errors.get_metric_with_label_values(&[request]) {
            Ok(counter) => counter.inc(),
            Err(error) => warn!("unable to register provider error for {request}: {error:?}"),
        }
    }

    pub fn register_benign_skip(&self, reason: &str) {
        match self.benign_skips.get_metric_with_label_values(&[reason]) {
            Ok(counter) => counter.inc(),
            Err(error) => warn!("unable to register benign skip for {reason}: {error:?}"),
        }
    }

    pub fn inc_slot_tasks_in_flight(&self) {
        self.slot_tasks_in_flight.inc()
    }

    pub fn dec_slot_tasks_in_flight(&self) {
        self.slot_tasks_in_flight.dec()
    }

    #[expect(clippy::cast_possible_wrap)]
    pub fn set_income_records(&self, count: usize) {
        self.income_records.set(count as i64)
    }

    #[cfg(test)]
    fn benign_skip_count(&self, reason: &str) -> u64 {
        self.benign_skips.with_label_values(&[reason]).get()
    }
}

/// Renders every metric in `registry` in the Prometheus text exposition format.
pub fn encode(registry: &Registry) -> Result<String> {
    let mut buffer = String::new();

    TextEncoder::new()
        .encode_utf8(registry.gather().as_slice(), &mut buffer)
        .map_err(AnyhowError::new)?;

    Ok(buffer)
}
