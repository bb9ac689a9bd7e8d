//! Minimal metrics emission helpers.
//!
//! These helpers emit structured metrics via tracing by default. A test sink
//! can be installed to capture emissions in unit tests.

use std::sync::{Arc, RwLock};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetricValue {
    Counter(u64),
    Gauge(u64),
    Histogram(u64),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetricLabel {
    pub key: &'static str,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetricEvent {
    pub name: &'static str,
    pub value: MetricValue,
    pub labels: Vec<MetricLabel>,
}

pub trait MetricSink: Send + Sync {
    fn record(&self, event: MetricEvent);
}

struct TracingSink;

impl MetricSink for TracingSink {
    fn record(&self, event: MetricEvent) {
        match event.value {
            MetricValue::Counter(value)
            | MetricValue::Gauge(value)
            | MetricValue::Histogram(value) => {
                tracing::info!(
                    target: "metrics",
                    metric = event.name,
                    value,
                    labels = ?event.labels
                );
            }
        }
    }
}

static METRIC_SINK: std::sync::OnceLock<RwLock<Arc<dyn MetricSink>>> = std::sync::OnceLock::new();

fn sink() -> Arc<dyn MetricSink> {
    METRIC_SINK
        .get_or_init(|| RwLock::new(Arc::new(TracingSink)))
        .read()
        .expect("metrics sink lock poisoned")
        .clone()
}

pub fn set_sink(sink: Arc<dyn MetricSink>) {
    let lock = METRIC_SINK.get_or_init(|| RwLock::new(Arc::new(TracingSink)));
    *lock.write().expect("metrics sink lock poisoned") = sink;
}

fn emit(name: &'static str, value: MetricValue, labels: Vec<MetricLabel>) {
    sink().record(MetricEvent { name, value, labels });
}

fn duration_ms(duration: Duration) -> u64 {
    let ms = duration.as_millis();
    u64::try_from(ms).unwrap_or(u64::MAX)
}

pub fn request_admitted() {
    emit("request_admitted", MetricValue::Counter(1), Vec::new());
}

pub fn response_matched() {
    emit("response_matched", MetricValue::Counter(1), Vec::new());
}

pub fn violation_reported(kind: &'static str) {
    emit(
        "violation_reported",
        MetricValue::Counter(1),
        vec![MetricLabel {
            key: "kind",
            value: kind.to_string(),
        }],
    );
}

pub fn set_total_inflight(value: usize) {
    emit(
        "total_inflight",
        MetricValue::Gauge(value as u64),
        Vec::new(),
    );
}

pub fn watchdog_scan(duration: Duration, flagged: usize) {
    emit("watchdog_scan", MetricValue::Counter(1), Vec::new());
    emit(
        "watchdog_scan_duration",
        MetricValue::Histogram(duration_ms(duration)),
        Vec::new(),
    );
    if flagged > 0 {
        emit(
            "watchdog_flagged",
            MetricValue::Counter(flagged as u64),
            Vec::new(),
        );
    }
}

pub fn snapshot_taken() {
    emit("snapshot_taken", MetricValue::Counter(1), Vec::new());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct TestSink {
        events: Mutex<Vec<MetricEvent>>,
    }

    impl MetricSink for TestSink {
        fn record(&self, event: MetricEvent) {
            self.events.lock().expect("metrics lock").push(event);
        }
    }

    #[test]
    fn emits_counters_and_gauges() {
        let sink = Arc::new(TestSink::default());
        set_sink(sink.clone());

        request_admitted();
        violation_reported("timeout");
        set_total_inflight(4);
        watchdog_scan(Duration::from_millis(2), 1);

        let events = sink.events.lock().expect("metrics lock");
        assert!(events.iter().any(|e| e.name == "request_admitted"));
        assert!(events.iter().any(|e| e.name == "violation_reported"
            && e.labels.iter().any(|l| l.value == "timeout")));
        assert!(events
            .iter()
            .any(|e| e.name == "total_inflight" && e.value == MetricValue::Gauge(4)));
        assert!(events.iter().any(|e| e.name == "watchdog_flagged"));
    }
}
