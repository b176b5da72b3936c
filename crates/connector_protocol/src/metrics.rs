//! Counters and timers reported through an explicitly passed [`MetricsContext`].
//!
//! Points are pushed to a [`MetricSink`]; the default [`TracingSink`] logs each point as
//! `METRIC: <json>` at info level on the `connector_protocol::metrics` target.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    SyncDuration,
    MessageCount,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Counter,
    Timer,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Count(u64),
    Seconds(f64),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TimerStatus {
    Succeeded,
    Failed,
}

impl TimerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TimerStatus::Succeeded => "succeeded",
            TimerStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricPoint {
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    pub metric: Metric,
    pub value: MetricValue,
    pub tags: BTreeMap<String, Value>,
}

pub trait MetricSink: Send + Sync {
    fn emit(&self, point: &MetricPoint);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl MetricSink for TracingSink {
    fn emit(&self, point: &MetricPoint) {
        match serde_json::to_string(point) {
            Ok(json) => info!(target: "connector_protocol::metrics", "METRIC: {json}"),
            Err(err) => warn!(
                target: "connector_protocol::metrics",
                metric = ?point.metric,
                "failed to encode metric point: {err}"
            ),
        }
    }
}

/// Tags, emission interval and sink shared by the counters and timers of one unit of work.
#[derive(Clone)]
pub struct MetricsContext {
    tags: BTreeMap<String, Value>,
    log_interval: Duration,
    sink: Arc<dyn MetricSink>,
}

impl MetricsContext {
    pub fn new(sink: Arc<dyn MetricSink>) -> Self {
        Self {
            tags: BTreeMap::new(),
            log_interval: DEFAULT_LOG_INTERVAL,
            sink,
        }
    }

    /// Context tagged with the current process id, logging through `tracing`.
    pub fn for_process() -> Self {
        Self::new(Arc::new(TracingSink)).with_tag("pid", std::process::id())
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_log_interval(mut self, log_interval: Duration) -> Self {
        self.log_interval = log_interval;
        self
    }

    pub fn tags(&self) -> &BTreeMap<String, Value> {
        &self.tags
    }

    pub fn log_interval(&self) -> Duration {
        self.log_interval
    }

    pub fn counter(&self, metric: Metric) -> Counter {
        Counter {
            metric,
            tags: self.tags.clone(),
            sink: Arc::clone(&self.sink),
            log_interval: self.log_interval,
            pending: 0,
            total: 0,
            last_emit: Instant::now(),
            finished: false,
        }
    }

    pub fn timer(&self, metric: Metric) -> Timer {
        Timer {
            metric,
            tags: self.tags.clone(),
            sink: Arc::clone(&self.sink),
            started: Instant::now(),
            stopped: false,
        }
    }
}

impl Default for MetricsContext {
    fn default() -> Self {
        Self::for_process()
    }
}

impl fmt::Debug for MetricsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsContext")
            .field("tags", &self.tags)
            .field("log_interval", &self.log_interval)
            .finish_non_exhaustive()
    }
}

/// Counts events and reports the count accumulated since the previous point.
///
/// A point is emitted whenever the log interval has elapsed at increment time, and once more
/// when the counter is finished or dropped.
pub struct Counter {
    metric: Metric,
    tags: BTreeMap<String, Value>,
    sink: Arc<dyn MetricSink>,
    log_interval: Duration,
    pending: u64,
    total: u64,
    last_emit: Instant,
    finished: bool,
}

impl Counter {
    pub fn increment(&mut self) {
        self.increment_by(1);
    }

    pub fn increment_by(&mut self, n: u64) {
        self.pending = self.pending.saturating_add(n);
        self.total = self.total.saturating_add(n);
        if self.last_emit.elapsed() >= self.log_interval {
            self.emit();
        }
    }

    /// Total increments over the counter's lifetime.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn finish(mut self) -> u64 {
        self.emit();
        self.finished = true;
        self.total
    }

    fn emit(&mut self) {
        self.sink.emit(&MetricPoint {
            metric_type: MetricType::Counter,
            metric: self.metric,
            value: MetricValue::Count(self.pending),
            tags: self.tags.clone(),
        });
        self.pending = 0;
        self.last_emit = Instant::now();
    }
}

impl Drop for Counter {
    fn drop(&mut self) {
        if !self.finished {
            self.emit();
        }
    }
}

/// Measures one unit of work. Dropping a timer without [`Timer::stop`] reports a failure.
pub struct Timer {
    metric: Metric,
    tags: BTreeMap<String, Value>,
    sink: Arc<dyn MetricSink>,
    started: Instant,
    stopped: bool,
}

impl Timer {
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn stop(mut self, status: TimerStatus) -> Duration {
        let elapsed = self.emit(status);
        self.stopped = true;
        elapsed
    }

    fn emit(&mut self, status: TimerStatus) -> Duration {
        let elapsed = self.started.elapsed();
        let mut tags = self.tags.clone();
        tags.insert("status".to_string(), Value::from(status.as_str()));
        self.sink.emit(&MetricPoint {
            metric_type: MetricType::Timer,
            metric: self.metric,
            value: MetricValue::Seconds(elapsed.as_secs_f64()),
            tags,
        });
        elapsed
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if !self.stopped {
            self.emit(TimerStatus::Failed);
        }
    }
}
