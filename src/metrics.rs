//! Operation counters and query latency, as reported by `flatvec bench`.

use std::time::Duration;

use serde::Serialize;

/// Point-in-time view of a [`MetricsCollector`], in microseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub inserts: u64,
    pub queries: u64,
    pub avg_query_us: f64,
    pub p50_query_us: f64,
    pub p95_query_us: f64,
    pub p99_query_us: f64,
}

/// Collects runtime metrics for a store workload.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    query_latencies_us: Vec<f64>,
    total_inserts: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a query with its duration.
    pub fn record_query(&mut self, duration: Duration) {
        self.query_latencies_us
            .push(duration.as_secs_f64() * 1_000_000.0);
    }

    pub fn record_inserts(&mut self, count: usize) {
        self.total_inserts += count as u64;
    }

    pub fn total_queries(&self) -> u64 {
        self.query_latencies_us.len() as u64
    }

    pub fn total_inserts(&self) -> u64 {
        self.total_inserts
    }

    /// Average query latency in microseconds.
    pub fn avg_query_latency_us(&self) -> f64 {
        if self.query_latencies_us.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.query_latencies_us.iter().sum();
        sum / self.query_latencies_us.len() as f64
    }

    /// Nearest-rank percentile of query latency (e.g. 50.0, 95.0, 99.0).
    pub fn percentile_query_latency_us(&self, percentile: f64) -> f64 {
        let mut sorted = self.query_latencies_us.clone();
        sorted.sort_by(f64::total_cmp);
        percentile_of(&sorted, percentile)
    }

    pub fn summary(&self) -> MetricsSummary {
        let mut sorted = self.query_latencies_us.clone();
        sorted.sort_by(f64::total_cmp);
        MetricsSummary {
            inserts: self.total_inserts,
            queries: self.total_queries(),
            avg_query_us: self.avg_query_latency_us(),
            p50_query_us: percentile_of(&sorted, 50.0),
            p95_query_us: percentile_of(&sorted, 95.0),
            p99_query_us: percentile_of(&sorted, 99.0),
        }
    }
}

fn percentile_of(sorted: &[f64], percentile: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let index = ((percentile / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[index.min(sorted.len() - 1)]
}
