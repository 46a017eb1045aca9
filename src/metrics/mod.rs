//! Runtime metrics: monotonic counters plus per-method latency samples,
//! rendered as Prometheus text (§4.7, C7).
//!
//! Grounded on `metrics::DaemonMetrics` in the teacher (atomics +
//! `render_prometheus`), extended with the per-method latency `Vec<f64>`
//! the spec requires.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

pub struct MetricsRecorder {
    requests_total: AtomicU64,
    errors_total: AtomicU64,
    active_sessions: AtomicU64,
    events_delivered_total: AtomicU64,
    started_at: Instant,
    latencies: RwLock<HashMap<String, Vec<f64>>>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            errors_total: AtomicU64::new(0),
            active_sessions: AtomicU64::new(0),
            events_delivered_total: AtomicU64::new(0),
            started_at: Instant::now(),
            latencies: RwLock::new(HashMap::new()),
        }
    }

    pub fn inc_requests(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_errors(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_active_sessions(&self) {
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec_active_sessions(&self) {
        self.active_sessions.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn inc_events_delivered(&self, count: usize) {
        self.events_delivered_total
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub async fn record_latency(&self, method: &str, dur: Duration) {
        let mut latencies = self.latencies.write().await;
        latencies
            .entry(method.to_string())
            .or_default()
            .push(dur.as_secs_f64());
    }

    /// Deep-copy snapshot, so a concurrent writer never produces a torn
    /// read for a consumer rendering `/metrics`.
    pub async fn snapshot_latencies(&self) -> HashMap<String, Vec<f64>> {
        self.latencies.read().await.clone()
    }

    pub fn active_sessions(&self) -> u64 {
        self.active_sessions.load(Ordering::Relaxed)
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn errors_total(&self) -> u64 {
        self.errors_total.load(Ordering::Relaxed)
    }

    pub async fn render_prometheus(&self) -> String {
        let mut out = String::new();
        out.push_str("# HELP gatewatch_requests_total Total JSON-RPC requests processed\n");
        out.push_str("# TYPE gatewatch_requests_total counter\n");
        out.push_str(&format!(
            "gatewatch_requests_total {}\n",
            self.requests_total()
        ));

        out.push_str("# HELP gatewatch_errors_total Total internal errors\n");
        out.push_str("# TYPE gatewatch_errors_total counter\n");
        out.push_str(&format!("gatewatch_errors_total {}\n", self.errors_total()));

        out.push_str("# HELP gatewatch_active_sessions Currently connected WebSocket sessions\n");
        out.push_str("# TYPE gatewatch_active_sessions gauge\n");
        out.push_str(&format!(
            "gatewatch_active_sessions {}\n",
            self.active_sessions()
        ));

        out.push_str("# HELP gatewatch_events_delivered_total Total event notifications delivered\n");
        out.push_str("# TYPE gatewatch_events_delivered_total counter\n");
        out.push_str(&format!(
            "gatewatch_events_delivered_total {}\n",
            self.events_delivered_total.load(Ordering::Relaxed)
        ));

        out.push_str("# HELP gatewatch_uptime_seconds Seconds since process start\n");
        out.push_str("# TYPE gatewatch_uptime_seconds gauge\n");
        out.push_str(&format!(
            "gatewatch_uptime_seconds {}\n",
            self.started_at.elapsed().as_secs()
        ));

        out.push_str("# HELP gatewatch_method_latency_seconds Per-method dispatch latency samples\n");
        out.push_str("# TYPE gatewatch_method_latency_seconds summary\n");
        let latencies = self.snapshot_latencies().await;
        for (method, samples) in latencies {
            if samples.is_empty() {
                continue;
            }
            let sum: f64 = samples.iter().sum();
            out.push_str(&format!(
                "gatewatch_method_latency_seconds_sum{{method=\"{method}\"}} {sum}\n"
            ));
            out.push_str(&format!(
                "gatewatch_method_latency_seconds_count{{method=\"{method}\"}} {}\n",
                samples.len()
            ));
        }
        out
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn latency_samples_accumulate_per_method() {
        let metrics = MetricsRecorder::new();
        metrics.record_latency("ping", Duration::from_millis(5)).await;
        metrics.record_latency("ping", Duration::from_millis(7)).await;
        let snap = metrics.snapshot_latencies().await;
        assert_eq!(snap.get("ping").unwrap().len(), 2);
    }

    #[test]
    fn counters_start_at_zero() {
        let metrics = MetricsRecorder::new();
        assert_eq!(metrics.requests_total(), 0);
        assert_eq!(metrics.errors_total(), 0);
        assert_eq!(metrics.active_sessions(), 0);
    }
}
