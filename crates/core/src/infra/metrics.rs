use parking_lot::Mutex;
use serde::Serialize;

// ─── Metrics ─────────────────────────────────────────────────────

/// ローカルメトリクス収集器。プロセス内カウンタのみで、外部送信はしない。
pub struct Metrics {
    counters: Mutex<MetricsCounters>,
    latencies: Mutex<Vec<LatencyRecord>>,
}

#[derive(Debug, Default)]
struct MetricsCounters {
    jobs_submitted: u64,
    jobs_completed: u64,
    jobs_errored: u64,
    jobs_cancelled: u64,
    exports_rendered: u64,
    export_failures: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencyRecord {
    pub phase: String,
    pub duration_ms: u64,
    pub timestamp: String,
}

/// メトリクスサマリー (UI に返す用)。
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub jobs_submitted: u64,
    pub jobs_completed: u64,
    pub jobs_errored: u64,
    pub jobs_cancelled: u64,
    pub exports_rendered: u64,
    pub export_failures: u64,
    pub avg_transcribe_ms: Option<f64>,
    pub recent_latencies: Vec<LatencyRecord>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(MetricsCounters::default()),
            latencies: Mutex::new(Vec::new()),
        }
    }

    pub fn inc_jobs_submitted(&self) {
        self.counters.lock().jobs_submitted += 1;
    }

    pub fn inc_jobs_completed(&self) {
        self.counters.lock().jobs_completed += 1;
    }

    pub fn inc_jobs_errored(&self) {
        self.counters.lock().jobs_errored += 1;
    }

    pub fn inc_jobs_cancelled(&self) {
        self.counters.lock().jobs_cancelled += 1;
    }

    pub fn inc_exports_rendered(&self) {
        self.counters.lock().exports_rendered += 1;
    }

    pub fn inc_export_failures(&self) {
        self.counters.lock().export_failures += 1;
    }

    pub fn record_latency(&self, phase: &str, duration_ms: u64) {
        let record = LatencyRecord {
            phase: phase.to_string(),
            duration_ms,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let mut latencies = self.latencies.lock();
        latencies.push(record);
        // 最新1000件のみ保持
        if latencies.len() > 1000 {
            let excess = latencies.len() - 1000;
            latencies.drain(0..excess);
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let c = self.counters.lock();
        let latencies = self.latencies.lock();

        let transcribe: Vec<f64> = latencies
            .iter()
            .filter(|r| r.phase == "transcribe")
            .map(|r| r.duration_ms as f64)
            .collect();
        let avg_transcribe_ms = if transcribe.is_empty() {
            None
        } else {
            Some(transcribe.iter().sum::<f64>() / transcribe.len() as f64)
        };

        let recent: Vec<LatencyRecord> = latencies.iter().rev().take(20).cloned().collect();

        MetricsSummary {
            jobs_submitted: c.jobs_submitted,
            jobs_completed: c.jobs_completed,
            jobs_errored: c.jobs_errored,
            jobs_cancelled: c.jobs_cancelled,
            exports_rendered: c.exports_rendered,
            export_failures: c.export_failures,
            avg_transcribe_ms,
            recent_latencies: recent,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────
