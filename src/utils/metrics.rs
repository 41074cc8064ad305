use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::types::TranslationStatus;

/// Process-wide metrics collector.
///
/// Tracks page throughput, block counts, translation outcomes and stage durations.
/// Thread-safe and cheap to clone; every clone records into the same counters.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    pages_processed: AtomicUsize,
    pages_failed: AtomicUsize,
    blocks_detected: AtomicUsize,
    blocks_removed: AtomicUsize,

    translations_ok: AtomicUsize,
    translations_mock: AtomicUsize,
    translations_failed: AtomicUsize,

    detect_duration_ms: RwLock<Vec<u64>>,
    clean_duration_ms: RwLock<Vec<u64>>,
    translate_duration_ms: RwLock<Vec<u64>>,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                pages_processed: AtomicUsize::new(0),
                pages_failed: AtomicUsize::new(0),
                blocks_detected: AtomicUsize::new(0),
                blocks_removed: AtomicUsize::new(0),
                translations_ok: AtomicUsize::new(0),
                translations_mock: AtomicUsize::new(0),
                translations_failed: AtomicUsize::new(0),
                detect_duration_ms: RwLock::new(Vec::new()),
                clean_duration_ms: RwLock::new(Vec::new()),
                translate_duration_ms: RwLock::new(Vec::new()),
                start_time: Instant::now(),
            }),
        }
    }

    pub fn record_detection(&self, blocks: usize, duration: Duration) {
        self.inner.blocks_detected.fetch_add(blocks, Ordering::Relaxed);
        self.inner.detect_duration_ms.write().push(duration.as_millis() as u64);
    }

    pub fn record_cleaning(&self, blocks_removed: usize, duration: Duration) {
        self.inner.blocks_removed.fetch_add(blocks_removed, Ordering::Relaxed);
        self.inner.clean_duration_ms.write().push(duration.as_millis() as u64);
    }

    pub fn record_translation(&self, status: TranslationStatus, duration: Duration) {
        let counter = match status {
            TranslationStatus::Translated => &self.inner.translations_ok,
            TranslationStatus::Mock => &self.inner.translations_mock,
            TranslationStatus::Failed => &self.inner.translations_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.inner.translate_duration_ms.write().push(duration.as_millis() as u64);
    }

    pub fn record_page(&self, success: bool) {
        if success {
            self.inner.pages_processed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.inner.pages_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    // Get snapshot for reporting
    pub fn snapshot(&self) -> MetricsSnapshot {
        let detect = self.inner.detect_duration_ms.read();
        let detect_avg_ms = avg(&detect);
        let detect_p95_ms = percentile(&detect, 0.95);
        drop(detect);

        let clean_avg_ms = avg(&self.inner.clean_duration_ms.read());

        let translate = self.inner.translate_duration_ms.read();
        let translate_avg_ms = avg(&translate);
        let translate_p95_ms = percentile(&translate, 0.95);
        drop(translate);

        MetricsSnapshot {
            pages_processed: self.inner.pages_processed.load(Ordering::Relaxed),
            pages_failed: self.inner.pages_failed.load(Ordering::Relaxed),
            blocks_detected: self.inner.blocks_detected.load(Ordering::Relaxed),
            blocks_removed: self.inner.blocks_removed.load(Ordering::Relaxed),
            translations_ok: self.inner.translations_ok.load(Ordering::Relaxed),
            translations_mock: self.inner.translations_mock.load(Ordering::Relaxed),
            translations_failed: self.inner.translations_failed.load(Ordering::Relaxed),
            detect_avg_ms,
            detect_p95_ms,
            clean_avg_ms,
            translate_avg_ms,
            translate_p95_ms,
            uptime_seconds: self.inner.start_time.elapsed().as_secs(),
        }
    }

    /// Generate Prometheus-format metrics
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        format!(
            r#"# HELP pages_processed_total Pages that completed the pipeline
# TYPE pages_processed_total counter
pages_processed_total {{}} {}

# HELP pages_failed_total Pages aborted by a detection or cleaning error
# TYPE pages_failed_total counter
pages_failed_total {{}} {}

# HELP blocks_detected_total Text blocks accepted by the detector
# TYPE blocks_detected_total counter
blocks_detected_total {{}} {}

# HELP blocks_removed_total Text blocks inpainted away
# TYPE blocks_removed_total counter
blocks_removed_total {{}} {}

# HELP translations_total Translation batches by outcome
# TYPE translations_total counter
translations_total {{outcome="translated"}} {}
translations_total {{outcome="mock"}} {}
translations_total {{outcome="failed"}} {}

# HELP stage_avg_duration_ms Average stage duration in milliseconds
# TYPE stage_avg_duration_ms gauge
stage_avg_duration_ms {{stage="detect"}} {}
stage_avg_duration_ms {{stage="clean"}} {}
stage_avg_duration_ms {{stage="translate"}} {}

# HELP uptime_seconds Process uptime in seconds
# TYPE uptime_seconds counter
uptime_seconds {{}} {}
"#,
            snapshot.pages_processed,
            snapshot.pages_failed,
            snapshot.blocks_detected,
            snapshot.blocks_removed,
            snapshot.translations_ok,
            snapshot.translations_mock,
            snapshot.translations_failed,
            snapshot.detect_avg_ms,
            snapshot.clean_avg_ms,
            snapshot.translate_avg_ms,
            snapshot.uptime_seconds,
        )
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub pages_processed: usize,
    pub pages_failed: usize,
    pub blocks_detected: usize,
    pub blocks_removed: usize,
    pub translations_ok: usize,
    pub translations_mock: usize,
    pub translations_failed: usize,
    pub detect_avg_ms: u64,
    pub detect_p95_ms: u64,
    pub clean_avg_ms: u64,
    pub translate_avg_ms: u64,
    pub translate_p95_ms: u64,
    pub uptime_seconds: u64,
}

fn percentile(values: &[u64], p: f64) -> u64 {
    if values.is_empty() {
        return 0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let idx = ((values.len() as f64 - 1.0) * p) as usize;
    sorted[idx]
}

fn avg(values: &[u64]) -> u64 {
    if values.is_empty() {
        return 0;
    }
    values.iter().sum::<u64>() / values.len() as u64
}
