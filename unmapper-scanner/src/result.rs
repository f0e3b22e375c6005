use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A source map that was fully extracted and logged for its host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub host: String,
    pub map_url: String,
    pub files_written: usize,
    pub log_path: PathBuf,
}

/// Per-stage counters, updated by the workers as items flow through.
#[derive(Debug, Default)]
pub struct StageCounters {
    received: AtomicUsize,
    skipped: AtomicUsize,
    emitted: AtomicUsize,
    failed: Mutex<BTreeMap<&'static str, usize>>,
}

impl StageCounters {
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_emitted(&self) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, kind: &'static str) {
        if let Ok(mut failed) = self.failed.lock() {
            *failed.entry(kind).or_insert(0) += 1;
        }
    }

    pub fn snapshot(&self, stage: &str) -> StageStats {
        let failed = self
            .failed
            .lock()
            .map(|f| f.iter().map(|(k, v)| (k.to_string(), *v)).collect())
            .unwrap_or_default();
        StageStats {
            stage: stage.to_string(),
            received: self.received.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            emitted: self.emitted.load(Ordering::Relaxed),
            failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageStats {
    pub stage: String,
    pub received: usize,
    pub skipped: usize,
    pub emitted: usize,
    pub failed: BTreeMap<String, usize>,
}

impl StageStats {
    pub fn total_failed(&self) -> usize {
        self.failed.values().sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub output_root: PathBuf,
    pub stages: Vec<StageStats>,
    pub records: Vec<ProvenanceRecord>,
}

impl RunSummary {
    pub fn files_written(&self) -> usize {
        self.records.iter().map(|r| r.files_written).sum()
    }

    pub fn maps_extracted(&self) -> usize {
        self.records.len()
    }

    pub fn stage(&self, name: &str) -> Option<&StageStats> {
        self.stages.iter().find(|s| s.stage == name)
    }
}
