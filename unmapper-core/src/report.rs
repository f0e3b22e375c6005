// Report generation from a finished extraction run

use crate::extract::{ExtractOutcome, extract_url_path};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use unmapper_scanner::{ProvenanceRecord, ScanError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HostReport {
    pub host: String,
    pub maps: Vec<String>,
    pub files_written: usize,
}

/// Group provenance records by host, hosts and map URLs sorted
pub fn group_by_host(records: &[ProvenanceRecord]) -> Vec<HostReport> {
    let mut by_host: BTreeMap<&str, HostReport> = BTreeMap::new();
    for record in records {
        let entry = by_host.entry(&record.host).or_insert_with(|| HostReport {
            host: record.host.clone(),
            maps: Vec::new(),
            files_written: 0,
        });
        entry.maps.push(record.map_url.clone());
        entry.files_written += record.files_written;
    }
    by_host
        .into_values()
        .map(|mut host| {
            host.maps.sort();
            host
        })
        .collect()
}

pub fn generate_report(outcome: &ExtractOutcome, format: ReportFormat) -> Result<String, ScanError> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(outcome)),
        ReportFormat::Json => generate_json_report(outcome),
    }
}

pub fn generate_json_report(outcome: &ExtractOutcome) -> Result<String, ScanError> {
    #[derive(Serialize)]
    struct JsonReport<'a> {
        #[serde(flatten)]
        outcome: &'a ExtractOutcome,
        hosts: Vec<HostReport>,
        maps_extracted: usize,
        files_written: usize,
    }

    let report = JsonReport {
        outcome,
        hosts: group_by_host(&outcome.summary.records),
        maps_extracted: outcome.summary.maps_extracted(),
        files_written: outcome.summary.files_written(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

pub fn generate_text_report(outcome: &ExtractOutcome) -> String {
    let summary = &outcome.summary;
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!(
        "  Seeds accepted: {} (rejected: {})\n",
        outcome.seeds.accepted, outcome.seeds.rejected
    ));
    report.push_str(&format!("  Source maps extracted: {}\n", summary.maps_extracted()));
    report.push_str(&format!("  Files written: {}\n", summary.files_written()));
    report.push_str(&format!("  Output: {}\n", summary.output_root.display()));

    let elapsed = summary.finished_at - summary.started_at;
    report.push_str(&format!(
        "  Duration: {}.{:03}s\n",
        elapsed.num_seconds(),
        elapsed.num_milliseconds().rem_euclid(1000)
    ));

    report.push_str("\n# Stages:\n");
    for stage in &summary.stages {
        report.push_str(&format!(
            "  {:<12} received {:>5}  emitted {:>5}  skipped {:>5}  failed {:>5}\n",
            stage.stage,
            stage.received,
            stage.emitted,
            stage.skipped,
            stage.total_failed()
        ));
        for (kind, count) in &stage.failed {
            report.push_str(&format!("  {:<12}   {} error(s): {}\n", "", kind, count));
        }
    }

    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    for host in group_by_host(&summary.records) {
        report.push_str(&format!("## {}\n", host.host));
        report.push_str(&format!(
            "  {} map(s), {} file(s)\n\n",
            host.maps.len(),
            host.files_written
        ));
        for map in &host.maps {
            report.push_str(&format!("  {}\n", extract_url_path(map)));
        }
        report.push('\n');
    }

    report
}

pub fn write_report(path: &Path, content: &str) -> Result<(), ScanError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ScanError::io(parent, e))?;
    }
    fs::write(path, content).map_err(|e| ScanError::io(path, e))
}
