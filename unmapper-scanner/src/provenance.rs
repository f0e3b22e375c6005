use crate::error::{Result, ScanError};
use crate::maps::ExtractedMap;
use crate::result::ProvenanceRecord;
use crate::sanitize::{PROVENANCE_FILE, host_dir};
use crate::stage::{Emitter, Handled, Stage};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Appends each extracted map's URL to its host's `_sources.txt`.
pub struct ProvenanceStage {
    output_root: PathBuf,
}

impl ProvenanceStage {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    pub fn log_path(&self, host: &str) -> Result<PathBuf> {
        Ok(host_dir(&self.output_root, host)?.join(PROVENANCE_FILE))
    }
}

impl Stage for ProvenanceStage {
    type Input = ExtractedMap;
    type Output = ProvenanceRecord;
    const NAME: &'static str = "provenance";

    async fn handle(&self, extracted: ExtractedMap, out: &Emitter<ProvenanceRecord>) -> Result<Handled> {
        let log_path = self.log_path(extracted.map.host())?;
        debug!(path = %log_path.display(), "writing _sources.txt");
        append_line(&log_path, extracted.map.as_str()).await?;

        out.emit(ProvenanceRecord {
            host: extracted.map.host().to_string(),
            map_url: extracted.map.to_string(),
            files_written: extracted.files_written,
            log_path,
        })
        .await?;
        Ok(Handled::Processed)
    }
}

/// Opens `path` for append, writes `line` plus a newline, and closes it again.
pub async fn append_line(path: &Path, line: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ScanError::io(parent, e))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| ScanError::io(path, e))?;
    let mut entry = String::with_capacity(line.len() + 1);
    entry.push_str(line);
    entry.push('\n');
    file.write_all(entry.as_bytes())
        .await
        .map_err(|e| ScanError::io(path, e))?;
    file.flush().await.map_err(|e| ScanError::io(path, e))?;
    Ok(())
}
