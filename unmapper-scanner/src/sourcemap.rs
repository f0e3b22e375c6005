use crate::error::{Result, ScanError};
use crate::sanitize::sanitize_source_path;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The parts of a source map needed to rebuild the original tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMapDocument {
    pub sources: Vec<String>,
    #[serde(rename = "sourcesContent")]
    pub sources_content: Vec<Option<String>>,
}

/// One file to be written: destination path and the bytes that go there.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFile {
    pub source: String,
    pub path: PathBuf,
    pub content: String,
}

impl SourceMapDocument {
    pub fn decode(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sources.len() != self.sources_content.len() {
            return Err(ScanError::Validation(format!(
                "sources has {} entries but sourcesContent has {}",
                self.sources.len(),
                self.sources_content.len()
            )));
        }
        Ok(())
    }

    /// Validates the whole document and resolves every destination path.
    ///
    /// Nothing is written here; any error means the document is rejected as
    /// a whole.
    pub fn plan(&self, output_root: &Path, host: &str) -> Result<Vec<ExtractedFile>> {
        self.validate()?;
        self.sources
            .iter()
            .zip(&self.sources_content)
            .map(|(source, content)| {
                Ok(ExtractedFile {
                    source: source.clone(),
                    path: sanitize_source_path(output_root, host, source)?,
                    content: content.clone().unwrap_or_default(),
                })
            })
            .collect()
    }
}
