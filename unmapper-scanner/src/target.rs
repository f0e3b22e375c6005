use crate::error::{Result, ScanError};
use std::fmt;
use url::Url;

/// An absolute http(s) URL together with the hostname its output lands under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrawlTarget {
    url: Url,
    host: String,
}

impl CrawlTarget {
    pub fn new(mut url: Url) -> Result<Self> {
        if !is_fetchable(&url) {
            return Err(ScanError::InvalidUrl(format!(
                "unsupported scheme '{}' in {}",
                url.scheme(),
                url
            )));
        }
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ScanError::InvalidUrl(format!("missing host in {}", url)))?
            .to_string();
        url.set_fragment(None);
        Ok(Self { url, host })
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw.trim())
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", raw.trim(), e)))?;
        Self::new(url)
    }

    /// Resolve `reference` (absolute or relative) against this target's URL.
    pub fn join(&self, reference: &str) -> Result<Url> {
        let mut url = self
            .url
            .join(reference.trim())
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", reference, e)))?;
        url.set_fragment(None);
        Ok(url)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl fmt::Display for CrawlTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

pub fn is_fetchable(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}
