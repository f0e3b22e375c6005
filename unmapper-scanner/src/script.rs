use crate::error::{Result, ScanError};
use crate::http;
use crate::locator::{LocatorScanner, header_locator};
use crate::stage::{Emitter, Handled, Stage};
use crate::target::CrawlTarget;
use crate::visited::VisitedSet;
use reqwest::{Client, Response};
use tracing::debug;

/// Fetches each distinct script once and emits its source map URL, if any.
pub struct ScriptStage {
    client: Client,
    visited: VisitedSet,
    chunk_size: usize,
}

impl ScriptStage {
    pub fn new(client: Client, chunk_size: usize) -> Self {
        Self {
            client,
            visited: VisitedSet::new(),
            chunk_size,
        }
    }

    pub async fn visited_count(&self) -> usize {
        self.visited.len().await
    }

    /// Headers first, then the body comment.
    async fn locate(&self, response: &mut Response) -> Result<Option<String>> {
        if let Some(locator) = header_locator(response.headers()) {
            return Ok(Some(locator));
        }
        scan_body(response, self.chunk_size).await
    }
}

impl Stage for ScriptStage {
    type Input = CrawlTarget;
    type Output = CrawlTarget;
    const NAME: &'static str = "scripts";

    async fn handle(&self, script: CrawlTarget, out: &Emitter<CrawlTarget>) -> Result<Handled> {
        if !self.visited.claim(script.as_str()).await {
            debug!(url = %script, "script already visited");
            return Ok(Handled::Skipped);
        }

        debug!(url = %script, "checking script");
        let mut response = http::get(&self.client, &script).await?;
        let Some(locator) = self.locate(&mut response).await? else {
            debug!(url = %script, "no source map found");
            return Ok(Handled::Processed);
        };

        let map_url = resolve_locator(&script, &locator)?;
        debug!(url = %script, map = %map_url, "source map located");
        out.emit(map_url).await?;
        Ok(Handled::Processed)
    }
}

/// Streams the body through a [`LocatorScanner`], stopping at the first match.
pub async fn scan_body(response: &mut Response, chunk_size: usize) -> Result<Option<String>> {
    let mut scanner = LocatorScanner::new(chunk_size);
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| ScanError::Body(e.to_string()))?
    {
        if let Some(locator) = scanner.feed(&chunk) {
            return Ok(Some(locator));
        }
    }
    Ok(scanner.finish())
}

pub fn resolve_locator(script: &CrawlTarget, locator: &str) -> Result<CrawlTarget> {
    script
        .join(locator)
        .and_then(CrawlTarget::new)
        .map_err(|e| ScanError::LocatorParse(format!("{:?}: {}", locator, e)))
}
