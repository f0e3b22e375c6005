use crate::error::{Result, ScanError};
use crate::http;
use crate::stage::{Emitter, Handled, Stage};
use crate::target::{CrawlTarget, is_fetchable};
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, warn};

/// Fetches seed pages and emits every script they reference.
pub struct PageStage {
    client: Client,
}

impl PageStage {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Stage for PageStage {
    type Input = CrawlTarget;
    type Output = CrawlTarget;
    const NAME: &'static str = "pages";

    async fn handle(&self, page: CrawlTarget, out: &Emitter<CrawlTarget>) -> Result<Handled> {
        debug!(url = %page, "checking page");
        let body = http::get(&self.client, &page).await?.text().await?;
        let references = extract_script_refs(&body)?;
        debug!(url = %page, scripts = references.len(), "script references found");

        for reference in references {
            match resolve_script(&page, &reference) {
                Ok(Some(script)) => out.emit(script).await?,
                Ok(None) => debug!(url = %page, reference = %reference, "skipping non-http script"),
                Err(e) => warn!(stage = Self::NAME, url = %page, reference = %reference, "parse script url: {}", e),
            }
        }
        Ok(Handled::Processed)
    }
}

/// `src` then `data-src` of every `<script>` element, in document order.
pub fn extract_script_refs(html: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let selector =
        Selector::parse("script").map_err(|e| ScanError::Parse(format!("script selector: {:?}", e)))?;

    let mut references = Vec::new();
    for element in document.select(&selector) {
        for attr in ["src", "data-src"] {
            if let Some(value) = element.value().attr(attr).map(str::trim)
                && !value.is_empty()
            {
                references.push(value.to_string());
            }
        }
    }
    Ok(references)
}

/// Resolves a script reference against its page. `Ok(None)` means the
/// reference points at something that is never fetched (`data:`, `javascript:`).
pub fn resolve_script(page: &CrawlTarget, reference: &str) -> Result<Option<CrawlTarget>> {
    let url = page.join(reference)?;
    if !is_fetchable(&url) {
        return Ok(None);
    }
    CrawlTarget::new(url).map(Some)
}
