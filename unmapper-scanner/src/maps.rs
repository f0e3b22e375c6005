use crate::error::{Result, ScanError};
use crate::http;
use crate::sourcemap::{ExtractedFile, SourceMapDocument};
use crate::stage::{Emitter, Handled, Stage};
use crate::target::CrawlTarget;
use reqwest::Client;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

/// A map whose files are all on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedMap {
    pub map: CrawlTarget,
    pub files_written: usize,
}

impl fmt::Display for ExtractedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.map, f)
    }
}

/// Fetches source maps and writes their embedded sources under the output root.
pub struct MapStage {
    client: Client,
    output_root: PathBuf,
}

impl MapStage {
    pub fn new(client: Client, output_root: impl Into<PathBuf>) -> Self {
        Self {
            client,
            output_root: output_root.into(),
        }
    }
}

impl Stage for MapStage {
    type Input = CrawlTarget;
    type Output = ExtractedMap;
    const NAME: &'static str = "maps";

    async fn handle(&self, map: CrawlTarget, out: &Emitter<ExtractedMap>) -> Result<Handled> {
        debug!(url = %map, "reading map");
        let body = http::get(&self.client, &map).await?.bytes().await?;
        let document = SourceMapDocument::decode(&body)?;
        let files = document.plan(&self.output_root, map.host())?;
        let files_written = write_files(&files).await?;

        info!(url = %map, files = files_written, "source map extracted");
        out.emit(ExtractedMap { map, files_written }).await?;
        Ok(Handled::Processed)
    }
}

/// Writes planned files in order, stopping at the first failure.
pub async fn write_files(files: &[ExtractedFile]) -> Result<usize> {
    for file in files {
        if let Some(parent) = file.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ScanError::io(parent, e))?;
        }
        debug!(path = %file.path.display(), "writing file");
        tokio::fs::write(&file.path, file.content.as_bytes())
            .await
            .map_err(|e| ScanError::io(&file.path, e))?;
    }
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::StageCounters;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::mpsc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn serve_map(body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app.js.map"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
            .mount(&server)
            .await;
        server
    }

    async fn run_map(server: &MockServer, root: &TempDir) -> (Result<Handled>, Option<ExtractedMap>) {
        let (tx, mut rx) = mpsc::channel(1);
        let out = Emitter::new("maps", tx, Arc::new(StageCounters::default()));
        let stage = MapStage::new(Client::new(), root.path());
        let map = CrawlTarget::parse(&format!("{}/app.js.map", server.uri())).unwrap();
        let result = stage.handle(map, &out).await;
        drop(out);
        (result, rx.recv().await)
    }

    fn count_files(dir: &std::path::Path) -> usize {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return 0;
        };
        entries
            .flatten()
            .map(|e| {
                let p = e.path();
                if p.is_dir() { count_files(&p) } else { 1 }
            })
            .sum()
    }

    #[tokio::test]
    async fn test_extracts_files_under_host() {
        let server = serve_map(
            r#"{"sources":["webpack:///src/a.js","webpack:///src/lib/b.js"],"sourcesContent":["console.log(1)","export {}"]}"#,
        )
        .await;
        let root = TempDir::new().unwrap();

        let (result, emitted) = run_map(&server, &root).await;
        assert_eq!(result.unwrap(), Handled::Processed);
        let emitted = emitted.unwrap();
        assert_eq!(emitted.files_written, 2);
        assert_eq!(emitted.map.as_str(), format!("{}/app.js.map", server.uri()));

        let host = root.path().join("127.0.0.1");
        assert_eq!(std::fs::read_to_string(host.join("src/a.js")).unwrap(), "console.log(1)");
        assert_eq!(std::fs::read_to_string(host.join("src/lib/b.js")).unwrap(), "export {}");
    }

    #[tokio::test]
    async fn test_length_mismatch_writes_nothing() {
        let server = serve_map(r#"{"sources":["a.js","b.js"],"sourcesContent":["a"]}"#).await;
        let root = TempDir::new().unwrap();

        let (result, emitted) = run_map(&server, &root).await;
        assert!(matches!(result, Err(ScanError::Validation(_))));
        assert!(emitted.is_none());
        assert_eq!(count_files(root.path()), 0);
    }

    #[tokio::test]
    async fn test_external_entry_writes_nothing() {
        let server = serve_map(
            r#"{"sources":["webpack:///src/a.js","webpack:///external \"react\""],"sourcesContent":["a",null]}"#,
        )
        .await;
        let root = TempDir::new().unwrap();

        let (result, emitted) = run_map(&server, &root).await;
        assert_eq!(result.unwrap_err().kind(), "validation");
        assert!(emitted.is_none());
        assert_eq!(count_files(root.path()), 0);
    }

    #[tokio::test]
    async fn test_traversal_lands_inside_host_root() {
        let server = serve_map(r#"{"sources":["../../etc/passwd"],"sourcesContent":["root:x:0:0"]}"#).await;
        let root = TempDir::new().unwrap();

        let (result, _) = run_map(&server, &root).await;
        result.unwrap();
        let written = root.path().join("127.0.0.1/etc/passwd");
        assert_eq!(std::fs::read_to_string(written).unwrap(), "root:x:0:0");
        assert_eq!(count_files(root.path()), 1);
    }

    #[tokio::test]
    async fn test_malformed_json_is_decode_error() {
        let server = serve_map("<!doctype html><p>not found</p>").await;
        let root = TempDir::new().unwrap();
        let (result, _) = run_map(&server, &root).await;
        assert!(matches!(result, Err(ScanError::Decode(_))));
    }

    #[tokio::test]
    async fn test_reextraction_overwrites() {
        let server = serve_map(r#"{"sources":["a.js"],"sourcesContent":["new"]}"#).await;
        let root = TempDir::new().unwrap();
        let target = root.path().join("127.0.0.1/a.js");
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&target, "old and longer content").unwrap();

        run_map(&server, &root).await.0.unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
    }
}
