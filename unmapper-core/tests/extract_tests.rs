// Tests for running a whole extraction through the core API

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use unmapper_core::extract::{ExtractOptions, ExtractProgressCallback, execute_extract, extract_url_path};
use unmapper_core::seed::SeedSource;
use unmapper_scanner::{PipelineConfig, ScanError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// URL Path Extraction Tests
// ============================================================================

#[test]
fn test_extract_url_path_root() {
    assert_eq!(extract_url_path("http://example.com/"), "/");
    assert_eq!(extract_url_path("http://example.com"), "/");
}

#[test]
fn test_extract_url_path_nested() {
    assert_eq!(extract_url_path("http://example.com/static/js/app.js.map"), "/static/js/app.js.map");
}

#[test]
fn test_extract_url_path_drops_query() {
    assert_eq!(extract_url_path("http://example.com/app.js.map?v=3"), "/app.js.map");
}

#[test]
fn test_extract_url_path_invalid_url() {
    assert_eq!(extract_url_path("not-a-url"), "not-a-url");
}

// ============================================================================
// Extraction Tests
// ============================================================================

async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><script src="/static/main.js"></script></head></html>"#,
        ))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/static/main.js"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("run();\n//# sourceMappingURL=main.js.map\n"),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/static/main.js.map"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"version":3,"sources":["webpack:///src/App.tsx","webpack:///src/index.tsx"],"sourcesContent":["export default App","import App from './App'"]}"#,
        ))
        .mount(server)
        .await;
}

fn options(root: &TempDir, seeds: SeedSource) -> ExtractOptions {
    ExtractOptions {
        seeds,
        config: PipelineConfig::new(root.path())
            .with_workers(2)
            .with_timeout(Duration::from_secs(5)),
        show_progress_bars: false,
    }
}

#[tokio::test]
async fn test_execute_extract_from_urls() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let root = TempDir::new().unwrap();

    let outcome = execute_extract(options(&root, SeedSource::Urls(vec![server.uri()])), None)
        .await
        .unwrap();

    assert_eq!(outcome.seeds.accepted, 1);
    assert_eq!(outcome.summary.maps_extracted(), 1);
    assert_eq!(outcome.summary.files_written(), 2);

    let host_dir = root.path().join("127.0.0.1");
    assert_eq!(
        std::fs::read_to_string(host_dir.join("src/App.tsx")).unwrap(),
        "export default App"
    );
    assert!(host_dir.join("src/index.tsx").exists());
    assert!(host_dir.join("_sources.txt").exists());
}

#[tokio::test]
async fn test_execute_extract_from_file_reports_progress() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let root = TempDir::new().unwrap();
    let seeds = root.path().join("seeds.txt");
    std::fs::write(&seeds, format!("# targets\n{}/\n\nnot a url\n", server.uri())).unwrap();

    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();
    let callback: ExtractProgressCallback = Arc::new(move |msg: String| {
        sink.lock().unwrap().push(msg);
    });

    let outcome = execute_extract(options(&root, SeedSource::File(seeds)), Some(callback))
        .await
        .unwrap();

    assert_eq!(outcome.seeds.accepted, 1);
    assert_eq!(outcome.seeds.rejected, 1);
    let messages = messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("/static/main.js.map"));
}

#[tokio::test]
async fn test_execute_extract_unreadable_seed_file() {
    let root = TempDir::new().unwrap();
    let missing = root.path().join("missing.txt");

    let result = execute_extract(options(&root, SeedSource::File(missing)), None).await;
    assert!(matches!(result, Err(ScanError::Io { .. })));
}
