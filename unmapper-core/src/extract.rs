use crate::seed::{SeedSource, SeedStats, feed_seeds};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use unmapper_scanner::{Pipeline, PipelineConfig, RunSummary, ScanError};
use url::Url;

/// Options for configuring an extraction run
pub struct ExtractOptions {
    pub seeds: SeedSource,
    pub config: PipelineConfig,
    pub show_progress_bars: bool,
}

/// Callback for reporting extraction progress
pub type ExtractProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct ExtractOutcome {
    pub seeds: SeedStats,
    pub summary: RunSummary,
}

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Run the pipeline over every seed in `options.seeds` and wait for it to drain
pub async fn execute_extract(
    options: ExtractOptions,
    progress_callback: Option<ExtractProgressCallback>,
) -> Result<ExtractOutcome, ScanError> {
    let ExtractOptions {
        seeds,
        config,
        show_progress_bars,
    } = options;

    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .map_err(|e| ScanError::Parse(e.to_string()))?,
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Waiting for source maps...");
        Some(pb)
    } else {
        None
    };

    let pipeline = Pipeline::new(config)?;
    let (seeder, running) = pipeline.launch();

    // Seeds are fed from their own task; the records must be drained here at
    // the same time or the bounded queues stall.
    let feeder = tokio::spawn(async move {
        let result = feed_seeds(seeds, &seeder).await;
        seeder.close();
        result
    });

    let mut extracted = 0usize;
    let summary = running
        .wait_with(|record| {
            extracted += 1;
            let message = format!(
                "{} map(s) extracted, latest: {} {}",
                extracted,
                record.host,
                extract_url_path(&record.map_url)
            );
            if let Some(ref pb) = progress_bar {
                pb.set_message(message.clone());
            }
            if let Some(ref callback) = progress_callback {
                callback(message);
            }
        })
        .await;

    if let Some(ref pb) = progress_bar {
        pb.finish_and_clear();
    }

    let seeds = feeder.await??;
    Ok(ExtractOutcome {
        seeds,
        summary: summary?,
    })
}
