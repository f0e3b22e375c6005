// Seed ingestion: one URL per line from stdin, a file, or the command line

use serde::Serialize;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::warn;
use unmapper_scanner::{CrawlTarget, ScanError, Seeder};

/// Where seed URLs come from
#[derive(Debug, Clone)]
pub enum SeedSource {
    /// URLs given directly (e.g. positional CLI arguments)
    Urls(Vec<String>),
    /// A newline-delimited file of URLs
    File(PathBuf),
    /// Newline-delimited URLs on standard input
    Stdin,
}

/// Classification of a single input line
#[derive(Debug, Clone, PartialEq)]
pub enum SeedLine {
    Blank,
    Target(CrawlTarget),
    Invalid(String),
}

/// Counts of accepted and rejected seeds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SeedStats {
    pub accepted: usize,
    pub rejected: usize,
}

/// Parse a single line as a seed URL, trying to add http:// if needed
pub fn parse_seed_line(line: &str) -> SeedLine {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return SeedLine::Blank;
    }

    match CrawlTarget::parse(line) {
        Ok(target) => SeedLine::Target(target),
        Err(e) if !line.contains("://") => match CrawlTarget::parse(&format!("http://{}", line)) {
            Ok(target) => SeedLine::Target(target),
            Err(_) => SeedLine::Invalid(e.to_string()),
        },
        Err(e) => SeedLine::Invalid(e.to_string()),
    }
}

/// Feed every seed from `source` into the pipeline. Invalid lines are
/// reported and skipped; only an unreadable source is an error.
pub async fn feed_seeds(source: SeedSource, seeder: &Seeder) -> Result<SeedStats, ScanError> {
    match source {
        SeedSource::Urls(urls) => {
            let mut stats = SeedStats::default();
            for url in urls {
                feed_line(&url, seeder, &mut stats).await?;
            }
            Ok(stats)
        }
        SeedSource::File(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .map_err(|e| ScanError::io(&path, e))?;
            feed_lines(BufReader::new(file), seeder)
                .await
                .map_err(|e| match e {
                    ScanError::Io { source, .. } => ScanError::io(&path, source),
                    other => other,
                })
        }
        SeedSource::Stdin => feed_lines(BufReader::new(tokio::io::stdin()), seeder).await,
    }
}

/// Feed lines one at a time, without buffering the whole input
pub async fn feed_lines<R>(reader: R, seeder: &Seeder) -> Result<SeedStats, ScanError>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = SeedStats::default();
    let mut lines = reader.lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| ScanError::io("<seeds>", e))?
    {
        feed_line(&line, seeder, &mut stats).await?;
    }
    Ok(stats)
}

async fn feed_line(line: &str, seeder: &Seeder, stats: &mut SeedStats) -> Result<(), ScanError> {
    match parse_seed_line(line) {
        SeedLine::Blank => {}
        SeedLine::Target(target) => {
            seeder.add_target(target).await?;
            stats.accepted += 1;
        }
        SeedLine::Invalid(reason) => {
            warn!(line = line.trim(), "skipping invalid seed: {}", reason);
            stats.rejected += 1;
        }
    }
    Ok(())
}
