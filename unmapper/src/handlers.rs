use anyhow::{Context, bail};
use clap::ArgMatches;
use colored::Colorize;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use unmapper_core::extract::{
    ExtractOptions, ExtractOutcome, ExtractProgressCallback, execute_extract,
};
use unmapper_core::report::{ReportFormat, generate_report, write_report};
use unmapper_core::seed::SeedSource;
use unmapper_scanner::PipelineConfig;

pub fn print_banner() {
    eprintln!(
        "{}",
        r#"
  _   _ _ __  _ __ ___   __ _ _ __  _ __   ___ _ __
 | | | | '_ \| '_ ` _ \ / _` | '_ \| '_ \ / _ \ '__|
 | |_| | | | | | | | | | (_| | |_) | |_) |  __/ |
  \__,_|_| |_|_| |_| |_|\__,_| .__/| .__/ \___|_|
                             |_|   |_|"#
            .bright_cyan()
            .bold()
    );
    eprintln!(
        "  {} {}\n",
        "source maps in, source trees out".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `--debug`.
pub fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Expand a leading `~` in a user-supplied path
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Pick the seed source: positional URLs, then --input, then piped stdin
pub fn resolve_seed_source(
    urls: Vec<String>,
    input: Option<&String>,
    stdin_is_terminal: bool,
) -> anyhow::Result<SeedSource> {
    if !urls.is_empty() {
        Ok(SeedSource::Urls(urls))
    } else if let Some(input) = input {
        Ok(SeedSource::File(expand_path(input)))
    } else if !stdin_is_terminal {
        Ok(SeedSource::Stdin)
    } else {
        bail!("no seeds given: pass URLs, --input <PATH>, or pipe URLs on stdin")
    }
}

pub fn build_config(matches: &ArgMatches) -> PipelineConfig {
    let output = matches
        .get_one::<String>("output")
        .map(|o| expand_path(o))
        .unwrap_or_else(|| PathBuf::from(unmapper_scanner::config::DEFAULT_OUTPUT));

    let mut config = PipelineConfig::new(output);
    if let Some(workers) = matches.get_one::<usize>("workers") {
        config = config.with_workers(*workers);
    }
    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        config = config.with_timeout(Duration::from_secs(*timeout));
    }
    if let Some(chunk_size) = matches.get_one::<usize>("chunk-size") {
        config = config.with_chunk_size(*chunk_size);
    }
    config
}

pub fn report_format(matches: &ArgMatches) -> ReportFormat {
    matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text)
}

pub async fn run_extract(matches: &ArgMatches) -> anyhow::Result<ExtractOutcome> {
    let quiet = matches.get_flag("quiet");
    let urls: Vec<String> = matches
        .get_many::<String>("URL")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let seeds = resolve_seed_source(
        urls,
        matches.get_one::<String>("input"),
        std::io::stdin().is_terminal(),
    )?;
    let config = build_config(matches);

    if !quiet {
        eprintln!(
            "{} Writing to {}  (workers per stage: {}, timeout: {}s)",
            "→".blue(),
            config.output_root.display().to_string().bright_white(),
            config.workers,
            config.timeout.as_secs()
        );
    }
    debug!(?seeds, chunk_size = config.chunk_size, "starting extraction");

    let options = ExtractOptions {
        seeds,
        config,
        show_progress_bars: !quiet
            && !matches.get_flag("no-progress")
            && std::io::stderr().is_terminal(),
    };

    let progress_callback: ExtractProgressCallback = Arc::new(|msg: String| {
        debug!("{}", msg);
    });

    execute_extract(options, Some(progress_callback))
        .await
        .context("extraction failed")
}

pub async fn handle_extract(matches: &ArgMatches) {
    let quiet = matches.get_flag("quiet");

    let outcome = match run_extract(matches).await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{} {:#}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    if !quiet {
        eprintln!(
            "\n{} Extraction complete! {} map(s), {} file(s)\n",
            "✓".green().bold(),
            outcome.summary.maps_extracted(),
            outcome.summary.files_written()
        );
    }

    let report = match generate_report(&outcome, report_format(matches)) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{} Failed to render report: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    match matches.get_one::<String>("report") {
        Some(path) => {
            let path = expand_path(path);
            if let Err(e) = write_report(&path, &report) {
                eprintln!("{} Failed to write report: {}", "✗".red().bold(), e);
                std::process::exit(1);
            }
            if !quiet {
                eprintln!("{} Report saved to {}", "✓".green().bold(), path.display());
            }
        }
        None => print!("{}", report),
    }
}
