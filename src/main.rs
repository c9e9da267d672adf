//! a3s-transcript - Kore.ai chat-history extraction with PII masking
//!
//! Pulls every message in a date range, groups it by session, masks PII, and
//! writes one CSV row per session.

use a3s_transcript::config::duration_serde::parse_duration;
use a3s_transcript::{
    export, ExtractionConfig, ExtractionPipeline, PatternCatalog, PiiMasker, TranscriptError,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "a3s-transcript")]
#[command(author = "A3S Lab Team")]
#[command(version)]
#[command(about = "Extract Kore.ai chat history with PII masking")]
struct Cli {
    /// Configuration file path (.hcl)
    #[arg(short, long, env = "A3S_TRANSCRIPT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, mask, and export chat history
    Extract {
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Mask text read from a file or stdin
    Mask {
        /// Input file (stdin if not specified)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Print per-category counts to stderr
        #[arg(long)]
        counts: bool,
    },

    /// Show the effective configuration
    Config {
        #[command(flatten)]
        overrides: Overrides,
    },
}

#[derive(clap::Args)]
struct Overrides {
    /// Kore.ai base URL
    #[arg(long, env = "KORE_BASE_URL")]
    base_url: Option<String>,

    /// Bot stream ID
    #[arg(long, env = "KORE_STREAM_ID")]
    stream_id: Option<String>,

    /// JWT token for the auth header
    #[arg(long, env = "KORE_JWT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<String>,

    /// End date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<String>,

    /// Output CSV path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Messages per page
    #[arg(long)]
    page_size: Option<u32>,

    /// Delay between page requests (e.g. 5s, 500ms)
    #[arg(long, value_parser = parse_duration)]
    delay: Option<Duration>,
}

impl Overrides {
    fn apply(self, config: &mut ExtractionConfig) {
        if let Some(v) = self.base_url {
            config.base_url = v;
        }
        if let Some(v) = self.stream_id {
            config.stream_id = v;
        }
        if let Some(v) = self.token {
            config.token = v;
        }
        if let Some(v) = self.from {
            config.date_from = v;
        }
        if let Some(v) = self.to {
            config.date_to = v;
        }
        if let Some(v) = self.output {
            config.output = v;
        }
        if let Some(v) = self.page_size {
            config.page_size = v;
        }
        if let Some(v) = self.delay {
            config.request_delay = v;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("a3s_transcript={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let mut config = match &cli.config {
        Some(path) => ExtractionConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ExtractionConfig::default(),
    };

    match cli.command {
        Commands::Extract { overrides } => {
            overrides.apply(&mut config);
            run_extract(&config).await
        }
        Commands::Mask { input, counts } => run_mask(&config, input, counts),
        Commands::Config { overrides } => {
            overrides.apply(&mut config);
            println!("{}", config);
            Ok(())
        }
    }
}

async fn run_extract(config: &ExtractionConfig) -> Result<()> {
    config.validate().context("Invalid configuration")?;
    let range = config.date_range()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            let _ = shutdown_tx.send(true);
        }
    });

    let pipeline = ExtractionPipeline::from_config(config)?.with_shutdown(shutdown_rx);

    let extraction = match pipeline.run(&range).await {
        Ok(extraction) => extraction,
        Err(TranscriptError::Cancelled) => {
            anyhow::bail!("Extraction cancelled; no output written")
        }
        Err(e) => return Err(e).context("Extraction failed"),
    };

    let rows = export::write_csv(&config.output, &extraction.transcripts)
        .with_context(|| format!("Failed to write {}", config.output.display()))?;

    let report = &extraction.report;
    tracing::info!(
        run_id = %report.run_id,
        messages = report.messages_retrieved,
        requests = report.requests,
        sessions = report.sessions,
        redactions = report.counts.total(),
        "Extraction complete"
    );
    println!(
        "Wrote {} sessions ({} messages) to {}",
        rows,
        report.messages_retrieved,
        config.output.display()
    );
    Ok(())
}

fn run_mask(config: &ExtractionConfig, input: Option<PathBuf>, counts: bool) -> Result<()> {
    let text = match input {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let catalog = PatternCatalog::new(&config.catalog).context("Invalid catalog configuration")?;
    let masked = PiiMasker::new(Arc::new(catalog)).mask(&text);

    let mut stdout = io::stdout().lock();
    stdout.write_all(masked.text.as_bytes())?;
    stdout.flush()?;

    if counts {
        let mut stderr = io::stderr().lock();
        for (category, n) in masked.counts.iter().filter(|(_, n)| *n > 0) {
            writeln!(stderr, "{:<16} {}", category.tag(), n)?;
        }
        writeln!(stderr, "{:<16} {}", "TOTAL", masked.counts.total())?;
    }
    Ok(())
}
