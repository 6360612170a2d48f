//! Umbau command-line interface.
//!
//! Thin wrapper over the library: resolves the input path, runs the batch
//! conversion, prints a per-file summary (or JSON with `--json`) and exits
//! non-zero when anything failed. All conversion logic lives in the `umbau`
//! crate.

use anyhow::{Context, bail};
use clap::Parser;
use std::path::PathBuf;
use umbau::{BatchConversionResult, ConversionConfig, ConversionRequest, convert_path, convert_request};

#[derive(Parser, Debug)]
#[command(
    name = "umbau",
    version,
    about = "Convert legacy office documents and MHT archives to modern formats"
)]
struct Cli {
    /// File or directory to convert
    path: PathBuf,

    /// Destination directory (default: next to each input file)
    #[arg(long, value_name = "DIR")]
    dest: Option<PathBuf>,

    /// Output extensions to produce (single-file mode only; default: registry rules)
    #[arg(long = "to", value_name = "EXT")]
    outputs: Vec<String>,

    /// Timeout for external tool invocations, in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Maximum concurrent file conversions
    #[arg(long, value_name = "N")]
    jobs: Option<usize>,

    /// Load configuration from a TOML file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit the batch result as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

fn build_config(cli: &Cli) -> anyhow::Result<ConversionConfig> {
    let mut config = match &cli.config {
        Some(path) => ConversionConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ConversionConfig::default(),
    };
    if let Some(timeout) = cli.timeout {
        config.process_timeout_secs = timeout;
    }
    if let Some(jobs) = cli.jobs {
        config.max_concurrent = Some(jobs);
    }
    Ok(config)
}

fn print_summary(batch: &BatchConversionResult) {
    println!("=== Conversion Summary ===");
    for result in &batch.results {
        println!("{}", result.source_path.display());
        for (ext, path) in &result.outputs {
            println!("  -> {} ({})", path.display(), ext);
        }
        for attempt in result.attempts.iter().filter(|a| !a.succeeded) {
            println!(
                "  !! {} via {}: {}",
                attempt.output_extension,
                attempt.backend,
                attempt.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    for failure in &batch.failures {
        println!("{}\n  !! {}", failure.source_path.display(), failure.error);
    }

    let converted = batch.results.iter().filter(|r| r.overall_succeeded).count();
    let failed = batch.results.len() - converted + batch.failures.len();
    println!("{} converted, {} failed", converted, failed);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;

    if !cli.path.exists() {
        bail!("path does not exist: {}", cli.path.display());
    }

    let batch = if !cli.outputs.is_empty() {
        if !cli.path.is_file() {
            bail!("--to requires a single file input");
        }
        let mut request = ConversionRequest::new(&cli.path).with_outputs(cli.outputs.clone());
        if let Some(dest) = &cli.dest {
            request = request.with_destination(dest);
        }
        let result = convert_request(&request, &config).await?;
        BatchConversionResult {
            results: vec![result],
            failures: vec![],
        }
    } else {
        convert_path(&cli.path, cli.dest.as_deref(), &config).await?
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&batch)?);
    } else {
        print_summary(&batch);
    }

    if !batch.all_succeeded() {
        std::process::exit(1);
    }
    Ok(())
}
