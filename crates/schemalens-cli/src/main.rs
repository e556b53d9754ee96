use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use schemalens_cli::summary::render_summary;
use schemalens_cli::{Cli, Settings, build_analyzer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("schemalens=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let input_url = cli.input_url()?;

    let settings =
        Settings::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    let settings = cli.apply(settings);
    let analyzer = build_analyzer(&cli, &settings)?;

    let report = analyzer
        .analyze(input_url.as_str(), &cli.keyword)
        .await
        .with_context(|| format!("analysis of {input_url} failed"))?;

    let output = if cli.summary {
        render_summary(&report)
    } else {
        serde_json::to_string_pretty(&report)?
    };

    if let Some(path) = &cli.save {
        fs::write(path, &output)
            .with_context(|| format!("failed to write output to {}", path.display()))?;
        eprintln!("💾 Saved output to {}", path.display());
    }

    println!("{output}");
    Ok(())
}
