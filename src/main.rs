//! GraphQL query guard CLI.
//!
//! Run with: `graphql-query-guard --config guard.yaml query.graphql`
//!
//! Reads a request body (raw GraphQL or a `{"query": ...}` JSON envelope) from a
//! file or stdin, applies the validation policy and reports the verdict. Exits
//! with status 1 when the query is rejected.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use graphql_query_guard::{
    graphql_error_response, AnalysisMetrics, GuardConfig, QueryValidator, Schema, Violation,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::io::AsyncReadExt;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Check GraphQL documents against depth, alias, complexity and introspection limits.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long, default_value = "guard.yaml")]
    config: PathBuf,

    /// Request body to check; `-` reads stdin
    #[arg(default_value = "-")]
    input: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let log_level = args.log_level.parse().unwrap_or(Level::WARN);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let config = if args.config.exists() {
        let content = tokio::fs::read_to_string(&args.config)
            .await
            .context("Failed to read config file")?;
        GuardConfig::from_yaml(&content).context("Failed to parse config file")?
    } else {
        info!("Config file {} not found, using defaults", args.config.display());
        GuardConfig::default()
    };

    let body = read_input(&args.input).await?;
    let validator = QueryValidator::new(config).context("Invalid configuration")?;

    let result = validator.analyze(&body, &Schema::default());
    match args.format {
        Format::Text => print_text(&result),
        Format::Json => print_json(&result)?,
    }

    Ok(if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn read_input(input: &Path) -> Result<String> {
    if input.as_os_str() == "-" {
        let mut body = String::new();
        tokio::io::stdin()
            .read_to_string(&mut body)
            .await
            .context("Failed to read stdin")?;
        Ok(body)
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Failed to read {}", input.display()))
    }
}

fn print_text(result: &Result<AnalysisMetrics, Violation>) {
    match result {
        Ok(metrics) if !metrics.parsed => {
            println!("allowed (not parsed; deferred to executor)");
        }
        Ok(metrics) => {
            println!("allowed");
            if let Some(depth) = metrics.depth {
                println!("  depth:      {}", depth);
            }
            if let Some(aliases) = metrics.aliases {
                println!("  aliases:    {}", aliases);
            }
            if let Some(complexity) = metrics.complexity {
                println!("  complexity: {}", complexity);
            }
        }
        Err(violation) => println!("rejected [{}]: {}", violation.code, violation.message),
    }
}

fn print_json(result: &Result<AnalysisMetrics, Violation>) -> Result<()> {
    let output = match result {
        Ok(metrics) => json!({ "allowed": true, "metrics": metrics }),
        Err(violation) => {
            let mut output = graphql_error_response(std::slice::from_ref(violation));
            output["allowed"] = json!(false);
            output
        }
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("Failed to encode output")?
    );
    Ok(())
}
