//! repscore-cli: command-line client for the Repscore HTTP API
//!
//! # Subcommands
//! - `score <legislator-id> [--json]`  : published representation score
//! - `refresh [--secret <token>]`       : trigger a full refresh cycle
//! - `sentiment <bill-id> [--json]`     : constituent support/oppose totals
//! - `status`                           : show server health

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8787";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "repscore-cli", version, about = "Representation score client")]
struct Cli {
    /// Repscore HTTP server URL (overrides REPSCORE_HTTP_URL env var)
    #[arg(long, env = "REPSCORE_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show a legislator's published score
    Score {
        legislator_id: String,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Recompute every active legislator's score
    Refresh {
        /// Shared refresh secret
        #[arg(long, env = "REPSCORE_CRON_SECRET", hide_env_values = true)]
        secret: String,
    },

    /// Show constituent sentiment for a bill
    Sentiment {
        bill_id: String,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Show Repscore server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ScoreView {
    pub legislator_id: String,
    pub score: f64,
    pub bills_analyzed: u32,
    pub last_calculated: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SentimentView {
    pub bill_id: String,
    pub status: String,
    pub support: u64,
    pub oppose: u64,
}

#[derive(Debug, Deserialize)]
pub struct RefreshView {
    pub updated: usize,
    pub errors: Vec<String>,
    pub elapsed_ms: u64,
}

// ============================================================================
// Formatting
// ============================================================================

pub fn format_score(view: &ScoreView) -> String {
    let mut out = format!(
        "Legislator:      {}\nScore:           {:.2}%\nBills analyzed:  {}",
        view.legislator_id, view.score, view.bills_analyzed
    );
    if let Some(at) = &view.last_calculated {
        out.push_str(&format!("\nLast calculated: {at}"));
    }
    out
}

pub fn format_sentiment(view: &SentimentView) -> String {
    let total = view.support + view.oppose;
    let share = |n: u64| {
        if total == 0 {
            0.0
        } else {
            n as f64 * 100.0 / total as f64
        }
    };
    format!(
        "Bill:    {} ({})\nSupport: {} ({:.0}%)\nOppose:  {} ({:.0}%)",
        view.bill_id,
        view.status,
        view.support,
        share(view.support),
        view.oppose,
        share(view.oppose)
    )
}

pub fn format_refresh(view: &RefreshView) -> String {
    let mut out = format!(
        "Updated {} legislator(s) in {} ms, {} failure(s)",
        view.updated,
        view.elapsed_ms,
        view.errors.len()
    );
    for err in &view.errors {
        out.push_str(&format!("\n  - {err}"));
    }
    out
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client(timeout_secs: u64) -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()?)
}

/// Fail with the server's error message on a non-2xx response.
fn read_json(resp: reqwest::blocking::Response) -> anyhow::Result<serde_json::Value> {
    let status = resp.status();
    let body: serde_json::Value = resp.json().unwrap_or_default();
    if !status.is_success() {
        let msg = body["error"].as_str().unwrap_or("no details");
        bail!("server returned {}: {}", status, msg);
    }
    Ok(body)
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn do_score(server: &str, legislator_id: &str, json_output: bool) -> anyhow::Result<()> {
    let url = format!("{}/legislators/{}/score", server, legislator_id);
    let resp = client(10)?
        .get(&url)
        .send()
        .with_context(|| format!("connection failed to {url}"))?;
    let body = read_json(resp)?;

    if json_output {
        return print_json(&body);
    }
    let view: ScoreView = serde_json::from_value(body).context("unexpected score response")?;
    println!("{}", format_score(&view));
    Ok(())
}

fn do_refresh(server: &str, secret: &str) -> anyhow::Result<()> {
    let url = format!("{}/refresh", server);
    // A full cycle can take a while on a large roster.
    let resp = client(300)?
        .post(&url)
        .bearer_auth(secret)
        .send()
        .with_context(|| format!("connection failed to {url}"))?;
    let body = read_json(resp)?;

    let view: RefreshView = serde_json::from_value(body).context("unexpected refresh response")?;
    println!("{}", format_refresh(&view));
    if !view.errors.is_empty() {
        bail!("{} legislator(s) failed to refresh", view.errors.len());
    }
    Ok(())
}

fn do_sentiment(server: &str, bill_id: &str, json_output: bool) -> anyhow::Result<()> {
    let url = format!("{}/bills/{}/sentiment", server, bill_id);
    let resp = client(10)?
        .get(&url)
        .send()
        .with_context(|| format!("connection failed to {url}"))?;
    let body = read_json(resp)?;

    if json_output {
        return print_json(&body);
    }
    let view: SentimentView =
        serde_json::from_value(body).context("unexpected sentiment response")?;
    println!("{}", format_sentiment(&view));
    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/health", server);
    let resp = client(10)?
        .get(&url)
        .send()
        .with_context(|| format!("cannot reach {url}"))?;

    if !resp.status().is_success() {
        bail!("server unhealthy (HTTP {})", resp.status());
    }
    let body: serde_json::Value = resp.json().unwrap_or_default();
    println!("Repscore server: {}", body["status"].as_str().unwrap_or("unknown"));
    println!("Version:         {}", body["version"].as_str().unwrap_or("?"));
    println!("Store:           {}", body["store"].as_str().unwrap_or("?"));
    println!("Socket:          {}", body["socket"].as_str().unwrap_or("?"));
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Score {
            legislator_id,
            json,
        } => do_score(&server, &legislator_id, json),
        Commands::Refresh { secret } => do_refresh(&server, &secret),
        Commands::Sentiment { bill_id, json } => do_sentiment(&server, &bill_id, json),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("repscore-cli: {:#}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
