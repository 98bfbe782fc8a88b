//! Command-line configuration.

use crate::inspector::DEFAULT_REFRESH_THRESHOLD_SECS;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Locate and inspect bearer tokens held by a web page's client-side code.
#[derive(Parser, Debug, Clone)]
#[command(name = "jwtscout")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Print full tokens instead of a 50-character preview
    #[arg(long, global = true)]
    pub reveal: bool,

    /// Seconds before expiry at which a token is flagged for refresh
    #[arg(long, global = true, default_value_t = DEFAULT_REFRESH_THRESHOLD_SECS)]
    pub refresh_threshold: i64,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Open pages in a browser and search them for a bearer token
    Scan(ScanConfig),
    /// Search a previously captured page snapshot (JSON)
    Snapshot(SnapshotConfig),
    /// Decode and check a single token
    Inspect(InspectConfig),
    /// List bearer tokens recorded in a HAR capture
    Har(HarConfig),
    /// Download and set up a managed Chromium browser
    Setup(SetupConfig),
}

/// Configuration for the setup command.
#[derive(Args, Debug, Clone)]
pub struct SetupConfig {
    /// Force re-download even if Chromium is already installed
    #[arg(long)]
    pub force: bool,
}

/// Configuration for the snapshot command.
#[derive(Args, Debug, Clone)]
pub struct SnapshotConfig {
    /// Snapshot file
    pub path: PathBuf,
}

/// Configuration for the inspect command.
#[derive(Args, Debug, Clone)]
pub struct InspectConfig {
    /// Token to inspect, or `-` to read it from stdin
    pub token: String,
}

/// Configuration for the har command.
#[derive(Args, Debug, Clone)]
pub struct HarConfig {
    /// HAR file
    pub path: PathBuf,
}

/// Configuration for the scan command.
#[derive(Args, Debug, Clone)]
pub struct ScanConfig {
    /// Target URL(s) to search
    #[arg(required_unless_present = "file")]
    pub targets: Vec<String>,

    /// File containing URLs (one per line)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Page load timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Milliseconds to wait after load before reading the page
    #[arg(long, default_value = "1500")]
    pub settle_ms: u64,

    /// Number of times to read the page before giving up
    #[arg(long, default_value = "1")]
    pub attempts: u32,

    /// Seconds between attempts
    #[arg(long, default_value = "3")]
    pub interval: u64,

    /// Show the browser window (e.g. to log in while --attempts waits)
    #[arg(long)]
    pub headful: bool,

    /// Browser profile directory to reuse, so existing logins are visible
    #[arg(long, env = "JWTSCOUT_PROFILE_DIR")]
    pub profile_dir: Option<PathBuf>,

    /// Path to Chrome/Chromium executable (overrides auto-detection)
    #[arg(long, env = "JWTSCOUT_CHROME")]
    pub chrome_path: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            file: None,
            timeout: 30,
            settle_ms: 1500,
            attempts: 1,
            interval: 3,
            headful: false,
            profile_dir: None,
            chrome_path: None,
        }
    }
}

impl ScanConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// Targets from the command line and `--file`, normalized to absolute URLs.
    pub fn load_targets(&self) -> crate::types::Result<Vec<String>> {
        let mut targets = self.targets.clone();

        if let Some(ref file_path) = self.file {
            let content = std::fs::read_to_string(file_path)?;
            for line in content.lines() {
                let trimmed = line.trim();
                if !trimmed.is_empty() && !trimmed.starts_with('#') {
                    targets.push(trimmed.to_string());
                }
            }
        }

        targets.iter().map(|t| normalize_target(t)).collect()
    }
}

/// Add `https://` when no scheme is given and check the result parses.
pub fn normalize_target(target: &str) -> crate::types::Result<String> {
    let with_scheme = if target.starts_with("http://") || target.starts_with("https://") {
        target.to_string()
    } else {
        format!("https://{}", target)
    };
    Ok(Url::parse(&with_scheme)?.to_string())
}
