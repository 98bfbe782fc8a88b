//! jwtscout - Locate and inspect bearer tokens held by a web page's client-side code.
//!
//! CLI entry point.

use clap::Parser;
use jwtscout::capture::BrowserCapture;
use jwtscout::har::{self, Har};
use jwtscout::report::{ConsoleOutput, HarReport, TokenReport};
use jwtscout::{
    locate_and_inspect, Commands, Config, Inspector, Locator, PageSnapshot, ScanConfig,
};
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    let filter = if config.verbose {
        EnvFilter::new("jwtscout=debug,info")
    } else {
        EnvFilter::new("jwtscout=info,warn")
    };

    // Logs go to stderr so --json output on stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let inspector = Inspector::new().with_refresh_threshold(config.refresh_threshold);
    let console = ConsoleOutput::new(config.verbose, config.json);

    let outcome = match config.command.clone() {
        Commands::Scan(scan_config) => run_scan(scan_config, &config, &inspector, &console).await,
        Commands::Snapshot(c) => run_snapshot(&c.path, &config, &inspector, &console),
        Commands::Inspect(c) => run_inspect(&c.token, &config, &inspector, &console),
        Commands::Har(c) => run_har(&c.path, &config, &inspector, &console),
        Commands::Setup(c) => run_setup(c.force).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => code,
    }
}

async fn run_scan(
    scan_config: ScanConfig,
    config: &Config,
    inspector: &Inspector,
    console: &ConsoleOutput,
) -> Result<(), ExitCode> {
    let targets = scan_config.load_targets().map_err(|e| {
        error!("Failed to load targets: {}", e);
        ExitCode::FAILURE
    })?;

    if targets.is_empty() {
        error!("No targets specified. Use positional arguments or -f <file>.");
        return Err(ExitCode::FAILURE);
    }

    let locator = Locator::new();
    let capture = BrowserCapture::new(scan_config.timeout, !scan_config.headful)
        .with_settle(scan_config.settle())
        .with_chrome_executable(scan_config.chrome_path.clone())
        .with_profile_dir(scan_config.profile_dir.clone());

    console.print_banner();

    let mut reports = Vec::with_capacity(targets.len());
    for target in &targets {
        console.print_scan_start(target);
        let started = Instant::now();

        let spinner = (scan_config.attempts > 1)
            .then(|| console.create_spinner("Waiting for a token to appear..."))
            .flatten();

        // Dropping the capture future on Ctrl-C closes the browser and removes its temp profile
        let captured = tokio::select! {
            result = capture.capture_until(
                target,
                locator.probes(),
                scan_config.attempts,
                scan_config.interval(),
                |snapshot| locator.locate(snapshot).is_some(),
            ) => result,
            _ = tokio::signal::ctrl_c() => {
                if let Some(ref pb) = spinner {
                    pb.finish_and_clear();
                }
                warn!("Interrupted, closing browser");
                return Err(ExitCode::from(130));
            }
        };

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        console.print_progress(&format!(
            "Page read in {:.2}s",
            started.elapsed().as_secs_f64()
        ));

        let report = match captured {
            Ok(snapshot) => {
                let (candidate, inspection) = locate_and_inspect(&locator, inspector, &snapshot);
                TokenReport::new(target, candidate.as_ref(), inspection, config.reveal)
            }
            Err(e) => {
                error!("Capture failed for {}: {}", target, e);
                TokenReport::failed(target, inspector.inspect(None), e.to_string())
            }
        }
        .with_duration(started.elapsed().as_secs_f64());

        console.print_report(&report);
        reports.push(report);
    }

    if config.json {
        print_json(&reports);
    }

    let found = reports.iter().filter(|r| r.found).count();
    info!("Token found on {}/{} targets", found, reports.len());
    Ok(())
}

fn run_snapshot(
    path: &Path,
    config: &Config,
    inspector: &Inspector,
    console: &ConsoleOutput,
) -> Result<(), ExitCode> {
    let snapshot = PageSnapshot::load(path).map_err(|e| {
        error!("Failed to load snapshot {:?}: {}", path, e);
        ExitCode::FAILURE
    })?;

    let started = Instant::now();
    let target = if snapshot.url.is_empty() {
        path.display().to_string()
    } else {
        snapshot.url.clone()
    };
    console.print_scan_start(&target);

    let (candidate, inspection) = locate_and_inspect(&Locator::new(), inspector, &snapshot);
    let report = TokenReport::new(&target, candidate.as_ref(), inspection, config.reveal)
        .with_duration(started.elapsed().as_secs_f64());

    console.print_report(&report);
    if config.json {
        print_json(&report);
    }
    Ok(())
}

fn run_inspect(
    token: &str,
    config: &Config,
    inspector: &Inspector,
    console: &ConsoleOutput,
) -> Result<(), ExitCode> {
    let token = if token == "-" {
        let mut input = String::new();
        std::io::stdin().read_to_string(&mut input).map_err(|e| {
            error!("Failed to read token from stdin: {}", e);
            ExitCode::FAILURE
        })?;
        input.trim().to_string()
    } else {
        token.trim().to_string()
    };

    let inspection = inspector.inspect(Some(&token));
    let valid = inspection.verdict.valid;
    let report = TokenReport::for_token("command line", &token, inspection, config.reveal);

    console.print_report(&report);
    if config.json {
        print_json(&report);
    }

    if valid {
        Ok(())
    } else {
        Err(ExitCode::FAILURE)
    }
}

fn run_har(
    path: &Path,
    config: &Config,
    inspector: &Inspector,
    console: &ConsoleOutput,
) -> Result<(), ExitCode> {
    let capture = Har::load(path).map_err(|e| {
        error!("Failed to load HAR {:?}: {}", path, e);
        ExitCode::FAILURE
    })?;

    let report = HarReport::new(har::extract_tokens(&capture), inspector, config.reveal);

    console.print_har_report(&report);
    if config.json {
        print_json(&report);
    }
    Ok(())
}

async fn run_setup(force: bool) -> Result<(), ExitCode> {
    eprintln!("Setting up Chromium browser...");
    match jwtscout::browser::download_chrome(force).await {
        Ok(path) => {
            eprintln!("Chromium ready at: {}", path.display());
            Ok(())
        }
        Err(e) => {
            error!("Setup failed: {}", e);
            Err(ExitCode::FAILURE)
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value).unwrap_or_default();
    println!("{}", json);
}
