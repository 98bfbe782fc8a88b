//! Colored console output for token reports.

use crate::inspector::{ClaimsSummary, Verdict, VerdictReason};
use crate::report::{HarReport, TokenReport};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Console output handler with colors and formatting.
pub struct ConsoleOutput {
    verbose: bool,
    json_mode: bool,
}

impl ConsoleOutput {
    /// Create a new console output handler.
    pub fn new(verbose: bool, json_mode: bool) -> Self {
        Self { verbose, json_mode }
    }

    pub fn print_banner(&self) {
        if self.json_mode {
            return;
        }

        println!();
        println!("\x1b[36m╔══════════════════════════════════════════════════════════════╗\x1b[0m");
        println!("\x1b[36m║                    JWTSCOUT v0.1.0                           ║\x1b[0m");
        println!("\x1b[36m║            Client-side Bearer Token Locator                  ║\x1b[0m");
        println!("\x1b[36m╚══════════════════════════════════════════════════════════════╝\x1b[0m");
        println!();
    }

    /// Print scan start message.
    pub fn print_scan_start(&self, target: &str) {
        if self.json_mode {
            return;
        }

        println!(
            "{} Searching: {}",
            "[*]".bright_blue(),
            target.bright_white()
        );
    }

    /// Print progress (only in verbose mode).
    pub fn print_progress(&self, message: &str) {
        if self.json_mode || !self.verbose {
            return;
        }

        println!("{} {}", "[.]".dimmed(), message.dimmed());
    }

    /// Print one page report.
    pub fn print_report(&self, report: &TokenReport) {
        if self.json_mode {
            return;
        }

        println!();
        match report.token_preview {
            Some(ref preview) => {
                println!(
                    "{} {} [{}]",
                    "===".bright_cyan(),
                    "Token found".bright_white().bold(),
                    format_verdict(&report.verdict)
                );
                if let Some(ref location) = report.location {
                    println!("    |-- Source:  {}", location.to_string().bright_white());
                }
                println!("    |-- Preview: {}", preview.dimmed());
                if let Some(ref short) = report.token_short {
                    println!("    |-- Short:   {}", short);
                }
                if let Some(ref token) = report.token {
                    println!("    |-- Token:   {}", token);
                }
                if let Some(ref summary) = report.summary {
                    print_summary_lines(summary);
                }
                println!("    +-- Verdict: {}", report.verdict.reason);
            }
            None => {
                println!(
                    "{} {}",
                    "===".bright_cyan(),
                    "No bearer token found.".yellow()
                );
            }
        }

        if !report.errors.is_empty() {
            println!();
            println!("{}", "Errors encountered:".yellow());
            for error in &report.errors {
                println!("  - {}", error.dimmed());
            }
        }

        if self.verbose {
            println!("  Duration:  {:.2}s", report.duration_secs);
        }
        println!();
    }

    /// Print tokens and OAuth flow details found in a HAR capture.
    pub fn print_har_report(&self, report: &HarReport) {
        if self.json_mode {
            return;
        }

        if report.is_empty() {
            println!("{} {}", "[*]".bright_blue(), "Nothing found in HAR.".yellow());
            return;
        }

        for (i, finding) in report.findings.iter().enumerate() {
            println!();
            println!(
                "{} Token {} [{}]",
                "===".bright_cyan(),
                i + 1,
                format_verdict(&finding.verdict)
            );
            println!("    |-- Request: {} {}", finding.method, finding.url.dimmed());
            println!("    |-- Seen:    {:?} at {}", finding.source, finding.timestamp);
            println!("    |-- Preview: {}", finding.token_preview.dimmed());
            println!("    |-- Short:   {}", finding.token_short);
            if let Some(ref token) = finding.token {
                println!("    |-- Token:   {}", token);
            }
            if let Some(ref summary) = finding.summary {
                print_summary_lines(summary);
            }
            println!("    +-- Verdict: {}", finding.verdict.reason);
        }

        print_list("OAuth codes", &report.oauth_codes);
        print_list("Authorize URLs", &report.auth_urls);
        print_list("Callback URLs", &report.callback_urls);
        println!();
    }

    /// Spinner shown while waiting on a page.
    pub fn create_spinner(&self, message: &str) -> Option<ProgressBar> {
        if self.json_mode {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    }
}

fn print_summary_lines(summary: &ClaimsSummary) {
    if let Some(ref user) = summary.user {
        println!("    |-- User:    {}", user);
    }
    if let Some(ref roles) = summary.roles {
        println!("    |-- Roles:   {}", roles);
    }
    if let Some(iat) = summary.issued_at {
        println!("    |-- Issued:  {}", iat);
    }
    if let Some(exp) = summary.expires_at {
        println!("    |-- Expires: {}", exp);
    }
    if let Some(remaining) = summary.expires_in_secs {
        if remaining > 0 {
            let line = format!("{:.1} hours left", remaining as f64 / 3600.0);
            if summary.needs_refresh {
                println!("    |-- Lifetime: {}", line.yellow());
            } else {
                println!("    |-- Lifetime: {}", line.green());
            }
        }
    }
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!();
    println!("{} {} ({})", "===".bright_cyan(), title.bright_white().bold(), items.len());
    for item in items {
        println!("    - {}", item);
    }
}

/// Format a verdict with color.
fn format_verdict(verdict: &Verdict) -> colored::ColoredString {
    match verdict.reason {
        VerdictReason::Valid => "VALID".green().bold(),
        VerdictReason::Expired => "EXPIRED".red().bold(),
        VerdictReason::Malformed => "MALFORMED".red(),
        VerdictReason::NoExpiry => "NO EXPIRY".yellow(),
        VerdictReason::NoToken => "NONE".dimmed(),
    }
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new(false, false)
    }
}
