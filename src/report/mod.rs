//! Result reporting.
//!
//! Reports never carry a full token unless `reveal` is set; the default is
//! the 50-character preview plus the `first20...last20` short form.

mod console;

pub use console::ConsoleOutput;

use crate::har::{HarExtraction, HarToken, HarTokenSource};
use crate::inspector::{short_form, ClaimsSummary, Inspection, Inspector, Verdict};
use crate::locator::preview;
use crate::types::{Candidate, SourceLocation};
use serde::Serialize;
use serde_json::{Map, Value};

/// Outcome of locating and inspecting a token on one page.
#[derive(Debug, Clone, Serialize)]
pub struct TokenReport {
    /// Page URL or snapshot path.
    pub target: String,
    pub found: bool,
    pub location: Option<SourceLocation>,
    pub token_preview: Option<String>,
    pub token_short: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub verdict: Verdict,
    pub summary: Option<ClaimsSummary>,
    pub claims: Option<Map<String, Value>>,
    /// Time spent, in seconds.
    pub duration_secs: f64,
    /// Errors that stopped this target from being searched.
    pub errors: Vec<String>,
}

impl TokenReport {
    pub fn new(
        target: &str,
        candidate: Option<&Candidate>,
        inspection: Inspection,
        reveal: bool,
    ) -> Self {
        Self {
            target: target.to_string(),
            found: candidate.is_some(),
            location: candidate.map(|c| c.location.clone()),
            token_preview: candidate.map(|c| preview(&c.token)),
            token_short: candidate.map(|c| short_form(&c.token)),
            token: candidate.filter(|_| reveal).map(|c| c.token.clone()),
            verdict: inspection.verdict,
            summary: inspection.summary,
            claims: inspection.claims,
            duration_secs: 0.0,
            errors: Vec::new(),
        }
    }

    /// Report for a token supplied directly rather than located on a page.
    pub fn for_token(target: &str, token: &str, inspection: Inspection, reveal: bool) -> Self {
        Self {
            target: target.to_string(),
            found: true,
            location: None,
            token_preview: Some(preview(token)),
            token_short: Some(short_form(token)),
            token: reveal.then(|| token.to_string()),
            verdict: inspection.verdict,
            summary: inspection.summary,
            claims: inspection.claims,
            duration_secs: 0.0,
            errors: Vec::new(),
        }
    }

    /// Report for a target that could not be searched at all.
    pub fn failed(target: &str, inspection: Inspection, error: String) -> Self {
        let mut report = Self::new(target, None, inspection, false);
        report.errors.push(error);
        report
    }

    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration_secs = secs;
        self
    }
}

/// A token from a HAR capture together with its inspection.
#[derive(Debug, Clone, Serialize)]
pub struct HarFinding {
    pub url: String,
    pub method: String,
    pub timestamp: String,
    pub source: HarTokenSource,
    pub token_preview: String,
    pub token_short: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub verdict: Verdict,
    pub summary: Option<ClaimsSummary>,
}

impl HarFinding {
    pub fn new(found: HarToken, inspection: Inspection, reveal: bool) -> Self {
        Self {
            token_preview: preview(&found.token),
            token_short: short_form(&found.token),
            token: reveal.then_some(found.token),
            url: found.url,
            method: found.method,
            timestamp: found.timestamp,
            source: found.source,
            verdict: inspection.verdict,
            summary: inspection.summary,
        }
    }
}

/// Inspected tokens and OAuth flow details from one HAR capture.
#[derive(Debug, Clone, Serialize)]
pub struct HarReport {
    pub findings: Vec<HarFinding>,
    pub oauth_codes: Vec<String>,
    pub auth_urls: Vec<String>,
    pub callback_urls: Vec<String>,
}

impl HarReport {
    pub fn new(extraction: HarExtraction, inspector: &Inspector, reveal: bool) -> Self {
        let findings = extraction
            .bearer_tokens
            .into_iter()
            .map(|found| {
                let inspection = inspector.inspect(Some(&found.token));
                HarFinding::new(found, inspection, reveal)
            })
            .collect();

        Self {
            findings,
            oauth_codes: extraction.oauth_codes,
            auth_urls: extraction.auth_urls,
            callback_urls: extraction.callback_urls,
        }
    }

    /// True when nothing at all was found.
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
            && self.oauth_codes.is_empty()
            && self.auth_urls.is_empty()
            && self.callback_urls.is_empty()
    }
}
