//! Token locator.
//!
//! Searches a page for a JWT-shaped string, in a fixed order:
//! 1. local storage
//! 2. session storage
//! 3. cookies
//! 4. serialized markup
//! 5. well-known global variables
//! 6. front-end framework state
//! 7. inline script text
//!
//! The first hit wins. A source that cannot be read is skipped.

pub mod matcher;
pub mod probes;

pub use matcher::{find_jwt_in_text, is_jwt_candidate, preview};
pub use probes::{default_probes, ProbeOutcome, StateProbe};

use crate::snapshot::PageContext;
use crate::types::{Candidate, Result, SourceLocation};
use tracing::{debug, info, trace, warn};

/// Ordered multi-source token search.
pub struct Locator {
    probes: Vec<Box<dyn StateProbe>>,
}

impl Locator {
    /// Create a locator with the default global and framework probes.
    pub fn new() -> Self {
        Self {
            probes: default_probes(),
        }
    }

    /// Replace the global/framework probes (steps 5 and 6).
    pub fn with_probes(mut self, probes: Vec<Box<dyn StateProbe>>) -> Self {
        self.probes = probes;
        self
    }

    /// Probes in the order they run.
    pub fn probes(&self) -> &[Box<dyn StateProbe>] {
        &self.probes
    }

    /// Find the first candidate token on the page. Never fails.
    pub fn locate(&self, page: &dyn PageContext) -> Option<Candidate> {
        info!("Searching for a bearer token");

        let found = self
            .from_storage(page.local_storage(), "localStorage", |key| {
                SourceLocation::LocalStorage { key }
            })
            .or_else(|| {
                self.from_storage(page.session_storage(), "sessionStorage", |key| {
                    SourceLocation::SessionStorage { key }
                })
            })
            .or_else(|| self.from_cookies(page.cookie_header()))
            .or_else(|| self.from_markup(page.outer_html()))
            .or_else(|| self.from_probes(page))
            .or_else(|| self.from_scripts(page.script_texts()));

        match &found {
            Some(candidate) => info!(
                "Token found in {}: {}",
                candidate.location,
                preview(&candidate.token)
            ),
            None => info!("No token found on page"),
        }

        found
    }

    fn from_storage(
        &self,
        entries: Result<Vec<(String, String)>>,
        store: &str,
        location: impl Fn(String) -> SourceLocation,
    ) -> Option<Candidate> {
        let entries = readable(entries, store)?;
        debug!("Checking {} ({} keys)", store, entries.len());

        for (key, value) in entries {
            trace!("{}[{}]: {} chars", store, key, value.len());
            if is_jwt_candidate(&value) {
                return Some(Candidate::new(value, location(key)));
            }
        }
        None
    }

    fn from_cookies(&self, header: Result<String>) -> Option<Candidate> {
        let header = readable(header, "cookies")?;
        debug!("Checking cookies");

        parse_cookies(&header)
            .into_iter()
            .find(|(_, value)| is_jwt_candidate(value))
            .map(|(name, value)| {
                Candidate::new(
                    value,
                    SourceLocation::Cookie {
                        name: name.to_string(),
                    },
                )
            })
    }

    fn from_markup(&self, html: Result<String>) -> Option<Candidate> {
        let html = readable(html, "markup")?;
        debug!("Scanning page markup ({} bytes)", html.len());

        find_jwt_in_text(&html).map(|token| Candidate::new(token, SourceLocation::Markup))
    }

    fn from_probes(&self, page: &dyn PageContext) -> Option<Candidate> {
        for probe in &self.probes {
            match probe.probe(page) {
                ProbeOutcome::Found(value) if is_jwt_candidate(&value) => {
                    return Some(Candidate::new(value, probe.location()));
                }
                ProbeOutcome::Found(_) | ProbeOutcome::Absent => {
                    debug!("Nothing at {}", probe.location());
                }
                ProbeOutcome::Errored(e) => {
                    debug!("Probe {} errored (ignored): {}", probe.location(), e);
                }
            }
        }
        None
    }

    fn from_scripts(&self, scripts: Result<Vec<String>>) -> Option<Candidate> {
        let scripts = readable(scripts, "scripts")?;
        debug!("Scanning {} script elements", scripts.len());

        scripts.iter().enumerate().find_map(|(index, text)| {
            find_jwt_in_text(text).map(|token| Candidate::new(token, SourceLocation::Script { index }))
        })
    }
}

impl Default for Locator {
    fn default() -> Self {
        Self::new()
    }
}

/// Unwrap a source read, logging and discarding the error.
fn readable<T>(result: Result<T>, source: &str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Skipping {}: {}", source, e);
            None
        }
    }
}

/// Split a `document.cookie` string into `(name, value)` pairs.
///
/// Pairs are split on the first `=` only, so values keep any later `=`.
/// Entries without `=` are dropped.
pub fn parse_cookies(header: &str) -> Vec<(&str, &str)> {
    header
        .split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| pair.split_once('='))
        .collect()
}
