//! Document-like page context consumed by the locator.
//!
//! The locator never talks to a browser directly. It reads a [`PageContext`],
//! and the usual implementation is a [`PageSnapshot`] captured from a live
//! page by [`crate::capture::BrowserCapture`] or loaded from a JSON file.

use crate::types::{JwtScoutError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Read-only view of a loaded page.
///
/// Every accessor may fail independently. Callers treat a failure as
/// "nothing found at this source".
pub trait PageContext {
    /// Local storage entries in the page's enumeration order.
    fn local_storage(&self) -> Result<Vec<(String, String)>>;

    /// Session storage entries in the page's enumeration order.
    fn session_storage(&self) -> Result<Vec<(String, String)>>;

    /// The raw `document.cookie` string.
    fn cookie_header(&self) -> Result<String>;

    /// Full serialized markup of the document.
    fn outer_html(&self) -> Result<String>;

    /// Text content of every script element, in document order.
    fn script_texts(&self) -> Result<Vec<String>>;

    /// Result of evaluating a script expression against the global scope.
    ///
    /// `Ok(None)` means the expression resolved to nothing.
    fn evaluate(&self, expression: &str) -> Result<Option<Value>>;
}

/// A value read from the page, or the error the page raised while reading it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Captured<T> {
    Value(T),
    Error(String),
}

impl<T: Default> Default for Captured<T> {
    fn default() -> Self {
        Captured::Value(T::default())
    }
}

impl<T: Clone> Captured<T> {
    fn read(&self, source: &str) -> Result<T> {
        match self {
            Captured::Value(v) => Ok(v.clone()),
            Captured::Error(e) => Err(JwtScoutError::SourceUnavailable(format!(
                "{}: {}",
                source, e
            ))),
        }
    }
}

/// Point-in-time capture of everything the locator can look at.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PageSnapshot {
    /// URL the snapshot was taken from.
    pub url: String,
    pub local_storage: Captured<Vec<(String, String)>>,
    pub session_storage: Captured<Vec<(String, String)>>,
    pub cookie: Captured<String>,
    pub html: Captured<String>,
    pub scripts: Captured<Vec<String>>,
    /// Probe expression -> evaluation result.
    pub evaluations: BTreeMap<String, Captured<Value>>,
}

impl PageSnapshot {
    /// Create an empty snapshot for a URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Parse a snapshot from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn with_local_storage(mut self, key: &str, value: &str) -> Self {
        if let Captured::Value(ref mut entries) = self.local_storage {
            entries.push((key.to_string(), value.to_string()));
        }
        self
    }

    pub fn with_session_storage(mut self, key: &str, value: &str) -> Self {
        if let Captured::Value(ref mut entries) = self.session_storage {
            entries.push((key.to_string(), value.to_string()));
        }
        self
    }

    pub fn with_cookie(mut self, cookie: &str) -> Self {
        self.cookie = Captured::Value(cookie.to_string());
        self
    }

    pub fn with_html(mut self, html: &str) -> Self {
        self.html = Captured::Value(html.to_string());
        self
    }

    pub fn with_script(mut self, text: &str) -> Self {
        if let Captured::Value(ref mut scripts) = self.scripts {
            scripts.push(text.to_string());
        }
        self
    }

    pub fn with_evaluation(mut self, expression: &str, value: Captured<Value>) -> Self {
        self.evaluations.insert(expression.to_string(), value);
        self
    }
}

impl PageContext for PageSnapshot {
    fn local_storage(&self) -> Result<Vec<(String, String)>> {
        self.local_storage.read("localStorage")
    }

    fn session_storage(&self) -> Result<Vec<(String, String)>> {
        self.session_storage.read("sessionStorage")
    }

    fn cookie_header(&self) -> Result<String> {
        self.cookie.read("document.cookie")
    }

    fn outer_html(&self) -> Result<String> {
        self.html.read("document markup")
    }

    fn script_texts(&self) -> Result<Vec<String>> {
        self.scripts.read("script elements")
    }

    fn evaluate(&self, expression: &str) -> Result<Option<Value>> {
        match self.evaluations.get(expression) {
            None | Some(Captured::Value(Value::Null)) => Ok(None),
            Some(Captured::Value(v)) => Ok(Some(v.clone())),
            Some(Captured::Error(e)) => Err(JwtScoutError::ProbeFailed {
                probe: expression.to_string(),
                message: e.clone(),
            }),
        }
    }
}
