//! Core types and errors for token discovery.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur while capturing or reading a page.
#[derive(Error, Debug)]
pub enum JwtScoutError {
    #[error("Page source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Probe {probe} failed: {message}")]
    ProbeFailed { probe: String, message: String },

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, JwtScoutError>;

/// Where a candidate token was found. Diagnostic only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceLocation {
    /// Key in the page's local storage.
    LocalStorage { key: String },
    /// Key in the page's session storage.
    SessionStorage { key: String },
    /// Cookie name from `document.cookie`.
    Cookie { name: String },
    /// Match inside the serialized document markup.
    Markup,
    /// Match inside the text of the n-th script element.
    Script { index: usize },
    /// Named property on the global scope.
    Global { name: String },
    /// Property path into a front-end framework's state.
    Framework { path: String },
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalStorage { key } => write!(f, "localStorage[{}]", key),
            Self::SessionStorage { key } => write!(f, "sessionStorage[{}]", key),
            Self::Cookie { name } => write!(f, "cookie {}", name),
            Self::Markup => write!(f, "page markup"),
            Self::Script { index } => write!(f, "script #{}", index),
            Self::Global { name } => write!(f, "window.{}", name),
            Self::Framework { path } => write!(f, "{}", path),
        }
    }
}

/// A string that looks like a JWT, plus where it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Candidate {
    pub token: String,
    pub location: SourceLocation,
}

impl Candidate {
    pub fn new(token: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            token: token.into(),
            location,
        }
    }
}
