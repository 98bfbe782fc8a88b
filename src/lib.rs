//! jwtscout - Locate and inspect bearer tokens held by a web page's client-side code.
//!
//! The library is split along one seam:
//! - [`capture`] drives a headless browser and produces a [`PageSnapshot`]
//! - [`Locator`] and [`Inspector`] work on that snapshot, synchronously and
//!   without I/O
//!
//! # Example
//!
//! ```
//! use jwtscout::{Inspector, Locator, PageSnapshot};
//!
//! let page = PageSnapshot::new("https://app.example.com")
//!     .with_cookie("theme=dark; lang=en");
//!
//! let candidate = Locator::new().locate(&page);
//! assert!(candidate.is_none());
//!
//! let inspection = Inspector::new().inspect(candidate.as_ref().map(|c| c.token.as_str()));
//! assert!(!inspection.verdict.valid);
//! ```

pub mod browser;
pub mod capture;
pub mod config;
pub mod har;
pub mod inspector;
pub mod locator;
pub mod report;
pub mod snapshot;
pub mod types;

pub use config::{Commands, Config, ScanConfig};
pub use inspector::{ClaimsSummary, Inspection, Inspector, Verdict, VerdictReason};
pub use locator::Locator;
pub use snapshot::{Captured, PageContext, PageSnapshot};
pub use types::{Candidate, JwtScoutError, Result, SourceLocation};

/// Locate a token on a page and inspect it.
pub fn locate_and_inspect(
    locator: &Locator,
    inspector: &Inspector,
    page: &dyn PageContext,
) -> (Option<Candidate>, Inspection) {
    let candidate = locator.locate(page);
    let inspection = inspector.inspect(candidate.as_ref().map(|c| c.token.as_str()));
    (candidate, inspection)
}
