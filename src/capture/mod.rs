//! Page capture.
//!
//! Drives a real browser to a page and turns its client-side state into a
//! [`crate::snapshot::PageSnapshot`]. All I/O lives here; the locator only
//! ever sees the finished snapshot.

pub mod browser_capture;
pub mod poll;
pub mod script;

pub use browser_capture::BrowserCapture;
pub use poll::poll_until;
pub use script::capture_script;
