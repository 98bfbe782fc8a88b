//! Browser-based page capture using Chrome DevTools Protocol.
//!
//! Navigates a real browser to the target so that storage, cookies and
//! global state are populated by the page's own scripts, then reads them all
//! out with a single script evaluation.
//!
//! Requires: Chrome or Chromium browser installed (or `jwtscout setup`)

use crate::capture::poll::poll_until;
use crate::capture::script::capture_script;
use crate::locator::StateProbe;
use crate::snapshot::PageSnapshot;
use crate::types::{JwtScoutError, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Counter for generating unique browser profile directories
static BROWSER_INSTANCE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Browser profile directory for one capture. A throwaway directory is
/// removed on drop, including when the capture future is cancelled.
struct ProfileDir {
    path: PathBuf,
    ephemeral: bool,
}

impl ProfileDir {
    /// Use `persistent` when given, otherwise a fresh temp directory that is
    /// unique per instance so parallel runs don't collide.
    fn new(persistent: Option<&Path>) -> Self {
        match persistent {
            Some(dir) => Self {
                path: dir.to_path_buf(),
                ephemeral: false,
            },
            None => {
                let instance_id = BROWSER_INSTANCE_COUNTER.fetch_add(1, Ordering::SeqCst);
                Self {
                    path: std::env::temp_dir().join(format!(
                        "jwtscout-browser-{}-{}",
                        std::process::id(),
                        instance_id
                    )),
                    ephemeral: true,
                }
            }
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProfileDir {
    fn drop(&mut self) {
        if !self.ephemeral {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            debug!("Failed to cleanup temp dir {:?}: {}", self.path, e);
        }
    }
}

/// Browser-driven snapshot capture.
pub struct BrowserCapture {
    /// Timeout for page load in seconds
    timeout_secs: u64,
    /// Whether to run headless
    headless: bool,
    /// Wait after navigation before the first snapshot
    settle: Duration,
    /// Explicit path to Chrome/Chromium executable
    chrome_executable: Option<PathBuf>,
    /// Persistent profile to reuse (keeps logins between runs)
    profile_dir: Option<PathBuf>,
}

impl BrowserCapture {
    /// Create a new browser capture instance.
    pub fn new(timeout_secs: u64, headless: bool) -> Self {
        Self {
            timeout_secs,
            headless,
            ..Default::default()
        }
    }

    /// Set how long to let the page settle after navigation.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Set an explicit Chrome/Chromium executable path.
    pub fn with_chrome_executable(mut self, path: Option<PathBuf>) -> Self {
        self.chrome_executable = path;
        self
    }

    /// Reuse an existing browser profile directory instead of a throwaway one.
    pub fn with_profile_dir(mut self, path: Option<PathBuf>) -> Self {
        self.profile_dir = path;
        self
    }

    /// Build a BrowserConfig with the given profile directory.
    fn build_browser_config(
        &self,
        user_data_dir: &Path,
        chrome_exe: Option<&Path>,
    ) -> Result<BrowserConfig> {
        let mut config_builder = BrowserConfig::builder().user_data_dir(user_data_dir);

        if let Some(exe) = chrome_exe {
            config_builder = config_builder.chrome_executable(exe);
        }

        if !self.headless {
            config_builder = config_builder.with_head();
        }

        config_builder = config_builder.no_sandbox().viewport(None);

        config_builder.build().map_err(|e| {
            JwtScoutError::Browser(format!("Failed to build browser config: {}", e))
        })
    }

    /// Launch a browser, with auto-download fallback if no Chrome is found.
    async fn launch_browser(
        &self,
        user_data_dir: &Path,
    ) -> Result<(
        Browser,
        impl futures::Stream<Item = std::result::Result<(), chromiumoxide::error::CdpError>>,
    )> {
        // Resolve Chrome executable: explicit path > previously downloaded > system Chrome
        let chrome_exe = self
            .chrome_executable
            .clone()
            .or_else(crate::browser::resolve_chrome_executable);

        let launch_result = match self.build_browser_config(user_data_dir, chrome_exe.as_deref()) {
            Ok(config) => Browser::launch(config).await,
            Err(e) => Err(chromiumoxide::error::CdpError::msg(e.to_string())),
        };

        match launch_result {
            Ok(pair) => Ok(pair),
            Err(e) => {
                // If we had an explicit or resolved chrome path, don't try auto-download
                if let Some(exe) = chrome_exe {
                    return Err(JwtScoutError::Browser(format!(
                        "Failed to launch browser with Chrome at {:?}: {}",
                        exe, e
                    )));
                }

                warn!(
                    "Chrome not found, downloading Chromium automatically... (run `jwtscout setup` to pre-install)"
                );
                let exe = crate::browser::download_chrome(false).await?;

                let config = self.build_browser_config(user_data_dir, Some(&exe))?;
                Browser::launch(config).await.map_err(|e| {
                    JwtScoutError::Browser(format!(
                        "Failed to launch browser even after downloading Chromium: {}",
                        e
                    ))
                })
            }
        }
    }

    /// Navigate to `url`, then snapshot up to `attempts` times, `interval` apart,
    /// until `accept` returns true. Returns the last snapshot taken.
    ///
    /// The page is not reloaded between attempts, so a user can log in
    /// in a headed browser while this waits.
    pub async fn capture_until<F>(
        &self,
        url: &str,
        probes: &[Box<dyn StateProbe>],
        attempts: u32,
        interval: Duration,
        accept: F,
    ) -> Result<PageSnapshot>
    where
        F: FnMut(&PageSnapshot) -> bool,
    {
        info!("Capturing with browser: {}", url);

        // Declared before the browser so it is dropped after it
        let profile = ProfileDir::new(self.profile_dir.as_deref());
        if let Err(e) = std::fs::create_dir_all(profile.path()) {
            debug!("Failed to create profile dir {:?}: {}", profile.path(), e);
        }

        let (browser, mut handler) = self.launch_browser(profile.path()).await?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let script = capture_script(probes);
        let result = self
            .snapshot_page(&browser, url, &script, attempts, interval, accept)
            .await;

        drop(browser);
        handler_task.abort();

        result
    }

    async fn snapshot_page<F>(
        &self,
        browser: &Browser,
        url: &str,
        script: &str,
        attempts: u32,
        interval: Duration,
        accept: F,
    ) -> Result<PageSnapshot>
    where
        F: FnMut(&PageSnapshot) -> bool,
    {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| JwtScoutError::Browser(format!("Failed to create page: {}", e)))?;

        debug!("Navigating to: {}", url);
        let navigate_result =
            tokio::time::timeout(Duration::from_secs(self.timeout_secs), page.goto(url)).await;

        match navigate_result {
            Ok(Ok(_)) => debug!("Navigation completed"),
            Ok(Err(e)) => warn!("Navigation error (continuing): {}", e),
            Err(_) => warn!("Navigation timeout (continuing with loaded content)"),
        }

        tokio::time::sleep(self.settle).await;

        let page = &page;
        poll_until(attempts, interval, || read_snapshot(page, script), accept).await
    }
}

/// Run the capture script and decode its result.
async fn read_snapshot(page: &Page, script: &str) -> Result<PageSnapshot> {
    let evaluation = page
        .evaluate(script)
        .await
        .map_err(|e| JwtScoutError::Browser(format!("Capture script failed: {}", e)))?;

    let json: String = evaluation.into_value()?;
    let snapshot = PageSnapshot::from_json(&json)?;
    debug!("Captured snapshot of {}", snapshot.url);
    Ok(snapshot)
}

impl Default for BrowserCapture {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            headless: true,
            settle: Duration::from_millis(1500),
            chrome_executable: None,
            profile_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_options() {
        let capture = BrowserCapture::new(10, false)
            .with_settle(Duration::from_millis(250))
            .with_profile_dir(Some(PathBuf::from("/tmp/profile")))
            .with_chrome_executable(None);

        assert_eq!(capture.timeout_secs, 10);
        assert!(!capture.headless);
        assert_eq!(capture.settle, Duration::from_millis(250));
        assert_eq!(capture.profile_dir, Some(PathBuf::from("/tmp/profile")));
        assert!(capture.chrome_executable.is_none());
    }

    #[test]
    fn test_throwaway_profile_removed_on_drop() {
        let profile = ProfileDir::new(None);
        let path = profile.path().to_path_buf();
        assert!(path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("jwtscout-browser-")));

        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("Local State"), "{}").unwrap();
        drop(profile);
        assert!(!path.exists());
    }

    #[test]
    fn test_throwaway_profiles_are_unique() {
        let a = ProfileDir::new(None);
        let b = ProfileDir::new(None);
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_persistent_profile_kept_on_drop() {
        let path = std::env::temp_dir().join(format!("jwtscout-keep-{}", std::process::id()));
        std::fs::create_dir_all(&path).unwrap();

        drop(ProfileDir::new(Some(&path)));
        assert!(path.exists());
        std::fs::remove_dir_all(&path).ok();
    }

    #[test]
    fn test_default_is_headless() {
        let capture = BrowserCapture::default();
        assert!(capture.headless);
        assert_eq!(capture.timeout_secs, 30);
    }
}
