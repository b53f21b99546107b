//! Headless browser launch, teardown, and executable discovery.

use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use chromiumoxide::handler::viewport::Viewport;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::{self, JoinHandle};
use tracing::{error, info, trace, warn};

/// Find a Chrome/Chromium executable on the system, checking `CHROMIUM_PATH`
/// first, then a platform-specific search list, falling back to `PATH`.
pub async fn find_browser_executable() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            info!(path = %path.display(), "using browser from CHROMIUM_PATH");
            return Ok(path);
        }
        warn!(path = %path.display(), "CHROMIUM_PATH points to a non-existent file");
    }

    let paths = if cfg!(target_os = "windows") {
        vec![
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"%LOCALAPPDATA%\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\Chromium\Application\chrome.exe",
        ]
    } else if cfg!(target_os = "macos") {
        vec![
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        vec![
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/usr/local/bin/chromium",
        ]
    };

    for path_str in paths {
        let path = if path_str.starts_with('~') {
            match dirs::home_dir() {
                Some(home) => home.join(&path_str[2..]),
                None => continue,
            }
        } else if path_str.contains('%') && cfg!(target_os = "windows") {
            PathBuf::from(expand_windows_env_vars(path_str))
        } else {
            PathBuf::from(path_str)
        };
        if path.exists() {
            return Ok(path);
        }
    }

    if let Some(path) = find_on_path() {
        return Ok(path);
    }

    Err(anyhow::anyhow!("no Chrome/Chromium executable found"))
}

fn find_on_path() -> Option<PathBuf> {
    let candidates: &[&str] = if cfg!(target_os = "windows") {
        &["chrome.exe", "chromium.exe"]
    } else {
        &["google-chrome", "chromium", "chromium-browser"]
    };
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        for candidate in candidates {
            let full = dir.join(candidate);
            if full.exists() {
                return Some(full);
            }
        }
    }
    None
}

fn expand_windows_env_vars(path: &str) -> String {
    let mut result = path.to_string();
    for var in ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"] {
        if let Ok(value) = std::env::var(var) {
            result = result.replace(&format!("%{var}%"), &value);
        }
    }
    result
}

/// Download a managed Chromium build into the user's cache directory when
/// no system browser is found.
pub async fn download_managed_browser() -> Result<PathBuf> {
    info!("downloading managed Chromium browser");

    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("article_scrape")
        .join("chromium");

    std::fs::create_dir_all(&cache_dir).context("failed to create browser cache directory")?;

    let fetcher = BrowserFetcher::new(
        BrowserFetcherOptions::builder()
            .with_path(&cache_dir)
            .build()
            .context("failed to build fetcher options")?,
    );

    let revision_info = fetcher.fetch().await.context("failed to fetch browser")?;
    info!(path = %revision_info.folder_path.display(), "downloaded Chromium");
    Ok(revision_info.executable_path)
}

/// A browser profile directory unique to one request, removed on drop so
/// concurrent fetches never contend for the same Chrome user-data-dir lock.
pub struct BrowserProfile {
    pub path: PathBuf,
}

impl BrowserProfile {
    pub fn new() -> Result<Self> {
        let base = std::env::temp_dir();
        let pid = std::process::id();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();

        for attempt in 0..10 {
            let path = base.join(format!("article-scrape-{pid}-{nanos}-{attempt}"));
            if std::fs::create_dir_all(&path).is_ok() {
                return Ok(Self { path });
            }
        }

        Err(anyhow::anyhow!("failed to create a browser profile directory"))
    }
}

impl Drop for BrowserProfile {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

/// A running browser plus its event-handler task and profile directory,
/// torn down together by [`shutdown`] on every exit path.
pub struct LaunchedBrowser {
    pub browser: Browser,
    handler_task: JoinHandle<()>,
    _profile: BrowserProfile,
}

/// Launch a headless browser per spec §4.3: `--headless`,
/// `--disable-gpu`, `--disable-dev-shm-usage`, `--no-sandbox`, and a
/// 1366x900 viewport, with a fresh per-request profile directory.
/// Pooling is explicitly out of scope: one browser per request, launched
/// here and torn down by [`shutdown`] on every exit path.
pub async fn launch_browser(user_agent: &str) -> Result<LaunchedBrowser> {
    let chrome_path = match find_browser_executable().await {
        Ok(path) => path,
        Err(_) => download_managed_browser().await?,
    };

    let profile = BrowserProfile::new()?;

    let browser_config = BrowserConfigBuilder::default()
        .chrome_executable(chrome_path)
        .user_data_dir(profile.path.clone())
        .headless_mode(HeadlessMode::default())
        .viewport(Viewport {
            width: 1366,
            height: 900,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .request_timeout(Duration::from_secs(40))
        .arg(format!("--user-agent={user_agent}"))
        .arg("--disable-gpu")
        .arg("--disable-dev-shm-usage")
        .arg("--no-sandbox")
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--mute-audio")
        .arg("--hide-scrollbars")
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .context("failed to launch browser")?;

    let handler_task = task::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(err) = event {
                let msg = err.to_string();
                // chromiumoxide surfaces CDP events it can't deserialize as
                // handler errors; these are routine and not actionable.
                // See https://github.com/mattsse/chromiumoxide/issues/167
                let benign = msg.contains("data did not match any variant of untagged enum Message")
                    || msg.contains("Failed to deserialize WS response");
                if benign {
                    trace!(%msg, "suppressed benign CDP serialization error");
                } else {
                    error!(%msg, "browser handler error");
                }
            }
        }
    });

    Ok(LaunchedBrowser {
        browser,
        handler_task,
        _profile: profile,
    })
}

/// Tear down a launched browser: close it, then abort the event-handler
/// task. Called on every exit path of the browser fetch phase, including
/// timeout and error returns, per spec §5's cancellation requirement.
pub async fn shutdown(mut launched: LaunchedBrowser) {
    if let Err(err) = launched.browser.close().await {
        warn!(%err, "error closing browser");
    }
    launched.handler_task.abort();
}
