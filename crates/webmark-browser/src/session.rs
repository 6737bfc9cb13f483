//! Browser session — one Chrome/Chromium process per pipeline run.

use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::handler::viewport::Viewport;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use webmark_core::{BrowserConfig, Result, WebmarkError};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Injected before any page script runs, so fingerprinting code never sees
/// the automation markers.
const STEALTH_JS: &str = r#"
    Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
    Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
    Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
    window.chrome = { runtime: {} };
"#;

const EXTRACT_TEXT_JS: &str = "document.body ? document.body.innerText : ''";

/// An isolated headless browser session.
///
/// Owns exactly one browser process and the task draining its CDP event
/// stream. [`close`](BrowserSession::close) must run on every exit path;
/// the driver calls it before the conversion stage regardless of whether
/// the fetch succeeded.
#[derive(Debug)]
pub struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    profile_dir: PathBuf,
    settings: BrowserConfig,
}

impl BrowserSession {
    /// Launch a browser with a fresh throwaway profile.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let profile_dir =
            std::env::temp_dir().join(format!("webmark-profile-{}", std::process::id()));

        let mut builder = CdpBrowserConfig::builder()
            .user_data_dir(&profile_dir)
            .viewport(Some(Viewport {
                width: 1920,
                height: 1080,
                device_scale_factor: Some(1.0),
                ..Default::default()
            }))
            .request_timeout(Duration::from_millis(config.navigation_timeout_ms))
            .args(chrome_args(config));

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        // A failed launch must not leave the throwaway profile behind;
        // Chrome may have created it before dying.
        let cdp_config = match builder.build() {
            Ok(c) => c,
            Err(e) => {
                let _ = std::fs::remove_dir_all(&profile_dir);
                return Err(WebmarkError::BrowserLaunch(e));
            }
        };

        let (browser, mut handler) = match Browser::launch(cdp_config).await {
            Ok(launched) => launched,
            Err(e) => {
                let _ = std::fs::remove_dir_all(&profile_dir);
                return Err(WebmarkError::BrowserLaunch(e.to_string()));
            }
        };

        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        info!(incognito = config.incognito, anti_detection = config.anti_detection, "Browser session launched");

        Ok(Self {
            browser,
            handler_task,
            profile_dir,
            settings: config.clone(),
        })
    }

    /// Navigate to `url` and return the rendered page's visible text.
    ///
    /// Waits a fixed `render_wait_ms` grace period after navigation before
    /// extracting, so client-side rendering gets a chance to finish. An
    /// empty body after that wait fails with `EmptyContent`; pages that
    /// merely needed more time are indistinguishable from truly empty ones
    /// and are not retried.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let nav_err = |reason: String| WebmarkError::Navigation {
            url: url.to_string(),
            reason,
        };

        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| nav_err(format!("failed to open page: {e}")))?;

        if self.settings.anti_detection {
            // Must land before navigation so it beats any page script.
            page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_JS))
                .await
                .map_err(|e| nav_err(format!("stealth script injection failed: {e}")))?;
        }

        let timeout = Duration::from_millis(self.settings.navigation_timeout_ms);
        let navigated = tokio::time::timeout(timeout, async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        })
        .await;

        match navigated {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(nav_err(e.to_string())),
            Err(_) => return Err(nav_err(format!("timed out after {}ms", timeout.as_millis()))),
        }

        debug!(url, wait_ms = self.settings.render_wait_ms, "Page loaded, waiting for render");
        tokio::time::sleep(Duration::from_millis(self.settings.render_wait_ms)).await;

        let text: String = page
            .evaluate(EXTRACT_TEXT_JS)
            .await
            .map_err(|e| nav_err(format!("text extraction failed: {e}")))?
            .into_value()
            .map_err(|e| nav_err(format!("text extraction returned non-string: {e}")))?;

        if let Err(e) = page.close().await {
            warn!(%e, "Failed to close page");
        }

        let text = non_empty(text, url)?;
        info!(url, chars = text.len(), "Extracted page text");
        Ok(text)
    }

    /// Tear the session down: close the browser, await process exit, stop
    /// the CDP handler, and remove the throwaway profile. Best-effort.
    pub async fn close(mut self) {
        let _ = self.browser.close().await;
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        let _ = std::fs::remove_dir_all(&self.profile_dir);
        debug!("Browser session closed");
    }
}

/// Launch arguments derived from the session settings.
fn chrome_args(config: &BrowserConfig) -> Vec<String> {
    let mut args: Vec<String> = [
        "--no-first-run",
        "--no-default-browser-check",
        "--disable-dev-shm-usage",
        "--disable-gpu",
        "--disable-extensions",
        "--disable-background-networking",
        "--disable-sync",
        "--window-size=1920,1080",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    if config.anti_detection {
        args.push("--disable-blink-features=AutomationControlled".to_string());
        args.push("--disable-infobars".to_string());
        args.push(format!("--user-agent={USER_AGENT}"));
    }

    if config.incognito {
        args.push("--incognito".to_string());
    }

    args
}

fn non_empty(text: String, url: &str) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(WebmarkError::EmptyContent(url.to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chrome_args_anti_detection() {
        let config = BrowserConfig::default();
        let args = chrome_args(&config);
        assert!(args.iter().any(|a| a == "--disable-blink-features=AutomationControlled"));
        assert!(args.iter().any(|a| a.starts_with("--user-agent=")));
        assert!(args.iter().any(|a| a == "--incognito"));
    }

    #[test]
    fn test_chrome_args_plain() {
        let config = BrowserConfig {
            incognito: false,
            anti_detection: false,
            ..Default::default()
        };
        let args = chrome_args(&config);
        assert!(!args.iter().any(|a| a.contains("AutomationControlled")));
        assert!(!args.iter().any(|a| a.starts_with("--user-agent=")));
        assert!(!args.iter().any(|a| a == "--incognito"));
        // Baseline flags are always present
        assert!(args.iter().any(|a| a == "--no-first-run"));
    }

    #[tokio::test]
    async fn test_launch_failure_cleans_profile_dir() {
        let config = BrowserConfig {
            chrome_path: Some("/nonexistent/webmark-test-chrome".into()),
            ..Default::default()
        };

        let err = BrowserSession::launch(&config).await.unwrap_err();
        assert!(matches!(err, WebmarkError::BrowserLaunch(_)));

        let profile_dir =
            std::env::temp_dir().join(format!("webmark-profile-{}", std::process::id()));
        assert!(!profile_dir.exists());
    }

    #[test]
    fn test_non_empty_trims() {
        let text = non_empty("  hello world \n".to_string(), "https://example.com").unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn test_non_empty_rejects_whitespace_only() {
        let err = non_empty(" \n\t ".to_string(), "https://example.com").unwrap_err();
        assert!(matches!(err, WebmarkError::EmptyContent(url) if url == "https://example.com"));
    }
}
