use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use roomwatch_core::error::AppError;
use roomwatch_core::traits::Fetcher;

/// Flags passed to Chromium on top of `chromiumoxide`'s no-sandbox setup.
const CHROME_ARGS: &[&str] = &[
    "--headless=new",
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--no-first-run",
];

/// Install locations probed when `CHROME_BIN` is unset.
///
/// The snap path comes first: the snap wrapper script rejects headless flags.
const CHROME_LOCATIONS: &[&str] = &[
    "/snap/chromium/current/usr/lib/chromium-browser/chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
];

/// Renders listing pages in headless Chromium over the DevTools Protocol.
///
/// Every clone shares one Chromium process. [`Fetcher::fetch`] opens a tab,
/// lets the page scripts run for `render_wait`, reads the rendered HTML and
/// closes the tab.
///
/// Once the DevTools connection is gone every fetch fails with
/// [`AppError::FetcherUnavailable`], so the cycle is abandoned instead of
/// reporting the remaining pages as empty.
///
/// ```rust,no_run
/// use std::time::Duration;
/// use roomwatch_client::BrowserFetcher;
/// use roomwatch_core::traits::Fetcher;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = BrowserFetcher::launch(Duration::from_secs(30), Duration::from_secs(3)).await?;
/// let html = fetcher.fetch("https://example.com/offers#page=1").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BrowserFetcher {
    browser: Arc<Browser>,
    connected: Arc<AtomicBool>,
    timeout: Duration,
    render_wait: Duration,
}

impl BrowserFetcher {
    /// Starts Chromium and the task driving its DevTools connection.
    ///
    /// Any failure here means no page can be rendered and is reported as
    /// [`AppError::FetcherUnavailable`].
    pub async fn launch(timeout: Duration, render_wait: Duration) -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder().no_sandbox().disable_default_args();
        if let Some(executable) = chrome_executable() {
            tracing::debug!(executable = %executable.display(), "Using Chromium binary");
            builder = builder.chrome_executable(executable);
        }
        let config = CHROME_ARGS
            .iter()
            .fold(builder, |builder, arg| builder.arg(*arg))
            .build()
            .map_err(|e| AppError::FetcherUnavailable(format!("Invalid browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::FetcherUnavailable(format!("Could not start Chromium: {e}")))?;

        let connected = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&connected);
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                match event {
                    Ok(()) => {}
                    Err(CdpError::Ws(e)) => {
                        tracing::warn!(error = %e, "DevTools connection lost");
                        break;
                    }
                    Err(e) => tracing::debug!(error = %e, "DevTools handler error"),
                }
            }
            flag.store(false, Ordering::SeqCst);
            tracing::debug!("DevTools handler stopped");
        });

        Ok(Self {
            browser: Arc::new(browser),
            connected,
            timeout,
            render_wait,
        })
    }

    /// Whether the DevTools connection is still being served.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn classify(&self, err: CdpError, context: &str) -> AppError {
        classify_cdp_error(err, self.is_connected(), context)
    }

    async fn render(&self, url: &str) -> Result<String, AppError> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| self.classify(e, &format!("Failed to open {url}")))?;

        if !self.render_wait.is_zero() {
            tokio::time::sleep(self.render_wait).await;
        }

        let html = match page.find_element("body").await {
            Ok(_) => page
                .content()
                .await
                .map_err(|e| self.classify(e, "Failed to read page content")),
            Err(e) => Err(self.classify(e, "Page did not render a body")),
        };

        if let Err(e) = page.close().await {
            tracing::debug!(error = %e, %url, "Failed to close tab");
        }
        html
    }
}

/// Maps a DevTools error to the monitor's error taxonomy.
///
/// Errors that mean the browser itself is gone are fatal; anything else is
/// a problem with the one page being rendered.
fn classify_cdp_error(err: CdpError, connected: bool, context: &str) -> AppError {
    let browser_gone = !connected
        || matches!(
            err,
            CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse
        );
    if browser_gone {
        AppError::FetcherUnavailable(format!("{context}: browser is gone ({err})"))
    } else {
        AppError::HttpError(format!("{context}: {err}"))
    }
}

/// `CHROME_BIN` if it exists, else the first known install location.
///
/// `None` leaves the lookup to `chromiumoxide`.
fn chrome_executable() -> Option<PathBuf> {
    std::env::var_os("CHROME_BIN")
        .map(PathBuf::from)
        .into_iter()
        .chain(CHROME_LOCATIONS.iter().map(PathBuf::from))
        .find(|path| path.exists())
}

impl Fetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        if !self.is_connected() {
            return Err(AppError::FetcherUnavailable(format!(
                "Cannot render {url}: browser is gone"
            )));
        }

        match tokio::time::timeout(self.timeout + self.render_wait, self.render(url)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(self.timeout.as_secs())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lost_connection_is_fatal() {
        let err = classify_cdp_error(CdpError::NoResponse, true, "Failed to open page 3");
        assert!(err.is_fatal());
        assert!(err.to_string().contains("browser is gone"));
    }

    #[test]
    fn page_error_is_recoverable_while_connected() {
        let err = classify_cdp_error(CdpError::NotFound, true, "Page did not render a body");
        assert!(matches!(err, AppError::HttpError(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn any_error_is_fatal_after_disconnect() {
        let err = classify_cdp_error(CdpError::NotFound, false, "Page did not render a body");
        assert!(matches!(err, AppError::FetcherUnavailable(_)));
    }
}
