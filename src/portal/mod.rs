//! Portal session orchestration
//!
//! One [`PortalSession`] owns one browser for one run: sign in, then walk
//! the processing window date by date, exporting and claiming one report
//! file per date. The browser is closed on every exit path.

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::PortalConfig;
use crate::error::{PortalError, PortalResult};
use crate::models::{Action, CalendarPosition, DownloadTarget, FetchedReport, ProcessingWindow};

pub mod actions;
pub mod download;
pub mod selectors;
#[cfg(test)]
pub(crate) mod test_support;

use actions::{ActionExecutor, CdpDriver, UiDriver};
use selectors::date_cell_selector;

// Sign-in controls on the portal's SSO flow.
const SSO_BUTTON: &str = "#sso-sign-in";
const LOGIN_INPUT: &str = "#login-email";
const NEXT_BUTTON: &str = "#login-next";
const PASSWORD_INPUT: &str = "#login-password";
const SUBMIT_BUTTON: &str = "#login-submit";

// Controls on the turnover report page.
const RANGE_PICKER_BUTTON: &str = "button.btn-block";
const APPLY_BUTTON: &str = "button.red";
const EXPORT_MENU_ITEM: &str = "div.col-md-6:nth-child(2) > div:nth-child(1) > ul:nth-child(1) \
     > li:nth-child(2) > ul:nth-child(1) > li:nth-child(1) > button:nth-child(1) > i:nth-child(1)";

/// Lifecycle of one portal run, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionPhase {
    Init,
    Authenticating,
    Ready,
    ProcessingDate(usize),
    Done,
    Failed,
}

/// The fixed five-step sign-in flow: provider button, login, next,
/// password, submit.
fn authentication_actions(username: &str, password: &str) -> Vec<Action> {
    vec![
        Action::click(SSO_BUTTON),
        Action::input(LOGIN_INPUT, username),
        Action::click(NEXT_BUTTON),
        Action::input(PASSWORD_INPUT, password),
        Action::click(SUBMIT_BUTTON),
    ]
}

/// Per-date flow: open the range picker, pick the day cell, apply the
/// range, drill into the export submenu.
fn processing_actions(date_cell: &str) -> Vec<Action> {
    vec![
        Action::click(RANGE_PICKER_BUTTON),
        Action::click(date_cell),
        Action::click(APPLY_BUTTON),
        Action::click(EXPORT_MENU_ITEM),
    ]
}

/// Runs the authenticated export flow for every date in the window.
///
/// Dates are processed strictly in window order and the first failure
/// aborts the remainder, so the files produced are always a prefix of the
/// window.
async fn drive_exports<D: UiDriver>(
    executor: &ActionExecutor<D>,
    config: &PortalConfig,
    window: &ProcessingWindow,
    download_dir: &Path,
) -> PortalResult<Vec<FetchedReport>> {
    let mut phase = SessionPhase::Authenticating;
    debug!("Session phase: {:?}", phase);

    executor
        .execute_all(authentication_actions(&config.username, &config.password))
        .await
        .map_err(|source| PortalError::AuthenticationFailed {
            source: Box::new(source),
        })?;

    phase = SessionPhase::Ready;
    debug!("Session phase: {:?}", phase);
    info!("Authenticated against {}", config.base_url);

    let mut reports = Vec::with_capacity(window.dates().len());

    for (index, date) in window.dates().iter().enumerate() {
        phase = SessionPhase::ProcessingDate(index);
        debug!("Session phase: {:?}", phase);
        info!(
            "Processing report date {} ({} of {})",
            date,
            index + 1,
            window.dates().len()
        );

        let position = CalendarPosition::for_date(*date);
        let cell = date_cell_selector(position, index, config.calendar_offsets);
        executor.execute_all(processing_actions(&cell)).await?;

        let target = DownloadTarget::for_report_date(download_dir, &config.report_name, *date);
        let path = download::wait_for_file(download_dir, &target, config.waits).await?;

        reports.push(FetchedReport {
            report_date: *date,
            file_path: path.display().to_string(),
            fetched_at: chrono::Utc::now(),
        });
    }

    phase = SessionPhase::Done;
    debug!("Session phase: {:?}", phase);

    Ok(reports)
}

/// One live browser session against the portal
pub struct PortalSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    executor: ActionExecutor<CdpDriver>,
    config: PortalConfig,
    download_dir: PathBuf,
}

impl PortalSession {
    /// Launches the browser, points downloads at `download_dir` and opens
    /// the portal start page.
    pub async fn launch(config: &PortalConfig, download_dir: &Path) -> PortalResult<Self> {
        debug!("Session phase: {:?}", SessionPhase::Init);

        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");
        if let Some(path) = &config.browser_path {
            builder = builder.chrome_executable(path);
        }
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder
            .build()
            .map_err(|message| PortalError::Launch { message })?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;
        let handler_task = tokio::spawn(async move { while (handler.next().await).is_some() {} });

        let page = browser.new_page(config.base_url.as_str()).await?;
        page.wait_for_navigation().await?;

        // Route downloads into the watched directory instead of the
        // profile default.
        let behavior = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(download_dir.display().to_string())
            .build()
            .map_err(|message| PortalError::Launch { message })?;
        page.execute(behavior).await?;

        let driver = CdpDriver::new(page, config.waits);
        let executor = ActionExecutor::new(driver, config.retry);

        Ok(Self {
            browser,
            handler_task,
            executor,
            config: config.clone(),
            download_dir: download_dir.to_path_buf(),
        })
    }

    /// Runs the full export flow, closing the browser on every exit path.
    pub async fn run(mut self, window: &ProcessingWindow) -> PortalResult<Vec<FetchedReport>> {
        let result = drive_exports(&self.executor, &self.config, window, &self.download_dir).await;

        if let Err(err) = &result {
            debug!("Session phase: {:?}", SessionPhase::Failed);
            warn!("Portal session failed: {}", err);
        }

        self.shutdown().await;
        result
    }

    async fn shutdown(&mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Browser did not close cleanly: {}", e);
        }
        self.handler_task.abort();
    }
}

impl Drop for PortalSession {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}
