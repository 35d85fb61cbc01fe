//! Action execution against the live portal UI
//!
//! Actions stay declarative; a [`UiDriver`] performs exactly one attempt of
//! one action and classifies its failures as transient or fatal. The
//! [`ActionExecutor`] owns the retry policy on top of that classification,
//! so retry decisions never depend on unwinding.

use async_trait::async_trait;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use std::time::Instant;
use tracing::warn;

use crate::config::{RetryPolicy, WaitPolicy};
use crate::error::{PortalError, PortalResult};
use crate::models::{Action, ActionKind};

/// One attempt of one action.
///
/// Implementations wait for the element themselves, bounded by their own
/// timeout policy, and return errors classified through
/// [`PortalError::is_transient`].
#[async_trait]
pub trait UiDriver: Send + Sync {
    async fn attempt(&self, action: &Action) -> PortalResult<()>;
}

/// Production driver talking to a chromiumoxide page
pub struct CdpDriver {
    page: Page,
    waits: WaitPolicy,
}

impl CdpDriver {
    pub fn new(page: Page, waits: WaitPolicy) -> Self {
        Self { page, waits }
    }

    /// Polls the page until the locator resolves or the element timeout
    /// runs out. Each poll issues a fresh query, so elements re-rendered
    /// during navigation are picked up on the next pass. Only a missing
    /// node keeps the poll alive; a failing browser connection ends it
    /// at once.
    async fn resolve_element(&self, locator: &str) -> PortalResult<Element> {
        let start = Instant::now();
        loop {
            match self.page.find_element(locator).await {
                Ok(element) => return Ok(element),
                Err(err) if !is_missing_node(&err) => return Err(PortalError::Browser(err)),
                Err(_) if start.elapsed() < self.waits.element_timeout => {
                    tokio::time::sleep(self.waits.poll_interval).await;
                }
                Err(_) => {
                    return Err(PortalError::ElementNotReady {
                        selector: locator.to_string(),
                        waited_ms: start.elapsed().as_millis() as u64,
                    });
                }
            }
        }
    }
}

#[async_trait]
impl UiDriver for CdpDriver {
    async fn attempt(&self, action: &Action) -> PortalResult<()> {
        let element = self.resolve_element(&action.locator).await?;

        match action.kind {
            ActionKind::Click => {
                element
                    .click()
                    .await
                    .map_err(|e| classify_interaction_error(&action.locator, e))?;
            }
            ActionKind::Input => {
                let text = action.text.as_deref().unwrap_or_default();
                element
                    .focus()
                    .await
                    .map_err(|e| classify_interaction_error(&action.locator, e))?;
                // Drop whatever the portal pre-filled before typing.
                element
                    .call_js_fn("function() { this.value = ''; }", false)
                    .await
                    .map_err(|e| classify_interaction_error(&action.locator, e))?;
                element
                    .type_str(text)
                    .await
                    .map_err(|e| classify_interaction_error(&action.locator, e))?;
            }
        }

        Ok(())
    }
}

/// Whether a CDP failure means the addressed node is absent or left the
/// document, as opposed to the browser connection itself failing. Chrome
/// reports lookups and interactions against a vanished node with
/// node-lookup messages; a failed connection never recovers by waiting.
fn is_missing_node(err: &CdpError) -> bool {
    match err {
        CdpError::NotFound => true,
        err => err.to_string().to_lowercase().contains("node"),
    }
}

/// Maps a CDP failure during an interaction onto the retry taxonomy:
/// a vanished node deserves a retry against a fresh element, everything
/// else is fatal.
fn classify_interaction_error(locator: &str, err: CdpError) -> PortalError {
    if is_missing_node(&err) {
        PortalError::StaleElement {
            selector: locator.to_string(),
        }
    } else {
        PortalError::Browser(err)
    }
}

/// Runs declarative actions with bounded retry of transient failures
pub struct ActionExecutor<D> {
    driver: D,
    retry: RetryPolicy,
}

impl<D: UiDriver> ActionExecutor<D> {
    pub fn new(driver: D, retry: RetryPolicy) -> Self {
        Self { driver, retry }
    }

    /// Executes one action.
    ///
    /// Transient failures are retried up to the attempt cap; fatal ones
    /// propagate immediately. The backoff, when configured, runs between
    /// attempts and never after the last.
    pub async fn execute(&self, action: Action) -> PortalResult<()> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.driver.attempt(&action).await {
                Ok(()) => return Ok(()),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    warn!(
                        "Attempt {}/{} failed on '{}': {}",
                        attempt, max_attempts, action.locator, err
                    );
                    if !self.retry.backoff.is_zero() {
                        tokio::time::sleep(self.retry.backoff).await;
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Executes actions in order, stopping at the first unrecovered failure.
    pub async fn execute_all(&self, actions: Vec<Action>) -> PortalResult<()> {
        for action in actions {
            self.execute(action).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::test_support::MockDriver;
    use std::time::Duration;

    fn retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: Duration::ZERO,
        }
    }

    fn not_ready(selector: &str) -> PortalError {
        PortalError::ElementNotReady {
            selector: selector.to_string(),
            waited_ms: 10,
        }
    }

    #[tokio::test]
    async fn recovers_after_two_transient_failures() {
        let driver = MockDriver::new(|attempt, action| {
            if attempt < 2 {
                Err(not_ready(&action.locator))
            } else {
                Ok(())
            }
        });
        let executor = ActionExecutor::new(driver, retry(3));

        let result = executor.execute(Action::click("button.red")).await;

        assert!(result.is_ok());
        assert_eq!(executor.driver.attempts(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_the_attempt_cap() {
        let driver = MockDriver::new(|_, action| Err(not_ready(&action.locator)));
        let executor = ActionExecutor::new(driver, retry(3));

        let result = executor.execute(Action::click("button.red")).await;

        assert!(matches!(
            result,
            Err(PortalError::ElementNotReady { .. })
        ));
        assert_eq!(executor.driver.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_runs_between_attempts_but_not_after_the_last() {
        let driver = MockDriver::new(|_, action| Err(not_ready(&action.locator)));
        let executor = ActionExecutor::new(
            driver,
            RetryPolicy {
                max_attempts: 3,
                backoff: Duration::from_secs(1),
            },
        );

        let started = tokio::time::Instant::now();
        let result = executor.execute(Action::click("button.red")).await;

        assert!(result.is_err());
        assert_eq!(executor.driver.attempts(), 3);
        // Two pauses separate three attempts; a third would show up here.
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn fatal_failures_are_not_retried() {
        let driver = MockDriver::new(|_, _| {
            Err(PortalError::Launch {
                message: "browser went away".to_string(),
            })
        });
        let executor = ActionExecutor::new(driver, retry(3));

        let result = executor.execute(Action::click("button.red")).await;

        assert!(matches!(result, Err(PortalError::Launch { .. })));
        assert_eq!(executor.driver.attempts(), 1);
    }

    #[test]
    fn missing_nodes_are_distinguished_from_connection_failures() {
        let vanished = CdpError::Chrome(chromiumoxide::types::Error {
            code: -32000,
            message: "Could not find node with given id".to_string(),
        });
        assert!(is_missing_node(&vanished));
        assert!(is_missing_node(&CdpError::NotFound));

        assert!(!is_missing_node(&CdpError::NoResponse));
        assert!(!is_missing_node(&CdpError::Timeout));

        let stale = classify_interaction_error(
            "#login-email",
            CdpError::msg("Node with given id does not belong to the document"),
        );
        assert!(stale.is_transient());
        assert!(matches!(stale, PortalError::StaleElement { .. }));

        let fatal = classify_interaction_error("#login-email", CdpError::NoResponse);
        assert!(!fatal.is_transient());
        assert!(matches!(fatal, PortalError::Browser(_)));
    }

    #[tokio::test]
    async fn connection_failures_are_fatal_immediately() {
        let driver = MockDriver::new(|_, _| Err(PortalError::Browser(CdpError::NoResponse)));
        let executor = ActionExecutor::new(driver, retry(3));

        let result = executor.execute(Action::click("button.red")).await;

        assert!(matches!(result, Err(PortalError::Browser(_))));
        assert_eq!(executor.driver.attempts(), 1);
    }

    #[tokio::test]
    async fn sequences_stop_at_the_first_unrecovered_failure() {
        let driver = MockDriver::new(|_, action| {
            if action.locator == "#second" {
                Err(not_ready(&action.locator))
            } else {
                Ok(())
            }
        });
        let executor = ActionExecutor::new(driver, retry(2));

        let result = executor
            .execute_all(vec![
                Action::click("#first"),
                Action::click("#second"),
                Action::click("#third"),
            ])
            .await;

        assert!(result.is_err());
        // #first once, #second twice, #third never.
        assert_eq!(executor.driver.attempts(), 3);
        let attempted = executor.driver.attempted_locators();
        assert!(!attempted.contains(&"#third".to_string()));
    }
}
