//! Error types for the portal automation layer

use std::path::PathBuf;
use thiserror::Error;

/// Result type for portal operations
pub type PortalResult<T> = Result<T, PortalError>;

/// Errors raised while driving the portal UI
#[derive(Debug, Error)]
pub enum PortalError {
    /// The locator never resolved within the attempt timeout
    #[error("Element '{selector}' not ready after {waited_ms}ms")]
    ElementNotReady { selector: String, waited_ms: u64 },

    /// The element left the document before the interaction landed
    #[error("Element '{selector}' went stale during interaction")]
    StaleElement { selector: String },

    /// The sign-in sequence failed; nothing else can run in this session
    #[error("Authentication against the portal failed: {source}")]
    AuthenticationFailed {
        #[source]
        source: Box<PortalError>,
    },

    /// No file matching the expected prefix appeared in time
    #[error("Download '{prefix}' did not complete within {waited_ms}ms")]
    DownloadTimeout { prefix: String, waited_ms: u64 },

    /// Moving the downloaded file to its final name failed
    #[error("Failed to rename downloaded file to {}: {source}", .destination.display())]
    RenameFailed {
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The browser could not be configured or started
    #[error("Failed to launch browser: {message}")]
    Launch { message: String },

    /// Transport or protocol failure talking to the browser
    #[error("Browser protocol error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),
}

impl PortalError {
    /// Whether retrying the same action may succeed.
    ///
    /// Only element readiness and staleness are worth another attempt;
    /// everything else means the session or environment is broken.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ElementNotReady { .. } | Self::StaleElement { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_and_staleness_are_transient() {
        let not_ready = PortalError::ElementNotReady {
            selector: "#login".to_string(),
            waited_ms: 10_000,
        };
        let stale = PortalError::StaleElement {
            selector: "#login".to_string(),
        };

        assert!(not_ready.is_transient());
        assert!(stale.is_transient());
    }

    #[test]
    fn everything_else_is_fatal() {
        let timeout = PortalError::DownloadTimeout {
            prefix: "TurnoverList.xlsx".to_string(),
            waited_ms: 10_000,
        };
        let auth = PortalError::AuthenticationFailed {
            source: Box::new(PortalError::ElementNotReady {
                selector: "#password".to_string(),
                waited_ms: 10_000,
            }),
        };
        let launch = PortalError::Launch {
            message: "no browser".to_string(),
        };

        assert!(!timeout.is_transient());
        assert!(!auth.is_transient());
        assert!(!launch.is_transient());
    }
}
