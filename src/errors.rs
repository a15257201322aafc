use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Browser launch failed: {0}")]
    LaunchFailure(String),

    #[error("Navigation timed out: {0}")]
    NavigationTimeout(String),

    #[error("Navigation blocked: {0}")]
    NavigationBlocked(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Accessibility extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Caller-visible failure classes. The outer layer maps these to status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidUrl,
    LaunchFailure,
    NavigationTimeout,
    NavigationBlocked,
    NavigationFailed,
    ExtractionFailed,
    Internal,
}

impl SnapshotError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SnapshotError::InvalidUrl(_) => ErrorKind::InvalidUrl,
            SnapshotError::LaunchFailure(_) => ErrorKind::LaunchFailure,
            SnapshotError::NavigationTimeout(_) => ErrorKind::NavigationTimeout,
            SnapshotError::NavigationBlocked(_) => ErrorKind::NavigationBlocked,
            SnapshotError::NavigationFailed(_) => ErrorKind::NavigationFailed,
            SnapshotError::ExtractionFailed(_) => ErrorKind::ExtractionFailed,
            SnapshotError::Configuration(_) | SnapshotError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Deployment-level failures: retrying with another URL will not help.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SnapshotError::LaunchFailure(_) | SnapshotError::Configuration(_)
        )
    }

    /// Classify an automation-engine error raised while starting the browser
    /// or opening a page. Anything that does not look like a launch problem is
    /// treated as internal.
    pub fn from_engine_error<E: std::fmt::Display>(err: E) -> Self {
        let message = err.to_string();
        if looks_like_launch_failure(&message) {
            SnapshotError::LaunchFailure(message)
        } else {
            SnapshotError::Internal(message)
        }
    }

    /// Classify an automation-engine error raised while navigating to `url`.
    pub fn from_navigation_error<E: std::fmt::Display>(url: &str, err: E) -> Self {
        let message = err.to_string();
        let lower = message.to_lowercase();

        if lower.contains("timeout") || lower.contains("timed out") {
            SnapshotError::NavigationTimeout(format!("{url}: {message}"))
        } else if looks_like_launch_failure(&message) {
            SnapshotError::LaunchFailure(message)
        } else if lower.contains("net::err_") || lower.contains("dns") || lower.contains("connection") {
            SnapshotError::NavigationFailed(format!("network error accessing {url}: {message}"))
        } else {
            SnapshotError::NavigationFailed(format!("{url}: {message}"))
        }
    }
}

fn looks_like_launch_failure(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("executable")
        || lower.contains("could not auto detect")
        || lower.contains("failed to launch")
}

impl From<anyhow::Error> for SnapshotError {
    fn from(err: anyhow::Error) -> Self {
        SnapshotError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for SnapshotError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            SnapshotError::Internal("page callback panicked".to_string())
        } else {
            SnapshotError::Internal(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_errors_are_classified_by_message() {
        let err = SnapshotError::from_navigation_error(
            "https://slow.test/",
            "Timeout while waiting for event Page.frameStoppedLoading",
        );
        assert_eq!(err.kind(), ErrorKind::NavigationTimeout);

        let err = SnapshotError::from_navigation_error(
            "https://nowhere.test/",
            "net::ERR_NAME_NOT_RESOLVED",
        );
        assert_eq!(err.kind(), ErrorKind::NavigationFailed);
        assert!(err.to_string().contains("network error"));

        let err = SnapshotError::from_navigation_error("https://x.test/", "something odd");
        assert_eq!(err.kind(), ErrorKind::NavigationFailed);
    }

    #[test]
    fn launch_problems_are_fatal() {
        let err = SnapshotError::from_engine_error("Could not auto detect a chrome executable");
        assert_eq!(err.kind(), ErrorKind::LaunchFailure);
        assert!(err.is_fatal());

        let err = SnapshotError::from_engine_error("tab crashed");
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(!err.is_fatal());
    }

    #[test]
    fn configuration_errors_surface_as_internal() {
        let err = SnapshotError::Configuration("pool_size must be at least 1".into());
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.is_fatal());
    }

    #[test]
    fn kinds_serialize_in_snake_case() {
        let json = serde_json::to_string(&ErrorKind::NavigationBlocked).unwrap();
        assert_eq!(json, "\"navigation_blocked\"");
    }
}
