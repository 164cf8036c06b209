use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::extractors::Region;

/// Errors raised while retrieving a page
#[derive(Error, Debug)]
pub enum FetchError {
    /// The URL could not be parsed or uses an unsupported scheme
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The server did not answer within the per-request timeout
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The server answered with a non-success status code
    #[error("server responded with status {0}")]
    Status(StatusCode),

    /// Connection, TLS, or body decoding failure
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The HTTP client itself could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    /// Whether a later attempt at the same URL could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout(_) | FetchError::Transport(_) => true,
            FetchError::Status(status) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            FetchError::InvalidUrl(_) | FetchError::Client(_) => false,
        }
    }
}

/// Errors raised while turning page markup into a [`Recipe`](crate::Recipe)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("page body is empty")]
    EmptyPage,

    /// A required region is absent from the page
    #[error("{0} element not found")]
    MissingRegion(Region),

    /// A required region is present but yielded no usable text
    #[error("no {0} found")]
    EmptyRegion(Region),

    /// A region is present but shaped unlike any variant the layout knows
    #[error("unrecognized {region} markup: {detail}")]
    UnrecognizedMarkup { region: Region, detail: String },

    /// Every configured layout strategy rejected the page
    #[error("no layout matched this page ({})", format_attempts(.0))]
    NoLayoutMatched(Vec<(String, ExtractError)>),

    #[error("unknown layout strategy: {0}")]
    UnknownStrategy(String),
}

fn format_attempts(attempts: &[(String, ExtractError)]) -> String {
    attempts
        .iter()
        .map(|(name, err)| format!("{name}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Why a single URL of a batch produced no recipe
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// The batch-wide deadline elapsed before this URL finished
    #[error("batch run timed out before this URL finished")]
    RunTimedOut,

    /// The worker processing this URL died without reporting a result
    #[error("processing was aborted")]
    Aborted,
}

/// Errors that stop the whole run rather than a single URL
#[derive(Error, Debug)]
pub enum MealprintError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// Builder configuration error
    #[error("Builder error: {0}")]
    Builder(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(FetchError::Status(StatusCode::BAD_GATEWAY).is_retryable());
        assert!(FetchError::Status(StatusCode::TOO_MANY_REQUESTS).is_retryable());
        assert!(!FetchError::Status(StatusCode::NOT_FOUND).is_retryable());
        assert!(FetchError::Timeout(Duration::from_secs(5)).is_retryable());
        assert!(!FetchError::InvalidUrl("nope".to_string()).is_retryable());
    }

    #[test]
    fn test_extract_error_messages() {
        assert_eq!(
            ExtractError::MissingRegion(Region::Title).to_string(),
            "title element not found"
        );
        assert_eq!(
            ExtractError::EmptyRegion(Region::Ingredients).to_string(),
            "no ingredients found"
        );
    }

    #[test]
    fn test_no_layout_matched_lists_every_attempt() {
        let err = ExtractError::NoLayoutMatched(vec![
            (
                "emeals".to_string(),
                ExtractError::MissingRegion(Region::Title),
            ),
            (
                "json_ld".to_string(),
                ExtractError::EmptyRegion(Region::Steps),
            ),
        ]);
        assert_eq!(
            err.to_string(),
            "no layout matched this page (emeals: title element not found; json_ld: no steps found)"
        );
    }

    #[test]
    fn test_timeout_message() {
        let err = ProcessError::from(FetchError::Timeout(Duration::from_secs(30)));
        assert_eq!(err.to_string(), "request timed out after 30s");
    }
}
