//! Crate-wide error hierarchy.
//!
//! Goals:
//! - Single root `Error` for all public functions.
//! - Provider-aware mapping (401→Unauthorized, 429→RateLimited, 5xx→Server, etc.).
//! - A transient/permanent split the caller can requeue on, ergonomic `?`
//!   via `From` impls, no dynamic dispatch.

use thiserror::Error;

use crate::git_providers::types::MergeRequestState;

/// Convenient alias for crate-wide results.
pub type PacResult<T> = Result<T, Error>;

/// Root error type for the pac-reconciler crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Provider-side failure, classified by the taxonomy in [`ProviderError`].
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Configuration problems at client construction (token, base URL).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Repository URL does not match the provider's host/path shape.
    #[error("invalid repository url: {0}")]
    InvalidRepositoryUrl(String),

    /// A branch is left over from a merge request that was already merged
    /// or closed. Re-creating under the same branch name is ambiguous, so
    /// the state is surfaced for operator attention instead.
    #[error("stale branch {branch}: merge request !{iid} is {state}")]
    StaleBranchConflict {
        branch: String,
        iid: u64,
        state: MergeRequestState,
    },
}

/// Detailed provider-specific error used inside the provider layer.
///
/// Variants follow HTTP classes; [`ProviderError::is_transient`] splits
/// them into retryable (network/5xx/rate-limit) and permanent (4xx)
/// failures. The crate never retries internally.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Unauthorized (HTTP 401).
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden (HTTP 403).
    #[error("forbidden")]
    Forbidden,

    /// Not found (HTTP 404).
    #[error("not found")]
    NotFound,

    /// Conflict (HTTP 409), e.g. a branch that already exists.
    #[error("conflict")]
    Conflict,

    /// Rate limited (HTTP 429).
    #[error("rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Gateway/Server error (HTTP 5xx).
    #[error("server error: status {0}")]
    Server(u16),

    /// Other HTTP status (4xx/3xx) not covered above.
    #[error("http status error: {0}")]
    HttpStatus(u16),

    /// Timeout at transport level.
    #[error("timeout")]
    Timeout,

    /// Network/transport failure without status (DNS/connect/reset).
    #[error("network error: {0}")]
    Network(String),

    /// Unexpected/invalid shape of provider response.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// True when the failure is safe to retry from the caller's side.
    ///
    /// Controllers requeue on transient failures and surface the rest as
    /// terminal, human-actionable errors.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited { .. }
                | ProviderError::Server(_)
                | ProviderError::Timeout
                | ProviderError::Network(_)
        )
    }

    /// Maps an HTTP status code into the taxonomy.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ProviderError::Unauthorized,
            403 => ProviderError::Forbidden,
            404 => ProviderError::NotFound,
            409 => ProviderError::Conflict,
            429 => ProviderError::RateLimited {
                retry_after_secs: None,
            },
            500..=599 => ProviderError::Server(status),
            _ => ProviderError::HttpStatus(status),
        }
    }
}

/// Configuration and setup errors (base URL, missing token).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required provider access token.
    #[error("missing provider token")]
    MissingToken,

    /// Invalid base API URL.
    #[error("invalid base api url: {0}")]
    InvalidBaseUrl(String),
}

// ===== Conversions for `?` ergonomics =====

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Provider(ProviderError::from(e))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return ProviderError::Timeout;
        }
        if e.is_decode() {
            return ProviderError::InvalidResponse(e.to_string());
        }
        if let Some(status) = e.status() {
            return ProviderError::from_status(status.as_u16());
        }
        ProviderError::Network(e.to_string())
    }
}
