//! Idempotent Pipelines-as-Code state management for GitLab-hosted
//! repositories.
//!
//! The crate converges remote repository state to a desired PaC
//! configuration:
//!   * merge requests delivering or removing pipeline definition files
//!     ([`GitLabClient::ensure_pac_merge_request`] /
//!     [`GitLabClient::undo_pac_merge_request`])
//!   * a webhook notifying an external CI controller
//!     ([`GitLabClient::setup_pac_webhook`] /
//!     [`GitLabClient::delete_pac_webhook`])
//!   * a repository visibility probe
//!     ([`GitLabClient::is_repository_public`]).
//!
//! All state lives on the remote provider; every operation re-reads
//! remote truth before writing, which is what makes repeated invocations
//! idempotent. Callers serialize operations per (repository, branch)
//! pair and requeue on transient provider errors.

pub mod errors;
pub mod git_providers;
pub mod reconcile;

pub use errors::{ConfigError, Error, PacResult, ProviderError};
pub use git_providers::gitlab::GitLabClient;
pub use git_providers::types::{
    CommitAction, CommitActionKind, MergeRequestData, MergeRequestHandle, MergeRequestState,
    RepositoryFile, RepositoryReference, RepositoryVisibility, Webhook, WebhookSettings,
};
pub use git_providers::{
    GitProvider, ProviderConfig, browse_link_at_sha, get_base_url, resolve_repository,
};
