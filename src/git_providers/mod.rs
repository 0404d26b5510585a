//! Provider capability set for PaC reconciliation.
//!
//! The primitives a reconciler needs (branch, file, commit, merge
//! request, webhook, visibility) are expressed as the [`GitProvider`]
//! trait with native async fns — no async-trait, no boxed futures. The
//! reconcilers in [`crate::reconcile`] are written once against this
//! trait; [`gitlab::GitLabClient`] is the shipped implementation.

pub mod types;
pub use types::*;

pub mod gitlab;

use std::time::Duration;

use url::Url;

use crate::errors::{Error, PacResult};

/// Default per-request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration for a provider client.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Host base, e.g. "https://gitlab.com".
    pub base_url: String,
    /// Access token for the provider (PAT or project token).
    pub token: String,
    /// Timeout applied to every remote call.
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn new(token: &str, base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            token: token.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Remote primitives consumed by the reconcilers.
///
/// Every method is a single synchronous remote call chain re-reading
/// remote truth; implementations hold no cache. Consumed generically,
/// not object-safe.
#[allow(async_fn_in_trait)]
pub trait GitProvider {
    /// Default branch of the repository.
    async fn default_branch(&self, repo: &RepositoryReference) -> PacResult<String>;

    /// Head commit SHA of a branch, `None` when the branch does not exist.
    async fn branch_sha(
        &self,
        repo: &RepositoryReference,
        branch: &str,
    ) -> PacResult<Option<String>>;

    async fn branch_exists(&self, repo: &RepositoryReference, branch: &str) -> PacResult<bool> {
        Ok(self.branch_sha(repo, branch).await?.is_some())
    }

    /// Creates `branch` pointing at `from_ref`.
    async fn create_branch(
        &self,
        repo: &RepositoryReference,
        branch: &str,
        from_ref: &str,
    ) -> PacResult<()>;

    /// Deletes `branch`; an absent branch is not an error.
    async fn delete_branch(&self, repo: &RepositoryReference, branch: &str) -> PacResult<()>;

    /// Raw file bytes at a ref, `None` when the path does not exist there.
    async fn file_content(
        &self,
        repo: &RepositoryReference,
        path: &str,
        git_ref: &str,
    ) -> PacResult<Option<Vec<u8>>>;

    /// Applies `actions` to `branch` as one atomic commit.
    async fn commit_files(
        &self,
        repo: &RepositoryReference,
        branch: &str,
        message: &str,
        author_name: &str,
        author_email: &str,
        actions: &[CommitAction],
    ) -> PacResult<()>;

    /// Newest merge request for the source→target branch pair, in any state.
    async fn find_merge_request(
        &self,
        repo: &RepositoryReference,
        source: &str,
        target: &str,
    ) -> PacResult<Option<MergeRequestHandle>>;

    async fn create_merge_request(
        &self,
        repo: &RepositoryReference,
        source: &str,
        target: &str,
        title: &str,
        description: &str,
    ) -> PacResult<MergeRequestHandle>;

    async fn list_webhooks(&self, repo: &RepositoryReference) -> PacResult<Vec<Webhook>>;

    async fn create_webhook(
        &self,
        repo: &RepositoryReference,
        settings: &WebhookSettings,
        secret: &str,
    ) -> PacResult<()>;

    async fn update_webhook(
        &self,
        repo: &RepositoryReference,
        hook_id: u64,
        settings: &WebhookSettings,
        secret: &str,
    ) -> PacResult<()>;

    async fn delete_webhook(&self, repo: &RepositoryReference, hook_id: u64) -> PacResult<()>;

    async fn visibility(&self, repo: &RepositoryReference) -> PacResult<RepositoryVisibility>;
}

/// Parses a repository URL into provider coordinates.
///
/// Accepts "https://host/namespace/project" with optional nested groups,
/// a trailing ".git" and trailing slashes. Fails with
/// [`Error::InvalidRepositoryUrl`] when the host is missing or the path
/// has fewer than two segments.
pub fn resolve_repository(repo_url: &str) -> PacResult<RepositoryReference> {
    let parsed = parse_http_url(repo_url)?;
    let host = host_with_port(&parsed);

    let path = parsed.path().trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
        return Err(Error::InvalidRepositoryUrl(format!(
            "{repo_url}: expected <host>/<namespace>/<project>"
        )));
    }

    Ok(RepositoryReference {
        host,
        project_path: segments.join("/"),
    })
}

/// Scheme + host (+port) of a repository URL, for constructing a client
/// scoped to the repository's host.
pub fn get_base_url(repo_url: &str) -> PacResult<String> {
    let parsed = parse_http_url(repo_url)?;
    Ok(format!("{}://{}", parsed.scheme(), host_with_port(&parsed)))
}

/// Browse URL for the repository tree at a specific commit.
pub fn browse_link_at_sha(repo_url: &str, sha: &str) -> PacResult<String> {
    let base = get_base_url(repo_url)?;
    let repo = resolve_repository(repo_url)?;
    Ok(format!("{}/{}/-/tree/{}", base, repo.project_path, sha))
}

fn parse_http_url(repo_url: &str) -> PacResult<Url> {
    let parsed = Url::parse(repo_url)
        .map_err(|e| Error::InvalidRepositoryUrl(format!("{repo_url}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(Error::InvalidRepositoryUrl(format!(
            "{repo_url}: expected an http(s) repository url"
        )));
    }
    Ok(parsed)
}

fn host_with_port(parsed: &Url) -> String {
    // host_str is checked by parse_http_url before this is called
    let host = parsed.host_str().unwrap_or_default();
    match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}
