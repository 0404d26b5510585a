//! GitLab provider (REST v4) for PaC branch, commit, merge request and
//! webhook state.
//!
//! Endpoints used (as of 2025):
//! - GET    /projects/:id
//! - GET    /projects/:id/repository/branches/:branch
//! - POST   /projects/:id/repository/branches
//! - DELETE /projects/:id/repository/branches/:branch
//! - GET    /projects/:id/repository/files/:path/raw?ref=:ref
//! - POST   /projects/:id/repository/commits
//! - GET    /projects/:id/merge_requests?source_branch=&target_branch=
//! - POST   /projects/:id/merge_requests
//! - GET    /projects/:id/hooks
//! - POST   /projects/:id/hooks
//! - PUT    /projects/:id/hooks/:hook_id
//! - DELETE /projects/:id/hooks/:hook_id

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::errors::{ConfigError, PacResult, ProviderError};
use crate::git_providers::types::*;
use crate::git_providers::{GitProvider, ProviderConfig, resolve_repository};
use crate::reconcile;

/// GitLab HTTP client wrapper.
#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: Client,
    base_api: String, // e.g. "https://gitlab.com/api/v4"
    token: String,    // "PRIVATE-TOKEN"
}

impl GitLabClient {
    /// Constructs a client from an access token and a host base URL
    /// (e.g. "https://gitlab.com").
    ///
    /// Fails with a config error when the token is empty or the URL is
    /// not a parseable http(s) URL.
    pub fn new(access_token: &str, base_url: &str) -> PacResult<Self> {
        Self::from_config(ProviderConfig::new(access_token, base_url))
    }

    /// Constructs a client from explicit configuration.
    pub fn from_config(cfg: ProviderConfig) -> PacResult<Self> {
        if cfg.token.is_empty() {
            return Err(ConfigError::MissingToken.into());
        }
        let parsed = Url::parse(&cfg.base_url)
            .map_err(|e| ConfigError::InvalidBaseUrl(format!("{}: {e}", cfg.base_url)))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(ConfigError::InvalidBaseUrl(cfg.base_url).into());
        }

        let http = Client::builder()
            .user_agent("pac-reconciler/0.1")
            .timeout(cfg.timeout)
            .build()?;

        let base_api = format!("{}/api/v4", cfg.base_url.trim_end_matches('/'));
        debug!("Creating GitLabClient with base_api={}", base_api);
        Ok(Self {
            http,
            base_api,
            token: cfg.token,
        })
    }

    /// Ensures exactly one open merge request delivering the desired PaC
    /// files on `data.branch_name`.
    ///
    /// Returns the merge request URL, or an empty string when the open
    /// merge request already reflects the desired content (no-op).
    pub async fn ensure_pac_merge_request(
        &self,
        repo_url: &str,
        data: &MergeRequestData,
    ) -> PacResult<String> {
        let repo = resolve_repository(repo_url)?;
        reconcile::ensure_pac_merge_request(self, &repo, data).await
    }

    /// Reverts a PaC merge request: deletes the listed paths on
    /// `data.branch_name` and ensures a merge request proposes the
    /// removal. No-op when the branch does not exist.
    pub async fn undo_pac_merge_request(
        &self,
        repo_url: &str,
        data: &MergeRequestData,
    ) -> PacResult<String> {
        let repo = resolve_repository(repo_url)?;
        reconcile::undo_pac_merge_request(self, &repo, data).await
    }

    /// Ensures exactly one webhook for `target_webhook_url` subscribed to
    /// push and merge-request events.
    pub async fn setup_pac_webhook(
        &self,
        repo_url: &str,
        target_webhook_url: &str,
        secret: &str,
    ) -> PacResult<()> {
        let repo = resolve_repository(repo_url)?;
        reconcile::setup_pac_webhook(self, &repo, target_webhook_url, secret).await
    }

    /// Deletes the webhook for `target_webhook_url`; no-op when absent.
    pub async fn delete_pac_webhook(
        &self,
        repo_url: &str,
        target_webhook_url: &str,
    ) -> PacResult<()> {
        let repo = resolve_repository(repo_url)?;
        reconcile::delete_pac_webhook(self, &repo, target_webhook_url).await
    }

    /// True when the repository visibility is public (internal and
    /// private both map to false).
    pub async fn is_repository_public(&self, repo_url: &str) -> PacResult<bool> {
        let repo = resolve_repository(repo_url)?;
        Ok(self.visibility(&repo).await? == RepositoryVisibility::Public)
    }

    async fn get_project(&self, repo: &RepositoryReference) -> PacResult<GitLabProject> {
        let url = format!("{}/projects/{}", self.base_api, repo.api_project_id());
        debug!("GitLab get_project: {}", url);

        let project: GitLabProject = self
            .http
            .get(url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(project)
    }
}

impl GitProvider for GitLabClient {
    async fn default_branch(&self, repo: &RepositoryReference) -> PacResult<String> {
        let project = self.get_project(repo).await?;
        project.default_branch.ok_or_else(|| {
            ProviderError::InvalidResponse(format!(
                "project {} has no default branch",
                repo.project_path
            ))
            .into()
        })
    }

    async fn branch_sha(
        &self,
        repo: &RepositoryReference,
        branch: &str,
    ) -> PacResult<Option<String>> {
        let url = format!(
            "{}/projects/{}/repository/branches/{}",
            self.base_api,
            repo.api_project_id(),
            urlencoding::encode(branch)
        );
        debug!("GitLab branch_sha: {}", url);

        let resp = self
            .http
            .get(url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?;
        if resp.status().as_u16() == 404 {
            return Ok(None);
        }

        let branch: GitLabBranch = resp.error_for_status()?.json().await?;
        Ok(Some(branch.commit.id))
    }

    async fn create_branch(
        &self,
        repo: &RepositoryReference,
        branch: &str,
        from_ref: &str,
    ) -> PacResult<()> {
        let url = format!(
            "{}/projects/{}/repository/branches",
            self.base_api,
            repo.api_project_id()
        );
        debug!("GitLab create_branch: {} ({} from {})", url, branch, from_ref);

        let payload = GitLabCreateBranch { branch, from_ref };
        self.http
            .post(url)
            .header("PRIVATE-TOKEN", &self.token)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn delete_branch(&self, repo: &RepositoryReference, branch: &str) -> PacResult<()> {
        let url = format!(
            "{}/projects/{}/repository/branches/{}",
            self.base_api,
            repo.api_project_id(),
            urlencoding::encode(branch)
        );
        debug!("GitLab delete_branch: {}", url);

        let resp = self
            .http
            .delete(url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?;
        if resp.status().as_u16() == 404 {
            return Ok(());
        }
        resp.error_for_status()?;
        Ok(())
    }

    async fn file_content(
        &self,
        repo: &RepositoryReference,
        path: &str,
        git_ref: &str,
    ) -> PacResult<Option<Vec<u8>>> {
        let url = format!(
            "{}/projects/{}/repository/files/{}/raw",
            self.base_api,
            repo.api_project_id(),
            urlencoding::encode(path)
        );
        debug!("GitLab file_content: {} ref={}", url, git_ref);

        let resp = self
            .http
            .get(url)
            .query(&[("ref", git_ref)])
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?;
        if resp.status().as_u16() == 404 {
            debug!("GitLab file not found at given ref");
            return Ok(None);
        }

        let bytes = resp.error_for_status()?.bytes().await?;
        Ok(Some(bytes.to_vec()))
    }

    async fn commit_files(
        &self,
        repo: &RepositoryReference,
        branch: &str,
        message: &str,
        author_name: &str,
        author_email: &str,
        actions: &[CommitAction],
    ) -> PacResult<()> {
        if actions.is_empty() {
            debug!("No actions to commit for branch {}", branch);
            return Ok(());
        }

        let url = format!(
            "{}/projects/{}/repository/commits",
            self.base_api,
            repo.api_project_id()
        );
        debug!(
            "GitLab commit_files: {} branch={} actions={}",
            url,
            branch,
            actions.len()
        );

        let actions: Vec<GitLabCommitAction<'_>> = actions
            .iter()
            .map(|a| match a.kind {
                CommitActionKind::Create => GitLabCommitAction {
                    action: "create",
                    file_path: &a.path,
                    content: Some(BASE64.encode(&a.content)),
                    encoding: Some("base64"),
                },
                CommitActionKind::Update => GitLabCommitAction {
                    action: "update",
                    file_path: &a.path,
                    content: Some(BASE64.encode(&a.content)),
                    encoding: Some("base64"),
                },
                CommitActionKind::Delete => GitLabCommitAction {
                    action: "delete",
                    file_path: &a.path,
                    content: None,
                    encoding: None,
                },
            })
            .collect();

        let payload = GitLabCommitPayload {
            branch,
            commit_message: message,
            author_name,
            author_email,
            actions,
        };
        self.http
            .post(url)
            .header("PRIVATE-TOKEN", &self.token)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn find_merge_request(
        &self,
        repo: &RepositoryReference,
        source: &str,
        target: &str,
    ) -> PacResult<Option<MergeRequestHandle>> {
        let url = format!(
            "{}/projects/{}/merge_requests",
            self.base_api,
            repo.api_project_id()
        );
        debug!("GitLab find_merge_request: {} {}→{}", url, source, target);

        let mrs: Vec<GitLabMr> = self
            .http
            .get(url)
            .query(&[("source_branch", source), ("target_branch", target)])
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let newest = mrs.into_iter().max_by_key(|mr| mr.created_at);
        Ok(newest.map(GitLabMr::into_handle))
    }

    async fn create_merge_request(
        &self,
        repo: &RepositoryReference,
        source: &str,
        target: &str,
        title: &str,
        description: &str,
    ) -> PacResult<MergeRequestHandle> {
        let url = format!(
            "{}/projects/{}/merge_requests",
            self.base_api,
            repo.api_project_id()
        );
        debug!("GitLab create_merge_request: {} {}→{}", url, source, target);

        let payload = GitLabCreateMr {
            source_branch: source,
            target_branch: target,
            title,
            description,
        };
        let mr: GitLabMr = self
            .http
            .post(url)
            .header("PRIVATE-TOKEN", &self.token)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(mr.into_handle())
    }

    async fn list_webhooks(&self, repo: &RepositoryReference) -> PacResult<Vec<Webhook>> {
        let url = format!("{}/projects/{}/hooks", self.base_api, repo.api_project_id());
        debug!("GitLab list_webhooks: {}", url);

        let hooks: Vec<GitLabHook> = self
            .http
            .get(url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(hooks.into_iter().map(GitLabHook::into_webhook).collect())
    }

    async fn create_webhook(
        &self,
        repo: &RepositoryReference,
        settings: &WebhookSettings,
        secret: &str,
    ) -> PacResult<()> {
        let url = format!("{}/projects/{}/hooks", self.base_api, repo.api_project_id());
        debug!("GitLab create_webhook: {} target={}", url, settings.url);

        let payload = GitLabHookPayload::new(settings, secret);
        self.http
            .post(url)
            .header("PRIVATE-TOKEN", &self.token)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn update_webhook(
        &self,
        repo: &RepositoryReference,
        hook_id: u64,
        settings: &WebhookSettings,
        secret: &str,
    ) -> PacResult<()> {
        let url = format!(
            "{}/projects/{}/hooks/{}",
            self.base_api,
            repo.api_project_id(),
            hook_id
        );
        debug!("GitLab update_webhook: {}", url);

        let payload = GitLabHookPayload::new(settings, secret);
        self.http
            .put(url)
            .header("PRIVATE-TOKEN", &self.token)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn delete_webhook(&self, repo: &RepositoryReference, hook_id: u64) -> PacResult<()> {
        let url = format!(
            "{}/projects/{}/hooks/{}",
            self.base_api,
            repo.api_project_id(),
            hook_id
        );
        debug!("GitLab delete_webhook: {}", url);

        self.http
            .delete(url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn visibility(&self, repo: &RepositoryReference) -> PacResult<RepositoryVisibility> {
        let project = self.get_project(repo).await?;
        match project.visibility.as_deref() {
            Some("public") => Ok(RepositoryVisibility::Public),
            Some("internal") => Ok(RepositoryVisibility::Internal),
            Some("private") => Ok(RepositoryVisibility::Private),
            other => Err(ProviderError::InvalidResponse(format!(
                "unknown visibility {:?} for project {}",
                other, repo.project_path
            ))
            .into()),
        }
    }
}

/// --- GitLab response/request shapes (subset of fields we actually use) ---

#[derive(Debug, Deserialize)]
struct GitLabProject {
    #[serde(default)]
    default_branch: Option<String>,
    #[serde(default)]
    visibility: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitLabBranch {
    commit: GitLabCommitRef,
}

#[derive(Debug, Deserialize)]
struct GitLabCommitRef {
    id: String,
}

#[derive(Debug, Serialize)]
struct GitLabCreateBranch<'a> {
    branch: &'a str,
    #[serde(rename = "ref")]
    from_ref: &'a str,
}

#[derive(Debug, Serialize)]
struct GitLabCommitPayload<'a> {
    branch: &'a str,
    commit_message: &'a str,
    author_name: &'a str,
    author_email: &'a str,
    actions: Vec<GitLabCommitAction<'a>>,
}

#[derive(Debug, Serialize)]
struct GitLabCommitAction<'a> {
    action: &'static str,
    file_path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>, // base64 when present
    #[serde(skip_serializing_if = "Option::is_none")]
    encoding: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct GitLabMr {
    iid: u64,
    web_url: String,
    state: String,
    source_branch: String,
    target_branch: String,
    created_at: DateTime<Utc>,
}

impl GitLabMr {
    fn into_handle(self) -> MergeRequestHandle {
        let state = match self.state.as_str() {
            "opened" => MergeRequestState::Opened,
            "merged" => MergeRequestState::Merged,
            _ => MergeRequestState::Closed,
        };
        MergeRequestHandle {
            iid: self.iid,
            web_url: self.web_url,
            state,
            source_branch: self.source_branch,
            target_branch: self.target_branch,
        }
    }
}

#[derive(Debug, Serialize)]
struct GitLabCreateMr<'a> {
    source_branch: &'a str,
    target_branch: &'a str,
    title: &'a str,
    description: &'a str,
}

#[derive(Debug, Deserialize)]
struct GitLabHook {
    id: u64,
    url: String,
    #[serde(default)]
    push_events: bool,
    #[serde(default)]
    merge_requests_events: bool,
    #[serde(default)]
    enable_ssl_verification: bool,
}

impl GitLabHook {
    fn into_webhook(self) -> Webhook {
        Webhook {
            id: self.id,
            settings: WebhookSettings {
                url: self.url,
                push_events: self.push_events,
                merge_requests_events: self.merge_requests_events,
                enable_ssl_verification: self.enable_ssl_verification,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct GitLabHookPayload<'a> {
    url: &'a str,
    token: &'a str,
    push_events: bool,
    merge_requests_events: bool,
    enable_ssl_verification: bool,
}

impl<'a> GitLabHookPayload<'a> {
    fn new(settings: &'a WebhookSettings, secret: &'a str) -> Self {
        Self {
            url: &settings.url,
            token: secret,
            push_events: settings.push_events,
            merge_requests_events: settings.merge_requests_events,
            enable_ssl_verification: settings.enable_ssl_verification,
        }
    }
}
