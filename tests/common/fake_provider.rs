//! In-memory Git provider for reconciler tests.
//!
//! Hand-rolled fake with call recording and error injection; the
//! reconcilers only see the `GitProvider` trait, so the whole branch/MR
//! state machine can be exercised without a network.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use pac_reconciler::errors::{PacResult, ProviderError};
use pac_reconciler::git_providers::GitProvider;
use pac_reconciler::git_providers::types::{
    CommitAction, CommitActionKind, MergeRequestHandle, MergeRequestState, RepositoryReference,
    RepositoryVisibility, Webhook, WebhookSettings,
};

/// One recorded commit: branch, message and the (kind, path) pairs it
/// applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommit {
    pub branch: String,
    pub message: String,
    pub actions: Vec<(CommitActionKind, String)>,
}

type FileTree = HashMap<String, Vec<u8>>;

pub struct FakeProvider {
    default_branch: String,
    visibility: RepositoryVisibility,
    branches: Mutex<HashMap<String, FileTree>>,
    merge_requests: Mutex<Vec<MergeRequestHandle>>,
    hooks: Mutex<Vec<Webhook>>,
    next_iid: AtomicU64,
    next_hook_id: AtomicU64,
    // Call tracking
    pub commits: Mutex<Vec<RecordedCommit>>,
    pub created_merge_requests: Mutex<Vec<(String, String)>>,
    // Error injection
    error_on_commit: Mutex<Option<ProviderError>>,
    error_on_list_webhooks: Mutex<Option<ProviderError>>,
}

impl FakeProvider {
    /// Repository with an empty default branch "main", private visibility.
    pub fn new() -> Self {
        let mut branches = HashMap::new();
        branches.insert("main".to_string(), FileTree::new());
        Self {
            default_branch: "main".to_string(),
            visibility: RepositoryVisibility::Private,
            branches: Mutex::new(branches),
            merge_requests: Mutex::new(Vec::new()),
            hooks: Mutex::new(Vec::new()),
            next_iid: AtomicU64::new(1),
            next_hook_id: AtomicU64::new(1),
            commits: Mutex::new(Vec::new()),
            created_merge_requests: Mutex::new(Vec::new()),
            error_on_commit: Mutex::new(None),
            error_on_list_webhooks: Mutex::new(None),
        }
    }

    pub fn with_visibility(mut self, visibility: RepositoryVisibility) -> Self {
        self.visibility = visibility;
        self
    }

    // === Seeding ===

    /// Puts a file on a branch without recording a commit.
    pub fn seed_file(&self, branch: &str, path: &str, content: &[u8]) {
        self.branches
            .lock()
            .unwrap()
            .entry(branch.to_string())
            .or_default()
            .insert(path.to_string(), content.to_vec());
    }

    /// Creates a branch as a copy of another, bypassing the provider API.
    pub fn seed_branch(&self, branch: &str, from: &str) {
        let mut branches = self.branches.lock().unwrap();
        let files = branches.get(from).cloned().unwrap_or_default();
        branches.insert(branch.to_string(), files);
    }

    pub fn seed_hook(&self, settings: WebhookSettings) -> u64 {
        let id = self.next_hook_id.fetch_add(1, Ordering::SeqCst);
        self.hooks.lock().unwrap().push(Webhook { id, settings });
        id
    }

    /// Flips the state of an existing merge request (e.g. to simulate a
    /// merge happening out of band).
    pub fn set_merge_request_state(&self, iid: u64, state: MergeRequestState) {
        let mut mrs = self.merge_requests.lock().unwrap();
        if let Some(mr) = mrs.iter_mut().find(|m| m.iid == iid) {
            mr.state = state;
        }
    }

    // === Error injection ===

    pub fn fail_next_commit(&self, err: ProviderError) {
        *self.error_on_commit.lock().unwrap() = Some(err);
    }

    pub fn fail_next_list_webhooks(&self, err: ProviderError) {
        *self.error_on_list_webhooks.lock().unwrap() = Some(err);
    }

    // === Inspection ===

    pub fn has_branch(&self, branch: &str) -> bool {
        self.branches.lock().unwrap().contains_key(branch)
    }

    pub fn file(&self, branch: &str, path: &str) -> Option<Vec<u8>> {
        self.branches
            .lock()
            .unwrap()
            .get(branch)
            .and_then(|files| files.get(path).cloned())
    }

    pub fn open_merge_requests(&self, source: &str) -> usize {
        self.merge_requests
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.source_branch == source && m.state == MergeRequestState::Opened)
            .count()
    }

    pub fn merge_request_target(&self, source: &str) -> Option<String> {
        self.merge_requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|m| m.source_branch == source)
            .map(|m| m.target_branch.clone())
    }

    pub fn hooks_for(&self, url: &str) -> Vec<Webhook> {
        self.hooks
            .lock()
            .unwrap()
            .iter()
            .filter(|h| h.settings.url == url)
            .cloned()
            .collect()
    }

    pub fn commit_count(&self) -> usize {
        self.commits.lock().unwrap().len()
    }

    pub fn last_commit(&self) -> Option<RecordedCommit> {
        self.commits.lock().unwrap().last().cloned()
    }
}

impl GitProvider for FakeProvider {
    async fn default_branch(&self, _repo: &RepositoryReference) -> PacResult<String> {
        Ok(self.default_branch.clone())
    }

    async fn branch_sha(
        &self,
        _repo: &RepositoryReference,
        branch: &str,
    ) -> PacResult<Option<String>> {
        let branches = self.branches.lock().unwrap();
        Ok(branches.get(branch).map(|_| format!("head-of-{branch}")))
    }

    async fn create_branch(
        &self,
        _repo: &RepositoryReference,
        branch: &str,
        from_ref: &str,
    ) -> PacResult<()> {
        let mut branches = self.branches.lock().unwrap();
        let Some(files) = branches.get(from_ref).cloned() else {
            return Err(ProviderError::NotFound.into());
        };
        branches.insert(branch.to_string(), files);
        Ok(())
    }

    async fn delete_branch(&self, _repo: &RepositoryReference, branch: &str) -> PacResult<()> {
        self.branches.lock().unwrap().remove(branch);
        Ok(())
    }

    async fn file_content(
        &self,
        _repo: &RepositoryReference,
        path: &str,
        git_ref: &str,
    ) -> PacResult<Option<Vec<u8>>> {
        let branches = self.branches.lock().unwrap();
        let Some(files) = branches.get(git_ref) else {
            return Err(ProviderError::NotFound.into());
        };
        Ok(files.get(path).cloned())
    }

    async fn commit_files(
        &self,
        _repo: &RepositoryReference,
        branch: &str,
        message: &str,
        _author_name: &str,
        _author_email: &str,
        actions: &[CommitAction],
    ) -> PacResult<()> {
        if let Some(err) = self.error_on_commit.lock().unwrap().take() {
            return Err(err.into());
        }

        let mut branches = self.branches.lock().unwrap();
        let Some(files) = branches.get_mut(branch) else {
            return Err(ProviderError::NotFound.into());
        };
        for action in actions {
            match action.kind {
                CommitActionKind::Create | CommitActionKind::Update => {
                    files.insert(action.path.clone(), action.content.clone());
                }
                CommitActionKind::Delete => {
                    files.remove(&action.path);
                }
            }
        }

        self.commits.lock().unwrap().push(RecordedCommit {
            branch: branch.to_string(),
            message: message.to_string(),
            actions: actions
                .iter()
                .map(|a| (a.kind, a.path.clone()))
                .collect(),
        });
        Ok(())
    }

    async fn find_merge_request(
        &self,
        _repo: &RepositoryReference,
        source: &str,
        target: &str,
    ) -> PacResult<Option<MergeRequestHandle>> {
        let mrs = self.merge_requests.lock().unwrap();
        Ok(mrs
            .iter()
            .rev()
            .find(|m| m.source_branch == source && m.target_branch == target)
            .cloned())
    }

    async fn create_merge_request(
        &self,
        repo: &RepositoryReference,
        source: &str,
        target: &str,
        _title: &str,
        _description: &str,
    ) -> PacResult<MergeRequestHandle> {
        let iid = self.next_iid.fetch_add(1, Ordering::SeqCst);
        let mr = MergeRequestHandle {
            iid,
            web_url: format!(
                "https://{}/{}/-/merge_requests/{}",
                repo.host, repo.project_path, iid
            ),
            state: MergeRequestState::Opened,
            source_branch: source.to_string(),
            target_branch: target.to_string(),
        };
        self.merge_requests.lock().unwrap().push(mr.clone());
        self.created_merge_requests
            .lock()
            .unwrap()
            .push((source.to_string(), target.to_string()));
        Ok(mr)
    }

    async fn list_webhooks(&self, _repo: &RepositoryReference) -> PacResult<Vec<Webhook>> {
        if let Some(err) = self.error_on_list_webhooks.lock().unwrap().take() {
            return Err(err.into());
        }
        Ok(self.hooks.lock().unwrap().clone())
    }

    async fn create_webhook(
        &self,
        _repo: &RepositoryReference,
        settings: &WebhookSettings,
        _secret: &str,
    ) -> PacResult<()> {
        let id = self.next_hook_id.fetch_add(1, Ordering::SeqCst);
        self.hooks.lock().unwrap().push(Webhook {
            id,
            settings: settings.clone(),
        });
        Ok(())
    }

    async fn update_webhook(
        &self,
        _repo: &RepositoryReference,
        hook_id: u64,
        settings: &WebhookSettings,
        _secret: &str,
    ) -> PacResult<()> {
        let mut hooks = self.hooks.lock().unwrap();
        let Some(hook) = hooks.iter_mut().find(|h| h.id == hook_id) else {
            return Err(ProviderError::NotFound.into());
        };
        hook.settings = settings.clone();
        Ok(())
    }

    async fn delete_webhook(&self, _repo: &RepositoryReference, hook_id: u64) -> PacResult<()> {
        let mut hooks = self.hooks.lock().unwrap();
        let before = hooks.len();
        hooks.retain(|h| h.id != hook_id);
        if hooks.len() == before {
            return Err(ProviderError::NotFound.into());
        }
        Ok(())
    }

    async fn visibility(&self, _repo: &RepositoryReference) -> PacResult<RepositoryVisibility> {
        Ok(self.visibility)
    }
}
