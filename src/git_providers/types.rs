//! Provider-agnostic data model for PaC reconciliation.

use serde::{Deserialize, Serialize};

/// Repository coordinates derived once from a repository URL.
///
/// `project_path` is the full namespace path ("group/project", possibly
/// nested groups); immutable for the life of a client session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryReference {
    pub host: String,
    pub project_path: String,
}

impl RepositoryReference {
    /// URL-encoded project path as GitLab REST expects it ("group%2Fproject").
    pub fn api_project_id(&self) -> String {
        urlencoding::encode(&self.project_path).into_owned()
    }
}

/// Desired state of one PaC merge request.
///
/// `branch_name` is unique per logical change-set: re-invocation with the
/// same branch and files must not create a second open merge request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeRequestData {
    pub commit_message: String,
    pub branch_name: String,
    /// Target branch; empty means the repository's default branch.
    pub base_branch_name: String,
    pub title: String,
    /// Merge request description body.
    pub text: String,
    pub author_name: String,
    pub author_email: String,
    pub files: Vec<RepositoryFile>,
}

/// One desired repository file.
///
/// Empty content signals deletion intent for undo operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryFile {
    pub full_path: String,
    pub content: Vec<u8>,
}

/// Lifecycle state of a merge request on the provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MergeRequestState {
    Opened,
    Merged,
    Closed,
}

impl std::fmt::Display for MergeRequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MergeRequestState::Opened => "opened",
            MergeRequestState::Merged => "merged",
            MergeRequestState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Handle to a merge request found or created on the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeRequestHandle {
    pub iid: u64,
    pub web_url: String,
    pub state: MergeRequestState,
    pub source_branch: String,
    pub target_branch: String,
}

/// Kind of one staged file operation inside a commit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CommitActionKind {
    Create,
    Update,
    Delete,
}

/// One staged file operation; a commit applies a batch atomically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitAction {
    pub kind: CommitActionKind,
    pub path: String,
    /// Desired bytes; unused for deletions.
    pub content: Vec<u8>,
}

/// Observable webhook settings on the provider.
///
/// The secret token is write-only on the provider and therefore not part
/// of the observable state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookSettings {
    pub url: String,
    pub push_events: bool,
    pub merge_requests_events: bool,
    pub enable_ssl_verification: bool,
}

/// A webhook registered on a repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Webhook {
    pub id: u64,
    pub settings: WebhookSettings,
}

/// Repository visibility as the provider reports it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RepositoryVisibility {
    Public,
    Internal,
    Private,
}
