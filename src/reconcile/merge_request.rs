//! Idempotent merge-request reconciliation.
//!
//! The branch/merge-request pair moves through an explicit state machine:
//! absent → branch-only → branch+open-MR → branch+merged/closed-MR. Each
//! call rediscovers the current state via read-before-write and issues
//! the minimal set of operations to converge it.

use tracing::{debug, info};

use crate::errors::{Error, PacResult};
use crate::git_providers::types::{
    CommitAction, CommitActionKind, MergeRequestData, MergeRequestState, RepositoryFile,
    RepositoryReference,
};
use crate::git_providers::GitProvider;

/// Ensures exactly one open merge request delivering `data.files` on
/// `data.branch_name`.
///
/// Returns the merge request URL when anything was created or updated,
/// and an empty string when the existing open merge request already
/// reflects the desired content.
pub async fn ensure_pac_merge_request<P: GitProvider>(
    provider: &P,
    repo: &RepositoryReference,
    data: &MergeRequestData,
) -> PacResult<String> {
    let base_branch = resolve_base_branch(provider, repo, data).await?;
    let branch = data.branch_name.as_str();

    if !provider.branch_exists(repo, branch).await? {
        info!(
            project = %repo.project_path,
            branch,
            base = %base_branch,
            "creating PaC branch"
        );
        provider.create_branch(repo, branch, &base_branch).await?;

        let actions = stage_desired_files(provider, repo, branch, &data.files).await?;
        commit_staged(provider, repo, branch, data, actions).await?;

        let mr = provider
            .create_merge_request(repo, branch, &base_branch, &data.title, &data.text)
            .await?;
        info!(project = %repo.project_path, branch, url = %mr.web_url, "created PaC merge request");
        return Ok(mr.web_url);
    }

    // Branch already exists: a prior run may have been interrupted after
    // branch creation but before the merge request was opened.
    match provider.find_merge_request(repo, branch, &base_branch).await? {
        None => {
            let actions = stage_desired_files(provider, repo, branch, &data.files).await?;
            commit_staged(provider, repo, branch, data, actions).await?;

            let mr = provider
                .create_merge_request(repo, branch, &base_branch, &data.title, &data.text)
                .await?;
            info!(
                project = %repo.project_path,
                branch,
                url = %mr.web_url,
                "opened PaC merge request for existing branch"
            );
            Ok(mr.web_url)
        }
        Some(mr) if mr.state == MergeRequestState::Opened => {
            let actions = stage_desired_files(provider, repo, branch, &data.files).await?;
            if actions.is_empty() {
                debug!(project = %repo.project_path, branch, "PaC merge request already up to date");
                return Ok(String::new());
            }
            commit_staged(provider, repo, branch, data, actions).await?;
            info!(project = %repo.project_path, branch, url = %mr.web_url, "updated PaC merge request");
            Ok(mr.web_url)
        }
        Some(mr) => Err(Error::StaleBranchConflict {
            branch: branch.to_string(),
            iid: mr.iid,
            state: mr.state,
        }),
    }
}

/// Reverts a PaC merge request: deletes the listed paths on
/// `data.branch_name` and ensures a merge request proposes the removal.
///
/// No-op returning an empty string when the branch does not exist, or
/// when all paths are already absent and an open merge request is in
/// place.
pub async fn undo_pac_merge_request<P: GitProvider>(
    provider: &P,
    repo: &RepositoryReference,
    data: &MergeRequestData,
) -> PacResult<String> {
    let branch = data.branch_name.as_str();

    if !provider.branch_exists(repo, branch).await? {
        debug!(project = %repo.project_path, branch, "branch absent, nothing to undo");
        return Ok(String::new());
    }

    let base_branch = resolve_base_branch(provider, repo, data).await?;

    let mut actions = Vec::new();
    for file in &data.files {
        if provider
            .file_content(repo, &file.full_path, branch)
            .await?
            .is_some()
        {
            actions.push(CommitAction {
                kind: CommitActionKind::Delete,
                path: file.full_path.clone(),
                content: Vec::new(),
            });
        }
    }
    let removed_any = !actions.is_empty();
    commit_staged(provider, repo, branch, data, actions).await?;

    match provider.find_merge_request(repo, branch, &base_branch).await? {
        None => {
            let mr = provider
                .create_merge_request(repo, branch, &base_branch, &data.title, &data.text)
                .await?;
            info!(project = %repo.project_path, branch, url = %mr.web_url, "opened PaC removal merge request");
            Ok(mr.web_url)
        }
        Some(mr) if mr.state == MergeRequestState::Opened => {
            if removed_any {
                info!(project = %repo.project_path, branch, url = %mr.web_url, "updated PaC removal merge request");
                Ok(mr.web_url)
            } else {
                debug!(project = %repo.project_path, branch, "nothing left to undo");
                Ok(String::new())
            }
        }
        Some(mr) => Err(Error::StaleBranchConflict {
            branch: branch.to_string(),
            iid: mr.iid,
            state: mr.state,
        }),
    }
}

/// Stages the minimal set of create/update actions that converge the
/// branch to the desired files. Paths whose remote content already
/// matches byte-for-byte are skipped.
async fn stage_desired_files<P: GitProvider>(
    provider: &P,
    repo: &RepositoryReference,
    branch: &str,
    files: &[RepositoryFile],
) -> PacResult<Vec<CommitAction>> {
    let mut actions = Vec::new();
    for file in files {
        match provider.file_content(repo, &file.full_path, branch).await? {
            None => actions.push(CommitAction {
                kind: CommitActionKind::Create,
                path: file.full_path.clone(),
                content: file.content.clone(),
            }),
            Some(current) if current != file.content => actions.push(CommitAction {
                kind: CommitActionKind::Update,
                path: file.full_path.clone(),
                content: file.content.clone(),
            }),
            Some(_) => {}
        }
    }
    Ok(actions)
}

async fn commit_staged<P: GitProvider>(
    provider: &P,
    repo: &RepositoryReference,
    branch: &str,
    data: &MergeRequestData,
    actions: Vec<CommitAction>,
) -> PacResult<()> {
    if actions.is_empty() {
        return Ok(());
    }
    debug!(
        project = %repo.project_path,
        branch,
        files = actions.len(),
        "committing staged changes"
    );
    provider
        .commit_files(
            repo,
            branch,
            &data.commit_message,
            &data.author_name,
            &data.author_email,
            &actions,
        )
        .await
}

async fn resolve_base_branch<P: GitProvider>(
    provider: &P,
    repo: &RepositoryReference,
    data: &MergeRequestData,
) -> PacResult<String> {
    if data.base_branch_name.is_empty() {
        provider.default_branch(repo).await
    } else {
        Ok(data.base_branch_name.clone())
    }
}
