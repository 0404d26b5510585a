//! Idempotent webhook setup and teardown.
//!
//! Identity key is the target URL within the repository's webhook set:
//! after convergence at most one PaC-managed webhook exists per target
//! URL.

use tracing::{debug, info};

use crate::errors::PacResult;
use crate::git_providers::types::{RepositoryReference, WebhookSettings};
use crate::git_providers::GitProvider;

/// Ensures one webhook for `target_url` subscribed to push and
/// merge-request events.
///
/// The secret token cannot be read back from the provider, so only the
/// observable settings drive the create/update/skip decision; an update
/// re-sends the full desired state including the secret.
pub async fn setup_pac_webhook<P: GitProvider>(
    provider: &P,
    repo: &RepositoryReference,
    target_url: &str,
    secret: &str,
) -> PacResult<()> {
    let desired = WebhookSettings {
        url: target_url.to_string(),
        push_events: true,
        merge_requests_events: true,
        enable_ssl_verification: true,
    };

    let hooks = provider.list_webhooks(repo).await?;
    match hooks.iter().find(|h| h.settings.url == target_url) {
        None => {
            info!(project = %repo.project_path, target_url, "creating PaC webhook");
            provider.create_webhook(repo, &desired, secret).await
        }
        Some(hook) if hook.settings != desired => {
            info!(
                project = %repo.project_path,
                target_url,
                hook_id = hook.id,
                "updating PaC webhook"
            );
            provider.update_webhook(repo, hook.id, &desired, secret).await
        }
        Some(_) => {
            debug!(project = %repo.project_path, target_url, "PaC webhook already configured");
            Ok(())
        }
    }
}

/// Deletes the webhook for `target_url` if present; absence is not an
/// error.
pub async fn delete_pac_webhook<P: GitProvider>(
    provider: &P,
    repo: &RepositoryReference,
    target_url: &str,
) -> PacResult<()> {
    let hooks = provider.list_webhooks(repo).await?;
    match hooks.iter().find(|h| h.settings.url == target_url) {
        Some(hook) => {
            info!(
                project = %repo.project_path,
                target_url,
                hook_id = hook.id,
                "deleting PaC webhook"
            );
            provider.delete_webhook(repo, hook.id).await
        }
        None => {
            debug!(project = %repo.project_path, target_url, "PaC webhook not present");
            Ok(())
        }
    }
}
