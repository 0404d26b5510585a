//! Reconcilers that converge remote provider state to a desired PaC state.
//!
//! No local cache: every operation starts by re-reading remote truth, so
//! repeated invocations with the same input are no-ops after the first
//! successful application. Retries are a caller responsibility; nothing
//! here loops on transient failures.

mod merge_request;
mod webhook;

pub use merge_request::{ensure_pac_merge_request, undo_pac_merge_request};
pub use webhook::{delete_pac_webhook, setup_pac_webhook};
