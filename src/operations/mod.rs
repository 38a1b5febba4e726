//! Svn operations module
//!
//! Thin per-operation helpers. Each builds a [`Command`](crate::Command),
//! attaches the listener it needs and hands it to a
//! [`CommandRuntime`](crate::CommandRuntime).

pub mod cat;
pub mod checkout;
pub mod cleanup;
pub mod commit;
pub mod info;
pub mod status;
pub mod update;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// Re-export operation functions
pub use cat::{CatOpts, cat};
pub use checkout::{CheckoutOpts, checkout};
pub use cleanup::cleanup;
pub use commit::{CommitOpts, CommitOutcome, commit, commit_with_progress};
pub use info::info;
pub use status::{StatusOpts, StatusReport, status};
pub use update::{UpdateOpts, update};

use crate::command::Command;
use crate::config::SvnConfig;
use crate::parse::{EventAction, LineConverter, ProgressEvent, ProgressListener};

/// Directory that relative paths printed by the client resolve against.
pub(crate) fn output_base(config: &SvnConfig, working_directory: Option<&Path>) -> PathBuf {
    working_directory
        .or(config.default_working_directory.as_deref())
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_default()
}

/// Attach a progress listener to `command` and return a slot that ends up
/// holding the revision of the last completion event.
pub(crate) fn attach_progress<C, H>(
    command: Command,
    converter: C,
    handler: H,
) -> (Command, Arc<Mutex<Option<i64>>>)
where
    C: LineConverter + 'static,
    H: Fn(ProgressEvent) + Send + Sync + 'static,
{
    let revision = Arc::new(Mutex::new(None));
    let slot = revision.clone();
    let listener = ProgressListener::new(converter, move |event: ProgressEvent| {
        if matches!(
            event.action,
            EventAction::UpdateCompleted | EventAction::CommitCompleted
        ) && let Some(rev) = event.revision
        {
            *slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(rev);
        }
        handler(event);
    });
    (command.listener(Arc::new(listener)), revision)
}

pub(crate) fn take_revision(slot: &Mutex<Option<i64>>) -> Option<i64> {
    *slot.lock().unwrap_or_else(|e| e.into_inner())
}
