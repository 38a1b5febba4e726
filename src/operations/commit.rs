//! `svn commit` operation

use std::path::PathBuf;

use super::{attach_progress, output_base, take_revision};
use crate::command::{Command, Depth, SvnCommandName, Target};
use crate::parse::{CommitOutputLineConverter, ProgressEvent};
use crate::runtime::CommandRuntime;
use crate::{SvnError, SvnResult};

/// Options for commit
#[derive(Debug, Clone)]
pub struct CommitOpts {
    pub paths: Vec<PathBuf>,
    /// Log message, passed to the client through a temp file
    pub message: String,
    pub depth: Option<Depth>,
    /// Keep locks on committed paths
    pub keep_locks: bool,
    pub changelist: Option<String>,
}

impl CommitOpts {
    pub fn new(paths: Vec<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            paths,
            message: message.into(),
            depth: None,
            keep_locks: false,
            changelist: None,
        }
    }
}

/// Result of a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// New revision, `None` when there was nothing to commit
    pub revision: Option<i64>,
    /// Paths the client reported as sent, added, deleted or replaced
    pub committed: Vec<PathBuf>,
}

pub async fn commit(runtime: &CommandRuntime, opts: CommitOpts) -> SvnResult<CommitOutcome> {
    commit_with_progress(runtime, opts, |_| {}).await
}

/// Commit, streaming one event per reported path and a final completion event.
pub async fn commit_with_progress<H>(
    runtime: &CommandRuntime,
    opts: CommitOpts,
    handler: H,
) -> SvnResult<CommitOutcome>
where
    H: Fn(ProgressEvent) + Send + Sync + 'static,
{
    if opts.paths.is_empty() {
        return Err(SvnError::InvalidInput("Nothing to commit: no paths given".to_string()));
    }

    let mut command = Command::new(SvnCommandName::Commit)
        .message(opts.message)
        .targets(opts.paths.into_iter().map(Target::path));
    if let Some(depth) = opts.depth {
        command.put(format!("--depth={}", depth.as_str()));
    }
    if opts.keep_locks {
        command.put_flag("--no-unlock");
    }
    if let Some(changelist) = opts.changelist {
        command.put("--changelist");
        command.put(changelist);
    }

    let committed = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = committed.clone();
    let base = output_base(runtime.config(), command.get_working_directory());
    let (command, revision) = attach_progress(
        command,
        CommitOutputLineConverter::new(base),
        move |event: ProgressEvent| {
            if event.revision.is_none() {
                sink.lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push(event.file.clone());
            }
            handler(event);
        },
    );
    runtime.run(command).await?;

    let committed = std::mem::take(&mut *committed.lock().unwrap_or_else(|e| e.into_inner()));
    Ok(CommitOutcome {
        revision: take_revision(&revision),
        committed,
    })
}
