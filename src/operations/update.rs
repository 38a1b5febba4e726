//! `svn update` operation

use std::path::PathBuf;

use super::{attach_progress, output_base, take_revision};
use crate::command::{Command, Depth, Revision, SvnCommandName, Target};
use crate::parse::{ProgressEvent, UpdateOutputLineConverter};
use crate::runtime::CommandRuntime;
use crate::SvnResult;

/// Options for update
#[derive(Debug, Clone, Default)]
pub struct UpdateOpts {
    pub paths: Vec<PathBuf>,
    /// Target revision, HEAD when unset
    pub revision: Option<Revision>,
    pub depth: Option<Depth>,
    pub ignore_externals: bool,
    /// Accept unversioned obstructions (`--force`)
    pub force: bool,
}

/// Update working copy paths, streaming one event per reported path.
///
/// Returns the revision of the last completion banner.
pub async fn update<H>(runtime: &CommandRuntime, opts: UpdateOpts, handler: H) -> SvnResult<Option<i64>>
where
    H: Fn(ProgressEvent) + Send + Sync + 'static,
{
    let mut command = Command::new(SvnCommandName::Update)
        .targets(opts.paths.into_iter().map(Target::path));
    if let Some(revision) = opts.revision {
        command.put(format!("-r{revision}"));
    }
    if let Some(depth) = opts.depth {
        command.put(format!("--depth={}", depth.as_str()));
    }
    if opts.ignore_externals {
        command.put_flag("--ignore-externals");
    }
    if opts.force {
        command.put_flag("--force");
    }
    command.put_flag("--accept=postpone");

    let base = output_base(runtime.config(), command.get_working_directory());
    let (command, revision) = attach_progress(command, UpdateOutputLineConverter::new(base), handler);
    runtime.run(command).await?;
    Ok(take_revision(&revision))
}
