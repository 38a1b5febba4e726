//! `svn checkout` operation

use std::path::PathBuf;

use super::{attach_progress, take_revision};
use crate::command::{Command, Depth, Revision, SvnCommandName, Target};
use crate::parse::{ProgressEvent, UpdateOutputLineConverter};
use crate::runtime::CommandRuntime;
use crate::{SvnError, SvnResult};

/// Options for checkout
#[derive(Debug, Clone)]
pub struct CheckoutOpts {
    /// Repository URL to check out
    pub url: String,
    /// Destination directory, created by the client if missing
    pub destination: PathBuf,
    pub revision: Option<Revision>,
    pub depth: Option<Depth>,
    pub ignore_externals: bool,
    pub force: bool,
}

impl CheckoutOpts {
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
            revision: None,
            depth: None,
            ignore_externals: false,
            force: false,
        }
    }
}

/// Check out `opts.url` into `opts.destination`, streaming progress events.
pub async fn checkout<H>(runtime: &CommandRuntime, opts: CheckoutOpts, handler: H) -> SvnResult<Option<i64>>
where
    H: Fn(ProgressEvent) + Send + Sync + 'static,
{
    url::Url::parse(&opts.url)
        .map_err(|e| SvnError::InvalidInput(format!("Invalid repository URL {}: {e}", opts.url)))?;
    if !opts.destination.is_absolute() {
        return Err(SvnError::InvalidInput(format!(
            "Checkout destination must be absolute: {}",
            opts.destination.display()
        )));
    }
    let parent = opts
        .destination
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| opts.destination.clone());

    let mut command = Command::new(SvnCommandName::Checkout)
        .target(Target::url(&opts.url))
        .target(Target::path(&opts.destination))
        .repository_url(&opts.url)
        .working_directory(&parent);
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

    let (command, revision) = attach_progress(command, UpdateOutputLineConverter::new(parent), handler);
    runtime.run(command).await?;
    Ok(take_revision(&revision))
}
