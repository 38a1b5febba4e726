//! `svn status` operation

use std::path::PathBuf;

use super::output_base;
use crate::command::{Command, Depth, SvnCommandName, Target};
use crate::parse::{PortableStatus, parse_status_xml};
use crate::runtime::CommandRuntime;
use crate::SvnResult;

/// Options for status
#[derive(Debug, Clone, Default)]
pub struct StatusOpts {
    /// Paths to report on
    pub paths: Vec<PathBuf>,
    pub depth: Option<Depth>,
    /// Contact the repository for out-of-date information (`-u`)
    pub show_updates: bool,
    /// Report unmodified entries too (`-v`)
    pub verbose: bool,
    pub no_ignore: bool,
}

/// Entries reported by status.
#[derive(Debug, Clone, Default)]
pub struct StatusReport {
    pub entries: Vec<PortableStatus>,
    /// Repository revision the status was checked against, with `show_updates`
    pub against_revision: Option<i64>,
}

pub async fn status(runtime: &CommandRuntime, opts: StatusOpts) -> SvnResult<StatusReport> {
    let mut command = Command::new(SvnCommandName::Status)
        .parameter("--xml")
        .targets(opts.paths.into_iter().map(Target::path));
    if let Some(depth) = opts.depth {
        command.put(format!("--depth={}", depth.as_str()));
    }
    if opts.show_updates {
        command.put_flag("-u");
    }
    if opts.verbose {
        command.put_flag("-v");
    }
    if opts.no_ignore {
        command.put_flag("--no-ignore");
    }

    let base = output_base(runtime.config(), command.get_working_directory());
    let result = runtime.run(command).await?;

    let mut entries = Vec::new();
    let against_revision = parse_status_xml(&result.stdout, &base, |entry| entries.push(entry))?;
    Ok(StatusReport {
        entries,
        against_revision,
    })
}
