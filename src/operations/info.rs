//! `svn info` operation

use log::debug;

use super::output_base;
use crate::command::{Command, SvnCommandName, Target};
use crate::parse::{SvnInfo, parse_info_xml};
use crate::runtime::CommandRuntime;
use crate::{SvnError, SvnResult};

/// Read working copy or repository information for `target`.
pub async fn info(runtime: &CommandRuntime, target: Target) -> SvnResult<Vec<SvnInfo>> {
    let command = Command::new(SvnCommandName::Info)
        .parameter("--xml")
        .target(target);
    let base = output_base(runtime.config(), command.get_working_directory());
    let result = runtime.run(command).await?;

    let mut entries = Vec::new();
    parse_info_xml(&result.stdout, &base, |entry| entries.push(entry))?;
    debug!("info returned {} entries", entries.len());
    if entries.is_empty() {
        return Err(SvnError::Parse("info returned no entries".to_string()));
    }
    Ok(entries)
}
