//! `svn cleanup` operation

use std::path::Path;

use crate::command::{Command, SvnCommandName, Target};
use crate::execution::ExecutionResult;
use crate::runtime::CommandRuntime;
use crate::SvnResult;

/// Release working copy locks and finish interrupted operations under `path`.
pub async fn cleanup(runtime: &CommandRuntime, path: &Path) -> SvnResult<ExecutionResult> {
    let command = Command::new(SvnCommandName::Cleanup).target(Target::path(path));
    runtime.run(command).await
}
