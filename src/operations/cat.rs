//! `svn cat` operation

use crate::command::{Command, Revision, SvnCommandName, Target};
use crate::runtime::CommandRuntime;
use crate::SvnResult;

/// Options for cat
#[derive(Debug, Clone)]
pub struct CatOpts {
    /// File path or URL
    pub target: Target,
    pub revision: Option<Revision>,
}

impl CatOpts {
    pub fn new(target: Target) -> Self {
        Self { target, revision: None }
    }

    pub fn with_revision(mut self, revision: Revision) -> Self {
        self.revision = Some(revision);
        self
    }
}

/// File content as raw bytes; no line decoding is applied.
pub async fn cat(runtime: &CommandRuntime, opts: CatOpts) -> SvnResult<Vec<u8>> {
    let mut command = Command::new(SvnCommandName::Cat)
        .target(opts.target)
        .binary_output();
    if let Some(revision) = opts.revision {
        command.put(format!("-r{revision}"));
    }
    let result = runtime.run(command).await?;
    Ok(result.binary)
}
