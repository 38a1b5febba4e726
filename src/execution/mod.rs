//! Process executors
//!
//! Two transports run a [`crate::Command`]:
//!
//! - [`BatchExecutor`] uses plain pipes and `--non-interactive`. Stdout and
//!   stderr are read by separate tasks.
//! - [`TerminalExecutor`] attaches the client to a pseudo-terminal so it
//!   prints prompts, which the [`prompts`] modules answer inline.
//!
//! Both reconstruct lines from raw chunks, forward them to an optional
//! [`LineCommandListener`] and buffer them into an [`ExecutionResult`].

mod batch;
mod line_buffer;
pub mod prompts;
mod state;
mod terminal;

use std::sync::Arc;

pub use batch::BatchExecutor;
pub use line_buffer::{LineReconstructor, Utf8Decoder};
pub use state::ExecutorHandle;
pub use terminal::{TerminalExecutor, classify_line};

pub(crate) use state::OutputDispatcher;

use crate::SvnResult;
use crate::auth::AuthenticationService;
use crate::command::{Command, CommandLine, SvnCommandName};
use crate::config::SvnConfig;

/// Stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputType {
    Stdout,
    Stderr,
    /// Messages produced by the runtime itself
    System,
}

/// Receives output as it is produced.
///
/// Called from reader tasks or the terminal reader thread; implementations
/// must not block for long.
pub trait LineCommandListener: Send + Sync {
    fn on_line_available(&self, line: &str, output_type: OutputType);

    fn process_terminated(&self, _exit_code: Option<i32>) {}
}

/// Everything one process run produced.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub command_name: SvnCommandName,
    /// `None` when the process was killed by a signal or never reported a status
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Raw stdout for binary-output commands
    pub binary: Vec<u8>,
    pub manually_destroyed: bool,
    pub destroy_reason: Option<String>,
    pub timed_out: bool,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn has_stderr(&self) -> bool {
        !self.stderr.trim().is_empty()
    }
}

/// Transport chosen for one attempt.
pub enum Executor {
    Batch(BatchExecutor),
    Terminal(TerminalExecutor),
}

impl Executor {
    /// Batch for local commands or when terminal mode is off; terminal otherwise.
    pub fn create(
        command: &Command,
        config: &SvnConfig,
        auth: Arc<dyn AuthenticationService>,
    ) -> SvnResult<Self> {
        if config.run_under_terminal && !command.is_local() {
            Ok(Executor::Terminal(TerminalExecutor::new(command, config, auth)?))
        } else {
            Ok(Executor::Batch(BatchExecutor::new(command, config)?))
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Executor::Terminal(_))
    }

    pub fn handle(&self) -> ExecutorHandle {
        match self {
            Executor::Batch(executor) => executor.handle(),
            Executor::Terminal(executor) => executor.handle(),
        }
    }

    pub fn command_line(&self) -> &CommandLine {
        match self {
            Executor::Batch(executor) => executor.command_line(),
            Executor::Terminal(executor) => executor.command_line(),
        }
    }

    pub async fn run(&mut self) -> SvnResult<ExecutionResult> {
        match self {
            Executor::Batch(executor) => executor.run().await,
            Executor::Terminal(executor) => executor.run().await,
        }
    }

    pub fn cleanup(&mut self) {
        match self {
            Executor::Batch(executor) => executor.cleanup(),
            Executor::Terminal(executor) => executor.cleanup(),
        }
    }
}
