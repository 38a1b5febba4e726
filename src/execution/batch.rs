use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command as TokioCommand};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::{
    ExecutionResult, ExecutorHandle, LineCommandListener, LineReconstructor, OutputDispatcher,
    OutputType,
};
use crate::command::{Command, CommandLine, SvnCommandName};
use crate::config::SvnConfig;
use crate::{SvnError, SvnResult};

const READ_CHUNK_SIZE: usize = 8192;

/// Pipe-based executor: one process, one reader task per stream.
pub struct BatchExecutor {
    line: CommandLine,
    command_name: SvnCommandName,
    binary_output: bool,
    handle: ExecutorHandle,
    dispatcher: OutputDispatcher,
    poll_interval: Duration,
    timeout: Option<Duration>,
    child: Option<Child>,
    readers: Vec<JoinHandle<()>>,
}

impl BatchExecutor {
    pub fn new(command: &Command, config: &SvnConfig) -> SvnResult<Self> {
        let line = CommandLine::build(command, config, false)?;
        let handle = ExecutorHandle::new(command.get_cancellation().cloned());
        let listener: Option<Arc<dyn LineCommandListener>> = command.get_listener().cloned();
        Ok(Self {
            line,
            command_name: command.name(),
            binary_output: command.is_binary_output(),
            dispatcher: OutputDispatcher::new(listener, handle.clone()),
            handle,
            poll_interval: config.poll_interval(),
            timeout: config.command_timeout(),
            child: None,
            readers: Vec::new(),
        })
    }

    pub fn command_line(&self) -> &CommandLine {
        &self.line
    }

    pub fn handle(&self) -> ExecutorHandle {
        self.handle.clone()
    }

    /// Spawn the process and its reader tasks. Fails fast if the binary cannot be started.
    pub fn start(&mut self) -> SvnResult<()> {
        if self.child.is_some() {
            return Ok(());
        }
        debug!("Starting {}", self.line);

        let mut cmd = TokioCommand::new(self.line.program());
        cmd.args(self.line.args());
        cmd.current_dir(self.line.working_directory());
        for (key, value) in self.line.env() {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| SvnError::ProcessStart {
            exe: self.line.program().display().to_string(),
            message: e.to_string(),
        })?;

        if let Some(stdout) = child.stdout.take() {
            let dispatcher = self.dispatcher.clone();
            let binary = self.binary_output;
            self.readers.push(tokio::spawn(async move {
                pump(stdout, OutputType::Stdout, dispatcher, binary).await;
            }));
        }
        if let Some(stderr) = child.stderr.take() {
            let dispatcher = self.dispatcher.clone();
            self.readers.push(tokio::spawn(async move {
                pump(stderr, OutputType::Stderr, dispatcher, false).await;
            }));
        }

        self.child = Some(child);
        Ok(())
    }

    /// Run to completion, honouring cancellation, destroy requests, stderr and the configured timeout.
    pub async fn run(&mut self) -> SvnResult<ExecutionResult> {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        self.drive(deadline).await
    }

    /// Run with a bounded wait; on expiry the process is killed and the result marked timed out.
    pub async fn run_with_timeout(&mut self, timeout: Duration) -> SvnResult<ExecutionResult> {
        self.drive(Some(Instant::now() + timeout)).await
    }

    /// Delete temp files created for this run.
    pub fn cleanup(&mut self) {
        if let Err(e) = self.line.cleanup() {
            warn!("Cleanup after {} failed: {e}", self.command_name);
        }
    }

    async fn drive(&mut self, deadline: Option<Instant>) -> SvnResult<ExecutionResult> {
        self.start()?;
        let Some(child) = self.child.as_mut() else {
            return Err(SvnError::InvalidInput("svn process was not started".to_string()));
        };

        let exit_code = loop {
            if let Ok(status) = tokio::time::timeout(self.poll_interval, child.wait()).await {
                break status?.code();
            }

            let expired = deadline.is_some_and(|d| Instant::now() >= d);
            let destroy = self.handle.should_destroy();
            if !(expired || destroy || self.handle.was_error()) {
                continue;
            }

            // One more interval to let the process exit on its own
            if let Ok(status) = tokio::time::timeout(self.poll_interval, child.wait()).await {
                break status?.code();
            }
            if expired {
                warn!("{} timed out, killing process", self.command_name);
                self.handle.mark_timed_out();
            } else if destroy {
                debug!("Destroying {} on request", self.command_name);
                self.handle.mark_destroyed();
            } else {
                debug!("Destroying {} after error output", self.command_name);
            }
            if let Err(e) = child.start_kill() {
                warn!("Failed to kill {}: {e}", self.command_name);
            }
            break child.wait().await?.code();
        };

        self.join_readers().await;
        self.handle.set_exit_code(exit_code);
        self.dispatcher.terminated(exit_code);
        if exit_code.is_none() {
            warn!("{} terminated without an exit code", self.command_name);
        }
        Ok(self.dispatcher.clone().into_result(self.command_name))
    }

    async fn join_readers(&mut self) {
        for reader in self.readers.drain(..) {
            let abort = reader.abort_handle();
            // A grandchild (e.g. an ssh tunnel) can keep the pipe open after exit
            match tokio::time::timeout(self.poll_interval * 2, reader).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Output reader failed: {e}"),
                Err(_) => {
                    warn!("Output reader still busy after exit, abandoning it");
                    abort.abort();
                }
            }
        }
    }
}

async fn pump<R>(mut reader: R, output_type: OutputType, dispatcher: OutputDispatcher, binary: bool)
where
    R: AsyncRead + Unpin,
{
    let mut buffer = vec![0_u8; READ_CHUNK_SIZE];
    let mut lines = LineReconstructor::new();
    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => break,
            Ok(read) if binary => dispatcher.bytes(&buffer[..read]),
            Ok(read) => {
                for line in lines.on_bytes_available(&buffer[..read]) {
                    dispatcher.line(&line, output_type);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!("Stopped reading {output_type:?}: {e}");
                break;
            }
        }
    }
    if let Some(rest) = lines.finish() {
        dispatcher.line(&rest, output_type);
    }
}
