use std::io::{ErrorKind, Read, Write};
use std::sync::{Arc, LazyLock};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, info, warn};
use portable_pty::{Child, CommandBuilder, MasterPty, PtySize, native_pty_system};
use regex::Regex;
use tokio::time::Instant;

use super::prompts::{PromptOutcome, PromptResponder};
use super::{
    ExecutionResult, ExecutorHandle, LineCommandListener, LineReconstructor, OutputDispatcher,
    OutputType,
};
use crate::auth::AuthenticationService;
use crate::command::{Command, CommandLine, SvnCommandName};
use crate::config::SvnConfig;
use crate::{SvnError, SvnResult};

const READ_CHUNK_SIZE: usize = 4096;

/// Wide enough that the client never wraps a path.
const TERMINAL_SIZE: PtySize = PtySize {
    rows: 24,
    cols: 512,
    pixel_width: 0,
    pixel_height: 0,
};

static ERROR_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:svn|svnadmin|svnrdump|svnmucc): |^(?i:warning): |^[EW]\d{6}: ")
        .unwrap_or_else(|e| panic!("invalid error line regex: {e}"))
});

/// Stream a merged terminal line most likely came from.
pub fn classify_line(line: &str) -> OutputType {
    if ERROR_LINE.is_match(line) {
        OutputType::Stderr
    } else {
        OutputType::Stdout
    }
}

struct PtyProcess {
    child: Box<dyn Child + Send + Sync>,
    _master: Box<dyn MasterPty + Send>,
    reader: Option<JoinHandle<()>>,
}

/// Pseudo-terminal executor answering client prompts inline.
pub struct TerminalExecutor {
    line: CommandLine,
    command_name: SvnCommandName,
    handle: ExecutorHandle,
    dispatcher: OutputDispatcher,
    auth: Arc<dyn AuthenticationService>,
    url: Option<String>,
    poll_interval: Duration,
    timeout: Option<Duration>,
    process: Option<PtyProcess>,
}

impl TerminalExecutor {
    pub fn new(
        command: &Command,
        config: &SvnConfig,
        auth: Arc<dyn AuthenticationService>,
    ) -> SvnResult<Self> {
        let line = CommandLine::build(command, config, true)?;
        let handle = ExecutorHandle::new(command.get_cancellation().cloned());
        let listener: Option<Arc<dyn LineCommandListener>> = command.get_listener().cloned();
        Ok(Self {
            line,
            command_name: command.name(),
            dispatcher: OutputDispatcher::new(listener, handle.clone()),
            handle,
            auth,
            url: command.get_repository_url().map(str::to_string),
            poll_interval: config.poll_interval(),
            timeout: config.command_timeout(),
            process: None,
        })
    }

    pub fn command_line(&self) -> &CommandLine {
        &self.line
    }

    pub fn handle(&self) -> ExecutorHandle {
        self.handle.clone()
    }

    pub fn start(&mut self) -> SvnResult<()> {
        if self.process.is_some() {
            return Ok(());
        }
        debug!("Starting under terminal: {}", self.line);

        let start_error = |e: &dyn std::fmt::Display| SvnError::ProcessStart {
            exe: self.line.program().display().to_string(),
            message: e.to_string(),
        };

        let pair = native_pty_system()
            .openpty(TERMINAL_SIZE)
            .map_err(|e| start_error(&e))?;

        let mut builder = CommandBuilder::new(self.line.program());
        builder.args(self.line.args());
        builder.cwd(self.line.working_directory());
        for (key, value) in self.line.env() {
            builder.env(key, value);
        }

        let mut child = pair.slave.spawn_command(builder).map_err(|e| start_error(&e))?;
        drop(pair.slave);

        let io = pair
            .master
            .try_clone_reader()
            .and_then(|reader| Ok((reader, pair.master.take_writer()?)));
        let (mut reader, writer) = match io {
            Ok(io) => io,
            Err(e) => {
                let _ = child.kill();
                return Err(start_error(&e));
            }
        };

        let mut pump = TerminalOutputPump::new(
            PromptResponder::new(self.auth.clone(), self.url.clone()),
            writer,
            self.dispatcher.clone(),
            self.handle.clone(),
        );
        let reader_thread = std::thread::spawn(move || {
            let mut buffer = [0_u8; READ_CHUNK_SIZE];
            loop {
                match reader.read(&mut buffer) {
                    Ok(0) => break,
                    Ok(read) => pump.on_bytes(&buffer[..read]),
                    Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                    // EIO once the last slave descriptor closes
                    Err(_) => break,
                }
            }
            pump.finish();
        });

        self.process = Some(PtyProcess {
            child,
            _master: pair.master,
            reader: Some(reader_thread),
        });
        Ok(())
    }

    pub async fn run(&mut self) -> SvnResult<ExecutionResult> {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        self.drive(deadline).await
    }

    pub async fn run_with_timeout(&mut self, timeout: Duration) -> SvnResult<ExecutionResult> {
        self.drive(Some(Instant::now() + timeout)).await
    }

    pub fn cleanup(&mut self) {
        if let Err(e) = self.line.cleanup() {
            warn!("Cleanup after {} failed: {e}", self.command_name);
        }
    }

    async fn drive(&mut self, deadline: Option<Instant>) -> SvnResult<ExecutionResult> {
        self.start()?;
        let Some(process) = self.process.as_mut() else {
            return Err(SvnError::InvalidInput("svn process was not started".to_string()));
        };

        let mut killed = false;
        let exit_code = loop {
            if let Some(status) = process.child.try_wait()? {
                break if killed {
                    None
                } else {
                    i32::try_from(status.exit_code()).ok()
                };
            }

            if !killed {
                let expired = deadline.is_some_and(|d| Instant::now() >= d);
                if expired || self.handle.should_destroy() {
                    if expired {
                        warn!("{} timed out, killing process", self.command_name);
                        self.handle.mark_timed_out();
                    } else {
                        debug!("Destroying {} on request", self.command_name);
                        self.handle.mark_destroyed();
                    }
                    if let Err(e) = process.child.kill() {
                        warn!("Failed to kill {}: {e}", self.command_name);
                    }
                    killed = true;
                }
            }

            tokio::time::sleep(self.poll_interval.min(Duration::from_millis(50))).await;
        };

        if let Some(reader) = process.reader.take() {
            let join = tokio::task::spawn_blocking(move || reader.join());
            match tokio::time::timeout(self.poll_interval * 4, join).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(_))) => warn!("Terminal reader thread panicked"),
                Ok(Err(e)) => warn!("Task join error: {e}"),
                Err(_) => warn!("Terminal reader still busy after exit, abandoning it"),
            }
        }

        self.handle.set_exit_code(exit_code);
        self.dispatcher.terminated(exit_code);
        if exit_code.is_none() {
            warn!("{} terminated without an exit code", self.command_name);
        }
        Ok(self.dispatcher.clone().into_result(self.command_name))
    }
}

/// Line to drop after typing an answer, since terminals differ in how they echo it.
enum SkipNext {
    /// Blank line or the plain echo of the answer.
    Echo(String),
    /// Whatever complete line follows, unless a prompt claims it.
    Secret,
}

/// Runs on the reader thread: rebuilds lines, answers prompts, routes the rest.
pub(crate) struct TerminalOutputPump {
    lines: LineReconstructor,
    prompts: PromptResponder,
    writer: Box<dyn Write + Send>,
    dispatcher: OutputDispatcher,
    handle: ExecutorHandle,
    skip_next: Option<SkipNext>,
}

impl TerminalOutputPump {
    pub(crate) fn new(
        prompts: PromptResponder,
        writer: Box<dyn Write + Send>,
        dispatcher: OutputDispatcher,
        handle: ExecutorHandle,
    ) -> Self {
        Self {
            lines: LineReconstructor::new(),
            prompts,
            writer,
            dispatcher,
            handle,
            skip_next: None,
        }
    }

    pub(crate) fn on_bytes(&mut self, bytes: &[u8]) {
        for line in self.lines.on_bytes_available(bytes) {
            self.on_line(&line);
        }

        let pending = self.lines.pending();
        if pending.trim().is_empty() {
            return;
        }
        let outcome = self.prompts.offer(pending, false);
        if outcome != PromptOutcome::Ignored {
            self.lines.clear_pending();
            self.apply(outcome);
        }
    }

    pub(crate) fn finish(&mut self) {
        if let Some(rest) = self.lines.finish() {
            self.on_line(&rest);
        }
    }

    fn on_line(&mut self, line: &str) {
        let skip = self.skip_next.take();
        if let Some(SkipNext::Echo(echo)) = &skip {
            let trimmed = line.trim();
            if trimmed.is_empty() || echo == trimmed {
                return;
            }
        }
        match self.prompts.offer(line, true) {
            PromptOutcome::Ignored if matches!(skip, Some(SkipNext::Secret)) => {
                debug!("Dropped terminal line following a secret answer");
            }
            PromptOutcome::Ignored => self.dispatcher.line(line, classify_line(line)),
            outcome => self.apply(outcome),
        }
    }

    fn apply(&mut self, outcome: PromptOutcome) {
        match outcome {
            PromptOutcome::Ignored | PromptOutcome::Consumed => {}
            PromptOutcome::Answer { text, secret } => {
                let written = writeln!(self.writer, "{text}").and_then(|()| self.writer.flush());
                if let Err(e) = written {
                    self.handle
                        .destroy_process(format!("Failed to answer prompt: {e}"));
                    return;
                }
                self.skip_next = Some(if secret {
                    SkipNext::Secret
                } else {
                    SkipNext::Echo(text)
                });
            }
            PromptOutcome::Cancel(reason) => {
                info!("{reason}");
                self.handle.destroy_process(reason);
            }
        }
    }
}
