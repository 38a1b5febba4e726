use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;
use tokio_util::sync::CancellationToken;

use super::{ExecutionResult, LineCommandListener, OutputType};
use crate::command::SvnCommandName;

#[derive(Debug, Default)]
struct ExecutorState {
    exit_code: Option<i32>,
    exit_recorded: bool,
    needs_destroy: bool,
    destroy_reason: Option<String>,
    manually_destroyed: bool,
    error_seen: bool,
    timed_out: bool,
}

/// Shared control surface of one executor.
///
/// Any thread may request cancellation or destruction; these calls only set
/// flags. The task driving the run loop is the only one that kills the
/// process.
#[derive(Clone, Default)]
pub struct ExecutorHandle {
    state: Arc<Mutex<ExecutorState>>,
    cancellation: Option<CancellationToken>,
}

impl ExecutorHandle {
    pub fn new(cancellation: Option<CancellationToken>) -> Self {
        Self {
            state: Arc::default(),
            cancellation,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ExecutorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Request destruction without a reason; the run ends without an error of its own.
    pub fn cancel(&self) {
        self.lock().needs_destroy = true;
    }

    /// Request destruction; `reason` becomes the call's error.
    pub fn destroy_process(&self, reason: impl Into<String>) {
        let mut state = self.lock();
        state.needs_destroy = true;
        if state.destroy_reason.is_none() {
            state.destroy_reason = Some(reason.into());
        }
    }

    pub fn needs_destroy(&self) -> bool {
        self.lock().needs_destroy
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Whether the run loop should tear the process down now.
    pub(crate) fn should_destroy(&self) -> bool {
        self.needs_destroy() || self.is_cancelled()
    }

    pub fn destroy_reason(&self) -> Option<String> {
        self.lock().destroy_reason.clone()
    }

    pub(crate) fn mark_error(&self) {
        self.lock().error_seen = true;
    }

    pub fn was_error(&self) -> bool {
        self.lock().error_seen
    }

    /// Record the exit code. Only the first call has an effect.
    pub(crate) fn set_exit_code(&self, code: Option<i32>) -> bool {
        let mut state = self.lock();
        if state.exit_recorded {
            debug!("Ignoring repeated exit code {code:?}");
            return false;
        }
        state.exit_recorded = true;
        state.exit_code = code;
        true
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.lock().exit_code
    }

    pub(crate) fn mark_destroyed(&self) {
        self.lock().manually_destroyed = true;
    }

    pub fn was_destroyed(&self) -> bool {
        self.lock().manually_destroyed
    }

    pub(crate) fn mark_timed_out(&self) {
        self.lock().timed_out = true;
    }

    pub fn is_timed_out(&self) -> bool {
        self.lock().timed_out
    }
}

#[derive(Debug, Default)]
struct Captured {
    stdout: String,
    stderr: String,
    binary: Vec<u8>,
}

/// Routes output to the buffers, the optional listener and the error flag.
#[derive(Clone)]
pub(crate) struct OutputDispatcher {
    captured: Arc<Mutex<Captured>>,
    listener: Option<Arc<dyn LineCommandListener>>,
    handle: ExecutorHandle,
}

impl OutputDispatcher {
    pub(crate) fn new(listener: Option<Arc<dyn LineCommandListener>>, handle: ExecutorHandle) -> Self {
        Self {
            captured: Arc::default(),
            listener,
            handle,
        }
    }

    fn captured(&self) -> MutexGuard<'_, Captured> {
        self.captured.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn line(&self, line: &str, output_type: OutputType) {
        {
            let mut captured = self.captured();
            let buffer = match output_type {
                OutputType::Stderr => &mut captured.stderr,
                OutputType::Stdout | OutputType::System => &mut captured.stdout,
            };
            buffer.push_str(line);
            buffer.push('\n');
        }
        if output_type == OutputType::Stderr && !line.trim().is_empty() {
            self.handle.mark_error();
        }
        if let Some(listener) = &self.listener {
            listener.on_line_available(line, output_type);
        }
    }

    pub(crate) fn bytes(&self, bytes: &[u8]) {
        self.captured().binary.extend_from_slice(bytes);
    }

    pub(crate) fn terminated(&self, exit_code: Option<i32>) {
        if let Some(listener) = &self.listener {
            listener.process_terminated(exit_code);
        }
    }

    pub(crate) fn into_result(self, command_name: SvnCommandName) -> ExecutionResult {
        let captured = std::mem::take(&mut *self.captured());
        ExecutionResult {
            command_name,
            exit_code: self.handle.exit_code(),
            stdout: captured.stdout,
            stderr: captured.stderr,
            binary: captured.binary,
            manually_destroyed: self.handle.was_destroyed(),
            destroy_reason: self.handle.destroy_reason(),
            timed_out: self.handle.is_timed_out(),
        }
    }
}
