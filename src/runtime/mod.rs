//! Command runtime: preparation, execution and authentication retry
//!
//! [`CommandRuntime::run`] prepares a command once, then loops over single
//! attempts. Each attempt returns success, a fatal error, or a request to
//! retry after an [`AuthCallbackCase`] amended the command. The loop is
//! bounded by `max_auth_attempts` and by a ledger of answers already tried.

pub mod proxy;
mod resolution;
pub mod ssh;

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info, warn};

pub use resolution::working_copy_root;

use crate::auth::{AuthCallbackCase, AuthCategory, AuthenticationService, server_unavailable_reason};
use crate::command::{Command, SvnCommandName, Target};
use crate::config::SvnConfig;
use crate::execution::{BatchExecutor, ExecutionResult, Executor};
use crate::{ErrorCode, SvnError, SvnResult};

/// Outcome of a single failed attempt.
#[derive(Debug)]
pub(crate) enum AttemptError {
    Retry(AuthCategory),
    Fatal(SvnError),
}

impl From<SvnError> for AttemptError {
    fn from(e: SvnError) -> Self {
        AttemptError::Fatal(e)
    }
}

/// What earlier attempts of this call already asked for.
#[derive(Debug, Default)]
struct RetryLedger {
    asked: HashSet<AuthCategory>,
    answers: HashSet<(AuthCategory, u64)>,
}

/// Runs commands against the svn client with a shared configuration and
/// authentication service.
#[derive(Clone)]
pub struct CommandRuntime {
    config: Arc<SvnConfig>,
    auth: Arc<dyn AuthenticationService>,
}

impl CommandRuntime {
    pub fn new(config: SvnConfig, auth: Arc<dyn AuthenticationService>) -> Self {
        Self {
            config: Arc::new(config),
            auth,
        }
    }

    pub fn config(&self) -> &SvnConfig {
        &self.config
    }

    pub fn auth(&self) -> &Arc<dyn AuthenticationService> {
        &self.auth
    }

    /// Run `command` to completion, retrying authentication failures the
    /// service can resolve. The service is reset afterwards whatever the outcome.
    pub async fn run(&self, mut command: Command) -> SvnResult<ExecutionResult> {
        let result = self.run_attempts(&mut command).await;
        self.auth.reset();
        result
    }

    async fn run_attempts(&self, command: &mut Command) -> SvnResult<ExecutionResult> {
        resolution::prepare(command, &self.config, self.auth.as_ref()).await;

        let mut ledger = RetryLedger::default();
        let max_attempts = self.config.max_auth_attempts.max(1);
        for attempt in 1..=max_attempts {
            self.before_attempt(command);
            match self.attempt(command, &mut ledger).await {
                Ok(result) => return Ok(result),
                Err(AttemptError::Retry(category)) => {
                    info!("Retrying {} after {category} was resolved (attempt {attempt})", command.name());
                }
                Err(AttemptError::Fatal(e)) => return Err(e),
            }
        }
        warn!("{} still failing after {max_attempts} attempts", command.name());
        Err(SvnError::RetryLimitExceeded(max_attempts))
    }

    /// Per-attempt modules: proxy and SSH tunnel settings follow the current URL.
    fn before_attempt(&self, command: &mut Command) {
        let url = command.get_repository_url();
        let mut parameters = proxy::runtime_parameters(&self.config, url);
        parameters.extend(ssh::runtime_parameters(&self.config, url));
        command.set_runtime_parameters(parameters);
        proxy::put_credentials(&self.config, command);
    }

    async fn attempt(
        &self,
        command: &mut Command,
        ledger: &mut RetryLedger,
    ) -> Result<ExecutionResult, AttemptError> {
        let mut executor = Executor::create(command, &self.config, self.auth.clone())?;
        info!("Running {}", executor.command_line());
        let result = executor.run().await;
        executor.cleanup();
        let result = result?;
        self.after_command(command, result, executor.is_terminal(), ledger)
            .await
    }

    async fn after_command(
        &self,
        command: &mut Command,
        result: ExecutionResult,
        terminal: bool,
        ledger: &mut RetryLedger,
    ) -> Result<ExecutionResult, AttemptError> {
        if result.is_success() {
            if result.has_stderr() {
                info!("Detected warning: {}", result.stderr.trim());
            }
            return Ok(result);
        }

        if result.timed_out {
            let timeout = self.config.command_timeout().unwrap_or_default();
            return Err(SvnError::Timeout(timeout).into());
        }

        if result.manually_destroyed {
            if command.name().is_writeable() {
                self.cleanup_after_destroy(command).await;
            }
            return match result.destroy_reason {
                Some(reason) => Err(SvnError::Destroyed(reason).into()),
                None => Ok(result),
            };
        }

        if result.has_stderr() {
            return self.handle_error_text(command, &result.stderr, terminal, ledger).await;
        }

        Err(SvnError::ExitCode(result.exit_code.unwrap_or(-1)).into())
    }

    async fn handle_error_text(
        &self,
        command: &mut Command,
        stderr: &str,
        terminal: bool,
        ledger: &mut RetryLedger,
    ) -> Result<ExecutionResult, AttemptError> {
        let Some(case) = AuthCallbackCase::select(stderr, command.get_repository_url(), terminal) else {
            return Err(SvnError::from_stderr(stderr).into());
        };
        let category = case.category();

        if category == AuthCategory::ServerUnavailable {
            let reason = server_unavailable_reason(stderr).unwrap_or_else(|| stderr.trim().to_string());
            return Err(SvnError::ServerUnavailable {
                reason,
                codes: ErrorCode::parse_all(stderr),
            }
            .into());
        }
        if command.is_cancelled() {
            return Err(SvnError::from_stderr(stderr).into());
        }

        let mut case = case.with_asked_before(ledger.asked.contains(&category));
        let auth = self.auth.clone();
        let text = stderr.to_string();
        let (case, granted) = tokio::task::spawn_blocking(move || {
            let granted = case.acquire_credentials(auth.as_ref(), &text);
            (case, granted)
        })
        .await
        .map_err(|e| SvnError::Io(std::io::Error::other(e)))?;
        ledger.asked.insert(category);

        let denied = || SvnError::CredentialsDenied {
            category,
            message: stderr.trim().to_string(),
            codes: ErrorCode::parse_all(stderr),
        };
        if !granted {
            return Err(denied().into());
        }
        if let Some(fingerprint) = case.grant_fingerprint()
            && !ledger.answers.insert((category, fingerprint))
        {
            warn!("Same answer for {category} was already rejected, giving up");
            return Err(denied().into());
        }

        if self.auth.have_data_for_tmp_config()
            && let Some(dir) = self.auth.special_config_dir()
        {
            command.set_config_directory(dir);
        }
        case.update_parameters(command, &self.config);
        debug!("Command amended for retry: {command}");
        Err(AttemptError::Retry(category))
    }

    /// Release working copy locks an interrupted writeable command may have left.
    async fn cleanup_after_destroy(&self, command: &Command) {
        let root = command
            .get_working_directory()
            .and_then(working_copy_root)
            .or_else(|| resolution::first_local_path(command, &self.config).and_then(|p| working_copy_root(&p)));
        let Some(root) = root else {
            debug!("No working copy to clean up after destroyed {}", command.name());
            return;
        };

        let mut cleanup = Command::new(SvnCommandName::Cleanup)
            .target(Target::path(&root))
            .working_directory(&root);
        if let Some(dir) = command.get_config_directory() {
            cleanup.set_config_directory(dir.to_path_buf());
        }
        cleanup.force_non_interactive();

        info!("Cleaning up {} after destroyed {}", root.display(), command.name());
        match BatchExecutor::new(&cleanup, &self.config) {
            Ok(mut executor) => {
                match executor.run().await {
                    Ok(result) if result.is_success() => {}
                    Ok(result) => warn!("Cleanup of {} failed: {}", root.display(), result.stderr.trim()),
                    Err(e) => warn!("Cleanup of {} failed: {e}", root.display()),
                }
                executor.cleanup();
            }
            Err(e) => warn!("Cleanup of {} failed: {e}", root.display()),
        }
    }
}
