//! `kodegen_tools_svn` - A Subversion command-line runtime
//!
//! This library drives the external `svn` client as a managed subprocess.
//! Callers describe a logical operation as a [`Command`] and hand it to a
//! [`CommandRuntime`], which resolves the working copy and repository URL,
//! applies proxy and SSH tunnel settings, runs the process in batch (pipes)
//! or terminal (pseudo-terminal) mode, and transparently retries when the
//! client reports an authentication failure that the injected
//! [`AuthenticationService`] can resolve.
//!
//! Raw client output is converted into structured values by the parsers in
//! [`parse`]: progress events for update/checkout/commit and records for
//! `info --xml` / `status --xml`.

use std::time::Duration;

use thiserror::Error;

// Module declarations
pub mod auth;
pub mod command;
pub mod config;
pub mod execution;
pub mod operations;
pub mod parse;
pub mod runtime;

mod error_code;

pub use error_code::ErrorCode;

// Re-export the runtime surface
pub use auth::{
    AcceptResult, AuthCallbackCase, AuthCategory, AuthenticationService, CertificateInfo,
    CredentialKind, Credentials, NoopAuthenticationService, SshCredentialMode,
};
pub use command::{Command, CommandLine, Depth, Revision, SvnCommandName, Target};
pub use config::{ProxySettings, SshSettings, SvnConfig};
pub use execution::{
    BatchExecutor, ExecutionResult, Executor, ExecutorHandle, LineCommandListener,
    LineReconstructor, OutputType, TerminalExecutor,
};
pub use runtime::{CommandRuntime, working_copy_root};

// Re-export operations
pub use operations::{
    CatOpts, CheckoutOpts, CommitOpts, CommitOutcome, StatusOpts, StatusReport, UpdateOpts, cat,
    checkout, cleanup, commit, info, status, update,
};

/// Error types for svn client operations
#[derive(Debug, Error)]
pub enum SvnError {
    #[error("Failed to start svn process `{exe}`: {message}")]
    ProcessStart { exe: String, message: String },

    #[error("Credentials were not provided for {category}: {message}")]
    CredentialsDenied {
        category: AuthCategory,
        message: String,
        codes: Vec<ErrorCode>,
    },

    #[error("Repository server is unavailable: {reason}")]
    ServerUnavailable { reason: String, codes: Vec<ErrorCode> },

    #[error("{message}")]
    Command { message: String, codes: Vec<ErrorCode> },

    #[error("Svn process exited with error code: {0}")]
    ExitCode(i32),

    #[error("Svn process was destroyed: {0}")]
    Destroyed(String),

    #[error("Svn operation timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Authentication retry limit reached after {0} attempts")]
    RetryLimitExceeded(usize),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SvnError {
    /// Wrap client error output, keeping every embedded `E######` code.
    pub fn from_stderr(text: &str) -> Self {
        let message = text.trim().to_string();
        SvnError::Command {
            codes: ErrorCode::parse_all(&message),
            message,
        }
    }

    /// Error codes parsed out of the client's error output, if any.
    pub fn codes(&self) -> &[ErrorCode] {
        match self {
            SvnError::CredentialsDenied { codes, .. }
            | SvnError::ServerUnavailable { codes, .. }
            | SvnError::Command { codes, .. } => codes,
            _ => &[],
        }
    }

    /// Whether the client reported `code` for this failure.
    pub fn contains(&self, code: ErrorCode) -> bool {
        self.codes().contains(&code)
    }
}

impl From<quick_xml::Error> for SvnError {
    fn from(e: quick_xml::Error) -> Self {
        SvnError::Xml(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for SvnError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        SvnError::Xml(e.to_string())
    }
}

/// Convenience result alias.
pub type SvnResult<T> = Result<T, SvnError>;
