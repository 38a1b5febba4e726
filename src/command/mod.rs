//! Command descriptors
//!
//! A [`Command`] describes one logical svn invocation. It is created once
//! per call, filled in by the runtime's preparation step, amended in place
//! by authentication retries and dropped when the runtime returns.
//!
//! Secrets never live in the ordinary parameter list: credentials and
//! password-bearing `--config-option` values are kept apart so that
//! [`Command::logged_parameters`] and the `Display` impl can mask them.

mod line;
mod name;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

pub use line::CommandLine;
pub use name::SvnCommandName;

use crate::auth::Credentials;
use crate::execution::LineCommandListener;

pub(crate) const MASK: &str = "******";

/// What a command operates on: a local path or a repository URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Path(PathBuf),
    Url(String),
}

impl Target {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Target::Path(path.into())
    }

    pub fn url(url: impl Into<String>) -> Self {
        Target::Url(url.into())
    }

    pub fn is_url(&self) -> bool {
        matches!(self, Target::Url(_))
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Target::Path(path) => Some(path),
            Target::Url(_) => None,
        }
    }

    pub fn as_url(&self) -> Option<&str> {
        match self {
            Target::Url(url) => Some(url),
            Target::Path(_) => None,
        }
    }

    pub fn to_arg(&self) -> String {
        match self {
            Target::Path(path) => path.to_string_lossy().into_owned(),
            Target::Url(url) => url.clone(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_arg())
    }
}

/// Revision argument for `-r`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revision {
    Head,
    Base,
    Committed,
    Previous,
    Working,
    Number(i64),
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Revision::Head => f.write_str("HEAD"),
            Revision::Base => f.write_str("BASE"),
            Revision::Committed => f.write_str("COMMITTED"),
            Revision::Previous => f.write_str("PREV"),
            Revision::Working => f.write_str("WORKING"),
            Revision::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Depth argument for `--depth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Empty,
    Files,
    Immediates,
    Infinity,
}

impl Depth {
    pub const fn as_str(self) -> &'static str {
        match self {
            Depth::Empty => "empty",
            Depth::Files => "files",
            Depth::Immediates => "immediates",
            Depth::Infinity => "infinity",
        }
    }
}

/// Format a `--config-option` value: `FILE:SECTION:OPTION=VALUE`.
pub fn config_option(file: &str, section: &str, option: &str, value: &str) -> String {
    format!("{file}:{section}:{option}={value}")
}

/// One svn invocation.
#[derive(Clone)]
pub struct Command {
    name: SvnCommandName,
    parameters: Vec<String>,
    secret_parameters: Vec<String>,
    runtime_parameters: Vec<String>,
    targets: Vec<Target>,
    message: Option<String>,
    property_value: Option<String>,
    working_directory: Option<PathBuf>,
    repository_url: Option<String>,
    config_directory: Option<PathBuf>,
    credentials: Option<Credentials>,
    listener: Option<Arc<dyn LineCommandListener>>,
    cancellation: Option<CancellationToken>,
    binary_output: bool,
    non_interactive: bool,
}

impl Command {
    pub fn new(name: SvnCommandName) -> Self {
        Self {
            name,
            parameters: Vec::new(),
            secret_parameters: Vec::new(),
            runtime_parameters: Vec::new(),
            targets: Vec::new(),
            message: None,
            property_value: None,
            working_directory: None,
            repository_url: None,
            config_directory: None,
            credentials: None,
            listener: None,
            cancellation: None,
            binary_output: false,
            non_interactive: false,
        }
    }

    pub fn parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameters.push(parameter.into());
        self
    }

    pub fn parameters<I, S>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters.extend(parameters.into_iter().map(Into::into));
        self
    }

    pub fn target(mut self, target: Target) -> Self {
        self.targets.push(target);
        self
    }

    pub fn targets(mut self, targets: impl IntoIterator<Item = Target>) -> Self {
        self.targets.extend(targets);
        self
    }

    /// Commit/import log message; passed through a temp file with `-F`.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// `propset` value; passed through a temp file with `-F`.
    pub fn property_value(mut self, value: impl Into<String>) -> Self {
        self.property_value = Some(value.into());
        self
    }

    pub fn working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn repository_url(mut self, url: impl Into<String>) -> Self {
        self.repository_url = Some(url.into());
        self
    }

    pub fn config_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_directory = Some(dir.into());
        self
    }

    pub fn listener(mut self, listener: Arc<dyn LineCommandListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Capture stdout as raw bytes instead of text lines (e.g. `cat`).
    pub fn binary_output(mut self) -> Self {
        self.binary_output = true;
        self
    }

    pub fn name(&self) -> SvnCommandName {
        self.name
    }

    pub fn get_parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn get_runtime_parameters(&self) -> &[String] {
        &self.runtime_parameters
    }

    pub(crate) fn get_secret_parameters(&self) -> &[String] {
        &self.secret_parameters
    }

    pub fn get_targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn get_message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn get_property_value(&self) -> Option<&str> {
        self.property_value.as_deref()
    }

    pub fn get_working_directory(&self) -> Option<&Path> {
        self.working_directory.as_deref()
    }

    pub fn get_repository_url(&self) -> Option<&str> {
        self.repository_url.as_deref()
    }

    pub fn get_config_directory(&self) -> Option<&Path> {
        self.config_directory.as_deref()
    }

    pub fn get_credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn get_listener(&self) -> Option<&Arc<dyn LineCommandListener>> {
        self.listener.as_ref()
    }

    pub fn get_cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    pub fn is_binary_output(&self) -> bool {
        self.binary_output
    }

    pub fn is_non_interactive(&self) -> bool {
        self.non_interactive
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Whether this particular invocation stays on the local machine.
    pub fn is_local(&self) -> bool {
        if self.name.is_local() {
            return true;
        }
        let local_targets = self.targets.iter().all(|t| !t.is_url());
        match self.name {
            SvnCommandName::Status => {
                local_targets
                    && !self
                        .parameters
                        .iter()
                        .any(|p| p == "-u" || p == "--show-updates")
            }
            SvnCommandName::Info | SvnCommandName::PropGet | SvnCommandName::PropList => {
                local_targets && !self.parameters.iter().any(|p| p == "-r" || p == "--revision")
            }
            _ => false,
        }
    }

    /// First local target, used to locate the working copy.
    pub fn first_path_target(&self) -> Option<&Path> {
        self.targets.iter().find_map(Target::as_path)
    }

    /// First URL target.
    pub fn first_url_target(&self) -> Option<&str> {
        self.targets.iter().find_map(Target::as_url)
    }

    pub fn put(&mut self, parameter: impl Into<String>) {
        self.parameters.push(parameter.into());
    }

    /// Add a parameter unless it is already present.
    pub fn put_flag(&mut self, flag: &str) {
        if !self.parameters.iter().any(|p| p == flag) {
            self.parameters.push(flag.to_string());
        }
    }

    /// Add or replace a `--config-option`.
    ///
    /// Secret values go to the masked parameter list. An earlier option with
    /// the same `FILE:SECTION:OPTION` key is removed from either list, so a
    /// retry never passes two conflicting values.
    pub fn put_config_option(&mut self, option: String, secret: bool) {
        let key = option.split_once('=').map_or(option.as_str(), |(key, _)| key);
        let prefix = format!("{key}=");
        remove_config_option(&mut self.parameters, &prefix);
        remove_config_option(&mut self.secret_parameters, &prefix);
        let list = if secret {
            &mut self.secret_parameters
        } else {
            &mut self.parameters
        };
        list.push("--config-option".to_string());
        list.push(option);
    }

    pub fn set_credentials(&mut self, credentials: Credentials) {
        self.credentials = Some(credentials);
    }

    pub fn set_working_directory(&mut self, dir: PathBuf) {
        self.working_directory = Some(dir);
    }

    pub fn set_repository_url(&mut self, url: String) {
        self.repository_url = Some(url);
    }

    pub fn set_config_directory(&mut self, dir: PathBuf) {
        self.config_directory = Some(dir);
    }

    /// Replace parameters produced by per-attempt runtime modules.
    pub fn set_runtime_parameters(&mut self, parameters: Vec<String>) {
        self.runtime_parameters = parameters;
    }

    /// Pass `--non-interactive` even when running under a terminal.
    pub fn force_non_interactive(&mut self) {
        self.non_interactive = true;
    }

    /// Parameters as they may appear in logs: secrets and credentials masked.
    pub fn logged_parameters(&self) -> Vec<String> {
        let mut logged = self.parameters.clone();
        logged.extend(self.runtime_parameters.iter().cloned());
        logged.extend(self.targets.iter().map(Target::to_arg));
        logged.extend(mask_secrets(&self.secret_parameters));
        if let Some(credentials) = &self.credentials {
            logged.push("--username".to_string());
            logged.push(credentials.username.clone());
            logged.push("--password".to_string());
            logged.push(MASK.to_string());
        }
        logged
    }
}

fn remove_config_option(list: &mut Vec<String>, prefix: &str) {
    let mut i = 0;
    while i + 1 < list.len() {
        if list[i] == "--config-option" && list[i + 1].starts_with(prefix) {
            list.drain(i..i + 2);
        } else {
            i += 1;
        }
    }
}

/// Mask the value half of every secret `--config-option`.
pub(crate) fn mask_secrets(secrets: &[String]) -> Vec<String> {
    secrets
        .iter()
        .map(|p| {
            if p == "--config-option" {
                return p.clone();
            }
            match p.split_once('=') {
                Some((key, _)) => format!("{key}={MASK}"),
                None => MASK.to_string(),
            }
        })
        .collect()
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("parameters", &self.logged_parameters())
            .field("working_directory", &self.working_directory)
            .field("repository_url", &self.repository_url)
            .field("config_directory", &self.config_directory)
            .field("binary_output", &self.binary_output)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "svn {}", self.name)?;
        for parameter in self.logged_parameters() {
            write!(f, " {parameter}")?;
        }
        Ok(())
    }
}
