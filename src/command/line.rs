use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::warn;
use tempfile::TempPath;

use super::{Command, MASK, Target, mask_secrets};
use crate::SvnResult;
use crate::config::SvnConfig;

const CONFIG_DIR_FLAG: &str = "--config-dir";
const NON_INTERACTIVE_FLAG: &str = "--non-interactive";

/// Fully assembled process invocation for one attempt.
///
/// Owns the temp files holding message bodies, property values and long
/// target lists; they are removed by [`CommandLine::cleanup`] or when the
/// line is dropped.
pub struct CommandLine {
    program: PathBuf,
    args: Vec<String>,
    logged_args: Vec<String>,
    working_directory: PathBuf,
    env: Vec<(String, String)>,
    temp_files: Vec<TempPath>,
}

impl CommandLine {
    /// Assemble argv: `[--config-dir DIR] NAME PARAMS... TARGETS... [--username U --password P] [--non-interactive]`.
    pub fn build(command: &Command, config: &SvnConfig, interactive: bool) -> SvnResult<Self> {
        let working_directory = match command
            .get_working_directory()
            .or(config.default_working_directory.as_deref())
        {
            Some(dir) => dir.to_path_buf(),
            None => std::env::current_dir()?,
        };

        let mut line = CommandLine {
            program: config.executable.clone(),
            args: Vec::new(),
            logged_args: Vec::new(),
            working_directory,
            env: locale_environment(),
            temp_files: Vec::new(),
        };

        if let Some(dir) = command.get_config_directory() {
            line.push(CONFIG_DIR_FLAG);
            line.push(dir.to_string_lossy());
        }
        line.push(command.name().as_str());
        for parameter in command.get_parameters() {
            line.push(parameter);
        }
        for parameter in command.get_runtime_parameters() {
            line.push(parameter);
        }

        if let Some(message) = command.get_message() {
            let path = line.write_temp_file("svn-message-", message)?;
            line.push("-F");
            line.push(path);
            line.push("--encoding");
            line.push("UTF-8");
        } else if let Some(value) = command.get_property_value() {
            let path = line.write_temp_file("svn-property-", value)?;
            line.push("-F");
            line.push(path);
        }

        let targets: Vec<String> = command.get_targets().iter().map(Target::to_arg).collect();
        let targets_length: usize = targets.iter().map(|t| t.len() + 1).sum();
        if targets_length > config.max_targets_length {
            let path = line.write_temp_file("svn-targets-", &targets.join("\n"))?;
            line.push("--targets");
            line.push(path);
        } else {
            for target in targets {
                line.push(target);
            }
        }

        let secrets = command.get_secret_parameters();
        for (value, logged) in secrets.iter().zip(mask_secrets(secrets)) {
            line.push_masked(value, logged);
        }

        if let Some(credentials) = command.get_credentials() {
            line.push("--username");
            line.push(&credentials.username);
            line.push("--password");
            line.push_masked(&credentials.password, MASK.to_string());
            if !config.store_credentials {
                line.push("--no-auth-cache");
            }
        }

        if !interactive || command.is_non_interactive() {
            line.push(NON_INTERACTIVE_FLAG);
        }

        Ok(line)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    /// `--config-dir` value recovered from the assembled arguments.
    pub fn config_directory(&self) -> Option<PathBuf> {
        self.args
            .iter()
            .position(|arg| arg == CONFIG_DIR_FLAG)
            .and_then(|i| self.args.get(i + 1))
            .map(PathBuf::from)
    }

    pub fn is_non_interactive(&self) -> bool {
        self.args.iter().any(|arg| arg == NON_INTERACTIVE_FLAG)
    }

    pub fn temp_files(&self) -> impl Iterator<Item = &Path> {
        self.temp_files.iter().map(std::ops::Deref::deref)
    }

    /// Remove temp files created for this line.
    pub fn cleanup(&mut self) -> io::Result<()> {
        let mut result = Ok(());
        for path in self.temp_files.drain(..) {
            let display = path.to_path_buf();
            if let Err(e) = path.close() {
                warn!("Failed to delete temp file {}: {e}", display.display());
                result = Err(e);
            }
        }
        result
    }

    fn push(&mut self, arg: impl AsRef<str>) {
        let arg = arg.as_ref().to_string();
        self.logged_args.push(arg.clone());
        self.args.push(arg);
    }

    fn push_masked(&mut self, arg: &str, logged: String) {
        self.args.push(arg.to_string());
        self.logged_args.push(logged);
    }

    fn write_temp_file(&mut self, prefix: &str, content: &str) -> SvnResult<String> {
        let mut file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(".txt")
            .tempfile()?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        let path = file.into_temp_path();
        let arg = path.to_string_lossy().into_owned();
        self.temp_files.push(path);
        Ok(arg)
    }
}

/// Force English client messages so error and progress text stays parseable.
fn locale_environment() -> Vec<(String, String)> {
    ["LC_ALL", "LANG", "LC_MESSAGES"]
        .into_iter()
        .map(|key| (key.to_string(), "C".to_string()))
        .collect()
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.logged_args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandLine")
            .field("program", &self.program)
            .field("args", &self.logged_args)
            .field("working_directory", &self.working_directory)
            .finish_non_exhaustive()
    }
}
