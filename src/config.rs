//! Runtime configuration for the svn client wrapper
//!
//! Defaults match an interactive desktop setup: `svn` from `PATH`, batch
//! transport, a 500 ms cancellation poll and no hard timeout. Hosts either
//! build an [`SvnConfig`] with the `with_*` methods or start from
//! [`SvnConfig::from_env`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

const ENV_SVN_BIN: &str = "KODEGEN_SVN_BIN";
const ENV_RUN_UNDER_TERMINAL: &str = "KODEGEN_SVN_RUN_UNDER_TERMINAL";
const ENV_CONFIG_DIR: &str = "KODEGEN_SVN_CONFIG_DIR";
const ENV_TIMEOUT_SECS: &str = "KODEGEN_SVN_TIMEOUT_SECS";

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_MAX_AUTH_ATTEMPTS: usize = 10;
const DEFAULT_MAX_TARGETS_LENGTH: usize = 8000;

/// Settings shared by every command run through a [`crate::CommandRuntime`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvnConfig {
    /// Path or name of the svn executable
    pub executable: PathBuf,
    /// Run remote commands under a pseudo-terminal and answer prompts inline
    pub run_under_terminal: bool,
    /// Interval for polling cancellation and destroy requests
    pub poll_interval_ms: u64,
    /// Hard timeout for a single process run
    pub command_timeout_ms: Option<u64>,
    /// Working directory used when a command has no local target
    pub default_working_directory: Option<PathBuf>,
    /// Persistent configuration directory passed as `--config-dir`
    pub config_directory: Option<PathBuf>,
    /// Let the client cache credentials injected on the command line
    pub store_credentials: bool,
    /// IDE-level HTTP proxy
    pub proxy: Option<ProxySettings>,
    /// Tunnel settings for `svn+ssh://` repositories
    pub ssh: Option<SshSettings>,
    /// Known working copy roots and their repository URLs
    pub url_mappings: BTreeMap<PathBuf, String>,
    /// Upper bound on process runs per command, retries included
    pub max_auth_attempts: usize,
    /// Combined target length above which targets go to a `--targets` file
    pub max_targets_length: usize,
}

impl Default for SvnConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("svn"),
            run_under_terminal: false,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            command_timeout_ms: None,
            default_working_directory: None,
            config_directory: None,
            store_credentials: false,
            proxy: None,
            ssh: None,
            url_mappings: BTreeMap::new(),
            max_auth_attempts: DEFAULT_MAX_AUTH_ATTEMPTS,
            max_targets_length: DEFAULT_MAX_TARGETS_LENGTH,
        }
    }
}

impl SvnConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `KODEGEN_SVN_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(bin) = std::env::var_os(ENV_SVN_BIN).filter(|v| !v.is_empty()) {
            config.executable = PathBuf::from(bin);
        }
        if let Ok(value) = std::env::var(ENV_RUN_UNDER_TERMINAL) {
            config.run_under_terminal = parse_flag(&value);
        }
        if let Some(dir) = std::env::var_os(ENV_CONFIG_DIR).filter(|v| !v.is_empty()) {
            config.config_directory = Some(PathBuf::from(dir));
        }
        if let Some(secs) = std::env::var(ENV_TIMEOUT_SECS)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            config.command_timeout_ms = Some(secs.saturating_mul(1000));
        }
        config
    }

    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    pub fn with_terminal(mut self, run_under_terminal: bool) -> Self {
        self.run_under_terminal = run_under_terminal;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis().max(1) as u64;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.default_working_directory = Some(dir.into());
        self
    }

    pub fn with_config_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_directory = Some(dir.into());
        self
    }

    pub fn with_store_credentials(mut self, store: bool) -> Self {
        self.store_credentials = store;
        self
    }

    pub fn with_proxy(mut self, proxy: ProxySettings) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_ssh(mut self, ssh: SshSettings) -> Self {
        self.ssh = Some(ssh);
        self
    }

    pub fn with_url_mapping(mut self, root: impl Into<PathBuf>, url: impl Into<String>) -> Self {
        self.url_mappings.insert(root.into(), url.into());
        self
    }

    pub fn with_max_auth_attempts(mut self, attempts: usize) -> Self {
        self.max_auth_attempts = attempts.max(1);
        self
    }

    pub fn with_max_targets_length(mut self, length: usize) -> Self {
        self.max_targets_length = length;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_ms.map(Duration::from_millis)
    }

    /// Repository URL for `path` from the configured working copy mappings.
    ///
    /// The longest mapped root containing `path` wins; the remainder of the
    /// path is appended to that root's URL.
    pub fn mapped_url(&self, path: &Path) -> Option<String> {
        self.url_mappings
            .iter()
            .filter_map(|(root, url)| path.strip_prefix(root).ok().map(|rest| (root, url, rest)))
            .max_by_key(|(root, _, _)| root.components().count())
            .map(|(_, url, rest)| {
                let mut mapped = url.trim_end_matches('/').to_string();
                for component in rest.components() {
                    mapped.push('/');
                    mapped.push_str(&component.as_os_str().to_string_lossy());
                }
                mapped
            })
    }
}

/// HTTP proxy applied to repository access through `servers` config overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    /// Never written back out when the config is serialized
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    /// Hosts reached directly; `*.example.com` matches any subdomain
    #[serde(default)]
    pub exceptions: Vec<String>,
}

impl ProxySettings {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
            exceptions: Vec::new(),
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_exception(mut self, host: impl Into<String>) -> Self {
        self.exceptions.push(host.into());
        self
    }

    /// Whether requests to `host` should go through this proxy.
    pub fn applies_to(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        !self.exceptions.iter().any(|exception| {
            let exception = exception.trim().to_ascii_lowercase();
            match exception.strip_prefix("*.") {
                Some(suffix) => host == suffix || host.ends_with(&format!(".{suffix}")),
                None => host == exception,
            }
        })
    }
}

/// Tunnel command used for `svn+ssh://` URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshSettings {
    pub executable: PathBuf,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub private_key: Option<PathBuf>,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("ssh"),
            port: None,
            user: None,
            private_key: None,
        }
    }
}

impl SshSettings {
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_private_key(mut self, key: impl Into<PathBuf>) -> Self {
        self.private_key = Some(key.into());
        self
    }

    /// Value for `config:tunnels:ssh`.
    pub fn tunnel_command(&self) -> String {
        let mut command = quote_if_needed(&self.executable.to_string_lossy());
        command.push_str(" -q");
        if let Some(port) = self.port {
            command.push_str(&format!(" -p {port}"));
        }
        if let Some(user) = &self.user {
            command.push_str(&format!(" -l {}", quote_if_needed(user)));
        }
        if let Some(key) = &self.private_key {
            command.push_str(&format!(" -i {}", quote_if_needed(&key.to_string_lossy())));
        }
        command
    }
}

fn quote_if_needed(value: &str) -> String {
    if value.contains(char::is_whitespace) {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
