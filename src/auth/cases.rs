use std::fmt;
use std::sync::LazyLock;

use log::{debug, info};
use regex::Regex;

use super::{AuthenticationService, CredentialKind, Credentials};
use crate::command::{Command, config_option};
use crate::config::SvnConfig;

/// Kind of failure an [`AuthCallbackCase`] resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthCategory {
    CertificateTrust,
    Proxy,
    TwoWaySsl,
    UsernamePassword,
    Passphrase,
    CredentialsByRealm,
    ServerUnavailable,
}

/// First-match order for pipe-based runs.
const BATCH_ORDER: [AuthCategory; 7] = [
    AuthCategory::CertificateTrust,
    AuthCategory::Proxy,
    AuthCategory::TwoWaySsl,
    AuthCategory::UsernamePassword,
    AuthCategory::Passphrase,
    AuthCategory::CredentialsByRealm,
    AuthCategory::ServerUnavailable,
];

/// Under a terminal the client asks about certificates itself.
const TERMINAL_ORDER: [AuthCategory; 6] = [
    AuthCategory::Proxy,
    AuthCategory::TwoWaySsl,
    AuthCategory::UsernamePassword,
    AuthCategory::Passphrase,
    AuthCategory::CredentialsByRealm,
    AuthCategory::ServerUnavailable,
];

const CERTIFICATE_ERRORS: [&str; 3] = [
    "Error validating server certificate for",
    "Server SSL certificate verification failed",
    "Server SSL certificate untrusted",
];

const PROXY_ERRORS: [&str; 2] = [
    "Could not authenticate to proxy server",
    "Proxy authentication failed",
];

/// Matched case-insensitively.
const AUTHENTICATION_ERRORS: [&str; 5] = [
    "authentication failed",
    "could not authenticate to server",
    "can't get password",
    "can't get username or password",
    "authorization failed",
];

const REALM_MARKER: &str = "Authentication realm:";

static PASSPHRASE_PROMPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Passphrase for '([^']+)'").unwrap_or_else(|e| panic!("invalid passphrase regex: {e}"))
});

/// Connectivity failures across platforms and transports.
static SERVER_UNAVAILABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?m)",
        r"^svn: E(?:000051|000060|000061|000064|000065|000101|000110|000111|000113|",
        r"670002|670003|670008|730010|730051|730060|730061|730064|730065|731001|731004): ",
        r"(?P<reason>[^\r\n]+)",
        r"|^svn: E\d{6}: (?P<reason2>(?:Connection refused|Connection timed out|No route to host|",
        r"Network is unreachable|Connection reset by peer|Temporary failure in name resolution|",
        r"Unknown hostname '[^']*'|Could not resolve hostname[^\r\n]*))",
        r"|(?i:can't connect to host '[^']*'): (?P<reason3>[^\r\n]+)",
    ))
    .unwrap_or_else(|e| panic!("invalid server unavailable regex: {e}"))
});

impl AuthCategory {
    /// Candidates in first-match order for the given transport.
    pub fn candidates(terminal: bool) -> &'static [AuthCategory] {
        if terminal { &TERMINAL_ORDER } else { &BATCH_ORDER }
    }

    pub fn can_handle(self, text: &str) -> bool {
        match self {
            AuthCategory::CertificateTrust => CERTIFICATE_ERRORS.iter().any(|p| text.contains(p)),
            AuthCategory::Proxy => PROXY_ERRORS.iter().any(|p| text.contains(p)),
            AuthCategory::TwoWaySsl => text
                .lines()
                .any(|line| line.contains("Access to ") && line.contains("forbidden")),
            AuthCategory::UsernamePassword => {
                let lower = text.to_lowercase();
                AUTHENTICATION_ERRORS.iter().any(|p| lower.contains(p))
            }
            AuthCategory::Passphrase => {
                text.contains(REALM_MARKER) && PASSPHRASE_PROMPT.is_match(text)
            }
            AuthCategory::CredentialsByRealm => text.contains(REALM_MARKER),
            AuthCategory::ServerUnavailable => SERVER_UNAVAILABLE.is_match(text),
        }
    }

    /// Credential kind requested from the service, if any.
    pub fn credential_kind(self) -> Option<CredentialKind> {
        match self {
            AuthCategory::Proxy => Some(CredentialKind::Proxy),
            AuthCategory::TwoWaySsl => Some(CredentialKind::SslClientCertificate),
            AuthCategory::UsernamePassword | AuthCategory::CredentialsByRealm => {
                Some(CredentialKind::UsernamePassword)
            }
            AuthCategory::Passphrase => Some(CredentialKind::SslClientPassphrase),
            AuthCategory::CertificateTrust | AuthCategory::ServerUnavailable => None,
        }
    }
}

impl fmt::Display for AuthCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthCategory::CertificateTrust => "server certificate trust",
            AuthCategory::Proxy => "proxy authentication",
            AuthCategory::TwoWaySsl => "client certificate",
            AuthCategory::UsernamePassword => "username and password",
            AuthCategory::Passphrase => "client certificate passphrase",
            AuthCategory::CredentialsByRealm => "realm credentials",
            AuthCategory::ServerUnavailable => "server connection",
        };
        f.write_str(name)
    }
}

/// What the service agreed to.
#[derive(Clone)]
enum Grant {
    TrustServerCertificate,
    Credentials(Credentials),
    Proxy(Credentials),
    ClientCertificate { file: String, passphrase: String },
}

/// One authentication failure matched against stderr, and its resolution.
///
/// Built fresh for each failed attempt. `acquire_credentials` asks the
/// service for whatever the category needs; `update_parameters` then
/// amends the command for the next attempt.
#[derive(Clone)]
pub struct AuthCallbackCase {
    category: AuthCategory,
    url: Option<String>,
    asked_before: bool,
    grant: Option<Grant>,
}

impl AuthCallbackCase {
    pub fn new(category: AuthCategory, url: Option<&str>) -> Self {
        Self {
            category,
            url: url.map(str::to_string),
            asked_before: false,
            grant: None,
        }
    }

    /// First case in transport order whose pattern matches `stderr`.
    pub fn select(stderr: &str, url: Option<&str>, terminal: bool) -> Option<Self> {
        AuthCategory::candidates(terminal)
            .iter()
            .copied()
            .find(|category| category.can_handle(stderr))
            .map(|category| Self::new(category, url))
    }

    /// Mark that the service already answered for this category during the call.
    pub fn with_asked_before(mut self, asked_before: bool) -> Self {
        self.asked_before = asked_before;
        self
    }

    pub fn category(&self) -> AuthCategory {
        self.category
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn can_handle(&self, text: &str) -> bool {
        self.category.can_handle(text)
    }

    /// Ask the service for what this case needs. Returns false when denied.
    pub fn acquire_credentials(&mut self, service: &dyn AuthenticationService, stderr: &str) -> bool {
        let url = self.url.as_deref();
        if self.asked_before
            && let Some(kind) = self.category.credential_kind()
        {
            debug!("Clearing rejected {kind:?} credentials for {}", url.unwrap_or("<unknown>"));
            service.clear_credentials(url, kind);
        }

        self.grant = match self.category {
            AuthCategory::CertificateTrust => service
                .accept_ssl_server_certificate(url)
                .then_some(Grant::TrustServerCertificate),
            AuthCategory::Proxy => service.proxy_authentication(url).map(Grant::Proxy),
            AuthCategory::TwoWaySsl => service
                .request_credentials(url, CredentialKind::SslClientCertificate)
                .map(|c| Grant::ClientCertificate {
                    file: c.username,
                    passphrase: c.password,
                }),
            AuthCategory::UsernamePassword | AuthCategory::CredentialsByRealm => service
                .request_credentials(url, CredentialKind::UsernamePassword)
                .map(Grant::Credentials),
            AuthCategory::Passphrase => {
                let file = PASSPHRASE_PROMPT
                    .captures(stderr)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string());
                service
                    .request_credentials(url, CredentialKind::SslClientPassphrase)
                    .map(|c| Grant::ClientCertificate {
                        file: file.unwrap_or(c.username),
                        passphrase: c.password,
                    })
            }
            AuthCategory::ServerUnavailable => None,
        };

        let granted = self.grant.is_some();
        info!(
            "{} for {}: {}",
            self.category,
            url.unwrap_or("<unknown>"),
            if granted { "granted" } else { "denied" }
        );
        granted
    }

    /// Hash of the granted answer, used to spot an identical retry.
    pub fn grant_fingerprint(&self) -> Option<u64> {
        match self.grant.as_ref()? {
            Grant::TrustServerCertificate => Some(0),
            Grant::Credentials(c) | Grant::Proxy(c) => Some(c.fingerprint()),
            Grant::ClientCertificate { file, passphrase } => {
                Some(Credentials::new(file.as_str(), passphrase.as_str()).fingerprint())
            }
        }
    }

    /// Amend `command` with the granted answer. No-op before a successful acquire.
    pub fn update_parameters(&self, command: &mut Command, config: &SvnConfig) {
        let Some(grant) = &self.grant else {
            return;
        };
        let host = self.url.as_deref().and_then(url_host);

        match grant {
            Grant::TrustServerCertificate => {
                command.put_flag("--trust-server-cert");
                command.force_non_interactive();
            }
            Grant::Credentials(credentials) => command.set_credentials(credentials.clone()),
            Grant::Proxy(credentials) => {
                let configured = config
                    .proxy
                    .as_ref()
                    .filter(|proxy| host.as_deref().is_none_or(|h| proxy.applies_to(h)));
                match (configured, host.as_deref()) {
                    (Some(proxy), Some(host)) => {
                        let section = put_server_group(command, host);
                        let port = proxy.port.to_string();
                        command.put_config_option(
                            config_option("servers", &section, "http-proxy-host", &proxy.host),
                            false,
                        );
                        command.put_config_option(
                            config_option("servers", &section, "http-proxy-port", &port),
                            false,
                        );
                        put_proxy_credentials(command, &section, credentials);
                    }
                    _ => put_proxy_credentials(command, "global", credentials),
                }
            }
            Grant::ClientCertificate { file, passphrase } => {
                let section = match host.as_deref() {
                    Some(host) => put_server_group(command, host),
                    None => "global".to_string(),
                };
                command.put_config_option(
                    config_option("servers", &section, "ssl-client-cert-file", file),
                    false,
                );
                command.put_config_option(
                    config_option("servers", &section, "ssl-client-cert-password", passphrase),
                    true,
                );
            }
        }
    }
}

impl fmt::Debug for AuthCallbackCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCallbackCase")
            .field("category", &self.category)
            .field("url", &self.url)
            .field("asked_before", &self.asked_before)
            .field("granted", &self.grant.is_some())
            .finish()
    }
}

fn put_proxy_credentials(command: &mut Command, section: &str, credentials: &Credentials) {
    command.put_config_option(
        config_option("servers", section, "http-proxy-username", &credentials.username),
        true,
    );
    command.put_config_option(
        config_option("servers", section, "http-proxy-password", &credentials.password),
        true,
    );
}

/// Register `host` in a dedicated server group and return the group name.
fn put_server_group(command: &mut Command, host: &str) -> String {
    let group = server_group_name(host);
    command.put_config_option(config_option("servers", "groups", &group, host), false);
    group
}

/// Server group name derived from a host: alphanumerics kept, the rest folded to `_`.
pub fn server_group_name(host: &str) -> String {
    let body: String = host
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("group_{body}")
}

/// Human-readable reason for a connectivity failure, if `stderr` reports one.
pub fn server_unavailable_reason(stderr: &str) -> Option<String> {
    let captures = SERVER_UNAVAILABLE.captures(stderr)?;
    ["reason", "reason2", "reason3"]
        .iter()
        .find_map(|name| captures.name(name))
        .map(|m| m.as_str().trim().to_string())
}

fn url_host(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}
