//! Authentication collaborator and credential strategies
//!
//! The runtime never stores credentials. Everything it needs is obtained
//! on demand from an injected [`AuthenticationService`], which is free to
//! show a dialog, consult a keychain or simply refuse. Batch-mode failures
//! are classified by the [`AuthCallbackCase`] family; terminal-mode prompts
//! are answered by the modules in [`crate::execution::prompts`].

mod cases;

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use cases::{AuthCallbackCase, AuthCategory, server_group_name, server_unavailable_reason};

/// A username (or certificate path) paired with its secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Stable hash used to recognise a repeated answer without keeping the secret.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.username.hash(&mut hasher);
        self.password.hash(&mut hasher);
        hasher.finish()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"******")
            .finish()
    }
}

/// Kind of secret requested from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CredentialKind {
    /// Repository username and password
    UsernamePassword,
    /// Client certificate: `username` holds the certificate file, `password` its passphrase
    SslClientCertificate,
    /// Passphrase for an already configured client certificate, in `password`
    SslClientPassphrase,
    /// Proxy username and password
    Proxy,
}

/// What an SSH prompt is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SshCredentialMode {
    Passphrase,
    Password,
}

/// Answer to an interactive server certificate prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcceptResult {
    Reject,
    AcceptTemporarily,
    AcceptPermanently,
}

/// Certificate details printed by the client before its trust prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateInfo {
    pub hostname: Option<String>,
    pub valid_from: Option<String>,
    pub valid_until: Option<String>,
    pub issuer: Option<String>,
    pub fingerprint: Option<String>,
    /// Reasons the client gave for not trusting the certificate
    pub problems: Vec<String>,
}

/// Source of credentials and trust decisions, consumed but not implemented here.
///
/// Calls may block (e.g. on a dialog). The batch runtime invokes the service
/// on a blocking task; the terminal reader thread invokes it directly.
pub trait AuthenticationService: Send + Sync {
    fn request_credentials(&self, url: Option<&str>, kind: CredentialKind) -> Option<Credentials>;

    fn request_ssh_credentials(
        &self,
        realm: &str,
        mode: SshCredentialMode,
        key: Option<&str>,
    ) -> Option<String>;

    /// Trust an SSL server certificate the client could not verify.
    fn accept_ssl_server_certificate(&self, url: Option<&str>) -> bool;

    /// Decide on a certificate presented at an interactive prompt.
    fn accept_certificate(&self, url: &str, info: &CertificateInfo) -> AcceptResult;

    fn proxy_authentication(&self, url: Option<&str>) -> Option<Credentials>;

    /// Whether credentials gathered so far must go to an isolated config directory.
    fn have_data_for_tmp_config(&self) -> bool;

    /// Per-run config directory holding write-isolated credentials.
    fn special_config_dir(&self) -> Option<PathBuf>;

    /// Drop transient per-call state.
    fn reset(&self);

    /// Trust an unknown SSH host key.
    fn accept_ssh_host_key(&self, _host: &str, _fingerprint: Option<&str>) -> bool {
        false
    }

    /// Forget cached credentials that the server has just rejected.
    fn clear_credentials(&self, _url: Option<&str>, _kind: CredentialKind) {}
}

/// Service that never supplies anything; every authentication failure is fatal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuthenticationService;

impl AuthenticationService for NoopAuthenticationService {
    fn request_credentials(&self, _url: Option<&str>, _kind: CredentialKind) -> Option<Credentials> {
        None
    }

    fn request_ssh_credentials(
        &self,
        _realm: &str,
        _mode: SshCredentialMode,
        _key: Option<&str>,
    ) -> Option<String> {
        None
    }

    fn accept_ssl_server_certificate(&self, _url: Option<&str>) -> bool {
        false
    }

    fn accept_certificate(&self, _url: &str, _info: &CertificateInfo) -> AcceptResult {
        AcceptResult::Reject
    }

    fn proxy_authentication(&self, _url: Option<&str>) -> Option<Credentials> {
        None
    }

    fn have_data_for_tmp_config(&self) -> bool {
        false
    }

    fn special_config_dir(&self) -> Option<PathBuf> {
        None
    }

    fn reset(&self) {}
}
