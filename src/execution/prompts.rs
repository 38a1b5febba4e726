//! Inline answers to client prompts in terminal mode
//!
//! Each module is a small state machine fed one line at a time. Complete
//! lines advance its state; an unterminated tail is offered as well, but
//! only question patterns (which the client prints without a newline) may
//! claim it. A module that recognises a question asks the
//! [`AuthenticationService`] and returns the text to type.

use std::sync::{Arc, LazyLock};

use log::{debug, info};
use regex::Regex;

use crate::auth::{
    AcceptResult, AuthenticationService, CertificateInfo, CredentialKind, Credentials,
    SshCredentialMode,
};

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid prompt regex {pattern}: {e}"))
}

static HOST_UNKNOWN: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^The authenticity of host '(?P<host>[^']+)' can't be established"));
static HOST_FINGERPRINT: LazyLock<Regex> =
    LazyLock::new(|| compile(r"key fingerprint is (?P<fingerprint>\S+?)\.?\s*$"));
static HOST_CONFIRM: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^Are you sure you want to continue connecting \(yes/no(?:/\[fingerprint\])?\)\?\s*$")
});
static SSH_PASSPHRASE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^Enter passphrase for key '(?P<key>[^']+)':\s*$"));
static SSH_PASSWORD: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^(?P<user>[^@\s']+)@(?P<host>[^\s']+)'s password:\s*$"));

static REALM: LazyLock<Regex> = LazyLock::new(|| compile(r"^Authentication realm: (?P<realm>.+?)\s*$"));
static USERNAME: LazyLock<Regex> = LazyLock::new(|| compile(r"^Username:\s*$"));
static PASSWORD: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^Password for '(?P<user>[^']*)':\s*$"));
static STORE_UNENCRYPTED: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^Store (?:password|passphrase) unencrypted \(yes/no\)\?\s*$")
});

static CLIENT_CERT_FILE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^Client certificate filename:\s*$"));
static CLIENT_CERT_PASSPHRASE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^Passphrase for '(?P<file>[^']+)':\s*$"));

static CERT_ERROR: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^Error validating server certificate for '(?P<url>[^']+)':"));
static CERT_VALID: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^ - Valid: from (?P<from>.+?) until (?P<until>.+?)\s*$"));
static CERT_QUESTION: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^\(R\)eject, accept \(t\)emporarily(?: or accept \(p\)ermanently)?\?\s*$")
});

/// What a module did with a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    /// Not a prompt line for this module
    Ignored,
    /// Part of a prompt block; not ordinary output
    Consumed,
    /// Type `text` followed by a newline
    Answer { text: String, secret: bool },
    /// Give up and destroy the process with this reason
    Cancel(String),
}

impl PromptOutcome {
    fn answer(text: impl Into<String>) -> Self {
        PromptOutcome::Answer {
            text: text.into(),
            secret: false,
        }
    }

    fn secret(text: impl Into<String>) -> Self {
        PromptOutcome::Answer {
            text: text.into(),
            secret: true,
        }
    }
}

/// Shared inputs for a module step.
struct PromptContext<'a> {
    service: &'a dyn AuthenticationService,
    url: Option<&'a str>,
}

#[derive(Debug, Default)]
enum SshState {
    #[default]
    Idle,
    HostUnknown { host: String, fingerprint: Option<String> },
}

#[derive(Debug, Default)]
enum CredentialsState {
    #[default]
    Idle,
    Realm(String),
    /// Username typed; password follows
    AwaitingPassword(Credentials),
}

#[derive(Debug, Default)]
enum ClientCertificateState {
    #[default]
    Idle,
    AwaitingPassphrase(Credentials),
}

#[derive(Debug, Default)]
enum ServerCertificateState {
    #[default]
    Idle,
    Collecting { url: String, info: CertificateInfo },
}

/// One family of prompts.
#[derive(Debug)]
enum PromptModule {
    Ssh(SshState),
    Credentials(CredentialsState),
    ClientCertificate(ClientCertificateState),
    ServerCertificate(ServerCertificateState),
}

impl PromptModule {
    fn step(&mut self, line: &str, complete: bool, ctx: &PromptContext<'_>) -> PromptOutcome {
        match self {
            PromptModule::Ssh(state) => ssh_step(state, line, complete, ctx),
            PromptModule::Credentials(state) => credentials_step(state, line, complete, ctx),
            PromptModule::ClientCertificate(state) => client_certificate_step(state, line, ctx),
            PromptModule::ServerCertificate(state) => {
                server_certificate_step(state, line, complete, ctx)
            }
        }
    }
}

fn ssh_step(state: &mut SshState, line: &str, complete: bool, ctx: &PromptContext<'_>) -> PromptOutcome {
    if complete {
        if let Some(caps) = HOST_UNKNOWN.captures(line) {
            *state = SshState::HostUnknown {
                host: caps["host"].to_string(),
                fingerprint: None,
            };
            return PromptOutcome::Consumed;
        }
        if let SshState::HostUnknown { fingerprint, .. } = state
            && let Some(caps) = HOST_FINGERPRINT.captures(line)
        {
            *fingerprint = Some(caps["fingerprint"].to_string());
            return PromptOutcome::Consumed;
        }
    }

    if HOST_CONFIRM.is_match(line) {
        let (host, fingerprint) = match std::mem::take(state) {
            SshState::HostUnknown { host, fingerprint } => (host, fingerprint),
            SshState::Idle => (ctx.url.unwrap_or_default().to_string(), None),
        };
        let accepted = ctx.service.accept_ssh_host_key(&host, fingerprint.as_deref());
        info!("SSH host key for {host}: {}", if accepted { "accepted" } else { "rejected" });
        return PromptOutcome::answer(if accepted { "yes" } else { "no" });
    }

    if let Some(caps) = SSH_PASSPHRASE.captures(line) {
        let key = &caps["key"];
        let realm = ctx.url.unwrap_or(key);
        return match ctx
            .service
            .request_ssh_credentials(realm, SshCredentialMode::Passphrase, Some(key))
        {
            Some(passphrase) => PromptOutcome::secret(passphrase),
            None => PromptOutcome::Cancel(format!("Authentication canceled for SSH key {key}")),
        };
    }

    if let Some(caps) = SSH_PASSWORD.captures(line) {
        let realm = format!("{}@{}", &caps["user"], &caps["host"]);
        return match ctx
            .service
            .request_ssh_credentials(&realm, SshCredentialMode::Password, None)
        {
            Some(password) => PromptOutcome::secret(password),
            None => PromptOutcome::Cancel(format!("Authentication canceled for {realm}")),
        };
    }

    PromptOutcome::Ignored
}

fn credentials_step(
    state: &mut CredentialsState,
    line: &str,
    complete: bool,
    ctx: &PromptContext<'_>,
) -> PromptOutcome {
    if complete && let Some(caps) = REALM.captures(line) {
        *state = CredentialsState::Realm(caps["realm"].to_string());
        return PromptOutcome::Consumed;
    }

    if STORE_UNENCRYPTED.is_match(line) {
        return PromptOutcome::answer("no");
    }

    if USERNAME.is_match(line) {
        let realm = match std::mem::take(state) {
            CredentialsState::Realm(realm) => realm,
            _ => ctx.url.unwrap_or_default().to_string(),
        };
        return match ctx.service.request_credentials(ctx.url, CredentialKind::UsernamePassword) {
            Some(credentials) => {
                let username = credentials.username.clone();
                *state = CredentialsState::AwaitingPassword(credentials);
                PromptOutcome::answer(username)
            }
            None => PromptOutcome::Cancel(format!("Authentication canceled for realm: {realm}")),
        };
    }

    if let Some(caps) = PASSWORD.captures(line) {
        let user = &caps["user"];
        let password = match std::mem::take(state) {
            CredentialsState::AwaitingPassword(credentials) if credentials.username == user => {
                Some(credentials.password)
            }
            _ => ctx
                .service
                .request_credentials(ctx.url, CredentialKind::UsernamePassword)
                .map(|c| c.password),
        };
        return match password {
            Some(password) => PromptOutcome::secret(password),
            None => PromptOutcome::Cancel(format!("Authentication canceled for user {user}")),
        };
    }

    PromptOutcome::Ignored
}

fn client_certificate_step(
    state: &mut ClientCertificateState,
    line: &str,
    ctx: &PromptContext<'_>,
) -> PromptOutcome {
    if CLIENT_CERT_FILE.is_match(line) {
        return match ctx
            .service
            .request_credentials(ctx.url, CredentialKind::SslClientCertificate)
        {
            Some(credentials) => {
                let file = credentials.username.clone();
                *state = ClientCertificateState::AwaitingPassphrase(credentials);
                PromptOutcome::answer(file)
            }
            None => PromptOutcome::Cancel("Client certificate was not provided".to_string()),
        };
    }

    if let Some(caps) = CLIENT_CERT_PASSPHRASE.captures(line) {
        let file = &caps["file"];
        let passphrase = match std::mem::take(state) {
            ClientCertificateState::AwaitingPassphrase(credentials) => Some(credentials.password),
            ClientCertificateState::Idle => ctx
                .service
                .request_credentials(ctx.url, CredentialKind::SslClientPassphrase)
                .map(|c| c.password),
        };
        return match passphrase {
            Some(passphrase) => PromptOutcome::secret(passphrase),
            None => PromptOutcome::Cancel(format!("Passphrase for {file} was not provided")),
        };
    }

    PromptOutcome::Ignored
}

fn server_certificate_step(
    state: &mut ServerCertificateState,
    line: &str,
    complete: bool,
    ctx: &PromptContext<'_>,
) -> PromptOutcome {
    if CERT_QUESTION.is_match(line) {
        let (url, info) = match std::mem::take(state) {
            ServerCertificateState::Collecting { url, info } => (url, info),
            ServerCertificateState::Idle => (
                ctx.url.unwrap_or_default().to_string(),
                CertificateInfo::default(),
            ),
        };
        let answer = match ctx.service.accept_certificate(&url, &info) {
            AcceptResult::Reject => "r",
            AcceptResult::AcceptTemporarily => "t",
            AcceptResult::AcceptPermanently => "p",
        };
        info!("Server certificate for {url}: answered {answer}");
        return PromptOutcome::answer(answer);
    }

    if !complete {
        return PromptOutcome::Ignored;
    }

    if let Some(caps) = CERT_ERROR.captures(line) {
        *state = ServerCertificateState::Collecting {
            url: caps["url"].to_string(),
            info: CertificateInfo::default(),
        };
        return PromptOutcome::Consumed;
    }

    let ServerCertificateState::Collecting { info, .. } = state else {
        return PromptOutcome::Ignored;
    };

    if line.trim() == "Certificate information:" {
        return PromptOutcome::Consumed;
    }
    if let Some(caps) = CERT_VALID.captures(line) {
        info.valid_from = Some(caps["from"].to_string());
        info.valid_until = Some(caps["until"].to_string());
    } else if let Some(value) = line.strip_prefix(" - Hostname: ") {
        info.hostname = Some(value.trim().to_string());
    } else if let Some(value) = line.strip_prefix(" - Issuer: ") {
        info.issuer = Some(value.trim().to_string());
    } else if let Some(value) = line.strip_prefix(" - Fingerprint: ") {
        info.fingerprint = Some(value.trim().to_string());
    } else if let Some(problem) = line.strip_prefix(" - ") {
        info.problems.push(problem.trim().to_string());
    } else if line.starts_with(char::is_whitespace)
        && let Some(last) = info.problems.last_mut()
    {
        last.push(' ');
        last.push_str(line.trim());
    } else {
        debug!("Unexpected line inside certificate prompt: {line}");
    }
    PromptOutcome::Consumed
}

/// Prompt modules for one terminal run, in the order they are consulted.
pub struct PromptResponder {
    service: Arc<dyn AuthenticationService>,
    url: Option<String>,
    modules: Vec<PromptModule>,
}

impl PromptResponder {
    pub fn new(service: Arc<dyn AuthenticationService>, url: Option<String>) -> Self {
        Self {
            service,
            url,
            modules: vec![
                PromptModule::Ssh(SshState::default()),
                PromptModule::ClientCertificate(ClientCertificateState::default()),
                PromptModule::Credentials(CredentialsState::default()),
                PromptModule::ServerCertificate(ServerCertificateState::default()),
            ],
        }
    }

    /// Offer a line; `complete` is false for an unterminated tail.
    pub fn offer(&mut self, line: &str, complete: bool) -> PromptOutcome {
        let ctx = PromptContext {
            service: self.service.as_ref(),
            url: self.url.as_deref(),
        };
        for module in &mut self.modules {
            let outcome = module.step(line, complete, &ctx);
            if outcome != PromptOutcome::Ignored {
                return outcome;
            }
        }
        PromptOutcome::Ignored
    }
}
