//! Shared fixtures: a recording authentication service and fake `svn` scripts.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use kodegen_tools_svn::{
    AcceptResult, AuthenticationService, CertificateInfo, CredentialKind, Credentials,
    SshCredentialMode, SvnConfig,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Service that hands out fixed answers and records every request.
#[derive(Default)]
pub struct RecordingService {
    pub credentials: Option<Credentials>,
    pub accept_certificates: bool,
    pub panic_on_request: bool,
    pub requests: Mutex<Vec<CredentialKind>>,
    pub cleared: Mutex<Vec<CredentialKind>>,
    pub resets: AtomicUsize,
}

impl RecordingService {
    pub fn granting(username: &str, password: &str) -> Self {
        Self {
            credentials: Some(Credentials::new(username, password)),
            ..Self::default()
        }
    }

    pub fn denying() -> Self {
        Self::default()
    }

    /// A service whose credential prompt blows up.
    pub fn crashing() -> Self {
        Self {
            panic_on_request: true,
            ..Self::default()
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn reset_count(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

impl AuthenticationService for RecordingService {
    fn request_credentials(&self, _url: Option<&str>, kind: CredentialKind) -> Option<Credentials> {
        if self.panic_on_request {
            panic!("credential prompt crashed");
        }
        self.requests.lock().unwrap().push(kind);
        self.credentials.clone()
    }

    fn request_ssh_credentials(
        &self,
        _realm: &str,
        _mode: SshCredentialMode,
        _key: Option<&str>,
    ) -> Option<String> {
        self.credentials.as_ref().map(|c| c.password.clone())
    }

    fn accept_ssl_server_certificate(&self, _url: Option<&str>) -> bool {
        self.accept_certificates
    }

    fn accept_certificate(&self, _url: &str, _info: &CertificateInfo) -> AcceptResult {
        if self.accept_certificates {
            AcceptResult::AcceptTemporarily
        } else {
            AcceptResult::Reject
        }
    }

    fn proxy_authentication(&self, _url: Option<&str>) -> Option<Credentials> {
        self.requests.lock().unwrap().push(CredentialKind::Proxy);
        self.credentials.clone()
    }

    fn have_data_for_tmp_config(&self) -> bool {
        false
    }

    fn special_config_dir(&self) -> Option<PathBuf> {
        None
    }

    fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn clear_credentials(&self, _url: Option<&str>, kind: CredentialKind) {
        self.cleared.lock().unwrap().push(kind);
    }
}

/// A stand-in `svn` executable: a `/bin/sh` script that appends its argv
/// to `argv.log` before running `body`.
#[cfg(unix)]
pub struct FakeSvn {
    pub dir: tempfile::TempDir,
    pub executable: PathBuf,
}

#[cfg(unix)]
impl FakeSvn {
    pub fn new(body: &str) -> Self {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let executable = dir.path().join("svn");
        let log = dir.path().join("argv.log");
        let script = format!(
            "#!/bin/sh\nprintf '%s\\n' \"$*\" >> '{}'\n{body}\n",
            log.display()
        );
        std::fs::write(&executable, script).unwrap();
        std::fs::set_permissions(&executable, std::fs::Permissions::from_mode(0o755)).unwrap();
        Self { dir, executable }
    }

    /// One entry per process run.
    pub fn invocations(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join("argv.log"))
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn config(&self) -> SvnConfig {
        SvnConfig::new()
            .with_executable(&self.executable)
            .with_poll_interval(Duration::from_millis(20))
            .with_working_directory(self.dir.path())
    }
}
