//! Retry loop and process handling, driven through fake `svn` scripts.

#![cfg(unix)]

use std::sync::Arc;
use std::time::Duration;

use kodegen_tools_svn::{
    AuthCategory, Command, CommandRuntime, CredentialKind, ErrorCode, SvnCommandName, SvnError,
    Target,
};
use tokio_util::sync::CancellationToken;

use super::support::{FakeSvn, RecordingService, init_logging};

const REPO: &str = "https://svn.example.com/repo/trunk";

const FAIL_UNTIL_USERNAME: &str = r#"case " $* " in
  *" --username "*) echo "r1"; exit 0 ;;
esac
echo "svn: E170001: Authentication failed" >&2
exit 1"#;

fn list_command() -> Command {
    Command::new(SvnCommandName::List).target(Target::url(REPO))
}

#[tokio::test]
async fn test_authentication_failure_retries_with_credentials() {
    init_logging();
    let svn = FakeSvn::new(FAIL_UNTIL_USERNAME);
    let service = Arc::new(RecordingService::granting("u", "p"));
    let runtime = CommandRuntime::new(svn.config(), service.clone());

    let result = runtime.run(list_command()).await.unwrap();

    assert!(result.is_success());
    assert_eq!(result.stdout.trim(), "r1");
    let runs = svn.invocations();
    assert_eq!(runs.len(), 2);
    assert!(!runs[0].contains("--username"));
    assert!(runs[1].contains("--username u --password p"));
    assert!(!runs[1].contains("--config-option"));
    assert!(runs[1].ends_with("--non-interactive"));
    assert_eq!(*service.requests.lock().unwrap(), vec![CredentialKind::UsernamePassword]);
    assert_eq!(service.reset_count(), 1);
}

#[tokio::test]
async fn test_denied_credentials_fail_after_one_run() {
    let svn = FakeSvn::new(FAIL_UNTIL_USERNAME);
    let service = Arc::new(RecordingService::denying());
    let runtime = CommandRuntime::new(svn.config(), service.clone());

    let err = runtime.run(list_command()).await.unwrap_err();

    match &err {
        SvnError::CredentialsDenied { category, .. } => {
            assert_eq!(*category, AuthCategory::UsernamePassword);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.contains(ErrorCode::RA_NOT_AUTHORIZED));
    assert_eq!(svn.invocations().len(), 1);
    assert_eq!(service.request_count(), 1);
    assert_eq!(service.reset_count(), 1);
}

#[tokio::test]
async fn test_identical_rejected_credentials_stop_the_loop() {
    let svn = FakeSvn::new(
        r#"echo "svn: E170001: Authentication failed" >&2
exit 1"#,
    );
    let service = Arc::new(RecordingService::granting("u", "wrong"));
    let runtime = CommandRuntime::new(svn.config(), service.clone());

    let err = runtime.run(list_command()).await.unwrap_err();

    assert!(matches!(err, SvnError::CredentialsDenied { .. }));
    assert_eq!(svn.invocations().len(), 2);
    // The second request follows a rejection, so the cached answer is cleared first
    assert_eq!(*service.cleared.lock().unwrap(), vec![CredentialKind::UsernamePassword]);
}

#[tokio::test]
async fn test_attempt_cap_is_honoured() {
    let svn = FakeSvn::new(
        r#"echo "svn: E170001: Authentication failed" >&2
exit 1"#,
    );
    let service = Arc::new(RecordingService::granting("u", "p"));
    let runtime = CommandRuntime::new(svn.config().with_max_auth_attempts(1), service);

    let err = runtime.run(list_command()).await.unwrap_err();

    assert!(matches!(err, SvnError::RetryLimitExceeded(1)));
    assert_eq!(svn.invocations().len(), 1);
}

#[tokio::test]
async fn test_server_unavailable_is_fatal_without_retry() {
    let svn = FakeSvn::new(
        r#"echo "svn: E170013: Unable to connect to a repository at URL 'https://svn.example.com/repo/trunk'" >&2
echo "svn: E000111: Can't connect to host 'svn.example.com': Connection refused" >&2
exit 1"#,
    );
    let service = Arc::new(RecordingService::granting("u", "p"));
    let runtime = CommandRuntime::new(svn.config(), service.clone());

    let err = runtime.run(list_command()).await.unwrap_err();

    match &err {
        SvnError::ServerUnavailable { reason, codes } => {
            assert!(reason.contains("Connection refused"), "reason: {reason}");
            assert!(codes.contains(&ErrorCode::RA_CANNOT_CREATE_SESSION));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(svn.invocations().len(), 1);
    assert_eq!(service.request_count(), 0);
}

#[tokio::test]
async fn test_generic_failure_keeps_error_codes() {
    let svn = FakeSvn::new(
        r#"echo "svn: E155007: '/tmp/nowhere' is not a working copy" >&2
exit 1"#,
    );
    let runtime = CommandRuntime::new(svn.config(), Arc::new(RecordingService::denying()));

    let err = runtime
        .run(Command::new(SvnCommandName::Status).target(Target::path("/tmp/nowhere")))
        .await
        .unwrap_err();

    assert!(matches!(err, SvnError::Command { .. }));
    assert!(err.contains(ErrorCode::WC_NOT_WORKING_COPY));
}

#[tokio::test]
async fn test_nonzero_exit_without_stderr() {
    let svn = FakeSvn::new("exit 3");
    let runtime = CommandRuntime::new(svn.config(), Arc::new(RecordingService::denying()));

    let err = runtime.run(list_command()).await.unwrap_err();

    assert!(matches!(err, SvnError::ExitCode(3)));
    assert_eq!(err.to_string(), "Svn process exited with error code: 3");
}

#[tokio::test]
async fn test_warning_on_success_is_not_an_error() {
    let svn = FakeSvn::new(
        r#"echo "svn: warning: W155010: The node 'x' was not found." >&2
exit 0"#,
    );
    let runtime = CommandRuntime::new(svn.config(), Arc::new(RecordingService::denying()));

    let result = runtime.run(list_command()).await.unwrap();

    assert_eq!(result.exit_code, Some(0));
    assert!(result.has_stderr());
}

#[tokio::test]
async fn test_hard_timeout() {
    let svn = FakeSvn::new("exec sleep 5");
    let config = svn.config().with_timeout(Duration::from_millis(200));
    let runtime = CommandRuntime::new(config, Arc::new(RecordingService::denying()));

    let err = runtime.run(list_command()).await.unwrap_err();

    assert!(matches!(err, SvnError::Timeout(_)), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_cancellation_stops_the_process_without_error() {
    let svn = FakeSvn::new("exec sleep 5");
    let runtime = CommandRuntime::new(svn.config(), Arc::new(RecordingService::denying()));
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let result = runtime
        .run(list_command().cancellation(token))
        .await
        .unwrap();

    assert!(result.manually_destroyed);
    assert!(!result.is_success());
    assert_eq!(svn.invocations().len(), 1);
}

#[tokio::test]
async fn test_missing_executable_is_process_start_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = kodegen_tools_svn::SvnConfig::new()
        .with_executable(dir.path().join("no-such-svn"))
        .with_working_directory(dir.path());
    let runtime = CommandRuntime::new(config, Arc::new(RecordingService::denying()));

    let err = runtime.run(list_command()).await.unwrap_err();

    assert!(matches!(err, SvnError::ProcessStart { .. }));
}

#[tokio::test]
async fn test_destroyed_update_cleans_up_the_working_copy() {
    let svn = FakeSvn::new(
        r#"case "$1" in
  cleanup) exit 0 ;;
esac
exec sleep 5"#,
    );
    let wc = svn.path("wc");
    std::fs::create_dir_all(wc.join(".svn")).unwrap();
    let config = svn.config().with_url_mapping(&wc, REPO);
    let runtime = CommandRuntime::new(config, Arc::new(RecordingService::denying()));
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let result = runtime
        .run(
            Command::new(SvnCommandName::Update)
                .target(Target::path(&wc))
                .cancellation(token),
        )
        .await
        .unwrap();

    assert!(result.manually_destroyed);
    let runs = svn.invocations();
    assert_eq!(runs.len(), 2, "runs: {runs:?}");
    assert!(runs[0].starts_with("update "));
    assert!(runs[1].starts_with("cleanup "));
    assert!(runs[1].contains(&wc.display().to_string()));
}

#[tokio::test]
async fn test_terminal_prompt_cancel_surfaces_reason() {
    init_logging();
    let svn = FakeSvn::new(
        r#"printf 'Username: '
read u
echo "unreachable $u""#,
    );
    let config = svn.config().with_terminal(true);
    let runtime = CommandRuntime::new(config, Arc::new(RecordingService::denying()));

    let err = runtime.run(list_command()).await.unwrap_err();

    match &err {
        SvnError::Destroyed(reason) => {
            assert!(reason.contains("Authentication canceled"), "reason: {reason}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(svn.invocations().len(), 1);
}

#[tokio::test]
async fn test_terminal_answers_prompts_without_leaking_the_password() {
    let svn = FakeSvn::new(
        r#"printf 'Username: '
read u
printf "Password for '%s': " "$u"
read p
echo "authenticated $u""#,
    );
    let config = svn.config().with_terminal(true);
    let service = Arc::new(RecordingService::granting("alice", "s3cret"));
    let runtime = CommandRuntime::new(config, service);

    let result = runtime.run(list_command()).await.unwrap();

    assert!(result.is_success());
    assert_eq!(result.stdout, "authenticated alice\n");
    assert!(!result.stdout.contains("s3cret"));
}

#[tokio::test]
async fn test_terminal_authentication_failure_retries_with_credentials() {
    let svn = FakeSvn::new(FAIL_UNTIL_USERNAME);
    let config = svn.config().with_terminal(true);
    let service = Arc::new(RecordingService::granting("u", "p"));
    let runtime = CommandRuntime::new(config, service.clone());

    let result = runtime.run(list_command()).await.unwrap();

    assert!(result.is_success());
    let runs = svn.invocations();
    assert_eq!(runs.len(), 2);
    assert!(!runs[0].contains("--username"));
    assert!(runs[1].contains("--username u --password p --no-auth-cache"));
    assert!(!runs[1].contains("--non-interactive"));
    assert_eq!(*service.requests.lock().unwrap(), vec![CredentialKind::UsernamePassword]);
}

#[tokio::test]
async fn test_crashed_service_is_an_io_error() {
    let svn = FakeSvn::new(FAIL_UNTIL_USERNAME);
    let service = Arc::new(RecordingService::crashing());
    let runtime = CommandRuntime::new(svn.config(), service.clone());

    let err = runtime.run(list_command()).await.unwrap_err();

    assert!(matches!(err, SvnError::Io(_)), "unexpected error: {err:?}");
    assert_eq!(svn.invocations().len(), 1);
    assert_eq!(service.reset_count(), 1);
}
