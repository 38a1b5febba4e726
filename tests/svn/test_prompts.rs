//! Terminal prompt answering without a process.

use std::sync::Arc;

use kodegen_tools_svn::execution::prompts::{PromptOutcome, PromptResponder};
use kodegen_tools_svn::{CredentialKind, Credentials};

use super::support::RecordingService;

fn answer(text: &str) -> PromptOutcome {
    PromptOutcome::Answer {
        text: text.to_string(),
        secret: false,
    }
}

fn secret(text: &str) -> PromptOutcome {
    PromptOutcome::Answer {
        text: text.to_string(),
        secret: true,
    }
}

fn responder(service: RecordingService) -> (PromptResponder, Arc<RecordingService>) {
    let service = Arc::new(service);
    let prompts = PromptResponder::new(service.clone(), Some("svn+ssh://svn.example.com/repo".to_string()));
    (prompts, service)
}

#[test]
fn test_ssh_password_prompt() {
    let (mut prompts, _) = responder(RecordingService::granting("me", "hunter2"));
    assert_eq!(prompts.offer("me@svn.example.com's password: ", false), secret("hunter2"));
}

#[test]
fn test_ssh_passphrase_denied_cancels_run() {
    let (mut prompts, _) = responder(RecordingService::denying());
    match prompts.offer("Enter passphrase for key '/home/me/.ssh/id_ed25519': ", false) {
        PromptOutcome::Cancel(reason) => assert!(reason.contains("id_ed25519")),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_unknown_host_key_is_rejected_by_default() {
    let (mut prompts, _) = responder(RecordingService::denying());
    assert_eq!(
        prompts.offer("The authenticity of host 'svn.example.com (10.1.1.1)' can't be established.", true),
        PromptOutcome::Consumed
    );
    assert_eq!(
        prompts.offer("Are you sure you want to continue connecting (yes/no)? ", false),
        answer("no")
    );
}

#[test]
fn test_client_certificate_then_passphrase() {
    let (mut prompts, service) = responder(RecordingService::granting("/home/me/client.p12", "pfx-pass"));
    assert_eq!(prompts.offer("Client certificate filename: ", false), answer("/home/me/client.p12"));
    assert_eq!(
        prompts.offer("Passphrase for '/home/me/client.p12': ", false),
        secret("pfx-pass")
    );
    assert_eq!(
        *service.requests.lock().unwrap(),
        vec![CredentialKind::SslClientCertificate]
    );
}

#[test]
fn test_realm_username_password_store_sequence() {
    let (mut prompts, service) = responder(RecordingService {
        credentials: Some(Credentials::new("alice", "s3cret")),
        ..RecordingService::default()
    });
    assert_eq!(
        prompts.offer("Authentication realm: <https://svn.example.com:443> Subversion", true),
        PromptOutcome::Consumed
    );
    assert_eq!(prompts.offer("Username: ", false), answer("alice"));
    assert_eq!(prompts.offer("Password for 'alice': ", false), secret("s3cret"));
    assert_eq!(prompts.offer("Store password unencrypted (yes/no)? ", false), answer("no"));
    // The password came from the same answer as the username
    assert_eq!(service.request_count(), 1);
}

#[test]
fn test_ordinary_output_is_not_claimed() {
    let (mut prompts, _) = responder(RecordingService::granting("u", "p"));
    for line in ["U    trunk/a.txt", "Updated to revision 5.", "svn: E155004: Working copy locked"] {
        assert_eq!(prompts.offer(line, true), PromptOutcome::Ignored, "{line}");
    }
}
