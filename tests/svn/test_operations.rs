//! Operation helpers end to end against fake `svn` scripts.

#![cfg(unix)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use kodegen_tools_svn::operations::{CatOpts, CheckoutOpts, CommitOpts, StatusOpts, UpdateOpts};
use kodegen_tools_svn::parse::{EventAction, NodeKind, StatusType};
use kodegen_tools_svn::{CommandRuntime, SvnError, Target, cat, checkout, commit, info, status, update};

use super::support::{FakeSvn, RecordingService};

fn runtime(svn: &FakeSvn) -> CommandRuntime {
    CommandRuntime::new(svn.config(), Arc::new(RecordingService::denying()))
}

#[tokio::test]
async fn test_update_streams_events_and_returns_revision() {
    let svn = FakeSvn::new(
        r#"printf "Updating '.':\n"
printf "A       newfile.txt\n"
printf "U       src/main.c\n"
printf "Updated to revision 42.\n""#,
    );
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();

    let revision = update(&runtime(&svn), UpdateOpts::default(), move |event| {
        sink.lock().unwrap().push(event);
    })
    .await
    .unwrap();

    assert_eq!(revision, Some(42));
    let events = events.lock().unwrap();
    let actions: Vec<_> = events.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            EventAction::UpdateStarted,
            EventAction::UpdateAdd,
            EventAction::UpdateUpdate,
            EventAction::UpdateCompleted,
        ]
    );
    assert_eq!(events[1].file, svn.path("newfile.txt"));
    assert!(svn.invocations()[0].starts_with("update --accept=postpone"));
}

#[tokio::test]
async fn test_commit_passes_message_file_and_reports_revision() {
    // Relative paths land in the fake's directory, the configured working directory
    let svn = FakeSvn::new(
        r#"while [ $# -gt 0 ]; do
  if [ "$1" = "-F" ]; then cp "$2" MESSAGE_COPY; printf '%s' "$2" > MESSAGE_PATH; fi
  shift
done
printf "Sending        a.txt\n"
printf "Transmitting file data .done\n"
printf "Committing transaction...\n"
printf "Committed revision 7.\n""#,
    );
    let copy = svn.path("MESSAGE_COPY");
    let recorded_path = svn.path("MESSAGE_PATH");
    let opts = CommitOpts::new(vec![svn.path("a.txt")], "Fix the build\n\nDetails");

    let outcome = commit(&runtime(&svn), opts).await.unwrap();

    assert_eq!(outcome.revision, Some(7));
    assert_eq!(outcome.committed, vec![svn.path("a.txt")]);
    assert_eq!(std::fs::read_to_string(&copy).unwrap(), "Fix the build\n\nDetails");
    let temp = PathBuf::from(std::fs::read_to_string(&recorded_path).unwrap());
    assert!(!temp.exists(), "message temp file was not removed");
}

#[tokio::test]
async fn test_commit_without_paths_is_rejected() {
    let svn = FakeSvn::new("exit 0");
    let err = commit(&runtime(&svn), CommitOpts::new(Vec::new(), "msg"))
        .await
        .unwrap_err();
    assert!(matches!(err, SvnError::InvalidInput(_)));
    assert!(svn.invocations().is_empty());
}

#[tokio::test]
async fn test_info_parses_xml() {
    let svn = FakeSvn::new(
        r#"cat <<'XML'
<?xml version="1.0" encoding="UTF-8"?>
<info>
<entry kind="dir" path="." revision="9">
<url>https://svn.example.com/repo/trunk</url>
</entry>
</info>
XML"#,
    );

    let entries = info(&runtime(&svn), Target::url("https://svn.example.com/repo/trunk"))
        .await
        .unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, NodeKind::Dir);
    assert_eq!(entries[0].revision, Some(9));
    assert!(svn.invocations()[0].starts_with("info --xml"));
}

#[tokio::test]
async fn test_status_parses_xml() {
    let svn = FakeSvn::new(
        r#"cat <<'XML'
<?xml version="1.0" encoding="UTF-8"?>
<status>
<target path=".">
<entry path="a.txt"><wc-status item="modified" props="none" revision="3"/></entry>
<entry path="b.txt"><wc-status item="unversioned" props="none"/></entry>
</target>
</status>
XML"#,
    );
    let opts = StatusOpts {
        verbose: true,
        ..StatusOpts::default()
    };

    let report = status(&runtime(&svn), opts).await.unwrap();

    assert_eq!(report.against_revision, None);
    let statuses: Vec<_> = report.entries.iter().map(|e| e.content_status).collect();
    assert_eq!(statuses, vec![StatusType::Modified, StatusType::Unversioned]);
    assert_eq!(report.entries[0].file, svn.path("a.txt"));
    assert!(svn.invocations()[0].contains("-v"));
}

#[tokio::test]
async fn test_cat_keeps_raw_bytes() {
    let svn = FakeSvn::new(r"printf 'a\000b\r\nc'");

    let bytes = cat(
        &runtime(&svn),
        CatOpts::new(Target::url("https://svn.example.com/repo/trunk/blob.bin")),
    )
    .await
    .unwrap();

    assert_eq!(bytes, b"a\0b\r\nc".to_vec());
}

#[tokio::test]
async fn test_checkout_requires_absolute_destination() {
    let svn = FakeSvn::new("exit 0");
    let opts = CheckoutOpts::new("https://svn.example.com/repo/trunk", "relative/dir");
    let err = checkout(&runtime(&svn), opts, |_| {}).await.unwrap_err();
    assert!(matches!(err, SvnError::InvalidInput(_)));
}

#[tokio::test]
async fn test_checkout_reports_revision() {
    let svn = FakeSvn::new(
        r#"printf "A    project/README\n"
printf "Checked out revision 100.\n""#,
    );
    let destination = svn.path("project");
    let opts = CheckoutOpts::new("https://svn.example.com/repo/trunk", &destination);

    let revision = checkout(&runtime(&svn), opts, |_| {}).await.unwrap();

    assert_eq!(revision, Some(100));
    let argv = &svn.invocations()[0];
    assert!(argv.starts_with("checkout https://svn.example.com/repo/trunk"));
    assert!(argv.contains(&destination.display().to_string()));
}
