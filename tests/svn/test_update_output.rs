//! Update, checkout and commit progress conversion.

use std::path::{Path, PathBuf};

use kodegen_tools_svn::parse::{
    CommitOutputLineConverter, EventAction, StatusType, UpdateOutputLineConverter,
};

#[test]
fn test_update_banner_pair() {
    let mut converter = UpdateOutputLineConverter::new("/wc");

    let started = converter.convert("Updating '.':").unwrap();
    assert_eq!(started.action, EventAction::UpdateStarted);
    assert_eq!(started.path, ".");
    assert_eq!(started.file, PathBuf::from("/wc"));
    assert_eq!(converter.current_root(), Some(Path::new("/wc")));

    let done = converter.convert("Updated to revision 42.").unwrap();
    assert_eq!(done.action, EventAction::UpdateCompleted);
    assert_eq!(done.path, ".");
    assert_eq!(done.revision, Some(42));
    assert!(converter.is_idle());
}

#[test]
fn test_added_file_line() {
    let mut converter = UpdateOutputLineConverter::new("/wc");
    let event = converter.convert("A       newfile.txt").unwrap();
    assert_eq!(event.action, EventAction::UpdateAdd);
    assert_eq!(event.content_status, StatusType::Added);
    assert_eq!(event.file, PathBuf::from("/wc/newfile.txt"));
    assert!(!event.tree_conflicted);
}

#[test]
fn test_nested_external_roots() {
    let mut converter = UpdateOutputLineConverter::new("/wc");
    let lines = [
        "Updating '.':",
        "U    src/a.c",
        "",
        "Fetching external item into 'vendor/lib':",
        "A    vendor/lib/x.h",
        "Updated external to revision 7.",
        "",
        "Updated to revision 42.",
    ];
    let events: Vec<_> = lines.iter().filter_map(|l| converter.convert(l)).collect();

    let completions: Vec<_> = events
        .iter()
        .filter(|e| e.action == EventAction::UpdateCompleted)
        .map(|e| (e.path.as_str(), e.revision))
        .collect();
    assert_eq!(completions, vec![("vendor/lib", Some(7)), (".", Some(42))]);
    assert!(events.iter().any(|e| e.action == EventAction::UpdateExternal));
    assert!(converter.is_idle());
}

#[test]
fn test_skipped_reason_becomes_error() {
    let mut converter = UpdateOutputLineConverter::new("/wc");
    let event = converter
        .convert("Skipped 'docs/a.txt' -- Node remains in conflict")
        .unwrap();
    assert_eq!(event.action, EventAction::Skip);
    assert_eq!(event.error.as_deref(), Some("Node remains in conflict"));
    assert!(converter.is_idle());
}

#[test]
fn test_conflict_summary_is_ignored() {
    let mut converter = UpdateOutputLineConverter::new("/wc");
    assert!(converter.convert("Summary of conflicts:").is_none());
    assert!(converter.convert("  Text conflicts: 1").is_none());
    assert!(converter.convert("--- Merging r5 through r6 into '.':").is_none());
}

#[test]
fn test_checkout_completion() {
    let mut converter = UpdateOutputLineConverter::new("/work");
    let event = converter.convert("A    project/README").unwrap();
    assert_eq!(event.file, PathBuf::from("/work/project/README"));
    let done = converter.convert("Checked out revision 100.").unwrap();
    assert_eq!(done.revision, Some(100));
}

#[test]
fn test_commit_output() {
    let converter = CommitOutputLineConverter::new("/wc");
    let sent = converter.convert("Sending        src/main.c").unwrap();
    assert_eq!(sent.action, EventAction::CommitModified);
    assert_eq!(sent.file, PathBuf::from("/wc/src/main.c"));
    assert!(converter.convert("Transmitting file data .done").is_none());
    let done = converter.convert("Committed revision 12.").unwrap();
    assert_eq!(done.action, EventAction::CommitCompleted);
    assert_eq!(done.revision, Some(12));
}
