use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use super::LineConverter;
use super::event::{EventAction, ProgressEvent, resolve};

static COMMIT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(Sending|Adding|Deleting|Replacing)(?: copy of)?\s+(?:\(bin\)\s+)?(.+)$")
        .unwrap_or_else(|e| panic!("invalid commit line regex: {e}"))
});
static COMMITTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Committed revision (\d+)\.$")
        .unwrap_or_else(|e| panic!("invalid committed regex: {e}"))
});

/// Progress converter for `commit` and `import` output.
#[derive(Debug)]
pub struct CommitOutputLineConverter {
    base: PathBuf,
}

impl CommitOutputLineConverter {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn convert(&self, line: &str) -> Option<ProgressEvent> {
        let line = line.trim_end();
        if let Some(caps) = COMMITTED.captures(line) {
            let revision = caps[1].parse::<i64>().ok()?;
            return Some(
                ProgressEvent::new(self.base.clone(), ".", EventAction::CommitCompleted)
                    .with_revision(revision),
            );
        }

        let caps = COMMIT_LINE.captures(line)?;
        let action = match &caps[1] {
            "Sending" => EventAction::CommitModified,
            "Adding" => EventAction::CommitAdded,
            "Deleting" => EventAction::CommitDeleted,
            _ => EventAction::CommitReplaced,
        };
        let path = caps[2].trim();
        Some(ProgressEvent::new(resolve(&self.base, path), path, action))
    }
}

impl LineConverter for CommitOutputLineConverter {
    fn convert(&mut self, line: &str) -> Option<ProgressEvent> {
        CommitOutputLineConverter::convert(self, line)
    }
}
