use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::trace;
use regex::Regex;

use super::LineConverter;
use super::event::{EventAction, ProgressEvent, StatusType, resolve};

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid update output regex {pattern}: {e}"))
}

static UPDATING: LazyLock<Regex> = LazyLock::new(|| compile(r"^Updating '(.+)':$"));
static FETCHING_EXTERNAL: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^Fetching external item into '(.+)':$"));
static RESTORED: LazyLock<Regex> = LazyLock::new(|| compile(r"^Restored '(.+)'$"));
static SKIPPED: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^Skipped(?: missing target:)? '(.+?)'(?: -- (.+))?$")
});
static COMPLETED: LazyLock<Regex> = LazyLock::new(|| {
    compile(concat!(
        r"^(?:At revision|Updated to revision|External at revision|Updated external to revision",
        r"|Checked out revision|Checked out external at revision",
        r"|Exported revision|Exported external at revision) (\d+)\.$",
    ))
});
static STATUS_LINE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^([ADUCGERM ])([UCGM ])([B ])([C ])\s+(.+)$"));

/// Lines that carry no per-file information.
fn is_banner(line: &str) -> bool {
    line.starts_with("--- ")
        || line.starts_with("Summary of conflicts:")
        || line.starts_with("  Text conflicts:")
        || line.starts_with("  Property conflicts:")
        || line.starts_with("  Tree conflicts:")
        || line.starts_with("  Skipped paths:")
        || line.starts_with("Checking out ")
}

/// Progress converter for update, checkout, switch and export output.
///
/// Keeps a stack of roots being updated: external definitions open a
/// nested root with `Fetching external item into '...'` and close it with
/// their own completion line.
#[derive(Debug)]
pub struct UpdateOutputLineConverter {
    base: PathBuf,
    roots: Vec<(String, PathBuf)>,
}

impl UpdateOutputLineConverter {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            roots: Vec::new(),
        }
    }

    pub fn current_root(&self) -> Option<&Path> {
        self.roots.last().map(|(_, root)| root.as_path())
    }

    /// No root is open.
    pub fn is_idle(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn convert(&mut self, line: &str) -> Option<ProgressEvent> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() || is_banner(line) {
            return None;
        }

        if let Some(caps) = UPDATING.captures(line) {
            return Some(self.push_root(&caps[1], EventAction::UpdateStarted));
        }
        if let Some(caps) = FETCHING_EXTERNAL.captures(line) {
            return Some(self.push_root(&caps[1], EventAction::UpdateExternal));
        }
        if let Some(caps) = RESTORED.captures(line) {
            let path = &caps[1];
            return Some(ProgressEvent::new(resolve(&self.base, path), path, EventAction::Restore));
        }
        if let Some(caps) = SKIPPED.captures(line) {
            let path = &caps[1];
            let reason = caps.get(2).map(|m| m.as_str().to_string());
            return Some(
                ProgressEvent::new(resolve(&self.base, path), path, EventAction::Skip)
                    .with_error(reason),
            );
        }
        if let Some(caps) = COMPLETED.captures(line) {
            let revision = caps[1].parse::<i64>().ok()?;
            let (path, file) = self
                .roots
                .pop()
                .unwrap_or_else(|| (".".to_string(), self.base.clone()));
            return Some(
                ProgressEvent::new(file, path, EventAction::UpdateCompleted).with_revision(revision),
            );
        }
        if let Some(caps) = STATUS_LINE.captures(line) {
            return Some(self.file_event(&caps));
        }

        trace!("Unrecognised update output: {line}");
        None
    }

    fn push_root(&mut self, path: &str, action: EventAction) -> ProgressEvent {
        let file = resolve(&self.base, path);
        self.roots.push((path.to_string(), file.clone()));
        ProgressEvent::new(file, path, action)
    }

    fn file_event(&self, caps: &regex::Captures<'_>) -> ProgressEvent {
        let column = |i: usize| caps[i].chars().next().unwrap_or(' ');
        let content = column(1);
        let tree_conflicted = column(4) == 'C';
        let action = if tree_conflicted {
            EventAction::TreeConflict
        } else {
            match content {
                'A' => EventAction::UpdateAdd,
                'D' => EventAction::UpdateDelete,
                'R' => EventAction::UpdateReplace,
                'E' => EventAction::UpdateExisted,
                _ => EventAction::UpdateUpdate,
            }
        };

        let path = caps[5].trim();
        let mut event = ProgressEvent::new(resolve(&self.base, path), path, action);
        event.content_status = StatusType::from_update_column(content);
        event.property_status = StatusType::from_update_column(column(2));
        event.lock_broken = column(3) == 'B';
        event.tree_conflicted = tree_conflicted;
        event
    }
}

impl LineConverter for UpdateOutputLineConverter {
    fn convert(&mut self, line: &str) -> Option<ProgressEvent> {
        UpdateOutputLineConverter::convert(self, line)
    }
}
