use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Item or property state reported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusType {
    #[default]
    None,
    Normal,
    Added,
    Deleted,
    Modified,
    Replaced,
    Conflicted,
    Merged,
    /// `U` in update output
    Changed,
    /// `E` in update output: an obstruction that already existed
    Existed,
    Missing,
    Unversioned,
    Ignored,
    External,
    Incomplete,
    Obstructed,
}

impl StatusType {
    /// Value of an `item` or `props` attribute in `status --xml`.
    pub fn from_xml(value: &str) -> Self {
        match value {
            "normal" => StatusType::Normal,
            "added" => StatusType::Added,
            "deleted" => StatusType::Deleted,
            "modified" => StatusType::Modified,
            "replaced" => StatusType::Replaced,
            "conflicted" => StatusType::Conflicted,
            "merged" => StatusType::Merged,
            "missing" => StatusType::Missing,
            "unversioned" => StatusType::Unversioned,
            "ignored" => StatusType::Ignored,
            "external" => StatusType::External,
            "incomplete" => StatusType::Incomplete,
            "obstructed" => StatusType::Obstructed,
            _ => StatusType::None,
        }
    }

    /// A status column of update/checkout output.
    pub fn from_update_column(column: char) -> Self {
        match column {
            'A' => StatusType::Added,
            'D' => StatusType::Deleted,
            'U' => StatusType::Changed,
            'C' => StatusType::Conflicted,
            'G' => StatusType::Merged,
            'E' => StatusType::Existed,
            'R' => StatusType::Replaced,
            'M' => StatusType::Modified,
            _ => StatusType::None,
        }
    }
}

/// What a progress event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    UpdateStarted,
    UpdateExternal,
    UpdateAdd,
    UpdateDelete,
    UpdateUpdate,
    UpdateReplace,
    UpdateExisted,
    TreeConflict,
    Restore,
    Skip,
    UpdateCompleted,
    CommitModified,
    CommitAdded,
    CommitDeleted,
    CommitReplaced,
    CommitCompleted,
}

/// One recognised line of progress output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Path resolved against the directory the command ran in
    pub file: PathBuf,
    /// Path as the client printed it
    pub path: String,
    pub revision: Option<i64>,
    pub content_status: StatusType,
    pub property_status: StatusType,
    pub lock_broken: bool,
    pub tree_conflicted: bool,
    pub action: EventAction,
    pub error: Option<String>,
}

impl ProgressEvent {
    pub(crate) fn new(file: PathBuf, path: impl Into<String>, action: EventAction) -> Self {
        Self {
            file,
            path: path.into(),
            revision: None,
            content_status: StatusType::None,
            property_status: StatusType::None,
            lock_broken: false,
            tree_conflicted: false,
            action,
            error: None,
        }
    }

    pub(crate) fn with_revision(mut self, revision: i64) -> Self {
        self.revision = Some(revision);
        self
    }

    pub(crate) fn with_error(mut self, error: Option<String>) -> Self {
        self.error = error;
        self
    }
}

/// Resolve a printed path against `base`; `.` is `base` itself.
pub(crate) fn resolve(base: &Path, printed: &str) -> PathBuf {
    if printed == "." {
        base.to_path_buf()
    } else {
        base.join(printed)
    }
}
