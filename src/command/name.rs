use std::fmt;

use serde::{Deserialize, Serialize};

/// Subcommands the runtime knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SvnCommandName {
    Version,
    Add,
    Blame,
    Cat,
    Checkout,
    Cleanup,
    Commit,
    Copy,
    Delete,
    Diff,
    Export,
    Import,
    Info,
    List,
    Lock,
    Log,
    Merge,
    Mkdir,
    Move,
    PropDel,
    PropGet,
    PropList,
    PropSet,
    Relocate,
    Resolve,
    Revert,
    Status,
    Switch,
    Unlock,
    Update,
    Upgrade,
}

impl SvnCommandName {
    pub const fn as_str(self) -> &'static str {
        match self {
            SvnCommandName::Version => "--version",
            SvnCommandName::Add => "add",
            SvnCommandName::Blame => "blame",
            SvnCommandName::Cat => "cat",
            SvnCommandName::Checkout => "checkout",
            SvnCommandName::Cleanup => "cleanup",
            SvnCommandName::Commit => "commit",
            SvnCommandName::Copy => "copy",
            SvnCommandName::Delete => "delete",
            SvnCommandName::Diff => "diff",
            SvnCommandName::Export => "export",
            SvnCommandName::Import => "import",
            SvnCommandName::Info => "info",
            SvnCommandName::List => "list",
            SvnCommandName::Lock => "lock",
            SvnCommandName::Log => "log",
            SvnCommandName::Merge => "merge",
            SvnCommandName::Mkdir => "mkdir",
            SvnCommandName::Move => "move",
            SvnCommandName::PropDel => "propdel",
            SvnCommandName::PropGet => "propget",
            SvnCommandName::PropList => "proplist",
            SvnCommandName::PropSet => "propset",
            SvnCommandName::Relocate => "relocate",
            SvnCommandName::Resolve => "resolve",
            SvnCommandName::Revert => "revert",
            SvnCommandName::Status => "status",
            SvnCommandName::Switch => "switch",
            SvnCommandName::Unlock => "unlock",
            SvnCommandName::Update => "update",
            SvnCommandName::Upgrade => "upgrade",
        }
    }

    /// Modifies a working copy or repository; an interrupted run may leave locks behind.
    pub const fn is_writeable(self) -> bool {
        matches!(
            self,
            SvnCommandName::Add
                | SvnCommandName::Checkout
                | SvnCommandName::Commit
                | SvnCommandName::Copy
                | SvnCommandName::Delete
                | SvnCommandName::Export
                | SvnCommandName::Import
                | SvnCommandName::Lock
                | SvnCommandName::Merge
                | SvnCommandName::Mkdir
                | SvnCommandName::Move
                | SvnCommandName::PropDel
                | SvnCommandName::PropSet
                | SvnCommandName::Relocate
                | SvnCommandName::Resolve
                | SvnCommandName::Revert
                | SvnCommandName::Switch
                | SvnCommandName::Unlock
                | SvnCommandName::Update
                | SvnCommandName::Upgrade
        )
    }

    /// Never contacts the repository, whatever its arguments.
    pub const fn is_local(self) -> bool {
        matches!(
            self,
            SvnCommandName::Version
                | SvnCommandName::Add
                | SvnCommandName::Cleanup
                | SvnCommandName::Resolve
                | SvnCommandName::Revert
                | SvnCommandName::Upgrade
        )
    }
}

impl fmt::Display for SvnCommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
