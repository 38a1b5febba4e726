//! `svn info --xml` parser

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::structure::{Attributes, Child, StructureHandler, XmlElement, walk};
use crate::{SvnError, SvnResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Dir,
    #[default]
    None,
    Unknown,
}

impl NodeKind {
    pub fn parse(value: &str) -> Self {
        match value {
            "file" => NodeKind::File,
            "dir" => NodeKind::Dir,
            "none" => NodeKind::None,
            _ => NodeKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitInfo {
    pub revision: Option<i64>,
    pub author: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockInfo {
    pub token: Option<String>,
    pub owner: Option<String>,
    pub comment: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub expires: Option<DateTime<Utc>>,
}

/// One side of a conflict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictVersion {
    pub side: Option<String>,
    pub kind: NodeKind,
    pub path_in_repository: Option<String>,
    pub repository_url: Option<String>,
    pub revision: Option<i64>,
}

impl ConflictVersion {
    fn from_attributes(attributes: &Attributes) -> SvnResult<Self> {
        Ok(Self {
            side: attributes.get("side").map(str::to_string),
            kind: attributes.get("kind").map(NodeKind::parse).unwrap_or_default(),
            path_in_repository: attributes.get("path-in-repos").map(str::to_string),
            repository_url: attributes.get("repos-url").map(str::to_string),
            revision: attributes.get_i64("revision")?,
        })
    }
}

/// Text or property conflict markers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictInfo {
    pub conflict_type: Option<String>,
    pub previous_base_file: Option<String>,
    pub previous_working_file: Option<String>,
    pub current_base_file: Option<String>,
    pub property_file: Option<String>,
    pub versions: Vec<ConflictVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeConflictInfo {
    pub victim: Option<String>,
    pub kind: NodeKind,
    pub operation: Option<String>,
    pub action: Option<String>,
    pub reason: Option<String>,
    pub versions: Vec<ConflictVersion>,
}

/// One `<entry>` of `svn info --xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SvnInfo {
    pub file: PathBuf,
    pub kind: NodeKind,
    pub revision: Option<i64>,
    pub url: Option<String>,
    pub relative_url: Option<String>,
    pub repository_root: Option<String>,
    pub repository_uuid: Option<String>,
    pub working_copy_root: Option<PathBuf>,
    pub schedule: Option<String>,
    pub depth: Option<String>,
    pub text_updated: Option<DateTime<Utc>>,
    pub checksum: Option<String>,
    pub changelist: Option<String>,
    pub copy_from_url: Option<String>,
    pub copy_from_revision: Option<i64>,
    pub moved_from: Option<String>,
    pub moved_to: Option<String>,
    pub commit: Option<CommitInfo>,
    pub lock: Option<LockInfo>,
    pub conflicts: Vec<ConflictInfo>,
    pub tree_conflict: Option<TreeConflictInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InfoElement {
    Info,
    Entry,
    Url,
    RelativeUrl,
    Repository,
    Root,
    Uuid,
    WcInfo,
    WcRootAbspath,
    Schedule,
    Depth,
    TextUpdated,
    Checksum,
    Changelist,
    CopyFromUrl,
    CopyFromRev,
    MovedFrom,
    MovedTo,
    Commit,
    Author,
    Date,
    Lock,
    Token,
    Owner,
    Comment,
    Created,
    Expires,
    Conflict,
    PrevBaseFile,
    PrevWcFile,
    CurBaseFile,
    PropFile,
    TreeConflict,
    Version,
}

impl XmlElement for InfoElement {
    fn name(self) -> &'static str {
        use InfoElement::*;
        match self {
            Info => "info",
            Entry => "entry",
            Url => "url",
            RelativeUrl => "relative-url",
            Repository => "repository",
            Root => "root",
            Uuid => "uuid",
            WcInfo => "wc-info",
            WcRootAbspath => "wcroot-abspath",
            Schedule => "schedule",
            Depth => "depth",
            TextUpdated => "text-updated",
            Checksum => "checksum",
            Changelist => "changelist",
            CopyFromUrl => "copy-from-url",
            CopyFromRev => "copy-from-rev",
            MovedFrom => "moved-from",
            MovedTo => "moved-to",
            Commit => "commit",
            Author => "author",
            Date => "date",
            Lock => "lock",
            Token => "token",
            Owner => "owner",
            Comment => "comment",
            Created => "created",
            Expires => "expires",
            Conflict => "conflict",
            PrevBaseFile => "prev-base-file",
            PrevWcFile => "prev-wc-file",
            CurBaseFile => "cur-base-file",
            PropFile => "prop-file",
            TreeConflict => "tree-conflict",
            Version => "version",
        }
    }

    fn children(self) -> &'static [Child<Self>] {
        use InfoElement::*;
        match self {
            Info => const { &[Child::many(Entry)] },
            Entry => const {
                &[
                    Child::one(Url),
                    Child::one(RelativeUrl),
                    Child::one(Repository),
                    Child::one(WcInfo),
                    Child::one(Commit),
                    Child::one(Lock),
                    Child::many(Conflict),
                    Child::one(TreeConflict),
                ]
            },
            Repository => const { &[Child::one(Root), Child::one(Uuid)] },
            WcInfo => const {
                &[
                    Child::one(WcRootAbspath),
                    Child::one(Schedule),
                    Child::one(Depth),
                    Child::one(TextUpdated),
                    Child::one(Checksum),
                    Child::one(Changelist),
                    Child::one(CopyFromUrl),
                    Child::one(CopyFromRev),
                    Child::one(MovedFrom),
                    Child::one(MovedTo),
                ]
            },
            Commit => const { &[Child::one(Author), Child::one(Date)] },
            Lock => const {
                &[
                    Child::one(Token),
                    Child::one(Owner),
                    Child::one(Comment),
                    Child::one(Created),
                    Child::one(Expires),
                ]
            },
            Conflict => const {
                &[
                    Child::one(PrevBaseFile),
                    Child::one(PrevWcFile),
                    Child::one(CurBaseFile),
                    Child::one(PropFile),
                    Child::many(Version),
                ]
            },
            TreeConflict => const { &[Child::many(Version)] },
            _ => &[],
        }
    }
}

pub(crate) fn parse_date(value: &str) -> SvnResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| SvnError::Parse(format!("Invalid date '{value}': {e}")))
}

struct InfoHandler<'a, F> {
    base: &'a Path,
    info: SvnInfo,
    text: String,
    consumer: F,
}

impl<F: FnMut(SvnInfo)> StructureHandler for InfoHandler<'_, F> {
    type Element = InfoElement;

    fn start(
        &mut self,
        element: InfoElement,
        parent: Option<InfoElement>,
        attributes: &Attributes,
    ) -> SvnResult<()> {
        self.text.clear();
        match element {
            InfoElement::Entry => {
                let path = attributes.get("path").unwrap_or(".");
                self.info = SvnInfo {
                    file: super::event::resolve(self.base, path),
                    kind: attributes.get("kind").map(NodeKind::parse).unwrap_or_default(),
                    revision: attributes.get_i64("revision")?,
                    ..SvnInfo::default()
                };
            }
            InfoElement::Commit => {
                self.info.commit = Some(CommitInfo {
                    revision: attributes.get_i64("revision")?,
                    ..CommitInfo::default()
                });
            }
            InfoElement::Lock => self.info.lock = Some(LockInfo::default()),
            InfoElement::Conflict => self.info.conflicts.push(ConflictInfo {
                conflict_type: attributes.get("type").map(str::to_string),
                ..ConflictInfo::default()
            }),
            InfoElement::TreeConflict => {
                self.info.tree_conflict = Some(TreeConflictInfo {
                    victim: attributes.get("victim").map(str::to_string),
                    kind: attributes.get("kind").map(NodeKind::parse).unwrap_or_default(),
                    operation: attributes.get("operation").map(str::to_string),
                    action: attributes.get("action").map(str::to_string),
                    reason: attributes.get("reason").map(str::to_string),
                    versions: Vec::new(),
                });
            }
            InfoElement::Version => {
                let version = ConflictVersion::from_attributes(attributes)?;
                match parent {
                    Some(InfoElement::TreeConflict) => {
                        if let Some(tree) = self.info.tree_conflict.as_mut() {
                            tree.versions.push(version);
                        }
                    }
                    _ => {
                        if let Some(conflict) = self.info.conflicts.last_mut() {
                            conflict.versions.push(version);
                        }
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn text(&mut self, _element: InfoElement, text: &str) -> SvnResult<()> {
        self.text.push_str(text);
        Ok(())
    }

    fn end(&mut self, element: InfoElement, _parent: Option<InfoElement>) -> SvnResult<()> {
        use InfoElement::*;
        let text = std::mem::take(&mut self.text);
        let value = Some(text.trim().to_string()).filter(|v| !v.is_empty());
        let info = &mut self.info;

        match element {
            Entry => (self.consumer)(std::mem::take(info)),
            Url => info.url = value,
            RelativeUrl => info.relative_url = value,
            Root => info.repository_root = value,
            Uuid => info.repository_uuid = value,
            WcRootAbspath => info.working_copy_root = value.map(PathBuf::from),
            Schedule => info.schedule = value,
            Depth => info.depth = value,
            TextUpdated => info.text_updated = value.as_deref().map(parse_date).transpose()?,
            Checksum => info.checksum = value,
            Changelist => info.changelist = value,
            CopyFromUrl => info.copy_from_url = value,
            CopyFromRev => {
                info.copy_from_revision = value
                    .map(|v| {
                        v.parse::<i64>()
                            .map_err(|e| SvnError::Parse(format!("Invalid copy-from-rev '{v}': {e}")))
                    })
                    .transpose()?;
            }
            MovedFrom => info.moved_from = value,
            MovedTo => info.moved_to = value,
            Author => {
                if let Some(commit) = info.commit.as_mut() {
                    commit.author = value;
                }
            }
            Date => {
                if let Some(commit) = info.commit.as_mut() {
                    commit.date = value.as_deref().map(parse_date).transpose()?;
                }
            }
            Token | Owner | Comment | Created | Expires => {
                if let Some(lock) = info.lock.as_mut() {
                    match element {
                        Token => lock.token = value,
                        Owner => lock.owner = value,
                        Comment => lock.comment = value,
                        Created => lock.created = value.as_deref().map(parse_date).transpose()?,
                        _ => lock.expires = value.as_deref().map(parse_date).transpose()?,
                    }
                }
            }
            PrevBaseFile | PrevWcFile | CurBaseFile | PropFile => {
                if let Some(conflict) = info.conflicts.last_mut() {
                    match element {
                        PrevBaseFile => conflict.previous_base_file = value,
                        PrevWcFile => conflict.previous_working_file = value,
                        CurBaseFile => conflict.current_base_file = value,
                        _ => conflict.property_file = value,
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Parse `svn info --xml` output, handing each entry to `consumer` as it closes.
///
/// Entry paths are resolved against `base`.
pub fn parse_info_xml<F>(xml: &str, base: &Path, consumer: F) -> SvnResult<()>
where
    F: FnMut(SvnInfo),
{
    let mut handler = InfoHandler {
        base,
        info: SvnInfo::default(),
        text: String::new(),
        consumer,
    };
    walk(xml, InfoElement::Info, &mut handler)
}
