//! `svn status --xml` parser

use std::path::{Path, PathBuf};

use super::event::{StatusType, resolve};
use super::info::{CommitInfo, LockInfo, parse_date};
use super::structure::{Attributes, Child, StructureHandler, XmlElement, walk};
use crate::SvnResult;

/// One `<entry>` of `svn status --xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortableStatus {
    pub file: PathBuf,
    /// Changelist the entry was listed under
    pub changelist: Option<String>,
    pub content_status: StatusType,
    pub property_status: StatusType,
    pub revision: Option<i64>,
    pub wc_locked: bool,
    pub copied: bool,
    pub switched: bool,
    pub tree_conflicted: bool,
    pub file_external: bool,
    pub commit: Option<CommitInfo>,
    pub local_lock: Option<LockInfo>,
    pub remote_content_status: StatusType,
    pub remote_property_status: StatusType,
    pub remote_lock: Option<LockInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusElement {
    Status,
    Target,
    Changelist,
    Against,
    Entry,
    WcStatus,
    ReposStatus,
    Commit,
    Author,
    Date,
    Lock,
    Token,
    Owner,
    Comment,
    Created,
    Expires,
}

impl XmlElement for StatusElement {
    fn name(self) -> &'static str {
        use StatusElement::*;
        match self {
            Status => "status",
            Target => "target",
            Changelist => "changelist",
            Against => "against",
            Entry => "entry",
            WcStatus => "wc-status",
            ReposStatus => "repos-status",
            Commit => "commit",
            Author => "author",
            Date => "date",
            Lock => "lock",
            Token => "token",
            Owner => "owner",
            Comment => "comment",
            Created => "created",
            Expires => "expires",
        }
    }

    fn children(self) -> &'static [Child<Self>] {
        use StatusElement::*;
        match self {
            Status => const { &[Child::many(Target), Child::many(Changelist)] },
            Target | Changelist => const { &[Child::many(Entry), Child::one(Against)] },
            Entry => const { &[Child::one(WcStatus), Child::one(ReposStatus)] },
            WcStatus => const { &[Child::one(Commit), Child::one(Lock)] },
            ReposStatus => const { &[Child::one(Lock)] },
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
            _ => &[],
        }
    }
}

struct StatusHandler<'a, F> {
    base: &'a Path,
    changelist: Option<String>,
    status: PortableStatus,
    lock: Option<LockInfo>,
    text: String,
    against: Option<i64>,
    consumer: F,
}

impl<F: FnMut(PortableStatus)> StructureHandler for StatusHandler<'_, F> {
    type Element = StatusElement;

    fn start(
        &mut self,
        element: StatusElement,
        _parent: Option<StatusElement>,
        attributes: &Attributes,
    ) -> SvnResult<()> {
        self.text.clear();
        match element {
            StatusElement::Target => self.changelist = None,
            StatusElement::Changelist => {
                self.changelist = attributes.get("name").map(str::to_string);
            }
            StatusElement::Against => {
                if let Some(revision) = attributes.get_i64("revision")? {
                    self.against = Some(revision);
                }
            }
            StatusElement::Entry => {
                let path = attributes.get("path").unwrap_or(".");
                let file = if Path::new(path).is_absolute() {
                    PathBuf::from(path)
                } else {
                    resolve(self.base, path)
                };
                self.status = PortableStatus {
                    file,
                    changelist: self.changelist.clone(),
                    ..PortableStatus::default()
                };
            }
            StatusElement::WcStatus => {
                let status = &mut self.status;
                status.content_status = StatusType::from_xml(attributes.get("item").unwrap_or("none"));
                status.property_status = StatusType::from_xml(attributes.get("props").unwrap_or("none"));
                status.revision = attributes.get_i64("revision")?;
                status.wc_locked = attributes.get_bool("wc-locked");
                status.copied = attributes.get_bool("copied");
                status.switched = attributes.get_bool("switched");
                status.tree_conflicted = attributes.get_bool("tree-conflicted");
                status.file_external = attributes.get_bool("file-external");
            }
            StatusElement::ReposStatus => {
                let status = &mut self.status;
                status.remote_content_status =
                    StatusType::from_xml(attributes.get("item").unwrap_or("none"));
                status.remote_property_status =
                    StatusType::from_xml(attributes.get("props").unwrap_or("none"));
            }
            StatusElement::Commit => {
                self.status.commit = Some(CommitInfo {
                    revision: attributes.get_i64("revision")?,
                    ..CommitInfo::default()
                });
            }
            StatusElement::Lock => self.lock = Some(LockInfo::default()),
            _ => {}
        }
        Ok(())
    }

    fn text(&mut self, _element: StatusElement, text: &str) -> SvnResult<()> {
        self.text.push_str(text);
        Ok(())
    }

    fn end(&mut self, element: StatusElement, parent: Option<StatusElement>) -> SvnResult<()> {
        use StatusElement::*;
        let text = std::mem::take(&mut self.text);
        let value = Some(text.trim().to_string()).filter(|v| !v.is_empty());

        match element {
            Entry => (self.consumer)(std::mem::take(&mut self.status)),
            Author => {
                if let Some(commit) = self.status.commit.as_mut() {
                    commit.author = value;
                }
            }
            Date => {
                if let Some(commit) = self.status.commit.as_mut() {
                    commit.date = value.as_deref().map(parse_date).transpose()?;
                }
            }
            Token | Owner | Comment | Created | Expires => {
                if let Some(lock) = self.lock.as_mut() {
                    match element {
                        Token => lock.token = value,
                        Owner => lock.owner = value,
                        Comment => lock.comment = value,
                        Created => lock.created = value.as_deref().map(parse_date).transpose()?,
                        _ => lock.expires = value.as_deref().map(parse_date).transpose()?,
                    }
                }
            }
            Lock => {
                let lock = self.lock.take();
                match parent {
                    Some(ReposStatus) => self.status.remote_lock = lock,
                    _ => self.status.local_lock = lock,
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Parse `svn status --xml` output, handing each entry to `consumer`.
///
/// Returns the revision from `<against>`, present when the status was
/// checked against the repository.
pub fn parse_status_xml<F>(xml: &str, base: &Path, consumer: F) -> SvnResult<Option<i64>>
where
    F: FnMut(PortableStatus),
{
    let mut handler = StatusHandler {
        base,
        changelist: None,
        status: PortableStatus::default(),
        lock: None,
        text: String::new(),
        against: None,
        consumer,
    };
    walk(xml, StatusElement::Status, &mut handler)?;
    Ok(handler.against)
}
