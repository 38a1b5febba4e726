//! Output parsers
//!
//! Line converters turn progress output of update, checkout and commit
//! into [`ProgressEvent`]s. The XML parsers walk `info --xml` and
//! `status --xml` documents and hand each completed entry to a consumer.

mod commit;
mod event;
pub mod info;
pub mod status;
pub mod structure;
mod update;

use std::sync::Mutex;

pub use commit::CommitOutputLineConverter;
pub use event::{EventAction, ProgressEvent, StatusType};
pub use info::{
    CommitInfo, ConflictInfo, ConflictVersion, LockInfo, NodeKind, SvnInfo, TreeConflictInfo,
    parse_info_xml,
};
pub use status::{PortableStatus, parse_status_xml};
pub use update::UpdateOutputLineConverter;

use crate::execution::{LineCommandListener, OutputType};

/// Stateful conversion of one output line into an event.
pub trait LineConverter: Send {
    fn convert(&mut self, line: &str) -> Option<ProgressEvent>;
}

/// Listener that feeds stdout lines through a converter and forwards the events.
pub struct ProgressListener<C, H> {
    converter: Mutex<C>,
    handler: H,
}

impl<C, H> ProgressListener<C, H>
where
    C: LineConverter,
    H: Fn(ProgressEvent) + Send + Sync,
{
    pub fn new(converter: C, handler: H) -> Self {
        Self {
            converter: Mutex::new(converter),
            handler,
        }
    }
}

impl<C, H> LineCommandListener for ProgressListener<C, H>
where
    C: LineConverter,
    H: Fn(ProgressEvent) + Send + Sync,
{
    fn on_line_available(&self, line: &str, output_type: OutputType) {
        if output_type != OutputType::Stdout {
            return;
        }
        let event = self
            .converter
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .convert(line);
        if let Some(event) = event {
            (self.handler)(event);
        }
    }
}
