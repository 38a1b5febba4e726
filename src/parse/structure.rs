//! Depth-first walk of an XML document against a declared element structure
//!
//! Each element type declares the children it accepts and whether each may
//! repeat. The walker keeps a stack of open elements and reports start, text
//! and end events to a [`StructureHandler`]. A child its parent does not
//! declare, or a second occurrence of a singular child, is an error.

use std::fmt;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::{SvnError, SvnResult};

/// Allowed child of an element.
#[derive(Debug, Clone, Copy)]
pub struct Child<E> {
    pub element: E,
    pub repeatable: bool,
}

impl<E> Child<E> {
    pub const fn one(element: E) -> Self {
        Self {
            element,
            repeatable: false,
        }
    }

    pub const fn many(element: E) -> Self {
        Self {
            element,
            repeatable: true,
        }
    }
}

/// Element vocabulary of one document type.
pub trait XmlElement: Copy + Eq + fmt::Debug + 'static {
    fn name(self) -> &'static str;

    fn children(self) -> &'static [Child<Self>];
}

/// Unescaped attributes of a start tag.
#[derive(Debug, Default)]
pub struct Attributes {
    pairs: Vec<(String, String)>,
}

impl Attributes {
    fn read(start: &BytesStart<'_>) -> SvnResult<Self> {
        let mut pairs = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute?;
            let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
            let value = attribute.unescape_value()?.into_owned();
            pairs.push((key, value));
        }
        Ok(Self { pairs })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn get_i64(&self, name: &str) -> SvnResult<Option<i64>> {
        self.get(name)
            .map(|value| {
                value
                    .parse::<i64>()
                    .map_err(|e| SvnError::Parse(format!("Invalid {name} '{value}': {e}")))
            })
            .transpose()
    }

    pub fn get_bool(&self, name: &str) -> bool {
        self.get(name) == Some("true")
    }
}

/// Receives the walk.
pub trait StructureHandler {
    type Element: XmlElement;

    fn start(
        &mut self,
        element: Self::Element,
        parent: Option<Self::Element>,
        attributes: &Attributes,
    ) -> SvnResult<()>;

    /// Character data directly inside `element`; may arrive in several pieces.
    fn text(&mut self, element: Self::Element, text: &str) -> SvnResult<()>;

    fn end(&mut self, element: Self::Element, parent: Option<Self::Element>) -> SvnResult<()>;
}

struct Frame<E> {
    element: E,
    seen: Vec<E>,
}

/// Walk `xml`, which must have a single `root` element.
pub fn walk<H: StructureHandler>(xml: &str, root: H::Element, handler: &mut H) -> SvnResult<()> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame<H::Element>> = Vec::new();
    let mut root_seen = false;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let element = open(&mut stack, &mut root_seen, root, &start)?;
                let parent = stack.last().map(|f| f.element);
                handler.start(element, parent, &Attributes::read(&start)?)?;
                stack.push(Frame {
                    element,
                    seen: Vec::new(),
                });
            }
            Event::Empty(start) => {
                let element = open(&mut stack, &mut root_seen, root, &start)?;
                let parent = stack.last().map(|f| f.element);
                handler.start(element, parent, &Attributes::read(&start)?)?;
                handler.end(element, parent)?;
            }
            Event::Text(text) => {
                if let Some(frame) = stack.last() {
                    handler.text(frame.element, &text.unescape()?)?;
                }
            }
            Event::CData(data) => {
                if let Some(frame) = stack.last() {
                    handler.text(frame.element, &String::from_utf8_lossy(&data))?;
                }
            }
            Event::End(_) => {
                let Some(frame) = stack.pop() else {
                    return Err(SvnError::Xml("Unbalanced closing tag".to_string()));
                };
                let parent = stack.last().map(|f| f.element);
                handler.end(frame.element, parent)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(frame) = stack.last() {
        return Err(SvnError::Xml(format!(
            "Unexpected end of document inside <{}>",
            frame.element.name()
        )));
    }
    if !root_seen {
        return Err(SvnError::Xml(format!("Missing <{}> element", root.name())));
    }
    Ok(())
}

/// Resolve a start tag against the open parent's declared children.
fn open<E: XmlElement>(
    stack: &mut [Frame<E>],
    root_seen: &mut bool,
    root: E,
    start: &BytesStart<'_>,
) -> SvnResult<E> {
    let name = start.local_name();
    let name = String::from_utf8_lossy(name.as_ref());

    let Some(parent) = stack.last_mut() else {
        if *root_seen || name != root.name() {
            return Err(SvnError::Xml(format!(
                "Unexpected root element <{name}>, expected <{}>",
                root.name()
            )));
        }
        *root_seen = true;
        return Ok(root);
    };

    let Some(child) = parent
        .element
        .children()
        .iter()
        .find(|c| c.element.name() == name)
    else {
        return Err(SvnError::Xml(format!(
            "Unexpected element <{name}> inside <{}>",
            parent.element.name()
        )));
    };
    if !child.repeatable {
        if parent.seen.contains(&child.element) {
            return Err(SvnError::Xml(format!(
                "Duplicate element <{name}> inside <{}>",
                parent.element.name()
            )));
        }
        parent.seen.push(child.element);
    }
    Ok(child.element)
}
