//! Minimal element tree over `quick-xml` events.
//!
//! The city-page documents are small, so reading them into a tree and then
//! querying by descendant name is simpler than a streaming state machine.

use quick_xml::{
    Reader,
    encoding::Decoder,
    events::{BytesStart, Event},
};

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

/// Decode a raw document into text using the charset from its XML
/// declaration (the city-page feed declares `ISO-8859-1`). Documents without
/// a declaration are read as UTF-8, or per their byte order mark.
pub fn decode_document(bytes: &[u8]) -> Result<String, ParseError> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    // Reading the declaration is what switches the reader's decoder.
    reader
        .read_event_into(&mut buf)
        .map_err(|e| ParseError::new(e.to_string()))?;

    let text = reader
        .decoder()
        .decode(bytes)
        .map_err(|e| ParseError::new(format!("undecodable document: {e}")))?;

    Ok(text.trim_start_matches('\u{feff}').to_string())
}

impl Element {
    /// Parse a whole document and return its root element.
    pub fn parse(doc: &str) -> Result<Element, ParseError> {
        let mut reader = Reader::from_str(doc);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(e) => {
                    return Err(ParseError::new(format!(
                        "{e} (at byte {})",
                        reader.buffer_position()
                    )));
                }
            };

            match event {
                Event::Start(start) => {
                    if stack.is_empty() && root.is_some() {
                        return Err(ParseError::new("junk after document element"));
                    }
                    stack.push(Element::open(&start, reader.decoder())?);
                }
                Event::Empty(start) => {
                    let element = Element::open(&start, reader.decoder())?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| ParseError::new("closing tag without opening tag"))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(|e| ParseError::new(e.to_string()))?;
                    push_text(&mut stack, &text)?;
                }
                Event::CData(data) => {
                    let text = reader
                        .decoder()
                        .decode(&data)
                        .map_err(|e| ParseError::new(e.to_string()))?;
                    push_text(&mut stack, &text)?;
                }
                Event::Eof => break,
                // declarations, comments, processing instructions, doctype
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(ParseError::new(format!("unclosed element <{}>", open.name)));
        }

        root.ok_or_else(|| ParseError::new("document has no root element"))
    }

    fn open(start: &BytesStart<'_>, decoder: Decoder) -> Result<Element, ParseError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| ParseError::new(format!("in <{name}>: {e}")))?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr
                .decode_and_unescape_value(decoder)
                .map_err(|e| ParseError::new(format!("in <{name}>: {e}")))?
                .into_owned();
            attributes.push((key, value));
        }

        Ok(Element {
            name,
            attributes,
            ..Default::default()
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Direct text content, `None` when the element has none.
    pub fn text(&self) -> Option<&str> {
        let text = self.text.trim();
        (!text.is_empty()).then_some(text)
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// All elements below this one, in document order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().collect(),
        }
    }

    /// First descendant called `name`.
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.descendants().find(|e| e.name == name)
    }

    /// Every descendant called `name`, in document order.
    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.descendants().filter(move |e| e.name == name)
    }

    /// First element matching a chain of descendant names, like the CSS
    /// selector `a b c`.
    pub fn find_path(&self, path: &[&str]) -> Option<&Element> {
        match path {
            [] => None,
            [last] => self.find(last),
            [first, rest @ ..] => self
                .descendants()
                .filter(|e| e.name == *first)
                .find_map(|e| e.find_path(rest)),
        }
    }

    /// Text of the element at `path`, if it exists and has any.
    pub fn text_at(&self, path: &[&str]) -> Option<&str> {
        self.find_path(path).and_then(Element::text)
    }
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(ParseError::new("junk after document element")),
    }
    Ok(())
}

fn push_text(stack: &mut [Element], text: &str) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.text.push_str(text);
            Ok(())
        }
        None => Err(ParseError::new("text outside the root element")),
    }
}

/// Pre-order walk produced by [`Element::descendants`].
#[derive(Debug)]
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}
