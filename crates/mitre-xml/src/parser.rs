//! Streaming XML parser
//!
//! Builds an [`Element`] tree from `quick-xml` namespace-resolved events.
//! Comments, processing instructions and the prolog are dropped; text and
//! CDATA are kept in document order so mixed content survives.

use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{PrefixDeclaration, ResolveResult};
use std::borrow::Cow;
use tracing::trace;

use crate::metadata::LineIndex;
use crate::node::{Attribute, Element, QName};
use crate::{Error, Result, XMLNS_NAMESPACE_URI};

/// Parse a complete document, returning its root element
pub fn parse_element_tree(input: &[u8]) -> Result<Element> {
    let lines = LineIndex::new(input);
    let mut reader = NsReader::from_reader(input);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let offset = to_offset(reader.buffer_position());
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(start)) => {
                let mut element = open_element(&reader, &start)?;
                element.position = lines.position(offset);
                stack.push(element);
            }
            Ok(Event::Empty(start)) => {
                let mut element = open_element(&reader, &start)?;
                element.position = lines.position(offset);
                close_element(element, &mut stack, &mut root)?;
            }
            Ok(Event::End(_)) => {
                let element = stack.pop().ok_or_else(|| {
                    Error::syntax(lines.position(offset), "unexpected closing tag")
                })?;
                close_element(element, &mut stack, &mut root)?;
            }
            Ok(Event::Text(text)) => {
                if let Some(current) = stack.last_mut() {
                    let value = match text.unescape() {
                        Ok(value) => value.into_owned(),
                        // Unknown entities: keep the raw text rather than failing the document
                        Err(_) => String::from_utf8_lossy(&text).into_owned(),
                    };
                    current.push_text(value);
                }
            }
            Ok(Event::CData(cdata)) => {
                if let Some(current) = stack.last_mut() {
                    current.push_text(String::from_utf8_lossy(&cdata.into_inner()).into_owned());
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Error::syntax(lines.position(offset), e.to_string())),
        }
        buf.clear();
    }

    if let Some(unclosed) = stack.last() {
        return Err(Error::syntax(
            unclosed.position,
            format!("element '{}' is never closed", unclosed.name),
        ));
    }

    root.ok_or(Error::NoRoot)
}

fn to_offset<T>(position: T) -> usize
where
    usize: TryFrom<T>,
{
    usize::try_from(position).unwrap_or(usize::MAX)
}

fn open_element<R>(reader: &NsReader<R>, start: &BytesStart<'_>) -> Result<Element> {
    let (ns, local) = reader.resolve_element(start.name());
    let namespace = bound_namespace(ns, start)?;
    let mut element = Element::new(QName {
        namespace,
        local: String::from_utf8_lossy(local.as_ref()).into_owned(),
    });

    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::Syntax {
            line: 0,
            column: 0,
            message: format!("attribute error: {e}"),
        })?;
        let value = match attr.unescape_value() {
            Ok(value) => value,
            Err(_) => Cow::Owned(String::from_utf8_lossy(&attr.value).into_owned()),
        }
        .into_owned();

        if let Some(binding) = attr.key.as_namespace_binding() {
            let prefix = match binding {
                PrefixDeclaration::Default => None,
                PrefixDeclaration::Named(prefix) => {
                    Some(String::from_utf8_lossy(prefix).into_owned())
                }
            };
            element.namespaces.push((prefix, value));
            continue;
        }

        let (ns, local) = reader.resolve_attribute(attr.key);
        let namespace = bound_namespace(ns, start)?;
        if namespace.as_deref() == Some(XMLNS_NAMESPACE_URI) {
            continue;
        }
        element.attributes.push(Attribute {
            name: QName {
                namespace,
                local: String::from_utf8_lossy(local.as_ref()).into_owned(),
            },
            value,
        });
    }

    trace!(element = %element.name, "opened element");
    Ok(element)
}

fn bound_namespace(ns: ResolveResult<'_>, start: &BytesStart<'_>) -> Result<Option<String>> {
    match ns {
        ResolveResult::Bound(namespace) => {
            Ok(Some(String::from_utf8_lossy(namespace.as_ref()).into_owned()))
        }
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(Error::UnknownPrefix {
            prefix: String::from_utf8_lossy(&prefix).into_owned(),
            value: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
        }),
    }
}

fn close_element(
    element: Element,
    stack: &mut [Element],
    root: &mut Option<Element>,
) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.push_child(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(Error::syntax(
            element.position,
            format!("second root element '{}'", element.name),
        ));
    }
    *root = Some(element);
    Ok(())
}
