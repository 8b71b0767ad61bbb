//! Registry-driven EBML tree decoder.

use tracing::{debug, trace};
use webmopus_buffer::ByteReader;

use super::schema::{self, ids};
use crate::error::{Error, Result};

/// Maximum length of an element id VInt.
pub const MAX_ID_LENGTH: usize = 4;
/// Maximum length of an element size VInt.
pub const MAX_SIZE_LENGTH: usize = 8;

/// A decoded element borrowing its payload from the input.
#[derive(Debug, Clone, PartialEq)]
pub struct Element<'a> {
    /// Decoded id (length marker cleared).
    pub id: u64,
    /// Absolute offset of the element header.
    pub offset: usize,
    /// Absolute offset of the payload.
    pub data_offset: usize,
    /// True if the element was written with the unknown-size sentinel.
    pub unknown_size: bool,
    pub data: ElementData<'a>,
}

/// Payload of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementData<'a> {
    /// A container the decoder descended into.
    Master(Vec<Element<'a>>),
    /// A leaf value, or an unknown or opaque element kept as raw bytes.
    Leaf(&'a [u8]),
}

impl<'a> Element<'a> {
    /// Returns the child elements; empty for leaves.
    pub fn children(&self) -> &[Element<'a>] {
        match &self.data {
            ElementData::Master(children) => children,
            ElementData::Leaf(_) => &[],
        }
    }

    /// Returns the first child with the given id.
    pub fn child(&self, id: u64) -> Option<&Element<'a>> {
        self.children().iter().find(|e| e.id == id)
    }

    /// Returns all children with the given id, in document order.
    pub fn children_with(&self, id: u64) -> impl Iterator<Item = &Element<'a>> {
        self.children().iter().filter(move |e| e.id == id)
    }

    /// Returns the raw payload of a leaf.
    pub fn bytes(&self) -> Result<&'a [u8]> {
        match self.data {
            ElementData::Leaf(data) => Ok(data),
            ElementData::Master(_) => Err(self.malformed("expected a leaf element")),
        }
    }

    /// Interprets the payload as a big-endian unsigned integer (0 to 8
    /// bytes; empty means 0).
    pub fn as_uint(&self) -> Result<u64> {
        let data = self.bytes()?;
        if data.len() > 8 {
            return Err(self.malformed(format!("{}-byte unsigned integer", data.len())));
        }
        Ok(data.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
    }

    /// Interprets the payload as an IEEE 754 float (0, 4 or 8 bytes).
    pub fn as_float(&self) -> Result<f64> {
        let data = self.bytes()?;
        let mut r = ByteReader::new(data);
        match data.len() {
            0 => Ok(0.0),
            4 => Ok(f64::from(r.read_f32_be()?)),
            8 => Ok(r.read_f64_be()?),
            n => Err(self.malformed(format!("{n}-byte float"))),
        }
    }

    /// Interprets the payload as a string, dropping trailing NUL padding.
    pub fn as_str(&self) -> Result<&'a str> {
        let data = self.bytes()?;
        let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        std::str::from_utf8(&data[..end]).map_err(|_| self.malformed("string is not valid UTF-8"))
    }

    pub(crate) fn malformed(&self, reason: impl Into<String>) -> Error {
        Error::malformed(self.offset, self.id, reason)
    }
}

/// Decodes top-level elements from a whole document.
pub fn parse_document(data: &[u8]) -> Result<Vec<Element<'_>>> {
    let mut r = ByteReader::new(data);
    parse_children(&mut r, Scope::ROOT)
}

/// Where a list of children is being decoded.
#[derive(Debug, Clone, Copy)]
struct Scope {
    /// Parent id; `None` for the document root.
    parent: Option<u64>,
    /// True if the parent has unknown size and ends at the first element
    /// it may not contain.
    open_ended: bool,
}

impl Scope {
    const ROOT: Scope = Scope {
        parent: None,
        open_ended: false,
    };

    fn allows(&self, child: u64) -> bool {
        match self.parent {
            Some(parent) => schema::is_child_of(child, parent),
            None => schema::ROOT_CHILDREN.contains(&child),
        }
    }
}

fn parse_children<'a>(r: &mut ByteReader<'a>, scope: Scope) -> Result<Vec<Element<'a>>> {
    let mut elements = Vec::new();
    while !r.is_empty() {
        let checkpoint = r.clone();
        let offset = r.offset();
        let id = r.read_vint(MAX_ID_LENGTH)?.value();
        let size = r.read_vint(MAX_SIZE_LENGTH)?;
        let data_offset = r.offset();
        let descriptor = schema::lookup(id);

        if scope.open_ended && descriptor.is_some() && !scope.allows(id) {
            // Sibling of the open-ended parent; hand it back.
            *r = checkpoint;
            break;
        }

        let container = descriptor.filter(|d| d.is_container() && scope.allows(id));

        if size.is_unknown_size() {
            if container.is_none() {
                return Err(Error::malformed(offset, id, "unknown size on a non-container element"));
            }
            let children = parse_children(
                r,
                Scope {
                    parent: Some(id),
                    open_ended: true,
                },
            )?;
            elements.push(Element {
                id,
                offset,
                data_offset,
                unknown_size: true,
                data: ElementData::Master(children),
            });
            continue;
        }

        let len = usize::try_from(size.value()).unwrap_or(usize::MAX);
        if len > r.remaining() {
            return Err(Error::malformed(
                offset,
                id,
                format!("size {len} overruns parent ({} bytes left)", r.remaining()),
            ));
        }
        let mut body = r.sub_reader(len)?;

        let data = match container {
            Some(_) => ElementData::Master(parse_children(
                &mut body,
                Scope {
                    parent: Some(id),
                    open_ended: false,
                },
            )?),
            None => {
                match descriptor {
                    None => {
                        debug!(id = %format!("{id:#x}"), offset, len, "skipping unknown element")
                    }
                    Some(d) if d.id == ids::VOID => trace!(offset, len, "skipping Void"),
                    Some(d) if !d.kind.accepts_len(len) => {
                        return Err(Error::malformed(
                            offset,
                            id,
                            format!("{len}-byte {} payload", d.name),
                        ));
                    }
                    Some(_) => {}
                }
                ElementData::Leaf(body.peek_rest())
            }
        };
        elements.push(Element {
            id,
            offset,
            data_offset,
            unknown_size: false,
            data,
        });
    }
    Ok(elements)
}
