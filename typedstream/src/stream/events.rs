/*!
 The event vocabulary produced by the low-level stream reader.

 Events mirror the structure of the serialized data as closely as possible:
 shared values carry the reference number they were assigned, references are
 surfaced without being resolved, and the `End*` events close the matching
 `Begin*` at the same nesting depth.
*/

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::rc::Rc;

use crate::encoding::{encoding_string, Encoding};

/// The byte order recorded in the stream header, applied to every multi-byte
/// scalar read after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
}

impl Display for ByteOrder {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            ByteOrder::Big => write!(fmt, "big-endian"),
            ByteOrder::Little => write!(fmt, "little-endian"),
        }
    }
}

/// The namespace a shared reference resolves in.
///
/// The same integer ID is legal in all three namespaces at once; which one a
/// reference belongs to is always clear from context and never stored in the
/// stream itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// C strings and type encoding strings
    CString,
    /// Classes
    Class,
    /// Objects
    Object,
}

impl Display for ReferenceKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            ReferenceKind::CString => write!(fmt, "C string"),
            ReferenceKind::Class => write!(fmt, "class"),
            ReferenceKind::Object => write!(fmt, "object"),
        }
    }
}

/// A reference to a value stored earlier in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub kind: ReferenceKind,
    pub number: u32,
}

/// One event read from a `typedstream`.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The stream header; emitted exactly once, before anything else
    Header {
        streamer_version: u8,
        byte_order: ByteOrder,
        system_version: i64,
    },
    /// Opens a group of values prefixed by a single type encoding string
    BeginTypedValues(Vec<Encoding>),
    /// Closes the group opened by the matching [`Event::BeginTypedValues`]
    EndTypedValues,
    /// A signed integer scalar (`c`, `s`, `i`, `l`, `q`)
    SignedInteger(i64),
    /// An unsigned integer scalar (`C`, `S`, `I`, `L`, `Q`)
    UnsignedInteger(u64),
    /// A single-precision float (`f`)
    Float(f32),
    /// A double-precision float (`d`)
    Double(f64),
    /// A raw data string (`+`), stored unshared with an explicit length
    Bytes(Vec<u8>),
    /// A literal C string value (`*`); `number` is the ID it was interned
    /// under in the string namespace, absent when the contents themselves
    /// arrived through an inner back-reference
    CString {
        contents: Rc<[u8]>,
        number: Option<u32>,
    },
    /// An atom (`%`), a deduplicated C string; `None` when nil
    Atom(Option<Rc<[u8]>>),
    /// A selector (`:`); `None` when nil
    Selector(Option<Rc<[u8]>>),
    /// A reference to an earlier shared value; never resolved by the reader
    Reference(Reference),
    /// A nil object, C string, or the end of a class chain
    Nil,
    /// Opens a literally stored object, assigned `number` in the object namespace.
    ///
    /// Followed by the object's class chain, then any number of typed value
    /// groups holding the object's contents, then [`Event::EndObject`].
    BeginObject { number: u32 },
    /// Closes the object opened by the matching [`Event::BeginObject`]
    EndObject,
    /// One link of a class chain, from the most derived class towards the root.
    ///
    /// The chain ends at the first [`Event::Nil`] (root class reached) or
    /// [`Event::Reference`] (rest of the chain was stored earlier).
    SingleClass {
        name: Rc<[u8]>,
        version: i64,
        number: u32,
    },
    /// Opens an array of `length` elements of the `element` type.
    ///
    /// Not generated for char arrays, which become [`Event::ByteArray`] instead.
    BeginArray { element: Encoding, length: usize },
    /// Closes the array opened by the matching [`Event::BeginArray`]
    EndArray,
    /// An array of signed or unsigned chars, read all at once
    ByteArray { element: Encoding, data: Vec<u8> },
    /// Opens a struct or union; one value per field follows
    BeginStruct { name: String, fields: Vec<Encoding> },
    /// Closes the struct opened by the matching [`Event::BeginStruct`]
    EndStruct,
}

impl Event {
    /// Whether this event opens a nesting level in the stream.
    pub fn opens_nesting(&self) -> bool {
        matches!(
            self,
            Event::BeginTypedValues(_)
                | Event::BeginObject { .. }
                | Event::BeginArray { .. }
                | Event::BeginStruct { .. }
        )
    }

    /// Whether this event closes a nesting level in the stream.
    pub fn closes_nesting(&self) -> bool {
        matches!(
            self,
            Event::EndTypedValues | Event::EndObject | Event::EndArray | Event::EndStruct
        )
    }
}

impl Display for Event {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Event::Header {
                streamer_version,
                byte_order,
                system_version,
            } => write!(
                fmt,
                "streamer version {streamer_version}, byte order {byte_order}, system version {system_version}"
            ),
            Event::BeginTypedValues(encodings) => {
                write!(fmt, "begin typed values (types {:?})", encoding_string(encodings))
            }
            Event::EndTypedValues => write!(fmt, "end typed values"),
            Event::SignedInteger(value) => write!(fmt, "{value}"),
            Event::UnsignedInteger(value) => write!(fmt, "{value}"),
            Event::Float(value) => write!(fmt, "{value}"),
            Event::Double(value) => write!(fmt, "{value}"),
            Event::Bytes(data) => write!(fmt, "data: {:?}", String::from_utf8_lossy(data)),
            Event::CString { contents, number } => {
                write!(fmt, "C string: {:?}", String::from_utf8_lossy(contents))?;
                if let Some(number) = number {
                    write!(fmt, " (C string #{number})")?;
                }
                Ok(())
            }
            Event::Atom(Some(contents)) => {
                write!(fmt, "atom: {:?}", String::from_utf8_lossy(contents))
            }
            Event::Atom(None) => write!(fmt, "atom: nil"),
            Event::Selector(Some(name)) => {
                write!(fmt, "selector: {:?}", String::from_utf8_lossy(name))
            }
            Event::Selector(None) => write!(fmt, "selector: nil"),
            Event::Reference(reference) => {
                write!(fmt, "<reference to {} #{}>", reference.kind, reference.number)
            }
            Event::Nil => write!(fmt, "nil"),
            Event::BeginObject { number } => write!(fmt, "begin literal object (object #{number})"),
            Event::EndObject => write!(fmt, "end literal object"),
            Event::SingleClass {
                name,
                version,
                number,
            } => write!(
                fmt,
                "class {} v{version} (class #{number})",
                String::from_utf8_lossy(name)
            ),
            Event::BeginArray { element, length } => {
                write!(fmt, "begin array (element type {element}, length {length})")
            }
            Event::EndArray => write!(fmt, "end array"),
            Event::ByteArray { element, data } => {
                write!(fmt, "byte array (element type {element}, {} bytes)", data.len())
            }
            Event::BeginStruct { name, fields } => {
                write!(
                    fmt,
                    "begin struct {name} (field types {:?})",
                    encoding_string(fields)
                )
            }
            Event::EndStruct => write!(fmt, "end struct"),
        }
    }
}
