/*!
 Parsing for the Objective-C type encoding strings that prefix every group of
 values in a `typedstream`.

 The syntax is close to, but not identical to, the `@encode` syntax used by the
 Objective-C runtime. Qualifiers, block pointers, and object pointer class names
 do not occur in typedstreams; on the other hand typedstreams use `+` for raw
 data strings and `%` for atoms (deduplicated C strings), which the runtime
 does not.
*/

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::error::stream::StreamError;


/// A single parsed type encoding.
///
/// Compound encodings (arrays, structs, unions, pointers) hold their inner
/// encodings recursively, so one `Encoding` describes one complete C type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoding {
    /// `c`, a signed char (also used for `BOOL`)
    Char,
    /// `C`, an unsigned char
    UnsignedChar,
    /// `s`, a signed 16-bit integer
    Short,
    /// `S`, an unsigned 16-bit integer
    UnsignedShort,
    /// `i`, a signed 32-bit integer
    Int,
    /// `I`, an unsigned 32-bit integer
    UnsignedInt,
    /// `l`, a signed 32-bit integer (`long` on the machines that wrote these streams)
    Long,
    /// `L`, an unsigned 32-bit integer
    UnsignedLong,
    /// `q`, a signed 64-bit integer
    LongLong,
    /// `Q`, an unsigned 64-bit integer
    UnsignedLongLong,
    /// `f`, a 32-bit IEEE float
    Float,
    /// `d`, a 64-bit IEEE float
    Double,
    /// `*`, a shared C string, possibly nil
    CString,
    /// `%`, an atom (`NXAtom`), a deduplicated C string
    Atom,
    /// `+`, a raw data string stored with an explicit length
    Bytes,
    /// `@`, an object, possibly nil
    Object,
    /// `#`, a class
    Class,
    /// `:`, a selector, encoded like a shared C string
    Selector,
    /// `[NT]`, an array of `length` elements of the `element` type
    Array { length: usize, element: Box<Encoding> },
    /// `{NAME=T1T2…}`, a struct; the name is `?` for anonymous types
    Struct { name: String, fields: Vec<Encoding> },
    /// `(NAME=T1T2…)`, a union; the name is `?` for anonymous types
    Union { name: String, members: Vec<Encoding> },
    /// `bN`, a bitfield of `N` bits
    Bitfield(usize),
    /// `^T`, a pointer to a value of the inner type
    Pointer(Box<Encoding>),
    /// Any other single-byte code, preserved verbatim (`?` is a function pointer)
    Unknown(u8),
}

impl Encoding {
    /// Parse one type encoding starting at `start`, returning the descriptor
    /// and the index of the first byte after it.
    pub fn parse_one(data: &[u8], start: usize) -> Result<(Self, usize), StreamError> {
        let byte = data
            .get(start)
            .copied()
            .ok_or_else(|| bad_encoding(data, start))?;

        match byte {
            b'c' => Ok((Self::Char, start + 1)),
            b'C' => Ok((Self::UnsignedChar, start + 1)),
            b's' => Ok((Self::Short, start + 1)),
            b'S' => Ok((Self::UnsignedShort, start + 1)),
            b'i' => Ok((Self::Int, start + 1)),
            b'I' => Ok((Self::UnsignedInt, start + 1)),
            b'l' => Ok((Self::Long, start + 1)),
            b'L' => Ok((Self::UnsignedLong, start + 1)),
            b'q' => Ok((Self::LongLong, start + 1)),
            b'Q' => Ok((Self::UnsignedLongLong, start + 1)),
            b'f' => Ok((Self::Float, start + 1)),
            b'd' => Ok((Self::Double, start + 1)),
            b'*' => Ok((Self::CString, start + 1)),
            b'%' => Ok((Self::Atom, start + 1)),
            b'+' => Ok((Self::Bytes, start + 1)),
            b'@' => Ok((Self::Object, start + 1)),
            b'#' => Ok((Self::Class, start + 1)),
            b':' => Ok((Self::Selector, start + 1)),
            b'[' => Self::parse_array(data, start),
            b'{' => Self::parse_aggregate(data, start, b'}'),
            b'(' => Self::parse_aggregate(data, start, b')'),
            b'b' => Self::parse_bitfield(data, start),
            b'^' => {
                let (inner, end) = Self::parse_one(data, start + 1)?;
                Ok((Self::Pointer(Box::new(inner)), end))
            }
            other => Ok((Self::Unknown(other), start + 1)),
        }
    }

    fn parse_array(data: &[u8], start: usize) -> Result<(Self, usize), StreamError> {
        let (length, digits_end) = parse_length(data, start + 1)
            .ok_or_else(|| bad_encoding(data, start + 1))?;
        let (element, element_end) = Self::parse_one(data, digits_end)?;
        if data.get(element_end) != Some(&b']') {
            return Err(bad_encoding(data, element_end));
        }
        Ok((
            Self::Array {
                length,
                element: Box::new(element),
            },
            element_end + 1,
        ))
    }

    fn parse_aggregate(data: &[u8], start: usize, closer: u8) -> Result<(Self, usize), StreamError> {
        let end = end_of_encoding(data, start)?;
        if data[end - 1] != closer {
            return Err(bad_encoding(data, end - 1));
        }

        let body = &data[start + 1..end - 1];
        let equals = body
            .iter()
            .position(|&byte| byte == b'=')
            .ok_or_else(|| bad_encoding(data, start))?;
        let name = String::from_utf8_lossy(&body[..equals]).into_owned();
        if name.is_empty() {
            return Err(bad_encoding(data, start));
        }
        let inner = split_encodings(&body[equals + 1..])?;

        let encoding = if closer == b'}' {
            Self::Struct { name, fields: inner }
        } else {
            Self::Union { name, members: inner }
        };
        Ok((encoding, end))
    }

    fn parse_bitfield(data: &[u8], start: usize) -> Result<(Self, usize), StreamError> {
        let (bits, end) =
            parse_length(data, start + 1).ok_or_else(|| bad_encoding(data, start + 1))?;
        Ok((Self::Bitfield(bits), end))
    }

    /// Whether a stream value of this type matches the caller's expected type.
    ///
    /// Encodings are compared structurally; the anonymous struct/union name `?`
    /// matches any name.
    pub fn matches(&self, expected: &Encoding) -> bool {
        match (self, expected) {
            (
                Self::Struct { name, fields },
                Self::Struct {
                    name: expected_name,
                    fields: expected_fields,
                },
            )
            | (
                Self::Union {
                    name,
                    members: fields,
                },
                Self::Union {
                    name: expected_name,
                    members: expected_fields,
                },
            ) => {
                (name == "?" || expected_name == "?" || name == expected_name)
                    && fields.len() == expected_fields.len()
                    && fields
                        .iter()
                        .zip(expected_fields)
                        .all(|(field, expected_field)| field.matches(expected_field))
            }
            (
                Self::Array { length, element },
                Self::Array {
                    length: expected_length,
                    element: expected_element,
                },
            ) => length == expected_length && element.matches(expected_element),
            (Self::Pointer(inner), Self::Pointer(expected_inner)) => {
                inner.matches(expected_inner)
            }
            (actual, expected) => actual == expected,
        }
    }

    /// Whether this encoding is a signed or unsigned char, the element types
    /// that get the byte-array fast path.
    pub fn is_char_like(&self) -> bool {
        matches!(self, Self::Char | Self::UnsignedChar)
    }
}

impl Display for Encoding {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Char => write!(fmt, "c"),
            Self::UnsignedChar => write!(fmt, "C"),
            Self::Short => write!(fmt, "s"),
            Self::UnsignedShort => write!(fmt, "S"),
            Self::Int => write!(fmt, "i"),
            Self::UnsignedInt => write!(fmt, "I"),
            Self::Long => write!(fmt, "l"),
            Self::UnsignedLong => write!(fmt, "L"),
            Self::LongLong => write!(fmt, "q"),
            Self::UnsignedLongLong => write!(fmt, "Q"),
            Self::Float => write!(fmt, "f"),
            Self::Double => write!(fmt, "d"),
            Self::CString => write!(fmt, "*"),
            Self::Atom => write!(fmt, "%"),
            Self::Bytes => write!(fmt, "+"),
            Self::Object => write!(fmt, "@"),
            Self::Class => write!(fmt, "#"),
            Self::Selector => write!(fmt, ":"),
            Self::Array { length, element } => write!(fmt, "[{length}{element}]"),
            Self::Struct { name, fields } => {
                write!(fmt, "{{{name}=")?;
                for field in fields {
                    write!(fmt, "{field}")?;
                }
                write!(fmt, "}}")
            }
            Self::Union { name, members } => {
                write!(fmt, "({name}=")?;
                for member in members {
                    write!(fmt, "{member}")?;
                }
                write!(fmt, ")")
            }
            Self::Bitfield(bits) => write!(fmt, "b{bits}"),
            Self::Pointer(inner) => write!(fmt, "^{inner}"),
            Self::Unknown(byte) => write!(fmt, "{}", *byte as char),
        }
    }
}

/// Split a type encoding string into the encodings it contains and parse each.
pub fn split_encodings(data: &[u8]) -> Result<Vec<Encoding>, StreamError> {
    let mut encodings = vec![];
    let mut position = 0;
    while position < data.len() {
        let (encoding, end) = Encoding::parse_one(data, position)?;
        encodings.push(encoding);
        position = end;
    }
    Ok(encodings)
}

/// Render a sequence of encodings back to the byte string they were parsed from.
pub fn encoding_string(encodings: &[Encoding]) -> String {
    encodings.iter().map(Encoding::to_string).collect()
}

/// Find the end index (exclusive) of the single encoding starting at `start`.
///
/// Only the number of closing parentheses is matched against the number of
/// opening ones; callers validate that the closer type fits the opener.
fn end_of_encoding(data: &[u8], start: usize) -> Result<usize, StreamError> {
    let mut depth = 0usize;
    let mut index = start;
    while index < data.len() {
        let byte = data[index];
        if matches!(byte, b'(' | b'[' | b'{') {
            depth += 1;
            index += 1;
        } else if depth > 0 {
            if matches!(byte, b')' | b']' | b'}') {
                depth -= 1;
            }
            index += 1;
            if depth == 0 {
                return Ok(index);
            }
        } else {
            return Ok(index + 1);
        }
    }
    Err(bad_encoding(data, data.len()))
}

/// Parse a run of ASCII digits into a length, returning the value and the
/// index of the first non-digit byte. `None` if there are no digits or the
/// value overflows.
fn parse_length(data: &[u8], start: usize) -> Option<(usize, usize)> {
    let mut index = start;
    let mut value = 0usize;
    while let Some(digit) = data.get(index).filter(|byte| byte.is_ascii_digit()) {
        value = value
            .checked_mul(10)?
            .checked_add(usize::from(digit - b'0'))?;
        index += 1;
    }
    if index == start {
        return None;
    }
    Some((value, index))
}

fn bad_encoding(data: &[u8], offset: usize) -> StreamError {
    StreamError::BadTypeEncoding {
        encoding: data.to_vec(),
        offset,
    }
}
