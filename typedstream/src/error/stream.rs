/*!
 Errors that can happen when tokenizing the `typedstream` byte format.
*/

use std::fmt::{Display, Formatter, Result};

use crate::stream::events::ReferenceKind;

/// Errors that can happen when tokenizing the `typedstream` byte format
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The signature string in the header is not one of the two known variants
    InvalidSignature(Vec<u8>),
    /// The streamer version in the header is not the one this crate supports
    UnsupportedStreamerVersion(u8),
    /// The byte source ran out in the middle of a value
    Truncated { offset: usize, needed: usize },
    /// A head byte that cannot be interpreted the way the current context requires
    MalformedHead { head: u8, offset: usize },
    /// A reference to an ID that has not been assigned yet in its namespace
    UnknownReference { kind: ReferenceKind, number: u64 },
    /// A type encoding string that violates the encoding grammar
    BadTypeEncoding { encoding: Vec<u8>, offset: usize },
    /// A decoded integer does not fit the range of its declared type encoding
    ValueOutOfRange { encoding: char, value: i64 },
    /// A type encoding the stream reader declines to produce values for
    UnsupportedType(String),
}

impl Display for StreamError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            StreamError::InvalidSignature(signature) => {
                write!(
                    fmt,
                    "Invalid typedstream signature: {:?}",
                    String::from_utf8_lossy(signature)
                )
            }
            StreamError::UnsupportedStreamerVersion(version) => match version {
                3 => write!(fmt, "Old NeXTSTEP streamer version (3) is not supported"),
                other => write!(fmt, "Unsupported streamer version: {other}"),
            },
            StreamError::Truncated { offset, needed } => {
                write!(
                    fmt,
                    "Unexpected end of stream at offset {offset:#x}: needed {needed} more bytes"
                )
            }
            StreamError::MalformedHead { head, offset } => {
                write!(
                    fmt,
                    "Head byte {head:#04x} at offset {offset:#x} is not valid in this context"
                )
            }
            StreamError::UnknownReference { kind, number } => {
                write!(fmt, "Reference to unknown {kind} #{number}")
            }
            StreamError::BadTypeEncoding { encoding, offset } => {
                write!(
                    fmt,
                    "Malformed type encoding {:?} at offset {offset}",
                    String::from_utf8_lossy(encoding)
                )
            }
            StreamError::ValueOutOfRange { encoding, value } => {
                write!(fmt, "Value {value} does not fit type encoding '{encoding}'")
            }
            StreamError::UnsupportedType(encoding) => {
                write!(fmt, "Cannot decode values of type encoding {encoding:?}")
            }
        }
    }
}
