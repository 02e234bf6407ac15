/*!
 Errors that can happen when reconstructing the object graph from a `typedstream`.
*/

use std::{
    fmt::{Display, Formatter, Result},
    string::FromUtf8Error,
};

use crate::error::stream::StreamError;

/// Errors that can happen when reconstructing the object graph from a `typedstream`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveError {
    /// The underlying event stream failed
    Stream(StreamError),
    /// The caller's expected type encodings differ from the ones declared in the stream
    TypeMismatch { expected: String, actual: String },
    /// The event stream produced an event the current decoding step cannot accept
    UnexpectedEvent { expected: &'static str, found: String },
    /// A registered class decoder does not understand the archived class version
    UnsupportedClassVersion { class: String, version: i64 },
    /// A registered class decoder failed; the class chain is attached for diagnostics
    ClassDecoderFailed { class: String, source: Box<ArchiveError> },
    /// Archived string data is not valid UTF-8
    StringParseError(FromUtf8Error),
    /// The archive holds no root value
    NoRootValue,
    /// The archive holds more than one root value
    MultipleRootValues(usize),
}

impl Display for ArchiveError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            ArchiveError::Stream(why) => write!(fmt, "{why}"),
            ArchiveError::TypeMismatch { expected, actual } => {
                write!(
                    fmt,
                    "Expected type encodings {expected:?}, but the stream declared {actual:?}"
                )
            }
            ArchiveError::UnexpectedEvent { expected, found } => {
                write!(fmt, "Expected {expected}, found {found}")
            }
            ArchiveError::UnsupportedClassVersion { class, version } => {
                write!(fmt, "Unsupported version {version} for class {class}")
            }
            ArchiveError::ClassDecoderFailed { class, source } => {
                write!(fmt, "Failed to decode object of class {class}: {source}")
            }
            ArchiveError::StringParseError(why) => {
                write!(fmt, "Unable to parse string data: {why}")
            }
            ArchiveError::NoRootValue => write!(fmt, "Archive contains no values"),
            ArchiveError::MultipleRootValues(count) => {
                write!(fmt, "Archive contains {count} root values (expected exactly one)")
            }
        }
    }
}

impl From<StreamError> for ArchiveError {
    fn from(why: StreamError) -> Self {
        ArchiveError::Stream(why)
    }
}
