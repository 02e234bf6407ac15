/*!
 Errors that can happen during the application's runtime
*/

use std::{
    fmt::{Display, Formatter, Result},
    io::Error as IoError,
    path::PathBuf,
};

use typedstream::error::{archiver::ArchiveError, stream::StreamError};

/// Errors that can happen during the application's runtime
#[derive(Debug)]
pub enum RuntimeError {
    ReadError(IoError, PathBuf),
    DiskError(IoError),
    StreamError(StreamError),
    ArchiveError(ArchiveError),
}

impl Display for RuntimeError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            RuntimeError::ReadError(why, path) => write!(fmt, "{why}: {path:?}"),
            RuntimeError::DiskError(why) => write!(fmt, "{why}"),
            RuntimeError::StreamError(why) => write!(fmt, "{why}"),
            RuntimeError::ArchiveError(why) => write!(fmt, "{why}"),
        }
    }
}
