#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

pub mod archiver;
pub mod encoding;
pub mod error;
pub mod stream;

pub use archiver::unarchiver::{unarchive_all_from_bytes, unarchive_from_bytes};
