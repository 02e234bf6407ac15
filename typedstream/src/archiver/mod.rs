/*!
 The high-level layer of the `typedstream` decoder.

 The [`unarchiver::Unarchiver`] consumes the event stream produced by
 [`crate::stream::reader::TypedStreamReader`] and rebuilds the archived value
 graph: scalars, strings, arrays, structs, and class-tagged objects with
 shared identity preserved. Object contents are dispatched by class name to
 the decoders in a [`registry::ClassRegistry`]; objects of unknown classes are
 kept in a generic form that preserves their raw typed value groups.
*/

pub mod classes;
pub mod models;
pub mod registry;
pub mod unarchiver;
mod tests;
