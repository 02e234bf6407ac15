/*!
 The low-level layer of the `typedstream` decoder.

 This layer tokenizes the binary format into a flat, forward-only stream of
 [`events::Event`]s without materializing an object graph: the header, shared
 back-references, class chains, and typed value groups all surface as events
 in stream order. Large streams can be skimmed this way while retaining only
 the shared-reference tables.

 The high-level [`crate::archiver`] layer is built on top of this one.
*/

pub mod byte_reader;
pub mod events;
pub mod reader;
pub mod refs;
mod tests;
