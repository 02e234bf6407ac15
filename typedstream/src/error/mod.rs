/*!
 This module defines the errors that can happen while decoding `typedstream` data.
*/

pub mod archiver;
pub mod stream;
