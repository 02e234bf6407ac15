/*!
 Application-level concerns: runtime errors surfaced to the user.
*/

pub mod error;
