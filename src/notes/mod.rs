//! Loan notes codec
//!
//! A loan's notes field mixes human-readable text with a small line grammar
//! describing per-resource damage and suggestions reported on return. This
//! module writes that grammar and reads it back.

pub mod parser;
pub mod writer;

pub use parser::{decode, latest_event, LineKind, DEFAULT_RESOURCE, EVENT_SEPARATOR};
pub use writer::{append_event, encode, is_writable_resource_id};
