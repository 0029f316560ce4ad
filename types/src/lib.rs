//! Core value types for lspcheck.
//!
//! Pure data with no IO and no async. Everything here mirrors the shapes the
//! Language Server Protocol puts on the wire, so values round-trip through
//! `serde_json` unchanged and can be compared structurally by the assertion
//! oracle.

mod counter;
mod diagnostic;
mod position;

pub use counter::Counter;
pub use diagnostic::{Diagnostic, PublishReport};
pub use position::{Location, Position, Range};
