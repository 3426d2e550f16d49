//! Shared domain types for LedgerAgent crates.
//!
//! Everything here is provider- and transport-agnostic: the conversation
//! model, tool definitions and outcomes, the ReAct trace record, the
//! JSON-Schema builder, and token/stream accounting. Higher crates
//! (providers, tools, memory, schedules, engine) all speak these types.

pub mod error;
pub mod message;
pub mod schema;
pub mod stream;
pub mod tool;
pub mod trace;

pub use error::{Error, Result};
