//! LLM collaborator contract.
//!
//! The engine is agnostic to which model backs it; adapters implement
//! [`ModelProvider`] and translate between the domain conversation model
//! and their wire format. This crate also ships the deterministic stream
//! accumulator and a scripted in-process provider for tests.

pub mod accumulate;
pub mod scripted;
mod traits;

pub use traits::{ChatRequest, ChatResponse, ModelProvider, WireTool};
