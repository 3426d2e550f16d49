//! Tool surface — registry, executor adapter, and the built-in
//! financial tool set.
//!
//! Tools declare themselves with a [`la_domain::tool::ToolDefinition`]
//! and execute either through an in-process handler or through the
//! custodial execution API. The [`ToolExecutor`] gives the engine (and
//! the scheduler) one uniform call surface over both.

pub mod builtin;
pub mod executor;
pub mod registry;
pub mod tool;

pub use executor::ToolExecutor;
pub use registry::{RegistryError, ToolRegistry};
pub use tool::{Tool, ToolHandler};
