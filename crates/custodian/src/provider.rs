//! The `Custodian` trait — interface to the custodial execution API.

use async_trait::async_trait;
use serde_json::Value;

use la_domain::error::Result;
use la_domain::tool::ToolOutcome;

/// Abstraction over the custodial execution API surface.
///
/// Reads go through [`Custodian::execute`]. Writes go through
/// [`Custodian::execute_write`], which models the collaborator's
/// two-phase submit: a non-empty `confirmation_id` asks the collaborator
/// to open its own confirmation handle, while an empty one means the
/// human caller already approved and only the confirm leg runs.
#[async_trait]
pub trait Custodian: Send + Sync {
    async fn execute(
        &self,
        owner_id: &str,
        tool: &str,
        input: &Value,
        request_id: &str,
    ) -> Result<ToolOutcome>;

    async fn execute_write(
        &self,
        owner_id: &str,
        tool: &str,
        input: &Value,
        request_id: &str,
        confirmation_id: &str,
    ) -> Result<ToolOutcome>;
}
