//! Wire types for the custodial execution API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use la_domain::tool::ToolOutcome;

/// Connection settings for [`crate::RestCustodian`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustodianConfig {
    pub base_url: String,
    /// Opaque per-request credential; threaded through as a header.
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    2
}

impl Default for CustodianConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8480".into(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
        }
    }
}

/// POST /v1/execute and /v1/execute/write — request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExecRequestDto<'a> {
    pub owner_id: &'a str,
    pub tool: &'a str,
    pub input: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_id: Option<&'a str>,
}

/// Response body shared by both execution endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExecResponseDto {
    pub success: bool,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub requires_confirmation: bool,
}

impl From<ExecResponseDto> for ToolOutcome {
    fn from(dto: ExecResponseDto) -> Self {
        ToolOutcome {
            success: dto.success,
            data: dto.data,
            error: dto.error,
            requires_confirmation: dto.requires_confirmation,
        }
    }
}
