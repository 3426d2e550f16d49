//! Read-only tools, forwarded to the custodial API.

use la_domain::schema::ObjectSchema;
use la_domain::tool::ToolDefinition;

use crate::tool::Tool;

pub fn get_balance() -> Tool {
    Tool::custodial(ToolDefinition {
        name: "get_balance".into(),
        description: "Get the wallet balance, optionally for a single currency.".into(),
        input_schema: ObjectSchema::new()
            .string_property("currency", "Currency code (e.g. USDC). Omit for all balances.")
            .with_thought(false)
            .build(),
        requires_confirmation: false,
        summary_template: None,
    })
}

pub fn search_users() -> Tool {
    Tool::custodial(ToolDefinition {
        name: "search_users".into(),
        description: "Search for users by handle or display name. Returns user ids.".into(),
        input_schema: ObjectSchema::new()
            .string_property("query", "Handle or name to search for (e.g. @alice)")
            .require(&["query"])
            .with_thought(false)
            .build(),
        requires_confirmation: false,
        summary_template: None,
    })
}

pub fn get_profile() -> Tool {
    Tool::custodial(ToolDefinition {
        name: "get_profile".into(),
        description: "Fetch a user's public profile by user id.".into(),
        input_schema: ObjectSchema::new()
            .string_property("user_id", "User id (from search_users)")
            .require(&["user_id"])
            .with_thought(false)
            .build(),
        requires_confirmation: false,
        summary_template: None,
    })
}

pub fn get_transactions() -> Tool {
    Tool::custodial(ToolDefinition {
        name: "get_transactions".into(),
        description: "List recent transactions, newest first.".into(),
        input_schema: ObjectSchema::new()
            .integer_property("limit", "Maximum entries to return (default 20)")
            .with_thought(false)
            .build(),
        requires_confirmation: false,
        summary_template: None,
    })
}

pub fn analyze_spending() -> Tool {
    Tool::custodial(ToolDefinition {
        name: "analyze_spending".into(),
        description: "Summarise spending by category over a period.".into(),
        input_schema: ObjectSchema::new()
            .enum_property(
                "period",
                "Aggregation window",
                &["week", "month", "quarter", "year"],
            )
            .with_thought(false)
            .build(),
        requires_confirmation: false,
        summary_template: None,
    })
}
