//! Tool-failure taxonomy and prevention hints.
//!
//! Classification is lowercased substring matching — coarse on purpose.
//! The category and hint land in trace metadata so recorded memories
//! teach the model how to avoid the same failure next time.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    InsufficientBalance,
    NotFound,
    InvalidInput,
    PermissionDenied,
    Timeout,
    RateLimit,
    NetworkError,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::InsufficientBalance => "insufficient_balance",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::InvalidInput => "invalid_input",
            ErrorCategory::PermissionDenied => "permission_denied",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::RateLimit => "rate_limit",
            ErrorCategory::NetworkError => "network_error",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

pub fn classify(error: &str) -> ErrorCategory {
    let e = error.to_lowercase();
    if e.contains("insufficient") {
        ErrorCategory::InsufficientBalance
    } else if e.contains("not found")
        || e.contains("no such")
        || e.contains("no pending")
        || e.contains("does not exist")
        || e.contains("unknown user")
    {
        ErrorCategory::NotFound
    } else if e.contains("invalid") || e.contains("malformed") || e.contains("missing required") {
        ErrorCategory::InvalidInput
    } else if e.contains("permission") || e.contains("unauthorized") || e.contains("forbidden") {
        ErrorCategory::PermissionDenied
    } else if e.contains("rate limit") || e.contains("too many requests") {
        ErrorCategory::RateLimit
    } else if e.contains("timeout") || e.contains("timed out") || e.contains("deadline") {
        ErrorCategory::Timeout
    } else if e.contains("network") || e.contains("connection") || e.contains("unreachable") {
        ErrorCategory::NetworkError
    } else {
        ErrorCategory::Unknown
    }
}

/// A hint for avoiding this `(action, category)` failure again.
pub fn prevention_hint(action: &str, category: ErrorCategory) -> Option<&'static str> {
    use ErrorCategory::*;
    match (action, category) {
        ("send_money", InsufficientBalance) | ("schedule_payment", InsufficientBalance) => Some(
            "Check get_balance first; pending scheduled payments reduce the available balance.",
        ),
        ("send_money", NotFound) => {
            Some("Resolve the recipient with search_users before sending.")
        }
        ("get_profile", NotFound) => {
            Some("Look up the user id with search_users before fetching a profile.")
        }
        ("cancel_scheduled_payment", NotFound) => {
            Some("List scheduled payments first; only pending payments can be cancelled.")
        }
        (_, InvalidInput) => {
            Some("Re-read the tool's input schema and resend with every required field.")
        }
        (_, RateLimit) => Some("Back off before retrying; avoid rapid repeated calls."),
        (_, Timeout) | (_, NetworkError) => {
            Some("Retry once; if it fails again, report the outage instead of retrying further.")
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_substring() {
        assert_eq!(
            classify("insufficient available balance: requested 20 USDC"),
            ErrorCategory::InsufficientBalance
        );
        assert_eq!(classify("user not found"), ErrorCategory::NotFound);
        assert_eq!(
            classify("no pending scheduled action with id x"),
            ErrorCategory::NotFound
        );
        assert_eq!(
            classify("invalid input: missing required field 'amount'"),
            ErrorCategory::InvalidInput
        );
        assert_eq!(
            classify("permission denied (403 Forbidden)"),
            ErrorCategory::PermissionDenied
        );
        assert_eq!(classify("request timed out"), ErrorCategory::Timeout);
        assert_eq!(classify("rate limit exceeded"), ErrorCategory::RateLimit);
        assert_eq!(classify("connection reset by peer"), ErrorCategory::NetworkError);
        assert_eq!(classify("something odd happened"), ErrorCategory::Unknown);
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(classify("INSUFFICIENT BALANCE"), ErrorCategory::InsufficientBalance);
        assert_eq!(classify("User NOT FOUND"), ErrorCategory::NotFound);
    }

    #[test]
    fn hints_are_action_aware() {
        assert!(prevention_hint("send_money", ErrorCategory::InsufficientBalance)
            .unwrap()
            .contains("get_balance"));
        assert!(prevention_hint("send_money", ErrorCategory::NotFound)
            .unwrap()
            .contains("search_users"));
        assert!(prevention_hint("get_balance", ErrorCategory::Unknown).is_none());
        // Generic categories hint regardless of action.
        assert!(prevention_hint("anything", ErrorCategory::InvalidInput).is_some());
    }
}
