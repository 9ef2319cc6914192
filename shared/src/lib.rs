use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of one mailbox's catch-up run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Ok,
    Skipped,
    ExpiredReset,
    Error,
}

/// Per-mailbox result returned by the catch-up orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRunResult {
    pub status: SyncStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_processed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_processed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncRunResult {
    pub fn skipped() -> Self {
        Self {
            status: SyncStatus::Skipped,
            pages_processed: None,
            items_processed: None,
            error: None,
        }
    }

    pub fn ok(pages: u32, items: u32) -> Self {
        Self {
            status: SyncStatus::Ok,
            pages_processed: Some(pages),
            items_processed: Some(items),
            error: None,
        }
    }

    pub fn expired_reset(pages: u32, items: u32) -> Self {
        Self {
            status: SyncStatus::ExpiredReset,
            pages_processed: Some(pages),
            items_processed: Some(items),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: SyncStatus::Error,
            pages_processed: None,
            items_processed: None,
            error: Some(message.into()),
        }
    }
}

/// One entry in the aggregated fleet result, keyed by mailbox address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSyncOutcome {
    pub email: String,
    #[serde(flatten)]
    pub result: SyncRunResult,
}

/// Aggregated result of a fleet-wide catch-up run.
///
/// Always contains exactly one entry per selected mailbox, including the
/// ones that failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetResult {
    pub accounts: Vec<AccountSyncOutcome>,
}

/// Minimal mailbox identity passed around by the fleet runner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRef {
    pub id: Uuid,
    pub email: String,
}

/// One summarized message in a compiled digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestItem {
    pub from: String,
    pub subject: String,
    pub content: String,
}

/// Extract the display name from a "Name <addr>" header, falling back to
/// the bare address.
pub fn extract_name_from_email(from: &str) -> String {
    let from = from.trim();

    if let Some(bracket_start) = from.find('<') {
        let name = from[..bracket_start].trim().trim_matches('"').trim();
        if !name.is_empty() {
            return name.to_string();
        }
        if let Some(bracket_end) = from.rfind('>') {
            return from[bracket_start + 1..bracket_end].trim().to_string();
        }
    }

    from.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_display_name() {
        assert_eq!(
            extract_name_from_email("John Doe <john@example.com>"),
            "John Doe"
        );
        assert_eq!(
            extract_name_from_email("\"Doe, Jane\" <jane@example.com>"),
            "Doe, Jane"
        );
    }

    #[test]
    fn falls_back_to_address() {
        assert_eq!(
            extract_name_from_email("<noreply@example.com>"),
            "noreply@example.com"
        );
        assert_eq!(extract_name_from_email("plain@example.com"), "plain@example.com");
    }

    #[test]
    fn sync_status_serializes_snake_case() {
        let json = serde_json::to_string(&SyncStatus::ExpiredReset).unwrap();
        assert_eq!(json, "\"expired_reset\"");
    }

    #[test]
    fn skipped_result_omits_counts() {
        let json = serde_json::to_value(SyncRunResult::skipped()).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "skipped" }));
    }
}
