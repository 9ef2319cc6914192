// Database models for Diesel
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

/// Database representation of a mailbox account under sync.
///
/// The `last_synced_cursor` column is the only piece of catch-up state
/// that survives across runs.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::mailbox_accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MailboxAccount {
    pub id: Uuid,
    pub email: String,
    pub provider: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub disconnected_at: Option<DateTime<Utc>>,
    pub last_synced_cursor: Option<String>,
    pub ai_access: bool,
    pub created_at: DateTime<Utc>,
}

impl MailboxAccount {
    /// Credential pair, present only when both tokens are stored.
    pub fn tokens(&self) -> Option<(&str, &str)> {
        match (self.access_token.as_deref(), self.refresh_token.as_deref()) {
            (Some(access), Some(refresh)) => Some((access, refresh)),
            _ => None,
        }
    }
}

/// Database representation of one automation rule
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::automation_rules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AutomationRule {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub from_contains: Option<String>,
    pub subject_contains: Option<String>,
    pub action: String,
    pub label_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
