//! The history catch-up engine.
//!
//! A cursor-based, paginated reconciliation loop that replays mailbox
//! changes missed between two provider cursors. The orchestrator drives
//! fetch, dispatch and cursor advancement for one mailbox; the fleet
//! runner applies it across all eligible mailboxes with per-account
//! isolation.

pub mod cursor;
pub mod dispatcher;
pub mod fetcher;
pub mod fleet;
pub mod orchestrator;
pub mod service;

use uuid::Uuid;

use crate::models::AutomationRule;

/// Records per fetch call
pub const PAGE_SIZE: u32 = 500;

/// Kind of one atomic mailbox change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    MessageAdded,
    LabelAdded,
    LabelRemoved,
}

/// One atomic change event, scoped to a message id.
///
/// The provider may emit several records for the same message within and
/// across pages; they are delivered downstream as-is, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub message_id: String,
    pub kind: ChangeKind,
    pub label_ids: Vec<String>,
}

/// One fetch result: ordered records plus an optional continuation token
#[derive(Debug, Clone, Default)]
pub struct ChangePage {
    pub records: Vec<ChangeRecord>,
    pub next_page_token: Option<String>,
}

/// Per-mailbox context handed to the dispatcher and rule evaluator
#[derive(Debug, Clone)]
pub struct MailboxContext {
    pub account_id: Uuid,
    pub email: String,
    pub ai_access: bool,
    pub rules: Vec<AutomationRule>,
}
