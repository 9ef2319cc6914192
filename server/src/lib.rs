//! Incremental mailbox synchronization service.
//!
//! Catches a mailbox's change history up from its last synced cursor,
//! routes the observed changes through automation rules, and compiles a
//! periodic AI digest of recent messages. Exposed through two thin
//! adapters over the same engine: a scheduled HTTP trigger and a CLI.

pub mod config;
pub mod db;
pub mod digest;
pub mod error;
pub mod gmail;
pub mod handlers;
pub mod models;
pub mod rules;
pub mod schema;
pub mod sync;
