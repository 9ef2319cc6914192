//! Persistence of the last fully-synchronized cursor, one per mailbox.

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::{self, DbPool};

/// Point reads/writes against the mailbox account's persisted cursor
/// field. `write` is the only state mutation visible outside a run.
#[async_trait]
pub trait CursorStore {
    async fn read(&self, account_id: Uuid) -> anyhow::Result<Option<String>>;
    async fn write(&self, account_id: Uuid, cursor: &str) -> anyhow::Result<()>;
}

/// Cursor store backed by the `mailbox_accounts` table
pub struct DbCursorStore {
    pool: DbPool,
}

impl DbCursorStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CursorStore for DbCursorStore {
    async fn read(&self, account_id: Uuid) -> anyhow::Result<Option<String>> {
        let mut conn = self.pool.get().await?;
        let account = db::mailbox_accounts::get_by_id(&mut conn, account_id).await?;
        Ok(account.last_synced_cursor)
    }

    async fn write(&self, account_id: Uuid, cursor: &str) -> anyhow::Result<()> {
        let mut conn = self.pool.get().await?;
        db::mailbox_accounts::update_last_synced_cursor(&mut conn, account_id, cursor).await
    }
}
