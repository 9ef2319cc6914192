//! Production wiring of the catch-up engine.
//!
//! Both invocation adapters (the scheduled HTTP trigger and the CLI)
//! depend on this one entry point rather than deriving their own loop.

use anyhow::Result;
use async_trait::async_trait;
use shared::{AccountRef, FleetResult, SyncRunResult};

use super::cursor::DbCursorStore;
use super::dispatcher::RecordDispatcher;
use super::fleet::{run_fleet, AccountSync};
use super::orchestrator::CatchUpOrchestrator;
use super::MailboxContext;
use crate::config::AppConfig;
use crate::db::{self, DbPool};
use crate::gmail::client::{ClientAuth, GmailClient};
use crate::gmail::history::GmailHistoryFetcher;
use crate::rules::ActionEvaluator;

/// One mailbox's catch-up pass against the real Gmail backend
pub struct GmailAccountSync {
    pool: DbPool,
    config: AppConfig,
}

#[async_trait]
impl AccountSync for GmailAccountSync {
    async fn sync(&self, account_ref: &AccountRef) -> Result<SyncRunResult> {
        let mut conn = self.pool.get().await?;
        let account = db::mailbox_accounts::get_by_id(&mut conn, account_ref.id).await?;

        let Some((_, refresh_token)) = account.tokens() else {
            tracing::warn!(email = %account.email, "Missing tokens, skipping");
            return Ok(SyncRunResult::skipped());
        };

        let client = GmailClient::connect(
            ClientAuth {
                refresh_token: refresh_token.to_string(),
                client_id: self.config.google_client_id.clone(),
                client_secret: self.config.google_client_secret.clone(),
            },
            &account.email,
        )
        .await?;

        let rules = db::automation_rules::list_active_for_account(&mut conn, account.id).await?;
        drop(conn);

        let ctx = MailboxContext {
            account_id: account.id,
            email: account.email.clone(),
            ai_access: account.ai_access,
            rules,
        };

        let fetcher = GmailHistoryFetcher::new(client.clone());
        let dispatcher = RecordDispatcher::new(ActionEvaluator::new(client));
        let cursors = DbCursorStore::new(self.pool.clone());

        CatchUpOrchestrator::new(&fetcher, &dispatcher, &cursors)
            .run(account_ref, &ctx)
            .await
    }
}

/// Select all eligible mailboxes and run the catch-up over them.
///
/// `email_filter` narrows the fleet to one address, case-insensitively.
pub async fn catch_up_fleet(
    pool: &DbPool,
    config: &AppConfig,
    email_filter: Option<&str>,
) -> Result<FleetResult> {
    let mut conn = pool.get().await?;
    let accounts = db::mailbox_accounts::list_eligible(&mut conn, email_filter).await?;
    drop(conn);

    let refs: Vec<AccountRef> = accounts
        .into_iter()
        .map(|account| AccountRef {
            id: account.id,
            email: account.email,
        })
        .collect();

    let syncer = GmailAccountSync {
        pool: pool.clone(),
        config: config.clone(),
    };

    Ok(run_fleet(&refs, &syncer).await)
}
