//! Fleet-wide catch-up.
//!
//! Mailboxes are processed strictly sequentially. That is an isolation
//! and rate-limit choice, not a correctness requirement: one stuck or
//! failing account must not starve the rest, and per-account failures
//! become recorded results instead of aborting the loop.

use async_trait::async_trait;
use shared::{AccountRef, AccountSyncOutcome, FleetResult, SyncRunResult};

/// One mailbox's full catch-up pass, behind a seam so the fleet loop can
/// be exercised without a live provider.
#[async_trait]
pub trait AccountSync {
    async fn sync(&self, account: &AccountRef) -> anyhow::Result<SyncRunResult>;
}

/// Run the catch-up over all selected accounts, one at a time.
///
/// The returned result always contains exactly one entry per account.
pub async fn run_fleet<S: AccountSync + Sync>(accounts: &[AccountRef], syncer: &S) -> FleetResult {
    tracing::info!(account_count = accounts.len(), "Starting catch-up");

    let mut results = Vec::with_capacity(accounts.len());

    for account in accounts {
        let result = match syncer.sync(account).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(email = %account.email, error = ?e, "Failed to catch up account");
                SyncRunResult::error(e.to_string())
            }
        };

        results.push(AccountSyncOutcome {
            email: account.email.clone(),
            result,
        });
    }

    FleetResult { accounts: results }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use shared::SyncStatus;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct FlakyMiddleSync {
        attempted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AccountSync for FlakyMiddleSync {
        async fn sync(&self, account: &AccountRef) -> anyhow::Result<SyncRunResult> {
            self.attempted.lock().unwrap().push(account.email.clone());
            match account.email.as_str() {
                "two@example.com" => Err(anyhow!("dispatch exploded")),
                "three@example.com" => Ok(SyncRunResult::skipped()),
                _ => Ok(SyncRunResult::ok(2, 5)),
            }
        }
    }

    fn accounts() -> Vec<AccountRef> {
        ["one@example.com", "two@example.com", "three@example.com"]
            .iter()
            .map(|email| AccountRef {
                id: Uuid::new_v4(),
                email: email.to_string(),
            })
            .collect()
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_fleet() {
        let syncer = FlakyMiddleSync {
            attempted: Mutex::new(vec![]),
        };

        let fleet = run_fleet(&accounts(), &syncer).await;

        assert_eq!(fleet.accounts.len(), 3);
        assert_eq!(fleet.accounts[0].result.status, SyncStatus::Ok);
        assert_eq!(fleet.accounts[1].result.status, SyncStatus::Error);
        assert_eq!(
            fleet.accounts[1].result.error.as_deref(),
            Some("dispatch exploded")
        );
        assert_eq!(fleet.accounts[2].result.status, SyncStatus::Skipped);

        // the third account was still attempted, in order
        let attempted = syncer.attempted.lock().unwrap();
        assert_eq!(
            *attempted,
            vec!["one@example.com", "two@example.com", "three@example.com"]
        );
    }

    #[tokio::test]
    async fn empty_fleet_yields_empty_result() {
        let syncer = FlakyMiddleSync {
            attempted: Mutex::new(vec![]),
        };

        let fleet = run_fleet(&[], &syncer).await;
        assert!(fleet.accounts.is_empty());
    }
}
