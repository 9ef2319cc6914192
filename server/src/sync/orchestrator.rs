//! Catch-up state machine for one mailbox.
//!
//! Validating -> Fetching -> Dispatching -> Advancing -> Done, with error
//! exits at the fetch/dispatch states leading to either an expiry reset
//! or a failed run. Pages are strictly sequential; there is never more
//! than one in-flight fetch per mailbox.

use shared::{AccountRef, SyncRunResult};

use super::cursor::CursorStore;
use super::dispatcher::ChangeDispatcher;
use super::fetcher::{FetchError, FetchParams, HistoryFetcher};
use super::{MailboxContext, PAGE_SIZE};

pub struct CatchUpOrchestrator<'a, F, D, S> {
    fetcher: &'a F,
    dispatcher: &'a D,
    cursors: &'a S,
}

impl<'a, F, D, S> CatchUpOrchestrator<'a, F, D, S>
where
    F: HistoryFetcher + Sync,
    D: ChangeDispatcher + Sync,
    S: CursorStore + Sync,
{
    pub fn new(fetcher: &'a F, dispatcher: &'a D, cursors: &'a S) -> Self {
        Self {
            fetcher,
            dispatcher,
            cursors,
        }
    }

    /// Run one catch-up pass for the mailbox.
    ///
    /// Returns `Err` only for non-expiry failures; the fleet runner
    /// converts those into per-account `error` results.
    pub async fn run(
        &self,
        account: &AccountRef,
        ctx: &MailboxContext,
    ) -> anyhow::Result<SyncRunResult> {
        // Snapshot of the provider's current cursor. Used only as the
        // reset target on expiry and as the advance target for an empty
        // run, never as the loop's moving target.
        let current_cursor = match self.fetcher.current_cursor().await? {
            Some(cursor) => cursor,
            None => {
                tracing::warn!(email = %account.email, "No current cursor from provider");
                return Ok(SyncRunResult::skipped());
            }
        };

        let start_cursor = match self.cursors.read(account.id).await? {
            Some(cursor) => cursor,
            None => {
                tracing::warn!(email = %account.email, "No stored cursor, initial sync pending");
                return Ok(SyncRunResult::skipped());
            }
        };

        tracing::info!(
            email = %account.email,
            start_cursor = %start_cursor,
            current_cursor = %current_cursor,
            "Catching up history"
        );

        let mut page_token: Option<String> = None;
        let mut pages_processed: u32 = 0;
        let mut total_items: u32 = 0;

        loop {
            let fetched = self
                .fetcher
                .fetch(FetchParams {
                    start_cursor: &start_cursor,
                    page_token: page_token.as_deref(),
                    page_size: PAGE_SIZE,
                })
                .await;

            let page = match fetched {
                Ok(page) => page,
                Err(FetchError::CursorExpired) => {
                    tracing::warn!(
                        email = %account.email,
                        expired_cursor = %start_cursor,
                        new_cursor = %current_cursor,
                        "Cursor expired, resetting to current"
                    );
                    self.cursors.write(account.id, &current_cursor).await?;
                    return Ok(SyncRunResult::expired_reset(pages_processed, total_items));
                }
                Err(FetchError::Provider(e)) => return Err(e),
            };

            pages_processed += 1;

            if !page.records.is_empty() {
                total_items += page.records.len() as u32;
                self.dispatcher.dispatch(&page, ctx).await?;
            }

            tracing::info!(
                email = %account.email,
                page = pages_processed,
                items_on_page = page.records.len(),
                has_more = page.next_page_token.is_some(),
                "Processed history page"
            );

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        // The stored cursor advances only when nothing happened since the
        // last sync. A run that processed items leaves it untouched; the
        // webhook path owns advancement in that case.
        if total_items == 0 {
            self.cursors.write(account.id, &current_cursor).await?;
        }

        Ok(SyncRunResult::ok(pages_processed, total_items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{ChangeKind, ChangePage, ChangeRecord};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use shared::SyncStatus;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Scripted fetcher: pops one outcome per fetch call, records the
    /// params each call was made with.
    struct ScriptedFetcher {
        current: Option<String>,
        script: Mutex<Vec<Result<ChangePage, FetchError>>>,
        calls: Mutex<Vec<(String, Option<String>)>>,
    }

    impl ScriptedFetcher {
        fn new(current: Option<&str>, script: Vec<Result<ChangePage, FetchError>>) -> Self {
            Self {
                current: current.map(str::to_string),
                script: Mutex::new(script),
                calls: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl HistoryFetcher for ScriptedFetcher {
        async fn current_cursor(&self) -> anyhow::Result<Option<String>> {
            Ok(self.current.clone())
        }

        async fn fetch(&self, params: FetchParams<'_>) -> Result<ChangePage, FetchError> {
            self.calls.lock().unwrap().push((
                params.start_cursor.to_string(),
                params.page_token.map(str::to_string),
            ));
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                panic!("fetch called more times than scripted");
            }
            script.remove(0)
        }
    }

    struct CollectingDispatcher {
        dispatched: Mutex<Vec<String>>,
        fail: bool,
    }

    impl CollectingDispatcher {
        fn new() -> Self {
            Self {
                dispatched: Mutex::new(vec![]),
                fail: false,
            }
        }
    }

    #[async_trait]
    impl ChangeDispatcher for CollectingDispatcher {
        async fn dispatch(&self, page: &ChangePage, _ctx: &MailboxContext) -> anyhow::Result<()> {
            if self.fail {
                return Err(anyhow!("dispatch failed"));
            }
            let mut dispatched = self.dispatched.lock().unwrap();
            dispatched.extend(page.records.iter().map(|r| r.message_id.clone()));
            Ok(())
        }
    }

    struct FakeCursorStore {
        stored: Mutex<Option<String>>,
        writes: Mutex<Vec<String>>,
    }

    impl FakeCursorStore {
        fn with(cursor: Option<&str>) -> Self {
            Self {
                stored: Mutex::new(cursor.map(str::to_string)),
                writes: Mutex::new(vec![]),
            }
        }

        fn writes(&self) -> Vec<String> {
            self.writes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CursorStore for FakeCursorStore {
        async fn read(&self, _account_id: Uuid) -> anyhow::Result<Option<String>> {
            Ok(self.stored.lock().unwrap().clone())
        }

        async fn write(&self, _account_id: Uuid, cursor: &str) -> anyhow::Result<()> {
            *self.stored.lock().unwrap() = Some(cursor.to_string());
            self.writes.lock().unwrap().push(cursor.to_string());
            Ok(())
        }
    }

    fn account() -> AccountRef {
        AccountRef {
            id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
        }
    }

    fn ctx() -> MailboxContext {
        MailboxContext {
            account_id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            ai_access: false,
            rules: vec![],
        }
    }

    fn page(ids: &[&str], next: Option<&str>) -> ChangePage {
        ChangePage {
            records: ids
                .iter()
                .map(|id| ChangeRecord {
                    message_id: id.to_string(),
                    kind: ChangeKind::MessageAdded,
                    label_ids: vec![],
                })
                .collect(),
            next_page_token: next.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn skips_when_provider_has_no_current_cursor() {
        let fetcher = ScriptedFetcher::new(None, vec![]);
        let dispatcher = CollectingDispatcher::new();
        let cursors = FakeCursorStore::with(Some("100"));

        let result = CatchUpOrchestrator::new(&fetcher, &dispatcher, &cursors)
            .run(&account(), &ctx())
            .await
            .unwrap();

        assert_eq!(result.status, SyncStatus::Skipped);
        assert!(cursors.writes().is_empty());
    }

    #[tokio::test]
    async fn skips_when_no_stored_cursor() {
        let fetcher = ScriptedFetcher::new(Some("200"), vec![]);
        let dispatcher = CollectingDispatcher::new();
        let cursors = FakeCursorStore::with(None);

        let result = CatchUpOrchestrator::new(&fetcher, &dispatcher, &cursors)
            .run(&account(), &ctx())
            .await
            .unwrap();

        assert_eq!(result.status, SyncStatus::Skipped);
        assert!(cursors.writes().is_empty());
    }

    #[tokio::test]
    async fn empty_run_advances_cursor_to_snapshot() {
        let fetcher = ScriptedFetcher::new(Some("200"), vec![Ok(page(&[], None))]);
        let dispatcher = CollectingDispatcher::new();
        let cursors = FakeCursorStore::with(Some("100"));

        let result = CatchUpOrchestrator::new(&fetcher, &dispatcher, &cursors)
            .run(&account(), &ctx())
            .await
            .unwrap();

        assert_eq!(result.status, SyncStatus::Ok);
        assert_eq!(result.pages_processed, Some(1));
        assert_eq!(result.items_processed, Some(0));
        assert_eq!(cursors.writes(), vec!["200"]);
    }

    #[tokio::test]
    async fn run_with_items_does_not_advance_cursor() {
        let fetcher = ScriptedFetcher::new(Some("200"), vec![Ok(page(&["m1", "m2"], None))]);
        let dispatcher = CollectingDispatcher::new();
        let cursors = FakeCursorStore::with(Some("100"));

        let result = CatchUpOrchestrator::new(&fetcher, &dispatcher, &cursors)
            .run(&account(), &ctx())
            .await
            .unwrap();

        assert_eq!(result.status, SyncStatus::Ok);
        assert_eq!(result.items_processed, Some(2));
        assert!(cursors.writes().is_empty());
    }

    #[tokio::test]
    async fn continuation_token_drives_exactly_one_more_fetch() {
        let fetcher = ScriptedFetcher::new(
            Some("200"),
            vec![
                Ok(page(&["m1"], Some("tok-1"))),
                Ok(page(&["m2", "m3"], None)),
            ],
        );
        let dispatcher = CollectingDispatcher::new();
        let cursors = FakeCursorStore::with(Some("100"));

        let result = CatchUpOrchestrator::new(&fetcher, &dispatcher, &cursors)
            .run(&account(), &ctx())
            .await
            .unwrap();

        assert_eq!(result.status, SyncStatus::Ok);
        assert_eq!(result.pages_processed, Some(2));
        assert_eq!(result.items_processed, Some(3));

        // Cross-page order preserved, page 1 fully before page 2
        let dispatched = dispatcher.dispatched.lock().unwrap();
        assert_eq!(*dispatched, vec!["m1", "m2", "m3"]);

        // Both calls start from the stored cursor; the second carries the
        // continuation token
        let calls = fetcher.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                ("100".to_string(), None),
                ("100".to_string(), Some("tok-1".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn expiry_on_first_page_resets_to_snapshot() {
        let fetcher = ScriptedFetcher::new(Some("200"), vec![Err(FetchError::CursorExpired)]);
        let dispatcher = CollectingDispatcher::new();
        let cursors = FakeCursorStore::with(Some("100"));

        let result = CatchUpOrchestrator::new(&fetcher, &dispatcher, &cursors)
            .run(&account(), &ctx())
            .await
            .unwrap();

        assert_eq!(result.status, SyncStatus::ExpiredReset);
        assert_eq!(result.pages_processed, Some(0));
        assert_eq!(result.items_processed, Some(0));
        assert_eq!(cursors.writes(), vec!["200"]);
    }

    #[tokio::test]
    async fn expiry_mid_sequence_reports_partial_progress() {
        let fetcher = ScriptedFetcher::new(
            Some("200"),
            vec![
                Ok(page(&["m1"], Some("tok-1"))),
                Err(FetchError::CursorExpired),
            ],
        );
        let dispatcher = CollectingDispatcher::new();
        let cursors = FakeCursorStore::with(Some("100"));

        let result = CatchUpOrchestrator::new(&fetcher, &dispatcher, &cursors)
            .run(&account(), &ctx())
            .await
            .unwrap();

        assert_eq!(result.status, SyncStatus::ExpiredReset);
        assert_eq!(result.pages_processed, Some(1));
        assert_eq!(result.items_processed, Some(1));
        assert_eq!(cursors.writes(), vec!["200"]);
    }

    #[tokio::test]
    async fn provider_error_propagates_without_cursor_write() {
        let fetcher = ScriptedFetcher::new(
            Some("200"),
            vec![Err(FetchError::Provider(anyhow!("network down")))],
        );
        let dispatcher = CollectingDispatcher::new();
        let cursors = FakeCursorStore::with(Some("100"));

        let err = CatchUpOrchestrator::new(&fetcher, &dispatcher, &cursors)
            .run(&account(), &ctx())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("network down"));
        assert!(cursors.writes().is_empty());
    }

    #[tokio::test]
    async fn dispatch_error_propagates_without_cursor_write() {
        let fetcher = ScriptedFetcher::new(Some("200"), vec![Ok(page(&["m1"], None))]);
        let dispatcher = CollectingDispatcher {
            dispatched: Mutex::new(vec![]),
            fail: true,
        };
        let cursors = FakeCursorStore::with(Some("100"));

        let err = CatchUpOrchestrator::new(&fetcher, &dispatcher, &cursors)
            .run(&account(), &ctx())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("dispatch failed"));
        assert!(cursors.writes().is_empty());
    }
}
