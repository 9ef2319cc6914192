//! Seam between the orchestrator and the provider's change-log API.

use async_trait::async_trait;
use thiserror::Error;

use super::ChangePage;

/// Parameters for one page fetch.
///
/// Omitting `page_token` starts from `start_cursor`; supplying it
/// continues a prior page sequence.
#[derive(Debug, Clone, Copy)]
pub struct FetchParams<'a> {
    pub start_cursor: &'a str,
    pub page_token: Option<&'a str>,
    pub page_size: u32,
}

/// Failure modes of a page fetch.
///
/// Cursor expiry is the one failure the orchestrator reacts to specially,
/// so it must stay distinguishable from everything else.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The starting cursor is older than the provider's retention window
    #[error("change cursor expired")]
    CursorExpired,

    /// Any other provider, network or auth failure
    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

/// Paginates the provider's change log from a given cursor.
#[async_trait]
pub trait HistoryFetcher {
    /// Fresh snapshot of the provider's current cursor, taken before the
    /// catch-up loop starts. `None` when the provider reports no cursor.
    async fn current_cursor(&self) -> anyhow::Result<Option<String>>;

    /// Fetch one page of changes after the cursor.
    async fn fetch(&self, params: FetchParams<'_>) -> Result<ChangePage, FetchError>;
}
