//! Digest compilation.
//!
//! An independently schedulable job that shares the mailbox's provider
//! client with the catch-up engine but carries no cursor state: it reads
//! the current inbox window, summarizes each message, and sends one
//! composed digest back to the mailbox owner.

pub mod render;
pub mod summarize;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use shared::{extract_name_from_email, DigestItem};

use crate::config::AppConfig;
use crate::db::{self, DbPool};
use crate::gmail::client::{ClientAuth, GmailClient, MessageSummaryInput};
use crate::gmail::history::recent_inbox_query;
use summarize::{SummarizeRequest, Summarizer};

/// Messages fetched per digest window
pub const MAX_DIGEST_MESSAGES: u32 = 100;

const DIGEST_RULE_NAME: &str = "Daily Digest";

/// Reads the mailbox's recent inbox window
#[async_trait]
pub trait InboxSource {
    async fn fetch_recent(&self, hours: u32, cap: u32) -> Result<Vec<MessageSummaryInput>>;
}

/// Delivers the composed digest to the mailbox owner
#[async_trait]
pub trait DigestSender {
    async fn send(&self, raw: String) -> Result<()>;
}

/// What a digest run did, for logging and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestOutcome {
    pub fetched: usize,
    pub summarized: usize,
    pub sent: bool,
}

/// Compile and send one digest for the mailbox.
///
/// Summarization runs concurrently per message; one message's failure is
/// dropped from the digest without blocking or cancelling the others.
/// Zero fetched messages or zero produced summaries end the run as a
/// no-op rather than an error.
pub async fn compile_digest<S, Z, X>(
    inbox: &S,
    summarizer: &Z,
    sender: &X,
    mailbox: &str,
    hours: u32,
) -> Result<DigestOutcome>
where
    S: InboxSource + Sync,
    Z: Summarizer + Sync,
    X: DigestSender + Sync,
{
    tracing::info!(email = %mailbox, hours, "Fetching inbox messages");

    let messages = inbox.fetch_recent(hours, MAX_DIGEST_MESSAGES).await?;
    tracing::info!(email = %mailbox, count = messages.len(), "Fetched messages");

    if messages.is_empty() {
        tracing::info!(email = %mailbox, "No messages to summarize, skipping digest");
        return Ok(DigestOutcome {
            fetched: 0,
            summarized: 0,
            sent: false,
        });
    }

    let summaries = join_all(messages.iter().map(|message| {
        summarizer.summarize(SummarizeRequest {
            rule_name: DIGEST_RULE_NAME,
            mailbox,
            message,
        })
    }))
    .await;

    // join_all preserves input order, so the digest lists items in fetch
    // order with failed or empty summaries dropped
    let items: Vec<DigestItem> = messages
        .iter()
        .zip(summaries)
        .filter_map(|(message, summary)| match summary {
            Ok(Some(content)) => Some(DigestItem {
                from: extract_name_from_email(&message.from),
                subject: message.subject.clone(),
                content,
            }),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(message_id = %message.id, error = ?e, "Summarization failed");
                None
            }
        })
        .collect();

    tracing::info!(
        email = %mailbox,
        total = messages.len(),
        summarized = items.len(),
        "Summarized messages"
    );

    if items.is_empty() {
        tracing::info!(email = %mailbox, "No summaries produced, skipping digest");
        return Ok(DigestOutcome {
            fetched: messages.len(),
            summarized: 0,
            sent: false,
        });
    }

    let date = Utc::now();
    let subject = render::digest_subject(date);
    let html = render::build_digest_html(&items, date);
    let raw = render::build_raw_message(mailbox, mailbox, &subject, &html);

    sender.send(raw).await?;

    tracing::info!(email = %mailbox, item_count = items.len(), "Digest email sent");

    Ok(DigestOutcome {
        fetched: messages.len(),
        summarized: items.len(),
        sent: true,
    })
}

/// Gmail-backed inbox window
pub struct GmailInboxSource {
    client: GmailClient,
}

#[async_trait]
impl InboxSource for GmailInboxSource {
    async fn fetch_recent(&self, hours: u32, cap: u32) -> Result<Vec<MessageSummaryInput>> {
        let query = recent_inbox_query(hours);
        let ids = self.client.query_message_ids(&query, cap).await?;

        let mut messages = Vec::with_capacity(ids.len());
        for id in ids {
            match self.client.get_message(&id).await {
                Ok(message) => messages.push(message),
                Err(e) => {
                    tracing::warn!(message_id = %id, error = ?e, "Failed to fetch message");
                }
            }
        }

        Ok(messages)
    }
}

#[async_trait]
impl DigestSender for GmailClient {
    async fn send(&self, raw: String) -> Result<()> {
        self.send_raw(raw).await
    }
}

/// Entry point shared by the CLI and any scheduler: look up the account,
/// open its client and compile the digest.
pub async fn send_daily_digest(
    pool: &DbPool,
    config: &AppConfig,
    email: &str,
    hours: u32,
) -> Result<()> {
    let mut conn = pool.get().await?;
    let account = match db::mailbox_accounts::get_by_email(&mut conn, email).await? {
        Some(account) => account,
        None => {
            tracing::error!(email, "Email account not found");
            return Ok(());
        }
    };
    drop(conn);

    let Some((_, refresh_token)) = account.tokens() else {
        tracing::error!(email, "Missing Gmail tokens");
        return Ok(());
    };

    let client = GmailClient::connect(
        ClientAuth {
            refresh_token: refresh_token.to_string(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
        },
        &account.email,
    )
    .await?;

    let inbox = GmailInboxSource {
        client: client.clone(),
    };
    let summarizer = summarize::LlmSummarizer::new(
        config.summary_api_url.clone(),
        config.summary_api_key.clone(),
        config.summary_model.clone(),
    );

    compile_digest(&inbox, &summarizer, &client, &account.email, hours).await?;

    Ok(())
}
