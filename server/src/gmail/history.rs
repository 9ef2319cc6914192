//! Change-log pagination over the Gmail history API.

use anyhow::anyhow;
use async_trait::async_trait;
use google_gmail1::api::History;

use super::client::GmailClient;
use crate::sync::fetcher::{FetchError, FetchParams, HistoryFetcher};
use crate::sync::{ChangeKind, ChangePage, ChangeRecord};

/// History record kinds the engine subscribes to
const CHANGE_KINDS: [&str; 3] = ["messageAdded", "labelAdded", "labelRemoved"];

pub struct GmailHistoryFetcher {
    client: GmailClient,
}

impl GmailHistoryFetcher {
    pub fn new(client: GmailClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HistoryFetcher for GmailHistoryFetcher {
    async fn current_cursor(&self) -> anyhow::Result<Option<String>> {
        let history_id = self.client.current_history_id().await?;
        Ok(history_id.map(|id| id.to_string()))
    }

    async fn fetch(&self, params: FetchParams<'_>) -> Result<ChangePage, FetchError> {
        let start_history_id: u64 = params
            .start_cursor
            .parse()
            .map_err(|_| anyhow!("Stored cursor is not a history id: {}", params.start_cursor))?;

        let mut call = self
            .client
            .hub()
            .users()
            .history_list("me")
            .start_history_id(start_history_id)
            .max_results(params.page_size);

        for kind in CHANGE_KINDS {
            call = call.add_history_types(kind);
        }

        if let Some(token) = params.page_token {
            call = call.page_token(token);
        }

        let (_, response) = call.doit().await.map_err(classify_fetch_failure)?;

        let records = response
            .history
            .unwrap_or_default()
            .iter()
            .flat_map(flatten_history_entry)
            .collect();

        Ok(ChangePage {
            records,
            next_page_token: response.next_page_token,
        })
    }
}

/// Flatten one history entry into ordered change records
fn flatten_history_entry(entry: &History) -> Vec<ChangeRecord> {
    let mut records = Vec::new();

    if let Some(added) = &entry.messages_added {
        for item in added {
            if let Some(id) = item.message.as_ref().and_then(|m| m.id.clone()) {
                records.push(ChangeRecord {
                    message_id: id,
                    kind: ChangeKind::MessageAdded,
                    label_ids: vec![],
                });
            }
        }
    }

    if let Some(labeled) = &entry.labels_added {
        for item in labeled {
            if let Some(id) = item.message.as_ref().and_then(|m| m.id.clone()) {
                records.push(ChangeRecord {
                    message_id: id,
                    kind: ChangeKind::LabelAdded,
                    label_ids: item.label_ids.clone().unwrap_or_default(),
                });
            }
        }
    }

    if let Some(unlabeled) = &entry.labels_removed {
        for item in unlabeled {
            if let Some(id) = item.message.as_ref().and_then(|m| m.id.clone()) {
                records.push(ChangeRecord {
                    message_id: id,
                    kind: ChangeKind::LabelRemoved,
                    label_ids: item.label_ids.clone().unwrap_or_default(),
                });
            }
        }
    }

    records
}

/// Sort a history-list failure into expiry vs everything else.
///
/// Gmail answers a history fetch from an out-of-retention cursor with a
/// 404, but the status code surfaces in different places depending on
/// how the failure was produced.
fn classify_fetch_failure(err: google_gmail1::Error) -> FetchError {
    if status_of(&err) == Some(404) {
        FetchError::CursorExpired
    } else {
        FetchError::Provider(anyhow::Error::new(err).context("Failed to list history"))
    }
}

/// Extract the HTTP-equivalent status code from a known failure shape
fn status_of(err: &google_gmail1::Error) -> Option<u16> {
    match err {
        google_gmail1::Error::BadRequest(value) => status_from_json(value),
        google_gmail1::Error::Failure(response) => Some(response.status().as_u16()),
        _ => None,
    }
}

/// Probe a provider error body for its status code, in a fixed
/// precedence order: the nested `error.code`, then a top-level `status`,
/// then a top-level `code`. The first present value is authoritative.
fn status_from_json(value: &serde_json::Value) -> Option<u16> {
    [&value["error"]["code"], &value["status"], &value["code"]]
        .into_iter()
        .find_map(|v| v.as_u64())
        .and_then(|code| u16::try_from(code).ok())
}

// Query building for the digest's inbox window lives here too, next to
// the other Gmail search usage.
pub fn recent_inbox_query(hours: u32) -> String {
    format!(
        "in:inbox newer_than:{hours}h -label:Marketing -label:Newsletter -label:Receipt -category:promotions"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use google_gmail1::api::{HistoryLabelAdded, HistoryMessageAdded, Message};
    use serde_json::json;

    fn message(id: &str) -> Message {
        Message {
            id: Some(id.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn nested_error_code_takes_precedence() {
        let value = json!({
            "error": { "code": 404, "message": "Requested entity was not found." },
            "status": 500,
            "code": 500
        });
        assert_eq!(status_from_json(&value), Some(404));
    }

    #[test]
    fn falls_back_to_status_then_code() {
        assert_eq!(status_from_json(&json!({ "status": 429 })), Some(429));
        assert_eq!(status_from_json(&json!({ "code": 404 })), Some(404));
        assert_eq!(status_from_json(&json!({ "message": "nope" })), None);
    }

    #[test]
    fn bad_request_with_404_classifies_as_expired() {
        let err = google_gmail1::Error::BadRequest(json!({
            "error": { "code": 404, "message": "Requested entity was not found." }
        }));
        assert!(matches!(
            classify_fetch_failure(err),
            FetchError::CursorExpired
        ));
    }

    #[test]
    fn bad_request_with_other_code_stays_a_provider_error() {
        let err = google_gmail1::Error::BadRequest(json!({
            "error": { "code": 403, "message": "Rate limit exceeded" }
        }));
        assert!(matches!(
            classify_fetch_failure(err),
            FetchError::Provider(_)
        ));
    }

    #[test]
    fn flattens_entry_preserving_kind_order() {
        let entry = History {
            messages_added: Some(vec![HistoryMessageAdded {
                message: Some(message("m1")),
            }]),
            labels_added: Some(vec![HistoryLabelAdded {
                message: Some(message("m1")),
                label_ids: Some(vec!["IMPORTANT".to_string()]),
            }]),
            ..Default::default()
        };

        let records = flatten_history_entry(&entry);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, ChangeKind::MessageAdded);
        assert_eq!(records[1].kind, ChangeKind::LabelAdded);
        assert_eq!(records[1].label_ids, vec!["IMPORTANT"]);
    }

    #[test]
    fn recent_inbox_query_excludes_bulk_labels() {
        let query = recent_inbox_query(48);
        assert!(query.contains("newer_than:48h"));
        assert!(query.contains("-category:promotions"));
    }
}
