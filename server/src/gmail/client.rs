//! Gmail API client built from a mailbox's stored OAuth tokens.

use std::io::Cursor;
use std::sync::Arc;

use anyhow::{Context, Result};
use google_gmail1::api::{Message, ModifyMessageRequest};
use google_gmail1::hyper_rustls::HttpsConnector;
use google_gmail1::Gmail;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

pub type GmailHub = Gmail<HttpsConnector<HttpConnector>>;

/// OAuth material needed to open a mailbox-scoped client.
///
/// Token refresh is handled transparently by the authenticator; callers
/// only hand over the stored refresh token.
#[derive(Debug, Clone)]
pub struct ClientAuth {
    pub refresh_token: String,
    pub client_id: String,
    pub client_secret: String,
}

/// Client for one mailbox. Cheap to clone; the hub is shared.
#[derive(Clone)]
pub struct GmailClient {
    hub: Arc<GmailHub>,
    pub email_address: String,
}

/// Message fields the digest and rule evaluation care about
#[derive(Debug, Clone)]
pub struct MessageSummaryInput {
    pub id: String,
    pub subject: String,
    pub from: String,
    pub snippet: String,
    pub body_text: Option<String>,
}

impl GmailClient {
    /// Create a new Gmail client from stored OAuth tokens
    pub async fn connect(auth: ClientAuth, email_address: &str) -> Result<Self> {
        // Build AuthorizedUserSecret with our stored refresh token.
        // Use the yup_oauth2 re-exported by google_gmail1 to avoid version mismatch
        let secret = google_gmail1::yup_oauth2::authorized_user::AuthorizedUserSecret {
            client_id: auth.client_id,
            client_secret: auth.client_secret,
            refresh_token: auth.refresh_token,
            key_type: "authorized_user".to_string(),
        };

        let authenticator = google_gmail1::yup_oauth2::AuthorizedUserAuthenticator::builder(secret)
            .build()
            .await
            .context("Failed to build authenticator from refresh token")?;

        let connector = google_gmail1::hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .context("Failed to load native TLS roots")?
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(TokioExecutor::new()).build(connector);
        let hub = Gmail::new(client, authenticator);

        Ok(Self {
            hub: Arc::new(hub),
            email_address: email_address.to_string(),
        })
    }

    pub fn hub(&self) -> &GmailHub {
        &self.hub
    }

    /// Current cursor for the mailbox, from the profile snapshot
    pub async fn current_history_id(&self) -> Result<Option<u64>> {
        let (_, profile) = self
            .hub
            .users()
            .get_profile("me")
            .doit()
            .await
            .context("Failed to get profile")?;

        Ok(profile.history_id)
    }

    /// List message ids matching a Gmail search query
    pub async fn query_message_ids(&self, query: &str, max_results: u32) -> Result<Vec<String>> {
        let (_, list_response) = self
            .hub
            .users()
            .messages_list("me")
            .q(query)
            .max_results(max_results)
            .doit()
            .await
            .context("Failed to list messages")?;

        let ids = list_response
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| m.id)
            .collect();

        Ok(ids)
    }

    /// Get the fields of one message that summarization and rule
    /// matching need
    pub async fn get_message(&self, message_id: &str) -> Result<MessageSummaryInput> {
        let (_, message) = self
            .hub
            .users()
            .messages_get("me", message_id)
            .format("full")
            .doit()
            .await
            .context("Failed to get message")?;

        Ok(parse_message(message))
    }

    /// Apply a label modification to a message. Adding or removing a
    /// label the message already has/lacks is a no-op on Gmail's side,
    /// which keeps repeated deliveries harmless.
    pub async fn modify_message(
        &self,
        message_id: &str,
        add_label_ids: Vec<String>,
        remove_label_ids: Vec<String>,
    ) -> Result<()> {
        let request = ModifyMessageRequest {
            add_label_ids: if add_label_ids.is_empty() {
                None
            } else {
                Some(add_label_ids)
            },
            remove_label_ids: if remove_label_ids.is_empty() {
                None
            } else {
                Some(remove_label_ids)
            },
        };

        self.hub
            .users()
            .messages_modify(request, "me", message_id)
            .doit()
            .await
            .context("Failed to modify message")?;

        Ok(())
    }

    /// Send a raw RFC 2822 message from the mailbox owner
    pub async fn send_raw(&self, raw: String) -> Result<()> {
        let mimetype = "message/rfc822"
            .parse::<mime::Mime>()
            .map_err(|e| anyhow::anyhow!("Invalid send mime type: {e}"))?;

        self.hub
            .users()
            .messages_send(Message::default(), "me")
            .upload(Cursor::new(raw.into_bytes()), mimetype)
            .await
            .context("Failed to send message")?;

        Ok(())
    }
}

fn parse_message(message: Message) -> MessageSummaryInput {
    let id = message.id.clone().unwrap_or_default();
    let snippet = message.snippet.clone().unwrap_or_default();

    let mut subject = String::new();
    let mut from = String::new();

    if let Some(payload) = &message.payload {
        if let Some(headers) = &payload.headers {
            for header in headers {
                match header.name.as_deref() {
                    Some("Subject") => subject = header.value.clone().unwrap_or_default(),
                    Some("From") => from = header.value.clone().unwrap_or_default(),
                    _ => {}
                }
            }
        }
    }

    let body_text = extract_text_body(&message);

    MessageSummaryInput {
        id,
        subject,
        from,
        snippet,
        body_text,
    }
}

fn extract_text_body(message: &Message) -> Option<String> {
    let payload = message.payload.as_ref()?;

    if let Some(body) = &payload.body {
        if let Some(data) = &body.data {
            if payload.mime_type.as_deref() != Some("text/html") {
                if let Ok(decoded) = String::from_utf8(data.clone()) {
                    return Some(decoded);
                }
            }
        }
    }

    payload
        .parts
        .as_ref()
        .and_then(|parts| text_body_from_parts(parts))
}

fn text_body_from_parts(parts: &[google_gmail1::api::MessagePart]) -> Option<String> {
    for part in parts {
        match part.mime_type.as_deref() {
            Some("text/plain") => {
                if let Some(data) = part.body.as_ref().and_then(|b| b.data.as_ref()) {
                    if let Ok(decoded) = String::from_utf8(data.clone()) {
                        return Some(decoded);
                    }
                }
            }
            Some(mime) if mime.starts_with("multipart/") => {
                if let Some(nested) = &part.parts {
                    if let Some(found) = text_body_from_parts(nested) {
                        return Some(found);
                    }
                }
            }
            _ => {}
        }
    }

    None
}
