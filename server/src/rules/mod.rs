//! Automation rule evaluation.
//!
//! The dispatcher guarantees delivery order and at-least-once delivery;
//! everything here must therefore tolerate re-seeing the same message
//! state. All actions are plain Gmail label modifications, which are
//! idempotent on the provider side.

use anyhow::Result;
use async_trait::async_trait;

use crate::gmail::client::GmailClient;
use crate::models::AutomationRule;
use crate::sync::dispatcher::RuleEvaluator;
use crate::sync::{ChangeKind, ChangeRecord, MailboxContext};

/// What a matched rule does to the message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    Archive,
    Label,
    MarkRead,
}

impl RuleAction {
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "archive" => Some(Self::Archive),
            "label" => Some(Self::Label),
            "mark_read" => Some(Self::MarkRead),
            _ => None,
        }
    }
}

/// Whether a rule's conditions hold for a message. A rule with no
/// conditions set never matches.
pub fn rule_matches(rule: &AutomationRule, from: &str, subject: &str) -> bool {
    let mut has_condition = false;

    if let Some(needle) = &rule.from_contains {
        has_condition = true;
        if !from.to_lowercase().contains(&needle.to_lowercase()) {
            return false;
        }
    }

    if let Some(needle) = &rule.subject_contains {
        has_condition = true;
        if !subject.to_lowercase().contains(&needle.to_lowercase()) {
            return false;
        }
    }

    has_condition
}

/// Select every active rule matching the message, in rule order
pub fn matching_rules<'a>(
    rules: &'a [AutomationRule],
    from: &str,
    subject: &str,
) -> Vec<&'a AutomationRule> {
    rules
        .iter()
        .filter(|rule| rule_matches(rule, from, subject))
        .collect()
}

/// Rule evaluator that resolves each new message and applies every
/// matching rule's action through the Gmail API.
///
/// Label-added/removed records are accepted but carry no actions; rules
/// only fire on newly added messages.
pub struct ActionEvaluator {
    client: GmailClient,
}

impl ActionEvaluator {
    pub fn new(client: GmailClient) -> Self {
        Self { client }
    }

    async fn execute(&self, rule: &AutomationRule, message_id: &str) -> Result<()> {
        let action = match RuleAction::parse(&rule.action) {
            Some(action) => action,
            None => {
                tracing::warn!(rule = %rule.name, action = %rule.action, "Unknown rule action");
                return Ok(());
            }
        };

        match action {
            RuleAction::Archive => {
                self.client
                    .modify_message(message_id, vec![], vec!["INBOX".to_string()])
                    .await?;
            }
            RuleAction::Label => {
                let Some(label_id) = &rule.label_id else {
                    tracing::warn!(rule = %rule.name, "Label rule without a label id");
                    return Ok(());
                };
                self.client
                    .modify_message(message_id, vec![label_id.clone()], vec![])
                    .await?;
            }
            RuleAction::MarkRead => {
                self.client
                    .modify_message(message_id, vec![], vec!["UNREAD".to_string()])
                    .await?;
            }
        }

        tracing::info!(rule = %rule.name, message_id, "Applied rule action");
        Ok(())
    }
}

#[async_trait]
impl RuleEvaluator for ActionEvaluator {
    async fn evaluate(&self, record: &ChangeRecord, ctx: &MailboxContext) -> Result<()> {
        if ctx.rules.is_empty() || record.kind != ChangeKind::MessageAdded {
            return Ok(());
        }

        let message = self.client.get_message(&record.message_id).await?;

        for rule in matching_rules(&ctx.rules, &message.from, &message.subject) {
            self.execute(rule, &record.message_id).await?;
        }

        Ok(())
    }
}
