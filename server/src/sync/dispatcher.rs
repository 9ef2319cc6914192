//! Routing of change pages to rule evaluation.
//!
//! The dispatcher owns ordering and at-least-once delivery; what a rule
//! does with a record is the evaluator's business. Repeated label events
//! for the same message are delivered as-is, so evaluation must tolerate
//! re-seeing the same message state.

use async_trait::async_trait;

use super::{ChangePage, ChangeRecord, MailboxContext};

/// Consumes change records and performs the side-effecting rule actions.
#[async_trait]
pub trait RuleEvaluator {
    async fn evaluate(&self, record: &ChangeRecord, ctx: &MailboxContext) -> anyhow::Result<()>;
}

/// Routes one page of change records to rule evaluation.
#[async_trait]
pub trait ChangeDispatcher {
    async fn dispatch(&self, page: &ChangePage, ctx: &MailboxContext) -> anyhow::Result<()>;
}

/// Delivers records one at a time, in page order. Any evaluator error
/// aborts the current page and propagates; records already delivered
/// stay delivered (partial-page application is accepted).
pub struct RecordDispatcher<E> {
    evaluator: E,
}

impl<E> RecordDispatcher<E> {
    pub fn new(evaluator: E) -> Self {
        Self { evaluator }
    }
}

#[async_trait]
impl<E: RuleEvaluator + Send + Sync> ChangeDispatcher for RecordDispatcher<E> {
    async fn dispatch(&self, page: &ChangePage, ctx: &MailboxContext) -> anyhow::Result<()> {
        for record in &page.records {
            self.evaluator.evaluate(record, ctx).await?;
        }

        Ok(())
    }
}
