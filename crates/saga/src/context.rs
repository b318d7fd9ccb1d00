//! Per-run execution context.

use common::{OrderId, SagaId, UserId};
use serde::Serialize;

use crate::services::LineItem;

/// Values a successful step hands back to the engine.
///
/// Steps never write into the context themselves; the engine merges the
/// output once the step has returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutput {
    pub total_amount: Option<f64>,
    pub payment_id: Option<String>,
}

impl StepOutput {
    /// An output carrying nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Output of a created payment.
    pub fn payment(total_amount: f64, payment_id: impl Into<String>) -> Self {
        Self {
            total_amount: Some(total_amount),
            payment_id: Some(payment_id.into()),
        }
    }
}

/// Data owned by a single saga run.
#[derive(Debug, Clone, Serialize)]
pub struct SagaContext {
    saga_id: SagaId,
    order_id: OrderId,
    user_id: UserId,
    items: Vec<LineItem>,
    total_amount: Option<f64>,
    payment_id: Option<String>,
    last_error: Option<String>,
}

impl SagaContext {
    /// Creates the context for a new saga run.
    pub fn new(order_id: OrderId, user_id: UserId, items: Vec<LineItem>) -> Self {
        Self {
            saga_id: SagaId::new(),
            order_id,
            user_id,
            items,
            total_amount: None,
            payment_id: None,
            last_error: None,
        }
    }

    pub fn saga_id(&self) -> SagaId {
        self.saga_id
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Order total, once the payment step has looked it up.
    pub fn total_amount(&self) -> Option<f64> {
        self.total_amount
    }

    /// Payment created by the payment step, if any.
    pub fn payment_id(&self) -> Option<&str> {
        self.payment_id.as_deref()
    }

    /// Most recent failure reported by a step or detected by the engine.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Merges a step's output. Fields the output leaves empty are kept.
    pub fn merge(&mut self, output: StepOutput) {
        if let Some(total) = output.total_amount {
            self.total_amount = Some(total);
        }
        if let Some(payment_id) = output.payment_id {
            self.payment_id = Some(payment_id);
        }
    }

    pub fn record_error(&mut self, reason: impl Into<String>) {
        self.last_error = Some(reason.into());
    }
}
