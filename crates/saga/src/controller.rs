//! Adapts an order-placement request into a saga run.

use common::{OrderId, SagaId, UserId};
use serde::{Deserialize, Serialize};

use crate::context::SagaContext;
use crate::engine::{SagaEngine, SagaOutcome};
use crate::error::{Result, SagaError};
use crate::registry::StepRegistry;
use crate::services::{InventoryService, LineItem, OrderLookupService, PaymentService};
use crate::state::SagaState;

/// Inbound request to place an order.
///
/// Every field is optional on the wire so that a missing one is reported as
/// a validation error rather than a decoding failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceOrderRequest {
    pub order_id: Option<u64>,
    pub user_id: Option<u64>,
    pub items: Option<Vec<LineItem>>,
}

impl PlaceOrderRequest {
    /// Checks required fields and builds the context for a new saga run.
    pub fn into_context(self) -> Result<SagaContext> {
        let order_id = self
            .order_id
            .ok_or_else(|| SagaError::Validation("order_id is required".to_string()))?;
        let user_id = self
            .user_id
            .ok_or_else(|| SagaError::Validation("user_id is required".to_string()))?;
        let items = self
            .items
            .ok_or_else(|| SagaError::Validation("items are required".to_string()))?;

        if items.is_empty() {
            return Err(SagaError::Validation(
                "items must contain at least one entry".to_string(),
            ));
        }
        if let Some(item) = items.iter().find(|item| item.quantity == 0) {
            return Err(SagaError::Validation(format!(
                "quantity for product {} must be positive",
                item.product_id
            )));
        }

        Ok(SagaContext::new(
            OrderId::new(order_id),
            UserId::new(user_id),
            items,
        ))
    }
}

/// Status discriminator of a [`SagaResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SagaStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ERROR")]
    Error,
}

/// Normalized result of one saga run, returned to the front door.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SagaResult {
    pub status: SagaStatus,
    pub saga_id: SagaId,
    pub order_id: OrderId,
    pub state: SagaState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SagaResult {
    pub fn is_success(&self) -> bool {
        self.status == SagaStatus::Ok
    }
}

impl From<SagaOutcome> for SagaResult {
    fn from(outcome: SagaOutcome) -> Self {
        let ctx = &outcome.context;
        if outcome.is_success() {
            Self {
                status: SagaStatus::Ok,
                saga_id: ctx.saga_id(),
                order_id: ctx.order_id(),
                state: outcome.state,
                payment_id: ctx.payment_id().map(str::to_string),
                error: None,
            }
        } else {
            Self {
                status: SagaStatus::Error,
                saga_id: ctx.saga_id(),
                order_id: ctx.order_id(),
                state: outcome.state,
                payment_id: None,
                error: Some(
                    ctx.last_error()
                        .unwrap_or("order saga did not complete")
                        .to_string(),
                ),
            }
        }
    }
}

/// Entry point for placing an order: one request, one saga attempt.
#[derive(Debug, Clone)]
pub struct OrderSagaController {
    engine: SagaEngine,
}

impl OrderSagaController {
    pub fn new(engine: SagaEngine) -> Self {
        Self { engine }
    }

    /// Builds a controller over the order saga with the given services.
    pub fn with_services<I, O, P>(inventory: I, orders: O, payments: P) -> Result<Self>
    where
        I: InventoryService + 'static,
        O: OrderLookupService + 'static,
        P: PaymentService + 'static,
    {
        let registry = StepRegistry::order_saga(inventory, orders, payments)?;
        Ok(Self::new(SagaEngine::new(registry)))
    }

    /// Validates the request and runs the saga.
    ///
    /// Returns `Err` only for an invalid request, in which case no
    /// downstream call is made. A failed saga is an `Ok` result with
    /// [`SagaStatus::Error`].
    #[tracing::instrument(skip(self, request), fields(order_id = ?request.order_id))]
    pub async fn run(&self, request: PlaceOrderRequest) -> Result<SagaResult> {
        let ctx = request.into_context().inspect_err(|e| {
            tracing::warn!(error = %e, "order request rejected");
        })?;

        let outcome = self.engine.run(ctx).await;
        Ok(SagaResult::from(outcome))
    }
}
