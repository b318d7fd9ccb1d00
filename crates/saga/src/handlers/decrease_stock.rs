//! Takes the order's items out of stock; puts them back on compensation.

use async_trait::async_trait;

use crate::context::{SagaContext, StepOutput};
use crate::services::{InventoryService, StockOperation};
use crate::state::SagaState;
use crate::step::{CompensationOutcome, StepHandler, StepOutcome};

pub const STEP_NAME: &str = "decrease_stock";

/// First step of the saga.
///
/// A failed decrease goes straight to `Cancelled`: nothing was taken out of
/// stock, so there is nothing to undo.
pub struct DecreaseStockHandler<I: InventoryService> {
    inventory: I,
}

impl<I: InventoryService> DecreaseStockHandler<I> {
    pub fn new(inventory: I) -> Self {
        Self { inventory }
    }
}

#[async_trait]
impl<I: InventoryService> StepHandler for DecreaseStockHandler<I> {
    fn name(&self) -> &'static str {
        STEP_NAME
    }

    fn forward_state(&self) -> SagaState {
        SagaState::DecreasingStock
    }

    fn compensation_state(&self) -> Option<SagaState> {
        Some(SagaState::IncreasingStock)
    }

    async fn execute(&self, ctx: &SagaContext) -> StepOutcome {
        match self
            .inventory
            .adjust_stock(ctx.items(), StockOperation::Decrease)
            .await
        {
            Ok(()) => {
                tracing::debug!(
                    saga_id = %ctx.saga_id(),
                    items = ctx.items().len(),
                    "stock decreased"
                );
                StepOutcome::advance(SagaState::CreatingPayment, StepOutput::empty())
            }
            Err(e) => {
                tracing::error!(saga_id = %ctx.saga_id(), error = %e, "stock decrease failed");
                StepOutcome::fail(SagaState::Cancelled, e.to_string())
            }
        }
    }

    async fn compensate(&self, ctx: &SagaContext) -> CompensationOutcome {
        match self
            .inventory
            .adjust_stock(ctx.items(), StockOperation::Increase)
            .await
        {
            Ok(()) => {
                tracing::debug!(saga_id = %ctx.saga_id(), "stock increased back");
                CompensationOutcome::done(SagaState::Cancelled)
            }
            Err(e) => {
                tracing::error!(saga_id = %ctx.saga_id(), error = %e, "stock increase failed");
                CompensationOutcome::failed(SagaState::Cancelled, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{InMemoryInventoryService, LineItem};
    use common::{OrderId, UserId};

    fn context() -> SagaContext {
        SagaContext::new(
            OrderId::new(1),
            UserId::new(1),
            vec![LineItem::new(5, 2), LineItem::new(6, 1)],
        )
    }

    #[tokio::test]
    async fn test_execute_success_moves_to_payment() {
        let inventory = InMemoryInventoryService::new();
        let handler = DecreaseStockHandler::new(inventory.clone());

        let outcome = handler.execute(&context()).await;

        assert_eq!(
            outcome,
            StepOutcome::advance(SagaState::CreatingPayment, StepOutput::empty())
        );
        assert_eq!(inventory.call_count(StockOperation::Decrease), 1);
    }

    #[tokio::test]
    async fn test_execute_failure_cancels() {
        let inventory = InMemoryInventoryService::new();
        inventory.set_fail_on_decrease(true);
        let handler = DecreaseStockHandler::new(inventory);

        let outcome = handler.execute(&context()).await;

        assert_eq!(outcome.next(), SagaState::Cancelled);
        assert!(matches!(outcome, StepOutcome::Fail { .. }));
    }

    #[tokio::test]
    async fn test_compensate_puts_back_same_items() {
        let inventory = InMemoryInventoryService::new();
        let handler = DecreaseStockHandler::new(inventory.clone());
        let ctx = context();

        handler.execute(&ctx).await;
        let outcome = handler.compensate(&ctx).await;

        assert_eq!(outcome, CompensationOutcome::done(SagaState::Cancelled));
        let calls = inventory.calls();
        assert_eq!(calls[1].operation, StockOperation::Increase);
        assert_eq!(calls[1].items, calls[0].items);
    }

    #[tokio::test]
    async fn test_compensate_failure_still_names_next_state() {
        let inventory = InMemoryInventoryService::new();
        inventory.set_fail_on_increase(true);
        let handler = DecreaseStockHandler::new(inventory);

        let outcome = handler.compensate(&context()).await;

        assert_eq!(outcome.next, SagaState::Cancelled);
        assert!(outcome.error.is_some());
    }
}
