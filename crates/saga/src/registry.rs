//! Mapping from saga state to the handler that acts in it.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, SagaError};
use crate::handlers::{CreatePaymentHandler, DecreaseStockHandler};
use crate::services::{InventoryService, OrderLookupService, PaymentService};
use crate::state::{SagaState, StateKind};
use crate::step::StepHandler;

/// Closed, validated state → handler table.
///
/// Built once at startup and shared read-only by every saga run. Building
/// fails unless each non-terminal state has exactly one handler.
#[derive(Clone)]
pub struct StepRegistry {
    handlers: HashMap<SagaState, Arc<dyn StepHandler>>,
}

impl StepRegistry {
    /// Builds a registry from the given handlers.
    ///
    /// A handler is registered under its forward state and, when it can be
    /// undone, under its compensation state.
    pub fn new(steps: Vec<Arc<dyn StepHandler>>) -> Result<Self> {
        let mut handlers: HashMap<SagaState, Arc<dyn StepHandler>> = HashMap::new();

        for step in steps {
            let forward = step.forward_state();
            if forward.kind() != StateKind::Forward {
                return Err(SagaError::InvalidRegistration {
                    step: step.name(),
                    state: forward,
                });
            }
            Self::insert(&mut handlers, forward, step.clone())?;

            if let Some(compensation) = step.compensation_state() {
                if compensation.kind() != StateKind::Compensation {
                    return Err(SagaError::InvalidRegistration {
                        step: step.name(),
                        state: compensation,
                    });
                }
                Self::insert(&mut handlers, compensation, step)?;
            }
        }

        if let Some(missing) = SagaState::ALL
            .iter()
            .find(|s| !s.is_terminal() && !handlers.contains_key(*s))
        {
            return Err(SagaError::UnregisteredState(*missing));
        }

        Ok(Self { handlers })
    }

    /// Builds the order-placement saga: decrease stock, then create payment.
    pub fn order_saga<I, O, P>(inventory: I, orders: O, payments: P) -> Result<Self>
    where
        I: InventoryService + 'static,
        O: OrderLookupService + 'static,
        P: PaymentService + 'static,
    {
        let decrease_stock: Arc<dyn StepHandler> = Arc::new(DecreaseStockHandler::new(inventory));
        let create_payment: Arc<dyn StepHandler> =
            Arc::new(CreatePaymentHandler::new(orders, payments));
        Self::new(vec![decrease_stock, create_payment])
    }

    /// Returns the handler responsible for `state`.
    pub fn resolve(&self, state: SagaState) -> Result<&Arc<dyn StepHandler>> {
        self.handlers
            .get(&state)
            .ok_or(SagaError::UnregisteredState(state))
    }

    fn insert(
        handlers: &mut HashMap<SagaState, Arc<dyn StepHandler>>,
        state: SagaState,
        step: Arc<dyn StepHandler>,
    ) -> Result<()> {
        if handlers.insert(state, step).is_some() {
            return Err(SagaError::DuplicateHandler(state));
        }
        Ok(())
    }
}

impl std::fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut entries: Vec<_> = self
            .handlers
            .iter()
            .map(|(state, step)| (state.as_str(), step.name()))
            .collect();
        entries.sort_unstable();
        f.debug_struct("StepRegistry")
            .field("handlers", &entries)
            .finish()
    }
}
