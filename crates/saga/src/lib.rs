//! Orchestrated saga for placing an order.
//!
//! A central engine drives each step of the order saga against independent
//! services, with no shared database and no distributed transaction:
//! 1. Decrease stock for the order's items
//! 2. Look up the order total and create the payment
//!
//! If a step fails, the steps that already succeeded are compensated in
//! reverse order and the saga ends cancelled.

pub mod context;
pub mod controller;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod services;
pub mod state;
pub mod step;

pub use common::{OrderId, SagaId, UserId};
pub use context::{SagaContext, StepOutput};
pub use controller::{OrderSagaController, PlaceOrderRequest, SagaResult, SagaStatus};
pub use engine::{SagaEngine, SagaOutcome};
pub use error::{ErrorPayload, SagaError, ServiceError};
pub use handlers::{CreatePaymentHandler, DecreaseStockHandler};
pub use registry::StepRegistry;
pub use services::{
    GatewayClient, HttpInventoryService, HttpOrderLookupService, HttpPaymentService,
    InMemoryInventoryService, InMemoryOrderLookupService, InMemoryPaymentService,
    InventoryService, LineItem, OrderLookupService, PaymentReceipt, PaymentRequest,
    PaymentService, StockAdjustment, StockOperation,
};
pub use state::{SagaState, StateKind};
pub use step::{CompensationOutcome, StepHandler, StepOutcome};
