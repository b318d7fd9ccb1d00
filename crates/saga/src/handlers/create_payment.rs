//! Looks up the order total and creates the payment for it.

use async_trait::async_trait;

use crate::context::{SagaContext, StepOutput};
use crate::error::ServiceError;
use crate::services::{OrderLookupService, PaymentReceipt, PaymentRequest, PaymentService};
use crate::state::SagaState;
use crate::step::{CompensationOutcome, StepHandler, StepOutcome};

pub const STEP_NAME: &str = "create_payment";

/// Last step of the saga.
///
/// Any failure, whether reading the total or creating the payment, hands
/// the saga to the stock compensation. A created payment is never undone.
pub struct CreatePaymentHandler<O: OrderLookupService, P: PaymentService> {
    orders: O,
    payments: P,
}

impl<O: OrderLookupService, P: PaymentService> CreatePaymentHandler<O, P> {
    pub fn new(orders: O, payments: P) -> Self {
        Self { orders, payments }
    }

    async fn create(&self, ctx: &SagaContext) -> Result<(f64, PaymentReceipt), ServiceError> {
        let total_amount = self.orders.order_total(ctx.order_id()).await?;
        let request = PaymentRequest {
            user_id: ctx.user_id(),
            order_id: ctx.order_id(),
            total_amount,
        };
        let receipt = self.payments.create_payment(&request).await?;
        Ok((total_amount, receipt))
    }
}

#[async_trait]
impl<O: OrderLookupService, P: PaymentService> StepHandler for CreatePaymentHandler<O, P> {
    fn name(&self) -> &'static str {
        STEP_NAME
    }

    fn forward_state(&self) -> SagaState {
        SagaState::CreatingPayment
    }

    fn compensation_state(&self) -> Option<SagaState> {
        None
    }

    async fn execute(&self, ctx: &SagaContext) -> StepOutcome {
        match self.create(ctx).await {
            Ok((total_amount, receipt)) => {
                tracing::debug!(
                    saga_id = %ctx.saga_id(),
                    payment_id = %receipt.payment_id,
                    total_amount,
                    "payment created"
                );
                StepOutcome::advance(
                    SagaState::Completed,
                    StepOutput::payment(total_amount, receipt.payment_id),
                )
            }
            Err(e) => {
                tracing::error!(saga_id = %ctx.saga_id(), error = %e, "payment creation failed");
                StepOutcome::fail(SagaState::IncreasingStock, e.to_string())
            }
        }
    }

    async fn compensate(&self, ctx: &SagaContext) -> CompensationOutcome {
        // The payment service exposes no cancellation operation.
        tracing::warn!(
            saga_id = %ctx.saga_id(),
            payment_id = ctx.payment_id().unwrap_or("-"),
            "payment cannot be compensated"
        );
        CompensationOutcome::failed(
            SagaState::IncreasingStock,
            "payment cancellation is not supported",
        )
    }
}
