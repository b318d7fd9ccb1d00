//! Payment service trait with HTTP and in-memory implementations.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{OrderId, UserId};
use serde::Serialize;
use serde_json::Value;

use crate::error::ServiceError;
use crate::services::gateway::{self, GatewayClient};

const OPERATION: &str = "create payment";
const PAYMENTS_PATH: &str = "payments-api/payments";

/// Body of a create-payment request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentRequest {
    pub user_id: UserId,
    pub order_id: OrderId,
    pub total_amount: f64,
}

/// Result of a successful payment creation.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    /// The payment ID assigned by the payment service.
    pub payment_id: String,
}

impl PaymentReceipt {
    /// Reads `payment_id` from a create-payment response.
    ///
    /// The payment service may return the identifier as a string or a number.
    pub fn from_response(body: &Value) -> Result<Self, ServiceError> {
        let payment_id = match body.get("payment_id") {
            None | Some(Value::Null) => {
                return Err(ServiceError::MissingField {
                    operation: OPERATION,
                    field: "payment_id",
                });
            }
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => {
                return Err(ServiceError::InvalidField {
                    operation: OPERATION,
                    field: "payment_id",
                    value: other.to_string(),
                });
            }
        };
        Ok(Self { payment_id })
    }
}

/// Trait for payment processing operations.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Creates a payment transaction for an order.
    async fn create_payment(&self, request: &PaymentRequest)
    -> Result<PaymentReceipt, ServiceError>;
}

/// Payment service reached through the API gateway.
#[derive(Debug, Clone)]
pub struct HttpPaymentService {
    gateway: GatewayClient,
}

impl HttpPaymentService {
    pub fn new(gateway: GatewayClient) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl PaymentService for HttpPaymentService {
    async fn create_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentReceipt, ServiceError> {
        let http_request = self
            .gateway
            .http()
            .post(self.gateway.url(PAYMENTS_PATH))
            .json(request);

        let response = gateway::send(OPERATION, http_request).await?;
        let body = gateway::json_body(OPERATION, response).await?;
        PaymentReceipt::from_response(&body)
    }
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    requests: Vec<PaymentRequest>,
    next_id: u32,
    next_payment_id: Option<String>,
    fail_on_create: bool,
}

/// In-memory payment service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentService {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentService {
    /// Creates a new in-memory payment service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to decline payment creation.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Makes the next created payment use `payment_id`.
    pub fn set_next_payment_id(&self, payment_id: impl Into<String>) {
        self.state.write().unwrap().next_payment_id = Some(payment_id.into());
    }

    /// Returns every create-payment request received, in call order.
    pub fn requests(&self) -> Vec<PaymentRequest> {
        self.state.read().unwrap().requests.clone()
    }

    /// Returns the number of create-payment calls received.
    pub fn call_count(&self) -> usize {
        self.state.read().unwrap().requests.len()
    }
}

#[async_trait]
impl PaymentService for InMemoryPaymentService {
    async fn create_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentReceipt, ServiceError> {
        let mut state = self.state.write().unwrap();
        state.requests.push(request.clone());

        if state.fail_on_create {
            return Err(ServiceError::Unavailable {
                operation: OPERATION,
                reason: "Payment declined".to_string(),
            });
        }

        state.next_id += 1;
        let payment_id = match state.next_payment_id.take() {
            Some(id) => id,
            None => format!("pay_{:04}", state.next_id),
        };

        Ok(PaymentReceipt { payment_id })
    }
}
