//! Order lookup service trait with HTTP and in-memory implementations.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::OrderId;
use serde_json::Value;

use crate::error::{ErrorPayload, ServiceError};
use crate::services::gateway::{self, GatewayClient};

const OPERATION: &str = "fetch order";

/// Trait for reading order details owned by the store manager.
#[async_trait]
pub trait OrderLookupService: Send + Sync {
    /// Returns the order's total amount.
    async fn order_total(&self, order_id: OrderId) -> Result<f64, ServiceError>;
}

/// Extracts `total_amount` from an order document.
///
/// Accepts a JSON number or a numeric string.
pub fn parse_total_amount(details: &Value) -> Result<f64, ServiceError> {
    let raw = match details.get("total_amount") {
        None | Some(Value::Null) => {
            return Err(ServiceError::MissingField {
                operation: OPERATION,
                field: "total_amount",
            });
        }
        Some(raw) => raw,
    };

    let total = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match total {
        Some(total) if total.is_finite() => Ok(total),
        _ => Err(ServiceError::InvalidField {
            operation: OPERATION,
            field: "total_amount",
            value: raw.to_string(),
        }),
    }
}

/// Order lookup reached through the API gateway.
#[derive(Debug, Clone)]
pub struct HttpOrderLookupService {
    gateway: GatewayClient,
}

impl HttpOrderLookupService {
    pub fn new(gateway: GatewayClient) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl OrderLookupService for HttpOrderLookupService {
    async fn order_total(&self, order_id: OrderId) -> Result<f64, ServiceError> {
        let request = self
            .gateway
            .http()
            .get(self.gateway.url(&format!("store-manager-api/orders/{order_id}")));

        let response = gateway::send(OPERATION, request).await?;
        let details = gateway::json_body(OPERATION, response).await?;
        parse_total_amount(&details)
    }
}

#[derive(Debug, Default)]
struct InMemoryOrderState {
    orders: HashMap<OrderId, Value>,
    lookups: Vec<OrderId>,
}

/// In-memory order lookup for testing.
///
/// Stores raw order documents so malformed totals go through the same
/// parsing as HTTP responses.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderLookupService {
    state: Arc<RwLock<InMemoryOrderState>>,
}

impl InMemoryOrderLookupService {
    /// Creates a new in-memory order lookup service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an order whose document carries `total_amount`.
    pub fn insert_total(&self, order_id: OrderId, total_amount: f64) {
        self.insert_document(
            order_id,
            serde_json::json!({ "order_id": order_id, "total_amount": total_amount }),
        );
    }

    /// Stores an arbitrary order document.
    pub fn insert_document(&self, order_id: OrderId, document: Value) {
        self.state.write().unwrap().orders.insert(order_id, document);
    }

    /// Returns the number of lookups performed.
    pub fn lookup_count(&self) -> usize {
        self.state.read().unwrap().lookups.len()
    }
}

#[async_trait]
impl OrderLookupService for InMemoryOrderLookupService {
    async fn order_total(&self, order_id: OrderId) -> Result<f64, ServiceError> {
        let mut state = self.state.write().unwrap();
        state.lookups.push(order_id);

        let document = state
            .orders
            .get(&order_id)
            .ok_or_else(|| ServiceError::Status {
                operation: OPERATION,
                status: 404,
                payload: ErrorPayload::Text(format!("Order {order_id} not found")),
            })?;
        parse_total_amount(document)
    }
}
