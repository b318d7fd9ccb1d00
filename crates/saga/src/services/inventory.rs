//! Inventory service trait with HTTP and in-memory implementations.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::services::gateway::{self, GatewayClient};

const STOCKS_PATH: &str = "store-manager-api/stocks";

/// An order line whose stock is adjusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// The product to adjust.
    pub product_id: u64,
    /// Number of units.
    pub quantity: u32,
}

impl LineItem {
    pub fn new(product_id: u64, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Direction of a stock adjustment, sent as `"-"` or `"+"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockOperation {
    #[serde(rename = "-")]
    Decrease,
    #[serde(rename = "+")]
    Increase,
}

impl StockOperation {
    fn operation_name(self) -> &'static str {
        match self {
            StockOperation::Decrease => "decrease stock",
            StockOperation::Increase => "increase stock",
        }
    }
}

/// Body of an adjust-stock request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockAdjustment {
    pub items: Vec<LineItem>,
    pub operation: StockOperation,
}

/// Trait for stock management operations.
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// Takes the items out of stock or puts them back.
    async fn adjust_stock(
        &self,
        items: &[LineItem],
        operation: StockOperation,
    ) -> Result<(), ServiceError>;
}

/// Inventory service reached through the API gateway.
#[derive(Debug, Clone)]
pub struct HttpInventoryService {
    gateway: GatewayClient,
}

impl HttpInventoryService {
    pub fn new(gateway: GatewayClient) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl InventoryService for HttpInventoryService {
    async fn adjust_stock(
        &self,
        items: &[LineItem],
        operation: StockOperation,
    ) -> Result<(), ServiceError> {
        let body = StockAdjustment {
            items: items.to_vec(),
            operation,
        };
        let request = self
            .gateway
            .http()
            .put(self.gateway.url(STOCKS_PATH))
            .json(&body);

        gateway::send(operation.operation_name(), request).await?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    calls: Vec<StockAdjustment>,
    fail_on_decrease: bool,
    fail_on_increase: bool,
}

/// In-memory inventory service for testing.
///
/// Records every adjustment it receives, including the failed ones.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryService {
    state: Arc<RwLock<InMemoryInventoryState>>,
}

impl InMemoryInventoryService {
    /// Creates a new in-memory inventory service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to reject stock decreases.
    pub fn set_fail_on_decrease(&self, fail: bool) {
        self.state.write().unwrap().fail_on_decrease = fail;
    }

    /// Configures the service to reject stock increases.
    pub fn set_fail_on_increase(&self, fail: bool) {
        self.state.write().unwrap().fail_on_increase = fail;
    }

    /// Returns every adjustment received, in call order.
    pub fn calls(&self) -> Vec<StockAdjustment> {
        self.state.read().unwrap().calls.clone()
    }

    /// Returns the number of adjustments received for `operation`.
    pub fn call_count(&self, operation: StockOperation) -> usize {
        self.state
            .read()
            .unwrap()
            .calls
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }
}

#[async_trait]
impl InventoryService for InMemoryInventoryService {
    async fn adjust_stock(
        &self,
        items: &[LineItem],
        operation: StockOperation,
    ) -> Result<(), ServiceError> {
        let mut state = self.state.write().unwrap();
        state.calls.push(StockAdjustment {
            items: items.to_vec(),
            operation,
        });

        let fail = match operation {
            StockOperation::Decrease => state.fail_on_decrease,
            StockOperation::Increase => state.fail_on_increase,
        };
        if fail {
            return Err(ServiceError::Unavailable {
                operation: operation.operation_name(),
                reason: "Insufficient stock".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_serializes_as_sign() {
        let body = StockAdjustment {
            items: vec![LineItem::new(1, 2)],
            operation: StockOperation::Decrease,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "items": [{"product_id": 1, "quantity": 2}],
                "operation": "-"
            })
        );
        assert_eq!(
            serde_json::to_string(&StockOperation::Increase).unwrap(),
            "\"+\""
        );
    }

    #[tokio::test]
    async fn test_records_calls_in_order() {
        let service = InMemoryInventoryService::new();
        let items = vec![LineItem::new(1, 2)];

        service
            .adjust_stock(&items, StockOperation::Decrease)
            .await
            .unwrap();
        service
            .adjust_stock(&items, StockOperation::Increase)
            .await
            .unwrap();

        let calls = service.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].operation, StockOperation::Decrease);
        assert_eq!(calls[1].operation, StockOperation::Increase);
        assert_eq!(calls[1].items, items);
    }

    #[tokio::test]
    async fn test_fail_on_decrease_still_records_call() {
        let service = InMemoryInventoryService::new();
        service.set_fail_on_decrease(true);

        let result = service
            .adjust_stock(&[LineItem::new(1, 1)], StockOperation::Decrease)
            .await;
        assert!(result.is_err());
        assert_eq!(service.call_count(StockOperation::Decrease), 1);

        service
            .adjust_stock(&[LineItem::new(1, 1)], StockOperation::Increase)
            .await
            .unwrap();
    }
}
