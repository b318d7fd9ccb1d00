//! Downstream service traits with HTTP and in-memory implementations.

pub mod gateway;
pub mod inventory;
pub mod orders;
pub mod payment;

pub use gateway::GatewayClient;
pub use inventory::{
    HttpInventoryService, InMemoryInventoryService, InventoryService, LineItem, StockAdjustment,
    StockOperation,
};
pub use orders::{HttpOrderLookupService, InMemoryOrderLookupService, OrderLookupService};
pub use payment::{
    HttpPaymentService, InMemoryPaymentService, PaymentReceipt, PaymentRequest, PaymentService,
};
