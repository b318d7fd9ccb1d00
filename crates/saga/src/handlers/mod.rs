//! Step handlers of the order-placement saga.

pub mod create_payment;
pub mod decrease_stock;

pub use create_payment::CreatePaymentHandler;
pub use decrease_stock::DecreaseStockHandler;
