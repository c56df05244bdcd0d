pub mod mirror_relay;
pub mod order_service;
pub mod payment_service;
pub mod stock_service;

pub use mirror_relay::{MirrorRelay, RelayReport};
pub use order_service::OrderService;
pub use payment_service::PaymentRecorder;
pub use stock_service::{LockReport, SettleReport, StockReservationEngine};
