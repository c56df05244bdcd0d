pub mod checkout;
pub mod discount;
pub mod errors;
pub mod mirror;
pub mod order;
pub mod order_number;
pub mod payment;
pub mod ports;
pub mod stock;
