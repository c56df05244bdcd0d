use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Invalid status transition for order {order_number}: {from} -> {to}")]
    InvalidTransition {
        order_number: String,
        from: String,
        to: String,
    },
    /// A store-level uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Payment {reference} was not confirmed by the provider (status '{status}')")]
    PaymentNotConfirmed { reference: String, status: String },
    #[error("Payment {reference} could not be linked to order {order_number}")]
    PaymentUnlinked {
        reference: String,
        order_number: String,
    },
    #[error("Persistence error: {0}")]
    Persistence(String),
}
