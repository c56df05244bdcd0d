use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    Unprocessable(String),

    /// Shown to the shopper, so it has to point at manual reconciliation
    /// instead of failing silently.
    #[error(
        "The order could not be created. Your payment{} may need manual reconciliation; please contact support.",
        .transaction_id.as_deref().map(|t| format!(" (transaction {t})")).unwrap_or_default()
    )]
    OrderNotCreated {
        transaction_id: Option<String>,
        reason: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound(msg) => AppError::NotFound(msg),
            DomainError::InvalidInput(msg) => AppError::BadRequest(msg),
            DomainError::Conflict(msg) => AppError::Conflict(msg),
            e @ DomainError::InvalidTransition { .. } => AppError::Conflict(e.to_string()),
            e @ (DomainError::Validation(_)
            | DomainError::PaymentNotConfirmed { .. }
            | DomainError::PaymentUnlinked { .. }) => AppError::Unprocessable(e.to_string()),
            DomainError::Persistence(msg) => AppError::Internal(msg),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::OrderNotCreated { .. } | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Internal(detail) => {
                log::error!("Internal error: {}", detail);
                "Internal server error".to_string()
            }
            AppError::OrderNotCreated { reason, transaction_id } => {
                log::error!(
                    "Order creation failed (transaction {}): {}",
                    transaction_id.as_deref().unwrap_or("-"),
                    reason
                );
                self.to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "error": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;

    #[test]
    fn not_found_returns_404() {
        let resp = AppError::NotFound("order NOV-1".into()).error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_error_returns_500() {
        let err = AppError::Internal("something went wrong".to_string());
        assert_eq!(err.error_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn not_found_display() {
        assert_eq!(AppError::NotFound("order NOV-1".into()).to_string(), "Not found: order NOV-1");
    }

    #[test]
    fn order_not_created_mentions_reconciliation_and_transaction() {
        let err = AppError::OrderNotCreated {
            transaction_id: Some("TX-9".into()),
            reason: "connection refused".into(),
        };
        let message = err.to_string();
        assert!(message.contains("manual reconciliation"));
        assert!(message.contains("TX-9"));
        assert!(!message.contains("connection refused"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let without_tx = AppError::OrderNotCreated {
            transaction_id: None,
            reason: "boom".into(),
        };
        assert!(without_tx.to_string().starts_with("The order could not be created. Your payment may"));
    }

    #[test]
    fn domain_errors_map_to_http_statuses() {
        let cases = [
            (DomainError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (DomainError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (DomainError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                DomainError::InvalidTransition {
                    order_number: "NOV-1".into(),
                    from: "completed".into(),
                    to: "pending".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                DomainError::PaymentNotConfirmed {
                    reference: "TX-1".into(),
                    status: "failed".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (DomainError::Persistence("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (domain, status) in cases {
            assert_eq!(AppError::from(domain).status_code(), status);
        }
    }
}
