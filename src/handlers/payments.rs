use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::payment::{OrderRef, PaymentData, PaymentOutcome, PaymentRecord};
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordPaymentRequest {
    /// Provider response normalised by the checkout layer.
    #[schema(value_type = Object)]
    pub payment: PaymentData,
    /// Order row id when the caller already knows it.
    #[serde(default)]
    pub order_row_id: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentResponse {
    pub id: i64,
    pub order_number: String,
    pub transaction_id: Option<String>,
    pub method: String,
    pub usd: String,
    pub bs: String,
    pub status: String,
    pub paid_at: String,
}

impl From<PaymentRecord> for PaymentResponse {
    fn from(record: PaymentRecord) -> Self {
        Self {
            id: record.id,
            usd: record.usd.to_string(),
            bs: record.bs.to_string(),
            paid_at: record.paid_at.to_rfc3339(),
            order_number: record.order_number,
            transaction_id: record.transaction_id,
            method: record.method,
            status: record.status,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecordPaymentResponse {
    /// True when the transaction id was already on file.
    pub already_recorded: bool,
    pub payment: PaymentResponse,
}

/// POST /payments
///
/// Records a confirmed payment once per transaction id. A status outside the
/// provider's success statuses is stored as reported and answered with 422,
/// as is a payment whose order cannot be found.
#[utoipa::path(
    post,
    path = "/payments",
    request_body = RecordPaymentRequest,
    responses(
        (status = 201, description = "Payment recorded", body = RecordPaymentResponse),
        (status = 200, description = "Payment was already recorded", body = RecordPaymentResponse),
        (status = 422, description = "Payment not confirmed or not linked to an order"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "payments"
)]
pub async fn record_payment(
    state: web::Data<AppState>,
    body: web::Json<RecordPaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let RecordPaymentRequest { payment, order_row_id } = body.into_inner();
    let order = OrderRef {
        order_number: payment.order_number.clone(),
        row_id: order_row_id,
    };

    let outcome = web::block(move || state.payments.record_payment(&payment, &order))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(match outcome {
        PaymentOutcome::Recorded(record) => HttpResponse::Created().json(RecordPaymentResponse {
            already_recorded: false,
            payment: record.into(),
        }),
        PaymentOutcome::AlreadyRecorded(record) => HttpResponse::Ok().json(RecordPaymentResponse {
            already_recorded: true,
            payment: record.into(),
        }),
    })
}

/// GET /orders/{order_number}/payments
#[utoipa::path(
    get,
    path = "/orders/{order_number}/payments",
    params(
        ("order_number" = String, Path, description = "Order number"),
    ),
    responses(
        (status = 200, description = "Payments recorded for the order", body = [PaymentResponse]),
        (status = 500, description = "Internal server error"),
    ),
    tag = "payments"
)]
pub async fn list_payments(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let order_number = path.into_inner();

    let records = web::block(move || state.payments.payments_for_order(&order_number))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(
        records
            .into_iter()
            .map(PaymentResponse::from)
            .collect::<Vec<_>>(),
    ))
}
