use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::checkout::CheckoutSession;
use crate::domain::errors::DomainError;
use crate::domain::order::{DeliveryInfo, LineItem, Order, OrderStatus};
use crate::domain::stock::StockLockEntry;
use crate::errors::AppError;
use crate::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    /// Order number already shown to the shopper. Generated when absent.
    #[serde(default)]
    pub order_number: Option<String>,
    /// Cart, payment method and delivery details carried through checkout.
    #[schema(value_type = Object)]
    pub session: CheckoutSession,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LineItemResponse {
    pub product: String,
    pub sku: Option<String>,
    pub quantity: i32,
    pub price_usd: String,
    pub price_bs: String,
}

impl From<&LineItem> for LineItemResponse {
    fn from(item: &LineItem) -> Self {
        Self {
            product: item.product.clone(),
            sku: item.sku.clone(),
            quantity: item.quantity,
            price_usd: item.price_usd.to_string(),
            price_bs: item.price_bs.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: i64,
    pub order_number: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    pub payment_method: String,
    pub items: Vec<LineItemResponse>,
    /// Decimal totals as strings to avoid floating-point issues, e.g. "10.00"
    pub total_usd: String,
    pub total_bs: String,
    pub delivery_method: String,
    pub delivery_type: Option<String>,
    #[schema(value_type = Object)]
    pub delivery: DeliveryInfo,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            status: order.status.to_string(),
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
            items: order.items.iter().map(LineItemResponse::from).collect(),
            total_usd: order.totals.usd.to_string(),
            total_bs: order.totals.bs.to_string(),
            order_number: order.order_number,
            payment_method: order.payment_method,
            delivery_method: order.delivery_method,
            delivery_type: order.delivery_type,
            delivery: order.delivery,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateOrderResponse {
    /// False when an order with this number already existed and was returned as is.
    pub created: bool,
    pub order: OrderResponse,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// One of pending, processing, completed, cancelled.
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LockResponse {
    pub id: i64,
    pub product_id: Option<i64>,
    pub variant_id: Option<i64>,
    pub quantity: i32,
    pub status: String,
}

impl From<StockLockEntry> for LockResponse {
    fn from(entry: StockLockEntry) -> Self {
        Self {
            id: entry.id,
            product_id: entry.target.product_id(),
            variant_id: entry.target.variant_id(),
            quantity: entry.quantity,
            status: entry.status.to_string(),
        }
    }
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

fn blocking_failed(e: actix_web::error::BlockingError) -> AppError {
    AppError::Internal(e.to_string())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Creates the order from a checkout session, or returns the existing one if
/// the order number is already on file. The order is always stored as
/// `pending`; its stock is locked and a legacy mirror write is queued.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = CreateOrderResponse),
        (status = 200, description = "Order already existed", body = CreateOrderResponse),
        (status = 400, description = "Invalid cart or order data"),
        (status = 500, description = "Order could not be created"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    state: web::Data<AppState>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let CreateOrderRequest { order_number, session } = body.into_inner();
    let transaction_id = session.transaction_id.clone();

    let app = state.clone();
    let outcome = web::block(move || app.orders.create_from_session(&session, order_number))
        .await
        .map_err(blocking_failed)?
        .map_err(|e| match e {
            e @ DomainError::InvalidInput(_) => AppError::from(e),
            other => AppError::OrderNotCreated {
                transaction_id,
                reason: other.to_string(),
            },
        })?;

    let created = outcome.was_created();
    let order = outcome.into_order();
    state.payments.remember_order(&order.order_number, order.id);

    let body = CreateOrderResponse {
        created,
        order: order.into(),
    };
    Ok(if created {
        HttpResponse::Created().json(body)
    } else {
        HttpResponse::Ok().json(body)
    })
}

/// GET /orders/{order_number}
#[utoipa::path(
    get,
    path = "/orders/{order_number}",
    params(
        ("order_number" = String, Path, description = "Order number, e.g. NOV-12345678"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let order_number = path.into_inner();

    let lookup = order_number.clone();
    let result = web::block(move || state.orders.get_order(&lookup))
        .await
        .map_err(blocking_failed)??;

    match result {
        Some(order) => Ok(HttpResponse::Ok().json(OrderResponse::from(order))),
        None => Err(AppError::NotFound(format!("order {order_number}"))),
    }
}

/// GET /orders
///
/// Returns a paginated list of orders, newest first.
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    state: web::Data<AppState>,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);

    let result = web::block(move || state.orders.list_orders(page, limit))
        .await
        .map_err(blocking_failed)??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result.items.into_iter().map(OrderResponse::from).collect(),
        total: result.total,
        page,
        limit,
    }))
}

/// PUT /orders/{order_number}/status
///
/// Moves the order through its lifecycle. Completing commits the locked
/// stock, cancelling releases it. Setting the current status again does
/// nothing.
#[utoipa::path(
    put,
    path = "/orders/{order_number}/status",
    params(
        ("order_number" = String, Path, description = "Order number"),
    ),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Order after the transition", body = OrderResponse),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Transition not allowed"),
    ),
    tag = "orders"
)]
pub async fn update_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let order_number = path.into_inner();
    let status: OrderStatus = body.status.parse()?;

    let order = web::block(move || state.orders.set_status(&order_number, status))
        .await
        .map_err(blocking_failed)??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// DELETE /orders/{order_number}
///
/// Only pending orders without recorded payments can be deleted; their stock
/// locks are released afterwards.
#[utoipa::path(
    delete,
    path = "/orders/{order_number}",
    params(
        ("order_number" = String, Path, description = "Order number"),
    ),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is no longer pending or has payments"),
    ),
    tag = "orders"
)]
pub async fn delete_order(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let order_number = path.into_inner();

    web::block(move || state.orders.delete_pending_order(&order_number))
        .await
        .map_err(blocking_failed)??;

    Ok(HttpResponse::NoContent().finish())
}

/// GET /orders/{order_number}/stock-locks
#[utoipa::path(
    get,
    path = "/orders/{order_number}/stock-locks",
    params(
        ("order_number" = String, Path, description = "Order number"),
    ),
    responses(
        (status = 200, description = "Stock lock entries of the order", body = [LockResponse]),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn list_stock_locks(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let order_number = path.into_inner();

    let locks = web::block(move || state.orders.stock_locks(&order_number))
        .await
        .map_err(blocking_failed)??;

    Ok(HttpResponse::Ok().json(
        locks
            .into_iter()
            .map(LockResponse::from)
            .collect::<Vec<_>>(),
    ))
}
