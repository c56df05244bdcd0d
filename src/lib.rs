pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod rpc;
pub mod schema;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::{MirrorRelay, OrderService, PaymentRecorder};
use config::AppConfig;
use infrastructure::{
    DieselMirrorOutbox, DieselOrderRepository, DieselPaymentRepository, DieselStockRepository,
};
use rpc::LegacyRpcClient;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) {
    let mut conn = pool.get().expect("Failed to get DB connection for migrations");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run database migrations");
}

/// Services shared by every request handler.
pub struct AppState {
    pub orders: OrderService<DieselOrderRepository, DieselStockRepository>,
    pub payments: PaymentRecorder<DieselPaymentRepository, DieselOrderRepository, DieselMirrorOutbox>,
}

impl AppState {
    pub fn new(pool: DbPool) -> Self {
        let orders = DieselOrderRepository::new(pool.clone());
        Self {
            orders: OrderService::new(orders.clone(), DieselStockRepository::new(pool.clone())),
            payments: PaymentRecorder::new(
                DieselPaymentRepository::new(pool.clone()),
                orders,
                DieselMirrorOutbox::new(pool),
            ),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::orders::create_order,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::update_status,
        handlers::orders::delete_order,
        handlers::orders::list_stock_locks,
        handlers::payments::record_payment,
        handlers::payments::list_payments,
    ),
    components(schemas(
        handlers::orders::CreateOrderRequest,
        handlers::orders::CreateOrderResponse,
        handlers::orders::OrderResponse,
        handlers::orders::LineItemResponse,
        handlers::orders::ListOrdersResponse,
        handlers::orders::UpdateStatusRequest,
        handlers::orders::LockResponse,
        handlers::payments::RecordPaymentRequest,
        handlers::payments::RecordPaymentResponse,
        handlers::payments::PaymentResponse,
    )),
    tags(
        (name = "orders", description = "Storefront order lifecycle"),
        (name = "payments", description = "Payment completion records"),
    )
)]
pub struct ApiDoc;

/// Background task that drains the legacy mirror outbox. Does nothing while
/// no tracker endpoint is configured.
pub fn mirror_relay(pool: DbPool, config: &AppConfig) -> MirrorRelay<DieselMirrorOutbox> {
    MirrorRelay::new(
        DieselMirrorOutbox::new(pool),
        LegacyRpcClient::from_config(&config.legacy_rpc),
        &config.mirror,
    )
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    pool: DbPool,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let state = web::Data::new(AppState::new(pool));

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
            .service(
                web::scope("/orders")
                    .route("", web::post().to(handlers::orders::create_order))
                    .route("", web::get().to(handlers::orders::list_orders))
                    .route("/{order_number}", web::get().to(handlers::orders::get_order))
                    .route("/{order_number}", web::delete().to(handlers::orders::delete_order))
                    .route(
                        "/{order_number}/status",
                        web::put().to(handlers::orders::update_status),
                    )
                    .route(
                        "/{order_number}/stock-locks",
                        web::get().to(handlers::orders::list_stock_locks),
                    )
                    .route(
                        "/{order_number}/payments",
                        web::get().to(handlers::payments::list_payments),
                    ),
            )
            .route("/payments", web::post().to(handlers::payments::record_payment))
    })
    .bind((host.to_string(), port))?
    .run())
}
