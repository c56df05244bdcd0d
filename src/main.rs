use dotenvy::dotenv;
use storefront_orders::config::AppConfig;
use storefront_orders::{build_server, create_pool, mirror_relay, run_migrations};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().expect("Invalid configuration");

    let pool = create_pool(&config.database_url, config.db_pool_size);
    run_migrations(&pool);

    if config.legacy_rpc.primary_url.trim().is_empty() && config.legacy_rpc.backup_url.trim().is_empty() {
        log::warn!("No legacy tracker endpoint configured; mirror writes stay queued");
    }
    let relay = mirror_relay(pool.clone(), &config);
    actix_web::rt::spawn(relay.run(config.mirror.poll_interval));

    log::info!("Starting server at http://{}:{}", config.host, config.port);

    build_server(pool, &config.host, config.port)?.await
}
