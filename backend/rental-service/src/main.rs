/// Rental Service - HTTP Server
///
/// Serves the payment and playback endpoints for the mobile client and the
/// administrative endpoints for the admin console.
use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use crypto_core::jwt::JwtKeys;
use db_pool::{create_pool, DbConfig};
use rental_service::db::{PgAccessStore, PgMovieStore, PgPaymentStore, PgSequenceStore};
use rental_service::services::{AccessGate, IdAllocator, OrderService, RazorpayGateway};
use rental_service::{handlers, json_config, query_config, Config};
use std::sync::Arc;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rental_service=info,actix_web=info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    init_tracing(config.is_production());

    tracing::info!(
        env = %config.app.env,
        host = %config.app.host,
        port = config.app.port,
        "Starting rental-service"
    );

    let db_config = DbConfig::new(
        "rental-service",
        &config.database.url,
        config.database.max_connections,
    );
    db_config.log_config();
    let pool = create_pool(db_config)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    let movies = Arc::new(PgMovieStore::new(pool.clone()));
    let payments = Arc::new(PgPaymentStore::new(pool.clone()));
    let accesses = Arc::new(PgAccessStore::new(pool.clone()));
    let sequences = Arc::new(PgSequenceStore::new(pool.clone()));

    let gateway = Arc::new(
        RazorpayGateway::new(&config.gateway).context("Failed to build payment gateway client")?,
    );
    let ids = IdAllocator::new(
        sequences,
        config.ids.max_retries,
        config.ids.initial_backoff(),
    );

    let orders = web::Data::new(OrderService::new(
        movies.clone(),
        payments,
        accesses.clone(),
        gateway,
        ids,
        chrono::Duration::seconds(config.access.grace_period_secs),
    ));
    let gate = web::Data::new(AccessGate::new(accesses, movies));
    let jwt_keys = web::Data::new(JwtKeys::from_secret(&config.auth.jwt_secret));
    let pool_data = web::Data::new(pool);

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    let allowed_origins = config.allowed_origins();
    let allow_any_origin = allowed_origins.iter().any(|o| o == "*");

    tracing::info!(address = %bind_address, "HTTP server listening");

    HttpServer::new(move || {
        let cors = if allow_any_origin {
            Cors::permissive()
        } else {
            allowed_origins
                .iter()
                .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
                .allow_any_method()
                .allow_any_header()
                .max_age(3600)
        };

        App::new()
            .app_data(orders.clone())
            .app_data(gate.clone())
            .app_data(jwt_keys.clone())
            .app_data(pool_data.clone())
            .app_data(json_config())
            .app_data(query_config())
            .wrap(cors)
            .wrap(TracingLogger::default())
            .configure(handlers::configure)
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run()
    .await?;

    tracing::info!("rental-service shutting down");
    Ok(())
}
