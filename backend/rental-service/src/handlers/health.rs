use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use sqlx::PgPool;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
    timestamp: String,
}

/// Liveness: the process is up and serving requests.
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness: PostgreSQL answers. 503 otherwise.
pub async fn readiness_check(pool: web::Data<PgPool>) -> impl Responder {
    let start = std::time::Instant::now();
    let result = sqlx::query("SELECT 1").execute(pool.get_ref()).await;
    let latency_ms = Some(start.elapsed().as_millis() as u64);
    let timestamp = chrono::Utc::now().to_rfc3339();

    match result {
        Ok(_) => HttpResponse::Ok().json(ReadinessResponse {
            ready: true,
            database: "healthy",
            latency_ms,
            timestamp,
        }),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            HttpResponse::ServiceUnavailable().json(ReadinessResponse {
                ready: false,
                database: "unhealthy",
                latency_ms,
                timestamp,
            })
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/health/ready", web::get().to(readiness_check));
}
