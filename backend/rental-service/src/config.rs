/// Configuration management for rental-service
///
/// Values come from environment variables (optionally via `.env`), nested with
/// `__`, e.g. `GATEWAY__KEY_SECRET` or `ACCESS__GRACE_PERIOD_SECS`.
use serde::Deserialize;
use std::time::Duration;

pub const DEVELOPMENT_JWT_SECRET: &str = "development-secret-change-in-production";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub cors: CorsConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub gateway: GatewayConfig,
    pub access: AccessConfig,
    pub ids: IdConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// development, staging or production
    pub env: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins, or `*`
    pub allowed_origins: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub name: String,
    pub base_url: String,
    pub key_id: String,
    pub key_secret: String,
    pub timeout_secs: u64,
    /// Honour the integration-test signature sentinel. Only has an effect in
    /// builds with the `simulated-payments` feature.
    pub allow_simulated_signature: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    /// Extra time on top of the movie runtime before an access expires
    pub grace_period_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .set_default("app.env", "development")?
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 8000)?
            .set_default("cors.allowed_origins", "http://localhost:5173,http://localhost:3000")?
            .set_default("database.url", "postgres://localhost/rental")?
            .set_default("database.max_connections", 10)?
            .set_default("auth.jwt_secret", DEVELOPMENT_JWT_SECRET)?
            .set_default("gateway.name", "razorpay")?
            .set_default("gateway.base_url", "https://api.razorpay.com/v1")?
            .set_default("gateway.key_id", "")?
            .set_default("gateway.key_secret", "")?
            .set_default("gateway.timeout_secs", 10)?
            .set_default("gateway.allow_simulated_signature", false)?
            .set_default("access.grace_period_secs", 1800)?
            .set_default("ids.max_retries", 5)?
            .set_default("ids.initial_backoff_ms", 20)?
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.app.env.eq_ignore_ascii_case("production")
    }

    /// Reject settings that must never reach production.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.access.grace_period_secs < 0 {
            anyhow::bail!("ACCESS__GRACE_PERIOD_SECS cannot be negative");
        }

        if !self.is_production() {
            return Ok(());
        }

        if self.gateway.allow_simulated_signature {
            anyhow::bail!("GATEWAY__ALLOW_SIMULATED_SIGNATURE cannot be enabled in production");
        }
        if self.auth.jwt_secret == DEVELOPMENT_JWT_SECRET {
            anyhow::bail!("AUTH__JWT_SECRET must be set in production");
        }
        if self.gateway.key_id.is_empty() || self.gateway.key_secret.is_empty() {
            anyhow::bail!("GATEWAY__KEY_ID and GATEWAY__KEY_SECRET must be set in production");
        }
        if self.cors.allowed_origins.trim() == "*" {
            anyhow::bail!("CORS__ALLOWED_ORIGINS cannot be '*' in production");
        }
        Ok(())
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        self.cors
            .allowed_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl IdConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }
}
