use anyhow::Result;

pub(crate) const DEFAULT_JWT_SECRET: &str = "medimart-dev-secret";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database: DatabaseConfig,
    /// HS256 secret for bearer-token verification.
    pub jwt_secret: String,
    pub stripe_secret_key: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// MongoDB connection string.
    pub uri: String,
    pub name: String,
}

/// Load configuration from the environment. Values fall back to local-dev
/// defaults; the payment-gateway key has no default and is empty when unset,
/// which makes intent creation fail loudly at the gateway rather than here.
pub fn load() -> Result<AppConfig> {
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5000);

    let uri = std::env::var("MONGODB_URI").unwrap_or("mongodb://localhost:27017".to_string());
    let name = std::env::var("MONGODB_DB").unwrap_or("medicineDB".to_string());

    let jwt_secret = std::env::var("JWT_SECRET").unwrap_or(DEFAULT_JWT_SECRET.to_string());

    let stripe_secret_key = std::env::var("PAYMENT_GATEWAY_KEY").unwrap_or_default();
    if stripe_secret_key.is_empty() {
        tracing::warn!("PAYMENT_GATEWAY_KEY is not set; payment-intent creation will fail");
    }

    Ok(AppConfig {
        port,
        database: DatabaseConfig { uri, name },
        jwt_secret,
        stripe_secret_key,
    })
}
