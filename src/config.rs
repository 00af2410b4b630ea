use rust_decimal::Decimal;
use secrecy::Secret;
use serde::Deserialize;
use std::str::FromStr;

use crate::services::credentials::DEFAULT_ADMIN_PASSWORD;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://health_pool.db";
pub const DEFAULT_SMS_API_URL: &str = "https://api.africastalking.com/version1/messaging";

#[derive(Debug, Clone, Deserialize)]
pub struct SmsConfig {
    pub username: String,
    pub api_key: Secret<String>,
    pub api_url: String,
    pub sender_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub secure_cookies: bool,

    // Bootstrap admin password; the well-known seed is used when unset
    pub admin_password: Option<Secret<String>>,

    // Monthly amount assigned to newly registered members
    pub default_monthly_amount: Decimal,

    // SMS gateway, disabled when username or key is missing
    pub sms: Option<SmsConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        let default_monthly_amount = match config.get_string("default_monthly_amount") {
            Ok(raw) => Decimal::from_str(raw.trim()).map_err(|e| {
                config::ConfigError::Message(format!("invalid DEFAULT_MONTHLY_AMOUNT: {e}"))
            })?,
            Err(_) => Decimal::new(5000, 2),
        };
        if default_monthly_amount.is_sign_negative() {
            return Err(config::ConfigError::Message(
                "DEFAULT_MONTHLY_AMOUNT cannot be negative".to_string(),
            ));
        }

        let non_empty = |key: &str| config.get_string(key).ok().filter(|v| !v.trim().is_empty());

        let sms = match (non_empty("sms_username"), non_empty("sms_api_key")) {
            (Some(username), Some(api_key)) => Some(SmsConfig {
                username,
                api_key: Secret::new(api_key),
                api_url: non_empty("sms_api_url")
                    .unwrap_or_else(|| DEFAULT_SMS_API_URL.to_string()),
                sender_id: non_empty("sms_sender_id"),
            }),
            _ => None,
        };

        Ok(Self {
            database_url: config
                .get_string("database_url")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            host: config.get("host").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: config.get("port").unwrap_or(5000),
            secure_cookies: config.get_bool("secure_cookies").unwrap_or(false),

            admin_password: non_empty("admin_password").map(Secret::new),

            default_monthly_amount,
            sms,
        })
    }

    /// Password for the bootstrap admin, warning when the seed is in use.
    pub fn bootstrap_admin_password(&self) -> String {
        use secrecy::ExposeSecret;

        match &self.admin_password {
            Some(password) => password.expose_secret().clone(),
            None => {
                tracing::warn!(
                    "ADMIN_PASSWORD not set; using the default admin password. Change it before production use"
                );
                DEFAULT_ADMIN_PASSWORD.to_string()
            }
        }
    }
}
