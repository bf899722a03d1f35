//! Configuration loading from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};

use legal_types::Currency;

const MIN_JWT_SECRET_LEN: usize = 32;

/// Application configuration.
#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub currency: Currency,
    /// Minor units
    pub subscription_price: i64,
    /// Major units
    pub default_consultation_charge: i64,
    pub upstream_timeout: Duration,
    pub upstream_max_retries: u32,
    pub rate_limit_per_minute: u32,
    pub otlp_endpoint: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| anyhow!("{key} environment variable is required"))
        };
        let optional = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = required("JWT_SECRET")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(anyhow!(
                "JWT_SECRET must be at least {MIN_JWT_SECRET_LEN} bytes"
            ));
        }

        let token_ttl_hours: i64 = parse("TOKEN_TTL_HOURS", &optional("TOKEN_TTL_HOURS", "168"))?;
        let timeout_secs: u64 = parse(
            "UPSTREAM_TIMEOUT_SECS",
            &optional("UPSTREAM_TIMEOUT_SECS", "30"),
        )?;

        Ok(Self {
            port: parse("PORT", &optional("PORT", "3000"))?,
            database_url: required("DATABASE_URL")?,
            jwt_secret,
            token_ttl: chrono::Duration::hours(token_ttl_hours),
            razorpay_key_id: required("RAZORPAY_KEY_ID")?,
            razorpay_key_secret: required("RAZORPAY_KEY_SECRET")?,
            gemini_api_key: required("GEMINI_API_KEY")?,
            gemini_model: optional("GEMINI_MODEL", "gemini-2.0-flash"),
            currency: optional("PAYMENT_CURRENCY", "INR")
                .parse()
                .map_err(|e| anyhow!("PAYMENT_CURRENCY: {e}"))?,
            subscription_price: parse(
                "SUBSCRIPTION_PRICE_MINOR",
                &optional("SUBSCRIPTION_PRICE_MINOR", "29900"),
            )?,
            default_consultation_charge: parse(
                "DEFAULT_CONSULTATION_CHARGE",
                &optional("DEFAULT_CONSULTATION_CHARGE", "1000"),
            )?,
            upstream_timeout: Duration::from_secs(timeout_secs),
            upstream_max_retries: parse(
                "UPSTREAM_MAX_RETRIES",
                &optional("UPSTREAM_MAX_RETRIES", "2"),
            )?,
            rate_limit_per_minute: parse(
                "RATE_LIMIT_PER_MINUTE",
                &optional("RATE_LIMIT_PER_MINUTE", "100"),
            )?,
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|v| !v.is_empty()),
        })
    }
}

fn parse<T>(key: &str, value: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("{key} has an invalid value: {value:?}"))
}
