use anyhow::{anyhow, Context, Result};
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::payments::providers::AntomConfig;

const MAX_GATEWAY_RETRIES: u32 = 10;
const MAX_RETRY_BACKOFF_MS: u64 = 60_000;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    pub checkout: CheckoutConfig,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_path_prefix: String,
    pub client_id: String,
    #[serde(default)]
    pub merchant_private_key: String,
    #[serde(default)]
    pub merchant_private_key_file: Option<String>,
    #[serde(default)]
    pub gateway_public_key: String,
    #[serde(default)]
    pub gateway_public_key_file: Option<String>,
    pub key_version: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutConfig {
    /// Where the gateway posts payment notifications
    pub notify_url: String,
    /// Checkout page the buyer returns to; `paymentRequestId` is appended
    pub redirect_url: String,
    pub order_description: String,
    pub buyer_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    20
}

impl GatewayConfig {
    pub fn is_sandbox(&self) -> bool {
        self.api_path_prefix.contains("/sandbox") || self.client_id.starts_with("SANDBOX_")
    }

    pub fn antom_config(&self) -> AntomConfig {
        AntomConfig {
            base_url: self.base_url.clone(),
            api_path_prefix: self.api_path_prefix.clone(),
            client_id: self.client_id.clone(),
            merchant_private_key: self.merchant_private_key.clone(),
            gateway_public_key: self.gateway_public_key.clone(),
            key_version: self.key_version.clone(),
            timeout_secs: self.timeout_secs,
            max_retries: self.max_retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    /// Read key material from the `*_file` settings when not given inline
    fn resolve_key_files(&mut self) -> Result<()> {
        if self.merchant_private_key.trim().is_empty() {
            if let Some(path) = &self.merchant_private_key_file {
                self.merchant_private_key = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read merchant private key from {}", path))?;
            }
        }

        if self.gateway_public_key.trim().is_empty() {
            if let Some(path) = &self.gateway_public_key_file {
                self.gateway_public_key = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read gateway public key from {}", path))?;
            }
        }

        Ok(())
    }
}

impl Config {
    /// Load from defaults, an optional `checkout.toml` and `CHECKOUT__*` variables
    ///
    /// e.g. `CHECKOUT__GATEWAY__CLIENT_ID` sets `gateway.client_id`.
    pub fn load() -> Result<Self> {
        let settings = Self::defaults()?
            .add_source(File::with_name("checkout").required(false))
            .add_source(Environment::with_prefix("CHECKOUT").separator("__"))
            .build()
            .context("Failed to assemble configuration")?;

        Self::from_settings(settings)
    }

    pub fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        let builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.environment", "development")?
            .set_default("gateway.base_url", "https://open-sea-global.alipay.com")?
            .set_default("gateway.api_path_prefix", "/ams/api/v1")?
            .set_default("gateway.client_id", "")?
            .set_default("gateway.key_version", "1")?
            .set_default("gateway.timeout_secs", 30)?
            .set_default("gateway.max_retries", 3)?
            .set_default("gateway.retry_backoff_ms", 1000)?
            .set_default(
                "checkout.notify_url",
                "http://localhost:8080/payment/receivePaymentNotify",
            )?
            .set_default("checkout.redirect_url", "http://localhost:8080/index.html")?
            .set_default("checkout.order_description", "EduSmart Payment")?
            .set_default("checkout.buyer_id", "defaultBuyer")?;

        Ok(builder)
    }

    pub fn from_settings(settings: config::Config) -> Result<Self> {
        let mut config: Config = settings
            .try_deserialize()
            .context("Configuration has invalid values")?;

        config.gateway.resolve_key_files()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Validate port range
        if self.server.port < 1024 {
            return Err(anyhow!(
                "Port must be at least 1024, got {}",
                self.server.port
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&self.server.environment.as_str()) {
            return Err(anyhow!(
                "Environment must be one of: {:?}, got {}",
                valid_environments,
                self.server.environment
            ));
        }

        // Validate gateway settings
        if self.gateway.base_url.trim().is_empty() {
            return Err(anyhow!("gateway.base_url cannot be empty"));
        }

        if !self.gateway.api_path_prefix.starts_with('/') {
            return Err(anyhow!(
                "gateway.api_path_prefix must start with '/', got {}",
                self.gateway.api_path_prefix
            ));
        }

        if self.gateway.client_id.trim().is_empty() {
            return Err(anyhow!("gateway.client_id cannot be empty"));
        }

        if self.gateway.merchant_private_key.trim().is_empty() {
            return Err(anyhow!(
                "gateway.merchant_private_key (or merchant_private_key_file) must be set"
            ));
        }

        if self.gateway.gateway_public_key.trim().is_empty() {
            return Err(anyhow!(
                "gateway.gateway_public_key (or gateway_public_key_file) must be set"
            ));
        }

        if self.gateway.key_version.trim().is_empty() {
            return Err(anyhow!("gateway.key_version cannot be empty"));
        }

        if self.gateway.max_retries > MAX_GATEWAY_RETRIES {
            return Err(anyhow!(
                "gateway.max_retries must be at most {}",
                MAX_GATEWAY_RETRIES
            ));
        }

        if self.gateway.retry_backoff_ms > MAX_RETRY_BACKOFF_MS {
            return Err(anyhow!(
                "gateway.retry_backoff_ms must be at most {}",
                MAX_RETRY_BACKOFF_MS
            ));
        }

        if self.server.environment == "production" && self.gateway.is_sandbox() {
            return Err(anyhow!(
                "Sandbox gateway credentials cannot be used in production"
            ));
        }

        // Validate checkout URLs
        reqwest::Url::parse(&self.checkout.notify_url).with_context(|| {
            format!("checkout.notify_url is not a URL: {}", self.checkout.notify_url)
        })?;
        reqwest::Url::parse(&self.checkout.redirect_url).with_context(|| {
            format!("checkout.redirect_url is not a URL: {}", self.checkout.redirect_url)
        })?;

        // Validate database settings
        if let Some(database) = &self.database {
            if database.url.trim().is_empty() {
                return Err(anyhow!("database.url cannot be empty"));
            }

            if database.max_connections == 0 {
                return Err(anyhow!("database.max_connections must be greater than 0"));
            }
        }

        Ok(())
    }
}
