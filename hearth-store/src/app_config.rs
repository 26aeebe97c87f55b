use hearth_core::payment::{FailurePolicy, GatewayMode};
use hearth_core::HotelSettings;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use uuid::Uuid;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub redis: Option<RedisConfig>,
    pub billing: BillingConfig,
    pub payment: PaymentConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_request_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Unset means the in-memory store.
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BillingConfig {
    pub default_tax_rate: f64,
    /// Hotel id to tax rate.
    #[serde(default)]
    pub hotel_tax_rates: HashMap<String, f64>,
    pub currency: String,
    #[serde(default = "default_horizon")]
    pub overbooking_horizon_days: u32,
}

fn default_horizon() -> u32 {
    14
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentConfig {
    #[serde(default)]
    pub mode: GatewayMode,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    pub api_url: Option<String>,
    pub api_login_id: Option<String>,
    pub transaction_key: Option<String>,
    #[serde(default = "default_payment_timeout")]
    pub timeout_seconds: u64,
}

fn default_payment_timeout() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    pub requests_per_window: i64,
    pub window_seconds: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 100,
            window_seconds: 60,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid tax rate {value} for {scope}")]
    TaxRate { scope: String, value: f64 },
    #[error("invalid hotel id in billing.hotel_tax_rates: {0}")]
    HotelId(String),
}

fn tax_rate(scope: &str, value: f64) -> Result<Decimal, SettingsError> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(4))
        .filter(|d| !d.is_sign_negative() && *d < Decimal::ONE)
        .ok_or_else(|| SettingsError::TaxRate {
            scope: scope.to_string(),
            value,
        })
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `HEARTH__DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("HEARTH").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn hotel_settings(&self) -> Result<HotelSettings, SettingsError> {
        let mut tax_rates = HashMap::new();
        for (hotel, rate) in &self.billing.hotel_tax_rates {
            let id = Uuid::parse_str(hotel).map_err(|_| SettingsError::HotelId(hotel.clone()))?;
            tax_rates.insert(id, tax_rate(hotel, *rate)?);
        }

        Ok(HotelSettings {
            default_tax_rate: tax_rate("default", self.billing.default_tax_rate)?,
            tax_rates,
            currency: self.billing.currency.clone(),
            overbooking_horizon_days: self.billing.overbooking_horizon_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(default_rate: f64, overrides: &[(&str, f64)]) -> Config {
        Config {
            server: ServerConfig { port: 3000, request_timeout_seconds: 30 },
            database: DatabaseConfig::default(),
            redis: None,
            billing: BillingConfig {
                default_tax_rate: default_rate,
                hotel_tax_rates: overrides.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                currency: "USD".to_string(),
                overbooking_horizon_days: 14,
            },
            payment: PaymentConfig {
                mode: GatewayMode::Simulated,
                failure_policy: FailurePolicy::FailClosed,
                api_url: None,
                api_login_id: None,
                transaction_key: None,
                timeout_seconds: 10,
            },
            rate_limit: RateLimitConfig::default(),
        }
    }

    #[test]
    fn test_hotel_settings_from_config() {
        let hotel = Uuid::new_v4();
        let settings = config(0.10, &[(&hotel.to_string(), 0.125)]).hotel_settings().unwrap();

        assert_eq!(settings.default_tax_rate, Decimal::new(10, 2));
        assert_eq!(settings.tax_rate_for(hotel), Decimal::new(125, 3));
    }

    #[test]
    fn test_rejects_bad_rates_and_ids() {
        assert!(config(-0.1, &[]).hotel_settings().is_err());
        assert!(config(0.1, &[("not-a-uuid", 0.08)]).hotel_settings().is_err());
    }
}
