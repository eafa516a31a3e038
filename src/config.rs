//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 8083)
//! - `STOREFRONT_DATA_DIR` - Directory holding one sub-directory per cart session (default: ./data)
//! - `FREE_SHIPPING_ABOVE` - Subtotal above which shipping is free (default: 499)
//! - `SHIPPING_FEE` - Flat shipping fee below the threshold (default: 99)
//! - `COD_CHARGE` - Cash-on-delivery surcharge (default: 50)
//! - `COUPONS_FILE` - Optional JSON file of coupon definitions
//! - `SESSION_IDLE_SECS` - Seconds before an idle session leaves memory (default: 1800)

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::api::DEFAULT_SESSION_IDLE;
use crate::domain::aggregates::PricingRules;
use crate::domain::value_objects::Rupees;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub data_dir: PathBuf,
    pub pricing: PricingRules,
    pub coupons_file: Option<PathBuf>,
    pub session_idle: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset or blank keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = PricingRules::default();
        Ok(Self {
            host: parse_or(&get, "STOREFRONT_HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
            port: parse_or(&get, "PORT", 8083)?,
            data_dir: get("STOREFRONT_DATA_DIR").map_or_else(|| PathBuf::from("./data"), PathBuf::from),
            pricing: PricingRules {
                free_shipping_above: Rupees::new(parse_or(&get, "FREE_SHIPPING_ABOVE", defaults.free_shipping_above.amount())?),
                shipping_fee: Rupees::new(parse_or(&get, "SHIPPING_FEE", defaults.shipping_fee.amount())?),
                cod_charge: Rupees::new(parse_or(&get, "COD_CHARGE", defaults.cod_charge.amount())?),
            },
            coupons_file: get("COUPONS_FILE").map(PathBuf::from),
            session_idle: Duration::from_secs(parse_or(&get, "SESSION_IDLE_SECS", DEFAULT_SESSION_IDLE.as_secs())?),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
