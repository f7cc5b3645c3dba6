//! Gateway configuration.
//!
//! Hosts hand over configuration as a loosely-typed list of name/value
//! entries; [`GatewayConfig::from_entries`] validates it once and returns a
//! typed [`ConfigError`] instead of failing later with a missing-key fault.

use bon::Builder;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::ConfigError;

pub const GATEWAY_NAME: &str = "QPay";

/// Entry names as the host's configuration UI declares them.
pub mod fields {
    pub const API_URL: &str = "API URL";
    pub const INVOICE_CODE: &str = "Invoice code";
    pub const MERCHANT_CODE: &str = "Merchant code";
    pub const VERIFICATION_CODE: &str = "Verification code";
    pub const AUTH_USERNAME: &str = "Auth username";
    pub const AUTH_PASSWORD: &str = "Auth password";
    pub const AUTO_CAPTURE: &str = "Automatic payment capture";
    pub const STORE_CUSTOMERS_CARD: &str = "Store customers card";
    pub const REQUIRE_3D_SECURE: &str = "Require 3D secure";
}

/// One name/value pair from the host's configuration storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub name: String,
    pub value: Option<String>,
}

impl ConfigEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        ConfigEntry {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// Connection parameters for the merchant web service.
///
/// All credential fields are secrets; `Debug` output stays redacted.
#[derive(Builder, Debug, Clone)]
pub struct ConnectionParams {
    /// Endpoint of the merchant web service.
    pub api_url: Url,
    #[builder(into)]
    pub invoice_code: SecretString,
    #[builder(into)]
    pub merchant_code: SecretString,
    /// Shared secret the gateway uses to verify request checksums.
    #[builder(into)]
    pub verification_code: SecretString,
    #[builder(into)]
    pub auth_username: SecretString,
    #[builder(into)]
    pub auth_password: SecretString,
}

impl ConnectionParams {
    /// All five credential fields must be non-empty before any operation is
    /// attempted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&'static str, &SecretString); 5] = [
            (fields::INVOICE_CODE, &self.invoice_code),
            (fields::MERCHANT_CODE, &self.merchant_code),
            (fields::VERIFICATION_CODE, &self.verification_code),
            (fields::AUTH_USERNAME, &self.auth_username),
            (fields::AUTH_PASSWORD, &self.auth_password),
        ];

        for (name, secret) in checks {
            if secret.expose_secret().trim().is_empty() {
                return Err(ConfigError::EmptyField(name));
            }
        }

        Ok(())
    }
}

/// Immutable gateway configuration, constructed once at plugin activation.
#[derive(Builder, Debug, Clone)]
pub struct GatewayConfig {
    #[builder(default = GATEWAY_NAME.to_string(), into)]
    pub gateway_name: String,
    /// Capture automatically right after a successful authorization.
    #[builder(default)]
    pub auto_capture: bool,
    #[builder(default)]
    pub require_3d_secure: bool,
    /// Persist a reusable payment token for the customer.
    #[builder(default)]
    pub store_customer: bool,
    pub connection: ConnectionParams,
}

impl GatewayConfig {
    /// Builds and validates a configuration from host-supplied entries.
    pub fn from_entries(entries: &[ConfigEntry]) -> Result<Self, ConfigError> {
        let raw_url = required(entries, fields::API_URL)?;
        let api_url =
            Url::parse(raw_url).map_err(|err| ConfigError::InvalidUrl(err.to_string()))?;

        let connection = ConnectionParams::builder()
            .api_url(api_url)
            .invoice_code(required(entries, fields::INVOICE_CODE)?.to_string())
            .merchant_code(required(entries, fields::MERCHANT_CODE)?.to_string())
            .verification_code(required(entries, fields::VERIFICATION_CODE)?.to_string())
            .auth_username(required(entries, fields::AUTH_USERNAME)?.to_string())
            .auth_password(required(entries, fields::AUTH_PASSWORD)?.to_string())
            .build();

        let config = GatewayConfig::builder()
            .auto_capture(flag(entries, fields::AUTO_CAPTURE)?)
            .store_customer(flag(entries, fields::STORE_CUSTOMERS_CARD)?)
            .require_3d_secure(flag(entries, fields::REQUIRE_3D_SECURE)?)
            .connection(connection)
            .build();

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.connection.validate()
    }
}

fn lookup<'a>(entries: &'a [ConfigEntry], name: &str) -> Option<&'a str> {
    entries
        .iter()
        .find(|entry| entry.name == name)
        .and_then(|entry| entry.value.as_deref())
}

fn required<'a>(entries: &'a [ConfigEntry], name: &'static str) -> Result<&'a str, ConfigError> {
    match lookup(entries, name) {
        None => Err(ConfigError::MissingField(name)),
        Some(value) if value.trim().is_empty() => Err(ConfigError::EmptyField(name)),
        Some(value) => Ok(value),
    }
}

fn flag(entries: &[ConfigEntry], name: &'static str) -> Result<bool, ConfigError> {
    let value = required(entries, name)?;
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            field: name,
            value: value.to_string(),
        }),
    }
}
