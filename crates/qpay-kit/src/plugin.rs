//! Host-facing plugin wrapper and gateway chain.
//!
//! Hosts wire gateway adapters into an ordered chain and thread each
//! operation's previously-computed value through it. An inactive plugin is a
//! no-op that hands the previous value back untouched, so it can stay wired
//! into the chain without callers special-casing it.

use std::sync::Arc;

use qpay_core::config::GatewayConfig;
use qpay_core::errors::{ConfigError, Result};
use qpay_core::types::{
    ClientToken, ClientTokenConfig, PaymentRequest, PaymentResult, StoredSources,
};

use crate::concepts::Gateway;

/// Values a checkout form needs before a payment is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfig {
    pub store_customer_card: bool,
    pub client_token: ClientToken,
}

/// A gateway adapter wrapped for the host's plugin chain.
///
/// Construction validates the configuration, so a plugin that exists is
/// guaranteed to hold complete credentials; the only remaining gate is the
/// binary active flag checked at the top of every operation.
#[derive(Debug)]
pub struct GatewayPlugin<G: Gateway> {
    gateway: G,
    config: GatewayConfig,
    active: bool,
}

impl<G: Gateway> GatewayPlugin<G> {
    /// Creates an active plugin. Fails fast on incomplete credentials,
    /// before any network activity.
    pub fn new(gateway: G, config: GatewayConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(GatewayPlugin {
            gateway,
            config,
            active: true,
        })
    }

    /// Creates a plugin that passes every operation through unchanged until
    /// activated.
    pub fn inactive(gateway: G, config: GatewayConfig) -> std::result::Result<Self, ConfigError> {
        let mut plugin = Self::new(gateway, config)?;
        plugin.active = false;
        Ok(plugin)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    #[cfg(feature = "tracing")]
    fn trace_pass_through(&self, operation: &str) {
        tracing::debug!(
            "Plugin '{}' inactive; '{operation}' passes the previous value through",
            self.config.gateway_name
        );
    }

    #[cfg(not(feature = "tracing"))]
    fn trace_pass_through(&self, _operation: &str) {}

    pub async fn authorize_payment(
        &self,
        request: &PaymentRequest,
        previous: Option<PaymentResult>,
    ) -> Result<Option<PaymentResult>> {
        if !self.active {
            self.trace_pass_through("authorize");
            return Ok(previous);
        }
        self.gateway.authorize(request, &self.config).await.map(Some)
    }

    pub async fn capture_payment(
        &self,
        request: &PaymentRequest,
        previous: Option<PaymentResult>,
    ) -> Result<Option<PaymentResult>> {
        if !self.active {
            self.trace_pass_through("capture");
            return Ok(previous);
        }
        self.gateway.capture(request, &self.config).await.map(Some)
    }

    pub async fn process_payment(
        &self,
        request: &PaymentRequest,
        previous: Option<PaymentResult>,
    ) -> Result<Option<PaymentResult>> {
        if !self.active {
            self.trace_pass_through("process_payment");
            return Ok(previous);
        }
        self.gateway
            .process_payment(request, &self.config)
            .await
            .map(Some)
    }

    pub async fn refund_payment(
        &self,
        request: &PaymentRequest,
        previous: Option<PaymentResult>,
    ) -> Result<Option<PaymentResult>> {
        if !self.active {
            self.trace_pass_through("refund");
            return Ok(previous);
        }
        self.gateway.refund(request, &self.config).await.map(Some)
    }

    pub async fn void_payment(
        &self,
        request: &PaymentRequest,
        previous: Option<PaymentResult>,
    ) -> Result<Option<PaymentResult>> {
        if !self.active {
            self.trace_pass_through("void");
            return Ok(previous);
        }
        self.gateway.void(request, &self.config).await.map(Some)
    }

    pub async fn get_client_token(
        &self,
        token_config: Option<&ClientTokenConfig>,
        previous: Option<ClientToken>,
    ) -> Result<Option<ClientToken>> {
        if !self.active {
            self.trace_pass_through("get_client_token");
            return Ok(previous);
        }
        self.gateway
            .get_client_token(&self.config, token_config)
            .await
            .map(Some)
    }

    pub async fn list_payment_sources(
        &self,
        customer_id: &str,
        previous: Option<StoredSources>,
    ) -> Result<Option<StoredSources>> {
        if !self.active {
            self.trace_pass_through("list_payment_sources");
            return Ok(previous);
        }
        self.gateway
            .list_client_sources(&self.config, customer_id)
            .await
            .map(Some)
    }

    /// Checkout bootstrap: whether cards are stored, plus a fresh client
    /// token.
    pub async fn payment_config(
        &self,
        previous: Option<PaymentConfig>,
    ) -> Result<Option<PaymentConfig>> {
        if !self.active {
            self.trace_pass_through("payment_config");
            return Ok(previous);
        }
        let client_token = self.gateway.get_client_token(&self.config, None).await?;
        Ok(Some(PaymentConfig {
            store_customer_card: self.config.store_customer,
            client_token,
        }))
    }
}

/// A plugin over a type-erased gateway, as the chain stores it.
pub type ChainPlugin = GatewayPlugin<Arc<dyn Gateway>>;

/// Ordered chain of gateway plugins.
///
/// Each operation visits every plugin in registration order, threading the
/// previous value through; inactive plugins leave it untouched.
#[derive(Default)]
pub struct PluginChain {
    plugins: Vec<ChainPlugin>,
}

impl PluginChain {
    pub fn new() -> Self {
        PluginChain::default()
    }

    pub fn register(mut self, plugin: ChainPlugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub async fn authorize_payment(
        &self,
        request: &PaymentRequest,
        initial: Option<PaymentResult>,
    ) -> Result<Option<PaymentResult>> {
        let mut previous = initial;
        for plugin in &self.plugins {
            previous = plugin.authorize_payment(request, previous).await?;
        }
        Ok(previous)
    }

    pub async fn capture_payment(
        &self,
        request: &PaymentRequest,
        initial: Option<PaymentResult>,
    ) -> Result<Option<PaymentResult>> {
        let mut previous = initial;
        for plugin in &self.plugins {
            previous = plugin.capture_payment(request, previous).await?;
        }
        Ok(previous)
    }

    pub async fn process_payment(
        &self,
        request: &PaymentRequest,
        initial: Option<PaymentResult>,
    ) -> Result<Option<PaymentResult>> {
        let mut previous = initial;
        for plugin in &self.plugins {
            previous = plugin.process_payment(request, previous).await?;
        }
        Ok(previous)
    }

    pub async fn refund_payment(
        &self,
        request: &PaymentRequest,
        initial: Option<PaymentResult>,
    ) -> Result<Option<PaymentResult>> {
        let mut previous = initial;
        for plugin in &self.plugins {
            previous = plugin.refund_payment(request, previous).await?;
        }
        Ok(previous)
    }

    pub async fn void_payment(
        &self,
        request: &PaymentRequest,
        initial: Option<PaymentResult>,
    ) -> Result<Option<PaymentResult>> {
        let mut previous = initial;
        for plugin in &self.plugins {
            previous = plugin.void_payment(request, previous).await?;
        }
        Ok(previous)
    }

    pub async fn get_client_token(
        &self,
        token_config: Option<&ClientTokenConfig>,
        initial: Option<ClientToken>,
    ) -> Result<Option<ClientToken>> {
        let mut previous = initial;
        for plugin in &self.plugins {
            previous = plugin.get_client_token(token_config, previous).await?;
        }
        Ok(previous)
    }

    pub async fn list_payment_sources(
        &self,
        customer_id: &str,
        initial: Option<StoredSources>,
    ) -> Result<Option<StoredSources>> {
        let mut previous = initial;
        for plugin in &self.plugins {
            previous = plugin.list_payment_sources(customer_id, previous).await?;
        }
        Ok(previous)
    }

    pub async fn payment_config(
        &self,
        initial: Option<PaymentConfig>,
    ) -> Result<Option<PaymentConfig>> {
        let mut previous = initial;
        for plugin in &self.plugins {
            previous = plugin.payment_config(previous).await?;
        }
        Ok(previous)
    }
}
