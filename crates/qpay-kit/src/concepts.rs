//! Core traits used across the QPay Kit.

use std::sync::Arc;

use async_trait::async_trait;

use qpay_core::config::GatewayConfig;
use qpay_core::errors::{GatewayError, Result};
use qpay_core::types::{
    ClientToken, ClientTokenConfig, PaymentRequest, PaymentResult, StoredSources,
};

/// A payment gateway adapter.
///
/// Every operation is a stateless translation: pure given the supplied
/// [`GatewayConfig`] and request value, with no hidden state and no retries.
/// Implementations are object-safe so adapters can be chained behind
/// `Arc<dyn Gateway>`.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Reserves funds on the payer's instrument without transferring them.
    async fn authorize(
        &self,
        request: &PaymentRequest,
        config: &GatewayConfig,
    ) -> Result<PaymentResult>;

    /// Transfers previously authorized funds to the merchant.
    async fn capture(
        &self,
        request: &PaymentRequest,
        config: &GatewayConfig,
    ) -> Result<PaymentResult>;

    /// Returns previously captured funds to the payer.
    async fn refund(
        &self,
        request: &PaymentRequest,
        config: &GatewayConfig,
    ) -> Result<PaymentResult>;

    /// Cancels an authorization that has not been captured yet.
    async fn void(
        &self,
        request: &PaymentRequest,
        config: &GatewayConfig,
    ) -> Result<PaymentResult>;

    /// Requests a short-lived token for client-side tokenized payment entry.
    async fn get_client_token(
        &self,
        config: &GatewayConfig,
        token_config: Option<&ClientTokenConfig>,
    ) -> Result<ClientToken>;

    /// Lists the payment methods previously stored for a customer.
    async fn list_client_sources(
        &self,
        config: &GatewayConfig,
        customer_id: &str,
    ) -> Result<StoredSources>;

    /// Authorize, then capture immediately when the configuration asks for
    /// automatic capture.
    ///
    /// A capture failure after a successful authorization yields the explicit
    /// authorized-but-not-captured result instead of rolling anything back.
    async fn process_payment(
        &self,
        request: &PaymentRequest,
        config: &GatewayConfig,
    ) -> Result<PaymentResult> {
        let auth = self.authorize(request, config).await?;

        if !config.auto_capture || !auth.success || auth.action_required {
            return Ok(auth);
        }

        let Some(transaction_id) = auth.transaction_id.clone() else {
            return Ok(auth);
        };

        let capture_request = PaymentRequest {
            transaction_id: Some(transaction_id.clone()),
            three_d_secure: None,
            ..request.clone()
        };

        match self.capture(&capture_request, config).await {
            Ok(capture) if capture.success => {
                // Keep a token minted during authorization visible to the host.
                if capture.customer_token.is_none() {
                    if let Some(token) = auth.customer_token {
                        return Ok(capture.with_customer_token(token));
                    }
                }
                Ok(capture)
            }
            Ok(capture) => {
                let reason = capture.error.unwrap_or_else(|| {
                    GatewayError::Rejected("Capture declined with no error detail".to_string())
                });
                Ok(PaymentResult::authorized_not_captured(transaction_id, reason))
            }
            Err(err) => Ok(PaymentResult::authorized_not_captured(transaction_id, err)),
        }
    }
}

#[async_trait]
impl<T: Gateway + ?Sized> Gateway for Arc<T> {
    async fn authorize(
        &self,
        request: &PaymentRequest,
        config: &GatewayConfig,
    ) -> Result<PaymentResult> {
        (**self).authorize(request, config).await
    }

    async fn capture(
        &self,
        request: &PaymentRequest,
        config: &GatewayConfig,
    ) -> Result<PaymentResult> {
        (**self).capture(request, config).await
    }

    async fn refund(
        &self,
        request: &PaymentRequest,
        config: &GatewayConfig,
    ) -> Result<PaymentResult> {
        (**self).refund(request, config).await
    }

    async fn void(
        &self,
        request: &PaymentRequest,
        config: &GatewayConfig,
    ) -> Result<PaymentResult> {
        (**self).void(request, config).await
    }

    async fn get_client_token(
        &self,
        config: &GatewayConfig,
        token_config: Option<&ClientTokenConfig>,
    ) -> Result<ClientToken> {
        (**self).get_client_token(config, token_config).await
    }

    async fn list_client_sources(
        &self,
        config: &GatewayConfig,
        customer_id: &str,
    ) -> Result<StoredSources> {
        (**self).list_client_sources(config, customer_id).await
    }

    async fn process_payment(
        &self,
        request: &PaymentRequest,
        config: &GatewayConfig,
    ) -> Result<PaymentResult> {
        (**self).process_payment(request, config).await
    }
}
