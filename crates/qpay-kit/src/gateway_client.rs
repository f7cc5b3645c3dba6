//! A remote gateway client that communicates over HTTP.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use qpay_core::config::GatewayConfig;
use qpay_core::errors::{ConfigError, GatewayError, Result};
use qpay_core::types::{
    ClientToken, ClientTokenConfig, PaymentRequest, PaymentResult, StoredSources, TransactionKind,
};

use crate::concepts::Gateway;
use crate::transport::{
    GatewayReply, PaymentCall, SourcesCall, SourcesReply, TokenCall, TokenReply, endpoints,
};

/// [`Gateway`] implementation against the QPay merchant web service.
///
/// Stateless apart from the shared connection pool: endpoint, credentials and
/// checksum material all come from the [`GatewayConfig`] supplied per call.
/// Timeout policy belongs to the caller — hand in a pre-configured
/// [`reqwest::Client`] via [`RemoteGatewayClient::with_client`]; an elapsed
/// timeout surfaces as [`GatewayError::Unavailable`].
#[derive(Debug, Clone, Default)]
pub struct RemoteGatewayClient {
    pub client: reqwest::Client,
}

impl RemoteGatewayClient {
    pub fn new() -> Self {
        RemoteGatewayClient {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        RemoteGatewayClient { client }
    }

    fn endpoint(config: &GatewayConfig, path: &str) -> Result<Url> {
        config
            .connection
            .api_url
            .join(path)
            .map_err(|err| ConfigError::InvalidUrl(err.to_string()).into())
    }

    async fn post<B, R>(&self, config: &GatewayConfig, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(Self::endpoint(config, path)?)
            .basic_auth(
                config.connection.auth_username.expose_secret(),
                Some(config.connection.auth_password.expose_secret()),
            )
            .json(body)
            .send()
            .await
            .map_err(|err| GatewayError::Unavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // Declines come back in-band with a 200; anything else means the
            // service itself is not answering properly.
            return Err(GatewayError::Unavailable(format!(
                "gateway answered HTTP {status}"
            )));
        }

        response
            .json::<R>()
            .await
            .map_err(|err| GatewayError::InvalidReply(err.to_string()))
    }

    async fn payment_call(
        &self,
        path: &'static str,
        kind: TransactionKind,
        request: &PaymentRequest,
        config: &GatewayConfig,
    ) -> Result<PaymentResult> {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Calling gateway endpoint '{path}' for payment '{}'",
            request.payment_id
        );

        let call = PaymentCall::new(request, config);
        let reply: GatewayReply = self.post(config, path, &call).await?;
        let result = reply.into_result(kind, request)?;

        #[cfg(feature = "tracing")]
        if let Some(error) = &result.error {
            tracing::debug!(
                "Gateway reported failure for payment '{}': {error}",
                request.payment_id
            );
        }

        Ok(result)
    }
}

#[async_trait]
impl Gateway for RemoteGatewayClient {
    async fn authorize(
        &self,
        request: &PaymentRequest,
        config: &GatewayConfig,
    ) -> Result<PaymentResult> {
        self.payment_call(endpoints::AUTHORIZE, TransactionKind::Auth, request, config)
            .await
    }

    async fn capture(
        &self,
        request: &PaymentRequest,
        config: &GatewayConfig,
    ) -> Result<PaymentResult> {
        self.payment_call(endpoints::CAPTURE, TransactionKind::Capture, request, config)
            .await
    }

    async fn refund(
        &self,
        request: &PaymentRequest,
        config: &GatewayConfig,
    ) -> Result<PaymentResult> {
        self.payment_call(endpoints::REFUND, TransactionKind::Refund, request, config)
            .await
    }

    async fn void(
        &self,
        request: &PaymentRequest,
        config: &GatewayConfig,
    ) -> Result<PaymentResult> {
        self.payment_call(endpoints::VOID, TransactionKind::Void, request, config)
            .await
    }

    async fn get_client_token(
        &self,
        config: &GatewayConfig,
        token_config: Option<&ClientTokenConfig>,
    ) -> Result<ClientToken> {
        let customer_id = token_config.and_then(|tc| tc.customer_id.as_deref());
        let call = TokenCall::new(config, customer_id);
        let reply: TokenReply = self.post(config, endpoints::TOKEN, &call).await?;
        Ok(reply.token)
    }

    async fn list_client_sources(
        &self,
        config: &GatewayConfig,
        customer_id: &str,
    ) -> Result<StoredSources> {
        let call = SourcesCall::new(config, customer_id);
        let reply: SourcesReply = self.post(config, endpoints::SOURCES, &call).await?;
        Ok(StoredSources::new(reply.sources))
    }
}
