//! Wire types for the QPay merchant web service.
//!
//! The service speaks JSON over HTTP. Requests are scoped by merchant and
//! invoice code and signed with a SHA-256 checksum derived from the
//! verification code; replies report declines in-band with a 200 status.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

use qpay_core::config::GatewayConfig;
use qpay_core::errors::GatewayError;
use qpay_core::types::{
    Amount, ClientToken, CustomerSource, PaymentRequest, PaymentResult, TransactionId,
    TransactionKind,
};

/// Relative endpoints under the configured API URL.
pub mod endpoints {
    pub const AUTHORIZE: &str = "authorize";
    pub const CAPTURE: &str = "capture";
    pub const REFUND: &str = "refund";
    pub const VOID: &str = "void";
    pub const TOKEN: &str = "token";
    pub const SOURCES: &str = "sources";
}

/// Signs a request: lowercase hex SHA-256 over the scoping fields joined
/// with `|`, with the verification code appended last.
pub fn checksum(parts: &[&str], verification_code: &SecretString) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(b"|");
    }
    hasher.update(verification_code.expose_secret().as_bytes());
    hex::encode(hasher.finalize())
}

/// Envelope for the four payment endpoints. The endpoint, not the payload,
/// selects the operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCall {
    pub merchant_code: String,
    pub invoice_code: String,
    pub payment_id: String,
    pub amount: Amount,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<TransactionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_token: Option<String>,
    pub store_card: bool,
    pub require_3ds: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_url: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication_token: Option<String>,
    pub checksum: String,
}

impl PaymentCall {
    pub fn new(request: &PaymentRequest, config: &GatewayConfig) -> Self {
        let merchant_code = config.connection.merchant_code.expose_secret().to_string();
        let invoice_code = config.connection.invoice_code.expose_secret().to_string();
        let amount = request.amount;
        let checksum = checksum(
            &[
                &merchant_code,
                &invoice_code,
                &request.payment_id,
                &amount.to_string(),
            ],
            &config.connection.verification_code,
        );

        PaymentCall {
            merchant_code,
            invoice_code,
            payment_id: request.payment_id.clone(),
            amount,
            currency: request.currency.clone(),
            transaction_id: request.transaction_id.clone(),
            customer_token: request.customer_token.clone(),
            store_card: config.store_customer,
            require_3ds: config.require_3d_secure,
            return_url: request
                .three_d_secure
                .as_ref()
                .map(|tds| tds.return_url.clone()),
            authentication_token: request
                .three_d_secure
                .as_ref()
                .and_then(|tds| tds.authentication_token.clone()),
            checksum,
        }
    }
}

/// Outcome codes the gateway reports in-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    Approved,
    ActionRequired,
    Declined,
    NotAuthorized,
    AlreadyCaptured,
    AlreadyRefunded,
    RefundExceedsCapture,
}

/// Reply from the four payment endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayReply {
    pub status: ReplyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<TransactionId>,
    /// The gateway's own wording; passed through unmodified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_token: Option<String>,
    /// Captured amount, reported when a refund exceeds it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_amount: Option<Amount>,
}

impl GatewayReply {
    /// Normalizes the reply for the host.
    ///
    /// Declines keep the gateway's message verbatim inside the result; only
    /// an undecodable reply shape is an `Err`.
    pub fn into_result(
        self,
        kind: TransactionKind,
        request: &PaymentRequest,
    ) -> Result<PaymentResult, GatewayError> {
        let reference = self
            .transaction_id
            .as_ref()
            .map(|id| id.0.clone())
            .or_else(|| request.transaction_id.as_ref().map(|id| id.0.clone()))
            .unwrap_or_else(|| request.payment_id.clone());
        let message = self.message.clone();
        let verbatim = move |fallback: String| message.unwrap_or(fallback);

        let result = match self.status {
            ReplyStatus::Approved => {
                let transaction_id = self.transaction_id.clone().ok_or_else(|| {
                    GatewayError::InvalidReply(
                        "approved reply without a transaction id".to_string(),
                    )
                })?;
                let result = PaymentResult::approved(kind, transaction_id);
                match self.customer_token {
                    Some(token) => result.with_customer_token(token),
                    None => result,
                }
            }
            ReplyStatus::ActionRequired => {
                PaymentResult::needs_action(kind, self.transaction_id, self.redirect_url)
            }
            ReplyStatus::Declined => PaymentResult::declined(
                kind,
                GatewayError::Rejected(verbatim("declined".to_string())),
            ),
            ReplyStatus::NotAuthorized => PaymentResult::declined(
                kind,
                GatewayError::NotAuthorized(verbatim(reference)),
            ),
            ReplyStatus::AlreadyCaptured => PaymentResult::declined(
                kind,
                GatewayError::AlreadyCaptured(verbatim(reference)),
            ),
            ReplyStatus::AlreadyRefunded => PaymentResult::declined(
                kind,
                GatewayError::AlreadyRefunded(verbatim(reference)),
            ),
            ReplyStatus::RefundExceedsCapture => PaymentResult::declined(
                kind,
                GatewayError::RefundExceedsCapture {
                    requested: request.amount,
                    captured: self.captured_amount.unwrap_or(Amount::ZERO),
                },
            ),
        };

        Ok(result)
    }
}

/// Request for the `token` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenCall {
    pub merchant_code: String,
    pub invoice_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    pub checksum: String,
}

impl TokenCall {
    pub fn new(config: &GatewayConfig, customer_id: Option<&str>) -> Self {
        let merchant_code = config.connection.merchant_code.expose_secret().to_string();
        let invoice_code = config.connection.invoice_code.expose_secret().to_string();
        let checksum = checksum(
            &[&merchant_code, &invoice_code, customer_id.unwrap_or("")],
            &config.connection.verification_code,
        );

        TokenCall {
            merchant_code,
            invoice_code,
            customer_id: customer_id.map(str::to_string),
            checksum,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenReply {
    pub token: ClientToken,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

/// Request for the `sources` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcesCall {
    pub merchant_code: String,
    pub invoice_code: String,
    pub customer_id: String,
    pub checksum: String,
}

impl SourcesCall {
    pub fn new(config: &GatewayConfig, customer_id: &str) -> Self {
        let merchant_code = config.connection.merchant_code.expose_secret().to_string();
        let invoice_code = config.connection.invoice_code.expose_secret().to_string();
        let checksum = checksum(
            &[&merchant_code, &invoice_code, customer_id],
            &config.connection.verification_code,
        );

        SourcesCall {
            merchant_code,
            invoice_code,
            customer_id: customer_id.to_string(),
            checksum,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcesReply {
    pub sources: Vec<CustomerSource>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use qpay_core::config::{ConfigEntry, fields};

    fn test_config() -> GatewayConfig {
        GatewayConfig::from_entries(&[
            ConfigEntry::new(fields::API_URL, "https://merchant.qpay.test/api/"),
            ConfigEntry::new(fields::INVOICE_CODE, "TEST_INVOICE"),
            ConfigEntry::new(fields::MERCHANT_CODE, "TEST_MERCHANT"),
            ConfigEntry::new(fields::VERIFICATION_CODE, "CmqC4uJ3c47unyr2"),
            ConfigEntry::new(fields::AUTH_USERNAME, "qpay_test"),
            ConfigEntry::new(fields::AUTH_PASSWORD, "sdZv9k9m"),
            ConfigEntry::new(fields::AUTO_CAPTURE, "true"),
            ConfigEntry::new(fields::STORE_CUSTOMERS_CARD, "true"),
            ConfigEntry::new(fields::REQUIRE_3D_SECURE, "false"),
        ])
        .unwrap()
    }

    fn test_request() -> PaymentRequest {
        PaymentRequest::builder()
            .amount(2_500u32)
            .currency("MNT")
            .payment_id("order-77")
            .build()
    }

    #[test]
    fn checksum_follows_the_documented_recipe() {
        let secret = SecretString::from("CmqC4uJ3c47unyr2".to_string());
        let digest = checksum(&["TEST_MERCHANT", "TEST_INVOICE", "order-77", "2500"], &secret);

        let mut hasher = Sha256::new();
        hasher.update(b"TEST_MERCHANT|TEST_INVOICE|order-77|2500|CmqC4uJ3c47unyr2");
        assert_eq!(digest, hex::encode(hasher.finalize()));

        // Deterministic, and sensitive to the verification code.
        assert_eq!(
            digest,
            checksum(&["TEST_MERCHANT", "TEST_INVOICE", "order-77", "2500"], &secret)
        );
        let other = SecretString::from("other-code".to_string());
        assert_ne!(
            digest,
            checksum(&["TEST_MERCHANT", "TEST_INVOICE", "order-77", "2500"], &other)
        );
    }

    #[test]
    fn payment_call_carries_scoping_and_flags() {
        let call = PaymentCall::new(&test_request(), &test_config());

        assert_eq!(call.merchant_code, "TEST_MERCHANT");
        assert_eq!(call.invoice_code, "TEST_INVOICE");
        assert!(call.store_card);
        assert!(!call.require_3ds);
        assert_eq!(call.checksum.len(), 64);

        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["paymentId"], "order-77");
        assert_eq!(json["amount"], "2500");
        assert!(json.get("transactionId").is_none());
    }

    #[test]
    fn approved_reply_maps_to_success() {
        let reply: GatewayReply = serde_json::from_value(serde_json::json!({
            "status": "approved",
            "transactionId": "qpay-001",
            "customerToken": "tok_stored"
        }))
        .unwrap();

        let result = reply
            .into_result(TransactionKind::Auth, &test_request())
            .unwrap();
        assert!(result.is_success());
        assert_eq!(result.transaction_id, Some(TransactionId::new("qpay-001")));
        assert_eq!(result.customer_token.as_deref(), Some("tok_stored"));
    }

    #[test]
    fn declined_reply_keeps_the_message_verbatim() {
        let reply: GatewayReply = serde_json::from_value(serde_json::json!({
            "status": "declined",
            "message": "Карт хүчингүй байна"
        }))
        .unwrap();

        let result = reply
            .into_result(TransactionKind::Auth, &test_request())
            .unwrap();
        assert!(!result.is_success());
        assert_eq!(
            result.error,
            Some(GatewayError::Rejected("Карт хүчингүй байна".to_string()))
        );
    }

    #[test]
    fn refund_exceeds_capture_reports_both_amounts() {
        let reply: GatewayReply = serde_json::from_value(serde_json::json!({
            "status": "refund_exceeds_capture",
            "capturedAmount": "1000"
        }))
        .unwrap();

        let result = reply
            .into_result(TransactionKind::Refund, &test_request())
            .unwrap();
        assert_eq!(
            result.error,
            Some(GatewayError::RefundExceedsCapture {
                requested: Amount(2_500),
                captured: Amount(1_000),
            })
        );
    }

    #[test]
    fn approved_reply_without_transaction_id_is_malformed() {
        let reply: GatewayReply =
            serde_json::from_value(serde_json::json!({ "status": "approved" })).unwrap();

        assert!(matches!(
            reply.into_result(TransactionKind::Auth, &test_request()),
            Err(GatewayError::InvalidReply(_))
        ));
    }
}
