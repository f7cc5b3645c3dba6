use std::fmt::Display;

use bon::Builder;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::GatewayError;
use crate::types::Amount;

/// Identifier the gateway assigns to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        TransactionId(id.into())
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(value: &str) -> Self {
        TransactionId(value.to_string())
    }
}

impl From<String> for TransactionId {
    fn from(value: String) -> Self {
        TransactionId(value)
    }
}

/// The kind of gateway transaction a result describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Auth,
    Capture,
    Refund,
    Void,
}

/// 3-D Secure data attached to an authorization attempt.
#[derive(Builder, Debug, Clone, PartialEq, Eq)]
pub struct ThreeDSecureData {
    /// Where the gateway sends the consumer back after the challenge.
    pub return_url: Url,
    /// Token proving a completed challenge, absent on the first attempt.
    #[builder(into)]
    pub authentication_token: Option<String>,
}

/// One payment action against the gateway. Created per call by the host,
/// consumed once.
#[derive(Builder, Debug, Clone)]
pub struct PaymentRequest {
    /// Amount in the currency's minor units.
    #[builder(into)]
    pub amount: Amount,
    /// ISO 4217 currency code.
    #[builder(into)]
    pub currency: String,
    /// The host's order or payment reference.
    #[builder(into)]
    pub payment_id: String,
    /// Gateway transaction being captured, refunded or voided.
    #[builder(into)]
    pub transaction_id: Option<TransactionId>,
    /// Reusable token of a stored payment method.
    #[builder(into)]
    pub customer_token: Option<String>,
    /// 3-D Secure data, when the flow requires it.
    pub three_d_secure: Option<ThreeDSecureData>,
}

/// Normalized outcome of one gateway operation.
///
/// A declined operation is still an `Ok` value: `success` is false and
/// `error` carries the gateway's own message verbatim. `success` combined
/// with a populated `error` marks the authorized-but-not-captured partial
/// state produced by an auto-capture that failed halfway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentResult {
    pub success: bool,
    pub kind: TransactionKind,
    pub transaction_id: Option<TransactionId>,
    pub error: Option<GatewayError>,
    /// Further consumer interaction (e.g. a 3-D Secure redirect) is needed.
    pub action_required: bool,
    pub action_url: Option<Url>,
    /// Reusable token the gateway minted for a stored payment method.
    pub customer_token: Option<String>,
}

impl PaymentResult {
    /// The gateway approved the operation.
    pub fn approved(kind: TransactionKind, transaction_id: TransactionId) -> Self {
        PaymentResult {
            success: true,
            kind,
            transaction_id: Some(transaction_id),
            error: None,
            action_required: false,
            action_url: None,
            customer_token: None,
        }
    }

    /// The gateway reported a failure; the message stays untouched.
    pub fn declined(kind: TransactionKind, error: GatewayError) -> Self {
        PaymentResult {
            success: false,
            kind,
            transaction_id: None,
            error: Some(error),
            action_required: false,
            action_url: None,
            customer_token: None,
        }
    }

    /// The consumer must complete a challenge before funds can be reserved.
    pub fn needs_action(
        kind: TransactionKind,
        transaction_id: Option<TransactionId>,
        action_url: Option<Url>,
    ) -> Self {
        PaymentResult {
            success: false,
            kind,
            transaction_id,
            error: None,
            action_required: true,
            action_url,
            customer_token: None,
        }
    }

    /// Authorization succeeded but the follow-up capture did not. The
    /// authorization stands; nothing is rolled back.
    pub fn authorized_not_captured(transaction_id: TransactionId, capture_error: GatewayError) -> Self {
        PaymentResult {
            success: true,
            kind: TransactionKind::Auth,
            transaction_id: Some(transaction_id),
            error: Some(capture_error),
            action_required: false,
            action_url: None,
            customer_token: None,
        }
    }

    pub fn with_customer_token(mut self, token: impl Into<String>) -> Self {
        self.customer_token = Some(token.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Authorized but not captured.
    pub fn is_partial(&self) -> bool {
        self.success && self.error.is_some()
    }
}

/// Short-lived credential enabling a client application to talk to the
/// gateway directly for tokenized payment entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientToken(pub String);

impl Display for ClientToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hints for client token generation.
#[derive(Builder, Debug, Clone, Default)]
pub struct ClientTokenConfig {
    /// Scope the token to a known customer so stored methods resolve.
    #[builder(into)]
    pub customer_id: Option<String>,
}

/// Card details the gateway discloses for a stored payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInfo {
    pub brand: String,
    pub last_digits: String,
    pub exp_month: u8,
    pub exp_year: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_on_card: Option<String>,
}

/// A payment method previously stored with the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSource {
    /// Token referencing the stored method in later requests.
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<CardInfo>,
}

/// Finite, restartable sequence of a customer's stored payment methods.
///
/// Every call to [`StoredSources::iter`] starts over from the first source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredSources(Vec<CustomerSource>);

impl StoredSources {
    pub fn new(sources: Vec<CustomerSource>) -> Self {
        StoredSources(sources)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CustomerSource> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for StoredSources {
    type Item = CustomerSource;
    type IntoIter = std::vec::IntoIter<CustomerSource>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a StoredSources {
    type Item = &'a CustomerSource;
    type IntoIter = std::slice::Iter<'a, CustomerSource>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<CustomerSource> for StoredSources {
    fn from_iter<T: IntoIterator<Item = CustomerSource>>(iter: T) -> Self {
        StoredSources(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(id: &str) -> CustomerSource {
        CustomerSource {
            id: id.to_string(),
            card: Some(CardInfo {
                brand: "visa".to_string(),
                last_digits: "4242".to_string(),
                exp_month: 9,
                exp_year: 2030,
                name_on_card: None,
            }),
        }
    }

    #[test]
    fn stored_sources_restart_from_the_beginning() {
        let sources = StoredSources::new(vec![source("tok_a"), source("tok_b")]);

        let first: Vec<_> = sources.iter().map(|s| s.id.clone()).collect();
        let second: Vec<_> = sources.iter().map(|s| s.id.clone()).collect();

        assert_eq!(first, vec!["tok_a", "tok_b"]);
        assert_eq!(first, second);
    }

    #[test]
    fn partial_state_is_success_with_error() {
        let result = PaymentResult::authorized_not_captured(
            TransactionId::new("txn_1"),
            GatewayError::Rejected("insufficient settlement balance".to_string()),
        );

        assert!(result.is_success());
        assert!(result.is_partial());
        assert_eq!(result.kind, TransactionKind::Auth);
        assert_eq!(result.transaction_id, Some(TransactionId::new("txn_1")));
    }

    #[test]
    fn customer_source_round_trips_camel_case() {
        let json = serde_json::json!({
            "id": "tok_a",
            "card": {
                "brand": "visa",
                "lastDigits": "4242",
                "expMonth": 9,
                "expYear": 2030
            }
        });

        let parsed: CustomerSource = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(parsed, source("tok_a"));
        assert_eq!(serde_json::to_value(&parsed).unwrap(), json);
    }
}
