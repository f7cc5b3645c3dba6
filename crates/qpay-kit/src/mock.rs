//! In-memory gateway for development and tests.
//!
//! [`MockGateway`] simulates the remote side of the merchant web service: it
//! keeps a transaction ledger (authorized, captured and refunded amounts per
//! transaction) and honors the same outcome taxonomy as the real service, so
//! host flows can be exercised without network access.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use qpay_core::config::GatewayConfig;
use qpay_core::errors::{GatewayError, Result};
use qpay_core::types::{
    Amount, ClientToken, ClientTokenConfig, CustomerSource, PaymentRequest, PaymentResult,
    StoredSources, TransactionId, TransactionKind,
};

use crate::concepts::Gateway;

/// How the mock responds to payment operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockBehavior {
    #[default]
    Normal,
    /// Every payment operation comes back declined.
    DeclineAll,
    /// Authorizations succeed, captures decline.
    FailCapture,
    /// The remote side cannot be reached at all.
    Unavailable,
}

#[derive(Debug, Clone, Default)]
struct TxRecord {
    authorized: Amount,
    captured: Amount,
    refunded: Amount,
    voided: bool,
}

/// An in-memory stand-in for the QPay merchant web service.
#[derive(Debug, Default)]
pub struct MockGateway {
    behavior: MockBehavior,
    ledger: Mutex<HashMap<String, TxRecord>>,
    sources: Mutex<HashMap<String, Vec<CustomerSource>>>,
    calls: AtomicUsize,
    seq: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Self {
        MockGateway::default()
    }

    pub fn with_behavior(behavior: MockBehavior) -> Self {
        MockGateway {
            behavior,
            ..MockGateway::default()
        }
    }

    /// Registers a stored payment method so `list_client_sources` returns it.
    pub fn store_source(&self, customer_id: impl Into<String>, source: CustomerSource) {
        self.sources_lock()
            .entry(customer_id.into())
            .or_default()
            .push(source);
    }

    /// Number of gateway operations attempted so far, successful or not.
    pub fn operation_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn authorized_amount(&self, transaction_id: &TransactionId) -> Option<Amount> {
        self.ledger_lock().get(&transaction_id.0).map(|r| r.authorized)
    }

    pub fn captured_amount(&self, transaction_id: &TransactionId) -> Option<Amount> {
        self.ledger_lock().get(&transaction_id.0).map(|r| r.captured)
    }

    pub fn refunded_amount(&self, transaction_id: &TransactionId) -> Option<Amount> {
        self.ledger_lock().get(&transaction_id.0).map(|r| r.refunded)
    }

    pub fn is_voided(&self, transaction_id: &TransactionId) -> Option<bool> {
        self.ledger_lock().get(&transaction_id.0).map(|r| r.voided)
    }

    fn ledger_lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, TxRecord>> {
        self.ledger.lock().expect("mock ledger lock poisoned")
    }

    fn sources_lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<CustomerSource>>> {
        self.sources.lock().expect("mock sources lock poisoned")
    }

    fn record_call(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.behavior == MockBehavior::Unavailable {
            return Err(GatewayError::Unavailable(
                "mock gateway unreachable".to_string(),
            ));
        }
        Ok(())
    }

    fn next_transaction_id(&self) -> TransactionId {
        let n = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        TransactionId::new(format!("qpay-mock-{n}"))
    }

    fn requested_transaction(request: &PaymentRequest) -> std::result::Result<String, String> {
        match &request.transaction_id {
            Some(id) => Ok(id.0.clone()),
            None => Err(request.payment_id.clone()),
        }
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn authorize(
        &self,
        request: &PaymentRequest,
        config: &GatewayConfig,
    ) -> Result<PaymentResult> {
        self.record_call()?;

        if self.behavior == MockBehavior::DeclineAll {
            return Ok(PaymentResult::declined(
                TransactionKind::Auth,
                GatewayError::Rejected("declined by mock gateway".to_string()),
            ));
        }

        let challenge_done = request
            .three_d_secure
            .as_ref()
            .is_some_and(|tds| tds.authentication_token.is_some());
        if config.require_3d_secure && !challenge_done {
            let action_url = config.connection.api_url.join("challenge").ok();
            return Ok(PaymentResult::needs_action(
                TransactionKind::Auth,
                None,
                action_url,
            ));
        }

        let transaction_id = self.next_transaction_id();
        self.ledger_lock().insert(
            transaction_id.0.clone(),
            TxRecord {
                authorized: request.amount,
                ..TxRecord::default()
            },
        );

        let result = PaymentResult::approved(TransactionKind::Auth, transaction_id);
        if config.store_customer {
            Ok(result.with_customer_token(format!("tok_{}", request.payment_id)))
        } else {
            Ok(result)
        }
    }

    async fn capture(
        &self,
        request: &PaymentRequest,
        _config: &GatewayConfig,
    ) -> Result<PaymentResult> {
        self.record_call()?;

        if matches!(self.behavior, MockBehavior::DeclineAll | MockBehavior::FailCapture) {
            return Ok(PaymentResult::declined(
                TransactionKind::Capture,
                GatewayError::Rejected("capture declined by mock gateway".to_string()),
            ));
        }

        let key = match Self::requested_transaction(request) {
            Ok(key) => key,
            Err(reference) => {
                return Ok(PaymentResult::declined(
                    TransactionKind::Capture,
                    GatewayError::NotAuthorized(reference),
                ));
            }
        };

        let mut ledger = self.ledger_lock();
        let Some(record) = ledger.get_mut(&key) else {
            return Ok(PaymentResult::declined(
                TransactionKind::Capture,
                GatewayError::NotAuthorized(key),
            ));
        };

        if record.voided {
            return Ok(PaymentResult::declined(
                TransactionKind::Capture,
                GatewayError::Rejected("authorization was voided".to_string()),
            ));
        }
        if record.captured >= record.authorized && !record.authorized.is_zero() {
            return Ok(PaymentResult::declined(
                TransactionKind::Capture,
                GatewayError::AlreadyCaptured(key),
            ));
        }
        let remaining = record
            .authorized
            .checked_sub(record.captured)
            .unwrap_or(Amount::ZERO);
        if request.amount > remaining {
            return Ok(PaymentResult::declined(
                TransactionKind::Capture,
                GatewayError::Rejected("capture exceeds authorized amount".to_string()),
            ));
        }

        record.captured = record
            .captured
            .checked_add(request.amount)
            .unwrap_or(record.authorized);

        Ok(PaymentResult::approved(
            TransactionKind::Capture,
            TransactionId::new(key),
        ))
    }

    async fn refund(
        &self,
        request: &PaymentRequest,
        _config: &GatewayConfig,
    ) -> Result<PaymentResult> {
        self.record_call()?;

        if self.behavior == MockBehavior::DeclineAll {
            return Ok(PaymentResult::declined(
                TransactionKind::Refund,
                GatewayError::Rejected("refund declined by mock gateway".to_string()),
            ));
        }

        let key = match Self::requested_transaction(request) {
            Ok(key) => key,
            Err(reference) => {
                return Ok(PaymentResult::declined(
                    TransactionKind::Refund,
                    GatewayError::NotAuthorized(reference),
                ));
            }
        };

        let mut ledger = self.ledger_lock();
        let Some(record) = ledger.get_mut(&key) else {
            return Ok(PaymentResult::declined(
                TransactionKind::Refund,
                GatewayError::NotAuthorized(key),
            ));
        };

        let refundable = record
            .captured
            .checked_sub(record.refunded)
            .unwrap_or(Amount::ZERO);
        if !record.captured.is_zero() && refundable.is_zero() {
            return Ok(PaymentResult::declined(
                TransactionKind::Refund,
                GatewayError::AlreadyRefunded(key),
            ));
        }
        if request.amount > refundable {
            return Ok(PaymentResult::declined(
                TransactionKind::Refund,
                GatewayError::RefundExceedsCapture {
                    requested: request.amount,
                    captured: refundable,
                },
            ));
        }

        record.refunded = record
            .refunded
            .checked_add(request.amount)
            .unwrap_or(record.captured);

        Ok(PaymentResult::approved(
            TransactionKind::Refund,
            TransactionId::new(key),
        ))
    }

    async fn void(
        &self,
        request: &PaymentRequest,
        _config: &GatewayConfig,
    ) -> Result<PaymentResult> {
        self.record_call()?;

        if self.behavior == MockBehavior::DeclineAll {
            return Ok(PaymentResult::declined(
                TransactionKind::Void,
                GatewayError::Rejected("void declined by mock gateway".to_string()),
            ));
        }

        let key = match Self::requested_transaction(request) {
            Ok(key) => key,
            Err(reference) => {
                return Ok(PaymentResult::declined(
                    TransactionKind::Void,
                    GatewayError::NotAuthorized(reference),
                ));
            }
        };

        let mut ledger = self.ledger_lock();
        let Some(record) = ledger.get_mut(&key) else {
            return Ok(PaymentResult::declined(
                TransactionKind::Void,
                GatewayError::NotAuthorized(key),
            ));
        };

        if !record.captured.is_zero() {
            // Captured funds stay untouched; a void after capture is refused.
            return Ok(PaymentResult::declined(
                TransactionKind::Void,
                GatewayError::AlreadyCaptured(key),
            ));
        }
        if record.voided {
            return Ok(PaymentResult::declined(
                TransactionKind::Void,
                GatewayError::Rejected("authorization already voided".to_string()),
            ));
        }

        record.voided = true;

        Ok(PaymentResult::approved(
            TransactionKind::Void,
            TransactionId::new(key),
        ))
    }

    async fn get_client_token(
        &self,
        _config: &GatewayConfig,
        token_config: Option<&ClientTokenConfig>,
    ) -> Result<ClientToken> {
        self.record_call()?;

        let n = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let token = match token_config.and_then(|tc| tc.customer_id.as_deref()) {
            Some(customer_id) => format!("client-token-{customer_id}-{n}"),
            None => format!("client-token-{n}"),
        };
        Ok(ClientToken(token))
    }

    async fn list_client_sources(
        &self,
        _config: &GatewayConfig,
        customer_id: &str,
    ) -> Result<StoredSources> {
        self.record_call()?;

        let sources = self
            .sources_lock()
            .get(customer_id)
            .cloned()
            .unwrap_or_default();
        Ok(StoredSources::new(sources))
    }
}
