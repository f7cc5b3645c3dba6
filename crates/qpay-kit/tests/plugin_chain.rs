use std::sync::Arc;

use url::Url;

use qpay_kit::concepts::Gateway;
use qpay_kit::config::{ConnectionParams, GatewayConfig};
use qpay_kit::errors::{ConfigError, GatewayError};
use qpay_kit::mock::{MockBehavior, MockGateway};
use qpay_kit::plugin::{GatewayPlugin, PaymentConfig, PluginChain};
use qpay_kit::types::{
    Amount, CardInfo, ClientToken, CustomerSource, PaymentRequest, PaymentResult, StoredSources,
    TransactionId, TransactionKind,
};

fn connection(auth_password: &str) -> ConnectionParams {
    ConnectionParams::builder()
        .api_url(Url::parse("https://merchant.qpay.test/api/").unwrap())
        .invoice_code("TEST_INVOICE".to_string())
        .merchant_code("TEST_MERCHANT".to_string())
        .verification_code("CmqC4uJ3c47unyr2".to_string())
        .auth_username("qpay_test".to_string())
        .auth_password(auth_password.to_string())
        .build()
}

fn config(auto_capture: bool) -> GatewayConfig {
    GatewayConfig::builder()
        .auto_capture(auto_capture)
        .connection(connection("sdZv9k9m"))
        .build()
}

fn request(amount: u64, payment_id: &str) -> PaymentRequest {
    PaymentRequest::builder()
        .amount(amount)
        .currency("MNT")
        .payment_id(payment_id)
        .build()
}

fn request_for(transaction_id: &TransactionId, amount: u64) -> PaymentRequest {
    PaymentRequest::builder()
        .amount(amount)
        .currency("MNT")
        .payment_id("order-ref")
        .transaction_id(transaction_id.clone())
        .build()
}

fn sample_source(id: &str) -> CustomerSource {
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

#[tokio::test]
async fn inactive_plugin_passes_previous_value_through_every_operation() {
    let gateway = Arc::new(MockGateway::new());
    let plugin = GatewayPlugin::inactive(gateway.clone(), config(true)).unwrap();

    let upstream_result =
        PaymentResult::approved(TransactionKind::Auth, TransactionId::new("upstream-1"));
    let upstream_token = ClientToken("upstream-token".to_string());
    let upstream_sources = StoredSources::new(vec![sample_source("upstream-src")]);
    let upstream_config = PaymentConfig {
        store_customer_card: true,
        client_token: upstream_token.clone(),
    };
    let req = request(1_000, "order-1");

    assert_eq!(
        plugin
            .authorize_payment(&req, Some(upstream_result.clone()))
            .await
            .unwrap(),
        Some(upstream_result.clone())
    );
    assert_eq!(
        plugin
            .capture_payment(&req, Some(upstream_result.clone()))
            .await
            .unwrap(),
        Some(upstream_result.clone())
    );
    assert_eq!(
        plugin
            .process_payment(&req, Some(upstream_result.clone()))
            .await
            .unwrap(),
        Some(upstream_result.clone())
    );
    assert_eq!(
        plugin
            .refund_payment(&req, Some(upstream_result.clone()))
            .await
            .unwrap(),
        Some(upstream_result.clone())
    );
    assert_eq!(
        plugin
            .void_payment(&req, Some(upstream_result.clone()))
            .await
            .unwrap(),
        Some(upstream_result)
    );
    assert_eq!(
        plugin
            .get_client_token(None, Some(upstream_token.clone()))
            .await
            .unwrap(),
        Some(upstream_token)
    );
    assert_eq!(
        plugin
            .list_payment_sources("cust-1", Some(upstream_sources.clone()))
            .await
            .unwrap(),
        Some(upstream_sources)
    );
    assert_eq!(
        plugin
            .payment_config(Some(upstream_config.clone()))
            .await
            .unwrap(),
        Some(upstream_config)
    );

    // And nothing without a previous value either.
    assert_eq!(plugin.authorize_payment(&req, None).await.unwrap(), None);

    assert_eq!(gateway.operation_count(), 0);
}

#[tokio::test]
async fn auto_capture_process_payment_authorizes_and_captures() {
    let gateway = Arc::new(MockGateway::new());
    let plugin = GatewayPlugin::new(gateway.clone(), config(true)).unwrap();

    let result = plugin
        .process_payment(&request(2_500, "order-2"), None)
        .await
        .unwrap()
        .unwrap();

    assert!(result.is_success());
    assert!(!result.is_partial());
    assert_eq!(result.kind, TransactionKind::Capture);

    let transaction_id = result.transaction_id.unwrap();
    assert_eq!(
        gateway.authorized_amount(&transaction_id),
        Some(Amount(2_500))
    );
    assert_eq!(gateway.captured_amount(&transaction_id), Some(Amount(2_500)));
}

#[tokio::test]
async fn manual_capture_process_payment_authorizes_only() {
    let gateway = Arc::new(MockGateway::new());
    let plugin = GatewayPlugin::new(gateway.clone(), config(false)).unwrap();

    let result = plugin
        .process_payment(&request(2_500, "order-3"), None)
        .await
        .unwrap()
        .unwrap();

    assert!(result.is_success());
    assert_eq!(result.kind, TransactionKind::Auth);

    let transaction_id = result.transaction_id.unwrap();
    assert_eq!(
        gateway.authorized_amount(&transaction_id),
        Some(Amount(2_500))
    );
    assert_eq!(gateway.captured_amount(&transaction_id), Some(Amount::ZERO));
}

#[tokio::test]
async fn capture_failure_after_authorization_reports_partial_state() {
    let gateway = Arc::new(MockGateway::with_behavior(MockBehavior::FailCapture));
    let plugin = GatewayPlugin::new(gateway.clone(), config(true)).unwrap();

    let result = plugin
        .process_payment(&request(2_500, "order-4"), None)
        .await
        .unwrap()
        .unwrap();

    assert!(result.is_partial());
    assert_eq!(result.kind, TransactionKind::Auth);
    assert!(matches!(result.error, Some(GatewayError::Rejected(_))));

    // The authorization stands; nothing was captured or rolled back.
    let transaction_id = result.transaction_id.unwrap();
    assert_eq!(
        gateway.authorized_amount(&transaction_id),
        Some(Amount(2_500))
    );
    assert_eq!(gateway.captured_amount(&transaction_id), Some(Amount::ZERO));
}

#[tokio::test]
async fn refund_exceeding_capture_is_refused_and_never_partially_succeeds() {
    let gateway = Arc::new(MockGateway::new());
    let cfg = config(false);

    let auth = gateway
        .authorize(&request(1_000, "order-5"), &cfg)
        .await
        .unwrap();
    let transaction_id = auth.transaction_id.unwrap();
    gateway
        .capture(&request_for(&transaction_id, 1_000), &cfg)
        .await
        .unwrap();

    let refund = gateway
        .refund(&request_for(&transaction_id, 2_000), &cfg)
        .await
        .unwrap();

    assert!(!refund.is_success());
    assert_eq!(
        refund.error,
        Some(GatewayError::RefundExceedsCapture {
            requested: Amount(2_000),
            captured: Amount(1_000),
        })
    );
    assert_eq!(gateway.refunded_amount(&transaction_id), Some(Amount::ZERO));

    // A full refund still works, a second one is refused.
    let refund = gateway
        .refund(&request_for(&transaction_id, 1_000), &cfg)
        .await
        .unwrap();
    assert!(refund.is_success());

    let again = gateway
        .refund(&request_for(&transaction_id, 100), &cfg)
        .await
        .unwrap();
    assert_eq!(
        again.error,
        Some(GatewayError::AlreadyRefunded(transaction_id.0.clone()))
    );
    assert_eq!(gateway.refunded_amount(&transaction_id), Some(Amount(1_000)));
}

#[tokio::test]
async fn void_after_capture_leaves_captured_funds_untouched() {
    let gateway = Arc::new(MockGateway::new());
    let cfg = config(false);

    let auth = gateway
        .authorize(&request(1_000, "order-6"), &cfg)
        .await
        .unwrap();
    let transaction_id = auth.transaction_id.unwrap();
    gateway
        .capture(&request_for(&transaction_id, 1_000), &cfg)
        .await
        .unwrap();

    let void = gateway
        .void(&request_for(&transaction_id, 1_000), &cfg)
        .await
        .unwrap();

    assert!(!void.is_success());
    assert_eq!(
        void.error,
        Some(GatewayError::AlreadyCaptured(transaction_id.0.clone()))
    );
    assert_eq!(gateway.captured_amount(&transaction_id), Some(Amount(1_000)));
    assert_eq!(gateway.is_voided(&transaction_id), Some(false));
}

#[tokio::test]
async fn void_before_capture_cancels_the_authorization() {
    let gateway = Arc::new(MockGateway::new());
    let cfg = config(false);

    let auth = gateway
        .authorize(&request(1_000, "order-7"), &cfg)
        .await
        .unwrap();
    let transaction_id = auth.transaction_id.unwrap();

    let void = gateway
        .void(&request_for(&transaction_id, 1_000), &cfg)
        .await
        .unwrap();
    assert!(void.is_success());
    assert_eq!(gateway.is_voided(&transaction_id), Some(true));

    // Capturing a voided authorization is refused.
    let capture = gateway
        .capture(&request_for(&transaction_id, 1_000), &cfg)
        .await
        .unwrap();
    assert!(!capture.is_success());
}

#[tokio::test]
async fn capture_without_prior_authorization_is_refused() {
    let gateway = Arc::new(MockGateway::new());
    let cfg = config(false);

    let capture = gateway
        .capture(&request_for(&TransactionId::new("unknown-txn"), 500), &cfg)
        .await
        .unwrap();

    assert!(!capture.is_success());
    assert_eq!(
        capture.error,
        Some(GatewayError::NotAuthorized("unknown-txn".to_string()))
    );
}

#[tokio::test]
async fn empty_auth_password_fails_activation_before_any_network_call() {
    let gateway = Arc::new(MockGateway::new());
    let bad_config = GatewayConfig::builder().connection(connection("")).build();

    let err = GatewayPlugin::new(gateway.clone(), bad_config).unwrap_err();

    assert_eq!(err, ConfigError::EmptyField("Auth password"));
    assert_eq!(gateway.operation_count(), 0);
}

#[tokio::test]
async fn required_3ds_asks_for_consumer_action_instead_of_authorizing() {
    let gateway = Arc::new(MockGateway::new());
    let cfg = GatewayConfig::builder()
        .require_3d_secure(true)
        .connection(connection("sdZv9k9m"))
        .build();

    let result = gateway
        .authorize(&request(1_000, "order-8"), &cfg)
        .await
        .unwrap();

    assert!(!result.is_success());
    assert!(result.action_required);
    assert!(result.action_url.is_some());
    assert!(result.transaction_id.is_none());
}

#[tokio::test]
async fn chain_threads_the_previous_value_through_in_order() {
    let first_gateway = Arc::new(MockGateway::new());
    let second_gateway = Arc::new(MockGateway::new());

    let chain = PluginChain::new()
        .register(
            GatewayPlugin::new(
                first_gateway.clone() as Arc<dyn Gateway>,
                config(false),
            )
            .unwrap(),
        )
        .register(
            GatewayPlugin::inactive(
                second_gateway.clone() as Arc<dyn Gateway>,
                config(false),
            )
            .unwrap(),
        );
    assert_eq!(chain.len(), 2);

    let result = chain
        .authorize_payment(&request(750, "order-9"), None)
        .await
        .unwrap()
        .unwrap();

    // The active first plugin computed the result; the inactive second one
    // passed it through untouched.
    assert!(result.is_success());
    assert_eq!(first_gateway.operation_count(), 1);
    assert_eq!(second_gateway.operation_count(), 0);
    assert_eq!(
        first_gateway.authorized_amount(&result.transaction_id.unwrap()),
        Some(Amount(750))
    );
}

#[tokio::test]
async fn payment_config_bootstraps_the_checkout_form() {
    let gateway = Arc::new(MockGateway::new());
    let cfg = GatewayConfig::builder()
        .store_customer(true)
        .connection(connection("sdZv9k9m"))
        .build();
    let plugin = GatewayPlugin::new(gateway, cfg).unwrap();

    let payment_config = plugin.payment_config(None).await.unwrap().unwrap();

    assert!(payment_config.store_customer_card);
    assert!(payment_config.client_token.0.starts_with("client-token-"));
}

#[tokio::test]
async fn stored_sources_flow_through_the_plugin_and_restart() {
    let gateway = Arc::new(MockGateway::new());
    gateway.store_source("cust-7", sample_source("tok_a"));
    gateway.store_source("cust-7", sample_source("tok_b"));

    let plugin = GatewayPlugin::new(gateway, config(false)).unwrap();
    let sources = plugin
        .list_payment_sources("cust-7", None)
        .await
        .unwrap()
        .unwrap();

    let first: Vec<_> = sources.iter().map(|s| s.id.clone()).collect();
    let second: Vec<_> = sources.iter().map(|s| s.id.clone()).collect();
    assert_eq!(first, vec!["tok_a", "tok_b"]);
    assert_eq!(first, second);

    let none = plugin
        .list_payment_sources("cust-unknown", None)
        .await
        .unwrap()
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn unavailable_gateway_surfaces_as_an_error() {
    let gateway = Arc::new(MockGateway::with_behavior(MockBehavior::Unavailable));
    let plugin = GatewayPlugin::new(gateway, config(true)).unwrap();

    let err = plugin
        .authorize_payment(&request(1_000, "order-10"), None)
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Unavailable(_)));
}
