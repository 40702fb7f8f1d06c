//! Coordinator-level behaviour tests
//!
//! Exercise the checkout lifecycle end to end through [`CheckoutCoordinator`]
//! against the in-memory adapters.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal_macros::dec;

use crate::application::services::extensions::{CheckoutExtensions, CreationGuard};
use crate::application::services::temp_orders::DeleteOutcome;
use crate::domain::cart::Cart;
use crate::domain::checkout::{CheckoutSession, CreationDecision};
use crate::domain::orders::{OrderStatus, OrderTag};
use crate::domain::payload::SessionPayload;
use crate::infrastructure::adapters::OrderRepository;
use crate::shared::error::AppError;
use crate::tests::fixtures::{self, cart_with_prices, coupon, valid_form, Harness};

fn test_harness() -> Harness {
    fixtures::harness(fixtures::test_config(true))
}

#[tokio::test]
async fn test_second_submission_updates_the_same_order() {
    let h = test_harness();
    let credential = h.session_with_cart("s1", cart_with_prices(&[dec!(10)])).await;

    let first = h.coordinator.create_or_update("s1", &credential, &valid_form()).await.unwrap();
    h.carts.put("s1", cart_with_prices(&[dec!(10), dec!(5)])).await;
    let second = h
        .coordinator
        .create_or_update("s1", &first.session_credential, &valid_form())
        .await
        .unwrap();

    assert_eq!(first.temp_order_data.temp_order_id, second.temp_order_data.temp_order_id);
    assert_eq!(h.orders.len().await, 1);

    let order = h.orders.get(second.temp_order_data.temp_order_id).await.unwrap().unwrap();
    assert_eq!(order.revision, 1);
    assert_eq!(order.line_items.len(), 2);
    assert_eq!(order.subtotal, dec!(15));
    assert_eq!(h.metrics.transition_count("created"), 1);
    assert_eq!(h.metrics.transition_count("updated"), 1);
}

#[tokio::test]
async fn test_finalize_is_single_use() {
    let h = test_harness();
    let credential = h.session_with_cart("s1", cart_with_prices(&[dec!(40)])).await;
    let session = h.coordinator.create_or_update("s1", &credential, &valid_form()).await.unwrap();
    let finalize_credential = session.temp_order_data.finalize_credential;

    let done = h
        .coordinator
        .finalize("s1", &finalize_credential, "FS-1001", &valid_form())
        .await
        .unwrap();
    assert_eq!(done.order_id, session.temp_order_data.temp_order_id);

    let replay = h
        .coordinator
        .finalize("s1", &finalize_credential, "FS-1001", &valid_form())
        .await
        .unwrap_err();
    assert_eq!(replay.error, AppError::InvalidCredential);
    assert!(replay.session_credential.is_some());

    let order = h.orders.get(done.order_id).await.unwrap().unwrap();
    assert_eq!(order.tag, Some(OrderTag::Finalized));
    assert_eq!(order.external_reference.as_deref(), Some("FS-1001"));
    assert_eq!(order.created_via.as_deref(), Some("checkout"));
    assert!(order.notes.iter().any(|n| n == "External order ID: FS-1001"));
    assert_eq!(order.notes.last().map(String::as_str), Some("Temporary order converted to actual order."));
    assert_eq!(h.metrics.transition_count("finalized"), 1);
    assert!(h.sessions.order_awaiting_payment("s1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_concurrent_finalize_has_one_winner() {
    let h = test_harness();
    let credential = h.session_with_cart("s1", cart_with_prices(&[dec!(40)])).await;
    let session = h.coordinator.create_or_update("s1", &credential, &valid_form()).await.unwrap();
    let token = session.temp_order_data.finalize_credential;
    let form = valid_form();

    let attempts = futures::future::join_all(
        (0..4).map(|_| h.coordinator.finalize("s1", &token, "FS-2002", &form)),
    )
    .await;

    assert_eq!(attempts.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(h.metrics.transition_count("finalized"), 1);
}

#[tokio::test]
async fn test_superseded_finalize_credential_is_rejected() {
    let h = test_harness();
    let credential = h.session_with_cart("s1", cart_with_prices(&[dec!(40)])).await;
    let first = h.coordinator.create_or_update("s1", &credential, &valid_form()).await.unwrap();
    let second = h
        .coordinator
        .create_or_update("s1", &first.session_credential, &valid_form())
        .await
        .unwrap();

    let stale = h
        .coordinator
        .finalize("s1", &first.temp_order_data.finalize_credential, "FS-3", &valid_form())
        .await
        .unwrap_err();
    assert_eq!(stale.error, AppError::InvalidCredential);

    h.coordinator
        .finalize("s1", &second.temp_order_data.finalize_credential, "FS-3", &valid_form())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_finalize_without_reference_is_a_validation_error() {
    let h = test_harness();
    let credential = h.session_with_cart("s1", cart_with_prices(&[dec!(40)])).await;
    let session = h.coordinator.create_or_update("s1", &credential, &valid_form()).await.unwrap();

    let err = h
        .coordinator
        .finalize("s1", &session.temp_order_data.finalize_credential, "  ", &valid_form())
        .await
        .unwrap_err();
    assert_eq!(err.error, AppError::Validation(vec!["Missing payment reference".to_string()]));

    // The credential was not spent by the rejected attempt
    h.coordinator
        .finalize("s1", &session.temp_order_data.finalize_credential, "FS-4", &valid_form())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_finalize_applies_first_coupon_and_empties_cart() {
    let h = test_harness();
    let mut cart = cart_with_prices(&[dec!(100), dec!(300)]);
    cart.coupons.push(coupon("SAVE40", "fixed_cart", dec!(40)));
    cart.coupons.push(coupon("EXTRA", "fixed_cart", dec!(5)));
    let credential = h.session_with_cart("s1", cart).await;

    let session = h.coordinator.create_or_update("s1", &credential, &valid_form()).await.unwrap();
    let done = h
        .coordinator
        .finalize("s1", &session.temp_order_data.finalize_credential, "FS-5", &valid_form())
        .await
        .unwrap();

    let order = h.orders.get(done.order_id).await.unwrap().unwrap();
    assert_eq!(order.applied_coupons, vec!["SAVE40".to_string()]);
    assert_eq!(order.discount_total, dec!(40));
    assert_eq!(order.total, dec!(360));
    assert_eq!(order.line_items[0].discount, dec!(10));
    assert_eq!(order.line_items[1].discount, dec!(30));
    assert_eq!(order.billing.email, "ada@example.com");
    assert_eq!(order.shipping.phone, order.billing.phone);

    use crate::infrastructure::adapters::CartStore;
    assert!(h.carts.cart("s1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_deletion_time_is_capped() {
    let mut config = fixtures::test_config(true);
    config.gateway.temp_order_deletion_time = "9999999999999h".to_string();
    let h = fixtures::harness(config);
    h.carts.put("big", cart_with_prices(&[dec!(10)])).await;

    let params = h.coordinator.issue_params(Some("big")).await.unwrap();
    assert_eq!(params.popup_timeout_ms, 365 * 24 * 3600 * 1000);

    let session = h
        .coordinator
        .create_or_update("big", &params.session_credential, &valid_form())
        .await
        .unwrap();
    let finalized = h
        .coordinator
        .finalize("big", &session.temp_order_data.finalize_credential, "FS-BIG", &valid_form())
        .await
        .unwrap();
    assert_eq!(finalized.order_id, session.temp_order_data.temp_order_id);
}

#[tokio::test]
async fn test_delete_without_order_is_a_no_op() {
    let h = test_harness();
    let credential = h.session_with_cart("s1", cart_with_prices(&[dec!(10)])).await;

    let reply = h.coordinator.delete("s1", &credential).await.unwrap();
    assert_eq!(reply.order_id, None);

    let again = h.coordinator.delete("s1", &reply.session_credential).await.unwrap();
    assert_eq!(again.order_id, None);
}

#[tokio::test]
async fn test_delete_removes_live_order() {
    let h = test_harness();
    let credential = h.session_with_cart("s1", cart_with_prices(&[dec!(10)])).await;
    let session = h.coordinator.create_or_update("s1", &credential, &valid_form()).await.unwrap();

    let reply = h.coordinator.delete("s1", &session.session_credential).await.unwrap();
    assert_eq!(reply.order_id, Some(session.temp_order_data.temp_order_id));
    assert!(h.orders.is_empty().await);
    assert!(h.sessions.order_awaiting_payment("s1").await.unwrap().is_none());

    // The finalize credential of a deleted order is useless
    let err = h
        .coordinator
        .finalize("s1", &session.temp_order_data.finalize_credential, "FS-6", &valid_form())
        .await
        .unwrap_err();
    assert!(err.error.requires_refresh());
}

#[tokio::test]
async fn test_finalized_order_cannot_be_deleted() {
    let h = test_harness();
    let credential = h.session_with_cart("s1", cart_with_prices(&[dec!(10)])).await;
    let session = h.coordinator.create_or_update("s1", &credential, &valid_form()).await.unwrap();
    let done = h
        .coordinator
        .finalize("s1", &session.temp_order_data.finalize_credential, "FS-7", &valid_form())
        .await
        .unwrap();

    let err = h.coordinator.lifecycle().delete_order(done.order_id).await.unwrap_err();
    assert!(matches!(err, AppError::StateConflict(_)));
    assert!(h.orders.get(done.order_id).await.unwrap().is_some());

    let reply = h.coordinator.delete("s1", &done.session_credential).await.unwrap();
    assert_eq!(reply.order_id, None);
}

#[tokio::test]
async fn test_update_refused_for_disallowed_status() {
    let h = test_harness();
    let credential = h.session_with_cart("s1", cart_with_prices(&[dec!(10)])).await;
    let session = h.coordinator.create_or_update("s1", &credential, &valid_form()).await.unwrap();

    let mut order = h.orders.get(session.temp_order_data.temp_order_id).await.unwrap().unwrap();
    order.status = OrderStatus::Completed;
    h.orders.save(&order).await.unwrap();

    let err = h
        .coordinator
        .create_or_update("s1", &session.session_credential, &valid_form())
        .await
        .unwrap_err();
    assert!(matches!(err.error, AppError::StateConflict(_)));
    assert_eq!(err.error.client_messages(), vec![crate::shared::error::GENERIC_FAILURE_MESSAGE.to_string()]);
}

#[tokio::test]
async fn test_session_credential_is_single_use_and_bound() {
    let h = test_harness();
    let credential = h.session_with_cart("s1", cart_with_prices(&[dec!(10)])).await;
    h.session_with_cart("s2", cart_with_prices(&[dec!(10)])).await;

    let foreign = h.coordinator.create_or_update("s2", &credential, &valid_form()).await.unwrap_err();
    assert_eq!(foreign.error, AppError::InvalidCredential);

    h.coordinator.create_or_update("s1", &credential, &valid_form()).await.unwrap();
    let replay = h.coordinator.create_or_update("s1", &credential, &valid_form()).await.unwrap_err();
    assert_eq!(replay.error, AppError::InvalidCredential);

    // A fresh credential rides along with the failure
    let fresh = replay.session_credential.unwrap();
    h.coordinator.create_or_update("s1", &fresh, &valid_form()).await.unwrap();
}

#[tokio::test]
async fn test_empty_cart_and_invalid_form_create_nothing() {
    let h = test_harness();
    let credential = h.session_with_cart("s1", Cart::default()).await;

    let err = h.coordinator.create_or_update("s1", &credential, &valid_form()).await.unwrap_err();
    assert_eq!(err.error, AppError::EmptyCart);

    h.carts.put("s1", cart_with_prices(&[dec!(10)])).await;
    let mut form = valid_form();
    form.billing_email = Some("nope".to_string());
    let err = h
        .coordinator
        .create_or_update("s1", &err.session_credential.unwrap(), &form)
        .await
        .unwrap_err();
    assert!(matches!(err.error, AppError::Validation(_)));
    assert!(h.orders.is_empty().await);
}

struct RequireLogin;

impl CreationGuard for RequireLogin {
    fn check(&self, _session: &CheckoutSession, _cart: &Cart) -> CreationDecision {
        CreationDecision::login_required()
    }
}

#[tokio::test]
async fn test_creation_guard_blocks_order() {
    let config = fixtures::test_config(true);
    let extensions = CheckoutExtensions::new(&config.gateway.gateway_id).with_creation_guard(Arc::new(RequireLogin));
    let h = fixtures::harness_with(config, extensions);
    let credential = h.session_with_cart("s1", cart_with_prices(&[dec!(10)])).await;

    let err = h.coordinator.create_or_update("s1", &credential, &valid_form()).await.unwrap_err();
    match err.error {
        AppError::CreationBlocked { kind, .. } => assert_eq!(kind, "temp_order_blocked"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(h.orders.is_empty().await);
}

#[tokio::test]
async fn test_unavailable_gateway_rejects_checkout() {
    let mut config = fixtures::test_config(true);
    config.gateway.storefront_path = String::new();
    let h = fixtures::harness(config);
    let credential = h.session_with_cart("s1", cart_with_prices(&[dec!(10)])).await;

    assert!(!h.coordinator.is_available());
    let err = h.coordinator.create_or_update("s1", &credential, &valid_form()).await.unwrap_err();
    assert_eq!(err.error, AppError::GatewayUnavailable);
    assert!(err.session_credential.is_none());
}

#[tokio::test]
async fn test_test_mode_envelope_is_plain() {
    let h = test_harness();
    let credential = h.session_with_cart("s1", cart_with_prices(&[dec!(10)])).await;
    let reply = h.coordinator.create_or_update("s1", &credential, &valid_form()).await.unwrap();

    assert_eq!(reply.session.key, "");
    match &reply.session.payload {
        SessionPayload::Plain(payload) => {
            assert_eq!(payload.items.len(), 1);
            assert_eq!(payload.tags.store_order_id, reply.temp_order_data.temp_order_id);
        }
        SessionPayload::Encrypted(_) => panic!("test mode must not encrypt"),
    }
}

#[tokio::test]
async fn test_live_mode_envelope_is_sealed() {
    let h = fixtures::harness(fixtures::test_config(false));
    let credential = h.session_with_cart("s1", cart_with_prices(&[dec!(10)])).await;
    let reply = h.coordinator.create_or_update("s1", &credential, &valid_form()).await.unwrap();

    assert!(!reply.session.key.is_empty());
    assert!(matches!(reply.session.payload, SessionPayload::Encrypted(ref c) if !c.is_empty()));
}

#[tokio::test]
async fn test_receipt_requires_matching_reference() {
    let h = test_harness();
    let credential = h.session_with_cart("s1", cart_with_prices(&[dec!(10)])).await;
    let session = h.coordinator.create_or_update("s1", &credential, &valid_form()).await.unwrap();
    let done = h
        .coordinator
        .finalize("s1", &session.temp_order_data.finalize_credential, "FS-8", &valid_form())
        .await
        .unwrap();

    let wrong = h.coordinator.get_receipt("s1", &done.receipt_credential, "FS-OTHER").await.unwrap_err();
    assert_eq!(wrong.error, AppError::InvalidCredential);

    // The receipt credential was consumed by the failed attempt
    let reused = h.coordinator.get_receipt("s1", &done.receipt_credential, "FS-8").await.unwrap_err();
    assert_eq!(reused.error, AppError::InvalidCredential);
}

#[tokio::test]
async fn test_receipt_resolves_redirect() {
    let h = test_harness();
    let credential = h.session_with_cart("s1", cart_with_prices(&[dec!(10)])).await;
    let session = h.coordinator.create_or_update("s1", &credential, &valid_form()).await.unwrap();
    let done = h
        .coordinator
        .finalize("s1", &session.temp_order_data.finalize_credential, "FS-9", &valid_form())
        .await
        .unwrap();

    let receipt = h.coordinator.get_receipt("s1", &done.receipt_credential, "FS-9").await.unwrap();
    assert_eq!(receipt.redirect_url, format!("/checkout/order-received/{}", done.order_id));
}

#[tokio::test]
async fn test_cart_emptied_signal_deletes_order() {
    let h = test_harness();
    let credential = h.session_with_cart("s1", cart_with_prices(&[dec!(10)])).await;
    let session = h.coordinator.create_or_update("s1", &credential, &valid_form()).await.unwrap();

    let outcome = h.coordinator.on_cart_emptied("s1").await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted(session.temp_order_data.temp_order_id));
    assert_eq!(h.coordinator.on_cart_emptied("s1").await.unwrap(), DeleteOutcome::Absent);
}

#[tokio::test]
async fn test_transfer_session_moves_order_and_cart() {
    let h = test_harness();
    let credential = h.session_with_cart("guest", cart_with_prices(&[dec!(10)])).await;
    let session = h.coordinator.create_or_update("guest", &credential, &valid_form()).await.unwrap();
    let order_id = session.temp_order_data.temp_order_id;

    assert_eq!(h.coordinator.transfer_session("guest", "member").await.unwrap(), Some(order_id));
    assert_eq!(h.sessions.order_awaiting_payment("member").await.unwrap(), Some(order_id));
    assert!(h.sessions.order_awaiting_payment("guest").await.unwrap().is_none());
    assert_eq!(h.orders.get(order_id).await.unwrap().unwrap().session_id, "member");

    use crate::infrastructure::adapters::CartStore;
    assert_eq!(h.carts.cart("member").await.unwrap().lines.len(), 1);
}

#[tokio::test]
async fn test_sweep_deletes_only_expired_orders() {
    let h = test_harness();
    let mut ids = Vec::new();
    for (session_id, age_secs) in [("old", 7200), ("new", 60)] {
        let credential = h.session_with_cart(session_id, cart_with_prices(&[dec!(10)])).await;
        let reply = h.coordinator.create_or_update(session_id, &credential, &valid_form()).await.unwrap();
        let mut order = h.orders.get(reply.temp_order_data.temp_order_id).await.unwrap().unwrap();
        order.created_at = Utc::now() - chrono::Duration::seconds(age_secs);
        h.orders.save(&order).await.unwrap();
        ids.push(order.id);
    }

    let report = h.coordinator.scheduler().sweeper(Duration::from_secs(3600)).sweep_at(Utc::now()).await.unwrap();

    assert_eq!(report.candidates, 1);
    assert_eq!(report.deleted, 1);
    assert!(h.orders.get(ids[0]).await.unwrap().is_none());
    assert!(h.orders.get(ids[1]).await.unwrap().is_some());
    assert!(h.sessions.order_awaiting_payment("old").await.unwrap().is_none());
}

#[tokio::test]
async fn test_sweep_tolerates_refused_deletions() {
    let h = test_harness();
    let mut ids = Vec::new();
    for session_id in ["held", "abandoned"] {
        let credential = h.session_with_cart(session_id, cart_with_prices(&[dec!(10)])).await;
        let reply = h.coordinator.create_or_update(session_id, &credential, &valid_form()).await.unwrap();
        let mut order = h.orders.get(reply.temp_order_data.temp_order_id).await.unwrap().unwrap();
        order.created_at = Utc::now() - chrono::Duration::hours(3);
        if session_id == "held" {
            order.status = OrderStatus::OnHold;
        }
        h.orders.save(&order).await.unwrap();
        ids.push(order.id);
    }

    let report = h.coordinator.scheduler().sweeper(Duration::from_secs(3600)).run_once().await.unwrap();

    assert_eq!(report.candidates, 2);
    assert_eq!(report.deleted, 1);
    assert_eq!(report.failures, 1);
    assert!(h.orders.get(ids[0]).await.unwrap().is_some());
    assert!(h.orders.get(ids[1]).await.unwrap().is_none());
}

#[tokio::test]
async fn test_sweep_never_touches_finalized_orders() {
    let h = test_harness();
    let credential = h.session_with_cart("s1", cart_with_prices(&[dec!(10)])).await;
    let session = h.coordinator.create_or_update("s1", &credential, &valid_form()).await.unwrap();
    let done = h
        .coordinator
        .finalize("s1", &session.temp_order_data.finalize_credential, "FS-10", &valid_form())
        .await
        .unwrap();

    let mut order = h.orders.get(done.order_id).await.unwrap().unwrap();
    order.created_at = Utc::now() - chrono::Duration::days(2);
    h.orders.save(&order).await.unwrap();

    let report = h.coordinator.scheduler().sweeper(Duration::from_secs(3600)).run_once().await.unwrap();
    assert_eq!(report.candidates, 0);
    assert!(h.orders.get(done.order_id).await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_reinstall_replaces_schedule() {
    let h = test_harness();
    let scheduler = h.coordinator.scheduler();

    h.coordinator.start_expiry_sweep().await;
    assert_eq!(scheduler.installed_threshold().await, Some(Duration::from_secs(3600)));

    scheduler.install(Duration::from_secs(600)).await;
    assert_eq!(scheduler.installed_threshold().await, Some(Duration::from_secs(600)));

    scheduler.shutdown().await;
    assert_eq!(scheduler.installed_threshold().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_scheduled_sweep_runs_on_cadence() {
    let h = test_harness();
    let credential = h.session_with_cart("s1", cart_with_prices(&[dec!(10)])).await;
    let reply = h.coordinator.create_or_update("s1", &credential, &valid_form()).await.unwrap();
    let mut order = h.orders.get(reply.temp_order_data.temp_order_id).await.unwrap().unwrap();
    order.created_at = Utc::now() - chrono::Duration::hours(2);
    h.orders.save(&order).await.unwrap();

    h.coordinator.scheduler().install(Duration::from_secs(600)).await;
    // The first tick fires immediately
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(h.orders.is_empty().await);
    h.coordinator.scheduler().shutdown().await;
}
