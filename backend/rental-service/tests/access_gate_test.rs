//! Playback validation and revocation.
mod common;

use chrono::{Duration, Utc};
use common::{FakeGateway, TestHarness};
use rental_service::db::{AccessStore, PaymentStore};
use rental_service::error::AppError;
use rental_service::models::{AccessPaymentStatus, InvalidReason, NewAccess, NewPayment};
use rental_service::services::{
    AccessDecision, CreateOrderInput, GrantedAccess, OrderOutcome, ValidAccess, VerifyInput,
    VerifyOutcome,
};

const MOVIE: &str = "M10001";

async fn purchase(harness: &TestHarness, device_id: &str) -> GrantedAccess {
    let OrderOutcome::Created(order) = harness
        .orders
        .create_order(CreateOrderInput {
            movie_id: MOVIE.into(),
            device_id: device_id.into(),
            user_id: None,
        })
        .await
        .unwrap()
    else {
        panic!("expected order");
    };

    let signature = FakeGateway::sign(&order.payment.gateway_order_id, "pay_1");
    let VerifyOutcome::Granted(granted) = harness
        .orders
        .verify(VerifyInput {
            payment_id: order.payment.payment_id,
            movie_id: None,
            gateway_order_id: order.payment.gateway_order_id,
            gateway_payment_id: "pay_1".into(),
            signature,
            user_id: None,
        })
        .await
        .unwrap()
    else {
        panic!("expected access");
    };
    granted
}

fn expect_valid(decision: AccessDecision) -> ValidAccess {
    match decision {
        AccessDecision::Valid(valid) => valid,
        AccessDecision::Invalid(reason) => panic!("expected valid access, got {:?}", reason),
    }
}

#[tokio::test]
async fn test_first_validation_starts_playback_once() {
    let harness = TestHarness::with_movie(MOVIE).await;
    let granted = purchase(&harness, "D1").await;
    assert!(!granted.access.playback_started);
    assert!(granted.access.start_time.is_none());

    let first = expect_valid(harness.gate.validate(&granted.access.token, "D1").await.unwrap());
    assert!(first.access.playback_started);
    let started_at = first.access.start_time.expect("start time set on first play");
    assert!(first.movie_path.contains(MOVIE));

    for _ in 0..3 {
        let again = expect_valid(harness.gate.validate(&granted.access.token, "D1").await.unwrap());
        assert_eq!(again.access.start_time, Some(started_at));
        assert!(again.access.playback_started);
    }
}

#[tokio::test]
async fn test_wrong_device_looks_like_unknown_token() {
    let harness = TestHarness::with_movie(MOVIE).await;
    let granted = purchase(&harness, "D1").await;

    let wrong_device = harness.gate.validate(&granted.access.token, "D2").await.unwrap();
    let unknown = harness.gate.validate("no-such-token", "D1").await.unwrap();

    assert!(matches!(wrong_device, AccessDecision::Invalid(InvalidReason::NotFound)));
    assert!(matches!(unknown, AccessDecision::Invalid(InvalidReason::NotFound)));

    // A rejected attempt does not start playback.
    let stored = harness.store.access(&granted.access.access_id).await.unwrap();
    assert!(!stored.playback_started);
}

#[tokio::test]
async fn test_natural_expiry() {
    let harness = TestHarness::with_movie(MOVIE).await;
    let granted = purchase(&harness, "D1").await;
    harness.store.expire_access(&granted.access.access_id).await;

    let decision = harness.gate.validate(&granted.access.token, "D1").await.unwrap();
    assert!(matches!(decision, AccessDecision::Invalid(InvalidReason::Expired)));
}

#[tokio::test]
async fn test_revoke_takes_effect_immediately() {
    let harness = TestHarness::with_movie(MOVIE).await;
    let granted = purchase(&harness, "D1").await;
    assert!(granted.access.expiry_time > Utc::now() + Duration::hours(1));

    let revoked = harness.gate.revoke(&granted.access.access_id).await.unwrap();
    assert!(revoked.expiry_time <= Utc::now());

    let decision = harness.gate.validate(&granted.access.token, "D1").await.unwrap();
    assert!(matches!(decision, AccessDecision::Invalid(InvalidReason::Expired)));
}

#[tokio::test]
async fn test_revoke_does_not_extend_expired_access() {
    let harness = TestHarness::with_movie(MOVIE).await;
    let granted = purchase(&harness, "D1").await;
    harness.store.expire_access(&granted.access.access_id).await;
    let expired_at = harness
        .store
        .access(&granted.access.access_id)
        .await
        .unwrap()
        .expiry_time;

    let revoked = harness.gate.revoke(&granted.access.access_id).await.unwrap();
    assert_eq!(revoked.expiry_time, expired_at);
}

#[tokio::test]
async fn test_revoke_unknown_access() {
    let harness = TestHarness::with_movie(MOVIE).await;
    let err = harness.gate.revoke("ACC99999").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(..)));
}

#[tokio::test]
async fn test_unpaid_access_is_rejected() {
    let harness = TestHarness::with_movie(MOVIE).await;

    // Legacy row whose payment never settled.
    harness
        .store
        .insert(NewPayment {
            payment_id: "PAY20001".into(),
            user_id: None,
            gateway: "razorpay".into(),
            gateway_order_id: "order_legacy".into(),
            amount_minor: 10000,
            currency: "INR".into(),
            device_id: "D1".into(),
            movie_id: MOVIE.into(),
            meta: None,
        })
        .await
        .unwrap();
    harness
        .store
        .insert_for_payment(NewAccess {
            access_id: "ACC20001".into(),
            token: "legacy-token".into(),
            user_id: None,
            movie_id: MOVIE.into(),
            device_id: "D1".into(),
            payment_id: "PAY20001".into(),
            expiry_time: Utc::now() + Duration::hours(2),
            payment_status: AccessPaymentStatus::Pending,
        })
        .await
        .unwrap();

    let decision = harness.gate.validate("legacy-token", "D1").await.unwrap();
    assert!(matches!(
        decision,
        AccessDecision::Invalid(InvalidReason::PaymentNotSuccessful)
    ));

    // An unpaid grant does not count as an entitlement either.
    let outcome = harness
        .orders
        .create_order(CreateOrderInput {
            movie_id: MOVIE.into(),
            device_id: "D1".into(),
            user_id: None,
        })
        .await
        .unwrap();
    assert!(matches!(outcome, OrderOutcome::Created(_)));
}

#[tokio::test]
async fn test_admin_listing_includes_grants() {
    let harness = TestHarness::with_movie(MOVIE).await;
    purchase(&harness, "D1").await;
    purchase(&harness, "D2").await;

    let listed = harness.gate.list_accesses(10).await.unwrap();
    assert_eq!(listed.len(), 2);
    let limited = harness.gate.list_accesses(1).await.unwrap();
    assert_eq!(limited.len(), 1);
}
