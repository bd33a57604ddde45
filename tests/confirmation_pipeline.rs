mod common;

use common::{Harness, RecordingChannel, QR_SECRET};
use event_ticketing::domain::booking::BookingStatus;
use event_ticketing::domain::error::BookingError;
use event_ticketing::domain::notification::{NotificationMedium, NotificationStatus};
use event_ticketing::domain::payment::{CallbackParams, ClientVerifyRequest};
use event_ticketing::domain::qr;
use event_ticketing::gateways::mock::{MockBehavior, MockGateway};
use event_ticketing::gateways::ProviderError;
use uuid::Uuid;

fn completed_callback(booking_id: Uuid, pidx: &str, amount: i64) -> CallbackParams {
    CallbackParams {
        purchase_order_id: Some(booking_id.to_string()),
        status: Some("Completed".to_string()),
        pidx: Some(pidx.to_string()),
        amount: Some(amount.to_string()),
        tidx: Some("tidx-1".to_string()),
    }
}

#[tokio::test]
async fn capacity_ten_rejects_the_eleventh_ticket() {
    let h = Harness::new(MockGateway::default(), 10, 500).await;

    h.service.checkout(h.buyer.user_id, h.request(10)).await.unwrap();
    let err = h.service.checkout(h.buyer.user_id, h.request(1)).await.unwrap_err();

    assert_eq!(err.to_string(), "Only 0 tickets are available.");
    assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(h.store.bookings_for(h.ticket.ticket_type_id).await.len(), 1);
}

#[tokio::test]
async fn completed_payment_marks_paid_issues_qr_and_notifies() {
    let h = Harness::new(MockGateway::default().with_pidx("abc123"), 10, 500).await;

    let created = h.service.checkout(h.buyer.user_id, h.request(3)).await.unwrap();
    assert!(created.payment_url.contains("abc123"));

    let booking = h.service.get(created.booking_id).await.unwrap();
    assert_eq!(booking.total_amount_minor, 1500);

    let confirmation = h
        .pipeline
        .handle_callback(completed_callback(created.booking_id, "abc123", 1500))
        .await
        .unwrap();
    assert!(!confirmation.already_paid);
    assert!(confirmation.qr_issued);
    assert_eq!(confirmation.booking.status, BookingStatus::Paid);
    assert_eq!(confirmation.booking.transaction_id.as_deref(), Some("abc123"));

    let qr_code = h
        .service
        .stores
        .qr_codes
        .find_by_booking(created.booking_id)
        .await
        .unwrap()
        .unwrap();
    assert!(qr_code.payload.contains(&created.booking_id.to_string()));
    assert!(qr_code.payload.contains("abc123"));
    assert_eq!(
        qr::parse_payload(&qr_code.payload, QR_SECRET),
        Some((created.booking_id, "abc123".to_string()))
    );

    let notes = h.store.all_notifications().await;
    assert_eq!(notes.len(), 2);
    assert!(notes.iter().all(|n| n.status == NotificationStatus::Sent));
    assert!(notes.iter().any(|n| n.medium == NotificationMedium::Email));
    assert!(notes.iter().any(|n| n.medium == NotificationMedium::Push));
    assert_eq!(h.email.count(), 1);
    assert_eq!(h.push.count(), 1);
}

#[tokio::test]
async fn unfinished_lookup_keeps_booking_pending() {
    let gateway = MockGateway::default()
        .with_pidx("p-1")
        .with_lookup(MockBehavior::NotCompleted);
    let h = Harness::new(gateway, 10, 500).await;
    let created = h.service.checkout(h.buyer.user_id, h.request(1)).await.unwrap();

    let err = h
        .pipeline
        .handle_callback(completed_callback(created.booking_id, "p-1", 500))
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::PaymentNotCompleted { .. }));
    assert_eq!(h.service.get(created.booking_id).await.unwrap().status, BookingStatus::Pending);
    assert_eq!(h.store.qr_code_count(created.booking_id).await, 0);
    assert!(h.store.all_notifications().await.is_empty());
}

#[tokio::test]
async fn callback_status_other_than_completed_skips_lookup() {
    let h = Harness::new(MockGateway::default().with_pidx("p-2"), 10, 500).await;
    let created = h.service.checkout(h.buyer.user_id, h.request(1)).await.unwrap();

    let mut params = completed_callback(created.booking_id, "p-2", 500);
    params.status = Some("User canceled".to_string());
    let err = h.pipeline.handle_callback(params).await.unwrap_err();

    assert!(matches!(err, BookingError::PaymentNotCompleted { .. }));
    assert_eq!(h.gateway.lookup_calls(), 0);
    assert_eq!(h.service.get(created.booking_id).await.unwrap().status, BookingStatus::Pending);
}

#[tokio::test]
async fn missing_callback_fields_are_rejected() {
    let h = Harness::new(MockGateway::default(), 10, 500).await;

    let err = h
        .pipeline
        .handle_callback(CallbackParams {
            status: Some("Completed".to_string()),
            pidx: Some("p".to_string()),
            ..CallbackParams::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::MissingCallbackField("purchase_order_id")));

    let err = h
        .pipeline
        .handle_callback(completed_callback(Uuid::new_v4(), "  ", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::MissingCallbackField("pidx")));
    assert_eq!(h.gateway.lookup_calls(), 0);
}

#[tokio::test]
async fn unknown_booking_is_not_found() {
    let h = Harness::new(MockGateway::default(), 10, 500).await;

    let err = h
        .pipeline
        .handle_callback(completed_callback(Uuid::new_v4(), "p-3", 500))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::BookingNotFound(_)));
    assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn lookup_amount_must_match_booking_total() {
    let h = Harness::new(MockGateway::default().with_pidx("p-4"), 10, 500).await;
    let created = h.service.checkout(h.buyer.user_id, h.request(2)).await.unwrap();
    h.gateway.seed_payment("p-4", 10);

    let err = h
        .pipeline
        .handle_callback(completed_callback(created.booking_id, "p-4", 1000))
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::AmountMismatch { expected: 1000, paid: 10 }));
    assert_eq!(h.service.get(created.booking_id).await.unwrap().status, BookingStatus::Pending);
}

#[tokio::test]
async fn repeated_verification_is_a_no_op() {
    let h = Harness::new(MockGateway::default().with_pidx("p-5"), 10, 500).await;
    let created = h.service.checkout(h.buyer.user_id, h.request(1)).await.unwrap();

    h.pipeline
        .handle_callback(completed_callback(created.booking_id, "p-5", 500))
        .await
        .unwrap();
    let second = h
        .pipeline
        .handle_client_verification(ClientVerifyRequest {
            booking_id: created.booking_id,
            token: "p-5".to_string(),
            amount: Some(500),
            payment_method: None,
        })
        .await
        .unwrap();

    assert!(second.already_paid);
    assert_eq!(h.store.qr_code_count(created.booking_id).await, 1);
    assert_eq!(h.store.all_notifications().await.len(), 2);
    assert_eq!(h.email.count(), 1);
}

#[tokio::test]
async fn qr_persist_failure_does_not_revert_paid() {
    let h = Harness::new(MockGateway::default().with_pidx("p-6"), 10, 500).await;
    let created = h.service.checkout(h.buyer.user_id, h.request(1)).await.unwrap();
    h.store.fail_qr_inserts(true);

    let confirmation = h
        .pipeline
        .handle_callback(completed_callback(created.booking_id, "p-6", 500))
        .await
        .unwrap();
    assert!(!confirmation.qr_issued);
    assert_eq!(h.service.get(created.booking_id).await.unwrap().status, BookingStatus::Paid);
    assert_eq!(h.store.qr_code_count(created.booking_id).await, 0);

    // A later verification regenerates the missing code without notifying again.
    h.store.fail_qr_inserts(false);
    let again = h
        .pipeline
        .handle_callback(completed_callback(created.booking_id, "p-6", 500))
        .await
        .unwrap();
    assert!(again.already_paid);
    assert!(again.qr_issued);
    assert_eq!(h.store.qr_code_count(created.booking_id).await, 1);
    assert_eq!(h.email.count(), 1);
}

#[tokio::test]
async fn provider_timeout_during_lookup_leaves_pending() {
    let gateway = MockGateway::default()
        .with_pidx("p-7")
        .with_lookup(MockBehavior::AlwaysTimeout);
    let h = Harness::new(gateway, 10, 500).await;
    let created = h.service.checkout(h.buyer.user_id, h.request(1)).await.unwrap();

    let err = h
        .pipeline
        .handle_callback(completed_callback(created.booking_id, "p-7", 500))
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::VerificationFailed(_)));
    assert_eq!(err.status_code(), axum::http::StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(h.service.get(created.booking_id).await.unwrap().status, BookingStatus::Pending);
}

#[tokio::test]
async fn failed_initiation_removes_the_pending_booking() {
    let h = Harness::new(MockGateway::new(MockBehavior::AlwaysFailure), 3, 500).await;

    let err = h.service.checkout(h.buyer.user_id, h.request(3)).await.unwrap_err();

    assert!(matches!(err, BookingError::InitiationFailed(_)));
    assert!(h.store.bookings_for(h.ticket.ticket_type_id).await.is_empty());
    assert_eq!(h.service.available(h.ticket.ticket_type_id).await.unwrap(), (3, 3));
}

#[tokio::test]
async fn channel_failure_is_recorded_but_confirmation_succeeds() {
    let h = Harness::with_channels(
        MockGateway::default().with_pidx("p-8"),
        10,
        500,
        RecordingChannel::new(NotificationMedium::Email),
        RecordingChannel::failing(NotificationMedium::Push),
    )
    .await;
    let created = h.service.checkout(h.buyer.user_id, h.request(1)).await.unwrap();

    let confirmation = h
        .pipeline
        .handle_callback(completed_callback(created.booking_id, "p-8", 500))
        .await
        .unwrap();
    assert_eq!(confirmation.booking.status, BookingStatus::Paid);

    let notes = h.store.all_notifications().await;
    let push = notes.iter().find(|n| n.medium == NotificationMedium::Push).unwrap();
    let email = notes.iter().find(|n| n.medium == NotificationMedium::Email).unwrap();
    assert_eq!(push.status, NotificationStatus::Failed);
    assert_eq!(email.status, NotificationStatus::Sent);
}

#[tokio::test]
async fn payment_index_of_one_booking_cannot_settle_another() {
    let h = Harness::new(MockGateway::default(), 10, 500).await;
    let first = h.service.checkout(h.buyer.user_id, h.request(3)).await.unwrap();
    let second = h.service.checkout(h.buyer.user_id, h.request(3)).await.unwrap();
    let first_pidx = h
        .service
        .get(first.booking_id)
        .await
        .unwrap()
        .payment_reference
        .unwrap();

    h.pipeline
        .handle_callback(completed_callback(first.booking_id, &first_pidx, 1500))
        .await
        .unwrap();
    let lookups = h.gateway.lookup_calls();

    let err = h
        .pipeline
        .handle_callback(completed_callback(second.booking_id, &first_pidx, 1500))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::PaymentReferenceMismatch));
    assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);

    let err = h
        .pipeline
        .handle_client_verification(ClientVerifyRequest {
            booking_id: second.booking_id,
            token: first_pidx.clone(),
            amount: Some(1500),
            payment_method: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::PaymentReferenceMismatch));
    assert_eq!(h.gateway.lookup_calls(), lookups);

    let untouched = h.service.get(second.booking_id).await.unwrap();
    assert_eq!(untouched.status, BookingStatus::Pending);
    assert!(untouched.transaction_id.is_none());
    assert_eq!(h.store.qr_code_count(second.booking_id).await, 0);

    // The store refuses a second booking carrying the same transaction id.
    let err = h.service.confirm_paid(second.booking_id, &first_pidx).await.unwrap_err();
    assert!(matches!(err, BookingError::Storage(_)));
}

#[tokio::test]
async fn missing_payment_url_removes_the_pending_booking() {
    let gateway = MockGateway::default().with_initiate(MockBehavior::NoPaymentUrl);
    let h = Harness::new(gateway, 3, 500).await;

    let err = h.service.checkout(h.buyer.user_id, h.request(2)).await.unwrap_err();

    assert!(matches!(err, BookingError::InitiationFailed(ProviderError::MissingPaymentUrl)));
    assert_eq!(err.status_code(), axum::http::StatusCode::BAD_GATEWAY);
    assert!(h.store.bookings_for(h.ticket.ticket_type_id).await.is_empty());
    assert_eq!(h.service.available(h.ticket.ticket_type_id).await.unwrap(), (3, 3));
}

#[tokio::test]
async fn payment_completed_after_cancellation_is_refunded() {
    let h = Harness::new(MockGateway::default().with_pidx("late-1"), 10, 500).await;
    let created = h.service.checkout(h.buyer.user_id, h.request(2)).await.unwrap();
    h.service.cancel(created.booking_id).await.unwrap();

    let err = h
        .pipeline
        .handle_callback(completed_callback(created.booking_id, "late-1", 1000))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::LatePaymentRefunded));
    assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
    assert_eq!(h.gateway.refund_calls(), 1);

    let booking = h.service.get(created.booking_id).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Cancelled);
    assert_eq!(h.store.qr_code_count(created.booking_id).await, 0);
    assert_eq!(h.email.count(), 1);
    assert!(h.email.messages()[0].title.starts_with("Refund processed"));

    // Once refunded the provider no longer reports the payment as completed.
    let again = h
        .pipeline
        .handle_callback(completed_callback(created.booking_id, "late-1", 1000))
        .await
        .unwrap_err();
    assert!(matches!(again, BookingError::PaymentNotCompleted { .. }));
    assert_eq!(h.gateway.refund_calls(), 1);
}

#[tokio::test]
async fn sweep_confirms_expired_booking_whose_payment_completed() {
    let h = Harness::new(MockGateway::default().with_pidx("sw-1"), 10, 500).await;
    let created = h.service.checkout(h.buyer.user_id, h.request(1)).await.unwrap();

    let cutoff = chrono::Utc::now() + chrono::Duration::seconds(1);
    let report = h.pipeline.sweep_expired(cutoff, 100).await.unwrap();

    assert_eq!(report.cancelled, 0);
    assert_eq!(report.completed, vec![(created.booking_id, "sw-1".to_string())]);
    let booking = h.service.get(created.booking_id).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Paid);
    assert_eq!(booking.transaction_id.as_deref(), Some("sw-1"));
    assert_eq!(h.store.qr_code_count(created.booking_id).await, 1);
    assert_eq!(h.email.count(), 1);
    assert_eq!(h.gateway.refund_calls(), 0);
}

#[tokio::test]
async fn sweep_cancels_expired_booking_with_unfinished_payment() {
    let gateway = MockGateway::default()
        .with_pidx("sw-2")
        .with_lookup(MockBehavior::NotCompleted);
    let h = Harness::new(gateway, 10, 500).await;
    let created = h.service.checkout(h.buyer.user_id, h.request(1)).await.unwrap();

    let cutoff = chrono::Utc::now() + chrono::Duration::seconds(1);
    let report = h.pipeline.sweep_expired(cutoff, 100).await.unwrap();

    assert_eq!(report.cancelled, 1);
    assert!(report.completed.is_empty());
    assert_eq!(h.gateway.lookup_calls(), 1);
    assert_eq!(h.service.get(created.booking_id).await.unwrap().status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn sweep_keeps_booking_pending_when_provider_is_unreachable() {
    let gateway = MockGateway::default()
        .with_pidx("sw-3")
        .with_lookup(MockBehavior::AlwaysTimeout);
    let h = Harness::new(gateway, 10, 500).await;
    let created = h.service.checkout(h.buyer.user_id, h.request(1)).await.unwrap();

    let cutoff = chrono::Utc::now() + chrono::Duration::seconds(1);
    let report = h.pipeline.sweep_expired(cutoff, 100).await.unwrap();

    assert_eq!(report.cancelled, 0);
    assert_eq!(report.deferred, 1);
    assert_eq!(h.service.get(created.booking_id).await.unwrap().status, BookingStatus::Pending);
}
