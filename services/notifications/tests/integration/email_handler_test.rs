use chrono::Utc;
use serde_json::json;

use courier_core::memory::InMemoryDocumentStore;
use courier_core::store::{DocumentStore, StoredDocument};
use courier_core::versioned::{VersionedEntity, VersionedModel, versioned_model_id};
use courier_domain::channel::{NotificationChannel, NotificationChannelStatusValue as Status};
use courier_notifications::domain::types::{
    EMAIL_NOTIFICATION_QUEUE, Notification, NotificationEvent, ProcessingOutcome,
};
use courier_notifications::handlers::notification_queue::NotificationQueueHandler;
use courier_notifications::usecase::email::{
    DEFAULT_SUBJECT, EMAIL_DELIVERY_EVENT, EmailDelivery, MESSAGE_ID_HEADER,
    NOTIFICATION_ID_HEADER,
};
use courier_notifications::usecase::render::EmailRenderer;
use courier_notifications::usecase::retry::RetryDriver;
use courier_testing::fixture::{
    A_MESSAGE_ID, A_NOTIFICATION_ID, a_message, a_notification_event_json, long_ago,
};
use courier_testing::store::FaultyStore;

use crate::helpers::{
    MockMailTransport, MockQueueControl, MockTelemetry, Reply, a_queue_message,
    an_email_notification, seed_notification, status_history,
};

type Handler<S> = NotificationQueueHandler<
    S,
    EmailDelivery<MockMailTransport, MockTelemetry>,
    MockQueueControl,
>;

fn email_handler<S: DocumentStore + Clone>(
    store: S,
    mailer: MockMailTransport,
    telemetry: MockTelemetry,
    queue: MockQueueControl,
) -> Handler<S> {
    NotificationQueueHandler {
        notifications: VersionedModel::new(store.clone()),
        statuses: VersionedModel::new(store),
        delivery: EmailDelivery {
            mailer,
            telemetry,
            renderer: EmailRenderer::new().unwrap(),
            mail_from: "no-reply@example.com".to_owned(),
        },
        driver: RetryDriver { queue },
    }
}

fn fresh_event_json() -> serde_json::Value {
    a_notification_event_json(&a_message(Utc::now()))
}

#[tokio::test]
async fn should_record_expired_without_delivering() {
    let store = InMemoryDocumentStore::new();
    seed_notification(store.clone(), an_email_notification()).await;
    let mailer = MockMailTransport::new(Reply::Accept);
    let sent = mailer.sent_handle();
    let telemetry = MockTelemetry::default();
    let events = telemetry.events_handle();
    let handler = email_handler(store.clone(), mailer, telemetry, MockQueueControl::retrying());

    let message = a_queue_message(
        EMAIL_NOTIFICATION_QUEUE,
        a_notification_event_json(&a_message(long_ago())),
    );
    let outcome = handler.process(&message, Utc::now()).await;

    assert_eq!(outcome, ProcessingOutcome::Completed);
    assert!(sent.lock().unwrap().is_empty(), "expired message must not be sent");
    assert!(events.lock().unwrap().is_empty());
    assert_eq!(
        status_history(&store, NotificationChannel::Email).await,
        vec![Status::Expired]
    );
}

#[tokio::test]
async fn should_send_email_and_record_sent_to_channel() {
    let store = InMemoryDocumentStore::new();
    seed_notification(store.clone(), an_email_notification()).await;
    let mailer = MockMailTransport::new(Reply::Accept);
    let sent = mailer.sent_handle();
    let telemetry = MockTelemetry::default();
    let events = telemetry.events_handle();
    let queue = MockQueueControl::retrying();
    let extended = queue.extended_handle();
    let handler = email_handler(store.clone(), mailer, telemetry, queue);

    let message = a_queue_message(EMAIL_NOTIFICATION_QUEUE, fresh_event_json());
    let outcome = handler.process(&message, Utc::now()).await;

    assert_eq!(outcome, ProcessingOutcome::Completed);

    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1, "expected exactly one mail");
    let mail = &sent[0];
    assert_eq!(mail.to, "citizen@example.com");
    assert_eq!(mail.from, "no-reply@example.com");
    assert_eq!(mail.subject, "A message subject");
    assert!(mail.html.contains("An organization"));
    assert!(!mail.text.is_empty());
    assert!(
        mail.headers
            .contains(&(MESSAGE_ID_HEADER.to_owned(), A_MESSAGE_ID.to_owned()))
    );
    assert!(
        mail.headers
            .contains(&(NOTIFICATION_ID_HEADER.to_owned(), A_NOTIFICATION_ID.to_owned()))
    );

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, EMAIL_DELIVERY_EVENT);
    assert_eq!(events[0].property("success"), Some("true"));
    assert_eq!(events[0].property("transport"), Some("sendgrid"));
    assert_eq!(events[0].property("addressSource"), Some("PROFILE_ADDRESS"));
    assert_eq!(events[0].property("messageId"), Some(A_MESSAGE_ID));

    assert_eq!(
        status_history(&store, NotificationChannel::Email).await,
        vec![Status::SentToChannel]
    );
    assert!(extended.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_use_default_subject_when_missing() {
    let store = InMemoryDocumentStore::new();
    seed_notification(store.clone(), an_email_notification()).await;
    let mailer = MockMailTransport::new(Reply::Accept);
    let sent = mailer.sent_handle();
    let handler = email_handler(
        store,
        mailer,
        MockTelemetry::default(),
        MockQueueControl::retrying(),
    );

    let mut msg = a_message(Utc::now());
    msg.content.subject = None;
    let message = a_queue_message(EMAIL_NOTIFICATION_QUEUE, a_notification_event_json(&msg));
    handler.process(&message, Utc::now()).await;

    assert_eq!(sent.lock().unwrap()[0].subject, DEFAULT_SUBJECT);
}

#[tokio::test]
async fn should_deliver_message_whose_expiry_is_beyond_representable_dates() {
    let store = InMemoryDocumentStore::new();
    seed_notification(store.clone(), an_email_notification()).await;
    let mailer = MockMailTransport::new(Reply::Accept);
    let sent = mailer.sent_handle();
    let handler = email_handler(
        store.clone(),
        mailer,
        MockTelemetry::default(),
        MockQueueControl::retrying(),
    );

    let mut payload = fresh_event_json();
    payload["message"]["createdAt"] = json!("+262142-12-31T23:59:59Z");
    let outcome = handler
        .process(&a_queue_message(EMAIL_NOTIFICATION_QUEUE, payload), Utc::now())
        .await;

    assert_eq!(outcome, ProcessingOutcome::Completed);
    assert_eq!(sent.lock().unwrap().len(), 1);
    assert_eq!(
        status_history(&store, NotificationChannel::Email).await,
        vec![Status::SentToChannel]
    );
}

#[tokio::test]
async fn should_send_deeply_nested_markdown() {
    let store = InMemoryDocumentStore::new();
    seed_notification(store.clone(), an_email_notification()).await;
    let mailer = MockMailTransport::new(Reply::Accept);
    let sent = mailer.sent_handle();
    let handler = email_handler(
        store.clone(),
        mailer,
        MockTelemetry::default(),
        MockQueueControl::retrying(),
    );

    let mut payload = fresh_event_json();
    payload["message"]["content"]["markdown"] =
        json!(format!("{}{}", "> ".repeat(60), "nested ".repeat(20)));
    let outcome = handler
        .process(&a_queue_message(EMAIL_NOTIFICATION_QUEUE, payload), Utc::now())
        .await;

    assert_eq!(outcome, ProcessingOutcome::Completed);
    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("nested"));
    assert_eq!(
        status_history(&store, NotificationChannel::Email).await,
        vec![Status::SentToChannel]
    );
}

#[tokio::test]
async fn should_record_failed_when_provider_rejects() {
    let store = InMemoryDocumentStore::new();
    seed_notification(store.clone(), an_email_notification()).await;
    let telemetry = MockTelemetry::default();
    let events = telemetry.events_handle();
    let queue = MockQueueControl::retrying();
    let extended = queue.extended_handle();
    let handler = email_handler(
        store.clone(),
        MockMailTransport::new(Reply::Reject(400)),
        telemetry,
        queue,
    );

    let message = a_queue_message(EMAIL_NOTIFICATION_QUEUE, fresh_event_json());
    let outcome = handler.process(&message, Utc::now()).await;

    assert_eq!(outcome, ProcessingOutcome::Completed);
    assert_eq!(events.lock().unwrap()[0].property("success"), Some("false"));
    assert_eq!(
        status_history(&store, NotificationChannel::Email).await,
        vec![Status::Failed]
    );
    assert!(extended.lock().unwrap().is_empty(), "permanent failure is not retried");
}

#[tokio::test]
async fn should_schedule_retry_when_transport_fails() {
    let store = InMemoryDocumentStore::new();
    seed_notification(store.clone(), an_email_notification()).await;
    let telemetry = MockTelemetry::default();
    let events = telemetry.events_handle();
    let queue = MockQueueControl::retrying();
    let extended = queue.extended_handle();
    let handler = email_handler(
        store.clone(),
        MockMailTransport::new(Reply::Unreachable),
        telemetry,
        queue,
    );

    let message = a_queue_message(EMAIL_NOTIFICATION_QUEUE, fresh_event_json());
    let outcome = handler.process(&message, Utc::now()).await;

    assert_eq!(outcome, ProcessingOutcome::RetryScheduled);
    assert_eq!(events.lock().unwrap()[0].property("success"), Some("false"));
    assert_eq!(*extended.lock().unwrap(), vec![message.id]);
    assert_eq!(
        status_history(&store, NotificationChannel::Email).await,
        vec![Status::Queued]
    );
}

#[tokio::test]
async fn should_dead_letter_and_record_failed_when_retries_exhausted() {
    let store = InMemoryDocumentStore::new();
    seed_notification(store.clone(), an_email_notification()).await;
    let handler = email_handler(
        store.clone(),
        MockMailTransport::new(Reply::Unreachable),
        MockTelemetry::default(),
        MockQueueControl::exhausted(),
    );

    let mut message = a_queue_message(EMAIL_NOTIFICATION_QUEUE, fresh_event_json());
    message.dequeue_count = 5;
    let outcome = handler.process(&message, Utc::now()).await;

    assert_eq!(outcome, ProcessingOutcome::RetriesExhausted);
    assert_eq!(
        status_history(&store, NotificationChannel::Email).await,
        vec![Status::Queued, Status::Failed]
    );
}

#[tokio::test]
async fn should_report_transient_when_notification_not_found() {
    let store = InMemoryDocumentStore::new();
    let mailer = MockMailTransport::new(Reply::Accept);
    let sent = mailer.sent_handle();
    let handler = email_handler(
        store,
        mailer,
        MockTelemetry::default(),
        MockQueueControl::retrying(),
    );
    let event: NotificationEvent = serde_json::from_value(fresh_event_json()).unwrap();

    let result = handler.handle_notification(&event).await;

    let err = result.unwrap_err();
    assert!(err.is_transient(), "expected transient, got {err:?}");
    assert!(sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_schedule_retry_when_notification_not_found() {
    let store = InMemoryDocumentStore::new();
    let handler = email_handler(
        store.clone(),
        MockMailTransport::new(Reply::Accept),
        MockTelemetry::default(),
        MockQueueControl::retrying(),
    );

    let message = a_queue_message(EMAIL_NOTIFICATION_QUEUE, fresh_event_json());
    let outcome = handler.process(&message, Utc::now()).await;

    assert_eq!(outcome, ProcessingOutcome::RetryScheduled);
    assert_eq!(
        status_history(&store, NotificationChannel::Email).await,
        vec![Status::Queued]
    );
}

#[tokio::test]
async fn should_fail_permanently_when_stored_notification_is_corrupt() {
    let store = InMemoryDocumentStore::new();
    store.insert_raw(
        Notification::COLLECTION,
        StoredDocument {
            id: versioned_model_id(A_NOTIFICATION_ID, 0),
            base_id: A_NOTIFICATION_ID.to_owned(),
            version: 0,
            partition_key: A_MESSAGE_ID.to_owned(),
            body: json!({ "unexpected": true }),
            created_at: Utc::now(),
        },
    );
    let handler = email_handler(
        store.clone(),
        MockMailTransport::new(Reply::Accept),
        MockTelemetry::default(),
        MockQueueControl::retrying(),
    );
    let event: NotificationEvent = serde_json::from_value(fresh_event_json()).unwrap();

    let err = handler.handle_notification(&event).await.unwrap_err();
    assert!(!err.is_transient(), "expected permanent, got {err:?}");

    let message = a_queue_message(EMAIL_NOTIFICATION_QUEUE, fresh_event_json());
    let outcome = handler.process(&message, Utc::now()).await;
    assert_eq!(outcome, ProcessingOutcome::Completed);
    assert_eq!(
        status_history(&store, NotificationChannel::Email).await,
        vec![Status::Failed]
    );
}

#[tokio::test]
async fn should_retry_permanent_failure_when_failed_status_cannot_be_written() {
    let store = FaultyStore::new(InMemoryDocumentStore::new());
    seed_notification(store.clone(), an_email_notification()).await;
    store.fail_writes("notification-status");
    let queue = MockQueueControl::retrying();
    let extended = queue.extended_handle();
    let handler = email_handler(
        store.clone(),
        MockMailTransport::new(Reply::Reject(400)),
        MockTelemetry::default(),
        queue,
    );

    let message = a_queue_message(EMAIL_NOTIFICATION_QUEUE, fresh_event_json());
    let outcome = handler.process(&message, Utc::now()).await;

    assert_eq!(outcome, ProcessingOutcome::RetryScheduled);
    assert_eq!(extended.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_retry_when_sent_status_cannot_be_written() {
    let store = FaultyStore::new(InMemoryDocumentStore::new());
    seed_notification(store.clone(), an_email_notification()).await;
    store.fail_writes("notification-status");
    let mailer = MockMailTransport::new(Reply::Accept);
    let sent = mailer.sent_handle();
    let handler = email_handler(
        store.clone(),
        mailer,
        MockTelemetry::default(),
        MockQueueControl::retrying(),
    );

    let message = a_queue_message(EMAIL_NOTIFICATION_QUEUE, fresh_event_json());
    let outcome = handler.process(&message, Utc::now()).await;

    assert_eq!(outcome, ProcessingOutcome::RetryScheduled);
    assert_eq!(sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_retry_when_expired_status_cannot_be_written() {
    let store = FaultyStore::new(InMemoryDocumentStore::new());
    store.fail_writes("notification-status");
    let handler = email_handler(
        store,
        MockMailTransport::new(Reply::Accept),
        MockTelemetry::default(),
        MockQueueControl::retrying(),
    );

    let message = a_queue_message(
        EMAIL_NOTIFICATION_QUEUE,
        a_notification_event_json(&a_message(long_ago())),
    );
    let outcome = handler.process(&message, Utc::now()).await;

    assert_eq!(outcome, ProcessingOutcome::RetryScheduled);
}

#[tokio::test]
async fn should_drop_malformed_payload() {
    let store = InMemoryDocumentStore::new();
    let mailer = MockMailTransport::new(Reply::Accept);
    let sent = mailer.sent_handle();
    let queue = MockQueueControl::retrying();
    let extended = queue.extended_handle();
    let handler = email_handler(store.clone(), mailer, MockTelemetry::default(), queue);

    let message = a_queue_message(EMAIL_NOTIFICATION_QUEUE, json!({ "notificationId": 42 }));
    let outcome = handler.process(&message, Utc::now()).await;

    assert_eq!(outcome, ProcessingOutcome::Completed);
    assert!(sent.lock().unwrap().is_empty());
    assert!(extended.lock().unwrap().is_empty());
    assert!(status_history(&store, NotificationChannel::Email).await.is_empty());
}
