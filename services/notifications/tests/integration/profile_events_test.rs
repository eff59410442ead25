use serde_json::{Value, json};

use courier_notifications::domain::types::{PROFILE_EVENTS_QUEUE, ProcessingOutcome};
use courier_notifications::handlers::QueueHandler;
use courier_notifications::handlers::profile_queue::ProfileQueueHandler;
use courier_notifications::usecase::retry::RetryDriver;
use courier_notifications::usecase::welcome::SendWelcomeMessageUseCase;
use courier_testing::fixture::{A_FISCAL_CODE, a_fiscal_code, a_profile};

use crate::helpers::{MockMessageApi, MockQueueControl, Reply, a_queue_message};

fn profile_handler(
    api: MockMessageApi,
    queue: MockQueueControl,
) -> ProfileQueueHandler<MockMessageApi, MockQueueControl> {
    ProfileQueueHandler {
        welcome: SendWelcomeMessageUseCase { api },
        driver: RetryDriver { queue },
    }
}

fn a_created_event(inbox_enabled: bool) -> Value {
    json!({
        "kind": "ProfileCreatedEvent",
        "fiscalCode": A_FISCAL_CODE,
        "newProfile": a_profile(Some("citizen@example.com"), inbox_enabled),
    })
}

fn an_updated_event(old_inbox: bool, new_inbox: bool) -> Value {
    json!({
        "kind": "ProfileUpdatedEvent",
        "fiscalCode": A_FISCAL_CODE,
        "newProfile": a_profile(Some("citizen@example.com"), new_inbox),
        "oldProfile": a_profile(Some("citizen@example.com"), old_inbox),
    })
}

#[tokio::test]
async fn should_send_welcome_message_when_profile_created_with_inbox() {
    let api = MockMessageApi::new(Reply::Accept);
    let created = api.created_handle();
    let handler = profile_handler(api, MockQueueControl::retrying());

    let outcome = handler
        .handle(&a_queue_message(PROFILE_EVENTS_QUEUE, a_created_event(true)))
        .await;

    assert_eq!(outcome, ProcessingOutcome::Completed);
    let created = created.lock().unwrap();
    assert_eq!(created.len(), 1);
    let (fiscal_code, message) = &created[0];
    assert_eq!(fiscal_code, &a_fiscal_code());
    assert_eq!(
        message.content.subject.as_ref().map(|s| s.as_str()),
        Some("Welcome new user citizen@example.com")
    );
}

#[tokio::test]
async fn should_send_welcome_message_when_inbox_just_enabled() {
    let api = MockMessageApi::new(Reply::Accept);
    let created = api.created_handle();
    let handler = profile_handler(api, MockQueueControl::retrying());

    handler
        .handle(&a_queue_message(PROFILE_EVENTS_QUEUE, an_updated_event(false, true)))
        .await;

    assert_eq!(created.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_not_send_when_inbox_was_already_enabled() {
    let api = MockMessageApi::new(Reply::Accept);
    let created = api.created_handle();
    let handler = profile_handler(api, MockQueueControl::retrying());

    let outcome = handler
        .handle(&a_queue_message(PROFILE_EVENTS_QUEUE, an_updated_event(true, true)))
        .await;

    assert_eq!(outcome, ProcessingOutcome::Completed);
    assert!(created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_not_send_when_profile_created_without_inbox() {
    let api = MockMessageApi::new(Reply::Accept);
    let created = api.created_handle();
    let handler = profile_handler(api, MockQueueControl::retrying());

    handler
        .handle(&a_queue_message(PROFILE_EVENTS_QUEUE, a_created_event(false)))
        .await;

    assert!(created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_retry_when_message_api_unreachable() {
    let queue = MockQueueControl::retrying();
    let extended = queue.extended_handle();
    let handler = profile_handler(MockMessageApi::new(Reply::Unreachable), queue);

    let outcome = handler
        .handle(&a_queue_message(PROFILE_EVENTS_QUEUE, a_created_event(true)))
        .await;

    assert_eq!(outcome, ProcessingOutcome::RetryScheduled);
    assert_eq!(extended.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_drop_event_when_message_api_rejects() {
    let queue = MockQueueControl::retrying();
    let extended = queue.extended_handle();
    let handler = profile_handler(MockMessageApi::new(Reply::Reject(400)), queue);

    let outcome = handler
        .handle(&a_queue_message(PROFILE_EVENTS_QUEUE, a_created_event(true)))
        .await;

    assert_eq!(outcome, ProcessingOutcome::Completed);
    assert!(extended.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_drop_malformed_profile_event() {
    let api = MockMessageApi::new(Reply::Accept);
    let created = api.created_handle();
    let handler = profile_handler(api, MockQueueControl::retrying());

    let outcome = handler
        .handle(&a_queue_message(
            PROFILE_EVENTS_QUEUE,
            json!({ "kind": "ProfileDeletedEvent", "fiscalCode": A_FISCAL_CODE }),
        ))
        .await;

    assert_eq!(outcome, ProcessingOutcome::Completed);
    assert!(created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_send_welcome_message_for_snake_case_profile_event() {
    let api = MockMessageApi::new(Reply::Accept);
    let created = api.created_handle();
    let handler = profile_handler(api, MockQueueControl::retrying());

    let outcome = handler
        .handle(&a_queue_message(
            PROFILE_EVENTS_QUEUE,
            json!({
                "kind": "ProfileCreatedEvent",
                "fiscalCode": A_FISCAL_CODE,
                "newProfile": {
                    "email": "citizen@example.com",
                    "is_inbox_enabled": true,
                    "preferred_languages": ["it_IT"]
                },
            }),
        ))
        .await;

    assert_eq!(outcome, ProcessingOutcome::Completed);
    assert_eq!(created.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_not_send_when_old_inbox_flag_is_missing() {
    let api = MockMessageApi::new(Reply::Accept);
    let created = api.created_handle();
    let handler = profile_handler(api, MockQueueControl::retrying());

    let outcome = handler
        .handle(&a_queue_message(
            PROFILE_EVENTS_QUEUE,
            json!({
                "kind": "ProfileUpdatedEvent",
                "fiscalCode": A_FISCAL_CODE,
                "newProfile": { "is_inbox_enabled": true },
                "oldProfile": { "email": "citizen@example.com" },
            }),
        ))
        .await;

    assert_eq!(outcome, ProcessingOutcome::Completed);
    assert!(created.lock().unwrap().is_empty());
}
