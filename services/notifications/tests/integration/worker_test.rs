use std::time::Duration;

use serde_json::json;
use tokio::sync::watch;

use courier_notifications::domain::repository::QueueProducer;
use courier_notifications::domain::types::{
    EMAIL_NOTIFICATION_QUEUE, ProcessingOutcome, WEBHOOK_NOTIFICATION_QUEUE,
};
use courier_notifications::worker::QueueWorker;

use crate::helpers::{MockHandler, MockQueue, a_queue_message};

fn worker(queue: MockQueue, handler: MockHandler) -> QueueWorker<MockQueue, MockHandler> {
    QueueWorker {
        consumer: queue,
        handler,
        queue_name: EMAIL_NOTIFICATION_QUEUE.to_owned(),
        poll_interval: Duration::from_millis(10),
        visibility_timeout: Duration::from_secs(30),
    }
}

#[tokio::test]
async fn should_complete_message_when_handler_completes() {
    let message = a_queue_message(EMAIL_NOTIFICATION_QUEUE, json!({}));
    let queue = MockQueue::with_messages(vec![message.clone()]);
    let completed = queue.completed_handle();
    let worker = worker(queue, MockHandler::new(ProcessingOutcome::Completed));

    assert!(worker.poll_once().await.unwrap());

    assert_eq!(*completed.lock().unwrap(), vec![message.id]);
}

#[tokio::test]
async fn should_leave_message_leased_when_retry_scheduled() {
    let queue = MockQueue::with_messages(vec![a_queue_message(EMAIL_NOTIFICATION_QUEUE, json!({}))]);
    let completed = queue.completed_handle();
    let dead = queue.dead_lettered_handle();
    let worker = worker(queue, MockHandler::new(ProcessingOutcome::RetryScheduled));

    assert!(worker.poll_once().await.unwrap());

    assert!(completed.lock().unwrap().is_empty());
    assert!(dead.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_dead_letter_message_when_retries_exhausted() {
    let message = a_queue_message(EMAIL_NOTIFICATION_QUEUE, json!({}));
    let queue = MockQueue::with_messages(vec![message.clone()]);
    let dead = queue.dead_lettered_handle();
    let worker = worker(queue, MockHandler::new(ProcessingOutcome::RetriesExhausted));

    worker.poll_once().await.unwrap();

    let dead = dead.lock().unwrap();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].0, message.id);
}

#[tokio::test]
async fn should_only_receive_from_own_queue() {
    let queue = MockQueue::with_messages(vec![a_queue_message(
        WEBHOOK_NOTIFICATION_QUEUE,
        json!({}),
    )]);
    let handler = MockHandler::new(ProcessingOutcome::Completed);
    let handled = handler.handled_handle();
    let worker = worker(queue, handler);

    assert!(!worker.poll_once().await.unwrap());
    assert!(handled.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_drain_queue_and_stop_on_shutdown() {
    let messages: Vec<_> = (0..3)
        .map(|_| a_queue_message(EMAIL_NOTIFICATION_QUEUE, json!({})))
        .collect();
    let queue = MockQueue::with_messages(messages);
    let completed = queue.completed_handle();
    let worker = worker(queue, MockHandler::new(ProcessingOutcome::Completed));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let running = tokio::spawn(async move { worker.run(shutdown_rx).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(1), running)
        .await
        .expect("worker did not stop")
        .unwrap();

    assert_eq!(completed.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn should_process_enqueued_message() {
    let queue = MockQueue::default();
    let id = queue
        .enqueue(EMAIL_NOTIFICATION_QUEUE, &json!({ "notificationId": "n1" }))
        .await
        .unwrap();
    let completed = queue.completed_handle();
    let handler = MockHandler::new(ProcessingOutcome::Completed);
    let handled = handler.handled_handle();
    let worker = worker(queue, handler);

    assert!(worker.poll_once().await.unwrap());
    assert!(!worker.poll_once().await.unwrap());

    assert_eq!(*handled.lock().unwrap(), vec![id]);
    assert_eq!(*completed.lock().unwrap(), vec![id]);
}
