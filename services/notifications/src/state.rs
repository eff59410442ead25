use reqwest::Client;
use sea_orm::DatabaseConnection;

use courier_core::versioned::{VersionedEntity, VersionedModel};

use crate::config::NotificationsConfig;
use crate::handlers::QueueHandler;
use crate::handlers::notification_queue::NotificationQueueHandler;
use crate::handlers::profile_queue::ProfileQueueHandler;
use crate::infra::db::DbDocumentStore;
use crate::infra::mail::SendGridTransport;
use crate::infra::message_api::HttpMessageApi;
use crate::infra::queue::DbQueue;
use crate::infra::telemetry::TracingTelemetry;
use crate::infra::webhook::ReqwestWebhookSender;
use crate::usecase::email::EmailDelivery;
use crate::usecase::render::EmailRenderer;
use crate::usecase::retry::RetryDriver;
use crate::usecase::webhook::WebhookDelivery;
use crate::usecase::welcome::SendWelcomeMessageUseCase;
use crate::worker::QueueWorker;

pub type EmailQueueHandler = NotificationQueueHandler<
    DbDocumentStore,
    EmailDelivery<SendGridTransport, TracingTelemetry>,
    DbQueue,
>;
pub type WebhookQueueHandler = NotificationQueueHandler<
    DbDocumentStore,
    WebhookDelivery<ReqwestWebhookSender, TracingTelemetry>,
    DbQueue,
>;
pub type ProfileEventsHandler = ProfileQueueHandler<HttpMessageApi, DbQueue>;

/// Shared resources the queue handlers are assembled from.
#[derive(Clone)]
pub struct AppContext {
    pub db: DatabaseConnection,
    pub http: Client,
    pub config: NotificationsConfig,
}

impl AppContext {
    pub fn document_store(&self) -> DbDocumentStore {
        DbDocumentStore {
            db: self.db.clone(),
        }
    }

    pub fn queue(&self) -> DbQueue {
        DbQueue {
            db: self.db.clone(),
            max_dequeue_count: self.config.queue_max_dequeue_count,
            retry_base: self.config.queue_retry_base,
            retry_max: self.config.queue_retry_max,
        }
    }

    fn versioned<T: VersionedEntity>(&self) -> VersionedModel<DbDocumentStore, T> {
        VersionedModel::new(self.document_store())
            .with_max_conflict_retries(self.config.store_max_conflict_retries)
    }

    pub fn email_handler(&self) -> anyhow::Result<EmailQueueHandler> {
        Ok(NotificationQueueHandler {
            notifications: self.versioned(),
            statuses: self.versioned(),
            delivery: EmailDelivery {
                mailer: SendGridTransport {
                    client: self.http.clone(),
                    api_url: self.config.sendgrid_api_url.clone(),
                    api_key: self.config.sendgrid_api_key.clone(),
                },
                telemetry: TracingTelemetry,
                renderer: EmailRenderer::new()?,
                mail_from: self.config.mail_from.clone(),
            },
            driver: RetryDriver {
                queue: self.queue(),
            },
        })
    }

    pub fn webhook_handler(&self) -> WebhookQueueHandler {
        NotificationQueueHandler {
            notifications: self.versioned(),
            statuses: self.versioned(),
            delivery: WebhookDelivery {
                sender: ReqwestWebhookSender {
                    client: self.http.clone(),
                },
                telemetry: TracingTelemetry,
            },
            driver: RetryDriver {
                queue: self.queue(),
            },
        }
    }

    pub fn profile_handler(&self) -> ProfileEventsHandler {
        ProfileQueueHandler {
            welcome: SendWelcomeMessageUseCase {
                api: HttpMessageApi {
                    client: self.http.clone(),
                    base_url: self.config.notification_api_url.clone(),
                    api_key: self.config.notification_api_key.clone(),
                },
            },
            driver: RetryDriver {
                queue: self.queue(),
            },
        }
    }

    pub fn worker<H: QueueHandler>(&self, queue_name: &str, handler: H) -> QueueWorker<DbQueue, H> {
        QueueWorker {
            consumer: self.queue(),
            handler,
            queue_name: queue_name.to_owned(),
            poll_interval: self.config.queue_poll_interval,
            visibility_timeout: self.config.queue_visibility_timeout,
        }
    }
}
