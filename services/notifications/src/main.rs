use anyhow::Context as _;
use sea_orm::Database;
use tokio::sync::watch;
use tracing::{error, info};

use courier_core::tracing::init_tracing;
use courier_notifications::config::NotificationsConfig;
use courier_notifications::domain::types::{
    EMAIL_NOTIFICATION_QUEUE, PROFILE_EVENTS_QUEUE, WEBHOOK_NOTIFICATION_QUEUE,
};
use courier_notifications::infra::http::build_http_client;
use courier_notifications::router::build_router;
use courier_notifications::state::AppContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = NotificationsConfig::from_env().context("load configuration")?;

    let db = Database::connect(&config.database_url)
        .await
        .context("connect to database")?;
    let http = build_http_client(config.http_timeout)?;
    let port = config.port;
    let ctx = AppContext { db, http, config };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let email = ctx.worker(EMAIL_NOTIFICATION_QUEUE, ctx.email_handler()?);
    let webhook = ctx.worker(WEBHOOK_NOTIFICATION_QUEUE, ctx.webhook_handler());
    let profile = ctx.worker(PROFILE_EVENTS_QUEUE, ctx.profile_handler());

    let workers = [
        tokio::spawn({
            let rx = shutdown_rx.clone();
            async move { email.run(rx).await }
        }),
        tokio::spawn({
            let rx = shutdown_rx.clone();
            async move { webhook.run(rx).await }
        }),
        tokio::spawn({
            let rx = shutdown_rx;
            async move { profile.run(rx).await }
        }),
    ];

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!("notifications service listening on {addr}");

    axum::serve(listener, build_router())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(error = %err, "failed to listen for shutdown signal");
            }
            info!("shutdown signal received");
        })
        .await
        .context("serve health endpoints")?;

    // Workers finish the message in hand before stopping.
    let _ = shutdown_tx.send(true);
    for worker in workers {
        if let Err(err) = worker.await {
            error!(error = %err, "queue worker panicked");
        }
    }
    Ok(())
}
