use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};

use dossier_api as api;
use sea_orm_migration::MigratorTrait;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::AppConfig::load().context("failed to load configuration")?;
    api::config::init_tracing(&cfg.log_level, cfg.log_json);

    let db_config = api::db::DbConfig::from_app_config(&cfg);
    let pool = api::db::establish_connection_with_config(&db_config)
        .await
        .context("failed to connect to database")?;
    if cfg.auto_migrate {
        api::migrator::Migrator::up(&pool, None).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }

    let db = Arc::new(pool);
    let (event_sender, mut event_rx) = api::events::channel(cfg.event_buffer_size);
    let services = api::DossierServices::build(db.clone(), event_sender);

    // Drain the notification channel. Delivery is one-way: a failure here
    // never reaches the operation that emitted the event.
    let event_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match &event {
                api::Event::RelanceRequise {
                    entity_ref,
                    client_name,
                    due_date,
                    ..
                } => {
                    info!(%entity_ref, %client_name, %due_date, "relance requise");
                }
                other => {
                    info!(event = ?other, "event");
                }
            }
        }
    });

    // The library has no scheduler of its own; this loop is the cron-style
    // caller polling for due follow-ups.
    let poll_interval = Duration::from_secs(cfg.relance_poll_interval_secs);
    let relance = services.relance.clone();
    let poll_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match relance.dispatch_due(chrono::Utc::now()).await {
                Ok(0) => {}
                Ok(count) => info!(count, "follow-ups dispatched"),
                Err(e) => warn!(error = %e, "follow-up poll failed"),
            }
        }
    });

    info!(
        environment = %cfg.environment,
        poll_secs = cfg.relance_poll_interval_secs,
        "dossier-api started"
    );

    signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");

    poll_task.abort();
    event_task.abort();
    Ok(())
}
