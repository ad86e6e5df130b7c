use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use plan_digest::channels::{Channel, CliChannel, Notifier, TelegramChannel, spawn_event_listener};
use plan_digest::config::DigestConfig;
use plan_digest::plans::{JsonPlanStore, PlanStore};
use plan_digest::scheduler::{DailyScheduler, spawn_daily_scheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = DigestConfig::from_env().context("invalid configuration")?;

    eprintln!("📋 Plan Digest v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Plans: {}", config.plans_path.display());
    eprintln!("   Fires: daily at {}", config.fire_at.format("%H:%M"));

    // ── Plan store ──────────────────────────────────────────────────────
    let store = Arc::new(JsonPlanStore::new(config.plans_path.clone()));

    // A plan set that cannot be read is fatal at start-up.
    let plans = store
        .load_all()
        .await
        .context("cannot load plan file")?;
    eprintln!("   Loaded: {} plans", plans.len());

    // ── Channel ─────────────────────────────────────────────────────────
    let (channel, notifier) = match config.telegram_token.clone() {
        Some(token) => {
            eprintln!(
                "   Telegram: enabled (allowed: {})",
                if config.telegram_allowed_users.iter().any(|u| u == "*") {
                    "everyone".to_string()
                } else {
                    config.telegram_allowed_users.join(", ")
                }
            );
            let telegram = Arc::new(TelegramChannel::new(
                token,
                config.telegram_allowed_users.clone(),
            ));
            (telegram.clone() as Arc<dyn Channel>, telegram as Arc<dyn Notifier>)
        }
        None => {
            eprintln!("   Telegram: disabled (TELEGRAM_BOT_TOKEN not set), using stdout");
            let cli = Arc::new(CliChannel::new());
            (cli.clone() as Arc<dyn Channel>, cli as Arc<dyn Notifier>)
        }
    };

    if let Err(e) = channel.health_check().await {
        tracing::warn!(channel = channel.name(), "Health check failed: {e}");
    }

    // ── Background loops ────────────────────────────────────────────────
    let cancel = CancellationToken::new();

    let scheduler = Arc::new(DailyScheduler::new(&config, store, notifier));
    let scheduler_handle = spawn_daily_scheduler(scheduler, cancel.child_token());
    let listener_handle = spawn_event_listener(channel, cancel.child_token());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    tracing::info!("Shutting down");
    cancel.cancel();

    let _ = tokio::join!(scheduler_handle, listener_handle);
    Ok(())
}
