use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use notifeed::Result;
use notifeed::audio::{AudioCue, Silent, TerminalBell};
use notifeed::center::NotificationCenter;
use notifeed::config::{Config, StorageBackend};
use notifeed::error::ConfigError;
use notifeed::feed::Notification;
use notifeed::panel::NotificationPanel;
use notifeed::storage::{FeedStore, FileStore, KeyValueStore, MemoryStore};
use notifeed::telemetry::init_tracing;
use notifeed::toast::ToastController;
use tokio::signal;
use tracing::{info, warn};

use super::cli::Cli;
use super::presenter::run_presenter;

const DEFAULT_CONFIG: &str = "notifeed.toml";

pub async fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.log_filter.as_deref(), cli.json_logs)?;

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let mut config = Config::from_env_and_file(&config_path)?;

    if let Some(interval) = cli.interval {
        if interval.is_zero() {
            return Err(ConfigError::InvalidField {
                field: "cli.interval",
                message: "interval must be greater than zero".to_string(),
            }
            .into());
        }
        config.poll_interval = interval;
    }
    if let Some(dir) = cli.store_dir.clone() {
        config.storage.dir = dir;
    }
    if cli.dry_run {
        config.storage.backend = StorageBackend::Memory;
    }

    let kv = open_store(&config)?;
    let audio: Arc<dyn AudioCue> = if config.audio.enabled && !cli.dry_run {
        Arc::new(TerminalBell)
    } else {
        Arc::new(Silent)
    };

    if cli.once || cli.has_actions() {
        return run_once(&cli, &config, kv, audio);
    }
    watch(&cli, &config, kv, audio).await
}

fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    match config.storage.backend {
        StorageBackend::File => {
            let store = FileStore::open(&config.storage.dir)?;
            info!(dir = %store.root().display(), "using file store");
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => {
            info!("using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn run_once(
    cli: &Cli,
    config: &Config,
    kv: Arc<dyn KeyValueStore>,
    audio: Arc<dyn AudioCue>,
) -> Result<()> {
    let toasts = ToastController::new(config.toast);
    let store = FeedStore::new(kv, config.storage.dismissed_capacity);
    let mut center = NotificationCenter::new(store, toasts.clone(), audio);

    if cli.once {
        let report = center.refresh();
        info!(
            total = report.total,
            new = report.new_ids.len(),
            persisted = report.persisted,
            "merge cycle finished"
        );
    }
    for id in &cli.dismiss {
        center.dismiss(id)?;
    }
    if cli.mark_all_read {
        center.mark_all_read()?;
    }
    if cli.clear_all {
        center.clear_all()?;
    }
    if let Some(filter) = cli.filter {
        center.set_filter(filter);
    }

    let feed = center.notifications();
    for notification in &feed {
        println!("{}", format_line(notification));
    }
    println!(
        "{} shown, {} unread ({} filter)",
        feed.len(),
        center.unread_count(),
        center.filter()
    );

    toasts.shutdown();
    Ok(())
}

async fn watch(
    cli: &Cli,
    config: &Config,
    kv: Arc<dyn KeyValueStore>,
    audio: Arc<dyn AudioCue>,
) -> Result<()> {
    let panel = NotificationPanel::mount(config, kv, audio);
    if let Some(filter) = cli.filter {
        panel.set_filter(filter).await;
    }
    let presenter = tokio::spawn(run_presenter(
        panel.subscribe_toasts(),
        config.toast.display,
        cli.dry_run,
    ));

    if let Err(err) = signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
    }
    info!(
        unread = panel.unread_count().await,
        "shutdown signal received, unmounting"
    );
    panel.unmount().await;

    if let Err(err) = presenter.await {
        warn!(error = %err, "presenter task terminated unexpectedly");
    }
    Ok(())
}

fn format_line(notification: &Notification) -> String {
    let marker = if notification.read { ' ' } else { '*' };
    format!(
        "{marker} {:<11} {}  {}  [{}] ({})",
        notification.kind.as_str(),
        notification.date.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
        notification.title,
        notification.status,
        notification.id
    )
}

#[cfg(test)]
mod tests {
    use super::format_line;
    use chrono::{TimeZone, Utc};
    use notifeed::feed::Notification;
    use notifeed::types::NotificationKind;

    #[test]
    fn unread_lines_are_starred() {
        let date = match Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).single() {
            Some(date) => date,
            None => panic!("valid date"),
        };
        let mut n = Notification::new(
            "m1",
            NotificationKind::Maintenance,
            "Maintenance Request: Sink",
            "Status: pending",
            "pending",
            date,
        );
        let line = format_line(&n);
        assert!(line.starts_with("* maintenance "));
        assert!(line.ends_with("Maintenance Request: Sink  [pending] (m1)"));

        n.read = true;
        assert!(format_line(&n).starts_with("  maintenance"));
    }
}
