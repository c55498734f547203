pub mod core;

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use core::config::{AppConfig, ConfigError};
use core::feed::fetcher::{FeedClient, FetchError};
use core::feed::{refresh_articles, RefreshOutcome};
use core::logging::init_tracing;
use core::migration::launcher::{CompatDocumentLauncher, SupportDocumentHost};
use core::migration::{apply_compat_message, CompatMessage, Migrator, COMPAT_DOCUMENT_URL};
use core::notifications::actions::{ClickOutcome, NotificationActions};
use core::notifications::sink::{BadgeSink, LinkOpener, NotificationSink};
use core::notifications::{Notifier, NotifyOutcome};
use core::platform::{
    BrowserLinkOpener, IconSet, LogBadgeSink, LogNotificationSink, LogSupportDocumentHost,
};
use core::storage::{KeyValueStore, SqliteKeyValueStore, Storage, StorageChange, StorageError};
use core::AppServices;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("feed client error: {0}")]
    Fetch(#[from] FetchError),
    #[error("runtime error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the app needs from the host environment.
pub struct Platform {
    pub notifications: Arc<dyn NotificationSink>,
    pub badge: Arc<dyn BadgeSink>,
    pub opener: Arc<dyn LinkOpener>,
    pub documents: Arc<dyn SupportDocumentHost>,
    pub icons: IconSet,
}

impl Platform {
    pub fn desktop(icons: IconSet) -> Self {
        Self {
            notifications: Arc::new(LogNotificationSink),
            badge: Arc::new(LogBadgeSink::new(icons.clone())),
            opener: Arc::new(BrowserLinkOpener),
            documents: Arc::new(LogSupportDocumentHost::default()),
            icons,
        }
    }
}

#[derive(Clone)]
pub struct App {
    inner: Arc<AppInner>,
}

struct AppInner {
    config: AppConfig,
    services: AppServices,
    storage: Storage,
    notifier: Notifier,
    client: FeedClient,
    opener: Arc<dyn LinkOpener>,
    migrator: Migrator,
}

impl App {
    pub fn new(
        config: AppConfig,
        kv: Arc<dyn KeyValueStore>,
        platform: Platform,
    ) -> Result<Self, AppError> {
        let storage = Storage::new(kv);
        let notifier = Notifier::new(
            storage.clone(),
            platform.notifications,
            platform.badge,
            &config.title,
            &platform.icons.logo,
        );
        let client = FeedClient::new(&config.feed_url, config.http_timeout, config.fetch_retries)?;
        let launcher = Arc::new(CompatDocumentLauncher::new(
            platform.documents,
            COMPAT_DOCUMENT_URL,
        ));
        let migrator = Migrator::new(storage.clone(), launcher);
        Ok(Self {
            inner: Arc::new(AppInner {
                config,
                services: AppServices::default(),
                storage,
                notifier,
                client,
                opener: platform.opener,
                migrator,
            }),
        })
    }

    pub fn health_report(&self) -> BTreeMap<String, String> {
        self.inner.services.health_report()
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn storage(&self) -> &Storage {
        &self.inner.storage
    }

    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    /// Schema check, then a first update.
    pub async fn start(&self) -> Result<NotifyOutcome, StorageError> {
        if self.inner.migrator.on_init().await?.is_some() {
            debug!("compat support document launch scheduled");
        }
        let (_, outcome) = self.update_articles().await?;
        Ok(outcome)
    }

    /// Refresh from the network, then sync the badge and notify. A failed
    /// fetch still runs the last two steps on the stored articles.
    pub async fn update_articles(&self) -> Result<(RefreshOutcome, NotifyOutcome), StorageError> {
        let refreshed = refresh_articles(&self.inner.client, &self.inner.storage).await;
        self.inner.notifier.update_badge().await?;
        let notified = self.inner.notifier.notify_unread().await?;
        Ok((refreshed, notified))
    }

    pub async fn notification_clicked(&self) -> Result<ClickOutcome, StorageError> {
        self.actions().clicked().await
    }

    pub async fn notification_button_clicked(
        &self,
        index: usize,
    ) -> Result<ClickOutcome, StorageError> {
        self.actions().button_clicked(index).await
    }

    pub async fn compat_message(
        &self,
        message: CompatMessage,
    ) -> Result<Option<NotifyOutcome>, StorageError> {
        apply_compat_message(&self.inner.notifier, message).await
    }

    /// Recomputes the badge whenever the stored article list changes.
    pub fn spawn_badge_listener(&self) -> JoinHandle<()> {
        let app = self.clone();
        let mut changes = self.inner.storage.subscribe();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(StorageChange::Articles) | Err(RecvError::Lagged(_)) => {
                        if let Err(err) = app.inner.notifier.update_badge().await {
                            warn!(error = %err, "failed to update badge");
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Runs `update_articles` every poll interval. The first tick fires one
    /// interval from now; `start` covers the initial update.
    pub fn spawn_poller(&self) -> JoinHandle<()> {
        let app = self.clone();
        let period = self.inner.config.poll_interval;
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = app.update_articles().await {
                    error!(error = %err, "scheduled update failed");
                }
            }
        })
    }

    fn actions(&self) -> NotificationActions<'_> {
        NotificationActions::new(
            &self.inner.storage,
            self.inner.opener.as_ref(),
            &self.inner.config.home_url,
        )
    }
}

/// Entry point for the daemon: loads config, opens storage, runs the first
/// update and keeps polling until interrupted.
pub async fn run() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);
    let kv = Arc::new(SqliteKeyValueStore::connect(&config.database_url).await?);
    let platform = Platform::desktop(IconSet::from_base(&config.icon_base_url));
    let app = App::new(config, kv, platform)?;
    info!(
        feed = %app.config().feed_url,
        every_secs = app.config().poll_interval.as_secs(),
        services = ?app.health_report(),
        "feed notifier started"
    );

    let badge_listener = app.spawn_badge_listener();
    if let Err(err) = app.start().await {
        error!(error = %err, "initial update failed");
    }
    let poller = app.spawn_poller();

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    poller.abort();
    badge_listener.abort();
    Ok(())
}
