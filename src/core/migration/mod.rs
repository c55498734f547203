pub mod launcher;

use std::sync::Arc;

use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::core::notifications::{Notifier, NotifyOutcome};
use crate::core::storage::{Article, NotificationMarker, Storage, StorageError, SCHEMA_VERSION};
use launcher::CompatDocumentLauncher;

pub const COMPAT_DOCUMENT_URL: &str = "offscreen.html";

#[derive(Debug, Clone, thiserror::Error)]
pub enum MigrationError {
    #[error("support document host failed: {0}")]
    Host(String),
}

#[derive(Debug, Clone, Default)]
pub struct MigrationService;

impl MigrationService {
    pub fn name(&self) -> &'static str {
        "migration"
    }

    pub fn status(&self) -> &'static str {
        "ready"
    }
}

/// Legacy data handed over by the compat support document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum CompatMessage {
    #[serde(rename = "compatLastNotification")]
    LastNotification(NotificationMarker),
    #[serde(rename = "compatArticles")]
    Articles(Vec<Article>),
}

/// One-time schema upgrade driven at start-up.
pub struct Migrator {
    storage: Storage,
    launcher: Arc<CompatDocumentLauncher>,
}

impl Migrator {
    pub fn new(storage: Storage, launcher: Arc<CompatDocumentLauncher>) -> Self {
        Self { storage, launcher }
    }

    /// Launches the compat document and records the schema version when the
    /// stored version is not current. The launch runs in the background; the
    /// returned handle is only there for callers that want to wait on it.
    pub async fn on_init(&self) -> Result<Option<JoinHandle<()>>, StorageError> {
        let stored = self.storage.schema_version().await?;
        if stored == Some(SCHEMA_VERSION) {
            return Ok(None);
        }

        info!(?stored, current = SCHEMA_VERSION, "upgrading storage schema");
        let launcher = self.launcher.clone();
        let launch = tokio::spawn(async move {
            if let Err(err) = launcher.ensure_created().await {
                warn!(error = %err, "failed to open compat support document");
            }
        });
        self.storage.set_schema_version(SCHEMA_VERSION).await?;
        Ok(Some(launch))
    }
}

/// Stores data received from the compat document. Imported articles replace
/// the stored list under the article write lock and are then checked for
/// notifications.
pub async fn apply_compat_message(
    notifier: &Notifier,
    message: CompatMessage,
) -> Result<Option<NotifyOutcome>, StorageError> {
    match message {
        CompatMessage::LastNotification(marker) => {
            notifier.storage().set_last_notification(&marker).await?;
            Ok(None)
        }
        CompatMessage::Articles(articles) => {
            info!(count = articles.len(), "imported legacy articles");
            notifier
                .storage()
                .update_articles(move |stored| *stored = articles)
                .await?;
            notifier.notify_unread().await.map(Some)
        }
    }
}
