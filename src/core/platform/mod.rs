//! Host-side implementations of the notification, badge and link traits
//! used by the daemon binary. They log what a desktop shell would render.

#[cfg(test)]
pub mod recording;

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::info;

use crate::core::migration::launcher::SupportDocumentHost;
use crate::core::migration::MigrationError;
use crate::core::notifications::sink::{
    BadgeIcon, BadgeSink, LinkOpener, NotificationOptions, NotificationSink, PlatformError,
};

/// Resolved icon locations under one asset base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconSet {
    pub logo: String,
    pub active: String,
    pub inactive: String,
}

impl IconSet {
    pub fn from_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            logo: format!("{base}/images/icon_logo128.png"),
            active: format!("{base}/images/icon_active38.png"),
            inactive: format!("{base}/images/icon_inactive38.png"),
        }
    }

    pub fn badge(&self, icon: BadgeIcon) -> &str {
        match icon {
            BadgeIcon::Active => &self.active,
            BadgeIcon::Inactive => &self.inactive,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn clear(&self, id: &str) -> Result<(), PlatformError> {
        info!(id, "notification cleared");
        Ok(())
    }

    async fn create(&self, id: &str, options: &NotificationOptions) -> Result<(), PlatformError> {
        let payload = serde_json::to_string(options)
            .map_err(|err| PlatformError::Notification(err.to_string()))?;
        info!(id, title = %options.title, message = %options.message, %payload, "notification created");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LogBadgeSink {
    icons: IconSet,
}

impl LogBadgeSink {
    pub fn new(icons: IconSet) -> Self {
        Self { icons }
    }
}

#[async_trait]
impl BadgeSink for LogBadgeSink {
    async fn set_text(&self, text: &str) -> Result<(), PlatformError> {
        info!(text, "badge text");
        Ok(())
    }

    async fn set_icon(&self, icon: BadgeIcon) -> Result<(), PlatformError> {
        info!(path = self.icons.badge(icon), "badge icon");
        Ok(())
    }
}

/// Opens links in the user's default browser.
#[derive(Debug, Clone, Default)]
pub struct BrowserLinkOpener;

#[async_trait]
impl LinkOpener for BrowserLinkOpener {
    async fn open(&self, url: &str) -> Result<(), PlatformError> {
        let target = url.to_string();
        let result = tokio::task::spawn_blocking(move || webbrowser::open(&target))
            .await
            .map_err(|err| PlatformError::Open {
                url: url.to_string(),
                reason: err.to_string(),
            })?;
        result.map_err(|err| PlatformError::Open {
            url: url.to_string(),
            reason: err.to_string(),
        })
    }
}

/// Stands in for the support document when there is no legacy browser
/// storage to read: creation is recorded and logged only.
#[derive(Debug, Default)]
pub struct LogSupportDocumentHost {
    open: AtomicBool,
}

#[async_trait]
impl SupportDocumentHost for LogSupportDocumentHost {
    async fn exists(&self, _url: &str) -> Result<bool, MigrationError> {
        Ok(self.open.load(Ordering::SeqCst))
    }

    async fn create(&self, url: &str) -> Result<(), MigrationError> {
        info!(url, "compat support document opened");
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }
}
