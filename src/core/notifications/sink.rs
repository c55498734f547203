use async_trait::async_trait;
use serde::Serialize;

/// Every notification is created under this identity, so showing a new one
/// replaces the previous.
pub const NOTIFICATION_ID: &str = "omg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Basic,
    Image,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationButton {
    pub title: String,
}

impl NotificationButton {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub icon_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// At most two, in display order.
    pub buttons: Vec<NotificationButton>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeIcon {
    Active,
    Inactive,
}

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("notification call failed: {0}")]
    Notification(String),
    #[error("badge call failed: {0}")]
    Badge(String),
    #[error("could not open `{url}`: {reason}")]
    Open { url: String, reason: String },
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn clear(&self, id: &str) -> Result<(), PlatformError>;
    async fn create(&self, id: &str, options: &NotificationOptions) -> Result<(), PlatformError>;
}

#[async_trait]
pub trait BadgeSink: Send + Sync {
    async fn set_text(&self, text: &str) -> Result<(), PlatformError>;
    async fn set_icon(&self, icon: BadgeIcon) -> Result<(), PlatformError>;
}

#[async_trait]
pub trait LinkOpener: Send + Sync {
    async fn open(&self, url: &str) -> Result<(), PlatformError>;
}
