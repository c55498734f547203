use serde::{Deserialize, Serialize};

pub const ARTICLES_KEY: &str = "articles";
pub const LAST_NOTIFICATION_KEY: &str = "lastNotification";
pub const INITIALIZED_KEY: &str = "initialized";
pub const FEED_VALIDATORS_KEY: &str = "feedValidators";

/// One feed entry with its locally tracked read state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Article {
    pub id: i64,
    /// ISO-8601 timestamp. Collections are kept newest first by this field.
    pub date: String,
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    pub unread: bool,
}

/// Remembers the most recent notification shown so the same articles are
/// not announced twice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NotificationMarker {
    Single {
        #[serde(rename = "lastId")]
        last_id: i64,
        /// Snapshot taken when the notification was shown.
        article: Article,
    },
    Multi {
        #[serde(rename = "lastId")]
        last_id: i64,
    },
}

impl NotificationMarker {
    pub fn last_id(&self) -> i64 {
        match self {
            Self::Single { last_id, .. } | Self::Multi { last_id } => *last_id,
        }
    }
}

/// HTTP cache validators from the last successful feed fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedValidators {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageChange {
    Articles,
    LastNotification,
    SchemaVersion,
}
