use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};

use super::kv::KeyValueStore;
use super::models::{
    Article, FeedValidators, NotificationMarker, StorageChange, ARTICLES_KEY,
    FEED_VALIDATORS_KEY, INITIALIZED_KEY, LAST_NOTIFICATION_KEY,
};
use super::repository::StorageError;

/// Current layout of the persisted keys. Bumped when a one-time upgrade is
/// needed.
pub const SCHEMA_VERSION: i64 = 1;

const CHANGE_CHANNEL_CAPACITY: usize = 32;

/// Typed access to the persisted articles, notification marker and schema
/// version. Every accessor is an explicit await point.
#[derive(Clone)]
pub struct Storage {
    inner: Arc<StorageInner>,
}

struct StorageInner {
    kv: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
    changes: broadcast::Sender<StorageChange>,
}

impl Storage {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(StorageInner {
                kv,
                write_lock: Mutex::new(()),
                changes,
            }),
        }
    }

    /// Change feed fired after every successful write.
    pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.inner.changes.subscribe()
    }

    pub async fn articles(&self) -> Result<Vec<Article>, StorageError> {
        Ok(self.read(ARTICLES_KEY).await?.unwrap_or_default())
    }

    pub async fn set_articles(&self, articles: &[Article]) -> Result<(), StorageError> {
        self.write(ARTICLES_KEY, &articles, StorageChange::Articles)
            .await
    }

    pub async fn last_notification(&self) -> Result<Option<NotificationMarker>, StorageError> {
        self.read(LAST_NOTIFICATION_KEY).await
    }

    pub async fn set_last_notification(
        &self,
        marker: &NotificationMarker,
    ) -> Result<(), StorageError> {
        self.write(LAST_NOTIFICATION_KEY, marker, StorageChange::LastNotification)
            .await
    }

    pub async fn schema_version(&self) -> Result<Option<i64>, StorageError> {
        self.read(INITIALIZED_KEY).await
    }

    pub async fn set_schema_version(&self, version: i64) -> Result<(), StorageError> {
        self.write(INITIALIZED_KEY, &version, StorageChange::SchemaVersion)
            .await
    }

    pub async fn feed_validators(&self) -> Result<FeedValidators, StorageError> {
        Ok(self.read(FEED_VALIDATORS_KEY).await?.unwrap_or_default())
    }

    pub async fn set_feed_validators(&self, validators: &FeedValidators) -> Result<(), StorageError> {
        let value = serde_json::to_value(validators).map_err(|source| StorageError::Serialize {
            key: FEED_VALIDATORS_KEY.to_string(),
            source,
        })?;
        self.inner.kv.set(FEED_VALIDATORS_KEY, value).await
    }

    /// Reads the article list, applies `apply` and writes the result back.
    ///
    /// Sequences started through this method on the same `Storage` never
    /// interleave. Another process sharing the backing store can still race
    /// us; in that case the last full-collection write wins.
    pub async fn update_articles<F, T>(&self, apply: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Vec<Article>) -> T + Send,
        T: Send,
    {
        let _guard = self.inner.write_lock.lock().await;
        let mut articles = self.articles().await?;
        let outcome = apply(&mut articles);
        self.set_articles(&articles).await?;
        Ok(outcome)
    }

    /// Marks one article read. Returns `false` when no article has `id`.
    pub async fn mark_as_read(&self, id: i64) -> Result<bool, StorageError> {
        self.update_articles(|articles| {
            match articles.iter_mut().find(|article| article.id == id) {
                Some(article) => {
                    article.unread = false;
                    true
                }
                None => false,
            }
        })
        .await
    }

    /// Marks every article read and returns how many were unread before.
    pub async fn mark_all_as_read(&self) -> Result<usize, StorageError> {
        self.update_articles(|articles| {
            let mut flipped = 0_usize;
            for article in articles.iter_mut().filter(|article| article.unread) {
                article.unread = false;
                flipped += 1;
            }
            flipped
        })
        .await
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let Some(value) = self.inner.kv.get(key).await? else {
            return Ok(None);
        };
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|source| StorageError::Malformed {
                key: key.to_string(),
                source,
            })
    }

    async fn write<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        change: StorageChange,
    ) -> Result<(), StorageError> {
        let value = serde_json::to_value(value).map_err(|source| StorageError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.inner.kv.set(key, value).await?;
        // No subscribers is fine.
        let _ = self.inner.changes.send(change);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::kv::MemoryKeyValueStore;

    fn article(id: i64, unread: bool) -> Article {
        Article {
            id,
            date: format!("2024-05-{:02}T08:00:00", 30 - id),
            title: format!("Article {id}"),
            link: format!("https://example.com/{id}"),
            thumbnail: None,
            unread,
        }
    }

    fn memory_storage() -> (Storage, Arc<MemoryKeyValueStore>) {
        let kv = Arc::new(MemoryKeyValueStore::new());
        (Storage::new(kv.clone()), kv)
    }

    #[tokio::test]
    async fn empty_store_reads_defaults() {
        let (storage, _) = memory_storage();
        assert!(storage.articles().await.expect("articles").is_empty());
        assert!(storage.last_notification().await.expect("marker").is_none());
        assert!(storage.schema_version().await.expect("version").is_none());
        assert_eq!(
            storage.feed_validators().await.expect("validators"),
            FeedValidators::default()
        );
    }

    #[tokio::test]
    async fn mark_as_read_flips_only_matching_article() {
        let (storage, _) = memory_storage();
        storage
            .set_articles(&[article(1, true), article(2, true), article(3, true)])
            .await
            .expect("seed");

        let found = storage.mark_as_read(2).await.expect("mark");
        let articles = storage.articles().await.expect("articles");

        assert!(found);
        let flags: Vec<bool> = articles.iter().map(|a| a.unread).collect();
        assert_eq!(flags, vec![true, false, true]);
    }

    #[tokio::test]
    async fn mark_as_read_unknown_id_is_noop() {
        let (storage, _) = memory_storage();
        let seeded = vec![article(1, true), article(2, false)];
        storage.set_articles(&seeded).await.expect("seed");

        let found = storage.mark_as_read(404).await.expect("mark must not fail");

        assert!(!found);
        assert_eq!(storage.articles().await.expect("articles"), seeded);
    }

    #[tokio::test]
    async fn mark_all_as_read_clears_every_flag() {
        let (storage, _) = memory_storage();
        storage
            .set_articles(&[article(1, true), article(2, false), article(3, true)])
            .await
            .expect("seed");

        let flipped = storage.mark_all_as_read().await.expect("mark all");
        let articles = storage.articles().await.expect("articles");

        assert_eq!(flipped, 2);
        assert!(articles.iter().all(|a| !a.unread));
    }

    #[tokio::test]
    async fn mark_all_leaves_marker_untouched() {
        let (storage, kv) = memory_storage();
        storage.set_articles(&[article(1, true)]).await.expect("seed");
        storage.mark_all_as_read().await.expect("mark all");

        assert!(!kv
            .write_log()
            .await
            .iter()
            .any(|key| key == LAST_NOTIFICATION_KEY));
    }

    #[tokio::test]
    async fn concurrent_updates_do_not_drop_writes() {
        let (storage, _) = memory_storage();
        storage.set_articles(&[]).await.expect("seed");

        let mut handles = Vec::new();
        for id in 0..8_i64 {
            let storage = storage.clone();
            handles.push(tokio::spawn(async move {
                storage
                    .update_articles(move |articles| articles.push(article(id, true)))
                    .await
            }));
        }
        for handle in handles {
            handle.await.expect("join").expect("update");
        }

        assert_eq!(storage.articles().await.expect("articles").len(), 8);
    }

    #[tokio::test]
    async fn article_writes_are_broadcast() {
        let (storage, _) = memory_storage();
        let mut changes = storage.subscribe();

        storage.set_articles(&[article(1, true)]).await.expect("set");
        storage
            .set_last_notification(&NotificationMarker::Multi { last_id: 1 })
            .await
            .expect("set marker");

        assert_eq!(changes.recv().await.expect("change"), StorageChange::Articles);
        assert_eq!(
            changes.recv().await.expect("change"),
            StorageChange::LastNotification
        );
    }

    #[tokio::test]
    async fn null_marker_reads_as_absent() {
        let (storage, kv) = memory_storage();
        kv.set(LAST_NOTIFICATION_KEY, serde_json::Value::Null)
            .await
            .expect("set");
        assert!(storage.last_notification().await.expect("marker").is_none());
    }
}
