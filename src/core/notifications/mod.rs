//! Deciding when to notify about unread articles, and keeping the badge in
//! sync with the unread count.
//!
//! The window of "new" articles is every stored article newer than the one
//! recorded in the last notification marker. If the marker is missing or
//! points at an article that is no longer stored, the window is the whole
//! collection: a stale marker re-announces unread articles rather than
//! silencing them.

pub mod actions;
pub mod sink;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::feed::decode_html_entities;
use crate::core::storage::{Article, NotificationMarker, Storage, StorageError};
use sink::{
    BadgeIcon, BadgeSink, NotificationButton, NotificationKind, NotificationOptions,
    NotificationSink, NOTIFICATION_ID,
};

#[derive(Debug, Clone, Default)]
pub struct NotificationService;

impl NotificationService {
    pub fn name(&self) -> &'static str {
        "notifications"
    }

    pub fn status(&self) -> &'static str {
        "ready"
    }
}

/// Which notification, if any, the current state calls for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision<'a> {
    Nothing,
    Single(&'a Article),
    /// Two or more articles, newest first.
    Multi(Vec<&'a Article>),
}

/// What `notify_unread` ended up showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Nothing,
    Single { id: i64 },
    Multi { count: usize, last_id: i64 },
}

/// Unread articles newer than the marker. `articles` must be newest first.
pub fn unread_since<'a>(
    articles: &'a [Article],
    marker: Option<&NotificationMarker>,
) -> Vec<&'a Article> {
    let boundary = marker
        .and_then(|marker| {
            let last_id = marker.last_id();
            articles.iter().position(|article| article.id == last_id)
        })
        .unwrap_or(articles.len());
    articles[..boundary]
        .iter()
        .filter(|article| article.unread)
        .collect()
}

pub fn decide<'a>(articles: &'a [Article], marker: Option<&NotificationMarker>) -> Decision<'a> {
    let mut unread = unread_since(articles, marker);
    match unread.len() {
        0 => Decision::Nothing,
        1 => Decision::Single(unread.remove(0)),
        _ => Decision::Multi(unread),
    }
}

pub fn single_options(article: &Article, product: &str, icon_url: &str) -> NotificationOptions {
    let image_url = article
        .thumbnail
        .as_ref()
        .filter(|thumbnail| !thumbnail.is_empty())
        .cloned();
    NotificationOptions {
        kind: if image_url.is_some() {
            NotificationKind::Image
        } else {
            NotificationKind::Basic
        },
        title: format!("New article on {product}"),
        message: decode_html_entities(&article.title),
        icon_url: icon_url.to_string(),
        image_url,
        buttons: vec![
            NotificationButton::new("Read"),
            NotificationButton::new("Mark As Read"),
        ],
    }
}

/// Options for an aggregated notification about `first` and `others` more.
pub fn multi_options(
    first: &Article,
    others: usize,
    product: &str,
    icon_url: &str,
) -> NotificationOptions {
    let noun = if others == 1 { "article" } else { "articles" };
    NotificationOptions {
        kind: NotificationKind::Basic,
        title: format!("{} new articles on {product}", others + 1),
        message: format!(
            "\"{}\" and {others} other {noun}",
            decode_html_entities(&first.title)
        ),
        icon_url: icon_url.to_string(),
        image_url: None,
        buttons: vec![
            NotificationButton::new("Read"),
            NotificationButton::new("Mark All As Read"),
        ],
    }
}

/// Shows notifications and badge state for the stored articles.
#[derive(Clone)]
pub struct Notifier {
    storage: Storage,
    notifications: Arc<dyn NotificationSink>,
    badge: Arc<dyn BadgeSink>,
    product: String,
    icon_url: String,
}

impl Notifier {
    pub fn new(
        storage: Storage,
        notifications: Arc<dyn NotificationSink>,
        badge: Arc<dyn BadgeSink>,
        product: &str,
        icon_url: &str,
    ) -> Self {
        Self {
            storage,
            notifications,
            badge,
            product: product.to_string(),
            icon_url: icon_url.to_string(),
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Shows one notification for unread articles that arrived since the last
    /// one, or nothing. The marker is only written when something is shown.
    pub async fn notify_unread(&self) -> Result<NotifyOutcome, StorageError> {
        let articles = self.storage.articles().await?;
        let marker = self.storage.last_notification().await?;

        match decide(&articles, marker.as_ref()) {
            Decision::Nothing => {
                debug!(
                    last_id = marker.as_ref().map(NotificationMarker::last_id),
                    "no unread articles since last notification"
                );
                Ok(NotifyOutcome::Nothing)
            }
            Decision::Single(article) => {
                self.single(article).await?;
                Ok(NotifyOutcome::Single { id: article.id })
            }
            Decision::Multi(unread) => {
                let owned: Vec<Article> = unread.into_iter().cloned().collect();
                self.multi(&owned).await?;
                Ok(NotifyOutcome::Multi {
                    count: owned.len(),
                    last_id: owned[0].id,
                })
            }
        }
    }

    /// Announces one article and remembers it in the marker.
    pub async fn single(&self, article: &Article) -> Result<(), StorageError> {
        let options = single_options(article, &self.product, &self.icon_url);
        self.storage
            .set_last_notification(&NotificationMarker::Single {
                last_id: article.id,
                article: article.clone(),
            })
            .await?;
        info!(id = article.id, "showing single article notification");
        self.show(&options).await;
        Ok(())
    }

    /// Announces several articles, newest first. Only the newest id is kept
    /// in the marker.
    pub async fn multi(&self, articles: &[Article]) -> Result<(), StorageError> {
        let Some(first) = articles.first() else {
            warn!("multi notification requested without articles");
            return Ok(());
        };
        let options = multi_options(first, articles.len() - 1, &self.product, &self.icon_url);
        self.storage
            .set_last_notification(&NotificationMarker::Multi { last_id: first.id })
            .await?;
        info!(
            count = articles.len(),
            last_id = first.id,
            "showing multi article notification"
        );
        self.show(&options).await;
        Ok(())
    }

    pub async fn clear(&self) {
        if let Err(err) = self.notifications.clear(NOTIFICATION_ID).await {
            warn!(error = %err, "failed to clear notification");
        }
    }

    /// Mirrors the unread count on the badge. Returns the count.
    pub async fn update_badge(&self) -> Result<usize, StorageError> {
        let unread = self
            .storage
            .articles()
            .await?
            .iter()
            .filter(|article| article.unread)
            .count();
        let (text, icon) = if unread == 0 {
            (String::new(), BadgeIcon::Inactive)
        } else {
            (unread.to_string(), BadgeIcon::Active)
        };
        if let Err(err) = self.badge.set_text(&text).await {
            warn!(error = %err, "failed to set badge text");
        }
        if let Err(err) = self.badge.set_icon(icon).await {
            warn!(error = %err, "failed to set badge icon");
        }
        Ok(unread)
    }

    async fn show(&self, options: &NotificationOptions) {
        self.clear().await;
        if let Err(err) = self.notifications.create(NOTIFICATION_ID, options).await {
            warn!(error = %err, "failed to create notification");
        }
    }
}
