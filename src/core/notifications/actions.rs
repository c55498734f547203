use tracing::{info, warn};

use super::sink::LinkOpener;
use crate::core::storage::{NotificationMarker, Storage, StorageError};

/// Index of the "Read" button on both notification shapes.
pub const READ_BUTTON: usize = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkedRead {
    One { id: i64, found: bool },
    All { count: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickOutcome {
    pub marked: MarkedRead,
    pub opened: Option<String>,
}

/// Routes clicks on the notification to read-state changes and links.
#[derive(Clone)]
pub struct NotificationActions<'a> {
    storage: &'a Storage,
    opener: &'a dyn LinkOpener,
    home_url: &'a str,
}

impl<'a> NotificationActions<'a> {
    pub fn new(storage: &'a Storage, opener: &'a dyn LinkOpener, home_url: &'a str) -> Self {
        Self {
            storage,
            opener,
            home_url,
        }
    }

    /// Body click: a single notification opens its article, anything else
    /// marks everything read and opens the blog home.
    pub async fn clicked(&self) -> Result<ClickOutcome, StorageError> {
        match self.single_target().await? {
            Some((id, link)) => {
                let found = self.storage.mark_as_read(id).await?;
                self.open(&link).await;
                Ok(ClickOutcome {
                    marked: MarkedRead::One { id, found },
                    opened: Some(link),
                })
            }
            None => {
                let count = self.storage.mark_all_as_read().await?;
                self.open(self.home_url).await;
                Ok(ClickOutcome {
                    marked: MarkedRead::All { count },
                    opened: Some(self.home_url.to_string()),
                })
            }
        }
    }

    /// Button click. Both buttons mark read; only "Read" opens a link. For
    /// an aggregated notification that link is its newest article, or the
    /// blog home once that article is gone.
    pub async fn button_clicked(&self, index: usize) -> Result<ClickOutcome, StorageError> {
        let opens = index == READ_BUTTON;
        match self.single_target().await? {
            Some((id, link)) => {
                let found = self.storage.mark_as_read(id).await?;
                let opened = if opens {
                    self.open(&link).await;
                    Some(link)
                } else {
                    None
                };
                Ok(ClickOutcome {
                    marked: MarkedRead::One { id, found },
                    opened,
                })
            }
            None => {
                let last_id = self
                    .storage
                    .last_notification()
                    .await?
                    .map(|marker| marker.last_id());
                let (count, newest_link) = self
                    .storage
                    .update_articles(move |articles| {
                        let link = last_id.and_then(|last_id| {
                            articles
                                .iter()
                                .find(|article| article.id == last_id)
                                .map(|article| article.link.clone())
                                .filter(|link| !link.is_empty())
                        });
                        let mut count = 0_usize;
                        for article in articles.iter_mut().filter(|article| article.unread) {
                            article.unread = false;
                            count += 1;
                        }
                        (count, link)
                    })
                    .await?;
                let opened = if opens {
                    let target = newest_link.unwrap_or_else(|| self.home_url.to_string());
                    self.open(&target).await;
                    Some(target)
                } else {
                    None
                };
                Ok(ClickOutcome {
                    marked: MarkedRead::All { count },
                    opened,
                })
            }
        }
    }

    async fn single_target(&self) -> Result<Option<(i64, String)>, StorageError> {
        Ok(match self.storage.last_notification().await? {
            Some(NotificationMarker::Single { article, .. }) if !article.link.is_empty() => {
                Some((article.id, article.link))
            }
            _ => None,
        })
    }

    async fn open(&self, url: &str) {
        info!(url, "opening link");
        if let Err(err) = self.opener.open(url).await {
            warn!(error = %err, "failed to open link");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::recording::{mock_articles, RecordingLinkOpener};
    use crate::core::storage::{Article, MemoryKeyValueStore};
    use std::sync::Arc;

    const HOME: &str = "https://example.com/";

    async fn storage_with(articles: &[Article], marker: Option<NotificationMarker>) -> Storage {
        let storage = Storage::new(Arc::new(MemoryKeyValueStore::new()));
        storage.set_articles(articles).await.expect("seed articles");
        if let Some(marker) = marker {
            storage
                .set_last_notification(&marker)
                .await
                .expect("seed marker");
        }
        storage
    }

    fn unread_ids(articles: &[Article]) -> Vec<i64> {
        articles
            .iter()
            .filter(|article| article.unread)
            .map(|article| article.id)
            .collect()
    }

    #[tokio::test]
    async fn body_click_on_single_reads_that_article() {
        let articles = mock_articles();
        let marker = NotificationMarker::Single {
            last_id: articles[0].id,
            article: articles[0].clone(),
        };
        let storage = storage_with(&articles, Some(marker)).await;
        let opener = RecordingLinkOpener::default();

        let outcome = NotificationActions::new(&storage, &opener, HOME)
            .clicked()
            .await
            .expect("click");

        assert_eq!(
            outcome.marked,
            MarkedRead::One {
                id: articles[0].id,
                found: true
            }
        );
        assert_eq!(opener.opened(), vec![articles[0].link.clone()]);
        let stored = storage.articles().await.expect("articles");
        assert_eq!(unread_ids(&stored).len(), 10);
        assert!(!stored[0].unread);
    }

    #[tokio::test]
    async fn body_click_on_multi_reads_all_and_opens_home() {
        let articles = mock_articles();
        let storage = storage_with(
            &articles,
            Some(NotificationMarker::Multi {
                last_id: articles[0].id,
            }),
        )
        .await;
        let opener = RecordingLinkOpener::default();

        let outcome = NotificationActions::new(&storage, &opener, HOME)
            .clicked()
            .await
            .expect("click");

        assert_eq!(outcome.marked, MarkedRead::All { count: 11 });
        assert_eq!(opener.opened(), vec![HOME.to_string()]);
        assert!(unread_ids(&storage.articles().await.expect("articles")).is_empty());
    }

    #[tokio::test]
    async fn mark_as_read_button_does_not_open_a_tab() {
        let articles = mock_articles();
        let marker = NotificationMarker::Single {
            last_id: articles[3].id,
            article: articles[3].clone(),
        };
        let storage = storage_with(&articles, Some(marker.clone())).await;
        let opener = RecordingLinkOpener::default();

        let outcome = NotificationActions::new(&storage, &opener, HOME)
            .button_clicked(1)
            .await
            .expect("button");

        assert_eq!(outcome.opened, None);
        assert!(opener.opened().is_empty());
        let stored = storage.articles().await.expect("articles");
        assert!(!stored[3].unread);
        assert_eq!(
            storage.last_notification().await.expect("marker"),
            Some(marker)
        );
    }

    #[tokio::test]
    async fn read_button_on_multi_opens_newest_article() {
        let articles = mock_articles();
        let storage = storage_with(
            &articles,
            Some(NotificationMarker::Multi {
                last_id: articles[0].id,
            }),
        )
        .await;
        let opener = RecordingLinkOpener::default();

        let outcome = NotificationActions::new(&storage, &opener, HOME)
            .button_clicked(READ_BUTTON)
            .await
            .expect("button");

        assert_eq!(outcome.marked, MarkedRead::All { count: 11 });
        assert_eq!(opener.opened(), vec![articles[0].link.clone()]);
    }

    #[tokio::test]
    async fn read_button_falls_back_to_home_when_article_is_gone() {
        let articles = mock_articles();
        let storage =
            storage_with(&articles, Some(NotificationMarker::Multi { last_id: -5 })).await;
        let opener = RecordingLinkOpener::default();

        NotificationActions::new(&storage, &opener, HOME)
            .button_clicked(READ_BUTTON)
            .await
            .expect("button");

        assert_eq!(opener.opened(), vec![HOME.to_string()]);
    }

    #[tokio::test]
    async fn mark_all_button_without_marker_reads_everything() {
        let storage = storage_with(&mock_articles(), None).await;
        let opener = RecordingLinkOpener::default();

        let outcome = NotificationActions::new(&storage, &opener, HOME)
            .button_clicked(1)
            .await
            .expect("button");

        assert_eq!(outcome.marked, MarkedRead::All { count: 11 });
        assert!(opener.opened().is_empty());
    }

    #[tokio::test]
    async fn single_marker_for_removed_article_is_a_noop_read() {
        let articles = mock_articles();
        let mut gone = articles[0].clone();
        gone.id = 1;
        let storage = storage_with(
            &articles,
            Some(NotificationMarker::Single {
                last_id: gone.id,
                article: gone.clone(),
            }),
        )
        .await;
        let opener = RecordingLinkOpener::default();

        let outcome = NotificationActions::new(&storage, &opener, HOME)
            .clicked()
            .await
            .expect("click");

        assert_eq!(outcome.marked, MarkedRead::One { id: 1, found: false });
        assert_eq!(unread_ids(&storage.articles().await.expect("articles")).len(), 11);
    }
}
