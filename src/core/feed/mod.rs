pub mod entities;
pub mod fetcher;
pub mod parser;
pub mod types;

use std::collections::HashMap;

use tracing::{debug, error, info};

use crate::core::storage::{Article, Storage, StorageError};
use fetcher::{FeedClient, FetchError, FetchStatus};
use parser::{parse_feed_bytes, FeedParseError};
use types::ParsedArticle;

pub use entities::decode_html_entities;

#[derive(Debug, Clone, Default)]
pub struct FeedService;

impl FeedService {
    pub fn name(&self) -> &'static str {
        "feed"
    }

    pub fn status(&self) -> &'static str {
        "ready"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] FeedParseError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Updated { total: usize, new: usize },
    NotModified,
    Failed,
}

/// Rebuilds the stored collection from a fresh fetch. Articles that were
/// already known keep their read flag; new ones start unread. The result is
/// sorted newest first.
pub fn merge_articles(existing: &[Article], fetched: Vec<ParsedArticle>) -> Vec<Article> {
    let known: HashMap<i64, bool> = existing
        .iter()
        .map(|article| (article.id, article.unread))
        .collect();
    let mut merged: Vec<Article> = fetched
        .into_iter()
        .map(|parsed| Article {
            unread: known.get(&parsed.id).copied().unwrap_or(true),
            id: parsed.id,
            date: parsed.date,
            title: parsed.title,
            link: parsed.link,
            thumbnail: parsed.thumbnail,
        })
        .collect();
    merged.sort_by(|a, b| b.date.cmp(&a.date));
    merged
}

/// Fetches the feed and merges it into storage. Failures are logged and
/// reported as [`RefreshOutcome::Failed`]; the stored collection is left as
/// it was so notifications keep working from the last good copy.
pub async fn refresh_articles(client: &FeedClient, storage: &Storage) -> RefreshOutcome {
    match try_refresh_articles(client, storage).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(url = client.url(), error = %err, "error while fetching articles");
            RefreshOutcome::Failed
        }
    }
}

async fn try_refresh_articles(
    client: &FeedClient,
    storage: &Storage,
) -> Result<RefreshOutcome, RefreshError> {
    let validators = storage.feed_validators().await?;
    let fetched = match client.fetch(&validators).await? {
        FetchStatus::NotModified => {
            debug!(url = client.url(), "feed not modified");
            return Ok(RefreshOutcome::NotModified);
        }
        FetchStatus::Updated(fetched) => fetched,
    };
    let parsed = parse_feed_bytes(&fetched.body)?;

    let (total, new) = storage
        .update_articles(move |articles| {
            let before = articles.len();
            let merged = merge_articles(articles, parsed.articles);
            let new = merged
                .iter()
                .filter(|article| !articles.iter().any(|known| known.id == article.id))
                .count();
            *articles = merged;
            debug!(before, after = articles.len(), "merged feed into stored articles");
            (articles.len(), new)
        })
        .await?;
    storage.set_feed_validators(&fetched.validators).await?;

    info!(total, new, "articles refreshed");
    Ok(RefreshOutcome::Updated { total, new })
}
