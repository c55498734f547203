use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum FeedFormat {
    WordPressJson,
    JsonFeed,
    XmlFeed,
}

/// An article as the feed publishes it, before local read state is attached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedArticle {
    pub id: i64,
    pub date: String,
    pub title: String,
    pub link: String,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedFeed {
    pub format: FeedFormat,
    pub articles: Vec<ParsedArticle>,
}
