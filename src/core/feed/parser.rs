use feed_rs::model::Entry;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::types::{FeedFormat, ParsedArticle, ParsedFeed};

#[derive(Debug, thiserror::Error)]
pub enum FeedParseError {
    #[error("feed payload is empty")]
    EmptyPayload,
    #[error("xml feed parse error: {0}")]
    Xml(#[from] feed_rs::parser::ParseFeedError),
    #[error("json feed parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("json object is not a JSON Feed (version `{0}`)")]
    NotAJsonFeed(String),
}

const JSON_FEED_VERSION_PREFIX: &str = "https://jsonfeed.org/version/";

/// One post from the WordPress REST API (`/wp-json/wp/v2/posts?_embed`).
#[derive(Debug, Clone, Deserialize)]
struct WpPost {
    id: i64,
    date_gmt: String,
    link: String,
    title: WpRendered,
    #[serde(default, rename = "_embedded")]
    embedded: Option<WpEmbedded>,
}

#[derive(Debug, Clone, Deserialize)]
struct WpRendered {
    rendered: String,
}

#[derive(Debug, Clone, Deserialize)]
struct WpEmbedded {
    #[serde(default, rename = "wp:featuredmedia")]
    featured_media: Vec<WpMedia>,
}

#[derive(Debug, Clone, Deserialize)]
struct WpMedia {
    media_details: Option<WpMediaDetails>,
}

#[derive(Debug, Clone, Deserialize)]
struct WpMediaDetails {
    sizes: Option<WpMediaSizes>,
}

#[derive(Debug, Clone, Deserialize)]
struct WpMediaSizes {
    thumbnail: Option<WpMediaSize>,
}

#[derive(Debug, Clone, Deserialize)]
struct WpMediaSize {
    source_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct JsonFeed {
    #[serde(default)]
    version: String,
    items: Vec<JsonFeedItem>,
}

#[derive(Debug, Clone, Deserialize)]
struct JsonFeedItem {
    id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    image: Option<String>,
    date_published: Option<String>,
    date_modified: Option<String>,
}

/// Detects the payload flavour and parses it. A top-level JSON array is a
/// WordPress REST response, a JSON object is a JSON Feed, anything else goes
/// through the RSS/Atom parser.
pub fn parse_feed_bytes(raw: &[u8]) -> Result<ParsedFeed, FeedParseError> {
    let trimmed = raw.trim_ascii_start();
    if trimmed.is_empty() {
        return Err(FeedParseError::EmptyPayload);
    }
    match trimmed[0] {
        b'[' => parse_wordpress_posts(trimmed),
        b'{' => parse_json_feed(trimmed),
        _ => parse_xml_feed(trimmed),
    }
}

/// Maps a feed-provided identifier to the stable integer id articles are
/// keyed by. Numeric ids are kept as-is; anything else is hashed.
pub fn article_id_from_guid(guid: &str) -> i64 {
    let guid = guid.trim();
    if let Ok(id) = guid.parse::<i64>() {
        return id;
    }
    let digest = Sha256::digest(guid.as_bytes());
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(bytes) & i64::MAX as u64) as i64
}

fn parse_wordpress_posts(raw: &[u8]) -> Result<ParsedFeed, FeedParseError> {
    let posts: Vec<WpPost> = serde_json::from_slice(raw)?;
    let articles = posts
        .into_iter()
        .map(|post| {
            let thumbnail = post
                .embedded
                .and_then(|embedded| embedded.featured_media.into_iter().next())
                .and_then(|media| media.media_details)
                .and_then(|details| details.sizes)
                .and_then(|sizes| sizes.thumbnail)
                .and_then(|size| size.source_url)
                .filter(|url| !url.trim().is_empty());
            ParsedArticle {
                id: post.id,
                date: post.date_gmt,
                title: post.title.rendered,
                link: post.link,
                thumbnail,
            }
        })
        .collect();

    Ok(ParsedFeed {
        format: FeedFormat::WordPressJson,
        articles,
    })
}

/// Any other JSON object (an API error body, a proxy page) is an error so
/// the stored articles survive it.
fn parse_json_feed(raw: &[u8]) -> Result<ParsedFeed, FeedParseError> {
    let feed: JsonFeed = serde_json::from_slice(raw)?;
    if !feed.version.starts_with(JSON_FEED_VERSION_PREFIX) {
        return Err(FeedParseError::NotAJsonFeed(feed.version));
    }
    let articles = feed
        .items
        .into_iter()
        .filter_map(|item| {
            let date = item
                .date_published
                .or(item.date_modified)
                .unwrap_or_default();
            let guid = non_blank(item.id.as_deref())
                .or_else(|| non_blank(item.url.as_deref()))
                .map(str::to_string)
                .or_else(|| content_guid(item.title.as_deref().unwrap_or_default(), &date))?;
            Some(ParsedArticle {
                id: article_id_from_guid(&guid),
                date,
                title: item.title.unwrap_or_else(|| "Untitled Entry".to_string()),
                link: item.url.unwrap_or_default(),
                thumbnail: item.image,
            })
        })
        .collect();

    Ok(ParsedFeed {
        format: FeedFormat::JsonFeed,
        articles,
    })
}

fn parse_xml_feed(raw: &[u8]) -> Result<ParsedFeed, FeedParseError> {
    let feed = feed_rs::parser::parse(raw)?;
    let articles = feed.entries.iter().filter_map(article_from_xml).collect();

    Ok(ParsedFeed {
        format: FeedFormat::XmlFeed,
        articles,
    })
}

fn article_from_xml(entry: &Entry) -> Option<ParsedArticle> {
    let link = entry
        .links
        .first()
        .map(|entry_link| entry_link.href.clone())
        .unwrap_or_default();
    let title = entry
        .title
        .as_ref()
        .map(|text| text.content.clone())
        .unwrap_or_else(|| "Untitled Entry".to_string());
    let date = entry
        .published
        .or(entry.updated)
        .map(|timestamp| timestamp.to_rfc3339())
        .unwrap_or_default();
    let thumbnail = entry
        .media
        .iter()
        .flat_map(|media| media.thumbnails.iter())
        .map(|thumbnail| thumbnail.image.uri.clone())
        .find(|uri| !uri.trim().is_empty());
    let guid = non_blank(Some(entry.id.as_str()))
        .or_else(|| non_blank(Some(link.as_str())))
        .map(str::to_string)
        .or_else(|| content_guid(&title, &date))?;

    Some(ParsedArticle {
        id: article_id_from_guid(&guid),
        date,
        title,
        link,
        thumbnail,
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

/// Identity for entries that carry neither an id nor a link. Entries with
/// no title and no date cannot be told apart and are skipped.
fn content_guid(title: &str, date: &str) -> Option<String> {
    if title.trim().is_empty() && date.trim().is_empty() {
        return None;
    }
    Some(format!("{}\n{}", title.trim(), date.trim()))
}
