//! Archive data model and reconciliation.
//!
//! - [`reconcile`] - Pure merge of seed, cached, and fresh content into a new [`Archive`]
//! - [`seed`] - Bundled baseline articles available with zero network dependency
//! - [`dates`] - Lenient parsing of human-readable article dates for ordering
//!
//! Serialized field names stay camelCase (`sourceUrl`, `lastUpdated`) so
//! archive blobs written by earlier versions keep loading.

mod dates;
mod reconcile;
mod seed;

pub use dates::parse_display_date;
pub use reconcile::{reconcile, ArchiveLimits, MAX_ARCHIVE_ARTICLES, MAX_ARCHIVE_SOURCES};
pub use seed::seed_catalog;

use serde::{Deserialize, Serialize};
use url::Url;

/// Category name that disables filtering.
pub const ALL_CATEGORIES: &str = "ALL";

/// Number of tags shown alongside an article.
const DISPLAY_TAG_LIMIT: usize = 3;

/// Placeholder host when an article's source URL cannot be parsed.
const UNKNOWN_HOST: &str = "news-source";

/// Normalize an article title into its identity key (trim + lowercase).
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// A single news article.
///
/// Only `title` and `content` are required on the wire; the display fields
/// default to empty so one sparse item does not reject a whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub source_url: String,
    /// Human-readable date; see [`parse_display_date`].
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Article {
    /// Identity key used for deduplication.
    pub fn key(&self) -> String {
        normalize_title(&self.title)
    }

    /// Publication time in epoch milliseconds, 0 when the date is unparsable.
    pub fn published_ms(&self) -> i64 {
        parse_display_date(&self.date).unwrap_or(0)
    }

    /// Hostname of the source URL without a leading `www.`.
    ///
    /// Scheme-less URLs are treated as `https://`.
    pub fn source_host(&self) -> String {
        let raw = self.source_url.trim();
        let candidate = if raw.starts_with("http") {
            raw.to_owned()
        } else {
            format!("https://{raw}")
        };

        match Url::parse(&candidate) {
            Ok(url) => match url.host_str() {
                Some(host) => host.strip_prefix("www.").unwrap_or(host).to_owned(),
                None => UNKNOWN_HOST.to_owned(),
            },
            Err(_) => {
                tracing::debug!(title = %self.title, "Unparsable source URL for article");
                UNKNOWN_HOST.to_owned()
            }
        }
    }

    /// True when the source URL is a search placeholder rather than a verified link.
    pub fn is_fallback_link(&self) -> bool {
        self.source_url.contains("google.com/search")
    }

    /// First few tags, each rendered with a leading `#`.
    pub fn display_tags(&self) -> Vec<String> {
        self.tags
            .iter()
            .take(DISPLAY_TAG_LIMIT)
            .map(|tag| {
                if tag.starts_with('#') {
                    tag.clone()
                } else {
                    format!("#{tag}")
                }
            })
            .collect()
    }
}

/// A citation source attached to fetched content. Identity is the exact `uri`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

/// The persisted aggregate: ordered articles, bounded sources, and a display stamp.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Archive {
    pub articles: Vec<Article>,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub last_updated: String,
}

impl Archive {
    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Articles matching a category; [`ALL_CATEGORIES`] matches everything.
    ///
    /// Comparison is case-insensitive so stale lower-case categories still match.
    pub fn filter_by_category<'a>(&'a self, category: &str) -> Vec<&'a Article> {
        if category.eq_ignore_ascii_case(ALL_CATEGORIES) {
            return self.articles.iter().collect();
        }
        let wanted = category.to_uppercase();
        self.articles
            .iter()
            .filter(|a| a.category.to_uppercase() == wanted)
            .collect()
    }

    /// Article at a display position.
    pub fn article(&self, index: usize) -> Option<&Article> {
        self.articles.get(index)
    }
}

/// A batch returned by the Feed Client.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBatch {
    #[serde(default)]
    pub articles: Vec<Article>,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl ContentBatch {
    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}
