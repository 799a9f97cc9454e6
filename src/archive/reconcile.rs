use std::cmp::Reverse;
use std::collections::HashMap;

use super::{Archive, Article, ContentBatch, Source};

/// Maximum number of articles kept in the archive.
pub const MAX_ARCHIVE_ARTICLES: usize = 500;
/// Maximum number of citation sources kept in the archive.
pub const MAX_ARCHIVE_SOURCES: usize = 100;

/// Size caps applied at the end of every reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveLimits {
    pub max_articles: usize,
    pub max_sources: usize,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_articles: MAX_ARCHIVE_ARTICLES,
            max_sources: MAX_ARCHIVE_SOURCES,
        }
    }
}

/// Insertion-ordered article set keyed by normalized title.
///
/// Replacing an entry keeps its original position, so ties in the final
/// date sort resolve by first appearance.
#[derive(Default)]
struct ArticleSet {
    entries: Vec<Article>,
    index: HashMap<String, usize>,
}

impl ArticleSet {
    /// Insert when the key is new; replace only when `content` is strictly longer.
    fn merge(&mut self, article: &Article) {
        let key = article.key();
        match self.index.get(&key) {
            Some(&pos) => {
                if article.content.len() > self.entries[pos].content.len() {
                    self.entries[pos] = canonical(article);
                }
            }
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(canonical(article));
            }
        }
    }

    fn into_sorted(self, limit: usize) -> Vec<Article> {
        let mut dated: Vec<(i64, Article)> = self
            .entries
            .into_iter()
            .map(|a| (a.published_ms(), a))
            .collect();
        // sort_by_key is stable: equal dates keep insertion order
        dated.sort_by_key(|(ms, _)| Reverse(*ms));
        dated.truncate(limit);
        dated.into_iter().map(|(_, a)| a).collect()
    }
}

/// Insertion-ordered source set keyed by exact uri, last write wins.
#[derive(Default)]
struct SourceSet {
    entries: Vec<Source>,
    index: HashMap<String, usize>,
}

impl SourceSet {
    fn merge(&mut self, source: &Source) {
        match self.index.get(&source.uri) {
            Some(&pos) => self.entries[pos] = source.clone(),
            None => {
                self.index.insert(source.uri.clone(), self.entries.len());
                self.entries.push(source.clone());
            }
        }
    }

    fn into_capped(mut self, limit: usize) -> Vec<Source> {
        self.entries.truncate(limit);
        self.entries
    }
}

fn canonical(article: &Article) -> Article {
    Article {
        category: article.category.to_uppercase(),
        ..article.clone()
    }
}

/// Merge the seed catalog, the cached archive, and an optional fresh batch.
///
/// Precedence is seed < cache < fresh: each layer is merged in that order
/// under the longer-content-wins rule. Articles are re-sorted newest first
/// and both collections are capped by `limits`.
///
/// `last_updated` comes from the fresh batch, then the cached archive, then
/// `today`.
pub fn reconcile(
    cached: Option<&Archive>,
    seed: &[Article],
    fresh: Option<&ContentBatch>,
    limits: &ArchiveLimits,
    today: &str,
) -> Archive {
    let mut articles = ArticleSet::default();
    let mut sources = SourceSet::default();

    for article in seed {
        articles.merge(article);
    }

    if let Some(archive) = cached {
        archive.articles.iter().for_each(|a| articles.merge(a));
        archive.sources.iter().for_each(|s| sources.merge(s));
    }

    if let Some(batch) = fresh {
        batch.articles.iter().for_each(|a| articles.merge(a));
        batch.sources.iter().for_each(|s| sources.merge(s));
    }

    let last_updated = fresh
        .and_then(|b| b.last_updated.as_deref())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            cached
                .map(|a| a.last_updated.as_str())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or(today)
        .to_owned();

    Archive {
        articles: articles.into_sorted(limits.max_articles),
        sources: sources.into_capped(limits.max_sources),
        last_updated,
    }
}
