use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::config::{SelectionRules, UndatedPolicy};
use crate::feed::FeedSource;
use crate::memory::PublishedSet;
use crate::models::{Candidate, FeedItem};

/// Lowercase hex SHA-256 of the title's UTF-8 bytes; the dedup key.
pub fn title_hash(title: &str) -> String {
    format!("{:x}", Sha256::digest(title.as_bytes()))
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Parse an RSS `pubDate` (RFC 2822, e.g. `Sun, 18 Oct 2026 10:00:00 GMT`).
///
/// Feeds often carry a weekday that disagrees with the date. The date and
/// time are what matter for aging, so a mismatched weekday is dropped and
/// the rest parsed again.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .ok()
        .or_else(|| {
            let (weekday, rest) = raw.split_once(',')?;
            if weekday.trim().is_empty() || !weekday.trim().chars().all(|c| c.is_ascii_alphabetic()) {
                return None;
            }
            DateTime::parse_from_rfc2822(rest.trim()).ok()
        })
        .map(|dt| dt.with_timezone(&Utc))
}

/// Why an item was passed over
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingTitle,
    MissingText,
    AlreadyPublished,
    TooOld,
    Undated,
    TooShort { words: usize },
}

#[derive(Debug, Clone)]
pub struct ArticleSelector {
    rules: SelectionRules,
}

impl ArticleSelector {
    pub fn new(rules: SelectionRules) -> Self {
        Self { rules }
    }

    /// Fetch the feed and pick the first qualifying article. A feed that
    /// cannot be fetched or parsed yields no candidate.
    pub async fn find_candidate(
        &self,
        source: &dyn FeedSource,
        published: &PublishedSet,
        now: DateTime<Utc>,
    ) -> Option<Candidate> {
        let items = match source.fetch().await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("Failed to load RSS feed from {}: {}", source.location(), e);
                return None;
            }
        };

        tracing::info!("Feed has {} items", items.len());
        self.choose(&items, published, now)
    }

    /// Pick the first item passing every filter, in feed order (or newest
    /// first when date sorting is enabled).
    pub fn choose(
        &self,
        items: &[FeedItem],
        published: &PublishedSet,
        now: DateTime<Utc>,
    ) -> Option<Candidate> {
        let mut ordered: Vec<&FeedItem> = items.iter().collect();
        if self.rules.sort_by_date {
            // Stable: ties and undated items keep feed order, undated last.
            ordered.sort_by_key(|item| {
                std::cmp::Reverse(item.pub_date.as_deref().and_then(parse_pub_date))
            });
        }

        for item in ordered {
            match self.evaluate(item, published, now) {
                Ok(candidate) => return Some(candidate),
                Err(reason) => {
                    tracing::debug!(
                        "Skipping {:?}: {:?}",
                        item.title.as_deref().unwrap_or("<untitled>"),
                        reason
                    );
                }
            }
        }

        None
    }

    /// Run one item through the filters.
    pub fn evaluate(
        &self,
        item: &FeedItem,
        published: &PublishedSet,
        now: DateTime<Utc>,
    ) -> Result<Candidate, SkipReason> {
        let title = item.title.as_deref().ok_or(SkipReason::MissingTitle)?;
        let text = item.full_text.as_deref().ok_or(SkipReason::MissingText)?;

        let hash = title_hash(title);
        if published.contains(&hash) {
            return Err(SkipReason::AlreadyPublished);
        }

        match item.pub_date.as_deref().and_then(parse_pub_date) {
            Some(published_at) => {
                if now - published_at > self.rules.max_age {
                    return Err(SkipReason::TooOld);
                }
            }
            None => match self.rules.undated {
                UndatedPolicy::Fresh => {}
                UndatedPolicy::Stale => return Err(SkipReason::TooOld),
                UndatedPolicy::Reject => return Err(SkipReason::Undated),
            },
        }

        let words = word_count(text);
        if words < self.rules.min_word_count {
            return Err(SkipReason::TooShort { words });
        }

        Ok(Candidate {
            title: title.to_string(),
            text: text.to_string(),
            image_url: item.image_url.clone(),
            hash,
        })
    }
}
