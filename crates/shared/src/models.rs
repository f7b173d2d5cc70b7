use std::path::PathBuf;

/// One `<item>` of the feed, as parsed. Every field is optional here; the
/// selector decides what an item needs to be usable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    pub title: Option<String>,
    pub pub_date: Option<String>,
    pub full_text: Option<String>,
    pub image_url: Option<String>,
}

/// An article that passed every selection filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub title: String,
    pub text: String,
    pub image_url: Option<String>,
    pub hash: String,
}

/// When a spoken word occurs in a narration track, in seconds
#[derive(Debug, Clone, PartialEq)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

impl WordTiming {
    pub fn new(word: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            word: word.into(),
            start,
            end,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Narration {
    pub audio_path: PathBuf,
    pub timings: Vec<WordTiming>,
}

/// Result of asking an external collaborator (speech, video, publishing)
/// to do its part.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceOutcome<T> {
    Ready(T),
    /// Credentials or settings are absent; nothing was attempted.
    NotConfigured,
    Failed(String),
}

impl<T> ServiceOutcome<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, ServiceOutcome::Ready(_))
    }
}
