// Public modules
pub mod config;
pub mod error;
pub mod feed;
pub mod logging;
pub mod memory;
pub mod models;
pub mod narration;
pub mod pipeline;
pub mod publish;
pub mod selector;
pub mod video;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::{Config, FeedLocation, SelectionRules, SpeechCredentials, UndatedPolicy};
pub use error::{FeedError, MemoryError};
pub use feed::{FeedSource, FileFeedSource, HttpFeedSource};
pub use memory::{default_memory_path, load_published, save_published, PublishedSet};
pub use models::{Candidate, FeedItem, Narration, ServiceOutcome, WordTiming};
pub use narration::{Narrator, SpeechKitNarrator};
pub use pipeline::{HaltReason, Pipeline, RunOutcome, Stage};
pub use publish::Publisher;
pub use selector::{title_hash, ArticleSelector};
pub use video::{PlaceholderAssembler, VideoAssembler, VideoRequest};
