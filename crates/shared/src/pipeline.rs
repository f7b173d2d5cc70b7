//! One pass of the generator: pick an article, narrate it, cut the video,
//! publish it, remember it.
//!
//! Every step that comes back empty ends the run quietly. Memory is only
//! updated after the last step succeeds, so an article that fell through
//! stays eligible for the next run.

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;

use crate::config::{Config, FeedLocation};
use crate::error::FeedError;
use crate::feed::{FeedSource, FileFeedSource, HttpFeedSource};
use crate::memory::{load_published, save_published};
use crate::models::ServiceOutcome;
use crate::narration::{Narrator, SpeechKitNarrator};
use crate::publish::Publisher;
use crate::selector::ArticleSelector;
use crate::video::{PlaceholderAssembler, VideoAssembler, VideoRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Narration,
    Video,
    Publishing(String),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Narration => write!(f, "narration"),
            Stage::Video => write!(f, "video assembly"),
            Stage::Publishing(name) => write!(f, "publishing to {}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    NotConfigured,
    Failed(String),
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltReason::NotConfigured => write!(f, "not configured"),
            HaltReason::Failed(reason) => write!(f, "{}", reason),
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing new, fresh and long enough in the feed.
    NoCandidate,
    /// A step came back empty; the article was not recorded.
    Halted {
        title: String,
        hash: String,
        stage: Stage,
        reason: HaltReason,
    },
    Published {
        title: String,
        hash: String,
        video: PathBuf,
    },
    /// Published, but the memory file could not be written.
    NotRecorded {
        title: String,
        hash: String,
        video: PathBuf,
        error: String,
    },
}

fn ready<T>(outcome: ServiceOutcome<T>) -> Result<T, HaltReason> {
    match outcome {
        ServiceOutcome::Ready(value) => Ok(value),
        ServiceOutcome::NotConfigured => Err(HaltReason::NotConfigured),
        ServiceOutcome::Failed(reason) => Err(HaltReason::Failed(reason)),
    }
}

pub struct Pipeline {
    feed: Box<dyn FeedSource>,
    selector: ArticleSelector,
    narrator: Box<dyn Narrator>,
    assembler: Box<dyn VideoAssembler>,
    publishers: Vec<Box<dyn Publisher>>,
    memory_file: PathBuf,
}

impl Pipeline {
    pub fn new(
        feed: Box<dyn FeedSource>,
        selector: ArticleSelector,
        narrator: Box<dyn Narrator>,
        assembler: Box<dyn VideoAssembler>,
        memory_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            feed,
            selector,
            narrator,
            assembler,
            publishers: Vec::new(),
            memory_file: memory_file.into(),
        }
    }

    /// The stock pipeline: SpeechKit narration and the placeholder renderer.
    pub fn from_config(config: &Config) -> Result<Self, FeedError> {
        let feed: Box<dyn FeedSource> = match &config.feed {
            FeedLocation::Http(url) => Box::new(HttpFeedSource::new(url, config.fetch_timeout)?),
            FeedLocation::File(path) => Box::new(FileFeedSource::new(path)),
        };

        Ok(Self::new(
            feed,
            ArticleSelector::new(config.selection.clone()),
            Box::new(SpeechKitNarrator::new(
                config.speech.clone(),
                config.output_dir.clone(),
            )),
            Box::new(PlaceholderAssembler::new(config.output_dir.clone())),
            config.memory_file.clone(),
        ))
    }

    pub fn with_publisher(mut self, publisher: Box<dyn Publisher>) -> Self {
        self.publishers.push(publisher);
        self
    }

    pub async fn run_once(&self, now: DateTime<Utc>) -> RunOutcome {
        let mut published = load_published(&self.memory_file);
        tracing::info!("Started. {} published videos in memory", published.len());

        let Some(candidate) = self
            .selector
            .find_candidate(self.feed.as_ref(), &published, now)
            .await
        else {
            tracing::info!("No new articles found");
            return RunOutcome::NoCandidate;
        };

        tracing::info!("Selected article: {:?}", candidate.title);

        let halt = |stage: Stage, reason: HaltReason| {
            tracing::info!(
                "Stopping at {} for {:?}: {}",
                stage,
                candidate.title,
                reason
            );
            RunOutcome::Halted {
                title: candidate.title.clone(),
                hash: candidate.hash.clone(),
                stage,
                reason,
            }
        };

        let narration = match ready(self.narrator.narrate(&candidate.text, &candidate.hash).await)
        {
            Ok(narration) => narration,
            Err(reason) => return halt(Stage::Narration, reason),
        };

        let request = VideoRequest {
            title: &candidate.title,
            text: &candidate.text,
            image_url: candidate.image_url.as_deref(),
            article_hash: &candidate.hash,
            narration: &narration,
        };
        let video = match ready(self.assembler.assemble(request).await) {
            Ok(video) => video,
            Err(reason) => return halt(Stage::Video, reason),
        };

        for publisher in &self.publishers {
            if let Err(reason) = ready(publisher.publish(&video, &candidate.title).await) {
                return halt(Stage::Publishing(publisher.name().to_string()), reason);
            }
            tracing::info!("Published to {}", publisher.name());
        }

        published.insert(candidate.hash.clone());
        if let Err(e) = save_published(&self.memory_file, &published) {
            tracing::error!("Could not record published article: {}", e);
            return RunOutcome::NotRecorded {
                title: candidate.title,
                hash: candidate.hash,
                video,
                error: e.to_string(),
            };
        }

        tracing::info!("Article {:?} added to video memory", candidate.title);
        RunOutcome::Published {
            title: candidate.title,
            hash: candidate.hash,
            video,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SelectionRules, SpeechCredentials};
    use crate::memory::PublishedSet;
    use crate::models::{Narration, WordTiming};
    use crate::selector::title_hash;
    use crate::test_support::{refused_url, serve};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::path::Path;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    fn write_feed(dir: &Path, title: &str) -> PathBuf {
        let pub_date = (now() - Duration::minutes(10))
            .format("%a, %d %b %Y %H:%M:%S GMT")
            .to_string();
        let body = vec!["слово"; 60].join(" ");
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:yandex="http://news.yandex.ru">
  <channel>
    <title>News</title>
    <item>
      <title>{title}</title>
      <pubDate>{pub_date}</pubDate>
      <enclosure url="https://img.example.com/t.jpg" type="image/jpeg"/>
      <yandex:full-text>{body}</yandex:full-text>
    </item>
  </channel>
</rss>"#
        );

        let path = dir.join("feed.xml");
        std::fs::write(&path, xml).unwrap();
        path
    }

    struct ReadyNarrator;

    #[async_trait]
    impl Narrator for ReadyNarrator {
        async fn narrate(&self, _text: &str, article_hash: &str) -> ServiceOutcome<Narration> {
            ServiceOutcome::Ready(Narration {
                audio_path: PathBuf::from(format!("audio_{}.mp3", article_hash)),
                timings: vec![WordTiming::new("слово", 0.0, 0.5)],
            })
        }
    }

    struct FailingPublisher;

    #[async_trait]
    impl Publisher for FailingPublisher {
        fn name(&self) -> &str {
            "nowhere"
        }

        async fn publish(&self, _video: &Path, _title: &str) -> ServiceOutcome<()> {
            ServiceOutcome::Failed("upload rejected".to_string())
        }
    }

    fn pipeline(dir: &Path, narrator: Box<dyn Narrator>) -> Pipeline {
        Pipeline::new(
            Box::new(FileFeedSource::new(write_feed(dir, "T"))),
            ArticleSelector::new(SelectionRules::default()),
            narrator,
            Box::new(PlaceholderAssembler::new(dir.join("out"))),
            dir.join("memory.json"),
        )
    }

    fn unconfigured_narrator(dir: &Path) -> Box<dyn Narrator> {
        Box::new(SpeechKitNarrator::new(
            SpeechCredentials::default(),
            dir.join("out"),
        ))
    }

    #[tokio::test]
    async fn test_unavailable_narration_leaves_memory_untouched() {
        let dir = TempDir::new().unwrap();
        let memory_file = dir.path().join("memory.json");
        let pipeline = pipeline(dir.path(), unconfigured_narrator(dir.path()));

        let outcome = pipeline.run_once(now()).await;

        assert_eq!(
            outcome,
            RunOutcome::Halted {
                title: "T".to_string(),
                hash: title_hash("T"),
                stage: Stage::Narration,
                reason: HaltReason::NotConfigured,
            }
        );
        assert!(!memory_file.exists());
        assert!(load_published(&memory_file).is_empty());
    }

    #[tokio::test]
    async fn test_already_published_article_is_not_picked() {
        let dir = TempDir::new().unwrap();
        let memory_file = dir.path().join("memory.json");
        let seen: PublishedSet = [title_hash("T")].into_iter().collect();
        save_published(&memory_file, &seen).unwrap();

        let pipeline = pipeline(dir.path(), Box::new(ReadyNarrator));
        assert_eq!(pipeline.run_once(now()).await, RunOutcome::NoCandidate);
        assert_eq!(load_published(&memory_file), seen);
    }

    #[tokio::test]
    async fn test_successful_run_records_hash_once() {
        let dir = TempDir::new().unwrap();
        let memory_file = dir.path().join("memory.json");
        let pipeline = pipeline(dir.path(), Box::new(ReadyNarrator));

        let outcome = pipeline.run_once(now()).await;
        let hash = title_hash("T");
        assert_eq!(
            outcome,
            RunOutcome::Published {
                title: "T".to_string(),
                hash: hash.clone(),
                video: dir.path().join("out").join(format!("video_{}.mp4", hash)),
            }
        );
        assert!(load_published(&memory_file).contains(&hash));

        // Second run finds nothing new
        assert_eq!(pipeline.run_once(now()).await, RunOutcome::NoCandidate);
        assert_eq!(load_published(&memory_file).len(), 1);
    }

    #[tokio::test]
    async fn test_publisher_failure_halts_before_memory_update() {
        let dir = TempDir::new().unwrap();
        let memory_file = dir.path().join("memory.json");
        let pipeline =
            pipeline(dir.path(), Box::new(ReadyNarrator)).with_publisher(Box::new(FailingPublisher));

        let outcome = pipeline.run_once(now()).await;
        assert!(matches!(
            outcome,
            RunOutcome::Halted {
                stage: Stage::Publishing(ref name),
                reason: HaltReason::Failed(_),
                ..
            } if name == "nowhere"
        ));
        assert!(!memory_file.exists());
    }

    #[tokio::test]
    async fn test_unreachable_feed_is_no_candidate() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(
            Box::new(FileFeedSource::new(dir.path().join("missing.xml"))),
            ArticleSelector::new(SelectionRules::default()),
            Box::new(ReadyNarrator),
            Box::new(PlaceholderAssembler::new(dir.path().join("out"))),
            dir.path().join("memory.json"),
        );

        assert_eq!(pipeline.run_once(now()).await, RunOutcome::NoCandidate);
    }

    fn http_pipeline(dir: &Path, url: &str) -> Pipeline {
        Pipeline::new(
            Box::new(HttpFeedSource::new(url, std::time::Duration::from_secs(5)).unwrap()),
            ArticleSelector::new(SelectionRules::default()),
            Box::new(ReadyNarrator),
            Box::new(PlaceholderAssembler::new(dir.join("out"))),
            dir.join("memory.json"),
        )
    }

    #[tokio::test]
    async fn test_feed_server_error_is_no_candidate() {
        let dir = TempDir::new().unwrap();
        let url = serve("500 Internal Server Error", "").await;

        let pipeline = http_pipeline(dir.path(), &url);
        assert_eq!(pipeline.run_once(now()).await, RunOutcome::NoCandidate);
        assert!(!dir.path().join("memory.json").exists());
    }

    #[tokio::test]
    async fn test_refused_feed_connection_is_no_candidate() {
        let dir = TempDir::new().unwrap();
        let url = refused_url().await;

        let pipeline = http_pipeline(dir.path(), &url);
        assert_eq!(pipeline.run_once(now()).await, RunOutcome::NoCandidate);
    }

    #[tokio::test]
    async fn test_stock_pipeline_without_credentials() {
        let dir = TempDir::new().unwrap();
        let feed_path = write_feed(dir.path(), "T");
        let feed_url = url::Url::from_file_path(&feed_path).unwrap().to_string();
        let memory_file = dir.path().join("memory.json").display().to_string();
        let output_dir = dir.path().join("out").display().to_string();

        let config = Config::from_lookup(|key| match key {
            "RSS_URL" => Some(feed_url.clone()),
            "MEMORY_FILE" => Some(memory_file.clone()),
            "OUTPUT_DIR" => Some(output_dir.clone()),
            _ => None,
        })
        .unwrap();

        let pipeline = Pipeline::from_config(&config).unwrap();
        assert!(matches!(
            pipeline.run_once(now()).await,
            RunOutcome::Halted {
                stage: Stage::Narration,
                reason: HaltReason::NotConfigured,
                ..
            }
        ));
        assert!(load_published(&config.memory_file).is_empty());
    }

    #[tokio::test]
    async fn test_unwritable_memory_is_reported() {
        let dir = TempDir::new().unwrap();
        // A directory where the memory file should be
        let memory_dir = dir.path().join("memory.json");
        std::fs::create_dir(&memory_dir).unwrap();

        let pipeline = pipeline(dir.path(), Box::new(ReadyNarrator));
        assert!(matches!(
            pipeline.run_once(now()).await,
            RunOutcome::NotRecorded { .. }
        ));
    }
}
