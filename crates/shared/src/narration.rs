use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::config::SpeechCredentials;
use crate::models::{Narration, ServiceOutcome};

/// Turns article text into a voice track with per-word timings
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn narrate(&self, text: &str, article_hash: &str) -> ServiceOutcome<Narration>;
}

/// Yandex SpeechKit narration.
///
/// Synthesis itself is not wired up: with credentials present the request is
/// logged and reported as failed, without them narration is `NotConfigured`.
pub struct SpeechKitNarrator {
    credentials: SpeechCredentials,
    output_dir: PathBuf,
}

impl SpeechKitNarrator {
    pub fn new(credentials: SpeechCredentials, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            credentials,
            output_dir: output_dir.into(),
        }
    }

    /// Where the voice track for an article is written
    pub fn audio_path(&self, article_hash: &str) -> PathBuf {
        audio_path_in(&self.output_dir, article_hash)
    }
}

pub fn audio_path_in(output_dir: &Path, article_hash: &str) -> PathBuf {
    output_dir.join(format!("audio_{}.mp3", article_hash))
}

#[async_trait]
impl Narrator for SpeechKitNarrator {
    async fn narrate(&self, text: &str, article_hash: &str) -> ServiceOutcome<Narration> {
        if !self.credentials.is_complete() {
            tracing::warn!("Yandex Cloud credentials are not configured, no audio generated");
            return ServiceOutcome::NotConfigured;
        }

        tracing::info!(
            "Requesting SpeechKit synthesis of {} characters into {}",
            text.chars().count(),
            self.audio_path(article_hash).display()
        );

        ServiceOutcome::Failed("no speech synthesis backend is available".to_string())
    }
}
