use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::models::{Narration, ServiceOutcome};

/// Everything needed to cut one short video
#[derive(Debug, Clone, Copy)]
pub struct VideoRequest<'a> {
    pub title: &'a str,
    pub text: &'a str,
    pub image_url: Option<&'a str>,
    pub article_hash: &'a str,
    pub narration: &'a Narration,
}

#[async_trait]
pub trait VideoAssembler: Send + Sync {
    async fn assemble(&self, request: VideoRequest<'_>) -> ServiceOutcome<PathBuf>;
}

/// Stands in for the renderer: checks its inputs and hands back the path the
/// finished video would be written to, without rendering anything.
pub struct PlaceholderAssembler {
    output_dir: PathBuf,
}

impl PlaceholderAssembler {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

pub fn video_path_in(output_dir: &Path, article_hash: &str) -> PathBuf {
    output_dir.join(format!("video_{}.mp4", article_hash))
}

#[async_trait]
impl VideoAssembler for PlaceholderAssembler {
    async fn assemble(&self, request: VideoRequest<'_>) -> ServiceOutcome<PathBuf> {
        let narration = request.narration;
        if narration.audio_path.as_os_str().is_empty() || narration.timings.is_empty() {
            tracing::warn!("No audio or word timings to build a video from");
            return ServiceOutcome::Failed("missing audio or word timings".to_string());
        }

        tracing::info!(
            "Building video for {:?} ({} timed words, image: {})",
            request.title,
            narration.timings.len(),
            request.image_url.unwrap_or("none")
        );

        let output_path = video_path_in(&self.output_dir, request.article_hash);
        tracing::info!("Video created: {}", output_path.display());
        ServiceOutcome::Ready(output_path)
    }
}
