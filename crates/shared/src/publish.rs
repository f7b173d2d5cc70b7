use async_trait::async_trait;
use std::path::Path;

use crate::models::ServiceOutcome;

/// A platform finished videos are posted to (YouTube Shorts, TikTok, ...).
///
/// No platform is wired up yet; the pipeline runs whatever publishers it is
/// given, in order.
#[async_trait]
pub trait Publisher: Send + Sync {
    fn name(&self) -> &str;

    async fn publish(&self, video: &Path, title: &str) -> ServiceOutcome<()>;
}
