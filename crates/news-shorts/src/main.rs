use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use shared::{Config, HaltReason, Pipeline, RunOutcome};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "news-shorts")]
#[command(about = "Turn the freshest unpublished news article into a short narrated video")]
struct Args {
    /// Feed URL, http(s) or file:// (overrides RSS_URL)
    #[arg(short, long)]
    feed_url: Option<String>,

    /// File remembering published articles (overrides MEMORY_FILE)
    #[arg(short, long)]
    memory_file: Option<PathBuf>,

    /// Skip articles older than this many hours (overrides MAX_RSS_AGE_HOURS)
    #[arg(long)]
    max_age_hours: Option<f64>,

    /// Skip articles shorter than this many words (overrides MIN_ARTICLE_WORD_COUNT)
    #[arg(long)]
    min_words: Option<usize>,
}

impl Args {
    fn lookup(&self, key: &str) -> Option<String> {
        match key {
            "RSS_URL" => self.feed_url.clone(),
            "MEMORY_FILE" => self.memory_file.as_ref().map(|p| p.display().to_string()),
            "MAX_RSS_AGE_HOURS" => self.max_age_hours.map(|h| h.to_string()),
            "MIN_ARTICLE_WORD_COUNT" => self.min_words.map(|n| n.to_string()),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    shared::logging::init("info");

    execute(Config::from_env(|key| args.lookup(key))).await;
}

/// One run with whatever configuration could be assembled. Setup problems
/// are reported like any other outcome and never fail the process.
async fn execute(config: Result<Config>) -> Option<RunOutcome> {
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {:#}", e);
            println!("❌ Configuration error: {:#}", e);
            return None;
        }
    };

    let pipeline = match Pipeline::from_config(&config).context("Failed to set up the feed client") {
        Ok(pipeline) => pipeline,
        Err(e) => {
            tracing::error!("{:#}", e);
            println!("❌ {:#}", e);
            return None;
        }
    };

    let outcome = pipeline.run_once(Utc::now()).await;
    report(&outcome, &config);
    Some(outcome)
}

fn report(outcome: &RunOutcome, config: &Config) {
    match outcome {
        RunOutcome::NoCandidate => {
            let hours = config.selection.max_age.num_minutes() as f64 / 60.0;
            println!("✅ No new articles found from the last {} hours.", hours);
        }
        RunOutcome::Halted {
            title,
            stage,
            reason,
            ..
        } => {
            println!("⭐ Picked: \"{}\"", title);
            match reason {
                HaltReason::NotConfigured => {
                    println!("⚠ Stopped at {}: not configured. The article stays eligible.", stage)
                }
                HaltReason::Failed(why) => {
                    println!("❌ Stopped at {}: {}. The article stays eligible.", stage, why)
                }
            }
        }
        RunOutcome::Published { title, video, .. } => {
            println!("⭐ Picked: \"{}\"", title);
            println!("✅ Video ready at {}", video.display());
            println!("✅ \"{}\" added to video memory.", title);
        }
        RunOutcome::NotRecorded {
            title,
            video,
            error,
            ..
        } => {
            println!("⭐ Picked: \"{}\"", title);
            println!("✅ Video ready at {}", video.display());
            println!("❌ Could not update video memory: {}", error);
        }
    }
}
