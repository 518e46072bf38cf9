//! Index command handler.

use super::print_json;
use clap::Args;
use cityq_core::{config::AppConfig, AppResult};
use cityq_knowledge::LearnOptions;
use cityq_router::ConfiguredFactory;
use std::path::PathBuf;

/// Seed the city descriptions and learn extra documents
#[derive(Args, Debug)]
pub struct IndexCommand {
    /// Files or directories to learn (markdown or plain text)
    #[arg(long)]
    pub path: Vec<PathBuf>,

    /// Only learn paths containing one of these substrings
    #[arg(long)]
    pub include: Vec<String>,

    /// Skip paths containing any of these substrings
    #[arg(long)]
    pub exclude: Vec<String>,

    /// City the learned documents describe (default: inferred from file name)
    #[arg(long)]
    pub city: Option<String>,

    /// Empty the index first
    #[arg(long)]
    pub reset: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index command");

        let factory = ConfiguredFactory::new(config.clone());
        let index = factory.open_index(factory.client()?)?;

        if self.reset {
            index.reset()?;
            tracing::info!("Index reset");
        }

        let seeded = index.seed_corpus().await?;

        let learned = if self.path.is_empty() {
            None
        } else {
            let mut options = LearnOptions::new(self.path.clone());
            options.include = self.include.clone();
            options.exclude = self.exclude.clone();
            options.city = self.city.clone();
            Some(index.learn(options).await?)
        };

        let stats = index.stats()?;

        if self.json {
            return print_json(&serde_json::json!({
                "path": index.path(),
                "seededDescriptions": seeded,
                "learn": learned,
                "sourcesCount": stats.sources_count,
                "chunksCount": stats.chunks_count,
                "dbSizeBytes": stats.db_size_bytes,
            }));
        }

        println!("Seeded {} city descriptions", seeded);
        if let Some(learned) = learned {
            println!(
                "Learned {} sources ({} chunks, {} bytes) in {:.2}s",
                learned.sources_count,
                learned.chunks_count,
                learned.bytes_processed,
                learned.duration_secs
            );
            for skipped in &learned.skipped {
                println!("  skipped {}: {}", skipped.path.display(), skipped.reason);
            }
        }
        println!("Index: {} sources, {} chunks", stats.sources_count, stats.chunks_count);

        Ok(())
    }
}
