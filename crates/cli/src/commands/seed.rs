//! Seed command handler.

use super::print_json;
use clap::Args;
use cityq_core::config::{AppConfig, SeedMode};
use cityq_core::AppResult;
use cityq_router::ConfiguredFactory;
use cityq_sql::{DatabaseTarget, TABLE_NAME};

/// Create the city table and write the six seed rows
#[derive(Args, Debug)]
pub struct SeedCommand {
    /// Plain insert; fails if any seed city is already present
    #[arg(long)]
    pub insert: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SeedCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let mode = if self.insert {
            SeedMode::Insert
        } else {
            config.database.seed_mode
        };
        tracing::info!(mode = ?mode, "Executing seed command");

        let store = ConfiguredFactory::new(config.clone()).open_store()?;
        if *store.target() == DatabaseTarget::Memory {
            tracing::warn!("City store is in memory; seeded rows last only for this run");
        }

        let written = store.migrate(mode)?;
        let total = store.count()?;

        if self.json {
            return print_json(&serde_json::json!({
                "table": TABLE_NAME,
                "mode": mode,
                "written": written,
                "total": total,
            }));
        }

        println!("Seeded {} rows into {} ({} total)", written, TABLE_NAME, total);
        Ok(())
    }
}
