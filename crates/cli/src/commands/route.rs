//! Route command handler.

use super::print_json;
use clap::Args;
use cityq_core::{config::AppConfig, AppResult};
use cityq_router::{ConfiguredFactory, RouterFactory};

/// Show the routing decision without invoking the tool
#[derive(Args, Debug)]
pub struct RouteCommand {
    /// The question to route
    pub question: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RouteCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing route command");

        let router = ConfiguredFactory::new(config.clone()).build().await?;
        let decision = router.decide(&self.question).await?;

        if self.json {
            return print_json(&decision);
        }

        println!("Tool: {} ({})", decision.tool_name, decision.selected_backend);
        println!("Strategy: {}", decision.strategy);
        println!("Rationale: {}", decision.rationale);

        Ok(())
    }
}
