//! Ask command handler.

use super::{print_json, render_outcome, RenderOptions};
use clap::Args;
use cityq_core::{config::AppConfig, AppResult};
use cityq_router::{ConfiguredFactory, RouterFactory};

/// Answer one question and exit
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Print the SQL that produced a structured answer
    #[arg(long)]
    pub show_query: bool,

    /// Print the passages behind a semantic answer
    #[arg(long)]
    pub show_sources: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let router = ConfiguredFactory::new(config.clone()).build().await?;
        let routed = router.route(&self.question).await?;

        tracing::debug!(
            "Answered by {} via {} strategy",
            routed.decision.tool_name,
            routed.decision.strategy
        );

        if self.json {
            return print_json(&routed);
        }

        let options = RenderOptions {
            show_query: self.show_query,
            show_sources: self.show_sources,
        };
        println!("{}", render_outcome(&routed.outcome, options));

        Ok(())
    }
}
