//! Command handlers for the cityq CLI.

pub mod ask;
pub mod chat;
pub mod index;
pub mod route;
pub mod seed;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use index::IndexCommand;
pub use route::RouteCommand;
pub use seed::SeedCommand;

use cityq_core::AppResult;
use cityq_router::{ToolDetail, ToolOutcome};

/// What to print besides the answer text.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub show_query: bool,
    pub show_sources: bool,
}

/// Human-readable rendering of one tool outcome.
pub fn render_outcome(outcome: &ToolOutcome, options: RenderOptions) -> String {
    let mut out = outcome.text();

    let ToolOutcome::Answered(output) = outcome else {
        return out;
    };

    match &output.detail {
        ToolDetail::Sql { query, row_count } if options.show_query => {
            out.push_str(&format!("\n\nSQL: {}\nRows: {}", query, row_count));
        }
        ToolDetail::Sources { sources } if options.show_sources => {
            if sources.is_empty() {
                out.push_str("\n\nSources: (none)");
            } else {
                out.push_str("\n\nSources:");
                for source in sources {
                    out.push_str(&format!("\n- {} ({})", source.source, source.location));
                }
            }
        }
        _ => {}
    }

    out
}

pub fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
