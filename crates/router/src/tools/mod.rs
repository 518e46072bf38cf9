//! Tool adapters over the two answering backends.

pub mod semantic;
pub mod sql;

pub use semantic::SemanticTool;
pub use sql::SqlTool;
