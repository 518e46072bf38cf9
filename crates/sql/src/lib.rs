//! Structured backend: city statistics in SQLite, queried in natural language.
//!
//! A question is translated to SQL by a language model, checked to be a
//! single read-only statement, executed locally, and the rows are returned
//! as the answer (optionally phrased as a sentence by a second model call).

pub mod engine;
pub mod guard;
pub mod records;
pub mod store;
pub mod translate;

pub use engine::{SqlAnswer, SqlEngine, NO_ROWS};
pub use guard::ensure_read_only;
pub use records::{CityRecord, SEED_CITIES, TABLE_NAME};
pub use store::{CityStore, DatabaseTarget, QueryRows};
pub use translate::SqlTranslator;
