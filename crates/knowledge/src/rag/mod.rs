//! Retrieval-augmented answering over the semantic index.

pub mod answer;
pub mod types;

pub use types::{RagResponse, RagSourceRef, CONFIDENCE_THRESHOLD};
