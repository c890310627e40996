//! Hand-off to the downstream SQL generator.
//!
//! This crate does not write SQL itself. On a cache miss it renders an
//! instruction describing what the generator should produce, and the generated
//! statement comes back through the execute phase.

pub mod prompt;

use thiserror::Error;

pub use prompt::{GenerationSettings, InstructionBuilder};

#[derive(Debug, Error)]
pub enum InstructionError {
    #[error("instruction template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("sample data could not be encoded: {0}")]
    Encoding(#[from] serde_json::Error),
}
