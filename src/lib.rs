//! Slot-based natural-language query preparation with a shared SQL cache.
//!
//! A free-text question is reduced to structured [`slots::Slots`], checked,
//! and mapped to a deterministic [`slots::CacheKey`]. The
//! [`orchestrator::Nl2Sql`] then either replays SQL cached under that key or
//! hands a generation instruction to an external SQL writer, and stores the
//! SQL it gets back once it has run successfully.

pub mod config;
pub mod db;
pub mod llm;
pub mod orchestrator;
pub mod slots;
pub mod util;
pub mod web;
