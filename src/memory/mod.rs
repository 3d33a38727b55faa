//! Concept graph and its durable store
//!
//! This module provides:
//! - Concepts (audio clips, words, sentences) keyed by derived identity
//! - Directed connects between concepts with an append-only review history
//! - Verified, atomic persistence with optional background saves

pub mod graph;
pub mod models;
pub mod storage;

pub use graph::{Memory, MemoryError};
pub use models::*;
pub use storage::{BackgroundSaver, MemoryStorage, StorageError};
