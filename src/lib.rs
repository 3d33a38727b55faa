//! Spaced-repetition engine for audio, word and sentence cards

pub mod config;
pub mod import;
pub mod memory;
pub mod review;
