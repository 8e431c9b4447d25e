//! CLI library for testing purposes

pub mod output;
pub mod validation;

pub use stringdex::{Config, IndexStore};
