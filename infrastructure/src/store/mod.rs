//! App version store adapters.

pub mod jsonl;
pub mod memory;
