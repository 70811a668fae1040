//! Core domain primitives: errors and string utilities.

pub mod error;
pub mod string;
