//! Generated application artifacts and versioning records.

pub mod artifact;
pub mod imports;

pub use artifact::{AppVersion, GeneratedApp};
pub use imports::scan_required_libraries;
