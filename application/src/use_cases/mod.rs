//! Use cases (application orchestration).

pub mod run_turn;
