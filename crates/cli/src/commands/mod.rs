//! CLI subcommand implementations

pub mod classify;
pub mod model;
pub mod status;
pub mod thresholds;
