//! Dashboard subcommands

pub mod heatmap;
pub mod recent;
pub mod status;
pub mod utilization;
