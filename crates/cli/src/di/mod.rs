pub mod adapters;
pub mod config_adapt;
pub mod jobs;

pub use adapters::Adapters;
