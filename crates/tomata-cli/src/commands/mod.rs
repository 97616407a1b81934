pub mod config;
pub mod data;
pub mod sequence;
pub mod stats;
pub mod task;
pub mod timer;
