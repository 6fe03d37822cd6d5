pub mod config;
pub mod error;
pub mod generator;
pub mod planner;

pub mod utils;
