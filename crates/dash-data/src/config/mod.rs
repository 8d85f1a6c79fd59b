//! Loader and per-request configuration

pub mod load_options;
pub mod loader_config;
pub mod null_handling;

pub use load_options::*;
pub use loader_config::*;
pub use null_handling::*;
