//! Core infrastructure: configuration, logging, model mapping, and the
//! upstream HTTP client.

pub mod config;
pub mod constants;
pub mod logging;
pub mod model_manager;
pub mod upstream;
