//! HTTP serving layer

pub mod endpoints;
