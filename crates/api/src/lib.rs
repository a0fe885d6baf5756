//! HTTP API and command-line entrypoints for the product statistics service.

pub mod app;
pub mod cli;
