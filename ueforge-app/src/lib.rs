pub mod app;
pub mod build;
pub mod config;
pub mod logging;
