//! Infrastructure layer: configuration, persistence, caching and the
//! application services built on top of them.

pub mod cache;
pub mod config;
pub mod services;
pub mod store;

pub use config::{AppConfig, ConfigError, SeedAdmin};
