//! Runtime content packs.
//!
//! Fetches a `packs.json` manifest, keeps the packs whose release time has
//! passed, stages each pack's catalog into the resolution engine, then
//! instantiates a room and fills its slots from labelled content pools.
//! Everything acquired is released through a single lifecycle tracker.

pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod locator;
pub mod manifest;
pub mod models;
pub mod populate;
pub mod transport;

pub use bootstrap::ContentBootstrap;
pub use config::{BootstrapConfig, Environment, TransportConfig};
pub use error::{BootstrapError, Result};
