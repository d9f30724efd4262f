//! Domain models for content packs.
//!
//! # Core Concepts
//!
//! - [`Manifest`]: the `packs.json` document listing every [`PackDescriptor`].
//!   Eligibility is derived from it on demand and never stored.
//! - [`PackDescriptor`]: a downloadable unit with a release instant and a
//!   resource catalog.
//! - [`SlotDescriptor`]: a placeholder inside a room whose name encodes the
//!   category of content that fills it.
//! - [`PopulationReport`] / [`ReleaseReport`]: what a run produced and what
//!   teardown gave back.

mod pack;
mod report;
mod slot;

pub use pack::*;
pub use report::*;
pub use slot::*;
