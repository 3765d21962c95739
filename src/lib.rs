//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (e.g., `core-service`, `core-workflow`, `core-mediapackage`,
//! `bridge-local`).
//! Host applications can depend on `mediapackage-workspace` and enable the
//! documented features without needing to wire each crate individually.

#[cfg(feature = "local-bridges")]
pub use bridge_local;
#[cfg(feature = "local-bridges")]
pub use core_service;
#[cfg(feature = "local-bridges")]
pub use core_workflow;

#[cfg(feature = "model-only")]
pub use core_mediapackage;
#[cfg(feature = "model-only")]
pub use core_metadata;
