//! # Local Bridge Implementations
//!
//! Implementations of the bridge traits that run inside the current process.
//!
//! ## Overview
//!
//! This crate provides:
//! - `Workspace` using `tokio::fs` with separate workspace and repository directories
//! - `SeriesService`, `AssetManager` and `ServiceRegistry` backed by in-memory maps
//! - `DistributionService` copying element files into a local publication directory
//!
//! They are meant for tests, demos and single-node setups.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_local::{FilesystemWorkspace, InMemoryServiceRegistry, LocalDistributionService};
//! use std::sync::Arc;
//!
//! let workspace = Arc::new(FilesystemWorkspace::in_directory(&root));
//! let registry = Arc::new(InMemoryServiceRegistry::new());
//! let distribution = LocalDistributionService::new(root.join("published"), workspace.clone(), registry.clone());
//! ```

mod distribution;
mod memory;
mod workspace;

pub use distribution::LocalDistributionService;
pub use memory::{InMemoryAssetManager, InMemorySeriesService, InMemoryServiceRegistry};
pub use workspace::FilesystemWorkspace;
