//! # Service Bridge Traits
//!
//! Contracts of the external services that workflow operation handlers call.
//!
//! ## Overview
//!
//! Handlers never talk to storage, archives or distribution channels directly.
//! Each capability is described by a trait here and injected at construction
//! time, so hosts can plug in remote clients while tests use local adapters.
//!
//! ## Traits
//!
//! ### Storage
//! - [`Workspace`](workspace::Workspace) - Working copies of element files and the shared repository
//! - [`AssetManager`](asset::AssetManager) - Versioned media package snapshots
//!
//! ### Services
//! - [`SeriesService`](series::SeriesService) - Series catalogs and access control
//! - [`DistributionService`](distribution::DistributionService) - Publishing elements to channels
//! - [`ServiceRegistry`](registry::ServiceRegistry) - Job state of long running calls
//!
//! ## Implementations
//!
//! | Host | Implementation Crate |
//! |------|---------------------|
//! | Local / tests | `bridge-local` |
//!
//! ## Fail-Fast Strategy
//!
//! The runtime fails fast with a descriptive error when a required capability
//! is missing:
//!
//! ```ignore
//! use core_runtime::error::Error;
//!
//! let workspace = builder.workspace
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "Workspace".to_string(),
//!         message: "No workspace implementation provided.".to_string(),
//!     })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should map missing resources to `NotFound` and include the resource (URI,
//! id) in the message.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so they can be shared as
//! `Arc<dyn Trait>` across async tasks.

pub mod asset;
pub mod distribution;
pub mod error;
pub mod registry;
pub mod series;
pub mod workspace;

pub use error::{BridgeError, Result};

// Re-export commonly used types
pub use asset::{AssetManager, Property, Snapshot, SnapshotQuery};
pub use distribution::DistributionService;
pub use registry::{Job, JobStatus, ServiceRegistry};
pub use series::{AccessControlEntry, AccessControlList, SeriesService};
pub use workspace::Workspace;
