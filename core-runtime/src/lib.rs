//! # Core Runtime Module
//!
//! Provides the runtime infrastructure shared by the workflow crates:
//! - Logging and tracing infrastructure
//! - Configuration management and dependency injection of services
//!
//! ## Overview
//!
//! This crate establishes the logging conventions and the configuration
//! object (`CoreConfig`) through which hosts hand their service
//! implementations to the workflow operation handlers.

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
