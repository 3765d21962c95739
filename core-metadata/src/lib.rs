//! # Metadata Module
//!
//! Dublin Core catalogs and the editable metadata fields projected from them.
//!
//! ## Overview
//!
//! This module handles:
//! - Dublin Core catalogs on top of the generic XML catalog
//! - W3C-DTF dates, DCMI periods and ISO 8601 durations
//! - Typed metadata fields and ordered collections with a JSON form
//! - The adapter mapping catalog terms to fields and back
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::{DublinCoreCatalog, DublinCoreCatalogAdapter};
//!
//! let adapter = DublinCoreCatalogAdapter::from_config(&settings)?;
//! let mut catalog = DublinCoreCatalog::from_xml(&xml)?;
//! let mut fields = adapter.fields(&catalog)?;
//! fields.from_json_str(r#"[{"id": "title", "value": "New title"}]"#)?;
//! adapter.store_fields(&mut catalog, &fields)?;
//! ```

pub mod adapter;
pub mod collection;
pub mod dublincore;
pub mod error;
pub mod field;
pub mod period;

pub use adapter::DublinCoreCatalogAdapter;
pub use collection::MetadataCollection;
pub use dublincore::DublinCoreCatalog;
pub use error::{MetadataError, Result};
pub use field::{FieldValue, JsonType, MetadataField, MetadataFieldType};
pub use period::DcmiPeriod;
