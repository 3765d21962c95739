//! # Media Package Model
//!
//! The data model shared by every other crate in the workspace: media
//! packages, their elements, flavors, references and the XML manifest format.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`MediaPackage`] aggregate with tag, flavor and reference queries
//! - [`MediaPackageElement`] with typed bodies (track, catalog, attachment, publication)
//! - [`MediaPackageElementFlavor`] and [`MediaPackageReference`] with wildcard matching
//! - Plugin-based element construction ([`MediaPackageElementBuilder`])
//! - Manifest (de)serialization ([`MediaPackageParser`])
//! - Namespace-aware flat XML catalogs ([`XmlCatalog`])
//!
//! ## Usage
//!
//! ```ignore
//! use core_mediapackage::{MediaPackageBuilder, MediaPackageParser};
//!
//! let builder = MediaPackageBuilder::default();
//! let mut mp = builder.create_new();
//! let uri = url::Url::parse("http://localhost/video.mp4")?;
//! mp.add_from_uri(builder.element_builder(), &uri, None, None)?;
//! let xml = MediaPackageParser::get_as_xml(&mp)?;
//! ```

pub mod builder;
pub mod catalog;
pub mod element;
pub mod error;
pub mod flavor;
pub mod mediapackage;
pub mod mime;
pub mod parser;
pub mod reference;
pub mod xml;

pub use builder::{
    ElementBuilderPlugin, MediaPackageBuilder, MediaPackageElementBuilder, TypedElementPlugin,
};
pub use catalog::{Bindings, CatalogEntry, EName, XmlCatalog};
pub use element::{
    AttachmentDetails, Checksum, ChecksumType, ElementBody, ElementType, MediaPackageElement,
    PublicationDetails, TrackDetails,
};
pub use error::{MediaPackageError, Result};
pub use flavor::MediaPackageElementFlavor;
pub use mediapackage::MediaPackage;
pub use mime::MimeType;
pub use parser::MediaPackageParser;
pub use reference::MediaPackageReference;
pub use xml::XmlNode;
