//! Dublin Core catalogs
//!
//! A [`DublinCoreCatalog`] is an [`XmlCatalog`] with the `dcterms` and
//! Opencast Dublin Core namespaces bound and a `<dublincore>` root element.

use core_mediapackage::catalog::{Bindings, CatalogEntry, EName, XmlCatalog, DEFAULT_NS_PREFIX};
use core_mediapackage::MediaPackageElementFlavor;
use tracing::debug;

use crate::error::Result;

pub const TERMS_NS_URI: &str = "http://purl.org/dc/terms/";
pub const TERMS_NS_PREFIX: &str = "dcterms";
pub const OC_NS_URI: &str = "http://www.opencastproject.org/xsd/1.0/dublincore/";
pub const ROOT_ELEMENT: &str = "dublincore";

/// Local names of the Dublin Core terms used throughout the workflow
pub mod property {
    pub const TITLE: &str = "title";
    pub const CREATOR: &str = "creator";
    pub const CONTRIBUTOR: &str = "contributor";
    pub const SUBJECT: &str = "subject";
    pub const DESCRIPTION: &str = "description";
    pub const PUBLISHER: &str = "publisher";
    pub const LANGUAGE: &str = "language";
    pub const LICENSE: &str = "license";
    pub const RIGHTS_HOLDER: &str = "rightsHolder";
    pub const CREATED: &str = "created";
    pub const TEMPORAL: &str = "temporal";
    pub const EXTENT: &str = "extent";
    pub const IDENTIFIER: &str = "identifier";
    pub const IS_PART_OF: &str = "isPartOf";
    pub const SPATIAL: &str = "spatial";
    pub const SOURCE: &str = "source";
    pub const TYPE: &str = "type";
    pub const AVAILABLE: &str = "available";
}

/// `dcterms:<local_name>`
pub fn term(local_name: &str) -> EName {
    EName::new(TERMS_NS_URI, local_name)
}

/// Encoding scheme of W3C-DTF dates
pub fn encoding_w3cdtf() -> EName {
    term("W3CDTF")
}

/// Encoding scheme of DCMI periods
pub fn encoding_period() -> EName {
    term("Period")
}

/// Encoding scheme of ISO 8601 durations
pub fn encoding_iso8601() -> EName {
    term("ISO8601")
}

#[derive(Debug, Clone)]
pub struct DublinCoreCatalog {
    catalog: XmlCatalog,
    flavor: Option<MediaPackageElementFlavor>,
}

impl Default for DublinCoreCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl DublinCoreCatalog {
    pub fn new() -> Self {
        Self {
            catalog: XmlCatalog::new(EName::new(OC_NS_URI, ROOT_ELEMENT), Self::bindings()),
            flavor: None,
        }
    }

    fn bindings() -> Bindings {
        let mut bindings = Bindings::with_defaults(false);
        // both namespaces are fresh, binding cannot conflict
        let _ = bindings.bind_prefix(DEFAULT_NS_PREFIX, OC_NS_URI);
        let _ = bindings.bind_prefix(TERMS_NS_PREFIX, TERMS_NS_URI);
        bindings
    }

    pub fn with_flavor(mut self, flavor: MediaPackageElementFlavor) -> Self {
        self.flavor = Some(flavor);
        self
    }

    pub fn flavor(&self) -> Option<&MediaPackageElementFlavor> {
        self.flavor.as_ref()
    }

    pub fn set_flavor(&mut self, flavor: Option<MediaPackageElementFlavor>) {
        self.flavor = flavor;
    }

    pub fn catalog(&self) -> &XmlCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut XmlCatalog {
        &mut self.catalog
    }

    pub fn bind_prefix(&mut self, prefix: &str, namespace: &str) -> Result<()> {
        Ok(self.catalog.bind_prefix(prefix, namespace)?)
    }

    /// All values of `name` in insertion order.
    pub fn get(&self, name: &EName) -> Vec<&str> {
        self.catalog
            .values(name)
            .iter()
            .map(CatalogEntry::value)
            .collect()
    }

    pub fn get_first(&self, name: &EName) -> Option<&str> {
        self.catalog.first_value(name).map(CatalogEntry::value)
    }

    pub fn entries(&self, name: &EName) -> &[CatalogEntry] {
        self.catalog.values(name)
    }

    /// Encoding scheme (`xsi:type`) of the first value of `name`.
    pub fn encoding(&self, name: &EName) -> Option<EName> {
        let entry = self.catalog.first_value(name)?;
        let qname = entry.attribute(&core_mediapackage::catalog::xsi_type_attr())?;
        self.catalog.to_ename(qname).ok()
    }

    pub fn has_value(&self, name: &EName) -> bool {
        self.catalog.has_values(name)
    }

    /// Replaces all values of `name`; a blank value just removes them.
    pub fn set(&mut self, name: &EName, value: impl Into<String>) {
        self.catalog.remove_element(name);
        self.catalog.add_element(name.clone(), value);
    }

    pub fn set_typed(&mut self, name: &EName, value: impl Into<String>, encoding: &EName) -> Result<()> {
        self.catalog.remove_element(name);
        self.catalog.add_typed_element(name.clone(), value, encoding)?;
        Ok(())
    }

    pub fn set_all<I, S>(&mut self, name: &EName, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.catalog.remove_element(name);
        for value in values {
            self.catalog.add_element(name.clone(), value);
        }
    }

    pub fn add(&mut self, name: &EName, value: impl Into<String>) {
        self.catalog.add_element(name.clone(), value);
    }

    pub fn add_typed(&mut self, name: &EName, value: impl Into<String>, encoding: &EName) -> Result<()> {
        self.catalog.add_typed_element(name.clone(), value, encoding)?;
        Ok(())
    }

    pub fn add_localized(&mut self, name: &EName, value: impl Into<String>, language: &str) {
        self.catalog.add_localized_element(name.clone(), value, language);
    }

    pub fn remove(&mut self, name: &EName) {
        self.catalog.remove_element(name);
    }

    pub fn to_xml(&self) -> Result<String> {
        Ok(self.catalog.to_xml_string()?)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let catalog = XmlCatalog::from_xml(xml, EName::new(OC_NS_URI, ROOT_ELEMENT), Self::bindings())?;
        debug!(
            terms = catalog.element_names().count(),
            "Parsed Dublin Core catalog"
        );
        Ok(Self {
            catalog,
            flavor: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_mediapackage::flavor::episode_dublin_core;

    const EPISODE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<dublincore xmlns="http://www.opencastproject.org/xsd/1.0/dublincore/"
            xmlns:dcterms="http://purl.org/dc/terms/"
            xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <dcterms:title xml:lang="en">Introduction to Rust</dcterms:title>
  <dcterms:creator>Ada</dcterms:creator>
  <dcterms:creator>Grace</dcterms:creator>
  <dcterms:temporal xsi:type="dcterms:Period">start=2024-03-01T10:00:00Z; end=2024-03-01T11:00:00Z; scheme=W3C-DTF;</dcterms:temporal>
  <dcterms:isPartOf>series-1</dcterms:isPartOf>
</dublincore>"#;

    #[test]
    fn test_parse_episode_catalog() {
        let dc = DublinCoreCatalog::from_xml(EPISODE).unwrap();
        assert_eq!(dc.get_first(&term(property::TITLE)), Some("Introduction to Rust"));
        assert_eq!(dc.get(&term(property::CREATOR)), vec!["Ada", "Grace"]);
        assert_eq!(dc.encoding(&term(property::TEMPORAL)), Some(encoding_period()));
        assert!(dc.has_value(&term(property::IS_PART_OF)));
        assert!(!dc.has_value(&term(property::LICENSE)));
    }

    #[test]
    fn test_set_replaces_values() {
        let mut dc = DublinCoreCatalog::new().with_flavor(episode_dublin_core());
        dc.add(&term(property::CREATOR), "Ada");
        dc.add(&term(property::CREATOR), "Grace");
        dc.set(&term(property::CREATOR), "Linus");
        assert_eq!(dc.get(&term(property::CREATOR)), vec!["Linus"]);

        dc.set(&term(property::CREATOR), "  ");
        assert!(!dc.has_value(&term(property::CREATOR)));
        assert_eq!(dc.flavor(), Some(&episode_dublin_core()));
    }

    #[test]
    fn test_round_trip() {
        let mut dc = DublinCoreCatalog::new();
        dc.set(&term(property::TITLE), "Lecture");
        dc.set_typed(&term(property::CREATED), "2024-03-01T10:00:00Z", &encoding_w3cdtf())
            .unwrap();
        dc.set_all(&term(property::SUBJECT), ["rust", "systems"]);

        let xml = dc.to_xml().unwrap();
        assert!(xml.contains("xmlns:dcterms=\"http://purl.org/dc/terms/\""));
        assert!(xml.contains("xsi:type=\"dcterms:W3CDTF\""));

        let parsed = DublinCoreCatalog::from_xml(&xml).unwrap();
        assert_eq!(parsed.get_first(&term(property::TITLE)), Some("Lecture"));
        assert_eq!(parsed.get(&term(property::SUBJECT)), vec!["rust", "systems"]);
        assert_eq!(parsed.encoding(&term(property::CREATED)), Some(encoding_w3cdtf()));
    }

    #[test]
    fn test_rejects_other_root() {
        assert!(DublinCoreCatalog::from_xml("<mediapackage/>").is_err());
    }
}
