//! References between elements, media packages and series
//!
//! The external form is `type:identifier[;key=value]*`, or the literal
//! `self` for a reference to the enclosing media package.

use crate::error::{MediaPackageError, Result};
use crate::element::MediaPackageElement;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const TYPE_MEDIAPACKAGE: &str = "mediapackage";
pub const TYPE_TRACK: &str = "track";
pub const TYPE_CATALOG: &str = "catalog";
pub const TYPE_ATTACHMENT: &str = "attachment";
pub const TYPE_SERIES: &str = "series";

/// Identifier pointing at the enclosing media package.
pub const SELF: &str = "self";

/// Identifier matching any other identifier.
pub const ANY: &str = "*";

/// Typed pointer from an element to another element, media package or series.
#[derive(Debug, Clone)]
pub struct MediaPackageReference {
    reference_type: String,
    identifier: String,
    properties: BTreeMap<String, String>,
}

impl MediaPackageReference {
    pub fn new(reference_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            reference_type: reference_type.into(),
            identifier: identifier.into(),
            properties: BTreeMap::new(),
        }
    }

    /// `mediapackage:self`
    pub fn self_reference() -> Self {
        Self::new(TYPE_MEDIAPACKAGE, SELF)
    }

    /// Reference to the given media package.
    pub fn for_media_package(id: impl Into<String>) -> Self {
        Self::new(TYPE_MEDIAPACKAGE, id)
    }

    /// Reference to a series.
    pub fn for_series(id: impl Into<String>) -> Self {
        Self::new(TYPE_SERIES, id)
    }

    /// Reference to `element`, typed after its element type.
    ///
    /// An element without identifier yields a reference to `*`.
    pub fn from_element(element: &MediaPackageElement) -> Self {
        Self::new(
            element.element_type().as_str(),
            element.identifier().unwrap_or(ANY),
        )
    }

    pub fn reference_type(&self) -> &str {
        &self.reference_type
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Snapshot of the property bag.
    pub fn properties(&self) -> BTreeMap<String, String> {
        self.properties.clone()
    }

    /// Returns `true` for `mediapackage:self`.
    pub fn is_self(&self) -> bool {
        self.reference_type == TYPE_MEDIAPACKAGE && self.identifier == SELF
    }

    /// Types and property bags must be equal. Identifiers match when equal,
    /// when either is `*`, or when either is `self`.
    pub fn matches(&self, other: &MediaPackageReference) -> bool {
        if self.reference_type != other.reference_type {
            return false;
        }
        if self.properties != other.properties {
            return false;
        }
        self.identifier == other.identifier
            || self.identifier == ANY
            || other.identifier == ANY
            || self.identifier == SELF
            || other.identifier == SELF
    }

    /// Like [`matches`](Self::matches) but `None` never matches.
    pub fn matches_opt(&self, other: Option<&MediaPackageReference>) -> bool {
        other.map(|o| self.matches(o)).unwrap_or(false)
    }

    /// Same target, ignoring the property bag.
    pub fn without_properties(&self) -> Self {
        Self::new(self.reference_type.clone(), self.identifier.clone())
    }
}

impl Default for MediaPackageReference {
    fn default() -> Self {
        Self::self_reference()
    }
}

impl PartialEq for MediaPackageReference {
    fn eq(&self, other: &Self) -> bool {
        self.reference_type == other.reference_type && self.identifier == other.identifier
    }
}

impl Eq for MediaPackageReference {}

impl fmt::Display for MediaPackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_self() {
            write!(f, "{}", SELF)?;
        } else {
            write!(f, "{}:{}", self.reference_type, self.identifier)?;
        }
        for (key, value) in &self.properties {
            write!(f, ";{}={}", key, value)?;
        }
        Ok(())
    }
}

impl FromStr for MediaPackageReference {
    type Err = MediaPackageError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split(';');
        let target = parts.next().unwrap_or_default();

        let mut reference = if target == SELF {
            Self::self_reference()
        } else {
            let (reference_type, identifier) = target.split_once(':').ok_or_else(|| {
                MediaPackageError::InvalidReference(format!(
                    "reference '{}' is not in the format 'type:identifier'",
                    s
                ))
            })?;
            Self::new(reference_type, identifier)
        };

        for property in parts {
            let (key, value) = property.split_once('=').ok_or_else(|| {
                MediaPackageError::InvalidReference(format!(
                    "malformed reference property '{}'",
                    property
                ))
            })?;
            reference.set_property(key, value);
        }

        Ok(reference)
    }
}
