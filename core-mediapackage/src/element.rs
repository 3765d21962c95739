//! Media package elements
//!
//! All element variants share the same common attributes (identity, flavor,
//! tags, location, checksum, ...). The variant-specific data lives in
//! [`ElementBody`].
//!
//! An element remembers the identifier of the media package that owns it.
//! The owner is assigned by [`MediaPackage`](crate::MediaPackage) only and is
//! never carried over by `clone()`.

use crate::error::{MediaPackageError, Result};
use crate::flavor::MediaPackageElementFlavor;
use crate::mime::MimeType;
use crate::reference::MediaPackageReference;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use url::Url;

// =============================================================================
// Element type
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementType {
    Track,
    Catalog,
    Attachment,
    Publication,
    Other,
}

impl ElementType {
    /// Lower-case name, as used for manifest nodes and references.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Track => "track",
            ElementType::Catalog => "catalog",
            ElementType::Attachment => "attachment",
            ElementType::Publication => "publication",
            ElementType::Other => "other",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = MediaPackageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "track" => Ok(ElementType::Track),
            "catalog" => Ok(ElementType::Catalog),
            "attachment" => Ok(ElementType::Attachment),
            "publication" => Ok(ElementType::Publication),
            "other" | "unknown" => Ok(ElementType::Other),
            _ => Err(MediaPackageError::UnsupportedElement(format!(
                "unknown element type '{}'",
                s
            ))),
        }
    }
}

// =============================================================================
// Checksums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChecksumType {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl ChecksumType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumType::Md5 => "md5",
            ChecksumType::Sha1 => "sha1",
            ChecksumType::Sha256 => "sha256",
            ChecksumType::Sha512 => "sha512",
        }
    }
}

impl FromStr for ChecksumType {
    type Err = MediaPackageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "").as_str() {
            "md5" => Ok(ChecksumType::Md5),
            "sha1" => Ok(ChecksumType::Sha1),
            "sha256" => Ok(ChecksumType::Sha256),
            "sha512" => Ok(ChecksumType::Sha512),
            other => Err(MediaPackageError::InvalidArgument {
                field: "checksum".to_string(),
                message: format!("unsupported checksum type '{}'", other),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum {
    pub kind: ChecksumType,
    pub value: String,
}

impl Checksum {
    pub fn new(kind: ChecksumType, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into().to_lowercase(),
        }
    }

    /// Computes the SHA-256 checksum of `data`.
    pub fn sha256_of(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self::new(ChecksumType::Sha256, format!("{:x}", hasher.finalize()))
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.value)
    }
}

// =============================================================================
// Variant data
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackDetails {
    /// Duration in milliseconds
    pub duration: Option<u64>,
    pub live: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentDetails {
    pub properties: BTreeMap<String, String>,
}

/// A publication groups the elements that were distributed to a channel.
#[derive(Debug, Clone, Default)]
pub struct PublicationDetails {
    pub channel: String,
    pub tracks: Vec<MediaPackageElement>,
    pub catalogs: Vec<MediaPackageElement>,
    pub attachments: Vec<MediaPackageElement>,
}

impl PublicationDetails {
    /// Adds a published element to the group matching its type.
    pub fn add(&mut self, element: MediaPackageElement) -> Result<()> {
        match element.element_type() {
            ElementType::Track => self.tracks.push(element),
            ElementType::Catalog => self.catalogs.push(element),
            ElementType::Attachment => self.attachments.push(element),
            other => {
                return Err(MediaPackageError::UnsupportedElement(format!(
                    "a publication cannot contain elements of type {}",
                    other
                )))
            }
        }
        Ok(())
    }

    pub fn elements(&self) -> impl Iterator<Item = &MediaPackageElement> {
        self.tracks
            .iter()
            .chain(self.catalogs.iter())
            .chain(self.attachments.iter())
    }
}

#[derive(Debug, Clone)]
pub enum ElementBody {
    Track(TrackDetails),
    Catalog,
    Attachment(AttachmentDetails),
    Publication(PublicationDetails),
    Other,
}

impl ElementBody {
    pub fn for_type(element_type: ElementType) -> Self {
        match element_type {
            ElementType::Track => ElementBody::Track(TrackDetails::default()),
            ElementType::Catalog => ElementBody::Catalog,
            ElementType::Attachment => ElementBody::Attachment(AttachmentDetails::default()),
            ElementType::Publication => ElementBody::Publication(PublicationDetails::default()),
            ElementType::Other => ElementBody::Other,
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            ElementBody::Track(_) => ElementType::Track,
            ElementBody::Catalog => ElementType::Catalog,
            ElementBody::Attachment(_) => ElementType::Attachment,
            ElementBody::Publication(_) => ElementType::Publication,
            ElementBody::Other => ElementType::Other,
        }
    }
}

// =============================================================================
// Element
// =============================================================================

#[derive(Debug)]
pub struct MediaPackageElement {
    id: Option<String>,
    body: ElementBody,
    description: Option<String>,
    mime_type: Option<MimeType>,
    flavor: Option<MediaPackageElementFlavor>,
    tags: BTreeSet<String>,
    uri: Option<Url>,
    size: Option<u64>,
    checksum: Option<Checksum>,
    reference: Option<MediaPackageReference>,
    media_package: Option<String>,
}

impl MediaPackageElement {
    pub fn new(element_type: ElementType, uri: Option<Url>) -> Self {
        Self::with_body(ElementBody::for_type(element_type), uri)
    }

    pub fn with_body(body: ElementBody, uri: Option<Url>) -> Self {
        Self {
            id: None,
            body,
            description: None,
            mime_type: None,
            flavor: None,
            tags: BTreeSet::new(),
            uri,
            size: None,
            checksum: None,
            reference: None,
            media_package: None,
        }
    }

    pub fn track(uri: Url) -> Self {
        Self::new(ElementType::Track, Some(uri))
    }

    pub fn catalog(uri: Url) -> Self {
        Self::new(ElementType::Catalog, Some(uri))
    }

    pub fn attachment(uri: Url) -> Self {
        Self::new(ElementType::Attachment, Some(uri))
    }

    pub fn other(uri: Url) -> Self {
        Self::new(ElementType::Other, Some(uri))
    }

    pub fn publication(
        id: impl Into<String>,
        channel: impl Into<String>,
        uri: Url,
        mime_type: Option<MimeType>,
    ) -> Self {
        let mut publication = Self::with_body(
            ElementBody::Publication(PublicationDetails {
                channel: channel.into(),
                ..Default::default()
            }),
            Some(uri),
        );
        publication.id = Some(id.into());
        publication.mime_type = mime_type;
        publication
    }

    pub fn element_type(&self) -> ElementType {
        self.body.element_type()
    }

    pub fn body(&self) -> &ElementBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut ElementBody {
        &mut self.body
    }

    pub fn identifier(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_identifier(&mut self, id: Option<String>) {
        self.id = id;
    }

    /// Assigns a fresh random identifier and returns it.
    pub fn generate_identifier(&mut self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.id = Some(id.clone());
        id
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
    }

    /// Human readable label: the description, or the location when no
    /// description is set. `None` when neither exists.
    pub fn element_description(&self) -> Option<String> {
        self.description
            .clone()
            .or_else(|| self.uri.as_ref().map(Url::to_string))
    }

    pub fn mime_type(&self) -> Option<&MimeType> {
        self.mime_type.as_ref()
    }

    pub fn set_mime_type(&mut self, mime_type: Option<MimeType>) {
        self.mime_type = mime_type;
    }

    pub fn flavor(&self) -> Option<&MediaPackageElementFlavor> {
        self.flavor.as_ref()
    }

    pub fn set_flavor(&mut self, flavor: Option<MediaPackageElementFlavor>) {
        self.flavor = flavor;
    }

    pub fn uri(&self) -> Option<&Url> {
        self.uri.as_ref()
    }

    pub fn set_uri(&mut self, uri: Option<Url>) {
        self.uri = uri;
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn set_size(&mut self, size: Option<u64>) {
        self.size = size;
    }

    pub fn checksum(&self) -> Option<&Checksum> {
        self.checksum.as_ref()
    }

    pub fn set_checksum(&mut self, checksum: Option<Checksum>) {
        self.checksum = checksum;
    }

    pub fn reference(&self) -> Option<&MediaPackageReference> {
        self.reference.as_ref()
    }

    pub fn reference_mut(&mut self) -> Option<&mut MediaPackageReference> {
        self.reference.as_mut()
    }

    pub fn set_reference(&mut self, reference: Option<MediaPackageReference>) {
        self.reference = reference;
    }

    /// Makes this element refer to `other`.
    pub fn refer_to(&mut self, other: &MediaPackageElement) {
        self.reference = Some(MediaPackageReference::from_element(other));
    }

    pub fn clear_reference(&mut self) {
        self.reference = None;
    }

    /// Identifier of the owning media package, if any.
    pub fn media_package_id(&self) -> Option<&str> {
        self.media_package.as_deref()
    }

    pub(crate) fn set_media_package(&mut self, media_package: Option<String>) {
        self.media_package = media_package;
    }

    // -------------------------------------------------------------------------
    // Tags
    // -------------------------------------------------------------------------

    /// Sorted snapshot of the tags.
    pub fn tags(&self) -> Vec<String> {
        self.tags.iter().cloned().collect()
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.tags.insert(tag.into());
    }

    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.remove(tag);
    }

    pub fn clear_tags(&mut self) {
        self.tags.clear();
    }

    pub fn contains_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// `true` if any of `tags` is present. An empty query matches everything.
    pub fn contains_any_tag<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        tags.is_empty() || tags.iter().any(|t| self.tags.contains(t.as_ref()))
    }

    // -------------------------------------------------------------------------
    // Variant accessors
    // -------------------------------------------------------------------------

    /// Track duration in milliseconds.
    pub fn duration(&self) -> Option<u64> {
        match &self.body {
            ElementBody::Track(track) => track.duration,
            _ => None,
        }
    }

    pub fn set_duration(&mut self, duration: Option<u64>) -> Result<()> {
        match &mut self.body {
            ElementBody::Track(track) => {
                track.duration = duration;
                Ok(())
            }
            _ => Err(MediaPackageError::UnsupportedElement(format!(
                "{} elements have no duration",
                self.element_type()
            ))),
        }
    }

    pub fn as_publication(&self) -> Option<&PublicationDetails> {
        match &self.body {
            ElementBody::Publication(publication) => Some(publication),
            _ => None,
        }
    }

    pub fn as_publication_mut(&mut self) -> Option<&mut PublicationDetails> {
        match &mut self.body {
            ElementBody::Publication(publication) => Some(publication),
            _ => None,
        }
    }

    /// Consistency hook. All elements are currently considered valid.
    pub fn verify(&self) -> Result<()> {
        Ok(())
    }

    /// Orders elements by the string form of their location.
    pub fn compare_by_uri(&self, other: &MediaPackageElement) -> Ordering {
        let a = self.uri.as_ref().map(Url::as_str);
        let b = other.uri.as_ref().map(Url::as_str);
        a.cmp(&b)
    }
}

impl Clone for MediaPackageElement {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            body: self.body.clone(),
            description: self.description.clone(),
            mime_type: self.mime_type.clone(),
            flavor: self.flavor.clone(),
            tags: self.tags.clone(),
            uri: self.uri.clone(),
            size: self.size,
            checksum: self.checksum.clone(),
            reference: self.reference.clone(),
            media_package: None,
        }
    }
}

impl PartialEq for MediaPackageElement {
    fn eq(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (&self.media_package, &other.media_package) {
            if a != b {
                return false;
            }
        }
        self.id == other.id && self.uri == other.uri
    }
}

impl fmt::Display for MediaPackageElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self
            .element_description()
            .unwrap_or_else(|| "<unlocated>".to_string());
        match &self.id {
            Some(id) => write!(f, "{} '{}' ({})", self.element_type(), id, label),
            None => write!(f, "{} ({})", self.element_type(), label),
        }
    }
}
