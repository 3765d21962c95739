//! The media package aggregate
//!
//! A [`MediaPackage`] owns its elements. Adding an element assigns it an
//! identifier (when needed) and records this package as its owner; removing it
//! hands the element back without owner.

use crate::builder::MediaPackageElementBuilder;
use crate::element::{ElementType, MediaPackageElement};
use crate::error::{MediaPackageError, Result};
use crate::flavor::MediaPackageElementFlavor;
use crate::reference::MediaPackageReference;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;
use url::Url;

/// Prefix that negates a tag in tag queries.
pub const NEGATE_TAG_PREFIX: &str = "-";

#[derive(Debug, Default, Clone, Copy)]
struct ElementCounters {
    tracks: usize,
    catalogs: usize,
    attachments: usize,
    others: usize,
}

impl ElementCounters {
    /// Bumps the counter for `element_type` and returns the fallback id.
    fn next_id(&mut self, element_type: ElementType) -> String {
        match element_type {
            ElementType::Track => {
                self.tracks += 1;
                format!("track-{}", self.tracks)
            }
            ElementType::Catalog => {
                self.catalogs += 1;
                format!("catalog-{}", self.catalogs)
            }
            ElementType::Attachment => {
                self.attachments += 1;
                format!("attachment-{}", self.attachments)
            }
            ElementType::Publication | ElementType::Other => {
                self.others += 1;
                format!("unknown-{}", self.others)
            }
        }
    }
}

#[derive(Debug)]
pub struct MediaPackage {
    id: String,
    title: Option<String>,
    series: Option<String>,
    series_title: Option<String>,
    creators: BTreeSet<String>,
    contributors: BTreeSet<String>,
    subjects: BTreeSet<String>,
    license: Option<String>,
    language: Option<String>,
    start: Option<DateTime<Utc>>,
    duration: Option<u64>,
    elements: Vec<MediaPackageElement>,
    counters: ElementCounters,
}

impl MediaPackage {
    /// Creates an empty media package with a random identifier.
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            series: None,
            series_title: None,
            creators: BTreeSet::new(),
            contributors: BTreeSet::new(),
            subjects: BTreeSet::new(),
            license: None,
            language: None,
            start: None,
            duration: None,
            elements: Vec::new(),
            counters: ElementCounters::default(),
        }
    }

    // =========================================================================
    // Episode metadata
    // =========================================================================

    pub fn identifier(&self) -> &str {
        &self.id
    }

    /// Changes the identifier and re-points all elements at it.
    pub fn set_identifier(&mut self, id: impl Into<String>) {
        self.id = id.into();
        let owner = self.id.clone();
        for element in &mut self.elements {
            element.set_media_package(Some(owner.clone()));
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn set_title(&mut self, title: Option<String>) {
        self.title = title;
    }

    pub fn series(&self) -> Option<&str> {
        self.series.as_deref()
    }

    pub fn set_series(&mut self, series: Option<String>) {
        self.series = series;
    }

    pub fn series_title(&self) -> Option<&str> {
        self.series_title.as_deref()
    }

    pub fn set_series_title(&mut self, series_title: Option<String>) {
        self.series_title = series_title;
    }

    pub fn creators(&self) -> Vec<String> {
        self.creators.iter().cloned().collect()
    }

    pub fn add_creator(&mut self, creator: impl Into<String>) {
        self.creators.insert(creator.into());
    }

    pub fn remove_creator(&mut self, creator: &str) {
        self.creators.remove(creator);
    }

    pub fn contributors(&self) -> Vec<String> {
        self.contributors.iter().cloned().collect()
    }

    pub fn add_contributor(&mut self, contributor: impl Into<String>) {
        self.contributors.insert(contributor.into());
    }

    pub fn remove_contributor(&mut self, contributor: &str) {
        self.contributors.remove(contributor);
    }

    pub fn subjects(&self) -> Vec<String> {
        self.subjects.iter().cloned().collect()
    }

    pub fn add_subject(&mut self, subject: impl Into<String>) {
        self.subjects.insert(subject.into());
    }

    pub fn remove_subject(&mut self, subject: &str) {
        self.subjects.remove(subject);
    }

    pub fn license(&self) -> Option<&str> {
        self.license.as_deref()
    }

    pub fn set_license(&mut self, license: Option<String>) {
        self.license = license;
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn set_language(&mut self, language: Option<String>) {
        self.language = language;
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    pub fn set_start(&mut self, start: Option<DateTime<Utc>>) {
        self.start = start;
    }

    /// Duration in milliseconds. Once tracks are present this is the duration
    /// of the longest track.
    pub fn duration(&self) -> Option<u64> {
        if self.has_tracks() {
            let longest = self.tracks().iter().filter_map(|t| t.duration()).max();
            if longest.is_some() {
                return longest;
            }
        }
        self.duration
    }

    /// # Errors
    ///
    /// Fails with `IllegalState` once the package contains tracks.
    pub fn set_duration(&mut self, duration: Option<u64>) -> Result<()> {
        if self.has_tracks() {
            return Err(MediaPackageError::IllegalState(
                "the duration is determined by the length of the tracks and cannot be set manually"
                    .to_string(),
            ));
        }
        self.duration = duration;
        Ok(())
    }

    // =========================================================================
    // Adding and removing
    // =========================================================================

    /// Adds `element` and returns its identifier within this package.
    ///
    /// Tracks, catalogs and attachments receive a fresh identifier when they
    /// have none or when it is already taken. Other elements without an
    /// identifier are numbered `unknown-N`.
    pub fn add(&mut self, mut element: MediaPackageElement) -> String {
        match element.element_type() {
            ElementType::Track | ElementType::Catalog | ElementType::Attachment => {
                let taken = element
                    .identifier()
                    .map(|id| self.contains_id(id))
                    .unwrap_or(true);
                if taken {
                    element.generate_identifier();
                }
            }
            ElementType::Publication | ElementType::Other => {}
        }
        self.add_internal(element)
    }

    /// Builds an element from `uri` with `builder` and adds it.
    pub fn add_from_uri(
        &mut self,
        builder: &MediaPackageElementBuilder,
        uri: &Url,
        element_type: Option<ElementType>,
        flavor: Option<&MediaPackageElementFlavor>,
    ) -> Result<String> {
        let element = builder.element_from_uri_typed(uri, element_type, flavor)?;
        Ok(self.add_internal(element))
    }

    /// Adds `derived` as a derivative of the contained element `source_id`.
    /// The derived element refers to its source; `properties` are attached
    /// to that reference.
    ///
    /// # Errors
    ///
    /// Fails with `IllegalState` when the source is not part of this package.
    pub fn add_derived(
        &mut self,
        mut derived: MediaPackageElement,
        source_id: &str,
        properties: BTreeMap<String, String>,
    ) -> Result<String> {
        let source = self.element_by_id(source_id).ok_or_else(|| {
            MediaPackageError::IllegalState(format!(
                "source element {} needs to be part of the media package",
                source_id
            ))
        })?;
        derived.refer_to(source);
        if let Some(reference) = derived.reference_mut() {
            for (key, value) in properties {
                reference.set_property(key, value);
            }
        }
        Ok(self.add_internal(derived))
    }

    fn add_internal(&mut self, mut element: MediaPackageElement) -> String {
        let id = match element.identifier() {
            Some(id) => id.to_string(),
            None => {
                let fallback = self.counters.next_id(element.element_type());
                element.set_identifier(Some(fallback.clone()));
                fallback
            }
        };
        element.set_media_package(Some(self.id.clone()));
        if !self.elements.contains(&element) {
            debug!(
                media_package = %self.id,
                element = %id,
                element_type = %element.element_type(),
                "Adding element"
            );
            self.elements.push(element);
        }
        id
    }

    /// Removes `element` and returns it without owner.
    pub fn remove(&mut self, element: &MediaPackageElement) -> Option<MediaPackageElement> {
        let position = self.elements.iter().position(|e| e == element)?;
        Some(self.take_at(position))
    }

    pub fn remove_by_id(&mut self, id: &str) -> Option<MediaPackageElement> {
        let position = self
            .elements
            .iter()
            .position(|e| e.identifier() == Some(id))?;
        Some(self.take_at(position))
    }

    fn take_at(&mut self, position: usize) -> MediaPackageElement {
        let mut element = self.elements.remove(position);
        element.set_media_package(None);
        debug!(
            media_package = %self.id,
            element = element.identifier().unwrap_or_default(),
            "Removed element"
        );
        element
    }

    pub fn contains(&self, element: &MediaPackageElement) -> bool {
        self.elements.iter().any(|e| e == element)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.elements.iter().any(|e| e.identifier() == Some(id))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn elements(&self) -> &[MediaPackageElement] {
        &self.elements
    }

    pub fn element_by_id(&self, id: &str) -> Option<&MediaPackageElement> {
        self.elements.iter().find(|e| e.identifier() == Some(id))
    }

    pub fn element_by_id_mut(&mut self, id: &str) -> Option<&mut MediaPackageElement> {
        self.elements.iter_mut().find(|e| e.identifier() == Some(id))
    }

    /// Mutable access to every element, e.g. for bulk tag changes.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut MediaPackageElement> {
        self.elements.iter_mut()
    }

    /// Element whose type and identifier equal the reference's.
    pub fn element_by_reference(
        &self,
        reference: &MediaPackageReference,
    ) -> Option<&MediaPackageElement> {
        self.elements.iter().find(|e| {
            reference
                .reference_type()
                .eq_ignore_ascii_case(e.element_type().as_str())
                && e.identifier() == Some(reference.identifier())
        })
    }

    /// Elements carrying at least one of the requested tags and none of the
    /// negated (`-tag`) ones. Blank tags are ignored; an empty query returns
    /// every element.
    pub fn elements_by_tags<S: AsRef<str>>(&self, tags: &[S]) -> Vec<&MediaPackageElement> {
        if tags.is_empty() {
            return self.elements.iter().collect();
        }
        let mut keep = BTreeSet::new();
        let mut lose = BTreeSet::new();
        for tag in tags {
            let tag = tag.as_ref();
            if tag.trim().is_empty() {
                continue;
            }
            match tag.strip_prefix(NEGATE_TAG_PREFIX) {
                Some(negated) => lose.insert(negated.to_string()),
                None => keep.insert(tag.to_string()),
            };
        }

        self.elements
            .iter()
            .filter(|element| {
                let mut add = false;
                for tag in element.tags() {
                    if lose.contains(&tag) {
                        return false;
                    }
                    if keep.contains(&tag) {
                        add = true;
                    }
                }
                add
            })
            .collect()
    }

    pub fn elements_by_flavor(
        &self,
        flavor: &MediaPackageElementFlavor,
    ) -> Vec<&MediaPackageElement> {
        self.elements
            .iter()
            .filter(|e| flavor.matches_opt(e.flavor()))
            .collect()
    }

    pub fn elements_of_type(&self, element_type: ElementType) -> Vec<&MediaPackageElement> {
        self.elements
            .iter()
            .filter(|e| e.element_type() == element_type)
            .collect()
    }

    fn of_type_with_flavor(
        &self,
        element_type: ElementType,
        flavor: &MediaPackageElementFlavor,
    ) -> Vec<&MediaPackageElement> {
        self.elements
            .iter()
            .filter(|e| e.element_type() == element_type && flavor.matches_opt(e.flavor()))
            .collect()
    }

    fn of_type_with_tags<S: AsRef<str>>(
        &self,
        element_type: ElementType,
        tags: &[S],
    ) -> Vec<&MediaPackageElement> {
        self.elements_by_tags(tags)
            .into_iter()
            .filter(|e| e.element_type() == element_type)
            .collect()
    }

    pub fn has_tracks(&self) -> bool {
        self.elements
            .iter()
            .any(|e| e.element_type() == ElementType::Track)
    }

    pub fn tracks(&self) -> Vec<&MediaPackageElement> {
        self.elements_of_type(ElementType::Track)
    }

    pub fn tracks_by_flavor(&self, flavor: &MediaPackageElementFlavor) -> Vec<&MediaPackageElement> {
        self.of_type_with_flavor(ElementType::Track, flavor)
    }

    pub fn tracks_by_tags<S: AsRef<str>>(&self, tags: &[S]) -> Vec<&MediaPackageElement> {
        self.of_type_with_tags(ElementType::Track, tags)
    }

    pub fn tracks_by_tag(&self, tag: &str) -> Vec<&MediaPackageElement> {
        self.tracks()
            .into_iter()
            .filter(|t| t.contains_tag(tag))
            .collect()
    }

    pub fn catalogs(&self) -> Vec<&MediaPackageElement> {
        self.elements_of_type(ElementType::Catalog)
    }

    pub fn catalogs_by_flavor(
        &self,
        flavor: &MediaPackageElementFlavor,
    ) -> Vec<&MediaPackageElement> {
        self.of_type_with_flavor(ElementType::Catalog, flavor)
    }

    pub fn catalogs_by_tags<S: AsRef<str>>(&self, tags: &[S]) -> Vec<&MediaPackageElement> {
        self.of_type_with_tags(ElementType::Catalog, tags)
    }

    /// Catalogs whose reference matches `reference`. With `include_derived`,
    /// catalogs that reach the referenced element through a chain of
    /// references are included too.
    pub fn catalogs_by_reference(
        &self,
        reference: &MediaPackageReference,
        include_derived: bool,
    ) -> Vec<&MediaPackageElement> {
        let target = reference.without_properties();
        self.catalogs()
            .into_iter()
            .filter(|catalog| {
                if reference.matches_opt(catalog.reference()) {
                    return true;
                }
                if !include_derived {
                    return false;
                }
                let mut current = catalog.reference().cloned();
                let mut hops = 0;
                while let Some(r) = current {
                    if r.matches(&target) {
                        return true;
                    }
                    // guards against reference cycles
                    hops += 1;
                    if hops > self.elements.len() {
                        return false;
                    }
                    current = self
                        .element_by_reference(&r)
                        .and_then(|e| e.reference().cloned());
                }
                false
            })
            .collect()
    }

    /// Catalogs with exactly `flavor` whose reference (if any) matches
    /// `reference`.
    pub fn catalogs_by_flavor_and_reference(
        &self,
        flavor: &MediaPackageElementFlavor,
        reference: &MediaPackageReference,
    ) -> Vec<&MediaPackageElement> {
        self.catalogs()
            .into_iter()
            .filter(|c| {
                c.flavor() == Some(flavor)
                    && c.reference().map(|r| r.matches(reference)).unwrap_or(true)
            })
            .collect()
    }

    pub fn attachments(&self) -> Vec<&MediaPackageElement> {
        self.elements_of_type(ElementType::Attachment)
    }

    pub fn attachments_by_flavor(
        &self,
        flavor: &MediaPackageElementFlavor,
    ) -> Vec<&MediaPackageElement> {
        self.of_type_with_flavor(ElementType::Attachment, flavor)
    }

    pub fn attachments_by_tags<S: AsRef<str>>(&self, tags: &[S]) -> Vec<&MediaPackageElement> {
        self.of_type_with_tags(ElementType::Attachment, tags)
    }

    pub fn publications(&self) -> Vec<&MediaPackageElement> {
        self.elements_of_type(ElementType::Publication)
    }

    /// Elements that are neither tracks, catalogs, attachments nor
    /// publications.
    pub fn unclassified_elements(&self) -> Vec<&MediaPackageElement> {
        self.elements_of_type(ElementType::Other)
    }

    /// Elements with `flavor` that were derived from `source`.
    pub fn derived(
        &self,
        source: &MediaPackageElement,
        flavor: &MediaPackageElementFlavor,
    ) -> Vec<&MediaPackageElement> {
        let reference = MediaPackageReference::from_element(source);
        self.elements
            .iter()
            .filter(|e| e.flavor() == Some(flavor) && e.reference() == Some(&reference))
            .collect()
    }

    pub fn verify(&self) -> Result<()> {
        self.elements.iter().try_for_each(MediaPackageElement::verify)
    }
}

impl Default for MediaPackage {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MediaPackage {
    fn clone(&self) -> Self {
        let elements = self
            .elements
            .iter()
            .map(|e| {
                let mut copy = e.clone();
                copy.set_media_package(Some(self.id.clone()));
                copy
            })
            .collect();
        Self {
            id: self.id.clone(),
            title: self.title.clone(),
            series: self.series.clone(),
            series_title: self.series_title.clone(),
            creators: self.creators.clone(),
            contributors: self.contributors.clone(),
            subjects: self.subjects.clone(),
            license: self.license.clone(),
            language: self.language.clone(),
            start: self.start,
            duration: self.duration,
            elements,
            counters: self.counters,
        }
    }
}

impl PartialEq for MediaPackage {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MediaPackage {}

impl fmt::Display for MediaPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
