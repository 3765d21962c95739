//! Element selection by flavor and tag

use core_mediapackage::{ElementType, MediaPackage, MediaPackageElement, MediaPackageElementFlavor};
use std::collections::BTreeSet;

/// Tags with this prefix exclude elements instead of selecting them
pub const EXCLUDE_TAG_PREFIX: char = '-';

/// Selects media package elements by flavor and tag
///
/// An element is selected when it carries none of the exclusion tags and
/// either matches one of the flavors or carries one of the tags. With
/// `with_tags_and_flavors` it has to satisfy both configured criteria.
/// A selector without flavors and tags selects nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleElementSelector {
    element_type: Option<ElementType>,
    flavors: Vec<MediaPackageElementFlavor>,
    tags: BTreeSet<String>,
    exclude_tags: BTreeSet<String>,
}

impl SimpleElementSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selector restricted to elements of `element_type`.
    pub fn of_type(element_type: ElementType) -> Self {
        Self {
            element_type: Some(element_type),
            ..Default::default()
        }
    }

    pub fn tracks() -> Self {
        Self::of_type(ElementType::Track)
    }

    pub fn catalogs() -> Self {
        Self::of_type(ElementType::Catalog)
    }

    pub fn attachments() -> Self {
        Self::of_type(ElementType::Attachment)
    }

    pub fn add_flavor(&mut self, flavor: MediaPackageElementFlavor) {
        if !self.flavors.contains(&flavor) {
            self.flavors.push(flavor);
        }
    }

    /// Adds a tag to look for; `-tag` excludes elements tagged `tag`.
    pub fn add_tag(&mut self, tag: &str) {
        let tag = tag.trim();
        match tag.strip_prefix(EXCLUDE_TAG_PREFIX) {
            Some(excluded) if !excluded.is_empty() => {
                self.exclude_tags.insert(excluded.to_string());
            }
            Some(_) => {}
            None if !tag.is_empty() => {
                self.tags.insert(tag.to_string());
            }
            None => {}
        }
    }

    pub fn with_flavors<I>(mut self, flavors: I) -> Self
    where
        I: IntoIterator<Item = MediaPackageElementFlavor>,
    {
        for flavor in flavors {
            self.add_flavor(flavor);
        }
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in tags {
            self.add_tag(tag.as_ref());
        }
        self
    }

    pub fn flavors(&self) -> &[MediaPackageElementFlavor] {
        &self.flavors
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn exclude_tags(&self) -> impl Iterator<Item = &str> {
        self.exclude_tags.iter().map(String::as_str)
    }

    /// Whether neither flavors nor tags to select by are configured.
    pub fn is_empty(&self) -> bool {
        self.flavors.is_empty() && self.tags.is_empty()
    }

    /// Matching elements of `media_package` in package order.
    pub fn select<'a>(
        &self,
        media_package: &'a MediaPackage,
        with_tags_and_flavors: bool,
    ) -> Vec<&'a MediaPackageElement> {
        self.select_from(media_package.elements(), with_tags_and_flavors)
    }

    /// Matching elements of an arbitrary element list, e.g. the contents of
    /// a publication.
    pub fn select_from<'a, I>(&self, elements: I, with_tags_and_flavors: bool) -> Vec<&'a MediaPackageElement>
    where
        I: IntoIterator<Item = &'a MediaPackageElement>,
    {
        if self.is_empty() {
            return Vec::new();
        }
        elements
            .into_iter()
            .filter(|element| self.matches(element, with_tags_and_flavors))
            .collect()
    }

    pub fn matches(&self, element: &MediaPackageElement, with_tags_and_flavors: bool) -> bool {
        if self
            .element_type
            .map(|t| t != element.element_type())
            .unwrap_or(false)
        {
            return false;
        }
        if self.exclude_tags.iter().any(|tag| element.contains_tag(tag)) {
            return false;
        }

        let flavor_match = self
            .flavors
            .iter()
            .any(|flavor| flavor.matches_opt(element.flavor()));
        let tag_match = self.tags.iter().any(|tag| element.contains_tag(tag));

        if with_tags_and_flavors {
            (self.flavors.is_empty() || flavor_match) && (self.tags.is_empty() || tag_match)
        } else {
            flavor_match || tag_match
        }
    }
}
