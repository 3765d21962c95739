//! Target tag changes
//!
//! Target tags are written as `+tag` (add), `-tag` (remove) or plain `tag`.
//! As soon as one plain tag is configured the element's tags are replaced by
//! the plain tags and the prefixed ones are ignored.

use core_mediapackage::MediaPackageElement;
use std::collections::BTreeSet;

pub const ADD_PREFIX: char = '+';
pub const REMOVE_PREFIX: char = '-';

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDelta {
    add: BTreeSet<String>,
    remove: BTreeSet<String>,
    replace: BTreeSet<String>,
}

impl TagDelta {
    pub fn parse<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut delta = Self::default();
        for tag in tags {
            let tag = tag.as_ref().trim();
            if let Some(removed) = tag.strip_prefix(REMOVE_PREFIX) {
                insert_non_blank(&mut delta.remove, removed);
            } else if let Some(added) = tag.strip_prefix(ADD_PREFIX) {
                insert_non_blank(&mut delta.add, added);
            } else {
                insert_non_blank(&mut delta.replace, tag);
            }
        }
        delta
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty() && self.replace.is_empty()
    }

    /// Whether the delta replaces the whole tag set.
    pub fn is_override(&self) -> bool {
        !self.replace.is_empty()
    }

    pub fn apply(&self, element: &mut MediaPackageElement) {
        if self.is_override() {
            element.clear_tags();
            for tag in &self.replace {
                element.add_tag(tag.as_str());
            }
            return;
        }
        for tag in &self.remove {
            element.remove_tag(tag);
        }
        for tag in &self.add {
            element.add_tag(tag.as_str());
        }
    }
}

fn insert_non_blank(set: &mut BTreeSet<String>, tag: &str) {
    let tag = tag.trim();
    if !tag.is_empty() {
        set.insert(tag.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn tagged(tags: &[&str]) -> MediaPackageElement {
        let mut element = MediaPackageElement::track(Url::parse("http://localhost/t.mp4").unwrap());
        for tag in tags {
            element.add_tag(*tag);
        }
        element
    }

    #[test]
    fn test_plain_tag_overrides_everything() {
        let mut element = tagged(&["b", "d"]);
        TagDelta::parse(["+a", "-b", "c"]).apply(&mut element);
        assert_eq!(element.tags(), vec!["c"]);
    }

    #[test]
    fn test_add_and_remove() {
        let mut element = tagged(&["b", "d"]);
        let delta = TagDelta::parse(["+a", "-b", " "]);
        assert!(!delta.is_override());
        delta.apply(&mut element);
        assert_eq!(element.tags(), vec!["a", "d"]);
    }

    #[test]
    fn test_empty_delta_keeps_tags() {
        let mut element = tagged(&["b"]);
        let delta = TagDelta::parse(Vec::<String>::new());
        assert!(delta.is_empty());
        delta.apply(&mut element);
        assert_eq!(element.tags(), vec!["b"]);
    }
}
