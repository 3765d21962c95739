//! Element flavors
//!
//! A flavor is a `type/subtype` pair describing what an element is used for
//! (e.g. `presenter/source`, `dublincore/episode`). Either part may be the
//! wildcard `*`, which matches any value when flavors are compared with
//! [`MediaPackageElementFlavor::matches`].

use crate::error::{MediaPackageError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Wildcard usable for either the type or the subtype of a flavor.
pub const WILDCARD: &str = "*";

/// Separator between type and subtype in the string form.
pub const SEPARATOR: char = '/';

/// Two-part semantic tag attached to media package elements.
///
/// Equality and hashing only consider the (normalized) type and subtype; the
/// description and equivalents are informational.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MediaPackageElementFlavor {
    flavor_type: String,
    subtype: String,
    description: Option<String>,
    equivalents: Vec<MediaPackageElementFlavor>,
}

impl MediaPackageElementFlavor {
    /// Creates a flavor from its parts. Both parts are trimmed and lower-cased.
    pub fn new(flavor_type: impl AsRef<str>, subtype: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            flavor_type: check_part(flavor_type.as_ref(), "type")?,
            subtype: check_part(subtype.as_ref(), "subtype")?,
            description: None,
            equivalents: Vec::new(),
        })
    }

    /// Parses the `type/subtype` form.
    ///
    /// # Errors
    ///
    /// Fails when the separator is missing, leading or trailing.
    pub fn parse(s: &str) -> Result<Self> {
        let separator = s
            .find(SEPARATOR)
            .ok_or_else(|| MediaPackageError::InvalidFlavor(format!("{} is not a valid flavor", s)))?;
        if separator < 1 || separator == s.len() - 1 {
            return Err(MediaPackageError::InvalidFlavor(format!(
                "{} is not a valid flavor",
                s
            )));
        }
        Self::new(&s[..separator], &s[separator + 1..])
    }

    /// The `*/*` flavor, matching every other flavor.
    pub fn any() -> Self {
        Self::unchecked(WILDCARD, WILDCARD)
    }

    /// `<type>/*`
    pub fn flavor_with_type(flavor_type: &str) -> Result<Self> {
        Self::new(flavor_type, WILDCARD)
    }

    /// `*/<subtype>`
    pub fn flavor_with_subtype(subtype: &str) -> Result<Self> {
        Self::new(WILDCARD, subtype)
    }

    pub(crate) fn unchecked(flavor_type: &str, subtype: &str) -> Self {
        Self {
            flavor_type: flavor_type.to_string(),
            subtype: subtype.to_string(),
            description: None,
            equivalents: Vec::new(),
        }
    }

    pub fn flavor_type(&self) -> &str {
        &self.flavor_type
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Registers a flavor that is considered equivalent to this one.
    pub fn add_equivalent(&mut self, flavor: MediaPackageElementFlavor) {
        if !self.equivalents.contains(&flavor) {
            self.equivalents.push(flavor);
        }
    }

    pub fn equivalents(&self) -> &[MediaPackageElementFlavor] {
        &self.equivalents
    }

    /// Returns `true` if `other` equals this flavor or one of its equivalents.
    pub fn is_equivalent_to(&self, other: &MediaPackageElementFlavor) -> bool {
        self == other || self.equivalents.iter().any(|e| e == other)
    }

    /// Wildcard-aware comparison. A `*` on either side matches any value of
    /// the corresponding part.
    pub fn matches(&self, other: &MediaPackageElementFlavor) -> bool {
        part_matches(&self.flavor_type, &other.flavor_type)
            && part_matches(&self.subtype, &other.subtype)
    }

    /// Like [`matches`](Self::matches) but `None` never matches.
    pub fn matches_opt(&self, other: Option<&MediaPackageElementFlavor>) -> bool {
        other.map(|o| self.matches(o)).unwrap_or(false)
    }

    /// Replaces the wildcard parts of this flavor with the parts of `target`.
    pub fn apply_to(&self, target: &MediaPackageElementFlavor) -> MediaPackageElementFlavor {
        let flavor_type = if self.flavor_type == WILDCARD {
            target.flavor_type.as_str()
        } else {
            self.flavor_type.as_str()
        };
        let subtype = if self.subtype == WILDCARD {
            target.subtype.as_str()
        } else {
            self.subtype.as_str()
        };
        Self::unchecked(flavor_type, subtype)
    }

    pub fn has_wildcard(&self) -> bool {
        self.flavor_type == WILDCARD || self.subtype == WILDCARD
    }
}

fn check_part(part: &str, name: &str) -> Result<String> {
    let normalized = part.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(MediaPackageError::InvalidFlavor(format!(
            "flavor {} must not be empty",
            name
        )));
    }
    if normalized.contains(SEPARATOR) {
        return Err(MediaPackageError::InvalidFlavor(format!(
            "flavor {} '{}' must not contain '{}'",
            name, normalized, SEPARATOR
        )));
    }
    Ok(normalized)
}

fn part_matches(a: &str, b: &str) -> bool {
    a == WILDCARD || b == WILDCARD || a == b
}

impl PartialEq for MediaPackageElementFlavor {
    fn eq(&self, other: &Self) -> bool {
        self.flavor_type == other.flavor_type && self.subtype == other.subtype
    }
}

impl Eq for MediaPackageElementFlavor {}

impl Hash for MediaPackageElementFlavor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.flavor_type.hash(state);
        self.subtype.hash(state);
    }
}

impl PartialOrd for MediaPackageElementFlavor {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MediaPackageElementFlavor {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (&self.flavor_type, &self.subtype).cmp(&(&other.flavor_type, &other.subtype))
    }
}

impl fmt::Display for MediaPackageElementFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.flavor_type, SEPARATOR, self.subtype)
    }
}

impl FromStr for MediaPackageElementFlavor {
    type Err = MediaPackageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MediaPackageElementFlavor {
    type Error = MediaPackageError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<MediaPackageElementFlavor> for String {
    fn from(flavor: MediaPackageElementFlavor) -> Self {
        flavor.to_string()
    }
}

// =============================================================================
// Well-known flavors
// =============================================================================

/// `dublincore/episode`
pub fn episode_dublin_core() -> MediaPackageElementFlavor {
    MediaPackageElementFlavor::unchecked("dublincore", "episode")
}

/// `dublincore/series`
pub fn series_dublin_core() -> MediaPackageElementFlavor {
    MediaPackageElementFlavor::unchecked("dublincore", "series")
}

/// `security/xacml+series`
pub fn xacml_policy_series() -> MediaPackageElementFlavor {
    MediaPackageElementFlavor::unchecked("security", "xacml+series")
}

/// `security/xacml+episode`
pub fn xacml_policy_episode() -> MediaPackageElementFlavor {
    MediaPackageElementFlavor::unchecked("security", "xacml+episode")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flavor(s: &str) -> MediaPackageElementFlavor {
        MediaPackageElementFlavor::parse(s).unwrap()
    }

    #[test]
    fn test_parse_flavor() {
        let f = flavor("presenter/source");
        assert_eq!(f.flavor_type(), "presenter");
        assert_eq!(f.subtype(), "source");
        assert_eq!(f.to_string(), "presenter/source");
    }

    #[test]
    fn test_parse_normalizes_case_and_whitespace() {
        let f = flavor(" Presenter /SOURCE");
        assert_eq!(f, flavor("presenter/source"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(MediaPackageElementFlavor::parse("bogus").is_err());
        assert!(MediaPackageElementFlavor::parse("/source").is_err());
        assert!(MediaPackageElementFlavor::parse("presenter/").is_err());
        assert!(MediaPackageElementFlavor::parse("a/b/c").is_err());
        assert!(MediaPackageElementFlavor::parse("").is_err());
    }

    #[test]
    fn test_wildcard_matching_is_commutative() {
        let pairs = [
            ("*/*", "presenter/source"),
            ("presenter/*", "presenter/source"),
            ("*/source", "presenter/source"),
            ("presenter/source", "presenter/source"),
            ("presenter/source", "presentation/source"),
            ("*/delivery", "presenter/source"),
        ];
        for (a, b) in pairs {
            assert_eq!(flavor(a).matches(&flavor(b)), flavor(b).matches(&flavor(a)));
        }
        assert!(flavor("presenter/*").matches(&flavor("presenter/source")));
        assert!(!flavor("presenter/*").matches(&flavor("presentation/source")));
        assert!(!flavor("*/delivery").matches(&flavor("presenter/source")));
        assert!(!flavor("*/*").matches_opt(None));
    }

    #[test]
    fn test_equality_ignores_description_and_equivalents() {
        let mut a = flavor("presenter/source").with_description("camera");
        a.add_equivalent(flavor("camera/source"));
        let b = flavor("presenter/source");
        assert_eq!(a, b);
        assert!(a.is_equivalent_to(&flavor("camera/source")));
        assert!(!b.is_equivalent_to(&flavor("camera/source")));
        // wildcards are not equal to concrete values
        assert_ne!(flavor("*/source"), b);
    }

    #[test]
    fn test_apply_to() {
        let target = flavor("*/delivery");
        let applied = target.apply_to(&flavor("presenter/source"));
        assert_eq!(applied, flavor("presenter/delivery"));

        let concrete = flavor("composite/delivery");
        assert_eq!(concrete.apply_to(&flavor("presenter/source")), concrete);
    }

    #[test]
    fn test_string_conversions() {
        let f: MediaPackageElementFlavor = "dublincore/episode".parse().unwrap();
        assert_eq!(String::from(f.clone()), "dublincore/episode");
        assert_eq!(episode_dublin_core(), f);
        assert!(MediaPackageElementFlavor::try_from("nope".to_string()).is_err());
    }
}
