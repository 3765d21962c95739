//! # Operation Configuration
//!
//! Typed access to the string configuration of an operation.
//!
//! ## Overview
//!
//! All lookups are trimmed; blank values count as missing. The common
//! element-selection keys come in a singular and a plural form
//! (`source-flavor` / `source-flavors`), and each handler declares per key
//! family whether it takes none, exactly one or many values:
//!
//! ```ignore
//! let config = operation.tags_and_flavors(
//!     Configuration::Many, // source-tags, falls back to source-tag
//!     Configuration::Many, // source-flavors, falls back to source-flavor
//!     Configuration::Many, // target-tags
//!     Configuration::One,  // target-flavor, required
//! )?;
//! ```

use core_mediapackage::MediaPackageElementFlavor;

use crate::error::{Result, WorkflowOperationError};
use crate::instance::{WorkflowInstance, WorkflowOperationInstance};

pub const SOURCE_TAG: &str = "source-tag";
pub const SOURCE_TAGS: &str = "source-tags";
pub const SOURCE_FLAVOR: &str = "source-flavor";
pub const SOURCE_FLAVORS: &str = "source-flavors";
pub const TARGET_TAG: &str = "target-tag";
pub const TARGET_TAGS: &str = "target-tags";
pub const TARGET_FLAVOR: &str = "target-flavor";
pub const TARGET_FLAVORS: &str = "target-flavors";

/// How many values a key family accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Configuration {
    /// Not read at all
    None,
    /// The singular key is required
    One,
    /// The plural key, or the singular key when the plural one is blank
    Many,
}

/// Source and target selection parsed from an operation's configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfiguredTagsAndFlavors {
    pub source_tags: Vec<String>,
    pub source_flavors: Vec<MediaPackageElementFlavor>,
    pub target_tags: Vec<String>,
    pub target_flavors: Vec<MediaPackageElementFlavor>,
}

impl ConfiguredTagsAndFlavors {
    /// Whether neither source tags nor source flavors were configured.
    pub fn has_no_source(&self) -> bool {
        self.source_tags.is_empty() && self.source_flavors.is_empty()
    }

    pub fn single_target_flavor(&self) -> Option<&MediaPackageElementFlavor> {
        self.target_flavors.first()
    }
}

/// Splits a comma separated list, trimming items and dropping blank ones.
pub fn as_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_flavor(value: &str) -> Result<MediaPackageElementFlavor> {
    MediaPackageElementFlavor::parse(value)
        .map_err(|_| WorkflowOperationError::invalid_flavor(value))
}

fn is_true(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "true" | "yes" | "on" | "y" | "t"
    )
}

/// The operation a handler was started for.
pub fn current_operation(workflow: &WorkflowInstance) -> Result<&WorkflowOperationInstance> {
    workflow.current_operation().ok_or_else(|| {
        WorkflowOperationError::IllegalState(format!(
            "workflow {} has no current operation",
            workflow.id()
        ))
    })
}

impl WorkflowOperationInstance {
    /// Trimmed value of `key`, `None` when missing or blank.
    pub fn opt_config(&self, key: &str) -> Option<&str> {
        self.configuration(key)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Trimmed value of a mandatory key.
    ///
    /// # Errors
    ///
    /// `MissingConfiguration` when the key is missing or blank.
    pub fn config(&self, key: &str) -> Result<&str> {
        self.opt_config(key)
            .ok_or_else(|| WorkflowOperationError::MissingConfiguration {
                key: key.to_string(),
            })
    }

    pub fn config_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.opt_config(key).unwrap_or(default)
    }

    /// `true` for `true`, `yes`, `on` and their abbreviations, ignoring case.
    pub fn bool_config(&self, key: &str) -> bool {
        self.opt_config(key).map(is_true).unwrap_or(false)
    }

    pub fn list_config(&self, key: &str) -> Vec<String> {
        as_list(self.opt_config(key))
    }

    pub fn flavor_config(&self, key: &str) -> Result<Option<MediaPackageElementFlavor>> {
        self.opt_config(key).map(parse_flavor).transpose()
    }

    pub fn flavors_config(&self, key: &str) -> Result<Vec<MediaPackageElementFlavor>> {
        self.list_config(key)
            .iter()
            .map(|value| parse_flavor(value))
            .collect()
    }

    /// Reads the source and target tag and flavor keys with the given
    /// arity per family.
    pub fn tags_and_flavors(
        &self,
        source_tags: Configuration,
        source_flavors: Configuration,
        target_tags: Configuration,
        target_flavors: Configuration,
    ) -> Result<ConfiguredTagsAndFlavors> {
        let source_flavors = self
            .values(source_flavors, SOURCE_FLAVOR, SOURCE_FLAVORS)?
            .iter()
            .map(|value| parse_flavor(value))
            .collect::<Result<Vec<_>>>()?;
        let target_flavors = self
            .values(target_flavors, TARGET_FLAVOR, TARGET_FLAVORS)?
            .iter()
            .map(|value| parse_flavor(value))
            .collect::<Result<Vec<_>>>()?;

        Ok(ConfiguredTagsAndFlavors {
            source_tags: self.values(source_tags, SOURCE_TAG, SOURCE_TAGS)?,
            source_flavors,
            target_tags: self.values(target_tags, TARGET_TAG, TARGET_TAGS)?,
            target_flavors,
        })
    }

    fn values(&self, arity: Configuration, single: &str, plural: &str) -> Result<Vec<String>> {
        match arity {
            Configuration::None => Ok(Vec::new()),
            Configuration::One => self
                .opt_config(single)
                .map(|value| vec![value.to_string()])
                .ok_or_else(|| WorkflowOperationError::must_be_set(single)),
            Configuration::Many => {
                let values = self.list_config(plural);
                if values.is_empty() {
                    Ok(self
                        .opt_config(single)
                        .map(|value| vec![value.to_string()])
                        .unwrap_or_default())
                } else {
                    Ok(values)
                }
            }
        }
    }
}
