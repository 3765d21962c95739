//! Series Service Abstraction

use async_trait::async_trait;
use core_mediapackage::XmlNode;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Namespace of serialized access control lists.
pub const ACL_NAMESPACE: &str = "http://org.opencastproject.security";

/// Single access control entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlEntry {
    pub role: String,
    pub action: String,
    pub allow: bool,
}

impl AccessControlEntry {
    pub fn new(role: impl Into<String>, action: impl Into<String>, allow: bool) -> Self {
        Self {
            role: role.into(),
            action: action.into(),
            allow,
        }
    }
}

/// Access control list of a series or episode
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlList {
    pub entries: Vec<AccessControlEntry>,
}

impl AccessControlList {
    pub fn new(entries: Vec<AccessControlEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `<acl><ace><role/><action/><allow/></ace>...</acl>`
    pub fn to_xml(&self) -> Result<String> {
        let mut root = XmlNode::new("acl").with_attribute("xmlns", ACL_NAMESPACE);
        for entry in &self.entries {
            root.push(
                XmlNode::new("ace")
                    .with_child(XmlNode::new("role").with_text(entry.role.as_str()))
                    .with_child(XmlNode::new("action").with_text(entry.action.as_str()))
                    .with_child(XmlNode::new("allow").with_text(entry.allow.to_string())),
            );
        }
        Ok(root.to_xml_string()?)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let root = XmlNode::parse(xml)?;
        if root.local_name() != "acl" {
            return Err(BridgeError::OperationFailed(format!(
                "expected <acl> but found <{}>",
                root.name
            )));
        }
        let entries = root
            .children_named("ace")
            .map(|ace| {
                AccessControlEntry::new(
                    ace.child_text("role").unwrap_or_default(),
                    ace.child_text("action").unwrap_or_default(),
                    ace.child_text("allow")
                        .map(|v| v.eq_ignore_ascii_case("true"))
                        .unwrap_or(false),
                )
            })
            .collect();
        Ok(Self { entries })
    }
}

/// Series metadata lookup
#[async_trait]
pub trait SeriesService: Send + Sync {
    /// Dublin Core catalog of the series as XML.
    ///
    /// Fails with `NotFound` when the series does not exist.
    async fn get_series(&self, series_id: &str) -> Result<String>;

    async fn get_series_access_control(&self, series_id: &str) -> Result<AccessControlList>;
}
