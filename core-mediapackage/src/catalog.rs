//! Generic XML catalogs
//!
//! An [`XmlCatalog`] stores flat `name -> [value]` entries keyed by expanded
//! name ([`EName`]). Serialization needs a prefix for every namespace in use,
//! which is tracked by a one-to-one [`Bindings`] table. Using a namespace that
//! was never bound fails with `NamespaceBinding`.

use crate::error::{MediaPackageError, Result};
use crate::xml::XmlNode;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub const XML_NS_URI: &str = "http://www.w3.org/XML/1998/namespace";
pub const XML_NS_PREFIX: &str = "xml";
pub const XSI_NS_URI: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const XSI_NS_PREFIX: &str = "xsi";
pub const DEFAULT_NS_PREFIX: &str = "";

// =============================================================================
// Expanded names
// =============================================================================

/// Namespace-qualified name. An empty namespace means "no namespace".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EName {
    namespace: String,
    local_name: String,
}

impl EName {
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local_name: local_name.into(),
        }
    }

    /// Name without namespace.
    pub fn local(local_name: impl Into<String>) -> Self {
        Self::new("", local_name)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn has_namespace(&self) -> bool {
        !self.namespace.is_empty()
    }
}

impl fmt::Display for EName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_namespace() {
            write!(f, "{{{}}}{}", self.namespace, self.local_name)
        } else {
            f.write_str(&self.local_name)
        }
    }
}

/// `xml:lang`
pub fn xml_lang_attr() -> EName {
    EName::new(XML_NS_URI, "lang")
}

/// `xsi:type`
pub fn xsi_type_attr() -> EName {
    EName::new(XSI_NS_URI, "type")
}

// =============================================================================
// Bindings
// =============================================================================

/// One-to-one mapping between prefixes and namespaces.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    prefix_to_namespace: BTreeMap<String, String>,
    namespace_to_prefix: BTreeMap<String, String>,
    allow_rebind: bool,
}

impl Bindings {
    /// With `allow_rebind` set, existing bindings are silently replaced
    /// instead of raising `NamespaceBinding`.
    pub fn new(allow_rebind: bool) -> Self {
        Self {
            allow_rebind,
            ..Default::default()
        }
    }

    /// Bindings with the `xml` and `xsi` prefixes pre-bound.
    pub fn with_defaults(allow_rebind: bool) -> Self {
        let mut bindings = Self::new(allow_rebind);
        bindings.insert(XML_NS_PREFIX, XML_NS_URI);
        bindings.insert(XSI_NS_PREFIX, XSI_NS_URI);
        bindings
    }

    pub fn allows_rebind(&self) -> bool {
        self.allow_rebind
    }

    pub fn bind_prefix(&mut self, prefix: &str, namespace: &str) -> Result<()> {
        if !self.allow_rebind {
            if let Some(current) = self.prefix_to_namespace.get(prefix) {
                if current != namespace {
                    return Err(MediaPackageError::NamespaceBinding(format!(
                        "prefix '{}' is already bound to namespace '{}'",
                        prefix, current
                    )));
                }
            }
            if let Some(current) = self.namespace_to_prefix.get(namespace) {
                if current != prefix {
                    return Err(MediaPackageError::NamespaceBinding(format!(
                        "prefix '{}' is already bound to namespace '{}'",
                        current, namespace
                    )));
                }
            }
        }
        self.insert(prefix, namespace);
        Ok(())
    }

    fn insert(&mut self, prefix: &str, namespace: &str) {
        // drop stale pairs so the table stays one-to-one after a rebind
        if let Some(old_namespace) = self.prefix_to_namespace.remove(prefix) {
            self.namespace_to_prefix.remove(&old_namespace);
        }
        if let Some(old_prefix) = self.namespace_to_prefix.remove(namespace) {
            self.prefix_to_namespace.remove(&old_prefix);
        }
        self.prefix_to_namespace
            .insert(prefix.to_string(), namespace.to_string());
        self.namespace_to_prefix
            .insert(namespace.to_string(), prefix.to_string());
    }

    pub fn lookup_namespace(&self, prefix: &str) -> Result<&str> {
        self.prefix_to_namespace
            .get(prefix)
            .map(String::as_str)
            .ok_or_else(|| {
                MediaPackageError::NamespaceBinding(format!("prefix '{}' is not bound", prefix))
            })
    }

    pub fn lookup_prefix(&self, namespace: &str) -> Result<&str> {
        self.namespace_to_prefix
            .get(namespace)
            .map(String::as_str)
            .ok_or_else(|| {
                MediaPackageError::NamespaceBinding(format!(
                    "namespace '{}' is not bound to a prefix",
                    namespace
                ))
            })
    }

    pub fn is_namespace_bound(&self, namespace: &str) -> bool {
        self.namespace_to_prefix.contains_key(namespace)
    }

    pub fn is_prefix_bound(&self, prefix: &str) -> bool {
        self.prefix_to_namespace.contains_key(prefix)
    }
}

// =============================================================================
// Entries
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    name: EName,
    value: String,
    attributes: BTreeMap<EName, String>,
}

impl CatalogEntry {
    pub fn new(name: EName, value: impl Into<String>, attributes: BTreeMap<EName, String>) -> Self {
        Self {
            name,
            value: value.into(),
            attributes,
        }
    }

    pub fn name(&self) -> &EName {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn has_attributes(&self) -> bool {
        !self.attributes.is_empty()
    }

    pub fn attributes(&self) -> &BTreeMap<EName, String> {
        &self.attributes
    }

    pub fn attribute(&self, name: &EName) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn language(&self) -> Option<&str> {
        self.attribute(&xml_lang_attr())
    }
}

impl Ord for CatalogEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.attributes.len().cmp(&other.attributes.len()))
            .then_with(|| self.attributes.iter().cmp(other.attributes.iter()))
            .then_with(|| self.value.cmp(&other.value))
    }
}

impl PartialOrd for CatalogEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone)]
pub struct XmlCatalog {
    root: EName,
    data: BTreeMap<EName, Vec<CatalogEntry>>,
    bindings: Bindings,
    include_empty: bool,
}

impl XmlCatalog {
    pub fn new(root: EName, bindings: Bindings) -> Self {
        Self {
            root,
            data: BTreeMap::new(),
            bindings,
            include_empty: false,
        }
    }

    pub fn root(&self) -> &EName {
        &self.root
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn bind_prefix(&mut self, prefix: &str, namespace: &str) -> Result<()> {
        self.bindings.bind_prefix(prefix, namespace)
    }

    /// When set, blank values are kept (used to clear values on merge).
    pub fn include_empty(&mut self, include_empty: bool) {
        self.include_empty = include_empty;
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn add_element(&mut self, name: EName, value: impl Into<String>) {
        self.add_entry(CatalogEntry::new(name, value, BTreeMap::new()));
    }

    pub fn add_localized_element(&mut self, name: EName, value: impl Into<String>, language: &str) {
        let mut attributes = BTreeMap::new();
        attributes.insert(xml_lang_attr(), language.to_string());
        self.add_entry(CatalogEntry::new(name, value, attributes));
    }

    /// Adds a value with an `xsi:type` attribute. The type's namespace must
    /// be bound.
    pub fn add_typed_element(
        &mut self,
        name: EName,
        value: impl Into<String>,
        value_type: &EName,
    ) -> Result<()> {
        let mut attributes = BTreeMap::new();
        attributes.insert(xsi_type_attr(), self.to_qname(value_type)?);
        self.add_entry(CatalogEntry::new(name, value, attributes));
        Ok(())
    }

    pub fn add_typed_localized_element(
        &mut self,
        name: EName,
        value: impl Into<String>,
        language: &str,
        value_type: &EName,
    ) -> Result<()> {
        let mut attributes = BTreeMap::new();
        attributes.insert(xml_lang_attr(), language.to_string());
        attributes.insert(xsi_type_attr(), self.to_qname(value_type)?);
        self.add_entry(CatalogEntry::new(name, value, attributes));
        Ok(())
    }

    pub fn add_element_with_attributes(
        &mut self,
        name: EName,
        value: impl Into<String>,
        attributes: BTreeMap<EName, String>,
    ) {
        self.add_entry(CatalogEntry::new(name, value, attributes));
    }

    fn add_entry(&mut self, entry: CatalogEntry) {
        if entry.value.trim().is_empty() && !self.include_empty {
            return;
        }
        self.data.entry(entry.name.clone()).or_default().push(entry);
    }

    pub fn remove_element(&mut self, name: &EName) {
        self.data.remove(name);
    }

    /// Removes the values of `name` whose language equals `language`
    /// (`None` removes the values without language).
    pub fn remove_localized_values(&mut self, name: &EName, language: Option<&str>) {
        if let Some(entries) = self.data.get_mut(name) {
            entries.retain(|e| e.language() != language);
            if entries.is_empty() {
                self.data.remove(name);
            }
        }
    }

    pub fn values(&self, name: &EName) -> &[CatalogEntry] {
        self.data.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn localized_values(&self, name: &EName, language: Option<&str>) -> Vec<&CatalogEntry> {
        self.values(name)
            .iter()
            .filter(|e| e.language() == language)
            .collect()
    }

    pub fn first_value(&self, name: &EName) -> Option<&CatalogEntry> {
        self.values(name).first()
    }

    pub fn first_value_with_attribute(
        &self,
        name: &EName,
        attribute: &EName,
        value: Option<&str>,
    ) -> Option<&CatalogEntry> {
        self.values(name)
            .iter()
            .find(|e| e.attribute(attribute) == value)
    }

    pub fn first_localized_value(&self, name: &EName, language: Option<&str>) -> Option<&CatalogEntry> {
        self.first_value_with_attribute(name, &xml_lang_attr(), language)
    }

    pub fn first_typed_value(&self, name: &EName, value_type: &str) -> Option<&CatalogEntry> {
        self.first_value_with_attribute(name, &xsi_type_attr(), Some(value_type))
    }

    pub fn has_values(&self, name: &EName) -> bool {
        !self.values(name).is_empty()
    }

    pub fn element_names(&self) -> impl Iterator<Item = &EName> {
        self.data.keys()
    }

    pub fn entries_sorted(&self) -> Vec<&CatalogEntry> {
        let mut entries: Vec<&CatalogEntry> = self.data.values().flatten().collect();
        entries.sort();
        entries
    }

    // -------------------------------------------------------------------------
    // Qualified names
    // -------------------------------------------------------------------------

    pub fn to_qname(&self, name: &EName) -> Result<String> {
        if !name.has_namespace() {
            return Ok(name.local_name.clone());
        }
        let prefix = self.bindings.lookup_prefix(&name.namespace)?;
        Ok(qualify(prefix, &name.local_name))
    }

    pub fn to_ename(&self, qname: &str) -> Result<EName> {
        let (prefix, local_name) = split_qname(qname)?;
        self.to_ename_parts(prefix, local_name)
    }

    pub fn to_ename_parts(&self, prefix: &str, local_name: &str) -> Result<EName> {
        if prefix == DEFAULT_NS_PREFIX {
            let namespace = self.bindings.lookup_namespace(prefix).unwrap_or_default();
            return Ok(EName::new(namespace, local_name));
        }
        Ok(EName::new(self.bindings.lookup_namespace(prefix)?, local_name))
    }

    // -------------------------------------------------------------------------
    // Serialization
    // -------------------------------------------------------------------------

    pub fn to_xml_node(&self) -> Result<XmlNode> {
        let mut used = BTreeSet::new();
        used.insert(self.root.namespace.clone());

        let mut children = Vec::new();
        for entry in self.entries_sorted() {
            used.insert(entry.name.namespace.clone());
            let mut node = XmlNode::new(self.to_qname(&entry.name)?).with_text(entry.value.as_str());
            for (attribute, value) in &entry.attributes {
                used.insert(attribute.namespace.clone());
                if *attribute == xsi_type_attr() {
                    // declare the namespace of the type as well, if it is one we know
                    if let Ok(type_name) = self.to_ename(value) {
                        if self.bindings.is_namespace_bound(&type_name.namespace) {
                            used.insert(type_name.namespace);
                        }
                    }
                }
                node.set_attribute(self.to_qname(attribute)?, value.as_str());
            }
            children.push(node);
        }

        let mut root = XmlNode::new(self.to_qname(&self.root)?);
        for namespace in used.iter().filter(|ns| !ns.is_empty() && *ns != XML_NS_URI) {
            let prefix = self.bindings.lookup_prefix(namespace)?;
            let attribute = if prefix == DEFAULT_NS_PREFIX {
                "xmlns".to_string()
            } else {
                format!("xmlns:{}", prefix)
            };
            root.set_attribute(attribute, namespace.as_str());
        }
        root.children = children;
        Ok(root)
    }

    pub fn to_xml_string(&self) -> Result<String> {
        self.to_xml_node()?.to_xml_string()
    }

    /// Reads a flat catalog document into a new catalog using `bindings`.
    ///
    /// Namespaces declared by the document are bound as well unless their
    /// namespace or prefix is already taken.
    pub fn from_xml(xml: &str, root: EName, bindings: Bindings) -> Result<Self> {
        let node = XmlNode::parse(xml)?;
        if node.local_name() != root.local_name() {
            return Err(MediaPackageError::Manifest(format!(
                "expected <{}> but found <{}>",
                root.local_name(),
                node.name
            )));
        }

        let mut catalog = Self::new(root, bindings);

        // document-local prefix table
        let mut scope: BTreeMap<String, String> = BTreeMap::new();
        scope.insert(XML_NS_PREFIX.to_string(), XML_NS_URI.to_string());
        catalog.declare(&mut scope, &node.attributes)?;

        for child in &node.children {
            let mut child_scope = scope.clone();
            catalog.declare(&mut child_scope, &child.attributes)?;
            let name = resolve(&child_scope, &child.name, true)?;
            let mut attributes = BTreeMap::new();
            for (key, value) in &child.attributes {
                if namespace_declaration(key).is_some() {
                    continue;
                }
                attributes.insert(resolve(&child_scope, key, false)?, value.clone());
            }
            catalog.add_element_with_attributes(name, child.text(), attributes);
        }

        Ok(catalog)
    }

    /// Adds the `xmlns` declarations among `attributes` to `scope` and binds
    /// the ones whose namespace and prefix are both still free.
    fn declare(
        &mut self,
        scope: &mut BTreeMap<String, String>,
        attributes: &[(String, String)],
    ) -> Result<()> {
        for (key, value) in attributes {
            let Some(prefix) = namespace_declaration(key) else {
                continue;
            };
            scope.insert(prefix.to_string(), value.clone());
            if !self.bindings.is_namespace_bound(value) && !self.bindings.is_prefix_bound(prefix) {
                self.bindings.bind_prefix(prefix, value)?;
            }
        }
        Ok(())
    }
}

/// Prefix declared by an `xmlns` attribute, `""` for the default namespace.
fn namespace_declaration(key: &str) -> Option<&str> {
    if key == "xmlns" {
        Some(DEFAULT_NS_PREFIX)
    } else {
        key.strip_prefix("xmlns:")
    }
}

fn qualify(prefix: &str, local_name: &str) -> String {
    if prefix == DEFAULT_NS_PREFIX {
        local_name.to_string()
    } else {
        format!("{}:{}", prefix, local_name)
    }
}

fn split_qname(qname: &str) -> Result<(&str, &str)> {
    let parts: Vec<&str> = qname.splitn(3, ':').collect();
    match parts.as_slice() {
        [local] => Ok((DEFAULT_NS_PREFIX, local)),
        [prefix, local] => Ok((prefix, local)),
        _ => Err(MediaPackageError::InvalidArgument {
            field: "qname".to_string(),
            message: format!("local name of '{}' must not contain ':'", qname),
        }),
    }
}

/// Resolves a qualified name against a document scope. Unprefixed attributes
/// have no namespace; unprefixed elements take the default namespace.
fn resolve(scope: &BTreeMap<String, String>, qname: &str, is_element: bool) -> Result<EName> {
    let (prefix, local_name) = split_qname(qname)?;
    if prefix == DEFAULT_NS_PREFIX {
        let namespace = if is_element {
            scope.get(DEFAULT_NS_PREFIX).cloned().unwrap_or_default()
        } else {
            String::new()
        };
        return Ok(EName::new(namespace, local_name));
    }
    scope
        .get(prefix)
        .map(|namespace| EName::new(namespace.clone(), local_name))
        .ok_or_else(|| {
            MediaPackageError::NamespaceBinding(format!(
                "prefix '{}' is not declared in the document",
                prefix
            ))
        })
}
