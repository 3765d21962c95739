//! Element and media package builders
//!
//! Elements are created by a chain of [`ElementBuilderPlugin`]s. The
//! [`MediaPackageElementBuilder`] asks each plugin, highest priority first,
//! whether it accepts a URI or manifest node; the first one that does builds
//! the element. More than one accepting plugin is logged as a warning.

use crate::element::{ElementType, MediaPackageElement};
use crate::error::{MediaPackageError, Result};
use crate::flavor::MediaPackageElementFlavor;
use crate::mediapackage::MediaPackage;
use crate::mime::MimeType;
use crate::parser;
use crate::xml::XmlNode;
use tracing::{debug, warn};
use url::Url;

/// Strategy that knows how to create one kind of element.
pub trait ElementBuilderPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Plugins with a higher priority are asked first.
    fn priority(&self) -> i32 {
        0
    }

    fn accept_uri(
        &self,
        uri: &Url,
        element_type: Option<ElementType>,
        flavor: Option<&MediaPackageElementFlavor>,
    ) -> bool;

    fn accept_manifest(&self, node: &XmlNode) -> bool;

    fn accept_type(&self, element_type: ElementType) -> bool;

    fn element_from_uri(&self, uri: &Url) -> Result<MediaPackageElement>;

    fn element_from_manifest(&self, node: &XmlNode) -> Result<MediaPackageElement>;

    fn new_element(
        &self,
        element_type: ElementType,
        flavor: Option<&MediaPackageElementFlavor>,
    ) -> Result<MediaPackageElement>;
}

/// Element type suggested by the MIME type of a location.
fn guess_type(uri: &Url) -> Option<ElementType> {
    let mime = MimeType::from_uri(uri)?;
    let element_type = if mime.is_video() || mime.is_audio() {
        ElementType::Track
    } else if mime.is_xml() || mime.subtype() == "json" {
        ElementType::Catalog
    } else {
        ElementType::Attachment
    };
    Some(element_type)
}

/// Default plugin for one element type.
#[derive(Debug, Clone)]
pub struct TypedElementPlugin {
    element_type: ElementType,
    priority: i32,
}

impl TypedElementPlugin {
    pub fn new(element_type: ElementType) -> Self {
        let priority = match element_type {
            ElementType::Other => -1,
            _ => 0,
        };
        Self {
            element_type,
            priority,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl ElementBuilderPlugin for TypedElementPlugin {
    fn name(&self) -> &'static str {
        self.element_type.as_str()
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn accept_uri(
        &self,
        uri: &Url,
        element_type: Option<ElementType>,
        _flavor: Option<&MediaPackageElementFlavor>,
    ) -> bool {
        match element_type {
            Some(requested) => requested == self.element_type,
            // Publications are never guessed from a location
            None => match guess_type(uri) {
                Some(guessed) => guessed == self.element_type,
                None => self.element_type == ElementType::Other,
            },
        }
    }

    fn accept_manifest(&self, node: &XmlNode) -> bool {
        node.local_name()
            .parse::<ElementType>()
            .map(|t| t == self.element_type)
            .unwrap_or(false)
    }

    fn accept_type(&self, element_type: ElementType) -> bool {
        element_type == self.element_type
    }

    fn element_from_uri(&self, uri: &Url) -> Result<MediaPackageElement> {
        let mut element = MediaPackageElement::new(self.element_type, Some(uri.clone()));
        element.set_mime_type(MimeType::from_uri(uri));
        Ok(element)
    }

    fn element_from_manifest(&self, node: &XmlNode) -> Result<MediaPackageElement> {
        parser::element_from_node(node, self.element_type)
    }

    fn new_element(
        &self,
        element_type: ElementType,
        flavor: Option<&MediaPackageElementFlavor>,
    ) -> Result<MediaPackageElement> {
        let mut element = MediaPackageElement::new(element_type, None);
        element.set_flavor(flavor.cloned());
        Ok(element)
    }
}

/// Creates elements through an ordered list of plugins.
pub struct MediaPackageElementBuilder {
    plugins: Vec<Box<dyn ElementBuilderPlugin>>,
}

impl MediaPackageElementBuilder {
    pub fn new(plugins: Vec<Box<dyn ElementBuilderPlugin>>) -> Self {
        let mut builder = Self {
            plugins: Vec::new(),
        };
        for plugin in plugins {
            builder.register(plugin);
        }
        builder
    }

    /// Adds a plugin, keeping the list ordered by descending priority.
    pub fn register(&mut self, plugin: Box<dyn ElementBuilderPlugin>) {
        let position = self
            .plugins
            .iter()
            .position(|p| p.priority() < plugin.priority())
            .unwrap_or(self.plugins.len());
        self.plugins.insert(position, plugin);
    }

    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    fn select<'a, F>(&'a self, what: &str, accept: F) -> Result<&'a dyn ElementBuilderPlugin>
    where
        F: Fn(&dyn ElementBuilderPlugin) -> bool,
    {
        let candidates: Vec<&dyn ElementBuilderPlugin> = self
            .plugins
            .iter()
            .map(|p| p.as_ref())
            .filter(|p| accept(*p))
            .collect();

        match candidates.as_slice() {
            [] => Err(MediaPackageError::UnsupportedElement(format!(
                "no element builder plugin accepts {}",
                what
            ))),
            [single] => Ok(*single),
            [first, ..] => {
                warn!(
                    input = what,
                    plugins = ?candidates.iter().map(|p| p.name()).collect::<Vec<_>>(),
                    chosen = first.name(),
                    "Multiple element builder plugins match, using the one with highest priority"
                );
                Ok(*first)
            }
        }
    }

    pub fn element_from_uri(&self, uri: &Url) -> Result<MediaPackageElement> {
        self.element_from_uri_typed(uri, None, None)
    }

    /// Builds an element for `uri`, optionally of a known type and flavor.
    pub fn element_from_uri_typed(
        &self,
        uri: &Url,
        element_type: Option<ElementType>,
        flavor: Option<&MediaPackageElementFlavor>,
    ) -> Result<MediaPackageElement> {
        let plugin = self.select(uri.as_str(), |p| p.accept_uri(uri, element_type, flavor))?;
        debug!(uri = %uri, plugin = plugin.name(), "Creating element from uri");
        let mut element = plugin.element_from_uri(uri)?;
        if let Some(flavor) = flavor {
            element.set_flavor(Some(flavor.clone()));
        }
        Ok(element)
    }

    pub fn element_from_manifest(&self, node: &XmlNode) -> Result<MediaPackageElement> {
        let plugin = self.select(&node.name, |p| p.accept_manifest(node))?;
        plugin.element_from_manifest(node)
    }

    pub fn new_element(
        &self,
        element_type: ElementType,
        flavor: Option<&MediaPackageElementFlavor>,
    ) -> Result<MediaPackageElement> {
        let plugin = self.select(element_type.as_str(), |p| p.accept_type(element_type))?;
        plugin.new_element(element_type, flavor)
    }
}

impl Default for MediaPackageElementBuilder {
    fn default() -> Self {
        Self::new(vec![
            Box::new(TypedElementPlugin::new(ElementType::Track)),
            Box::new(TypedElementPlugin::new(ElementType::Catalog)),
            Box::new(TypedElementPlugin::new(ElementType::Attachment)),
            Box::new(TypedElementPlugin::new(ElementType::Publication)),
            Box::new(TypedElementPlugin::new(ElementType::Other)),
        ])
    }
}

/// Creates and loads media packages.
#[derive(Default)]
pub struct MediaPackageBuilder {
    element_builder: MediaPackageElementBuilder,
}

impl MediaPackageBuilder {
    pub fn new(element_builder: MediaPackageElementBuilder) -> Self {
        Self { element_builder }
    }

    pub fn element_builder(&self) -> &MediaPackageElementBuilder {
        &self.element_builder
    }

    pub fn create_new(&self) -> MediaPackage {
        MediaPackage::new()
    }

    pub fn create_new_with_id(&self, id: impl Into<String>) -> MediaPackage {
        MediaPackage::with_id(id)
    }

    /// Reads a media package manifest.
    pub fn load_from_xml(&self, xml: &str) -> Result<MediaPackage> {
        let root = XmlNode::parse(xml)?;
        parser::media_package_from_node(&root, &self.element_builder)
    }
}
