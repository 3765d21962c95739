//! Media package manifest (de)serialization
//!
//! Layout of a manifest:
//!
//! ```text
//! <mediapackage xmlns="http://mediapackage.opencastproject.org" id=".." start=".." duration="..">
//!   <title/> <series/> <seriestitle/> <creators/> <contributors/> <subjects/> <license/> <language/>
//!   <media>         track*       </media>
//!   <metadata>      catalog*     </metadata>
//!   <attachments>   attachment*  </attachments>
//!   <publications>  publication* </publications>
//!   <unclassified>  other*       </unclassified>
//! </mediapackage>
//! ```
//!
//! Groups are only written when non-empty. Tracks are written in the order of
//! their location.

use crate::builder::{MediaPackageBuilder, MediaPackageElementBuilder};
use crate::element::{ChecksumType, Checksum, ElementBody, ElementType, MediaPackageElement};
use crate::error::{MediaPackageError, Result};
use crate::flavor::MediaPackageElementFlavor;
use crate::mediapackage::MediaPackage;
use crate::mime::MimeType;
use crate::reference::{MediaPackageReference, TYPE_MEDIAPACKAGE};
use crate::xml::XmlNode;
use chrono::{DateTime, SecondsFormat, Utc};
use url::Url;

/// Default namespace of manifests.
pub const MEDIAPACKAGE_NAMESPACE: &str = "http://mediapackage.opencastproject.org";

const GROUP_MEDIA: &str = "media";
const GROUP_METADATA: &str = "metadata";
const GROUP_ATTACHMENTS: &str = "attachments";
const GROUP_PUBLICATIONS: &str = "publications";
const GROUP_UNCLASSIFIED: &str = "unclassified";

/// Root of an element list document.
const ELEMENT_LIST: &str = "elements";

/// Entry points for reading and writing manifests.
pub struct MediaPackageParser;

impl MediaPackageParser {
    pub fn get_as_xml(media_package: &MediaPackage) -> Result<String> {
        media_package_to_node(media_package).to_xml_string()
    }

    pub fn get_from_xml(xml: &str) -> Result<MediaPackage> {
        MediaPackageBuilder::default().load_from_xml(xml)
    }

    /// Serializes a single element as a standalone document.
    pub fn element_to_xml(element: &MediaPackageElement) -> Result<String> {
        element_to_node(element, None)
            .with_attribute("xmlns", MEDIAPACKAGE_NAMESPACE)
            .to_xml_string()
    }

    pub fn element_from_xml(xml: &str) -> Result<MediaPackageElement> {
        let node = XmlNode::parse(xml)?;
        MediaPackageElementBuilder::default().element_from_manifest(&node)
    }

    /// Serializes a list of elements, e.g. the result of a distribution job.
    pub fn elements_to_xml(elements: &[MediaPackageElement]) -> Result<String> {
        let mut root = XmlNode::new(ELEMENT_LIST).with_attribute("xmlns", MEDIAPACKAGE_NAMESPACE);
        for element in elements {
            root.push(element_to_node(element, None));
        }
        root.to_xml_string()
    }

    pub fn elements_from_xml(xml: &str) -> Result<Vec<MediaPackageElement>> {
        let root = XmlNode::parse(xml)?;
        if root.local_name() != ELEMENT_LIST {
            return Err(MediaPackageError::Manifest(format!(
                "expected <{}> but found <{}>",
                ELEMENT_LIST, root.name
            )));
        }
        let builder = MediaPackageElementBuilder::default();
        root.children
            .iter()
            .map(|node| builder.element_from_manifest(node))
            .collect()
    }
}

// =============================================================================
// Writing
// =============================================================================

pub(crate) fn media_package_to_node(media_package: &MediaPackage) -> XmlNode {
    let mut root = XmlNode::new("mediapackage")
        .with_attribute("xmlns", MEDIAPACKAGE_NAMESPACE)
        .with_attribute("id", media_package.identifier());
    if let Some(start) = media_package.start() {
        root.set_attribute("start", format_date(&start));
    }
    if let Some(duration) = media_package.duration() {
        root.set_attribute("duration", duration.to_string());
    }

    push_text(&mut root, "title", media_package.title());
    push_text(&mut root, "series", media_package.series());
    push_text(&mut root, "seriestitle", media_package.series_title());
    push_list(&mut root, "creators", "creator", &media_package.creators());
    push_list(&mut root, "contributors", "contributor", &media_package.contributors());
    push_list(&mut root, "subjects", "subject", &media_package.subjects());
    push_text(&mut root, "license", media_package.license());
    push_text(&mut root, "language", media_package.language());

    let owner = Some(media_package.identifier());

    let mut tracks = media_package.tracks();
    tracks.sort_by(|a, b| a.compare_by_uri(b));
    push_group(&mut root, GROUP_MEDIA, &tracks, owner);
    push_group(&mut root, GROUP_METADATA, &media_package.catalogs(), owner);
    push_group(&mut root, GROUP_ATTACHMENTS, &media_package.attachments(), owner);
    push_group(&mut root, GROUP_PUBLICATIONS, &media_package.publications(), owner);
    push_group(
        &mut root,
        GROUP_UNCLASSIFIED,
        &media_package.unclassified_elements(),
        owner,
    );

    root
}

fn push_text(parent: &mut XmlNode, name: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        parent.push(XmlNode::new(name).with_text(value));
    }
}

fn push_list(parent: &mut XmlNode, group: &str, item: &str, values: &[String]) {
    if values.is_empty() {
        return;
    }
    let mut node = XmlNode::new(group);
    for value in values {
        node.push(XmlNode::new(item).with_text(value.as_str()));
    }
    parent.push(node);
}

fn push_group(
    parent: &mut XmlNode,
    group: &str,
    elements: &[&MediaPackageElement],
    owner: Option<&str>,
) {
    if elements.is_empty() {
        return;
    }
    let mut node = XmlNode::new(group);
    for element in elements {
        node.push(element_to_node(element, owner));
    }
    parent.push(node);
}

/// `ref` is left out when it only points back at the owning media package.
fn is_redundant_reference(reference: &MediaPackageReference, owner: Option<&str>) -> bool {
    reference.is_self()
        || (reference.reference_type() == TYPE_MEDIAPACKAGE
            && owner.map(|o| o == reference.identifier()).unwrap_or(false))
}

pub(crate) fn element_to_node(element: &MediaPackageElement, owner: Option<&str>) -> XmlNode {
    let mut node = XmlNode::new(element.element_type().as_str());
    if let Some(id) = element.identifier() {
        node.set_attribute("id", id);
    }
    if let Some(flavor) = element.flavor() {
        node.set_attribute("type", flavor.to_string());
    }
    let owner = owner.or_else(|| element.media_package_id());
    if let Some(reference) = element.reference() {
        if !is_redundant_reference(reference, owner) {
            node.set_attribute("ref", reference.to_string());
        }
    }
    if let ElementBody::Publication(publication) = element.body() {
        node.set_attribute("channel", publication.channel.as_str());
    }

    push_text(&mut node, "description", element.description());
    let tags = element.tags();
    if !tags.is_empty() {
        let mut tags_node = XmlNode::new("tags");
        for tag in tags {
            tags_node.push(XmlNode::new("tag").with_text(tag));
        }
        node.push(tags_node);
    }
    if let Some(uri) = element.uri() {
        node.push(XmlNode::new("url").with_text(uri.as_str()));
    }
    if let Some(mime_type) = element.mime_type() {
        node.push(XmlNode::new("mimetype").with_text(mime_type.to_string()));
    }
    if let Some(size) = element.size() {
        node.push(XmlNode::new("size").with_text(size.to_string()));
    }
    if let Some(checksum) = element.checksum() {
        node.push(
            XmlNode::new("checksum")
                .with_attribute("type", checksum.kind.as_str())
                .with_text(checksum.value.as_str()),
        );
    }

    match element.body() {
        ElementBody::Track(track) => {
            if let Some(duration) = track.duration {
                node.push(XmlNode::new("duration").with_text(duration.to_string()));
            }
            node.push(XmlNode::new("live").with_text(track.live.to_string()));
        }
        ElementBody::Attachment(attachment) if !attachment.properties.is_empty() => {
            let mut properties = XmlNode::new("additionalProperties");
            for (key, value) in &attachment.properties {
                properties.push(
                    XmlNode::new("property")
                        .with_attribute("key", key.as_str())
                        .with_text(value.as_str()),
                );
            }
            node.push(properties);
        }
        ElementBody::Publication(publication) => {
            let tracks: Vec<&MediaPackageElement> = publication.tracks.iter().collect();
            let catalogs: Vec<&MediaPackageElement> = publication.catalogs.iter().collect();
            let attachments: Vec<&MediaPackageElement> = publication.attachments.iter().collect();
            push_group(&mut node, GROUP_MEDIA, &tracks, owner);
            push_group(&mut node, GROUP_METADATA, &catalogs, owner);
            push_group(&mut node, GROUP_ATTACHMENTS, &attachments, owner);
        }
        _ => {}
    }

    node
}

// =============================================================================
// Reading
// =============================================================================

pub(crate) fn media_package_from_node(
    root: &XmlNode,
    builder: &MediaPackageElementBuilder,
) -> Result<MediaPackage> {
    if root.local_name() != "mediapackage" {
        return Err(MediaPackageError::Manifest(format!(
            "expected <mediapackage> but found <{}>",
            root.name
        )));
    }

    let mut media_package = match root.attribute("id").filter(|id| !id.is_empty()) {
        Some(id) => MediaPackage::with_id(id),
        None => MediaPackage::new(),
    };
    if let Some(start) = root.attribute("start").filter(|s| !s.is_empty()) {
        media_package.set_start(Some(parse_date(start)?));
    }
    if let Some(duration) = root.attribute("duration").filter(|s| !s.is_empty()) {
        media_package.set_duration(Some(parse_number(duration, "duration")?))?;
    }

    media_package.set_title(root.child_text("title").map(str::to_string));
    media_package.set_series(root.child_text("series").map(str::to_string));
    media_package.set_series_title(root.child_text("seriestitle").map(str::to_string));
    for creator in list_values(root, "creators", "creator") {
        media_package.add_creator(creator);
    }
    for contributor in list_values(root, "contributors", "contributor") {
        media_package.add_contributor(contributor);
    }
    for subject in list_values(root, "subjects", "subject") {
        media_package.add_subject(subject);
    }
    media_package.set_license(root.child_text("license").map(str::to_string));
    media_package.set_language(root.child_text("language").map(str::to_string));

    for group in [
        GROUP_MEDIA,
        GROUP_METADATA,
        GROUP_ATTACHMENTS,
        GROUP_PUBLICATIONS,
        GROUP_UNCLASSIFIED,
    ] {
        if let Some(group_node) = root.child(group) {
            for element_node in &group_node.children {
                let element = builder.element_from_manifest(element_node)?;
                media_package.add(element);
            }
        }
    }

    Ok(media_package)
}

fn list_values(root: &XmlNode, group: &str, item: &str) -> Vec<String> {
    root.child(group)
        .map(|g| {
            g.children_named(item)
                .map(XmlNode::text)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Reads an element node whose type is already known.
pub(crate) fn element_from_node(
    node: &XmlNode,
    element_type: ElementType,
) -> Result<MediaPackageElement> {
    let uri = node.child_text("url").map(parse_uri).transpose()?;
    let mut element = MediaPackageElement::new(element_type, uri);

    element.set_identifier(node.attribute("id").filter(|s| !s.is_empty()).map(str::to_string));
    if let Some(flavor) = node.attribute("type").filter(|s| !s.is_empty()) {
        element.set_flavor(Some(MediaPackageElementFlavor::parse(flavor)?));
    }
    if let Some(reference) = node.attribute("ref").filter(|s| !s.is_empty()) {
        element.set_reference(Some(reference.parse()?));
    }

    element.set_description(node.child_text("description").map(str::to_string));
    if let Some(tags) = node.child("tags") {
        for tag in tags.children_named("tag") {
            if !tag.text().is_empty() {
                element.add_tag(tag.text());
            }
        }
    }
    if let Some(mime_type) = node.child_text("mimetype") {
        element.set_mime_type(Some(mime_type.parse::<MimeType>()?));
    }
    if let Some(size) = node.child_text("size") {
        // -1 marks an unknown size
        let size: i64 = size.parse().map_err(|_| {
            MediaPackageError::Manifest(format!("invalid element size '{}'", size))
        })?;
        element.set_size(u64::try_from(size).ok());
    }
    if let Some(checksum) = node.child("checksum") {
        let kind: ChecksumType = checksum.attribute("type").unwrap_or("md5").parse()?;
        element.set_checksum(Some(Checksum::new(kind, checksum.text())));
    }

    match element.body_mut() {
        ElementBody::Track(track) => {
            if let Some(duration) = node.child_text("duration") {
                track.duration = Some(parse_number(duration, "duration")?);
            }
            track.live = node
                .child_text("live")
                .map(|live| live.eq_ignore_ascii_case("true"))
                .unwrap_or(false);
        }
        ElementBody::Attachment(attachment) => {
            if let Some(properties) = node.child("additionalProperties") {
                for property in properties.children_named("property") {
                    if let Some(key) = property.attribute("key") {
                        attachment
                            .properties
                            .insert(key.to_string(), property.text().to_string());
                    }
                }
            }
        }
        ElementBody::Publication(publication) => {
            publication.channel = node.attribute("channel").unwrap_or_default().to_string();
            for (group, nested_type) in [
                (GROUP_MEDIA, ElementType::Track),
                (GROUP_METADATA, ElementType::Catalog),
                (GROUP_ATTACHMENTS, ElementType::Attachment),
            ] {
                if let Some(group_node) = node.child(group) {
                    for nested in &group_node.children {
                        publication.add(element_from_node(nested, nested_type)?)?;
                    }
                }
            }
        }
        ElementBody::Catalog | ElementBody::Other => {}
    }

    Ok(element)
}

fn parse_uri(s: &str) -> Result<Url> {
    Url::parse(s).map_err(|e| MediaPackageError::InvalidUri(format!("{}: {}", s, e)))
}

fn parse_number(s: &str, field: &str) -> Result<u64> {
    s.trim()
        .parse()
        .map_err(|_| MediaPackageError::Manifest(format!("invalid {} '{}'", field, s)))
}

pub(crate) fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn parse_date(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| MediaPackageError::Manifest(format!("invalid date '{}': {}", s, e)))
}
