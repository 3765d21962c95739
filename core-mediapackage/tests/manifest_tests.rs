//! Integration tests for manifest loading and serialization

use core_mediapackage::{
    ElementType, MediaPackageBuilder, MediaPackageElementFlavor, MediaPackageParser,
    MediaPackageReference,
};
use url::Url;

const MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<mediapackage xmlns="http://mediapackage.opencastproject.org" id="10.0000/5819" start="2007-12-05T13:40:00Z" duration="1004400000">
  <title>Land and Vegetation: Key players on the Climate Scene</title>
  <series>10.0000/5819</series>
  <creators>
    <creator>Prof. Dr. Joe Smith</creator>
  </creators>
  <media>
    <track id="track-1" type="presentation/source">
      <mimetype>video/mp4</mimetype>
      <url>http://localhost:8080/screen.mp4</url>
      <checksum type="md5">43b7d843b02c4a429b2f547a4f230d31</checksum>
      <duration>1004400000</duration>
      <live>false</live>
    </track>
    <track id="track-2" type="presenter/source">
      <mimetype>video/mp4</mimetype>
      <url>http://localhost:8080/camera.mp4</url>
      <duration>1004400000</duration>
    </track>
  </media>
  <metadata>
    <catalog id="catalog-1" type="dublincore/episode">
      <mimetype>text/xml</mimetype>
      <url>http://localhost:8080/dublincore.xml</url>
      <tags>
        <tag>archive</tag>
        <tag>engage-download</tag>
      </tags>
    </catalog>
    <catalog id="catalog-2" type="metadata/mpeg-7" ref="track:track-1">
      <url>http://localhost:8080/mpeg7.xml</url>
    </catalog>
  </metadata>
  <attachments>
    <attachment id="attachment-1" type="presenter/player+preview">
      <url>http://localhost:8080/preview.png</url>
      <size>-1</size>
    </attachment>
  </attachments>
</mediapackage>"#;

#[test]
fn test_load_manifest() {
    let mp = MediaPackageParser::get_from_xml(MANIFEST).unwrap();

    assert_eq!(mp.identifier(), "10.0000/5819");
    assert_eq!(mp.series(), Some("10.0000/5819"));
    assert_eq!(mp.creators(), vec!["Prof. Dr. Joe Smith".to_string()]);
    assert_eq!(mp.tracks().len(), 2);
    assert_eq!(mp.catalogs().len(), 2);
    assert_eq!(mp.attachments().len(), 1);
    assert_eq!(mp.duration(), Some(1_004_400_000));

    let attachment = mp.element_by_id("attachment-1").unwrap();
    assert_eq!(attachment.size(), None);

    let episode = MediaPackageElementFlavor::parse("dublincore/episode").unwrap();
    assert_eq!(mp.catalogs_by_flavor(&episode).len(), 1);

    let sources = MediaPackageElementFlavor::parse("*/source").unwrap();
    assert_eq!(mp.tracks_by_flavor(&sources).len(), 2);

    let reference = MediaPackageReference::new("track", "track-1");
    let referencing = mp.catalogs_by_reference(&reference, false);
    assert_eq!(referencing.len(), 1);
    assert_eq!(referencing[0].identifier(), Some("catalog-2"));
}

#[test]
fn test_tag_queries_on_loaded_manifest() {
    let mp = MediaPackageParser::get_from_xml(MANIFEST).unwrap();
    assert_eq!(mp.elements_by_tags(&["archive"]).len(), 1);
    assert!(mp.elements_by_tags(&["archive", "-engage-download"]).is_empty());
    assert_eq!(mp.elements_by_tags::<&str>(&[]).len(), 5);
}

#[test]
fn test_manifest_survives_round_trip() {
    let mp = MediaPackageParser::get_from_xml(MANIFEST).unwrap();
    let xml = MediaPackageParser::get_as_xml(&mp).unwrap();
    let reloaded = MediaPackageParser::get_from_xml(&xml).unwrap();

    assert_eq!(reloaded.identifier(), mp.identifier());
    assert_eq!(reloaded.start(), mp.start());
    assert_eq!(reloaded.elements().len(), mp.elements().len());
    for element in mp.elements() {
        let id = element.identifier().unwrap();
        let copy = reloaded.element_by_id(id).unwrap();
        assert_eq!(copy.flavor(), element.flavor());
        assert_eq!(copy.uri(), element.uri());
        assert_eq!(copy.tags(), element.tags());
        assert_eq!(copy.reference(), element.reference());
    }
}

#[test]
fn test_build_package_from_uris() {
    let builder = MediaPackageBuilder::default();
    let mut mp = builder.create_new_with_id("built");

    let video = Url::parse("http://localhost/video.mp4").unwrap();
    let catalog = Url::parse("http://localhost/episode.xml").unwrap();
    let image = Url::parse("http://localhost/cover.png").unwrap();

    let video_id = mp
        .add_from_uri(builder.element_builder(), &video, None, None)
        .unwrap();
    mp.add_from_uri(builder.element_builder(), &catalog, None, None)
        .unwrap();
    mp.add_from_uri(builder.element_builder(), &image, None, None)
        .unwrap();

    assert_eq!(
        mp.element_by_id(&video_id).unwrap().element_type(),
        ElementType::Track
    );
    assert_eq!(mp.catalogs().len(), 1);
    assert_eq!(mp.attachments().len(), 1);

    let xml = MediaPackageParser::get_as_xml(&mp).unwrap();
    assert!(xml.contains("<media>"));
    assert!(xml.contains("<metadata>"));
    assert!(xml.contains("<attachments>"));
}
