//! Projection of Dublin Core catalogs onto metadata collections
//!
//! The adapter is configured with `property.<name>.<key>=<value>` settings,
//! e.g. `property.title.type=TEXT`. Start date, start time and duration
//! fields that read the same term share one DCMI period.

use chrono::{Duration, NaiveTime, TimeZone, Utc};
use core_mediapackage::catalog::EName;
use core_mediapackage::flavor::episode_dublin_core;
use core_mediapackage::MediaPackageElementFlavor;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::collection::MetadataCollection;
use crate::dublincore::{
    encoding_iso8601, encoding_period, encoding_w3cdtf, DublinCoreCatalog, TERMS_NS_URI,
};
use crate::error::{MetadataError, Result};
use crate::field::{FieldValue, MetadataField, MetadataFieldType};
use crate::period::{decode_date, decode_duration, encode_date, encode_duration, DcmiPeriod, Precision};

const PROPERTY_PREFIX: &str = "property.";

#[derive(Debug, Clone)]
pub struct DublinCoreCatalogAdapter {
    title: String,
    flavor: MediaPackageElementFlavor,
    templates: MetadataCollection,
}

impl DublinCoreCatalogAdapter {
    pub fn new(
        title: impl Into<String>,
        flavor: MediaPackageElementFlavor,
        templates: MetadataCollection,
    ) -> Self {
        Self {
            title: title.into(),
            flavor,
            templates,
        }
    }

    /// Reads `title`, `flavor` and the `property.<name>.<key>` settings.
    pub fn from_config(config: &BTreeMap<String, String>) -> Result<Self> {
        let flavor = match config.get("flavor") {
            Some(flavor) => MediaPackageElementFlavor::parse(flavor)?,
            None => episode_dublin_core(),
        };
        let title = config
            .get("title")
            .cloned()
            .unwrap_or_else(|| flavor.to_string());

        let mut properties: BTreeMap<&str, BTreeMap<String, String>> = BTreeMap::new();
        for (key, value) in config {
            let Some(rest) = key.strip_prefix(PROPERTY_PREFIX) else {
                continue;
            };
            let (name, setting) = rest.split_once('.').ok_or_else(|| {
                MetadataError::Configuration(format!("Malformed property key: {}", key))
            })?;
            properties
                .entry(name)
                .or_default()
                .insert(setting.to_string(), value.clone());
        }

        let mut templates = MetadataCollection::new();
        for (name, settings) in &properties {
            templates.add_field(MetadataField::from_config(name, settings)?);
        }
        debug!(flavor = %flavor, fields = templates.len(), "Configured catalog adapter");

        Ok(Self::new(title, flavor, templates))
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn flavor(&self) -> &MediaPackageElementFlavor {
        &self.flavor
    }

    /// The configured fields without values.
    pub fn empty_collection(&self) -> MetadataCollection {
        self.templates.clone()
    }

    fn term_of(field: &MetadataField) -> EName {
        EName::new(
            field.namespace().unwrap_or(TERMS_NS_URI),
            field.input_id(),
        )
    }

    /// Whether `field` reads a period shared with other temporal fields.
    fn uses_period(&self, field: &MetadataField, catalog: &DublinCoreCatalog) -> bool {
        let term = Self::term_of(field);
        if catalog.encoding(&term) == Some(encoding_period()) {
            return true;
        }
        if let Some(value) = catalog.get_first(&term) {
            if DcmiPeriod::decode(value).is_ok() {
                return true;
            }
        }
        self.templates.fields().iter().any(|other| {
            matches!(
                other.field_type(),
                MetadataFieldType::StartDate | MetadataFieldType::StartTime
            ) && Self::term_of(other) == term
        })
    }

    /// Builds a collection holding the values of `catalog`.
    pub fn fields(&self, catalog: &DublinCoreCatalog) -> Result<MetadataCollection> {
        let mut collection = MetadataCollection::new();
        for template in self.templates.fields() {
            let value = self.load_value(template, catalog)?;
            collection.add_field(template.clone().with_value(value));
        }
        Ok(collection)
    }

    fn load_value(&self, field: &MetadataField, catalog: &DublinCoreCatalog) -> Result<FieldValue> {
        let term = Self::term_of(field);
        let values = catalog.get(&term);
        let Some(first) = values.first().map(|v| v.trim()) else {
            return Ok(FieldValue::Empty);
        };
        let invalid = |message: String| MetadataError::InvalidValue {
            field: field.output_id().to_string(),
            message,
        };

        let value = match field.field_type() {
            MetadataFieldType::Boolean => FieldValue::Boolean(first.eq_ignore_ascii_case("true")),
            MetadataFieldType::Date => FieldValue::Date(decode_date(first)?),
            MetadataFieldType::StartDate | MetadataFieldType::StartTime => {
                match DcmiPeriod::decode(first) {
                    Ok(period) => period.start.map(FieldValue::Date).unwrap_or_default(),
                    Err(_) => FieldValue::Date(decode_date(first)?),
                }
            }
            MetadataFieldType::Duration if self.uses_period(field, catalog) => {
                let period = DcmiPeriod::decode(first)?;
                match period.duration() {
                    Some(duration) => FieldValue::Duration(duration.num_milliseconds().max(0) as u64),
                    None => FieldValue::Empty,
                }
            }
            MetadataFieldType::Duration => FieldValue::Duration(decode_duration(first)?),
            MetadataFieldType::Long => FieldValue::Long(
                first
                    .parse()
                    .map_err(|_| invalid(format!("'{}' is not an integer", first)))?,
            ),
            MetadataFieldType::IterableText | MetadataFieldType::MixedText => {
                FieldValue::TextList(values.iter().map(|v| v.to_string()).collect())
            }
            MetadataFieldType::Text
            | MetadataFieldType::TextLong
            | MetadataFieldType::OrderedText => FieldValue::Text(first.to_string()),
        };
        Ok(value)
    }

    /// Writes the updated, writable fields of `collection` into `catalog`.
    pub fn store_fields(
        &self,
        catalog: &mut DublinCoreCatalog,
        collection: &MetadataCollection,
    ) -> Result<()> {
        let mut periods: BTreeMap<EName, Vec<&MetadataField>> = BTreeMap::new();

        for field in collection.updated_fields() {
            if field.is_read_only() {
                warn!(field = %field.output_id(), "Not storing read-only field");
                continue;
            }
            let term = Self::term_of(field);
            if field.field_type().is_temporal() && self.uses_period(field, catalog) {
                periods.entry(term).or_default().push(field);
                continue;
            }
            Self::store_value(catalog, &term, field.value())?;
        }

        for (term, fields) in periods {
            self.store_period(catalog, &term, &fields)?;
        }
        Ok(())
    }

    fn store_value(catalog: &mut DublinCoreCatalog, term: &EName, value: &FieldValue) -> Result<()> {
        match value {
            FieldValue::Empty => catalog.remove(term),
            FieldValue::Boolean(b) => catalog.set(term, b.to_string()),
            FieldValue::Date(date) => {
                catalog.set_typed(term, encode_date(date, Precision::Second), &encoding_w3cdtf())?
            }
            FieldValue::Duration(ms) => {
                catalog.set_typed(term, encode_duration(*ms), &encoding_iso8601())?
            }
            FieldValue::Long(n) => catalog.set(term, n.to_string()),
            FieldValue::Text(text) => catalog.set(term, text.as_str()),
            FieldValue::TextList(texts) => catalog.set_all(term, texts.iter().map(String::as_str)),
        }
        Ok(())
    }

    /// Combines start date, start time and duration into one period.
    fn store_period(
        &self,
        catalog: &mut DublinCoreCatalog,
        term: &EName,
        fields: &[&MetadataField],
    ) -> Result<()> {
        let existing = catalog
            .get_first(term)
            .and_then(|value| DcmiPeriod::decode(value).ok())
            .unwrap_or_default();
        let mut start = existing.start;
        let mut duration = existing.duration();

        for field in fields {
            match (field.field_type(), field.value()) {
                (MetadataFieldType::StartDate, FieldValue::Date(date)) => {
                    let time = start.map(|s| s.time()).unwrap_or_else(|| date.time());
                    start = Some(Utc.from_utc_datetime(&date.date_naive().and_time(time)));
                }
                (MetadataFieldType::StartTime, FieldValue::Date(date)) => {
                    let day = start.unwrap_or(*date).date_naive();
                    let time: NaiveTime = date.time();
                    start = Some(Utc.from_utc_datetime(&day.and_time(time)));
                }
                (MetadataFieldType::Duration, FieldValue::Duration(ms)) => {
                    let millis = i64::try_from(*ms)
                        .ok()
                        .and_then(Duration::try_milliseconds)
                        .ok_or_else(|| out_of_range(field, *ms))?;
                    duration = Some(millis);
                }
                (MetadataFieldType::Duration, FieldValue::Empty) => duration = None,
                (MetadataFieldType::StartDate | MetadataFieldType::StartTime, FieldValue::Empty) => {
                    start = None
                }
                (field_type, value) => {
                    return Err(MetadataError::InvalidValue {
                        field: field.output_id().to_string(),
                        message: format!("{:?} cannot be stored as {}", value, field_type),
                    })
                }
            }
        }

        let Some(start) = start else {
            debug!(term = %term, "Removing period without start");
            catalog.remove(term);
            return Ok(());
        };
        let end = match duration {
            Some(duration) => Some(start.checked_add_signed(duration).ok_or_else(|| {
                MetadataError::InvalidValue {
                    field: term.to_string(),
                    message: format!("period starting {} ends out of range", start),
                }
            })?),
            None => existing.end,
        };
        let mut period = DcmiPeriod::new(Some(start), end);
        period.name = existing.name;
        catalog.set_typed(term, period.encode(Precision::Second), &encoding_period())?;
        Ok(())
    }
}

fn out_of_range(field: &MetadataField, ms: u64) -> MetadataError {
    MetadataError::InvalidValue {
        field: field.output_id().to_string(),
        message: format!("duration of {} ms is out of range", ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dublincore::{property, term};

    fn config() -> BTreeMap<String, String> {
        [
            ("title", "Episode"),
            ("property.title.type", "TEXT"),
            ("property.title.label", "Title"),
            ("property.title.required", "true"),
            ("property.title.order", "0"),
            ("property.creator.type", "MIXED_TEXT"),
            ("property.creator.label", "Presenters"),
            ("property.startDate.type", "START_DATE"),
            ("property.startDate.label", "Start"),
            ("property.startDate.inputID", "temporal"),
            ("property.duration.type", "DURATION"),
            ("property.duration.label", "Duration"),
            ("property.duration.inputID", "temporal"),
            ("property.duration.outputID", "duration"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_from_config() {
        let adapter = DublinCoreCatalogAdapter::from_config(&config()).unwrap();
        assert_eq!(adapter.title(), "Episode");
        assert_eq!(adapter.flavor(), &episode_dublin_core());

        let collection = adapter.empty_collection();
        assert_eq!(collection.len(), 4);
        assert_eq!(collection.fields()[0].output_id(), "title");
        assert_eq!(collection.field("startDate").unwrap().input_id(), "temporal");
    }

    #[test]
    fn test_malformed_property_key() {
        let mut config = config();
        config.insert("property.broken".to_string(), "x".to_string());
        assert!(DublinCoreCatalogAdapter::from_config(&config).is_err());
    }

    #[test]
    fn test_fields_from_catalog() {
        let adapter = DublinCoreCatalogAdapter::from_config(&config()).unwrap();
        let mut dc = DublinCoreCatalog::new();
        dc.set(&term(property::TITLE), "Lecture");
        dc.add(&term(property::CREATOR), "Ada");
        dc.add(&term(property::CREATOR), "Grace");
        dc.set_typed(
            &term(property::TEMPORAL),
            "start=2024-03-01T10:00:00Z; end=2024-03-01T11:00:00Z; scheme=W3C-DTF;",
            &encoding_period(),
        )
        .unwrap();

        let collection = adapter.fields(&dc).unwrap();
        assert_eq!(
            collection.field("title").unwrap().value(),
            &FieldValue::Text("Lecture".to_string())
        );
        assert_eq!(
            collection.field("creator").unwrap().value(),
            &FieldValue::TextList(vec!["Ada".to_string(), "Grace".to_string()])
        );
        assert_eq!(
            collection.field("startDate").unwrap().value(),
            &FieldValue::Date(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(
            collection.field("duration").unwrap().value(),
            &FieldValue::Duration(3_600_000)
        );
        assert!(!collection.is_updated());
    }

    #[test]
    fn test_store_duration_keeps_start() {
        let adapter = DublinCoreCatalogAdapter::from_config(&config()).unwrap();
        let mut dc = DublinCoreCatalog::new();
        dc.set_typed(
            &term(property::TEMPORAL),
            "start=2024-03-01T10:00:00Z; end=2024-03-01T11:00:00Z; scheme=W3C-DTF;",
            &encoding_period(),
        )
        .unwrap();

        let mut collection = adapter.fields(&dc).unwrap();
        collection
            .field_mut("duration")
            .unwrap()
            .set_value(FieldValue::Duration(5_400_000))
            .unwrap();
        adapter.store_fields(&mut dc, &collection).unwrap();

        let period = DcmiPeriod::decode(dc.get_first(&term(property::TEMPORAL)).unwrap()).unwrap();
        assert_eq!(period.start, Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()));
        assert_eq!(period.end, Some(Utc.with_ymd_and_hms(2024, 3, 1, 11, 30, 0).unwrap()));
    }

    #[test]
    fn test_store_rejects_out_of_range_duration() {
        let adapter = DublinCoreCatalogAdapter::from_config(&config()).unwrap();
        let mut dc = DublinCoreCatalog::new();
        dc.set_typed(
            &term(property::TEMPORAL),
            "start=2024-03-01T10:00:00Z; end=2024-03-01T11:00:00Z; scheme=W3C-DTF;",
            &encoding_period(),
        )
        .unwrap();

        for ms in [u64::MAX, 9_000_000_000_000_000_000, 9_000_000_000_000_000] {
            let mut collection = adapter.fields(&dc).unwrap();
            collection
                .field_mut("duration")
                .unwrap()
                .from_json(&serde_json::json!(ms))
                .unwrap();
            assert!(matches!(
                adapter.store_fields(&mut dc, &collection),
                Err(MetadataError::InvalidValue { .. })
            ));
        }

        let period = DcmiPeriod::decode(dc.get_first(&term(property::TEMPORAL)).unwrap()).unwrap();
        assert_eq!(period.end, Some(Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap()));
    }

    #[test]
    fn test_store_updated_fields_only() {
        let adapter = DublinCoreCatalogAdapter::from_config(&config()).unwrap();
        let mut dc = DublinCoreCatalog::new();
        dc.set(&term(property::TITLE), "Old");
        dc.add(&term(property::CREATOR), "Ada");

        let mut collection = adapter.fields(&dc).unwrap();
        collection
            .field_mut("title")
            .unwrap()
            .set_value(FieldValue::Text("New".to_string()))
            .unwrap();
        collection
            .field_mut("startDate")
            .unwrap()
            .set_value(FieldValue::Date(Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap()))
            .unwrap();
        adapter.store_fields(&mut dc, &collection).unwrap();

        assert_eq!(dc.get_first(&term(property::TITLE)), Some("New"));
        assert_eq!(dc.get(&term(property::CREATOR)), vec!["Ada"]);
        let period = DcmiPeriod::decode(dc.get_first(&term(property::TEMPORAL)).unwrap()).unwrap();
        assert_eq!(period.start, Some(Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap()));
        assert_eq!(dc.encoding(&term(property::TEMPORAL)), Some(encoding_period()));
    }
}
