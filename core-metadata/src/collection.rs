//! Ordered collections of metadata fields

use serde_json::Value;
use tracing::debug;

use crate::error::{MetadataError, Result};
use crate::field::MetadataField;

/// Fields in display order, addressed by their output id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataCollection {
    fields: Vec<MetadataField>,
}

impl MetadataCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `field`, replacing a field with the same output id. Fields with an
    /// explicit order come first, sorted by it.
    pub fn add_field(&mut self, field: MetadataField) {
        match self
            .fields
            .iter_mut()
            .find(|f| f.output_id() == field.output_id())
        {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self.fields
            .sort_by_key(|f| f.order().unwrap_or(i32::MAX));
    }

    pub fn remove_field(&mut self, output_id: &str) -> Option<MetadataField> {
        let index = self.fields.iter().position(|f| f.output_id() == output_id)?;
        Some(self.fields.remove(index))
    }

    pub fn field(&self, output_id: &str) -> Option<&MetadataField> {
        self.fields.iter().find(|f| f.output_id() == output_id)
    }

    pub fn field_mut(&mut self, output_id: &str) -> Option<&mut MetadataField> {
        self.fields.iter_mut().find(|f| f.output_id() == output_id)
    }

    pub fn fields(&self) -> &[MetadataField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn is_updated(&self) -> bool {
        self.fields.iter().any(MetadataField::is_updated)
    }

    pub fn updated_fields(&self) -> impl Iterator<Item = &MetadataField> {
        self.fields.iter().filter(|f| f.is_updated())
    }

    /// Whether every required field has a non-empty value.
    pub fn required_fields_present(&self) -> bool {
        self.fields
            .iter()
            .filter(|f| f.is_required())
            .all(|f| !f.value().is_empty())
    }

    pub fn to_json(&self) -> Result<Value> {
        let fields = self
            .fields
            .iter()
            .map(MetadataField::to_json)
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::Array(fields))
    }

    /// Applies `[{"id": ..., "value": ...}, ...]`. Read-only and unknown
    /// fields are skipped.
    pub fn from_json(&mut self, json: &Value) -> Result<()> {
        let items = json.as_array().ok_or_else(|| MetadataError::InvalidValue {
            field: "collection".to_string(),
            message: "expected an array of fields".to_string(),
        })?;

        for item in items {
            let Some(id) = item.get("id").and_then(Value::as_str) else {
                debug!(item = %item, "Skipping field without id");
                continue;
            };
            let Some(field) = self.field_mut(id) else {
                debug!(field = id, "Skipping unknown field");
                continue;
            };
            if field.is_read_only() {
                debug!(field = id, "Skipping read-only field");
                continue;
            }
            field.from_json(item.get("value").unwrap_or(&Value::Null))?;
        }
        Ok(())
    }

    pub fn from_json_str(&mut self, json: &str) -> Result<()> {
        let value: Value = serde_json::from_str(json)?;
        self.from_json(&value)
    }
}
