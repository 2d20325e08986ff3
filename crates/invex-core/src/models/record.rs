//! Normalized extraction records and the batch result set.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use super::schema::ExtractionSchema;

/// Values for every schema field, in schema order, plus source metadata.
///
/// The key set is fixed at construction: one entry per schema field, never
/// more. Missing values are `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    values: Vec<(String, Value)>,
    /// Name of the PDF the record came from.
    pub source_file: Option<String>,
    /// Row number assigned after the whole batch is processed.
    pub serial: Option<u32>,
}

impl NormalizedRecord {
    /// A record with every schema field set to null.
    pub fn empty(schema: &ExtractionSchema) -> Self {
        Self {
            values: schema
                .fields()
                .iter()
                .map(|f| (f.clone(), Value::Null))
                .collect(),
            source_file: None,
            serial: None,
        }
    }

    /// Set a field. Returns `false` when the record has no such field.
    pub fn set(&mut self, field: &str, value: Value) -> bool {
        match self.values.iter_mut().find(|(k, _)| k == field) {
            Some((_, slot)) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.iter().find(|(k, _)| k == field).map(|(_, v)| v)
    }

    /// Field names in schema order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(k, _)| k.as_str())
    }

    /// `(field, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether every field is null.
    pub fn is_degraded(&self) -> bool {
        self.values.iter().all(|(_, v)| v.is_null())
    }

    /// Number of fields holding a non-null value.
    pub fn filled_count(&self) -> usize {
        self.values.iter().filter(|(_, v)| !v.is_null()).count()
    }

    /// Attach the source filename, mirroring it into the schema's filename
    /// field when one is declared. The serial and the schema's serial field
    /// are reset until [`ResultSet::assign_serials`] numbers the batch.
    pub fn attach_source(&mut self, schema: &ExtractionSchema, filename: &str) {
        self.source_file = Some(filename.to_string());
        self.serial = None;
        if let Some(field) = schema.serial_field() {
            self.set(field, Value::Null);
        }
        if let Some(field) = schema.filename_field() {
            self.set(field, Value::String(filename.to_string()));
        }
    }
}

impl Serialize for NormalizedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 2))?;
        for (k, v) in &self.values {
            map.serialize_entry(k, v)?;
        }
        map.serialize_entry("source_file", &self.source_file)?;
        map.serialize_entry("serial", &self.serial)?;
        map.end()
    }
}

/// Records of one batch in processing order.
#[derive(Debug, Clone)]
pub struct ResultSet {
    schema: ExtractionSchema,
    records: Vec<NormalizedRecord>,
}

impl ResultSet {
    pub fn new(schema: ExtractionSchema) -> Self {
        Self {
            schema,
            records: Vec::new(),
        }
    }

    pub fn schema(&self) -> &ExtractionSchema {
        &self.schema
    }

    pub fn push(&mut self, record: NormalizedRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number rows 1..=N in processing order, overwriting placeholders.
    ///
    /// When the schema declares a serial field, it receives the same number.
    pub fn assign_serials(&mut self) {
        let serial_field = self.schema.serial_field().map(str::to_string);
        for (idx, record) in self.records.iter_mut().enumerate() {
            let serial = (idx + 1) as u32;
            record.serial = Some(serial);
            if let Some(field) = &serial_field {
                record.set(field, Value::from(serial));
            }
        }
    }

    /// Column headers: schema fields in declared order plus the file column.
    pub fn headers(&self, file_column: &str) -> Vec<String> {
        let mut headers = self.schema.fields().to_vec();
        headers.push(file_column.to_string());
        headers
    }

    /// Rows as display strings aligned with [`ResultSet::headers`].
    ///
    /// Nulls become empty cells; strings are written without quotes.
    pub fn rows(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.records.iter().map(|record| {
            let mut row: Vec<String> = record.iter().map(|(_, v)| cell_text(v)).collect();
            row.push(record.source_file.clone().unwrap_or_default());
            row
        })
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
