//! Extraction schemas: target fields plus synonym aliases.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Names of the schemas shipped with the crate.
pub const BUILTIN_SCHEMAS: &[&str] = &["annexure6", "annexure7"];

/// Raw schema definition as stored on disk, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub fields: Vec<String>,
    /// `(alias, canonical)` pairs in prompt order.
    #[serde(default)]
    pub synonyms: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename_field: Option<String>,
    #[serde(default = "default_repair")]
    pub repair_json: bool,
}

fn default_repair() -> bool {
    true
}

/// A validated set of target fields and the aliases that resolve to them.
///
/// Construct through [`ExtractionSchema::new`] or [`ExtractionSchema::builder`];
/// both reject definitions where an alias could populate more than one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "SchemaDefinition", try_from = "SchemaDefinition")]
pub struct ExtractionSchema {
    name: String,
    description: String,
    fields: Vec<String>,
    synonyms: Vec<(String, String)>,
    serial_field: Option<String>,
    filename_field: Option<String>,
    repair_json: bool,
}

impl From<ExtractionSchema> for SchemaDefinition {
    fn from(schema: ExtractionSchema) -> Self {
        Self {
            name: schema.name,
            description: schema.description,
            fields: schema.fields,
            synonyms: schema.synonyms,
            serial_field: schema.serial_field,
            filename_field: schema.filename_field,
            repair_json: schema.repair_json,
        }
    }
}

impl TryFrom<SchemaDefinition> for ExtractionSchema {
    type Error = SchemaError;

    fn try_from(def: SchemaDefinition) -> Result<Self, Self::Error> {
        ExtractionSchema::new(def)
    }
}

impl ExtractionSchema {
    /// Validate a definition.
    pub fn new(def: SchemaDefinition) -> Result<Self, SchemaError> {
        if def.fields.is_empty() {
            return Err(SchemaError::NoFields(def.name));
        }

        let mut seen = HashSet::new();
        for field in &def.fields {
            if field.trim().is_empty() {
                return Err(SchemaError::EmptyField);
            }
            if !seen.insert(field.as_str()) {
                return Err(SchemaError::DuplicateField(field.clone()));
            }
        }

        let mut aliases = HashSet::new();
        for (alias, target) in &def.synonyms {
            if !seen.contains(target.as_str()) {
                return Err(SchemaError::UnknownSynonymTarget {
                    alias: alias.clone(),
                    target: target.clone(),
                });
            }
            if !aliases.insert(alias.as_str()) {
                return Err(SchemaError::DuplicateAlias(alias.clone()));
            }
            if seen.contains(alias.as_str()) && alias != target {
                return Err(SchemaError::AliasShadowsField {
                    alias: alias.clone(),
                    target: target.clone(),
                });
            }
        }

        for (role, field) in [
            ("serial", &def.serial_field),
            ("filename", &def.filename_field),
        ] {
            if let Some(field) = field {
                if !seen.contains(field.as_str()) {
                    return Err(SchemaError::UnknownMetadataField {
                        role,
                        field: field.clone(),
                    });
                }
            }
        }

        Ok(Self {
            name: def.name,
            description: def.description,
            fields: def.fields,
            synonyms: def.synonyms,
            serial_field: def.serial_field,
            filename_field: def.filename_field,
            repair_json: def.repair_json,
        })
    }

    /// Start building a schema in code.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            def: SchemaDefinition {
                name: name.into(),
                description: String::new(),
                fields: Vec::new(),
                synonyms: Vec::new(),
                serial_field: None,
                filename_field: None,
                repair_json: true,
            },
        }
    }

    /// Look up a built-in schema by name.
    pub fn builtin(name: &str) -> Result<Self, SchemaError> {
        match name {
            "annexure6" => annexure6(),
            "annexure7" => annexure7(),
            other => Err(SchemaError::UnknownSchema(other.to_string())),
        }
    }

    /// Load and validate a schema from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SchemaError::Parse(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| SchemaError::Parse(e.to_string()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Target fields in declared order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// `(alias, canonical)` pairs in declared order.
    pub fn synonyms(&self) -> &[(String, String)] {
        &self.synonyms
    }

    pub fn serial_field(&self) -> Option<&str> {
        self.serial_field.as_deref()
    }

    pub fn filename_field(&self) -> Option<&str> {
        self.filename_field.as_deref()
    }

    /// Whether the response validator may rewrite malformed JSON.
    pub fn repair_json(&self) -> bool {
        self.repair_json
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    /// Position of a field in declared order.
    pub fn index_of(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }

    /// Resolve a raw key to its canonical field.
    ///
    /// A key that is already a field wins over the synonym table.
    pub fn resolve(&self, key: &str) -> Option<&str> {
        if let Some(idx) = self.index_of(key) {
            return Some(&self.fields[idx]);
        }
        self.synonyms
            .iter()
            .find(|(alias, _)| alias == key)
            .map(|(_, target)| target.as_str())
    }
}

/// Builder for schemas defined in code.
pub struct SchemaBuilder {
    def: SchemaDefinition,
}

impl SchemaBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.def.description = description.into();
        self
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.def.fields.push(field.into());
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.def.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn synonym(mut self, alias: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.def.synonyms.push((alias.into(), canonical.into()));
        self
    }

    pub fn serial_field(mut self, field: impl Into<String>) -> Self {
        self.def.serial_field = Some(field.into());
        self
    }

    pub fn filename_field(mut self, field: impl Into<String>) -> Self {
        self.def.filename_field = Some(field.into());
        self
    }

    pub fn repair_json(mut self, enabled: bool) -> Self {
        self.def.repair_json = enabled;
        self
    }

    pub fn build(self) -> Result<ExtractionSchema, SchemaError> {
        ExtractionSchema::new(self.def)
    }
}

/// GST invoices issued by local suppliers.
fn annexure6() -> Result<ExtractionSchema, SchemaError> {
    ExtractionSchema::builder("annexure6")
        .description("Annexure 6 - GST invoices from local suppliers")
        .fields([
            "PLI Request No",
            "IFCI No",
            "File Name",
            "invoice issued to",
            "invoice issued to GSTIN",
            "#",
            "IRN#",
            "Invoice#",
            "Date",
            "Name of Local Supplier",
            "GSTIN of Local Supplier",
            "Name of Part/Component",
            "HSN Code of Part/Component",
            "Value (net of GST)(Rs.)",
            "Quantity",
            "Value per piece (net of GST) (Rs.)",
        ])
        .synonym("IRN Number", "IRN#")
        .synonym("IRN No", "IRN#")
        .synonym("Invoice Number", "Invoice#")
        .synonym("Invoice No", "Invoice#")
        .synonym("Invoice Date", "Date")
        .synonym("Dated", "Date")
        .synonym("Name of Supplier", "Name of Local Supplier")
        .synonym("Supplier Name", "Name of Local Supplier")
        .synonym("GSTIN of Supplier", "GSTIN of Local Supplier")
        .synonym("HS Code", "HSN Code of Part/Component")
        .synonym("HS Code of Item", "HSN Code of Part/Component")
        .synonym("Part Description", "Name of Part/Component")
        .synonym("Product Description", "Name of Part/Component")
        .synonym("Qty", "Quantity")
        .synonym("QTY", "Quantity")
        .synonym("Net Value", "Value (net of GST)(Rs.)")
        .synonym("Value Without GST", "Value (net of GST)(Rs.)")
        .synonym("Unit Value", "Value per piece (net of GST) (Rs.)")
        .synonym("Rate per piece", "Value per piece (net of GST) (Rs.)")
        .filename_field("File Name")
        .build()
}

/// Bills of entry for imported parts.
fn annexure7() -> Result<ExtractionSchema, SchemaError> {
    ExtractionSchema::builder("annexure7")
        .description("Annexure 7 - bills of entry for imported parts")
        .fields([
            "S No. #",
            "No. of Bill of Entry of the Applicant",
            "Date",
            "Name of Imported Part/ Component",
            "HSN Code of Imported Part/ Component",
            "CIF Value (Rs.)",
            "Quantity",
        ])
        .synonym("Bill of Entry No", "No. of Bill of Entry of the Applicant")
        .synonym("Invoice Date", "Date")
        .synonym("Date of Invoice", "Date")
        .synonym("Dated", "Date")
        .synonym("HS Code", "HSN Code of Imported Part/ Component")
        .synonym("HS Code of Item", "HSN Code of Imported Part/ Component")
        .synonym("CIF Value", "CIF Value (Rs.)")
        .synonym("Item", "Name of Imported Part/ Component")
        .synonym("Part Description", "Name of Imported Part/ Component")
        .synonym("Product Description", "Name of Imported Part/ Component")
        .synonym("Qty", "Quantity")
        .synonym("Quantity (pcs)", "Quantity")
        .serial_field("S No. #")
        .build()
}
