//! Row-driven invoice materialization: typed casting and merge of
//! column-path/cell mappings onto a base invoice.

use serde_json::Value;

use crate::error::{IssueKind, ValidationIssue, ValidationReport};
use crate::models::invoice::InvoiceDocument;
use crate::models::tile::SmartTableRow;
use crate::schema::invoice_schema::{InvoiceSchema, ScalarType};

/// Parsed form of a descriptor column path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnPath {
    Basic(String),
    Custom(String),
    Sample(String),
    GeneralAttribute { term_id: String },
    SpecificAttribute { class_id: String, term_id: String },
    Meta(String),
    InputData(usize),
}

impl ColumnPath {
    /// Parses the SmartTable column syntax. Returns `None` for columns that
    /// carry no invoice mapping (display-only columns).
    pub fn parse(column: &str) -> Option<Self> {
        if let Some(rest) = column.strip_prefix("basic/") {
            return Some(Self::Basic(rest.to_string()));
        }
        if let Some(rest) = column.strip_prefix("custom/") {
            return Some(Self::Custom(rest.to_string()));
        }
        if let Some(rest) = column.strip_prefix("meta/") {
            return Some(Self::Meta(rest.to_string()));
        }
        if let Some(rest) = column.strip_prefix("sample/") {
            if let Some(term_id) = rest.strip_prefix("generalAttributes/") {
                return Some(Self::GeneralAttribute {
                    term_id: term_id.to_string(),
                });
            }
            if let Some(attr) = rest.strip_prefix("specificAttributes/") {
                let (class_id, term_id) = attr.split_once('/')?;
                return Some(Self::SpecificAttribute {
                    class_id: class_id.to_string(),
                    term_id: term_id.to_string(),
                });
            }
            return Some(Self::Sample(rest.to_string()));
        }
        if let Some(rest) = column.strip_prefix("inputdata") {
            return rest.parse().ok().map(Self::InputData);
        }
        None
    }
}

/// Ordered column/cell entries extracted from one descriptor row.
#[derive(Debug, Clone, Default)]
pub struct InvoicePatch {
    entries: Vec<(String, ColumnPath, String)>,
}

impl InvoicePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, path: ColumnPath, cell: impl Into<String>) {
        self.entries.push((column.into(), path, cell.into()));
    }

    /// Extracts the invoice-mapping columns of a SmartTable row. Columns
    /// without a recognized prefix and `inputdata<N>` file references are
    /// not part of the patch.
    pub fn from_smarttable_row(row: &SmartTableRow) -> Self {
        let mut patch = Self::new();
        for (column, cell) in row.iter() {
            match ColumnPath::parse(column) {
                Some(ColumnPath::InputData(_)) | None => {}
                Some(path) => patch.push(column, path, cell),
            }
        }
        patch
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, ColumnPath, String)> {
        self.entries.iter()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OverwriteOptions {
    /// Null out the base's row-mutable fields before applying the patch, so
    /// empty cells never inherit base values (Excel-invoice semantics).
    pub reset_base: bool,
    /// Keep `sample.ownerId` exactly as the base document had it.
    pub preserve_owner_id: bool,
}

impl Default for OverwriteOptions {
    fn default() -> Self {
        Self {
            reset_base: false,
            preserve_owner_id: true,
        }
    }
}

/// Result of an overwrite: the merged invoice plus the `meta/` side-channel
/// entries destined for `metadata.json` (raw cell strings, cast later
/// against the metadata definition).
#[derive(Debug)]
pub struct OverwriteOutcome {
    pub invoice: InvoiceDocument,
    pub meta_entries: Vec<(String, String)>,
}

/// Applies a typed patch to a deep clone of `base`.
///
/// Cell casting consults the field's declared type via schema lookup; cast
/// failures are collected fail-slow into a [`ValidationReport`] whose issue
/// paths are the offending column paths.
pub fn overwrite_invoice(
    base: &InvoiceDocument,
    patch: &InvoicePatch,
    schema: &InvoiceSchema,
    options: OverwriteOptions,
) -> Result<OverwriteOutcome, ValidationReport> {
    let mut invoice = base.clone();
    let base_owner_id = base.sample_owner_id();

    if options.reset_base {
        reset_for_row_merge(&mut invoice);
    }

    let mut report = ValidationReport::new();
    let mut meta_entries = Vec::new();

    for (column, path, cell) in patch.iter() {
        let cell = cell.trim();
        if cell.is_empty() {
            clear_entry(&mut invoice, path);
            continue;
        }

        match path {
            ColumnPath::Basic(field) => {
                apply_scalar(&mut invoice, schema, "basic", field, column, cell, &mut report);
            }
            ColumnPath::Custom(field) => {
                apply_scalar(&mut invoice, schema, "custom", field, column, cell, &mut report);
            }
            ColumnPath::Sample(field) => {
                if field == "names" {
                    invoice.set_field("sample", "names", Value::Array(vec![Value::String(cell.to_string())]));
                } else {
                    apply_scalar(&mut invoice, schema, "sample", field, column, cell, &mut report);
                }
            }
            ColumnPath::GeneralAttribute { term_id } => {
                set_attribute_value(&mut invoice, "generalAttributes", None, term_id, cell);
            }
            ColumnPath::SpecificAttribute { class_id, term_id } => {
                set_attribute_value(
                    &mut invoice,
                    "specificAttributes",
                    Some(class_id),
                    term_id,
                    cell,
                );
            }
            ColumnPath::Meta(name) => {
                meta_entries.push((name.clone(), cell.to_string()));
            }
            ColumnPath::InputData(_) => {}
        }
    }

    if options.preserve_owner_id {
        match base_owner_id {
            Some(owner) => invoice.set_sample_owner_id(owner),
            None => {
                invoice.remove_field("sample", "ownerId");
            }
        }
    }

    invoice.reorder_sample_id_first();

    if report.is_empty() {
        Ok(OverwriteOutcome {
            invoice,
            meta_entries,
        })
    } else {
        Err(report)
    }
}

/// Nulls the row-mutable parts of the base document so empty cells do not
/// inherit its values. `datasetId`, `dateSubmitted` and `instrumentId`
/// survive untouched.
pub fn reset_for_row_merge(invoice: &mut InvoiceDocument) {
    let sections: Vec<String> = invoice.root().keys().cloned().collect();
    for section in sections {
        match section.as_str() {
            "datasetId" => {}
            "sample" => reset_sample(invoice),
            _ => {
                let Some(map) = invoice.section_mut(&section) else {
                    continue;
                };
                for (key, value) in map.iter_mut() {
                    if key != "dateSubmitted" && key != "instrumentId" {
                        *value = Value::Null;
                    }
                }
            }
        }
    }
}

fn reset_sample(invoice: &mut InvoiceDocument) {
    let Some(sample) = invoice.section_mut("sample") else {
        return;
    };
    for (key, value) in sample.iter_mut() {
        match key.as_str() {
            "sampleId" | "composition" | "referenceUrl" | "description" | "ownerId" => {
                *value = Value::Null;
            }
            "generalAttributes" | "specificAttributes" => {
                if let Some(attributes) = value.as_array_mut() {
                    for attribute in attributes {
                        if let Some(entry) = attribute.as_object_mut() {
                            entry.insert("value".to_string(), Value::Null);
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

fn clear_entry(invoice: &mut InvoiceDocument, path: &ColumnPath) {
    match path {
        ColumnPath::Basic(field) => {
            invoice.remove_field("basic", field);
        }
        ColumnPath::Custom(field) => {
            invoice.remove_field("custom", field);
        }
        ColumnPath::Sample(field) => {
            invoice.remove_field("sample", field);
        }
        ColumnPath::GeneralAttribute { term_id } => {
            set_attribute_null(invoice, "generalAttributes", None, term_id);
        }
        ColumnPath::SpecificAttribute { class_id, term_id } => {
            set_attribute_null(invoice, "specificAttributes", Some(class_id), term_id);
        }
        ColumnPath::Meta(_) | ColumnPath::InputData(_) => {}
    }
}

fn apply_scalar(
    invoice: &mut InvoiceDocument,
    schema: &InvoiceSchema,
    section: &str,
    field: &str,
    column: &str,
    cell: &str,
    report: &mut ValidationReport,
) {
    let ty = schema.scalar_type_of(field).unwrap_or(ScalarType::String);
    match cast_value(cell, ty) {
        Ok(value) => invoice.set_field(section, field, value),
        Err(detail) => report.push(ValidationIssue::new(column, IssueKind::TypeMismatch, detail)),
    }
}

/// Casts a cell string to the declared scalar type. The boolean cast is
/// case-insensitive and strict: only `TRUE`/`FALSE` spellings are admitted.
pub fn cast_value(cell: &str, ty: ScalarType) -> Result<Value, String> {
    match ty {
        ScalarType::String => Ok(Value::String(cell.to_string())),
        ScalarType::Integer => cell
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("'{cell}' is not an integer")),
        ScalarType::Number => cell
            .parse::<f64>()
            .map(Value::from)
            .map_err(|_| format!("'{cell}' is not a number")),
        ScalarType::Boolean => {
            if cell.eq_ignore_ascii_case("true") {
                Ok(Value::Bool(true))
            } else if cell.eq_ignore_ascii_case("false") {
                Ok(Value::Bool(false))
            } else {
                Err(format!("'{cell}' is not a boolean (expected TRUE or FALSE)"))
            }
        }
    }
}

fn set_attribute_value(
    invoice: &mut InvoiceDocument,
    kind: &str,
    class_id: Option<&str>,
    term_id: &str,
    cell: &str,
) {
    set_attribute(invoice, kind, class_id, term_id, Value::String(cell.to_string()));
}

fn set_attribute_null(
    invoice: &mut InvoiceDocument,
    kind: &str,
    class_id: Option<&str>,
    term_id: &str,
) {
    set_attribute(invoice, kind, class_id, term_id, Value::Null);
}

fn set_attribute(
    invoice: &mut InvoiceDocument,
    kind: &str,
    class_id: Option<&str>,
    term_id: &str,
    value: Value,
) {
    let Some(sample) = invoice.section_mut("sample") else {
        return;
    };
    let Some(attributes) = sample.get_mut(kind).and_then(Value::as_array_mut) else {
        return;
    };

    for attribute in attributes {
        let Some(entry) = attribute.as_object_mut() else {
            continue;
        };
        if entry.get("termId").and_then(Value::as_str) != Some(term_id) {
            continue;
        }
        if let Some(class_id) = class_id {
            if entry.get("classId").and_then(Value::as_str) != Some(class_id) {
                continue;
            }
        }
        entry.insert("value".to_string(), value);
        return;
    }
}
