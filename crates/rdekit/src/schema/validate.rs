use serde_json::Value;

use crate::error::{IssueKind, ValidationIssue, ValidationReport};
use crate::models::invoice::InvoiceDocument;
use crate::models::metadata::{MetadataDocument, MAX_VALUE_SIZE};
use crate::schema::invoice_schema::{InvoiceSchema, ScalarType, SchemaNode};
use crate::schema::metadata_def::MetadataDefinition;

#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateOptions {
    /// Restrict checks to required-key presence plus type/enum conformance
    /// of present fields; extra properties are not flagged.
    pub required_only: bool,
}

/// Validates an invoice document against its schema. Fail-slow: every
/// finding in the document is collected before the report is returned.
pub fn validate_invoice(
    doc: &InvoiceDocument,
    schema: &InvoiceSchema,
    options: ValidateOptions,
) -> Result<(), ValidationReport> {
    let mut report = ValidationReport::new();
    let value = doc.as_value();
    check_node(schema.root(), &value, "", &options, &mut report);
    report.into_result()
}

fn check_node(
    node: &SchemaNode,
    value: &Value,
    path: &str,
    options: &ValidateOptions,
    report: &mut ValidationReport,
) {
    match node {
        SchemaNode::Object {
            properties,
            required,
        } => check_object(properties, required, value, path, options, report),
        SchemaNode::Array { items, .. } => match value {
            Value::Array(entries) => {
                for (i, entry) in entries.iter().enumerate() {
                    let entry_path = format!("{path}[{i}]");
                    check_node(items, entry, &entry_path, options, report);
                }
            }
            Value::Null => {}
            other => report.push(ValidationIssue::new(
                path,
                IssueKind::TypeMismatch,
                format!("expected array, found {}", type_name(other)),
            )),
        },
        SchemaNode::Scalar {
            ty,
            enum_values,
            format,
            ..
        } => check_scalar(*ty, enum_values.as_deref(), format.as_deref(), value, path, report),
    }
}

fn check_object(
    properties: &[(String, SchemaNode)],
    required: &[String],
    value: &Value,
    path: &str,
    options: &ValidateOptions,
    report: &mut ValidationReport,
) {
    let Some(map) = value.as_object() else {
        if !value.is_null() {
            report.push(ValidationIssue::new(
                path,
                IssueKind::TypeMismatch,
                format!("expected object, found {}", type_name(value)),
            ));
        } else {
            for name in required {
                report.push(ValidationIssue::new(
                    join(path, name),
                    IssueKind::Missing,
                    "required key absent",
                ));
            }
        }
        return;
    };

    // Restructured samples are an allow-shape: once `sampleId` carries a
    // value, only `sampleId` itself remains required within `sample`.
    let relaxed_sample = path == "sample"
        && map
            .get("sampleId")
            .is_some_and(|v| !v.is_null() && v.as_str() != Some(""));

    for name in required {
        if relaxed_sample && name != "sampleId" {
            continue;
        }
        match map.get(name) {
            None | Some(Value::Null) => report.push(ValidationIssue::new(
                join(path, name),
                IssueKind::Missing,
                "required key absent",
            )),
            Some(_) => {}
        }
    }

    for (name, child) in properties {
        if let Some(entry) = map.get(name) {
            if entry.is_null() {
                continue;
            }
            check_node(child, entry, &join(path, name), options, report);
        }
    }

    if !options.required_only {
        for key in map.keys() {
            if !properties.iter().any(|(name, _)| name == key) {
                report.push(ValidationIssue::new(
                    join(path, key),
                    IssueKind::ExtraProperty,
                    "key is not declared by the schema",
                ));
            }
        }
    }
}

fn check_scalar(
    ty: ScalarType,
    enum_values: Option<&[Value]>,
    format: Option<&str>,
    value: &Value,
    path: &str,
    report: &mut ValidationReport,
) {
    if value.is_null() {
        return;
    }

    if !ty.matches(value) {
        report.push(ValidationIssue::new(
            path,
            IssueKind::TypeMismatch,
            format!("expected {}, found {}", ty.as_str(), type_name(value)),
        ));
        return;
    }

    if let Some(allowed) = enum_values {
        if !allowed.contains(value) {
            report.push(ValidationIssue::new(
                path,
                IssueKind::EnumViolation,
                format!("value {value} is not one of the allowed values"),
            ));
        }
    }

    if let (Some("date"), Some(text)) = (format, value.as_str()) {
        if chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d").is_err() {
            report.push(ValidationIssue::new(
                path,
                IssueKind::FormatError,
                format!("'{text}' is not a YYYY-MM-DD date"),
            ));
        }
    }
}

/// Validates `metadata.json` against `metadata-def.json`: declared types
/// and the serialized-size bound on every value.
pub fn validate_metadata(
    doc: &MetadataDocument,
    definition: &MetadataDefinition,
) -> Result<(), ValidationReport> {
    let mut report = ValidationReport::new();

    for (key, meta) in &doc.constant {
        check_meta_entry(key, &meta.value, &format!("constant.{key}"), definition, &mut report);
    }

    for (i, set) in doc.variable.iter().enumerate() {
        for (key, meta) in set {
            check_meta_entry(
                key,
                &meta.value,
                &format!("variable[{i}].{key}"),
                definition,
                &mut report,
            );
        }
    }

    report.into_result()
}

fn check_meta_entry(
    key: &str,
    value: &Value,
    path: &str,
    definition: &MetadataDefinition,
    report: &mut ValidationReport,
) {
    let serialized = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if serialized.len() > MAX_VALUE_SIZE {
        report.push(ValidationIssue::new(
            path,
            IssueKind::SizeExceeded,
            format!(
                "serialized value is {} bytes, limit is {MAX_VALUE_SIZE}",
                serialized.len()
            ),
        ));
    }

    let Some(entry) = definition.get(key) else {
        report.push(ValidationIssue::new(
            path,
            IssueKind::ExtraProperty,
            "key is not declared in metadata-def.json",
        ));
        return;
    };

    let conforms = match entry.schema_field.ty.as_str() {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        _ => true,
    };
    if !conforms && !value.is_null() {
        report.push(ValidationIssue::new(
            path,
            IssueKind::TypeMismatch,
            format!(
                "expected {}, found {}",
                entry.schema_field.ty,
                type_name(value)
            ),
        ));
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> InvoiceSchema {
        InvoiceSchema::from_value(&json!({
            "type": "object",
            "required": ["basic"],
            "properties": {
                "datasetId": {"type": "string"},
                "basic": {
                    "type": "object",
                    "required": ["dataName"],
                    "properties": {
                        "dataName": {"type": "string"},
                        "dateSubmitted": {"type": "string", "format": "date"}
                    }
                },
                "custom": {
                    "type": "object",
                    "properties": {
                        "isPublic": {"type": "boolean"},
                        "phase": {"type": "string", "enum": ["alpha", "beta"]}
                    }
                },
                "sample": {
                    "type": "object",
                    "required": ["sampleId", "names", "ownerId"],
                    "properties": {
                        "sampleId": {"type": "string"},
                        "ownerId": {"type": "string"},
                        "names": {"type": "array", "items": {"type": "string"}}
                    }
                }
            }
        }))
        .unwrap()
    }

    fn doc(value: serde_json::Value) -> InvoiceDocument {
        InvoiceDocument::from_value(value).unwrap()
    }

    #[test]
    fn test_valid_document_passes() {
        let invoice = doc(json!({
            "datasetId": "ds-1",
            "basic": {"dataName": "run-1", "dateSubmitted": "2026-08-02"},
            "custom": {"isPublic": true, "phase": "alpha"}
        }));
        assert!(validate_invoice(&invoice, &schema(), ValidateOptions::default()).is_ok());
    }

    #[test]
    fn test_missing_required_key_collected() {
        let invoice = doc(json!({"basic": {}}));
        let report =
            validate_invoice(&invoice, &schema(), ValidateOptions::default()).unwrap_err();
        assert!(report.has_kind(IssueKind::Missing));
        assert!(report.issues.iter().any(|i| i.path == "basic.dataName"));
    }

    #[test]
    fn test_fail_slow_collects_all_issues() {
        let invoice = doc(json!({
            "basic": {"dataName": 42, "dateSubmitted": "yesterday"},
            "custom": {"phase": "gamma", "undeclared": 1}
        }));
        let report =
            validate_invoice(&invoice, &schema(), ValidateOptions::default()).unwrap_err();

        assert!(report.has_kind(IssueKind::TypeMismatch));
        assert!(report.has_kind(IssueKind::FormatError));
        assert!(report.has_kind(IssueKind::EnumViolation));
        assert!(report.has_kind(IssueKind::ExtraProperty));
        assert!(report.issues.len() >= 4);
    }

    #[test]
    fn test_required_only_skips_extra_properties() {
        let invoice = doc(json!({
            "basic": {"dataName": "x", "undeclared": true}
        }));
        let result = validate_invoice(
            &invoice,
            &schema(),
            ValidateOptions {
                required_only: true,
            },
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_restructured_sample_relaxes_requirements() {
        // With a sampleId present, names/ownerId are no longer required.
        let invoice = doc(json!({
            "basic": {"dataName": "x"},
            "sample": {"sampleId": "s-123"}
        }));
        assert!(validate_invoice(&invoice, &schema(), ValidateOptions::default()).is_ok());

        // Without a sampleId the full requirement set applies.
        let invoice = doc(json!({
            "basic": {"dataName": "x"},
            "sample": {"names": ["n"]}
        }));
        let report =
            validate_invoice(&invoice, &schema(), ValidateOptions::default()).unwrap_err();
        assert!(report.issues.iter().any(|i| i.path == "sample.sampleId"));
        assert!(report.issues.iter().any(|i| i.path == "sample.ownerId"));
    }

    #[test]
    fn test_metadata_size_bound() {
        let definition = MetadataDefinition::from_value(&json!({
            "note": {"name": {"ja": "x", "en": "x"}, "schema": {"type": "string"}}
        }))
        .unwrap();

        let mut metadata = MetadataDocument::new();
        metadata.insert_constant(
            "note",
            crate::models::metadata::MetaValue::new(json!("a".repeat(MAX_VALUE_SIZE + 1))),
        );

        let report = validate_metadata(&metadata, &definition).unwrap_err();
        assert!(report.has_kind(IssueKind::SizeExceeded));
        assert_eq!(report.issues[0].path, "constant.note");
    }

    #[test]
    fn test_metadata_type_mismatch() {
        let definition = MetadataDefinition::from_value(&json!({
            "count": {"name": {"ja": "x", "en": "x"}, "schema": {"type": "integer"}}
        }))
        .unwrap();

        let mut metadata = MetadataDocument::new();
        metadata.insert_constant(
            "count",
            crate::models::metadata::MetaValue::new(json!("three")),
        );

        let report = validate_metadata(&metadata, &definition).unwrap_err();
        assert!(report.has_kind(IssueKind::TypeMismatch));
    }

    #[test]
    fn test_undeclared_metadata_key_flagged() {
        let definition = MetadataDefinition::from_value(&json!({})).unwrap();
        let mut metadata = MetadataDocument::new();
        metadata.insert_constant("rogue", crate::models::metadata::MetaValue::new(json!(1)));

        let report = validate_metadata(&metadata, &definition).unwrap_err();
        assert!(report.has_kind(IssueKind::ExtraProperty));
    }
}
