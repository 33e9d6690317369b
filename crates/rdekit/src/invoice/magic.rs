//! Magic-variable substitution for derived filenames and fields.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::TemplateError;
use crate::models::invoice::InvoiceDocument;
use crate::models::metadata::MetadataDocument;

fn magic_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^{}]+)\}").expect("valid pattern"))
}

/// Returns true when the string carries at least one `${…}` token.
pub fn contains_magic_variable(text: &str) -> bool {
    magic_pattern().is_match(text)
}

/// Resolves `${…}` expressions against the tile's first raw file, the
/// original invoice (`invoice_org`) and the constants of `metadata.json`.
pub struct MagicVariableResolver<'a> {
    rawfile_path: &'a Path,
    invoice_source: &'a InvoiceDocument,
    metadata_source: Option<&'a MetadataDocument>,
}

impl<'a> MagicVariableResolver<'a> {
    pub fn new(
        rawfile_path: &'a Path,
        invoice_source: &'a InvoiceDocument,
        metadata_source: Option<&'a MetadataDocument>,
    ) -> Self {
        Self {
            rawfile_path,
            invoice_source,
            metadata_source,
        }
    }

    /// Expands every magic variable in `template`.
    ///
    /// Empty resolutions are replaced by nothing, and a literal underscore
    /// adjacent to a skipped token is collapsed so `__` never appears in
    /// the output.
    pub fn expand(&self, template: &str) -> Result<String, TemplateError> {
        let mut parts: Vec<String> = Vec::new();
        let mut last_end = 0;
        let mut skip_pending = false;

        for token in magic_pattern().captures_iter(template) {
            let whole = token.get(0).expect("match 0 always present");
            let literal = &template[last_end..whole.start()];
            if !literal.is_empty() {
                parts.push(trim_redundant_underscore(literal, &parts, skip_pending));
                skip_pending = false;
            }

            let expression = token[1].trim().to_string();
            match self.resolve(&expression)? {
                Some(replacement) => {
                    parts.push(replacement);
                    skip_pending = false;
                }
                None => skip_pending = true,
            }

            last_end = whole.end();
        }

        let trailing = &template[last_end..];
        if !trailing.is_empty() {
            parts.push(trim_redundant_underscore(trailing, &parts, skip_pending));
        }

        let result = parts.concat();
        if result.is_empty() {
            return Err(TemplateError::EmptyResult {
                template: template.to_string(),
            });
        }
        Ok(result)
    }

    fn resolve(&self, expression: &str) -> Result<Option<String>, TemplateError> {
        if expression.is_empty() {
            return Err(TemplateError::EmptyExpression);
        }

        let segments: Vec<&str> = expression.split(':').collect();
        match segments[0] {
            "filename" => Ok(self
                .rawfile_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())),
            "invoice" => self.resolve_invoice(&segments[1..], expression),
            "metadata" => self.resolve_metadata(&segments[1..], expression),
            _ => Err(TemplateError::Unsupported(expression.to_string())),
        }
    }

    fn resolve_invoice(
        &self,
        segments: &[&str],
        expression: &str,
    ) -> Result<Option<String>, TemplateError> {
        match segments {
            ["basic", field] | ["custom", field] => {
                let section = segments[0];
                let value = self
                    .invoice_source
                    .field(section, field)
                    .ok_or_else(|| TemplateError::MissingField {
                        expression: expression.to_string(),
                        field: format!("{section}.{field}"),
                    })?;
                normalize_scalar(value, expression)
            }
            ["sample", "names"] => {
                let names = self
                    .invoice_source
                    .field("sample", "names")
                    .and_then(Value::as_array)
                    .ok_or_else(|| TemplateError::MissingField {
                        expression: expression.to_string(),
                        field: "sample.names".to_string(),
                    })?;

                let filtered: Vec<&str> = names
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|n| !n.is_empty())
                    .collect();
                if filtered.is_empty() {
                    debug!(expression, "sample.names holds no usable entries; skipping token");
                    return Ok(None);
                }
                Ok(Some(filtered.join("_")))
            }
            _ => Err(TemplateError::Unsupported(expression.to_string())),
        }
    }

    fn resolve_metadata(
        &self,
        segments: &[&str],
        expression: &str,
    ) -> Result<Option<String>, TemplateError> {
        match segments {
            ["constant", key] => {
                let metadata =
                    self.metadata_source
                        .ok_or_else(|| TemplateError::MissingField {
                            expression: expression.to_string(),
                            field: "metadata.json".to_string(),
                        })?;
                let entry = metadata.constant_value(key).ok_or_else(|| {
                    TemplateError::MissingField {
                        expression: expression.to_string(),
                        field: format!("constant.{key}"),
                    }
                })?;
                normalize_scalar(&entry.value, expression)
            }
            ["variable", ..] => Err(TemplateError::VariableMetadataRejected),
            _ => Err(TemplateError::Unsupported(expression.to_string())),
        }
    }
}

/// Expands magic variables in every string field of the `basic`, `custom`
/// and `sample` sections. Returns true when anything changed.
pub fn apply_to_invoice(
    invoice: &mut InvoiceDocument,
    resolver: &MagicVariableResolver<'_>,
) -> Result<bool, TemplateError> {
    let mut changed = false;

    for section in ["basic", "custom", "sample"] {
        let Some(map) = invoice.section(section) else {
            continue;
        };

        let mut updates: Vec<(String, Value)> = Vec::new();
        for (key, value) in map {
            let mut candidate = value.clone();
            if expand_in_value(&mut candidate, resolver)? {
                updates.push((key.clone(), candidate));
            }
        }

        if !updates.is_empty() {
            changed = true;
            for (key, value) in updates {
                invoice.set_field(section, &key, value);
            }
        }
    }

    Ok(changed)
}

fn expand_in_value(
    value: &mut Value,
    resolver: &MagicVariableResolver<'_>,
) -> Result<bool, TemplateError> {
    match value {
        Value::String(text) if contains_magic_variable(text) => {
            *text = resolver.expand(text)?;
            Ok(true)
        }
        Value::Array(entries) => {
            let mut changed = false;
            for entry in entries {
                changed |= expand_in_value(entry, resolver)?;
            }
            Ok(changed)
        }
        Value::Object(map) => {
            let mut changed = false;
            for (_, entry) in map.iter_mut() {
                changed |= expand_in_value(entry, resolver)?;
            }
            Ok(changed)
        }
        _ => Ok(false),
    }
}

fn trim_redundant_underscore(literal: &str, parts: &[String], skip_pending: bool) -> String {
    if skip_pending
        && literal.starts_with('_')
        && parts.last().is_some_and(|p| p.ends_with('_'))
    {
        literal[1..].to_string()
    } else {
        literal.to_string()
    }
}

fn normalize_scalar(value: &Value, expression: &str) -> Result<Option<String>, TemplateError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        _ => Err(TemplateError::NonScalar {
            expression: expression.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invoice() -> InvoiceDocument {
        InvoiceDocument::from_value(json!({
            "basic": {"dataName": "base", "experimentId": "EXP-9", "empty": ""},
            "custom": {"cycles": 3},
            "sample": {"names": ["", "beta"]}
        }))
        .unwrap()
    }

    fn metadata() -> MetadataDocument {
        serde_json::from_value(json!({
            "constant": {"length": {"value": 120, "unit": "nm"}},
            "variable": []
        }))
        .unwrap()
    }

    #[test]
    fn test_filename_resolution() {
        let doc = invoice();
        let resolver = MagicVariableResolver::new(Path::new("/in/a.csv"), &doc, None);
        assert_eq!(resolver.expand("${filename}").unwrap(), "a.csv");
    }

    #[test]
    fn test_invoice_field_resolution() {
        let doc = invoice();
        let resolver = MagicVariableResolver::new(Path::new("a.csv"), &doc, None);
        assert_eq!(
            resolver.expand("${invoice:basic:experimentId}_run").unwrap(),
            "EXP-9_run"
        );
        assert_eq!(
            resolver.expand("${invoice:custom:cycles}").unwrap(),
            "3"
        );
    }

    #[test]
    fn test_missing_field_is_fatal() {
        let doc = invoice();
        let resolver = MagicVariableResolver::new(Path::new("a.csv"), &doc, None);
        let err = resolver.expand("${invoice:basic:absent}").unwrap_err();
        assert!(matches!(err, TemplateError::MissingField { .. }));
    }

    #[test]
    fn test_sample_names_joined_with_underscore() {
        let doc = InvoiceDocument::from_value(json!({
            "sample": {"names": ["alpha", "", "beta"]}
        }))
        .unwrap();
        let resolver = MagicVariableResolver::new(Path::new("a.csv"), &doc, None);
        assert_eq!(
            resolver.expand("${invoice:sample:names}").unwrap(),
            "alpha_beta"
        );
    }

    #[test]
    fn test_empty_substitution_collapses_underscores() {
        // experimentId present, names filtered to one entry, filename last.
        let doc = invoice();
        let resolver = MagicVariableResolver::new(Path::new("a.csv"), &doc, None);
        let result = resolver
            .expand("${invoice:basic:experimentId}_${invoice:sample:names}_${filename}")
            .unwrap();
        assert_eq!(result, "EXP-9_beta_a.csv");
        assert!(!result.contains("__"));

        // an empty-valued field is skipped entirely
        let result = resolver
            .expand("${invoice:basic:empty}_${filename}")
            .unwrap();
        assert_eq!(result, "_a.csv");
    }

    #[test]
    fn test_no_double_underscore_when_skip_in_middle() {
        let doc = InvoiceDocument::from_value(json!({
            "basic": {"a": "left", "gone": ""},
        }))
        .unwrap();
        let resolver = MagicVariableResolver::new(Path::new("f.csv"), &doc, None);
        let result = resolver
            .expand("${invoice:basic:a}_${invoice:basic:gone}_${filename}")
            .unwrap();
        assert_eq!(result, "left_f.csv");
    }

    #[test]
    fn test_metadata_constant_resolution() {
        let doc = invoice();
        let meta = metadata();
        let resolver = MagicVariableResolver::new(Path::new("a.csv"), &doc, Some(&meta));
        assert_eq!(
            resolver.expand("${metadata:constant:length}").unwrap(),
            "120"
        );
    }

    #[test]
    fn test_metadata_variable_rejected() {
        let doc = invoice();
        let meta = metadata();
        let resolver = MagicVariableResolver::new(Path::new("a.csv"), &doc, Some(&meta));
        let err = resolver.expand("${metadata:variable:t}").unwrap_err();
        assert!(matches!(err, TemplateError::VariableMetadataRejected));
    }

    #[test]
    fn test_unsupported_pattern_rejected() {
        let doc = invoice();
        let resolver = MagicVariableResolver::new(Path::new("a.csv"), &doc, None);
        assert!(matches!(
            resolver.expand("${config:save_raw}").unwrap_err(),
            TemplateError::Unsupported(_)
        ));
    }

    #[test]
    fn test_apply_to_invoice_rewrites_all_sections() {
        let source = invoice();
        let mut target = InvoiceDocument::from_value(json!({
            "basic": {"dataName": "${filename}"},
            "custom": {"label": "${invoice:basic:experimentId}"},
            "sample": {"names": ["${filename}"]}
        }))
        .unwrap();

        let resolver = MagicVariableResolver::new(Path::new("run.csv"), &source, None);
        let changed = apply_to_invoice(&mut target, &resolver).unwrap();

        assert!(changed);
        assert_eq!(target.data_name(), Some("run.csv"));
        assert_eq!(target.field("custom", "label"), Some(&json!("EXP-9")));
        assert_eq!(target.field("sample", "names"), Some(&json!(["run.csv"])));
    }

    #[test]
    fn test_result_never_contains_literal_token() {
        let source = invoice();
        let mut target = InvoiceDocument::from_value(json!({
            "basic": {"dataName": "${filename}_${invoice:basic:experimentId}"}
        }))
        .unwrap();
        let resolver = MagicVariableResolver::new(Path::new("x.csv"), &source, None);
        apply_to_invoice(&mut target, &resolver).unwrap();
        assert!(!target.data_name().unwrap().contains("${"));
    }
}
