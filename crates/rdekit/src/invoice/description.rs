//! Transcription of feature-flagged metadata into the invoice description.

use crate::models::invoice::InvoiceDocument;
use crate::models::metadata::MetadataDocument;
use crate::schema::metadata_def::MetadataDefinition;

/// Appends one `name(unit):value` line per feature-flagged metadata entry
/// to `basic.description`.
///
/// A `constant` value shadows `variable` values for the same key; a key
/// carried by several variable sets renders as `[v1,v2,…]`.
pub fn update_description_with_features(
    invoice: &mut InvoiceDocument,
    definition: &MetadataDefinition,
    metadata: &MetadataDocument,
) {
    let mut description = invoice.description().unwrap_or_default().to_string();

    for (key, entry) in definition.feature_entries() {
        let Some(rendered) = feature_value(key, metadata) else {
            continue;
        };

        let name = &entry.name.ja;
        let line = match entry.unit.as_deref() {
            Some(unit) => format!("{name}({unit}):{rendered}"),
            None => format!("{name}:{rendered}"),
        };

        if description.is_empty() {
            description = line;
        } else {
            description.push('\n');
            description.push_str(&line);
        }
    }

    invoice.set_field(
        "basic",
        "description",
        serde_json::Value::String(description),
    );
}

fn feature_value(key: &str, metadata: &MetadataDocument) -> Option<String> {
    if let Some(constant) = metadata.constant_value(key) {
        return Some(constant.value_string());
    }

    let values: Vec<String> = metadata
        .variable_values(key)
        .into_iter()
        .map(|v| v.value_string())
        .collect();
    match values.len() {
        0 => None,
        1 => Some(values.into_iter().next().expect("one entry")),
        _ => Some(format!("[{}]", values.join(","))),
    }
}
