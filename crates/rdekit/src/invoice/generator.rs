use serde_json::{Map, Value};

use crate::models::invoice::InvoiceDocument;
use crate::schema::invoice_schema::{InvoiceSchema, SchemaNode};

#[derive(Debug, Clone, Copy)]
pub struct GenerateOptions {
    /// Fall back to the first schema example when a field has no `default`.
    pub fill_defaults: bool,
    /// Emit only fields listed in an ancestor's `required` array, plus the
    /// always-required `basic` and `datasetId` containers.
    pub required_only: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            fill_defaults: true,
            required_only: false,
        }
    }
}

/// Top-level containers emitted even when `required_only` prunes the rest.
const ALWAYS_REQUIRED: [&str; 2] = ["basic", "datasetId"];

/// Materializes an invoice document from a schema.
///
/// Default-value priority per field: the field's `default`, then the first
/// of `examples` when `fill_defaults` is set, then the type-based default.
pub fn generate_from_schema(schema: &InvoiceSchema, options: GenerateOptions) -> InvoiceDocument {
    let value = materialize(schema.root(), &options, true);
    InvoiceDocument::from_value(value).unwrap_or_default()
}

fn materialize(node: &SchemaNode, options: &GenerateOptions, top_level: bool) -> Value {
    match node {
        SchemaNode::Object {
            properties,
            required,
        } => {
            let mut map = Map::new();
            for (name, child) in properties {
                if options.required_only {
                    let keep = required.iter().any(|r| r == name)
                        || (top_level && ALWAYS_REQUIRED.contains(&name.as_str()));
                    if !keep {
                        continue;
                    }
                }
                map.insert(name.clone(), materialize(child, options, false));
            }
            Value::Object(map)
        }
        SchemaNode::Array {
            default, examples, ..
        } => pick_default(default, examples, options)
            .unwrap_or_else(|| Value::Array(Vec::new())),
        SchemaNode::Scalar {
            ty,
            default,
            examples,
            ..
        } => pick_default(default, examples, options).unwrap_or_else(|| ty.default_value()),
    }
}

fn pick_default(
    default: &Option<Value>,
    examples: &[Value],
    options: &GenerateOptions,
) -> Option<Value> {
    if let Some(value) = default {
        return Some(value.clone());
    }
    if options.fill_defaults {
        return examples.first().cloned();
    }
    None
}
