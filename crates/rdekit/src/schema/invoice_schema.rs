use std::path::Path;

use serde_json::Value;

use crate::error::ConfigError;
use crate::fileops;

/// Scalar field types admitted by the invoice schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Number,
    Integer,
    Boolean,
}

impl ScalarType {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }

    /// The type-based default materialized when a field carries neither a
    /// `default` nor usable `examples`.
    pub fn default_value(&self) -> Value {
        match self {
            Self::String => Value::String(String::new()),
            Self::Number => serde_json::json!(0.0),
            Self::Integer => serde_json::json!(0),
            Self::Boolean => Value::Bool(false),
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

/// The schema tree, reduced to the closed set of shapes the invoice format
/// uses. Recursion over the untyped JSON happens once, at parse time; all
/// later walks operate on this tagged form.
#[derive(Debug, Clone)]
pub enum SchemaNode {
    Object {
        properties: Vec<(String, SchemaNode)>,
        required: Vec<String>,
    },
    Array {
        items: Box<SchemaNode>,
        default: Option<Value>,
        examples: Vec<Value>,
    },
    Scalar {
        ty: ScalarType,
        default: Option<Value>,
        examples: Vec<Value>,
        enum_values: Option<Vec<Value>>,
        format: Option<String>,
    },
}

impl SchemaNode {
    pub fn property(&self, name: &str) -> Option<&SchemaNode> {
        match self {
            Self::Object { properties, .. } => properties
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, node)| node),
            _ => None,
        }
    }

    pub fn is_required(&self, name: &str) -> bool {
        match self {
            Self::Object { required, .. } => required.iter().any(|r| r == name),
            _ => false,
        }
    }
}

/// Parsed `invoice.schema.json`.
#[derive(Debug, Clone)]
pub struct InvoiceSchema {
    root: SchemaNode,
}

impl InvoiceSchema {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let value = fileops::read_json(path)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let root = build_node(value, "$")?;
        if !matches!(root, SchemaNode::Object { .. }) {
            return Err(structural("$", "schema root must be an object schema"));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    /// Depth-first lookup of a field descriptor by name across nested
    /// `properties`; the first match wins.
    pub fn find_field(&self, name: &str) -> Option<&SchemaNode> {
        find_in(&self.root, name)
    }

    pub fn scalar_type_of(&self, name: &str) -> Option<ScalarType> {
        match self.find_field(name)? {
            SchemaNode::Scalar { ty, .. } => Some(*ty),
            _ => None,
        }
    }
}

fn find_in<'a>(node: &'a SchemaNode, name: &str) -> Option<&'a SchemaNode> {
    match node {
        SchemaNode::Object { properties, .. } => {
            for (key, child) in properties {
                if key == name {
                    return Some(child);
                }
                if let Some(found) = find_in(child, name) {
                    return Some(found);
                }
            }
            None
        }
        SchemaNode::Array { items, .. } => find_in(items, name),
        SchemaNode::Scalar { .. } => None,
    }
}

fn build_node(value: &Value, path: &str) -> Result<SchemaNode, ConfigError> {
    let Some(object) = value.as_object() else {
        return Err(structural(path, "schema node must be a JSON object"));
    };

    let declared_type = object.get("type").and_then(Value::as_str);
    let has_properties = object.get("properties").is_some();

    match declared_type {
        Some("object") => build_object(object, path),
        Some("array") => build_array(object, path),
        Some(keyword) => {
            let ty = ScalarType::from_keyword(keyword)
                .ok_or_else(|| structural(path, format!("unknown type keyword '{keyword}'")))?;
            Ok(build_scalar(object, ty))
        }
        // Schemas in the wild omit `type: object` on nested containers.
        None if has_properties => build_object(object, path),
        None => Err(structural(path, "schema node has neither type nor properties")),
    }
}

fn build_object(
    object: &serde_json::Map<String, Value>,
    path: &str,
) -> Result<SchemaNode, ConfigError> {
    let mut properties = Vec::new();
    if let Some(props) = object.get("properties") {
        let Some(props) = props.as_object() else {
            return Err(structural(path, "'properties' must be an object"));
        };
        for (name, child) in props {
            let child_path = format!("{path}.{name}");
            properties.push((name.clone(), build_node(child, &child_path)?));
        }
    }

    let mut required = Vec::new();
    if let Some(req) = object.get("required") {
        let Some(req) = req.as_array() else {
            return Err(structural(path, "'required' must be an array of strings"));
        };
        for entry in req {
            let Some(name) = entry.as_str() else {
                return Err(structural(path, "'required' must be an array of strings"));
            };
            required.push(name.to_string());
        }
    }

    Ok(SchemaNode::Object {
        properties,
        required,
    })
}

fn build_array(
    object: &serde_json::Map<String, Value>,
    path: &str,
) -> Result<SchemaNode, ConfigError> {
    let items = match object.get("items") {
        Some(items) => build_node(items, &format!("{path}[]"))?,
        // Item-less arrays degrade to arrays of strings.
        None => SchemaNode::Scalar {
            ty: ScalarType::String,
            default: None,
            examples: Vec::new(),
            enum_values: None,
            format: None,
        },
    };

    Ok(SchemaNode::Array {
        items: Box::new(items),
        default: object.get("default").cloned(),
        examples: examples_of(object),
    })
}

fn build_scalar(object: &serde_json::Map<String, Value>, ty: ScalarType) -> SchemaNode {
    SchemaNode::Scalar {
        ty,
        default: object.get("default").cloned(),
        examples: examples_of(object),
        enum_values: object
            .get("enum")
            .and_then(Value::as_array)
            .map(|values| values.to_vec()),
        format: object
            .get("format")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

fn examples_of(object: &serde_json::Map<String, Value>) -> Vec<Value> {
    object
        .get("examples")
        .and_then(Value::as_array)
        .map(|values| values.to_vec())
        .unwrap_or_default()
}

fn structural(path: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: path.to_string(),
        message: message.into(),
    }
}
