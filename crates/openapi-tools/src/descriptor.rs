//! Parsed API contract model.
//!
//! These types are what a contract parser hands to the translator: one [`OperationDescriptor`]
//! per HTTP operation, already `$ref`-resolved. They are plain data and never mutated after the
//! parser produces them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Read access to a parsed API contract.
pub trait ApiContract {
    /// Document title and version.
    fn info(&self) -> ApiInfo;

    /// All operations, in document order.
    fn operations(&self) -> &[OperationDescriptor];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiInfo {
    pub title: String,
    pub version: String,
}

/// One API endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDescriptor {
    /// Unique operation identifier (`operationId`).
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    /// HTTP method, as written in the document (usually lowercase).
    pub method: String,
    /// Path template with `{name}` placeholders, e.g. `/users/{id}`.
    pub path: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDescriptor>,
    #[serde(default)]
    pub request_body: Option<RequestBodyDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParamLocation,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: Option<String>,
    pub schema: PropertySchema,
}

/// Where a parameter lives in the HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParamLocation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ParamLocation::Path => "path",
            ParamLocation::Query => "query",
            ParamLocation::Header => "header",
            ParamLocation::Cookie => "cookie",
        }
    }
}

/// Request body content, keyed by media type in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestBodyDescriptor {
    #[serde(default)]
    pub content: Vec<MediaTypeSchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaTypeSchema {
    pub media_type: String,
    /// `None` when the media type declares no schema.
    #[serde(default)]
    pub schema: Option<BodySchema>,
}

/// Object schema of a request body: named properties plus the required-field list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodySchema {
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl BodySchema {
    #[must_use]
    pub fn is_required(&self, property: &str) -> bool {
        self.required.iter().any(|r| r == property)
    }
}

/// JSON Schema fragment describing one parameter or body property.
///
/// `items` and `properties` are carried as opaque JSON: the translator passes them through
/// without looking inside.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    /// Type tag (`string`, `integer`, ...). `None` means the source schema had no usable type.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl PropertySchema {
    /// Shorthand for a schema carrying only a type tag.
    #[must_use]
    pub fn typed(schema_type: impl Into<String>) -> Self {
        Self {
            schema_type: Some(schema_type.into()),
            ..Self::default()
        }
    }

    /// Read the recognized slots out of a JSON Schema value. Unknown keys are ignored.
    ///
    /// Slots holding an unexpected JSON shape (e.g. a numeric `format`) are treated as absent.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let string_slot = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);

        Self {
            schema_type: string_slot("type"),
            description: string_slot("description"),
            enum_values: obj.get("enum").and_then(Value::as_array).cloned(),
            format: string_slot("format").filter(|f| !f.is_empty()),
            default: obj.get("default").filter(|v| !v.is_null()).cloned(),
            items: obj.get("items").cloned(),
            properties: obj.get("properties").and_then(Value::as_object).cloned(),
            required: obj
                .get("required")
                .and_then(Value::as_array)
                .map(|r| {
                    r.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// An in-memory contract, for callers that build descriptors themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticContract {
    pub info: ApiInfo,
    pub operations: Vec<OperationDescriptor>,
}

impl ApiContract for StaticContract {
    fn info(&self) -> ApiInfo {
        self.info.clone()
    }

    fn operations(&self) -> &[OperationDescriptor] {
        &self.operations
    }
}
