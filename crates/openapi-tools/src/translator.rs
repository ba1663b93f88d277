//! Operation → tool-call schema translation.
//!
//! Each operation becomes one tool whose input schema has up to three object-typed groups:
//! `pathNames` (path placeholders), `searchParams` (query string) and `requestBody` (flattened
//! body properties). Groups without properties are left out entirely.

use crate::descriptor::{OperationDescriptor, ParamLocation, PropertySchema};
use crate::error::{OpenApiToolsError, Result};
use crate::naming::{sanitize, tool_name};
use rmcp::model::JsonObject;
use serde_json::{Map, Value, json};

/// Argument key holding path parameters.
pub const PATH_GROUP: &str = "pathNames";
/// Argument key holding query parameters.
pub const QUERY_GROUP: &str = "searchParams";
/// Argument key holding body fields.
pub const BODY_GROUP: &str = "requestBody";

/// Marker prepended to descriptions of required properties.
pub const REQUIRED_MARKER: &str = "[required]";

/// One parameter group of a tool input schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterGroup {
    pub properties: Map<String, Value>,
    /// Required property names, in the order they were encountered.
    pub required: Vec<String>,
}

impl ParameterGroup {
    fn insert(&mut self, name: &str, property: Value, required: bool) {
        self.properties.insert(name.to_string(), property);
        self.required.retain(|r| r != name);
        if required {
            self.required.push(name.to_string());
        }
    }

    fn into_non_empty(self) -> Option<Self> {
        (!self.properties.is_empty()).then_some(self)
    }

    fn to_schema(&self, description: &str) -> Value {
        json!({
            "type": "object",
            "description": description,
            "properties": self.properties,
            "required": self.required,
        })
    }
}

/// Translator output for one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallSchema {
    pub name: String,
    pub description: String,
    pub path: Option<ParameterGroup>,
    pub query: Option<ParameterGroup>,
    pub body: Option<ParameterGroup>,
}

impl ToolCallSchema {
    /// Render the MCP input schema (a JSON Schema object with one property per group).
    #[must_use]
    pub fn input_schema(&self) -> JsonObject {
        let mut properties = Map::new();
        if let Some(group) = &self.path {
            properties.insert(
                PATH_GROUP.to_string(),
                group.to_schema("Path parameters, substituted into the URL template"),
            );
        }
        if let Some(group) = &self.query {
            properties.insert(
                QUERY_GROUP.to_string(),
                group.to_schema("Query string parameters"),
            );
        }
        if let Some(group) = &self.body {
            properties.insert(
                BODY_GROUP.to_string(),
                group.to_schema("Request body fields, sent as a JSON object"),
            );
        }

        let mut schema = JsonObject::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        schema
    }
}

/// Translates the operations of one API document.
#[derive(Debug, Clone)]
pub struct SchemaTranslator {
    prefix: String,
}

impl SchemaTranslator {
    /// Create a translator for a document; the tool name prefix is the sanitized title.
    #[must_use]
    pub fn new(api_title: &str) -> Self {
        Self {
            prefix: sanitize(api_title),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Translate one operation into its tool name and call schema.
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiToolsError::MissingSchemaType`] if a parameter or body property schema
    /// carries no type tag.
    pub fn translate(&self, operation: &OperationDescriptor) -> Result<ToolCallSchema> {
        let name = tool_name(&self.prefix, &operation.id);
        let description = format!(
            "{} {} {}",
            operation.id, operation.summary, operation.description
        );

        let mut path = ParameterGroup::default();
        let mut query = ParameterGroup::default();

        for param in &operation.parameters {
            let group = match param.location {
                ParamLocation::Path => &mut path,
                ParamLocation::Query => &mut query,
                // Headers/cookies have no slot in the call schema.
                ParamLocation::Header | ParamLocation::Cookie => {
                    tracing::debug!(
                        operation = %operation.id,
                        param = %param.name,
                        location = param.location.as_str(),
                        "dropping parameter"
                    );
                    continue;
                }
            };

            let param_description = param
                .description
                .as_deref()
                .or(param.schema.description.as_deref());
            let property = build_property(
                operation,
                &param.name,
                &param.schema,
                param_description,
                param.required,
            )?;
            group.insert(&param.name, property, param.required);
        }

        let mut body = ParameterGroup::default();
        if let Some(request_body) = &operation.request_body {
            for media in &request_body.content {
                let Some(schema) = &media.schema else {
                    continue;
                };
                for (prop_name, prop_schema) in &schema.properties {
                    let required = schema.is_required(prop_name);
                    let property = build_property(
                        operation,
                        prop_name,
                        prop_schema,
                        prop_schema.description.as_deref(),
                        required,
                    )?;
                    body.insert(prop_name, property, required);
                }
            }
        }

        let schema = ToolCallSchema {
            name,
            description,
            path: path.into_non_empty(),
            query: query.into_non_empty(),
            body: body.into_non_empty(),
        };

        tracing::debug!(
            tool = %schema.name,
            operation = %operation.id,
            path_params = schema.path.as_ref().map_or(0, |g| g.properties.len()),
            query_params = schema.query.as_ref().map_or(0, |g| g.properties.len()),
            body_fields = schema.body.as_ref().map_or(0, |g| g.properties.len()),
            "translated operation"
        );

        Ok(schema)
    }
}

fn build_property(
    operation: &OperationDescriptor,
    name: &str,
    schema: &PropertySchema,
    description: Option<&str>,
    required: bool,
) -> Result<Value> {
    let Some(schema_type) = &schema.schema_type else {
        return Err(OpenApiToolsError::MissingSchemaType {
            operation: operation.id.clone(),
            property: name.to_string(),
        });
    };

    let mut prop = Map::new();
    prop.insert("type".to_string(), json!(schema_type));
    prop.insert(
        "description".to_string(),
        json!(prefix_required(required, description.unwrap_or_default())),
    );
    if let Some(values) = &schema.enum_values {
        prop.insert("enum".to_string(), json!(values));
    }
    if let Some(format) = &schema.format {
        prop.insert("format".to_string(), json!(format));
    }
    if let Some(default) = &schema.default {
        prop.insert("default".to_string(), default.clone());
    }
    if let Some(items) = &schema.items {
        prop.insert("items".to_string(), items.clone());
    }
    if let Some(properties) = &schema.properties {
        prop.insert("properties".to_string(), Value::Object(properties.clone()));
    }

    Ok(Value::Object(prop))
}

fn prefix_required(required: bool, description: &str) -> String {
    if required && !description.starts_with(REQUIRED_MARKER) {
        format!("{REQUIRED_MARKER} {description}")
    } else {
        description.to_string()
    }
}
