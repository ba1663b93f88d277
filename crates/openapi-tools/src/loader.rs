//! `OpenAPI` document loading.
//!
//! [`OpenApiDocument`] reads a spec from a file or URL, parses it with `openapiv3`, resolves
//! local `$ref`s and flattens every operation into an [`OperationDescriptor`]. It is the
//! [`ApiContract`] implementation the adapter uses.

use crate::config::{ApiServerConfig, HashPolicy};
use crate::descriptor::{
    ApiContract, ApiInfo, BodySchema, MediaTypeSchema, OperationDescriptor, ParamLocation,
    ParameterDescriptor, PropertySchema, RequestBodyDescriptor,
};
use crate::error::{OpenApiToolsError, Result};
use crate::naming::canonical_operation_id;
use crate::resolver::LocalResolver;
use openapiv3::{
    OpenAPI, Operation, Parameter, ParameterSchemaOrContent, ReferenceOr, Schema, SchemaKind, Type,
};
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use url::Url;

/// A parsed `OpenAPI` document, reduced to what tool generation needs.
#[derive(Debug, Clone)]
pub struct OpenApiDocument {
    location: String,
    info: ApiInfo,
    servers: Vec<String>,
    operations: Vec<OperationDescriptor>,
}

impl OpenApiDocument {
    /// Fetch (or read) the spec named by `config.spec`, verify its hash and parse it.
    ///
    /// # Errors
    ///
    /// Returns an error if the spec cannot be fetched/read, fails hash verification under
    /// [`HashPolicy::Fail`], or does not parse as `OpenAPI` 3.
    pub async fn load(config: &ApiServerConfig, client: &Client) -> Result<Self> {
        let content = read_spec(&config.spec, client).await?;
        verify_spec_hash(config, &content)?;
        Self::parse(&content, &config.spec)
    }

    /// Parse spec text (JSON or YAML). `location` is only used in errors and base URL
    /// resolution.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid `OpenAPI` 3 document.
    pub fn parse(content: &str, location: &str) -> Result<Self> {
        // JSON is a valid subset of YAML, so serde_yaml alone is enough.
        let spec: OpenAPI =
            serde_yaml::from_str(content).map_err(|e| OpenApiToolsError::OpenApiSpecParse {
                location: location.to_string(),
                source: e,
            })?;
        Self::from_spec(&spec, location)
    }

    /// Build descriptors from an already parsed spec.
    ///
    /// Operations that cannot be described (unresolvable `$ref`s, etc.) are skipped with a
    /// warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the spec cannot be indexed for `$ref` resolution.
    pub fn from_spec(spec: &OpenAPI, location: &str) -> Result<Self> {
        let resolver = LocalResolver::new(spec)?;
        let mut operations = Vec::new();

        for (path, path_item) in &spec.paths.paths {
            let path_item = match resolver.resolve(path_item) {
                Ok(item) => item,
                Err(e) => {
                    tracing::warn!(spec = %location, path = %path, error = %e, "skipping path");
                    continue;
                }
            };

            let methods = [
                ("get", &path_item.get),
                ("put", &path_item.put),
                ("post", &path_item.post),
                ("delete", &path_item.delete),
                ("options", &path_item.options),
                ("head", &path_item.head),
                ("patch", &path_item.patch),
                ("trace", &path_item.trace),
            ];

            for (method, operation) in methods {
                let Some(operation) = operation else {
                    continue;
                };
                match describe_operation(&resolver, path, method, &path_item.parameters, operation)
                {
                    Ok(op) => operations.push(op),
                    Err(e) => {
                        tracing::warn!(
                            spec = %location,
                            "Skipping {} {}: {}",
                            method.to_uppercase(),
                            path,
                            e
                        );
                    }
                }
            }
        }

        Ok(Self {
            location: location.to_string(),
            info: ApiInfo {
                title: spec.info.title.clone(),
                version: spec.info.version.clone(),
            },
            servers: spec.servers.iter().map(|s| s.url.clone()).collect(),
            operations,
        })
    }

    /// The first `servers[].url` of the document, if any.
    #[must_use]
    pub fn server_url(&self) -> Option<&str> {
        self.servers.first().map(String::as_str)
    }

    /// Pick the base URL for outbound calls: the configured override, else the first server.
    ///
    /// Relative server URLs (e.g. `/api/v3`) are resolved against the spec URL when the spec was
    /// fetched over HTTP. A trailing `/` is dropped so that `base + path` stays well-formed.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL is known, or it is relative and cannot be resolved.
    pub fn resolve_base_url(&self, override_url: Option<&str>) -> Result<String> {
        let Some(base_url) = override_url.or_else(|| self.server_url()) else {
            return Err(OpenApiToolsError::OpenApi(
                "No base URL configured and none found in spec".to_string(),
            ));
        };

        let resolved = if is_http_url(base_url) {
            base_url.to_string()
        } else if is_http_url(&self.location) {
            let mut spec_url = Url::parse(&self.location).map_err(|e| {
                OpenApiToolsError::OpenApi(format!(
                    "Invalid OpenAPI spec URL '{}': {e}",
                    self.location
                ))
            })?;
            spec_url.set_fragment(None);
            spec_url
                .join(base_url)
                .map_err(|e| {
                    OpenApiToolsError::OpenApi(format!(
                        "Invalid baseUrl '{base_url}': {e} (set baseUrl explicitly)",
                    ))
                })?
                .to_string()
        } else {
            return Err(OpenApiToolsError::OpenApi(format!(
                "Invalid baseUrl '{base_url}': must be an absolute http(s) URL (set baseUrl explicitly)",
            )));
        };

        Ok(resolved.trim_end_matches('/').to_string())
    }
}

impl ApiContract for OpenApiDocument {
    fn info(&self) -> ApiInfo {
        self.info.clone()
    }

    fn operations(&self) -> &[OperationDescriptor] {
        &self.operations
    }
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

async fn read_spec(location: &str, client: &Client) -> Result<String> {
    if is_http_url(location) {
        tracing::info!("Fetching OpenAPI spec from {}", location);
        let fetch_err = |e: reqwest::Error| OpenApiToolsError::OpenApiSpecFetch {
            url: location.to_string(),
            message: e.to_string(),
        };
        let resp = client.get(location).send().await.map_err(fetch_err)?;
        resp.text().await.map_err(fetch_err)
    } else {
        tracing::info!("Loading OpenAPI spec from {}", location);
        std::fs::read_to_string(location).map_err(|e| OpenApiToolsError::OpenApiSpecReadFile {
            path: location.to_string(),
            source: e,
        })
    }
}

fn verify_spec_hash(config: &ApiServerConfig, content: &str) -> Result<()> {
    let Some(expected_hash) = &config.spec_hash else {
        return Ok(());
    };

    let actual_hash = format!("sha256:{}", hex::encode(Sha256::digest(content)));
    if actual_hash == *expected_hash {
        return Ok(());
    }

    match config.spec_hash_policy {
        HashPolicy::Fail => Err(OpenApiToolsError::OpenApi(format!(
            "Spec hash mismatch. Expected: {expected_hash}, Got: {actual_hash}",
        ))),
        HashPolicy::Warn => {
            tracing::warn!(
                "Spec hash mismatch for '{}'. Expected: {}, Got: {}",
                config.spec,
                expected_hash,
                actual_hash
            );
            Ok(())
        }
        HashPolicy::Ignore => Ok(()),
    }
}

fn describe_operation(
    resolver: &LocalResolver,
    path: &str,
    method: &str,
    path_item_params: &[ReferenceOr<Parameter>],
    operation: &Operation,
) -> Result<OperationDescriptor> {
    let parameters = merge_parameters(resolver, path_item_params, &operation.parameters)?
        .iter()
        .map(|p| describe_parameter(resolver, p))
        .collect::<Result<Vec<_>>>()?;

    let request_body = match &operation.request_body {
        Some(body_ref) => {
            let body = resolver.resolve(body_ref)?;
            let mut content = Vec::with_capacity(body.content.len());
            for (media_type, media) in &body.content {
                let schema = match &media.schema {
                    Some(schema_ref) => Some(describe_body_schema(resolver, schema_ref)?),
                    None => None,
                };
                content.push(MediaTypeSchema {
                    media_type: media_type.clone(),
                    schema,
                });
            }
            Some(RequestBodyDescriptor { content })
        }
        None => None,
    };

    Ok(OperationDescriptor {
        id: operation
            .operation_id
            .clone()
            .unwrap_or_else(|| canonical_operation_id(method, path)),
        summary: operation.summary.clone().unwrap_or_default(),
        description: operation.description.clone().unwrap_or_default(),
        method: method.to_string(),
        path: path.to_string(),
        parameters,
        request_body,
    })
}

/// Merge path-item level parameters with operation parameters; the operation wins on the same
/// name + location.
fn merge_parameters(
    resolver: &LocalResolver,
    path_item_params: &[ReferenceOr<Parameter>],
    operation_params: &[ReferenceOr<Parameter>],
) -> Result<Vec<Parameter>> {
    fn key_for(p: &Parameter) -> (ParamLocation, String) {
        let (location, data) = split_parameter(p);
        (location, data.name.clone())
    }

    let mut merged: Vec<Parameter> = Vec::new();
    let mut index: HashMap<(ParamLocation, String), usize> = HashMap::new();

    for p in path_item_params.iter().chain(operation_params) {
        let resolved = resolver.resolve(p)?;
        let key = key_for(&resolved);
        if let Some(i) = index.get(&key).copied() {
            merged[i] = resolved;
        } else {
            index.insert(key, merged.len());
            merged.push(resolved);
        }
    }

    Ok(merged)
}

fn split_parameter(p: &Parameter) -> (ParamLocation, &openapiv3::ParameterData) {
    match p {
        Parameter::Path { parameter_data, .. } => (ParamLocation::Path, parameter_data),
        Parameter::Query { parameter_data, .. } => (ParamLocation::Query, parameter_data),
        Parameter::Header { parameter_data, .. } => (ParamLocation::Header, parameter_data),
        Parameter::Cookie { parameter_data, .. } => (ParamLocation::Cookie, parameter_data),
    }
}

fn describe_parameter(resolver: &LocalResolver, param: &Parameter) -> Result<ParameterDescriptor> {
    let (location, data) = split_parameter(param);

    let schema = match &data.format {
        ParameterSchemaOrContent::Schema(schema_ref) => {
            describe_schema(&data.name, &resolver.resolve(schema_ref)?)?
        }
        // `content`-style parameters carry a serialized value.
        ParameterSchemaOrContent::Content(_) => PropertySchema::typed("string"),
    };

    Ok(ParameterDescriptor {
        name: data.name.clone(),
        location,
        // Path params are always required.
        required: location == ParamLocation::Path || data.required,
        description: data.description.clone(),
        schema,
    })
}

fn describe_body_schema(
    resolver: &LocalResolver,
    schema_ref: &ReferenceOr<Schema>,
) -> Result<BodySchema> {
    let schema = resolver.resolve(schema_ref)?;

    let SchemaKind::Type(Type::Object(obj)) = &schema.schema_kind else {
        return Ok(BodySchema::default());
    };

    let mut body = BodySchema {
        required: obj.required.clone(),
        ..BodySchema::default()
    };
    for (name, prop_ref) in &obj.properties {
        let prop = resolver.resolve(prop_ref)?;
        body.properties
            .insert(name.clone(), describe_schema(name, &prop)?);
    }
    Ok(body)
}

/// Convert an `openapiv3` schema to a [`PropertySchema`].
///
/// The type tag is copied as declared. Free-form (`{}`) and composition
/// (`oneOf`/`allOf`/`anyOf`/`not`) schemas carry none and fail here, which skips the operation.
fn describe_schema(property: &str, schema: &Schema) -> Result<PropertySchema> {
    let value = serde_json::to_value(schema)?;
    let prop = PropertySchema::from_json(&value);

    if prop.schema_type.is_none() {
        return Err(OpenApiToolsError::OpenApi(format!(
            "schema of '{property}' has no type"
        )));
    }

    Ok(prop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const PETSTORE: &str = r##"
openapi: "3.0.0"
info:
  title: Pet Store
  version: "1.2.3"
servers:
  - url: https://petstore.example/api/v3/
components:
  parameters:
    Verbose:
      name: verbose
      in: query
      schema:
        type: boolean
  schemas:
    Tag:
      type: string
      description: a tag
    NewPet:
      type: object
      required: [name]
      properties:
        name: { type: string, description: pet name }
        tag:
          $ref: '#/components/schemas/Tag'
  requestBodies:
    NewPetBody:
      required: true
      content:
        application/json:
          schema:
            $ref: '#/components/schemas/NewPet'
paths:
  /pets/{petId}:
    parameters:
      - name: petId
        in: path
        required: true
        schema: { type: integer, format: int64 }
      - name: fields
        in: query
        schema: { type: string }
    get:
      operationId: getPet
      summary: Find pet by ID
      parameters:
        - $ref: '#/components/parameters/Verbose'
        - name: fields
          in: query
          required: true
          schema: { type: string }
        - name: X-Trace
          in: header
          schema: { type: string }
      responses:
        "200": { description: ok }
  /pets:
    post:
      requestBody:
        $ref: '#/components/requestBodies/NewPetBody'
      responses:
        "200": { description: ok }
  /broken:
    get:
      operationId: broken
      parameters:
        - $ref: './common.yaml#/components/parameters/Q'
      responses:
        "200": { description: ok }
"##;

    fn petstore() -> OpenApiDocument {
        OpenApiDocument::parse(PETSTORE, "petstore.yaml").expect("valid spec")
    }

    #[test]
    fn parses_info_and_operations_in_document_order() {
        let doc = petstore();
        assert_eq!(
            doc.info(),
            ApiInfo {
                title: "Pet Store".to_string(),
                version: "1.2.3".to_string()
            }
        );

        let ids: Vec<&str> = doc.operations().iter().map(|o| o.id.as_str()).collect();
        // `/broken` is skipped (external ref); the POST has no operationId.
        assert_eq!(ids, vec!["getPet", "post_pets"]);
    }

    #[test]
    fn merges_path_item_parameters_and_resolves_refs() {
        let doc = petstore();
        let get = &doc.operations()[0];
        assert_eq!(get.summary, "Find pet by ID");
        assert_eq!(get.path, "/pets/{petId}");

        let names: Vec<(&str, ParamLocation, bool)> = get
            .parameters
            .iter()
            .map(|p| (p.name.as_str(), p.location, p.required))
            .collect();
        assert_eq!(
            names,
            vec![
                ("petId", ParamLocation::Path, true),
                ("fields", ParamLocation::Query, true),
                ("verbose", ParamLocation::Query, false),
                ("X-Trace", ParamLocation::Header, false),
            ]
        );
        assert_eq!(get.parameters[0].schema.schema_type.as_deref(), Some("integer"));
        assert_eq!(get.parameters[0].schema.format.as_deref(), Some("int64"));
    }

    #[test]
    fn flattens_request_body_refs() {
        let doc = petstore();
        let post = &doc.operations()[1];
        let body = post.request_body.as_ref().expect("request body");
        assert_eq!(body.content.len(), 1);
        assert_eq!(body.content[0].media_type, "application/json");

        let schema = body.content[0].schema.as_ref().expect("schema");
        assert_eq!(schema.required, vec!["name".to_string()]);
        assert_eq!(
            schema.properties["tag"].description.as_deref(),
            Some("a tag")
        );
        assert_eq!(schema.properties["name"].schema_type.as_deref(), Some("string"));
    }

    const UNTYPED: &str = r#"
openapi: "3.0.0"
info: { title: Shop, version: "1" }
paths:
  /items:
    get:
      operationId: listItems
      parameters:
        - name: limit
          in: query
          schema: { type: integer }
      responses:
        "200": { description: ok }
  /orders:
    post:
      operationId: createOrder
      requestBody:
        content:
          application/json:
            schema:
              type: object
              properties:
                sku: { type: string }
                metadata: { description: free-form }
      responses:
        "200": { description: ok }
  /search:
    get:
      operationId: search
      parameters:
        - name: q
          in: query
          schema:
            oneOf:
              - { type: string }
              - { type: integer }
      responses:
        "200": { description: ok }
"#;

    #[test]
    fn skips_operations_with_untyped_or_composed_schemas() {
        let doc = OpenApiDocument::parse(UNTYPED, "shop.yaml").unwrap();
        let ids: Vec<&str> = doc.operations().iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["listItems"]);

        let tools = crate::toolset::ToolSet::build(
            &doc,
            &crate::config::DispatchConfig::new("http://127.0.0.1:1"),
        )
        .expect("remaining operations build");
        assert_eq!(tools.len(), 1);
        assert!(tools.tool("shop_listitems").is_some());
    }

    #[test]
    fn resolves_base_url() {
        let doc = petstore();
        assert_eq!(
            doc.resolve_base_url(None).unwrap(),
            "https://petstore.example/api/v3"
        );
        assert_eq!(
            doc.resolve_base_url(Some("http://localhost:8080")).unwrap(),
            "http://localhost:8080"
        );
        assert!(doc.resolve_base_url(Some("/api/v3")).is_err());

        let remote = OpenApiDocument::parse(
            PETSTORE,
            "https://petstore3.swagger.io/api/v3/openapi.json",
        )
        .unwrap();
        assert_eq!(
            remote.resolve_base_url(Some("/api/v3")).unwrap(),
            "https://petstore3.swagger.io/api/v3"
        );
    }

    #[test]
    fn rejects_invalid_documents() {
        let err = OpenApiDocument::parse("not: [an, openapi", "bad.yaml").unwrap_err();
        assert!(matches!(err, OpenApiToolsError::OpenApiSpecParse { .. }));
    }

    #[tokio::test]
    async fn loads_from_file_and_enforces_hash_policy() {
        let dir = tempdir().unwrap();
        let spec_path = dir.path().join("petstore.yaml");
        fs::write(&spec_path, PETSTORE).unwrap();

        let good_hash = format!("sha256:{}", hex::encode(Sha256::digest(PETSTORE)));
        let mut cfg = ApiServerConfig {
            spec: spec_path.display().to_string(),
            spec_hash: Some(good_hash),
            spec_hash_policy: HashPolicy::Fail,
            ..ApiServerConfig::default()
        };

        let client = Client::new();
        let doc = OpenApiDocument::load(&cfg, &client).await.unwrap();
        assert_eq!(doc.operations().len(), 2);

        cfg.spec_hash = Some("sha256:deadbeef".to_string());
        assert!(OpenApiDocument::load(&cfg, &client).await.is_err());

        cfg.spec_hash_policy = HashPolicy::Warn;
        assert!(OpenApiDocument::load(&cfg, &client).await.is_ok());

        cfg.spec = dir.path().join("missing.yaml").display().to_string();
        let err = OpenApiDocument::load(&cfg, &client).await.unwrap_err();
        assert!(matches!(err, OpenApiToolsError::OpenApiSpecReadFile { .. }));
    }
}
