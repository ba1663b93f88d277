//! Tool call → HTTP request dispatch.
//!
//! A [`RequestDispatcher`] is built once per operation (method + URL template + static headers)
//! and invoked once per tool call. It holds only immutable data plus a shared `reqwest::Client`,
//! so concurrent calls never observe each other.
//!
//! Every failure on the call path is a [`DispatchError`] naming the phase that failed. The
//! HTTP status of the upstream response is never inspected: a 404 body is as much a result as a
//! 200 body.

use crate::config::DispatchConfig;
use crate::descriptor::OperationDescriptor;
use crate::translator::{BODY_GROUP, PATH_GROUP, QUERY_GROUP};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use rmcp::model::{CallToolResult, Content, JsonObject};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Failure of a single tool call, by phase.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid request URL: {0}")]
    Url(String),
    #[error("failed to encode request body: {0}")]
    Body(String),
    #[error("failed to build request: {0}")]
    Request(String),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("failed to read response body: {0}")]
    ReadBody(String),
}

impl DispatchError {
    /// Short phase label, used as a log field.
    #[must_use]
    pub fn phase(&self) -> &'static str {
        match self {
            DispatchError::Url(_) => "url",
            DispatchError::Body(_) => "body",
            DispatchError::Request(_) => "request",
            DispatchError::Transport(_) => "transport",
            DispatchError::ReadBody(_) => "read_body",
        }
    }
}

pub type DispatchResult<T> = std::result::Result<T, DispatchError>;

/// Raw tool-call arguments, classified by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationArguments {
    /// At least one of `pathNames` / `searchParams` / `requestBody` was given as an object.
    Grouped {
        path: Map<String, Value>,
        query: Map<String, Value>,
        body: Map<String, Value>,
    },
    /// Legacy form: a flat map, split against the path template at dispatch time.
    Flat(Map<String, Value>),
}

impl InvocationArguments {
    #[must_use]
    pub fn from_map(mut args: Map<String, Value>) -> Self {
        let grouped = [PATH_GROUP, QUERY_GROUP, BODY_GROUP]
            .iter()
            .any(|key| args.get(*key).is_some_and(Value::is_object));
        if !grouped {
            return Self::Flat(args);
        }

        let mut take = |key: &str| match args.remove(key) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        Self::Grouped {
            path: take(PATH_GROUP),
            query: take(QUERY_GROUP),
            body: take(BODY_GROUP),
        }
    }

    /// Anything but a JSON object counts as "no arguments".
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::from_map(map),
            _ => Self::Flat(Map::new()),
        }
    }

    /// Split into path/query/body parameter sets.
    ///
    /// In the flat form a key is a path parameter iff the template contains `{key}`; every other
    /// key goes to the body. The flat form never yields query parameters.
    #[must_use]
    pub fn classify(self, path_template: &str) -> ParameterSets {
        match self {
            Self::Grouped { path, query, body } => ParameterSets { path, query, body },
            Self::Flat(args) => {
                let mut sets = ParameterSets::default();
                for (name, value) in args {
                    if path_template.contains(&placeholder(&name)) {
                        sets.path.insert(name, value);
                    } else {
                        sets.body.insert(name, value);
                    }
                }
                sets
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSets {
    pub path: Map<String, Value>,
    pub query: Map<String, Value>,
    pub body: Map<String, Value>,
}

/// A fully resolved outbound request.
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<Vec<u8>>,
    pub headers: HeaderMap,
}

/// Executes tool calls for one operation.
#[derive(Clone)]
pub struct RequestDispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    method: String,
    url_template: String,
    headers: HashMap<String, String>,
    client: Client,
}

impl std::fmt::Debug for RequestDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDispatcher")
            .field("method", &self.inner.method)
            .field("url_template", &self.inner.url_template)
            .field("headers", &self.inner.headers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl RequestDispatcher {
    /// Create a dispatcher for `method` against `url_template` (base URL + path template).
    ///
    /// Nothing is validated here; a bad method, URL or header surfaces as a [`DispatchError`]
    /// on each call.
    ///
    /// Calls go out over `client` rather than a fresh client per call, so they share its
    /// connection pool. The client carries no per-call state.
    #[must_use]
    pub fn new(
        method: impl Into<String>,
        url_template: impl Into<String>,
        headers: HashMap<String, String>,
        client: Client,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                method: method.into(),
                url_template: url_template.into(),
                headers,
                client,
            }),
        }
    }

    /// Dispatcher for `operation`, targeting `config.base_url + operation.path`.
    #[must_use]
    pub fn for_operation(
        config: &DispatchConfig,
        operation: &OperationDescriptor,
        client: Client,
    ) -> Self {
        Self::new(
            operation.method.clone(),
            format!("{}{}", config.base_url, operation.path),
            config.headers.clone(),
            client,
        )
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.inner.method
    }

    #[must_use]
    pub fn url_template(&self) -> &str {
        &self.inner.url_template
    }

    /// Build the outbound request for one invocation without sending it.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Url`] if the resolved URL does not parse,
    /// [`DispatchError::Body`] if the body cannot be encoded, and [`DispatchError::Request`]
    /// for an invalid method or static header.
    pub fn resolve(&self, args: InvocationArguments) -> DispatchResult<ResolvedRequest> {
        let ParameterSets { path, query, body } = args.classify(&self.inner.url_template);

        let mut url = self.inner.url_template.clone();
        for (name, value) in &path {
            let placeholder = placeholder(name);
            if url.contains(&placeholder) {
                url = url.replace(&placeholder, &path_value_to_string(value));
            }
        }

        let mut url = Url::parse(&url).map_err(|e| DispatchError::Url(format!("{url}: {e}")))?;
        if !query.is_empty() {
            append_query(&mut url, &query);
        }

        let body = if body.is_empty() {
            None
        } else {
            Some(serde_json::to_vec(&body).map_err(|e| DispatchError::Body(e.to_string()))?)
        };

        let method = Method::from_bytes(self.inner.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| {
                DispatchError::Request(format!("invalid method '{}': {e}", self.inner.method))
            })?;

        let mut headers = HeaderMap::new();
        if body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        for (key, value) in &self.inner.headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                DispatchError::Request(format!("invalid header name '{key}': {e}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                DispatchError::Request(format!("invalid value for header '{key}': {e}"))
            })?;
            headers.insert(name, value);
        }

        Ok(ResolvedRequest {
            method,
            url,
            body,
            headers,
        })
    }

    /// Send a resolved request and return the response body as text, whatever the status.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Request`] if reqwest rejects the request,
    /// [`DispatchError::Transport`] on network failure and [`DispatchError::ReadBody`] if the
    /// body stream breaks.
    pub async fn execute(&self, request: ResolvedRequest) -> DispatchResult<String> {
        let ResolvedRequest {
            method,
            url,
            body,
            headers,
        } = request;

        tracing::debug!(method = %method, url = %redact_url(&url), "dispatching request");

        let mut builder = self.inner.client.request(method, url).headers(headers);
        if let Some(bytes) = body {
            builder = builder.body(bytes);
        }
        let request = builder
            .build()
            .map_err(|e| DispatchError::Request(sanitize_reqwest_error(&e)))?;

        let response = self
            .inner
            .client
            .execute(request)
            .await
            .map_err(|e| DispatchError::Transport(sanitize_reqwest_error(&e)))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| DispatchError::ReadBody(sanitize_reqwest_error(&e)))?;

        tracing::debug!(
            status = status.as_u16(),
            bytes = bytes.len(),
            "received response"
        );

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Resolve and execute one invocation.
    ///
    /// # Errors
    ///
    /// See [`Self::resolve`] and [`Self::execute`].
    pub async fn dispatch(&self, args: InvocationArguments) -> DispatchResult<String> {
        let request = self.resolve(args)?;
        self.execute(request).await
    }

    /// Run a tool call and wrap the outcome as an MCP result.
    ///
    /// Dispatch failures become error-flagged text content rather than protocol errors.
    pub async fn call(&self, arguments: Option<JsonObject>) -> CallToolResult {
        let args = InvocationArguments::from_map(arguments.unwrap_or_default());
        match self.dispatch(args).await {
            Ok(text) => CallToolResult::success(vec![Content::text(text)]),
            Err(e) => {
                tracing::warn!(
                    method = %self.inner.method,
                    url_template = %self.inner.url_template,
                    phase = e.phase(),
                    error = %e,
                    "tool call failed"
                );
                CallToolResult::error(vec![Content::text(e.to_string())])
            }
        }
    }
}

fn placeholder(name: &str) -> String {
    format!("{{{name}}}")
}

/// Append query parameters to `url`, keeping any query the template already carried.
///
/// Null values are skipped. Pairs are sorted by key (stable, so repeated keys keep their order)
/// and form-encoded.
fn append_query(url: &mut Url, query: &Map<String, Value>) {
    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    for (name, value) in query {
        if let Some(rendered) = query_value_to_string(value) {
            pairs.push((name.clone(), rendered));
        }
    }
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }
}

fn path_value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => value_to_string(other),
    }
}

fn query_value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => Some(value_to_string(other)),
    }
}

/// Generic textual rendering: strings verbatim, everything else as JSON text.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}

fn redact_url(url: &Url) -> String {
    let mut u = url.clone();
    // Best-effort: drop credentials + query + fragment.
    let _ = u.set_username("");
    let _ = u.set_password(None);
    u.set_query(None);
    u.set_fragment(None);
    u.to_string()
}

fn sanitize_reqwest_error(e: &reqwest::Error) -> String {
    let mut msg = e.to_string();
    if let Some(u) = e.url() {
        msg = msg.replace(u.as_str(), &redact_url(u));
    }
    msg
}
