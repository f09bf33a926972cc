//! Framework request value.
//!
//! # Responsibilities
//! - Carry method, path, query, headers, body and bound path parameters
//! - Carry a typed per-request context (trace id, request id, user, scope)
//!
//! # Design Decisions
//! - Transport-agnostic: the adapter fills it, the core never sees axum types
//! - Context changes produce a new context value; the old one is untouched
//! - Header names are stored lower-cased; lookups are case-insensitive
//! - Body is `Bytes`, so cloning a request never copies the payload

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::ioc::Scope;
use crate::routing::matcher::PathParams;
use crate::security::session::Claims;

/// Typed values attached to a request as it moves through the pipeline.
#[derive(Clone, Debug)]
pub struct RequestContext {
    trace_id: Option<String>,
    request_id: Option<String>,
    user_id: Option<String>,
    claims: Option<Arc<Claims>>,
    scope: Arc<Scope>,
    cancellation: CancellationToken,
}

impl RequestContext {
    pub fn new(scope: Arc<Scope>) -> Self {
        Self {
            trace_id: None,
            request_id: None,
            user_id: None,
            claims: None,
            scope,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Authenticated user id, set by authorization policies.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_deref()
    }

    /// Resolution scope bound to this request.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Completes when the request is cancelled (e.g. the client went away).
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancellation.cancelled()
    }

    pub fn with_trace_id(&self, trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: Some(trace_id.into()),
            ..self.clone()
        }
    }

    pub fn with_request_id(&self, request_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
            ..self.clone()
        }
    }

    pub fn with_user_id(&self, user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..self.clone()
        }
    }

    pub fn with_claims(&self, claims: Claims) -> Self {
        Self {
            claims: Some(Arc::new(claims)),
            ..self.clone()
        }
    }

    pub fn with_scope(&self, scope: Arc<Scope>) -> Self {
        Self {
            scope,
            ..self.clone()
        }
    }

    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            cancellation: token,
            ..self.clone()
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(Arc::new(Scope::detached()))
    }
}

/// An incoming request as seen by middleware, policies and handlers.
#[derive(Clone, Debug)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, Vec<String>>,
    /// Filled once by the router before the handler chain runs.
    pub path_params: PathParams,
    pub headers: HashMap<String, Vec<String>>,
    pub body: Bytes,
    pub user_agent: Option<String>,
    pub remote_addr: Option<SocketAddr>,
    context: RequestContext,
}

impl Request {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            path: path.into(),
            query: HashMap::new(),
            path_params: PathParams::new(),
            headers: HashMap::new(),
            body: Bytes::new(),
            user_agent: None,
            remote_addr: None,
            context: RequestContext::default(),
        }
    }

    /// Parse a raw `a=1&b=2` query string into [`Request::query`].
    pub fn with_query_string(mut self, raw: &str) -> Self {
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            self.query
                .entry(key.into_owned())
                .or_default()
                .push(value.into_owned());
        }
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if name.eq_ignore_ascii_case("user-agent") {
            self.user_agent = Some(value.clone());
        }
        self.headers
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Replace the context. The previous context value is left as it was.
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// First value of a header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// First value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Value bound to a path parameter, e.g. `id` for `/users/:id`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Path plus query, for logging.
    pub fn url(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query: String = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(
                self.query
                    .iter()
                    .flat_map(|(k, vs)| vs.iter().map(move |v| (k, v))),
            )
            .finish();
        format!("{}?{}", self.path, query)
    }
}
