//! Per-controller route index.
//!
//! # Responsibilities
//! - Hold exact-match routes keyed by (HTTP method, path)
//! - Hold parameterized routes in registration order
//! - Resolve a (method, path) pair to a handler record
//!
//! # Design Decisions
//! - Exact matches always win over parameterized ones
//! - Parameterized routes are scanned in insertion order; first match wins
//! - Immutable after registration (read concurrently without locks)
//! - O(1) exact lookup, O(n) parameterized scan

use std::collections::HashMap;
use std::sync::Arc;

use crate::http::handler::BoxFuture;
use crate::http::{Request, Response};
use crate::ioc::Instance;
use crate::routing::convention::Verb;
use crate::routing::error::RegistrationError;
use crate::routing::matcher::{match_path, PathParams};
use crate::routing::template::RouteTemplate;

/// Invokes a controller method on a resolved controller instance.
pub type Invoker = Arc<dyn Fn(Instance, Request) -> BoxFuture<Response> + Send + Sync>;

/// A registered handler: what to call and the name policies are declared under.
#[derive(Clone)]
pub struct HandlerRecord {
    name: String,
    verb: Verb,
    invoker: Invoker,
}

impl HandlerRecord {
    pub fn new(name: impl Into<String>, verb: Verb, invoker: Invoker) -> Self {
        Self {
            name: name.into(),
            verb,
            invoker,
        }
    }

    /// Declared handler name, e.g. `GetUserByID`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }
}

impl std::fmt::Debug for HandlerRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRecord")
            .field("name", &self.name)
            .field("verb", &self.verb)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
struct ParamRoute {
    method: &'static str,
    template: RouteTemplate,
    record: HandlerRecord,
}

/// A route resolved by [`RouteIndex::lookup`].
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub record: &'a HandlerRecord,
    pub params: PathParams,
}

/// One line of the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescription {
    pub method: &'static str,
    pub path: String,
    pub handler: String,
}

#[derive(Debug, Clone, Default)]
pub struct RouteIndex {
    /// method → path → record
    exact: HashMap<&'static str, HashMap<String, HandlerRecord>>,
    parameterized: Vec<ParamRoute>,
}

impl RouteIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route, classifying it by whether its template has parameters.
    pub fn insert(
        &mut self,
        controller: &str,
        template: RouteTemplate,
        record: HandlerRecord,
    ) -> Result<(), RegistrationError> {
        let method = record.verb().http_method();

        if template.is_parameterized() {
            self.parameterized.push(ParamRoute {
                method,
                template,
                record,
            });
            return Ok(());
        }

        let path = template.to_string();
        let by_path = self.exact.entry(method).or_default();
        if by_path.contains_key(&path) {
            return Err(RegistrationError::DuplicateRoute {
                controller: controller.to_string(),
                method: method.to_string(),
                path,
            });
        }
        by_path.insert(path, record);
        Ok(())
    }

    /// Resolve `method` + `path`: exact table first, then the ordered scan.
    pub fn lookup(&self, method: &str, path: &str) -> Option<RouteMatch<'_>> {
        if let Some(record) = self.exact.get(method).and_then(|m| m.get(path)) {
            return Some(RouteMatch {
                record,
                params: PathParams::new(),
            });
        }

        self.parameterized
            .iter()
            .filter(|route| route.method == method)
            .find_map(|route| {
                match_path(&route.template, path).map(|params| RouteMatch {
                    record: &route.record,
                    params,
                })
            })
    }

    pub fn exact_len(&self) -> usize {
        self.exact.values().map(HashMap::len).sum()
    }

    pub fn parameterized_len(&self) -> usize {
        self.parameterized.len()
    }

    /// All routes; exact ones sorted by path, then parameterized in scan order.
    pub fn describe(&self) -> Vec<RouteDescription> {
        let mut exact: Vec<RouteDescription> = self
            .exact
            .iter()
            .flat_map(|(&method, by_path)| {
                by_path.iter().map(move |(path, record)| RouteDescription {
                    method,
                    path: path.clone(),
                    handler: record.name().to_string(),
                })
            })
            .collect();
        exact.sort_by(|a, b| a.path.cmp(&b.path).then(a.method.cmp(&b.method)));

        exact
            .into_iter()
            .chain(self.parameterized.iter().map(|route| RouteDescription {
                method: route.method,
                path: route.template.to_string(),
                handler: route.record.name().to_string(),
            }))
            .collect()
    }
}
