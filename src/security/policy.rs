//! Authorization policies.
//!
//! # Responsibilities
//! - Pair an authorizer (handler wrapper) with an opaque configuration value
//! - Group policies per handler name, with `*` applying to every handler
//! - Compose the applicable policies around a terminal handler
//!
//! # Design Decisions
//! - Declared order is preserved; the first applicable policy runs outermost
//! - Wildcard policies always wrap handler-specific ones
//! - The value is a `serde_json::Value`, so any role, claim or list fits

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::http::handler::BoxedHandler;

/// Handler name whose policies apply to every handler of a controller.
pub const WILDCARD: &str = "*";

pub type Authorizer = Arc<dyn Fn(BoxedHandler, Value) -> BoxedHandler + Send + Sync>;

#[derive(Clone)]
pub struct Policy {
    authorizer: Authorizer,
    value: Value,
}

impl Policy {
    pub fn new<F>(authorizer: F, value: impl Into<Value>) -> Self
    where
        F: Fn(BoxedHandler, Value) -> BoxedHandler + Send + Sync + 'static,
    {
        Self {
            authorizer: Arc::new(authorizer),
            value: value.into(),
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Wrap `next` with this policy's authorizer.
    pub fn apply(&self, next: BoxedHandler) -> BoxedHandler {
        (self.authorizer)(next, self.value.clone())
    }
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Policy").field("value", &self.value).finish_non_exhaustive()
    }
}

/// Shorthand for [`Policy::new`].
pub fn authorize<F>(authorizer: F, value: impl Into<Value>) -> Policy
where
    F: Fn(BoxedHandler, Value) -> BoxedHandler + Send + Sync + 'static,
{
    Policy::new(authorizer, value)
}

/// Policies declared by a controller, keyed by handler name.
#[derive(Clone, Debug, Default)]
pub struct Policies {
    by_handler: HashMap<String, Vec<Policy>>,
}

impl Policies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `policy` to the handler called `handler`.
    pub fn add(mut self, handler: impl Into<String>, policy: Policy) -> Self {
        self.by_handler.entry(handler.into()).or_default().push(policy);
        self
    }

    /// Attach `policy` to every handler.
    pub fn all(self, policy: Policy) -> Self {
        self.add(WILDCARD, policy)
    }

    pub fn get(&self, handler: &str) -> &[Policy] {
        self.by_handler.get(handler).map(Vec::as_slice).unwrap_or_default()
    }

    /// Policies guarding `handler`, outermost first.
    pub fn applicable<'a>(&'a self, handler: &str) -> Vec<&'a Policy> {
        let mut policies: Vec<&Policy> = self.get(WILDCARD).iter().collect();
        if handler != WILDCARD {
            policies.extend(self.get(handler));
        }
        policies
    }

    pub fn is_empty(&self) -> bool {
        self.by_handler.values().all(Vec::is_empty)
    }
}

/// Wrap `handler` so that `policies[0]` runs first.
pub fn compose(handler: BoxedHandler, policies: &[&Policy]) -> BoxedHandler {
    policies
        .iter()
        .rev()
        .fold(handler, |next, policy| policy.apply(next))
}
