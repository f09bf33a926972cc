//! Built-in authorizers.
//!
//! # Data Flow
//! ```text
//! request
//!     → resolve Arc<dyn SessionValidator> from the request scope (500 if absent)
//!     → validator.validate(request)                               (401 on error)
//!     → claim check against the policy value                      (401 on mismatch)
//!     → context.with_claims(..).with_user_id(sub)
//!     → next handler
//! ```

use std::sync::Arc;

use serde_json::Value;

use crate::http::handler::{handler_fn, BoxedHandler};
use crate::http::{Request, Response};
use crate::observability::metrics;
use crate::security::policy::Policy;
use crate::security::session::{Claims, SessionValidator};

/// Allow only sessions whose `role` claim equals (or, for list claims, contains) `role`.
pub fn require_role(role: impl Into<Value>) -> Policy {
    Policy::new(
        |next: BoxedHandler, role: Value| {
            guard(next, "require_role", move |claims| claim_matches(claims.get("role"), &role))
        },
        role,
    )
}

/// Allow only sessions whose `claim` equals (or contains) `expected`.
pub fn require_claim(claim: impl Into<String>, expected: impl Into<Value>) -> Policy {
    let claim: String = claim.into();
    let expected: Value = expected.into();
    let value = serde_json::json!({ "claim": claim, "expected": expected });
    Policy::new(
        |next: BoxedHandler, value: Value| {
            let claim = value["claim"].as_str().unwrap_or_default().to_string();
            let expected = value["expected"].clone();
            guard(next, "require_claim", move |claims| claim_matches(claims.get(&claim), &expected))
        },
        value,
    )
}

/// Allow any caller with a valid session.
pub fn authenticated() -> Policy {
    Policy::new(
        |next: BoxedHandler, _: Value| guard(next, "authenticated", |_| true),
        Value::Null,
    )
}

fn claim_matches(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        Some(Value::Array(items)) => items.contains(expected),
        Some(actual) => actual == expected,
        None => false,
    }
}

fn guard<F>(next: BoxedHandler, policy: &'static str, check: F) -> BoxedHandler
where
    F: Fn(&Claims) -> bool + Send + Sync + 'static,
{
    let check = Arc::new(check);
    handler_fn(move |req: Request| {
        let next = next.clone();
        let check = check.clone();
        async move {
            let trace_id = req.context().trace_id().unwrap_or_default().to_string();

            let validator = match req.context().scope().resolve::<Arc<dyn SessionValidator>>() {
                Ok(validator) => validator,
                Err(e) => {
                    tracing::error!(trace_id = %trace_id, policy, error = %e, "Session validator unavailable");
                    return Response::internal_error("could not resolve session validator");
                }
            };

            let claims = match validator.validate(&req) {
                Ok(claims) => claims,
                Err(e) => {
                    tracing::debug!(trace_id = %trace_id, policy, error = %e, "Session rejected");
                    metrics::record_denied(policy);
                    return Response::unauthorized();
                }
            };

            if !check(&claims) {
                tracing::debug!(trace_id = %trace_id, policy, path = %req.path, "Claims do not satisfy policy");
                metrics::record_denied(policy);
                return Response::unauthorized();
            }

            let mut context = req.context().clone();
            if let Some(sub) = claims.get("sub") {
                let user_id = match sub {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                context = context.with_user_id(user_id);
            }
            let context = context.with_claims(claims);
            next.call(req.with_context(context)).await
        }
    })
}
