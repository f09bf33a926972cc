//! Path parameter matching.
//!
//! # Responsibilities
//! - Match a concrete request path against a parameterized template
//! - Extract parameter bindings on success
//!
//! # Design Decisions
//! - Segment counts must be equal (no prefix or partial matching)
//! - Literal segments are case-sensitive
//! - Parameter values are bound as raw strings; no type or format checks
//! - No regex, so matching stays O(segments)

use std::collections::HashMap;

use crate::routing::template::{RouteTemplate, Segment};

/// Parameter name → raw path segment.
pub type PathParams = HashMap<String, String>;

/// Match `path` against `template`, returning the bound parameters.
pub fn match_path(template: &RouteTemplate, path: &str) -> Option<PathParams> {
    let parts: Vec<&str> = path.split('/').collect();
    let segments = template.segments();

    if parts.len() != segments.len() {
        return None;
    }

    let mut params = PathParams::new();
    for (segment, part) in segments.iter().zip(parts) {
        match segment {
            Segment::Literal(literal) => {
                if literal != part {
                    return None;
                }
            }
            Segment::Param(name) => {
                params.insert(name.clone(), part.to_string());
            }
        }
    }

    Some(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(path: &str) -> RouteTemplate {
        RouteTemplate::parse(path).unwrap()
    }

    #[test]
    fn test_match_extracts_params() {
        let params = match_path(&template("/users/:id/roles/:roleId"), "/users/42/roles/9").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
        assert_eq!(params.get("roleId").map(String::as_str), Some("9"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_segment_count_mismatch() {
        assert!(match_path(&template("/users/:id/roles/:roleId"), "/users/42/roles").is_none());
        assert!(match_path(&template("/users/:id"), "/users").is_none());
        assert!(match_path(&template("/users/:id"), "/users/7/").is_none());
    }

    #[test]
    fn test_literal_mismatch() {
        assert!(match_path(&template("/users/:id/roles"), "/users/42/perms").is_none());
        // Case-sensitive
        assert!(match_path(&template("/users/:id"), "/Users/42").is_none());
    }

    #[test]
    fn test_values_are_not_validated() {
        let params = match_path(&template("/users/:id"), "/users/not-a-number").unwrap();
        assert_eq!(params["id"], "not-a-number");
    }
}
