//! Route path templates.
//!
//! # Responsibilities
//! - Represent a route path as literal and parameter segments
//! - Parse `:param` markers from a slash-separated path
//! - Reject templates that bind the same parameter twice
//!
//! # Design Decisions
//! - Built once at registration, immutable afterwards
//! - Segments keep the leading empty segment produced by splitting an
//!   absolute path, so templates and request paths split identically

use std::fmt;

use crate::routing::error::RegistrationError;

/// One `/`-separated piece of a route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the request segment exactly.
    Literal(String),
    /// Binds the request segment to this name.
    Param(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        match raw.strip_prefix(':') {
            Some(name) => Segment::Param(name.to_string()),
            None => Segment::Literal(raw.to_string()),
        }
    }
}

/// An ordered sequence of path segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    segments: Vec<Segment>,
}

impl RouteTemplate {
    /// Parse a template such as `/users/:id/roles/:roleId`.
    pub fn parse(path: &str) -> Result<Self, RegistrationError> {
        let segments: Vec<Segment> = path.split('/').map(Segment::parse).collect();

        let mut seen: Vec<&str> = Vec::new();
        for segment in &segments {
            if let Segment::Param(name) = segment {
                if seen.contains(&name.as_str()) {
                    return Err(RegistrationError::DuplicateParameter {
                        template: path.to_string(),
                        name: name.clone(),
                    });
                }
                seen.push(name);
            }
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when at least one segment is a parameter.
    pub fn is_parameterized(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Param(_)))
    }

    /// Names of all parameter segments, in path order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }
}

impl fmt::Display for RouteTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            match segment {
                Segment::Literal(s) => f.write_str(s)?,
                Segment::Param(name) => write!(f, ":{}", name)?,
            }
        }
        Ok(())
    }
}
