//! Naming-convention route derivation.
//!
//! # Responsibilities
//! - Classify a handler name by its verb prefix
//! - Turn the rest of the name into a path template
//! - Derive a controller's base path from its type name
//!
//! # Data Flow
//! ```text
//! ("/users", "GetUserByID")
//!     → verb prefix      GET, "UserByID"
//!     → camel to path    "user/by/id"
//!     → connectors       "user/:id"
//!     → drop base name   ":id"
//!     → join             GET /users/:id
//! ```
//!
//! # Design Decisions
//! - Pure functions, no registry state
//! - Prefixes are tried in a fixed order; first match wins
//! - A name that matches no prefix is not a route (returns `None`)

use std::fmt;

/// Words that turn the following segment into a parameter.
const CONNECTORS: [&str; 4] = ["by", "for", "of", "with"];

/// Verb prefix recognised on handler names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    /// Collection read. Served as HTTP `GET`.
    List,
}

impl Verb {
    /// Classification order.
    pub const ALL: [Verb; 6] = [
        Verb::Get,
        Verb::Post,
        Verb::Put,
        Verb::Patch,
        Verb::Delete,
        Verb::List,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
            Verb::List => "LIST",
        }
    }

    /// The HTTP method this verb is served under.
    pub fn http_method(&self) -> &'static str {
        match self {
            Verb::List => "GET",
            other => other.as_str(),
        }
    }

    /// Find the first verb whose name prefixes `name`, ignoring case.
    pub fn classify(name: &str) -> Option<Verb> {
        Self::ALL.into_iter().find(|verb| {
            let prefix = verb.as_str();
            name.get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        })
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive `(verb, path template)` for a handler name under `base_path`.
///
/// Returns `None` when the name carries no verb prefix.
pub fn map_method(base_path: &str, method_name: &str) -> Option<(Verb, String)> {
    let verb = Verb::classify(method_name)?;
    let remainder = &method_name[verb.as_str().len()..];

    let path = split_camel(remainder, '/');
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut segments = rewrite_connectors(&parts);

    let resource = resource_name(base_path);
    segments.retain(|segment| !names_resource(segment, resource));

    let base = base_path.trim_end_matches('/');
    let template = if segments.is_empty() {
        base_path.to_string()
    } else {
        format!("{}/{}", base, segments.join("/"))
    };

    Some((verb, template))
}

/// `UserProfileController` → `/user-profile`.
pub fn base_path_for_type(type_name: &str) -> String {
    let short = type_name.rsplit("::").next().unwrap_or(type_name);
    let name = short.strip_suffix("Controller").unwrap_or(short);
    format!("/{}", split_camel(name, '-'))
}

/// First segment of a base path; the key a controller is registered under.
pub fn conventional_name(base_path: &str) -> &str {
    base_path
        .split('/')
        .find(|s| !s.is_empty())
        .unwrap_or("")
}

/// Lower-case `name`, inserting `separator` at each lower→upper boundary.
fn split_camel(name: &str, separator: char) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;

    for c in name.chars() {
        if c.is_uppercase() && prev.is_some_and(char::is_lowercase) {
            out.push(separator);
        }
        out.extend(c.to_lowercase());
        prev = Some(c);
    }

    out
}

fn rewrite_connectors(parts: &[&str]) -> Vec<String> {
    let mut out = Vec::with_capacity(parts.len());
    let mut i = 0;

    while i < parts.len() {
        if CONNECTORS.contains(&parts[i]) && i + 1 < parts.len() {
            out.push(format!(":{}", parts[i + 1]));
            i += 2;
        } else {
            out.push(parts[i].to_string());
            i += 1;
        }
    }

    out
}

/// Last segment of the base path (`/api/users` → `users`).
fn resource_name(base_path: &str) -> &str {
    base_path
        .rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or("")
}

/// Literal segment equal to the resource name or its singular form.
fn names_resource(segment: &str, resource: &str) -> bool {
    if resource.is_empty() || segment.starts_with(':') {
        return false;
    }
    let resource = resource.to_lowercase();
    segment == resource || singular(&resource).is_some_and(|s| segment == s)
}

/// Singular of a plural resource name: `categories` → `category`,
/// `users` → `user`. Words ending in `ss`, `us` or `is` are not plurals.
///
/// Purely suffix based, so `news` still yields `new`.
fn singular(resource: &str) -> Option<String> {
    if let Some(stem) = resource.strip_suffix("ies") {
        return (!stem.is_empty()).then(|| format!("{stem}y"));
    }
    if ["ss", "us", "is"].iter().any(|end| resource.ends_with(end)) {
        return None;
    }
    resource
        .strip_suffix('s')
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}
