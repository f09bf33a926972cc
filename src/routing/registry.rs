//! Controller registry.
//!
//! # Responsibilities
//! - Turn a controller's named methods into a [`RouteIndex`] via the verb convention
//! - Key each controller by the first segment of its base path
//! - Resolve the controller owning a request path
//!
//! # Design Decisions
//! - Built once at startup, read-only afterwards
//! - Methods without a verb prefix are skipped, not rejected
//! - A second controller claiming the same segment replaces the first with a
//!   warning; strict mode turns that into a startup error

use std::collections::HashMap;
use std::fmt;

use crate::controller::Controller;
use crate::routing::convention::{base_path_for_type, conventional_name, map_method};
use crate::routing::error::RegistrationError;
use crate::routing::index::{HandlerRecord, RouteIndex};
use crate::routing::template::RouteTemplate;
use crate::security::{Policies, Policy};

/// Everything the router needs to dispatch into one controller.
#[derive(Debug)]
pub struct ControllerEntry {
    name: String,
    type_name: &'static str,
    base_path: String,
    index: RouteIndex,
    policies: Policies,
}

impl ControllerEntry {
    /// Build the route index for `instance`.
    pub fn build<C: Controller>(instance: &C) -> Result<Self, RegistrationError> {
        let type_name = C::type_name();
        let base_path = instance
            .base_path()
            .unwrap_or_else(|| base_path_for_type(type_name));

        let name = conventional_name(&base_path).to_string();
        if !base_path.starts_with('/') || name.is_empty() {
            return Err(RegistrationError::InvalidBasePath {
                controller: type_name.to_string(),
                base_path,
            });
        }
        // Validates the base path's own parameters.
        RouteTemplate::parse(&base_path)?;

        let mut index = RouteIndex::new();
        for (method_name, invoker) in C::routes().into_invokers() {
            let Some((verb, path)) = map_method(&base_path, &method_name) else {
                tracing::debug!(
                    controller = type_name,
                    method = %method_name,
                    "Method has no verb prefix, not routed"
                );
                continue;
            };
            let template = RouteTemplate::parse(&path)?;
            index.insert(type_name, template, HandlerRecord::new(method_name, verb, invoker))?;
        }

        Ok(Self {
            name,
            type_name,
            base_path,
            index,
            policies: instance.policies(),
        })
    }

    /// Conventional name: first segment of the base path.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn index(&self) -> &RouteIndex {
        &self.index
    }

    pub fn policies(&self) -> &Policies {
        &self.policies
    }

    /// Policies guarding `handler`, outermost first.
    pub fn policies_for(&self, handler: &str) -> Vec<&Policy> {
        self.policies.applicable(handler)
    }
}

/// One line of the printed route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTableRow {
    pub method: &'static str,
    pub path: String,
    pub controller: &'static str,
    pub handler: String,
}

impl fmt::Display for RouteTableRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<7} {:<40} {}.{}",
            self.method, self.path, self.controller, self.handler
        )
    }
}

#[derive(Debug, Default)]
pub struct ControllerRegistry {
    controllers: HashMap<String, ControllerEntry>,
    strict: bool,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject a second controller on an already claimed segment.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn register<C: Controller>(&mut self, instance: &C) -> Result<&ControllerEntry, RegistrationError> {
        let entry = ControllerEntry::build(instance)?;
        self.insert(entry)
    }

    pub fn insert(&mut self, entry: ControllerEntry) -> Result<&ControllerEntry, RegistrationError> {
        let name = entry.name.clone();

        if let Some(existing) = self.controllers.get(&name) {
            if self.strict {
                return Err(RegistrationError::DuplicateController {
                    name,
                    existing: existing.type_name.to_string(),
                    incoming: entry.type_name.to_string(),
                });
            }
            tracing::warn!(
                name = %name,
                existing = existing.type_name,
                incoming = entry.type_name,
                "Controller name already registered, replacing"
            );
        }

        tracing::info!(
            controller = entry.type_name,
            name = %name,
            base_path = %entry.base_path,
            exact_routes = entry.index.exact_len(),
            parameterized_routes = entry.index.parameterized_len(),
            "Controller registered"
        );

        self.controllers.insert(name.clone(), entry);
        Ok(&self.controllers[&name])
    }

    /// Controller owning `path`, chosen by its first non-empty segment.
    pub fn resolve(&self, path: &str) -> Option<&ControllerEntry> {
        self.controllers.get(conventional_name(path))
    }

    pub fn get(&self, name: &str) -> Option<&ControllerEntry> {
        self.controllers.get(name)
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Every route, grouped by controller name.
    pub fn route_table(&self) -> Vec<RouteTableRow> {
        let mut names: Vec<&String> = self.controllers.keys().collect();
        names.sort();

        names
            .into_iter()
            .flat_map(|name| {
                let entry = &self.controllers[name];
                entry.index.describe().into_iter().map(move |route| RouteTableRow {
                    method: route.method,
                    path: route.path,
                    controller: entry.type_name,
                    handler: route.handler,
                })
            })
            .collect()
    }
}
