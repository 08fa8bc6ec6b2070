//! Association descriptors.
//!
//! An [`Association`] is read-only metadata for one traversal edge of a
//! model: relationship type, direction and target model. Its main job here
//! is rendering the arrow part of a Cypher pattern.

use crate::error::{QueryError, Result};
use crate::fragment::{sanitize_param_name, Params};
use crate::model::{Entity, ModelRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Direction of an association, seen from the declaring model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// `(a)-->(b)`
    Out,
    /// `(a)<--(b)`
    In,
    /// `(a)--(b)`
    Both,
}

/// Hooks run around edge creation.
pub trait AssociationCallbacks: Send + Sync {
    /// Return `false` to skip creating the edge
    fn before_create(&self, _from: &dyn Entity, _to: &dyn Entity) -> bool {
        true
    }

    fn after_create(&self, _from: &dyn Entity, _to: &dyn Entity) {}
}

/// Rendered arrow plus any parameters its property map refers to
#[derive(Debug, Clone, PartialEq)]
pub struct Arrow {
    pub pattern: String,
    pub params: Params,
}

/// Metadata for a declared association.
#[derive(Clone)]
pub struct Association {
    name: String,
    relationship_type: Option<String>,
    direction: Direction,
    target: Option<ModelRef>,
    callbacks: Option<Arc<dyn AssociationCallbacks>>,
}

impl Association {
    pub fn new(name: impl Into<String>, direction: Direction) -> Self {
        Self {
            name: name.into(),
            relationship_type: None,
            direction,
            target: None,
            callbacks: None,
        }
    }

    pub fn with_type(mut self, relationship_type: impl Into<String>) -> Self {
        self.relationship_type = Some(relationship_type.into());
        self
    }

    pub fn with_target(mut self, target: ModelRef) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_callbacks(mut self, callbacks: Arc<dyn AssociationCallbacks>) -> Self {
        self.callbacks = Some(callbacks);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn relationship_type(&self) -> Option<&str> {
        self.relationship_type.as_deref()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn target(&self) -> Option<&ModelRef> {
        self.target.as_ref()
    }

    /// Render the arrow between two node patterns.
    ///
    /// Without a relationship variable, properties or `create`, this is a
    /// bare direction arrow (`-->`). Otherwise the relationship is bracketed
    /// with its variable, back-quoted type and a property map whose values
    /// are parameter placeholders returned in [`Arrow::params`].
    ///
    /// Creation needs a concrete type and direction: `Both` is created as
    /// outgoing, and a missing type is an error.
    pub fn arrow_syntax(
        &self,
        rel_var: Option<&str>,
        properties: &Params,
        create: bool,
    ) -> Result<Arrow> {
        if create && self.relationship_type.is_none() {
            return Err(QueryError::invalid_association(format!(
                "association '{}' has no relationship type to create",
                self.name
            )));
        }

        let direction = match (self.direction, create) {
            (Direction::Both, true) => Direction::Out,
            (direction, _) => direction,
        };

        if rel_var.is_none() && properties.is_empty() && !create {
            let pattern = match direction {
                Direction::Out => "-->",
                Direction::In => "<--",
                Direction::Both => "--",
            };
            return Ok(Arrow {
                pattern: pattern.to_string(),
                params: Params::new(),
            });
        }

        let mut body = rel_var.unwrap_or_default().to_string();
        if let Some(rel_type) = &self.relationship_type {
            body.push_str(&format!(":`{}`", rel_type));
        }

        let mut params = Params::new();
        if !properties.is_empty() {
            let prefix = rel_var.unwrap_or("rel");
            let mut keys: Vec<&String> = properties.keys().collect();
            keys.sort();

            let entries: Vec<String> = keys
                .into_iter()
                .map(|key| {
                    let name = sanitize_param_name(&format!("{}_{}", prefix, key));
                    params.insert(name.clone(), properties[key].clone());
                    format!("{}: ${}", key, name)
                })
                .collect();
            body.push_str(&format!(" {{{}}}", entries.join(", ")));
        }

        let pattern = match direction {
            Direction::Out => format!("-[{}]->", body),
            Direction::In => format!("<-[{}]-", body),
            Direction::Both => format!("-[{}]-", body),
        };
        Ok(Arrow { pattern, params })
    }

    /// Run the before-create hook; `true` when creation should proceed
    pub fn before_create(&self, from: &dyn Entity, to: &dyn Entity) -> bool {
        self.callbacks
            .as_ref()
            .map_or(true, |callbacks| callbacks.before_create(from, to))
    }

    pub fn after_create(&self, from: &dyn Entity, to: &dyn Entity) {
        if let Some(callbacks) = &self.callbacks {
            callbacks.after_create(from, to);
        }
    }
}

impl fmt::Debug for Association {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Association")
            .field("name", &self.name)
            .field("relationship_type", &self.relationship_type)
            .field("direction", &self.direction)
            .field("target", &self.target.as_ref().map(|t| t.label().to_string()))
            .field("callbacks", &self.callbacks.is_some())
            .finish()
    }
}
