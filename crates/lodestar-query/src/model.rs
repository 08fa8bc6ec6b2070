//! Capabilities the proxy layer needs from models and entities.
//!
//! Models and entities are owned by the mapping layer. A proxy only ever
//! calls the methods declared here; there is no other route from a proxy to
//! a model.

use crate::association::Association;
use crate::error::Result;
use std::fmt;
use std::sync::Arc;

/// Engine-assigned node identity
pub type NodeId = i64;

/// Shared handle to a model descriptor
pub type ModelRef = Arc<dyn ModelDescriptor>;

/// Shared handle to an entity
pub type EntityRef = Arc<dyn Entity>;

/// Schema-level description of a node model.
pub trait ModelDescriptor: Send + Sync {
    /// Label nodes of this model carry in the graph
    fn label(&self) -> &str;

    /// Look up a declared association by name
    fn association_for(&self, name: &str) -> Option<Association>;

    /// Whether `name` is a declared association rather than a property
    fn has_association(&self, name: &str) -> bool {
        self.association_for(name).is_some()
    }

    /// Load a persisted entity by identity
    fn find(&self, id: NodeId) -> Result<Option<EntityRef>>;
}

impl fmt::Debug for dyn ModelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model").field("label", &self.label()).finish()
    }
}

/// A node-backed domain object.
///
/// `save` takes `&self`; implementations keep their identity behind interior
/// mutability so entities can be shared between proxies.
pub trait Entity: Send + Sync {
    /// Identity, or `None` while unsaved
    fn neo_id(&self) -> Option<NodeId>;

    fn is_persisted(&self) -> bool {
        self.neo_id().is_some()
    }

    /// Persist the entity and return its identity
    fn save(&self) -> Result<NodeId>;

    /// Label of the model this entity belongs to
    fn model_label(&self) -> &str;
}

impl fmt::Debug for dyn Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("model", &self.model_label())
            .field("neo_id", &self.neo_id())
            .finish()
    }
}
