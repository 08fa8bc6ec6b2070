//! Enumeration over a proxy's results.
//!
//! An [`Enumeration`] holds the proxy, not rows. Every [`Enumeration::iter`]
//! call renders and executes the query again, so two passes can observe
//! different data.

use crate::error::{QueryError, Result};
use crate::proxy::QueryProxy;
use serde_json::Value;

/// What each enumerated item carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Nodes,
    /// Relationship of the last hop; needs an association
    Rels,
    /// Node with the relationship that reached it; needs an association
    Pairs,
}

/// One realised item
#[derive(Debug, Clone, PartialEq)]
pub enum Realized {
    Node(Value),
    Rel(Value),
    Pair { node: Value, rel: Value },
}

impl Realized {
    pub fn node(&self) -> Option<&Value> {
        match self {
            Realized::Node(node) | Realized::Pair { node, .. } => Some(node),
            Realized::Rel(_) => None,
        }
    }

    pub fn rel(&self) -> Option<&Value> {
        match self {
            Realized::Rel(rel) | Realized::Pair { rel, .. } => Some(rel),
            Realized::Node(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Enumeration {
    proxy: QueryProxy,
    projection: Projection,
}

impl Enumeration {
    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// Execute the query and iterate its rows.
    pub fn iter(&self) -> Result<std::vec::IntoIter<Realized>> {
        let identity = self.proxy.identity().to_string();
        let items: Vec<Realized> = match self.projection {
            Projection::Nodes => self
                .proxy
                .pluck(&identity)?
                .into_iter()
                .map(Realized::Node)
                .collect(),
            Projection::Rels => self
                .proxy
                .pluck(&self.proxy.rel_var())?
                .into_iter()
                .map(Realized::Rel)
                .collect(),
            Projection::Pairs => self
                .proxy
                .pluck_many(&[&identity, &self.proxy.rel_var()])?
                .into_iter()
                .filter_map(|row| {
                    let mut row = row.into_iter();
                    Some(Realized::Pair {
                        node: row.next()?,
                        rel: row.next()?,
                    })
                })
                .collect(),
        };
        Ok(items.into_iter())
    }

    pub fn to_vec(&self) -> Result<Vec<Realized>> {
        Ok(self.iter()?.collect())
    }

    pub fn get(&self, index: usize) -> Result<Option<Realized>> {
        Ok(self.iter()?.nth(index))
    }
}

impl QueryProxy {
    /// Enumerate results under `projection`.
    ///
    /// Relationship projections are only meaningful on a hop, so `Rels` and
    /// `Pairs` fail with `InvalidAssociation` on a proxy without one.
    pub fn each(&self, projection: Projection) -> Result<Enumeration> {
        if projection != Projection::Nodes && self.association.is_none() {
            return Err(QueryError::invalid_association(
                "relationship projections need an association proxy",
            ));
        }
        Ok(Enumeration {
            proxy: self.clone(),
            projection,
        })
    }
}
