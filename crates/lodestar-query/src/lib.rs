//! Chainable, immutable query proxies over a property graph.
//!
//! A [`QueryProxy`] starts at a model (or a persisted entity), hops through
//! declared associations and collects filters, ordering and paging. Nothing
//! runs until a terminal operation assembles one Cypher query and hands it to
//! a [`Session`].
//!
//! ```rust
//! use lodestar_query::test_support::{people_schema, MockSession};
//! use lodestar_query::{OrderArg, QueryProxy};
//! use std::sync::Arc;
//!
//! let session = Arc::new(MockSession::new());
//! let people = QueryProxy::new(people_schema().model("Person"), session);
//!
//! let adults = people
//!     .where_eq("age", 30).unwrap()
//!     .association("friends").unwrap()
//!     .order(OrderArg::asc("name")).unwrap();
//!
//! assert_eq!(
//!     adults.to_cypher().unwrap(),
//!     "MATCH (node2:`Person`), (node2)-[rel1:`FRIENDS_WITH`]->(result:`Person`) \
//!      WHERE node2.age = $node2_age ORDER BY result.name"
//! );
//! ```

pub mod association;
pub mod config;
pub mod enumerate;
pub mod error;
pub mod fragment;
pub mod link;
pub mod model;
pub mod proxy;
pub mod resolver;
pub mod session;
pub mod terminal;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use association::{Arrow, Association, AssociationCallbacks, Direction};
pub use config::QueryConfig;
pub use enumerate::{Enumeration, Projection, Realized};
pub use error::{QueryError, Result, SessionError};
pub use fragment::{
    Clause, ClauseKind, OrderItem, Params, Predicate, QueryFragment, RenderedQuery, SortDirection,
};
pub use link::{Link, LinkArgument};
pub use model::{Entity, EntityRef, ModelDescriptor, ModelRef, NodeId};
pub use proxy::QueryProxy;
pub use resolver::{
    ChainArg, ChainOp, Filter, FilterValue, OrderArg, ResolveContext, ResolveFailure, Resolution,
    ResolverRegistry,
};
pub use session::{QueryResult, Record, Session};
pub use terminal::{CountQualifier, EdgeTarget, ExistsCondition};
