//! Chainable query proxies.
//!
//! A [`QueryProxy`] is an immutable description of a query: a model, how it
//! was reached (association and parent proxy, or an anchoring entity), and an
//! ordered chain of deferred [`Link`]s. Every chain method returns a new
//! proxy; the receiver is never modified, so proxies can be forked and shared
//! freely, including across threads.
//!
//! Nothing is rendered until a terminal operation calls [`QueryProxy::query`].
//! Assembly walks up the parent chain first, so a hop like
//! `person.friends.friends` becomes one MATCH with a variable per level:
//!
//! ```text
//! MATCH (person42:`Person`),
//!       (person42)-[rel1:`FRIENDS_WITH`]->(node3:`Person`),
//!       (node3)-[rel2:`FRIENDS_WITH`]->(result:`Person`)
//! WHERE ID(person42) = $person42_id
//! ```

use crate::association::Association;
use crate::config::QueryConfig;
use crate::error::{QueryError, Result};
use crate::fragment::{
    sanitize_param_name, Clause, Params, Predicate, QueryFragment, RenderedQuery,
};
use crate::link::Link;
use crate::model::{EntityRef, ModelRef, NodeId};
use crate::resolver::{ChainArg, ChainOp, Filter, FilterValue, OrderArg, ResolveContext, ResolverRegistry};
use crate::session::{QueryResult, Session};
use std::fmt;
use std::sync::Arc;

/// Immutable, forkable query builder.
#[derive(Clone)]
pub struct QueryProxy {
    pub(crate) model: Option<ModelRef>,
    pub(crate) association: Option<Association>,
    pub(crate) node_var: Option<String>,
    pub(crate) rel_var: Option<String>,
    pub(crate) chain: Vec<Link>,
    pub(crate) params: Params,
    pub(crate) parent: Option<Arc<QueryProxy>>,
    pub(crate) start_object: Option<EntityRef>,
    pub(crate) synthetic_allocated: usize,
    pub(crate) session: Arc<dyn Session>,
    pub(crate) context: Option<String>,
    pub(crate) resolvers: Arc<ResolverRegistry>,
    pub(crate) config: Arc<QueryConfig>,
}

impl QueryProxy {
    /// Root proxy over every node of `model`.
    pub fn new(model: ModelRef, session: Arc<dyn Session>) -> Self {
        Self::root(Some(model), session)
    }

    /// Root proxy over all nodes, with no label.
    pub fn unlabeled(session: Arc<dyn Session>) -> Self {
        Self::root(None, session)
    }

    /// Root proxy anchored at one persisted entity.
    pub fn for_entity(entity: EntityRef, model: ModelRef, session: Arc<dyn Session>) -> Self {
        let mut proxy = Self::root(Some(model), session);
        proxy.start_object = Some(entity);
        proxy
    }

    fn root(model: Option<ModelRef>, session: Arc<dyn Session>) -> Self {
        Self {
            model,
            association: None,
            node_var: None,
            rel_var: None,
            chain: Vec::new(),
            params: Params::new(),
            parent: None,
            start_object: None,
            synthetic_allocated: 0,
            session,
            context: None,
            resolvers: Arc::new(ResolverRegistry::default()),
            config: Arc::new(QueryConfig::default()),
        }
    }

    /// Proxy one hop across `association` from `parent`.
    ///
    /// The new proxy targets the association's model and inherits the
    /// parent's session, context, resolvers and config.
    pub fn nested(parent: Arc<QueryProxy>, association: Association) -> Self {
        Self {
            model: association.target().cloned(),
            association: Some(association),
            node_var: None,
            rel_var: None,
            chain: Vec::new(),
            params: Params::new(),
            start_object: None,
            synthetic_allocated: parent.synthetic_allocated,
            session: parent.session.clone(),
            context: parent.context.clone(),
            resolvers: parent.resolvers.clone(),
            config: parent.config.clone(),
            parent: Some(parent),
        }
    }

    /// Traverse the model's association `name`.
    pub fn association(&self, name: &str) -> Result<QueryProxy> {
        let model = self.model.as_ref().ok_or_else(|| {
            QueryError::invalid_association(format!(
                "cannot traverse '{}' from a proxy without a model",
                name
            ))
        })?;
        let association = model.association_for(name).ok_or_else(|| {
            QueryError::invalid_association(format!(
                "{} has no association named '{}'",
                model.label(),
                name
            ))
        })?;
        Ok(QueryProxy::nested(Arc::new(self.clone()), association))
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Replace the naming config; rejected if it fails validation.
    pub fn with_config(&self, config: Arc<QueryConfig>) -> Result<Self> {
        config.validate()?;
        let mut next = self.clone();
        next.config = config;
        Ok(next)
    }

    pub fn with_resolvers(&self, resolvers: Arc<ResolverRegistry>) -> Self {
        let mut next = self.clone();
        next.resolvers = resolvers;
        next
    }

    /// Tag handed to the session with every query
    pub fn with_context(&self, context: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.context = Some(context.into());
        next
    }

    pub fn with_node_var(&self, var: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.node_var = Some(var.into());
        next
    }

    pub fn with_rel_var(&self, var: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.rel_var = Some(var.into());
        next
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn model(&self) -> Option<&ModelRef> {
        self.model.as_ref()
    }

    pub fn association_descriptor(&self) -> Option<&Association> {
        self.association.as_ref()
    }

    pub fn parent(&self) -> Option<&Arc<QueryProxy>> {
        self.parent.as_ref()
    }

    pub fn start_object(&self) -> Option<&EntityRef> {
        self.start_object.as_ref()
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }

    pub fn bound_params(&self) -> &Params {
        &self.params
    }

    /// Variable this proxy's nodes are returned under
    pub fn identity(&self) -> &str {
        self.node_var.as_deref().unwrap_or(&self.config.result_variable)
    }

    /// 1 for root proxies, one more per association hop
    pub fn chain_level(&self) -> usize {
        match &self.parent {
            Some(parent) => parent.chain_level() + 1,
            None => 1,
        }
    }

    pub fn rel_var(&self) -> String {
        match &self.rel_var {
            Some(var) => var.clone(),
            None => format!("{}{}", self.config.rel_chain_prefix, self.chain_level() - 1),
        }
    }

    /// Entity edges are created from: the anchor of the proxy this hop
    /// started at.
    pub fn anchor_entity(&self) -> Option<&EntityRef> {
        match &self.parent {
            Some(parent) if parent.association.is_none() => parent.start_object.as_ref(),
            Some(_) => None,
            None => self.start_object.as_ref(),
        }
    }

    // ------------------------------------------------------------------
    // Chaining
    // ------------------------------------------------------------------

    fn extend(&self, op: ChainOp, arg: ChainArg) -> Result<QueryProxy> {
        let rel_var = self.rel_var();
        let ctx = ResolveContext {
            model: self.model.as_ref(),
            rel_var: &rel_var,
            has_association: self.association.is_some(),
            synthetic_allocated: self.synthetic_allocated,
            config: &self.config,
        };
        let resolution = self.resolvers.resolve(op, arg, &ctx)?;

        let mut next = self.clone();
        next.chain.extend(resolution.links);
        next.synthetic_allocated += resolution.synthetic_vars;
        Ok(next)
    }

    /// Filter by conditions or raw predicate text.
    ///
    /// Condition keys naming an association of the model match nodes related
    /// to the given entity (or identity) instead of comparing a property.
    pub fn where_filter(&self, filter: Filter) -> Result<QueryProxy> {
        self.extend(ChainOp::Where, ChainArg::Filter(filter))
    }

    pub fn where_eq(
        &self,
        key: impl Into<String>,
        value: impl Into<FilterValue>,
    ) -> Result<QueryProxy> {
        self.where_filter(Filter::eq(key, value))
    }

    /// Predicate text used verbatim. Nothing is parameterised.
    pub fn where_raw(&self, predicate: impl Into<String>) -> Result<QueryProxy> {
        self.where_filter(Filter::raw(predicate))
    }

    /// Filter on properties of the relationship this hop traversed.
    pub fn rel_where(&self, filter: Filter) -> Result<QueryProxy> {
        self.extend(ChainOp::RelWhere, ChainArg::Filter(filter))
    }

    pub fn order(&self, order: OrderArg) -> Result<QueryProxy> {
        self.extend(ChainOp::Order, ChainArg::Order(order))
    }

    pub fn order_by(&self, order: OrderArg) -> Result<QueryProxy> {
        self.order(order)
    }

    pub fn skip(&self, n: u64) -> Result<QueryProxy> {
        self.extend(ChainOp::Skip, ChainArg::Skip(n))
    }

    pub fn offset(&self, n: u64) -> Result<QueryProxy> {
        self.skip(n)
    }

    pub fn limit(&self, n: u64) -> Result<QueryProxy> {
        self.extend(ChainOp::Limit, ChainArg::Limit(n))
    }

    /// Restrict to the node with identity `id`
    pub fn match_to(&self, id: NodeId) -> Result<QueryProxy> {
        self.where_eq("neo_id", id)
    }

    /// Append any primitive clause unchanged.
    pub fn link(&self, clause: Clause) -> Result<QueryProxy> {
        self.extend(ChainOp::Clause, ChainArg::Clause(clause))
    }

    /// Bind parameters referenced by raw predicate or order text.
    pub fn params(&self, params: Params) -> QueryProxy {
        let mut next = self.clone();
        next.params.extend(params);
        next
    }

    // ------------------------------------------------------------------
    // Assembly
    // ------------------------------------------------------------------

    /// Assemble under the proxy's own identity variable
    pub fn query(&self) -> Result<QueryFragment> {
        self.query_as(self.identity())
    }

    /// Assemble the full fragment with this proxy's nodes bound to `var`.
    pub fn query_as(&self, var: &str) -> Result<QueryFragment> {
        let base = match (&self.association, &self.parent) {
            (Some(association), Some(parent)) => {
                let parent_var = self.parent_variable(parent);
                if parent_var == var {
                    return Err(QueryError::invalid_argument(format!(
                        "hop '{}' would reuse variable '{}' for both of its ends",
                        association.name(),
                        var
                    )));
                }
                let arrow = association.arrow_syntax(Some(&self.rel_var()), &Params::new(), false)?;
                parent.query_as(&parent_var)?.match_pattern(format!(
                    "({}){}{}",
                    parent_var,
                    arrow.pattern,
                    self.node_pattern(var)
                ))
            }
            _ => match &self.start_object {
                Some(entity) => {
                    let id = entity.neo_id().ok_or_else(|| {
                        QueryError::invalid_argument(format!(
                            "cannot query from an unsaved {} entity",
                            entity.model_label()
                        ))
                    })?;
                    QueryFragment::new()
                        .match_pattern(self.node_pattern(var))
                        .where_clause(Predicate::Identity {
                            variable: var.to_string(),
                            id,
                        })
                }
                None => QueryFragment::new().match_pattern(self.node_pattern(var)),
            },
        };

        let fragment = base.params(self.params.clone());
        Ok(self
            .chain
            .iter()
            .fold(fragment, |fragment, link| link.apply(fragment, var)))
    }

    /// Variable the parent is assembled under when this proxy extends it
    fn parent_variable(&self, parent: &QueryProxy) -> String {
        if let Some(var) = &parent.node_var {
            return var.clone();
        }
        match (&parent.start_object, &parent.association) {
            (Some(entity), None) => match entity.neo_id() {
                Some(id) => {
                    sanitize_param_name(&format!("{}{}", entity.model_label().to_lowercase(), id))
                }
                None => format!("{}{}", self.config.node_chain_prefix, self.chain_level()),
            },
            _ => format!("{}{}", self.config.node_chain_prefix, self.chain_level()),
        }
    }

    fn node_pattern(&self, var: &str) -> String {
        match &self.model {
            Some(model) => format!("({}:`{}`)", var, model.label()),
            None => format!("({})", var),
        }
    }

    /// Assembled query without a RETURN clause, as Cypher text
    pub fn to_cypher(&self) -> Result<String> {
        Ok(self.query()?.render().cypher)
    }

    pub(crate) fn execute(&self, fragment: &QueryFragment) -> Result<QueryResult> {
        let rendered: RenderedQuery = fragment.render();
        tracing::debug!(
            cypher = %rendered.cypher,
            params = rendered.params.len(),
            context = ?self.context,
            "executing proxy query"
        );
        Ok(self.session.run(&rendered, self.context.as_deref())?)
    }
}

impl fmt::Debug for QueryProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryProxy")
            .field("model", &self.model.as_ref().map(|m| m.label().to_string()))
            .field("association", &self.association.as_ref().map(|a| a.name().to_string()))
            .field("identity", &self.identity())
            .field("rel_var", &self.rel_var())
            .field("chain", &self.chain)
            .field("params", &self.params)
            .field("parent", &self.parent)
            .field("start_object", &self.start_object)
            .field("context", &self.context)
            .finish()
    }
}
