//! Chain-link resolver.
//!
//! Turns one high-level chain call (`where`, `rel_where`, `order`, ...) into
//! the [`Link`]s appended to a proxy's chain. The [`ResolverRegistry`] maps
//! each [`ChainOp`] to an optional specialised resolver; anything without
//! one, or whose resolver declines, becomes a single passthrough link.
//!
//! A specialised resolver can fail in two ways. Caller mistakes
//! ([`ResolveFailure::Invalid`]) are returned to the caller. Internal
//! failures degrade to passthrough and are logged.

use crate::config::QueryConfig;
use crate::error::QueryError;
use crate::fragment::{Clause, ClauseKind, OrderItem, Params, Predicate, SortDirection};
use crate::link::Link;
use crate::model::{EntityRef, ModelRef, NodeId};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// High-level chain operation names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainOp {
    Where,
    RelWhere,
    Order,
    Skip,
    Limit,
    /// Any primitive clause handed straight to the fragment
    Clause,
}

/// Right-hand side of a filter condition
#[derive(Clone)]
pub enum FilterValue {
    Value(Value),
    Entity(EntityRef),
}

impl FilterValue {
    /// Plain value used when the condition is a property equality
    pub fn to_value(&self) -> Value {
        match self {
            FilterValue::Value(value) => value.clone(),
            FilterValue::Entity(entity) => entity.neo_id().map_or(Value::Null, Value::from),
        }
    }
}

impl fmt::Debug for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Value(value) => write!(f, "{}", value),
            FilterValue::Entity(entity) => write!(f, "{:?}", entity),
        }
    }
}

impl From<Value> for FilterValue {
    fn from(value: Value) -> Self {
        FilterValue::Value(value)
    }
}

impl From<EntityRef> for FilterValue {
    fn from(entity: EntityRef) -> Self {
        FilterValue::Entity(entity)
    }
}

impl From<&EntityRef> for FilterValue {
    fn from(entity: &EntityRef) -> Self {
        FilterValue::Entity(entity.clone())
    }
}

macro_rules! filter_value_from {
    ($($ty:ty),*) => {
        $(impl From<$ty> for FilterValue {
            fn from(value: $ty) -> Self {
                FilterValue::Value(Value::from(value))
            }
        })*
    };
}

filter_value_from!(i64, i32, u64, f64, bool, &str, String);

/// Argument of a `where`/`rel_where` call
#[derive(Debug, Clone)]
pub enum Filter {
    /// Predicate text used verbatim; nothing is parameterised
    Raw(String),
    /// `key = value` conditions, in call order
    Conditions(Vec<(String, FilterValue)>),
    /// Raw text plus conditions, all of which must hold
    Combined {
        raw: String,
        conditions: Vec<(String, FilterValue)>,
    },
}

impl Filter {
    pub fn raw(text: impl Into<String>) -> Self {
        Filter::Raw(text.into())
    }

    pub fn eq(key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Filter::Conditions(vec![(key.into(), value.into())])
    }

    /// Add another condition.
    pub fn and(self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        let condition = (key.into(), value.into());
        match self {
            Filter::Conditions(mut conditions) => {
                conditions.push(condition);
                Filter::Conditions(conditions)
            }
            Filter::Raw(raw) => Filter::Combined {
                raw,
                conditions: vec![condition],
            },
            Filter::Combined {
                raw,
                mut conditions,
            } => {
                conditions.push(condition);
                Filter::Combined { raw, conditions }
            }
        }
    }

    /// Raw text (if any) and the conditions
    pub fn parts(&self) -> (Option<&str>, &[(String, FilterValue)]) {
        match self {
            Filter::Raw(raw) => (Some(raw), &[]),
            Filter::Conditions(conditions) => (None, conditions),
            Filter::Combined { raw, conditions } => (Some(raw), conditions),
        }
    }
}

/// Argument of an `order` call
#[derive(Debug, Clone, PartialEq)]
pub enum OrderArg {
    /// Order text used verbatim
    Raw(String),
    /// Fields of the proxy's node variable
    Fields(Vec<(String, SortDirection)>),
}

impl OrderArg {
    pub fn raw(text: impl Into<String>) -> Self {
        OrderArg::Raw(text.into())
    }

    pub fn asc(field: impl Into<String>) -> Self {
        OrderArg::Fields(vec![(field.into(), SortDirection::Asc)])
    }

    pub fn desc(field: impl Into<String>) -> Self {
        OrderArg::Fields(vec![(field.into(), SortDirection::Desc)])
    }
}

/// Argument of any chain call
#[derive(Debug, Clone)]
pub enum ChainArg {
    Filter(Filter),
    Order(OrderArg),
    Skip(u64),
    Limit(u64),
    Clause(Clause),
}

/// What a resolver needs to know about the proxy being extended
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub model: Option<&'a ModelRef>,
    pub rel_var: &'a str,
    pub has_association: bool,
    /// Synthetic variables already allocated along this chain
    pub synthetic_allocated: usize,
    pub config: &'a QueryConfig,
}

/// Links produced for one chain call
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub links: Vec<Link>,
    /// Synthetic variables this call introduced
    pub synthetic_vars: usize,
}

impl Resolution {
    pub fn new(links: Vec<Link>) -> Self {
        Self {
            links,
            synthetic_vars: 0,
        }
    }
}

/// How a specialised resolver failed
#[derive(Debug, Clone)]
pub enum ResolveFailure {
    /// Bad caller input; surfaced as is
    Invalid(QueryError),
    /// Resolver could not do its job; falls back to passthrough
    Internal(String),
}

impl From<QueryError> for ResolveFailure {
    fn from(err: QueryError) -> Self {
        ResolveFailure::Invalid(err)
    }
}

/// Specialised resolver; `Ok(None)` means "use passthrough"
pub type SpecializedResolver =
    fn(&ResolveContext<'_>, &ChainArg) -> Result<Option<Resolution>, ResolveFailure>;

/// Operation name to specialised resolver, with passthrough as the default.
#[derive(Clone)]
pub struct ResolverRegistry {
    resolvers: HashMap<ChainOp, SpecializedResolver>,
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(ChainOp::Where, resolve_where);
        registry.register(ChainOp::RelWhere, resolve_rel_where);
        registry.register(ChainOp::Order, resolve_order);
        registry
    }
}

impl fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ops: Vec<String> = self.resolvers.keys().map(|op| format!("{:?}", op)).collect();
        ops.sort();
        f.debug_struct("ResolverRegistry").field("ops", &ops).finish()
    }
}

impl ResolverRegistry {
    /// Registry where every operation is passthrough
    pub fn empty() -> Self {
        Self {
            resolvers: HashMap::new(),
        }
    }

    /// Register (or replace) the resolver for `op`
    pub fn register(&mut self, op: ChainOp, resolver: SpecializedResolver) {
        self.resolvers.insert(op, resolver);
    }

    pub fn has_resolver(&self, op: ChainOp) -> bool {
        self.resolvers.contains_key(&op)
    }

    pub fn resolve(
        &self,
        op: ChainOp,
        arg: ChainArg,
        ctx: &ResolveContext<'_>,
    ) -> Result<Resolution, QueryError> {
        let Some(resolver) = self.resolvers.get(&op) else {
            return Ok(passthrough(arg));
        };

        match resolver(ctx, &arg) {
            Ok(Some(resolution)) => Ok(resolution),
            Ok(None) => Ok(passthrough(arg)),
            Err(ResolveFailure::Invalid(err)) => Err(err),
            Err(ResolveFailure::Internal(reason)) => {
                if ctx.config.log_resolver_fallbacks {
                    tracing::warn!(
                        op = ?op,
                        reason = %reason,
                        "specialised resolver failed, falling back to passthrough"
                    );
                }
                Ok(passthrough(arg))
            }
        }
    }
}

/// Single link, no transformation.
pub fn passthrough(arg: ChainArg) -> Resolution {
    let link = match arg {
        ChainArg::Filter(filter) => return Resolution::new(filter_links(&filter)),
        ChainArg::Order(order) => order_link(order),
        ChainArg::Skip(n) => Link::literal(Clause::Skip(n)),
        ChainArg::Limit(n) => Link::literal(Clause::Limit(n)),
        ChainArg::Clause(clause) => Link::literal(clause),
    };
    Resolution::new(vec![link])
}

/// Raw text as a literal predicate, conditions as equality on the live variable
fn filter_links(filter: &Filter) -> Vec<Link> {
    let (raw, conditions) = filter.parts();
    let mut links: Vec<Link> = raw.map(raw_link).into_iter().collect();
    if !conditions.is_empty() {
        let fields: Vec<(String, Value)> = conditions
            .iter()
            .map(|(key, value)| (key.clone(), value.to_value()))
            .collect();
        links.push(Link::deferred(ClauseKind::Where, move |var| {
            Clause::Where(Predicate::Fields {
                variable: var.to_string(),
                fields: fields.clone(),
            })
        }));
    }
    links
}

fn raw_link(text: &str) -> Link {
    Link::literal(Clause::Where(Predicate::Raw(text.to_string())))
}

fn order_link(order: OrderArg) -> Link {
    match order {
        OrderArg::Raw(text) => Link::literal(Clause::Order(vec![OrderItem::Raw(text)])),
        OrderArg::Fields(fields) => Link::deferred(ClauseKind::Order, move |var| {
            Clause::Order(
                fields
                    .iter()
                    .map(|(field, direction)| OrderItem::Field {
                        variable: var.to_string(),
                        field: field.clone(),
                        direction: *direction,
                    })
                    .collect(),
            )
        }),
    }
}

/// `where` on a model: association keys become a traversal to a fresh
/// synthetic node pinned by identity, other keys become property equality.
fn resolve_where(
    ctx: &ResolveContext<'_>,
    arg: &ChainArg,
) -> Result<Option<Resolution>, ResolveFailure> {
    let ChainArg::Filter(filter) = arg else {
        return Ok(None);
    };
    let (raw, conditions) = filter.parts();
    if conditions.is_empty() {
        return Ok(None);
    }

    let mut links: Vec<Link> = raw.map(raw_link).into_iter().collect();
    let mut synthetic_vars = 0;

    for (key, value) in conditions {
        match ctx.model {
            Some(model) if model.has_association(key) => {
                let association = model.association_for(key).ok_or_else(|| {
                    ResolveFailure::Internal(format!(
                        "model {} reports association '{}' but has no descriptor for it",
                        model.label(),
                        key
                    ))
                })?;
                let id = association_identity(key, value)?;

                synthetic_vars += 1;
                let synthetic = format!(
                    "{}{}",
                    ctx.config.synthetic_prefix,
                    ctx.synthetic_allocated + synthetic_vars
                );

                let arrow = association
                    .arrow_syntax(None, &Params::new(), false)
                    .map_err(|e| ResolveFailure::Internal(e.to_string()))?
                    .pattern;
                let target = synthetic.clone();
                links.push(Link::deferred(ClauseKind::Match, move |var| {
                    Clause::Match(format!("({}){}({})", var, arrow, target))
                }));
                links.push(Link::literal(Clause::Where(Predicate::Identity {
                    variable: synthetic,
                    id,
                })));
            }
            _ => {
                let key = key.clone();
                let value = value.to_value();
                links.push(Link::deferred(ClauseKind::Where, move |var| {
                    Clause::Where(Predicate::field_eq(var, key.clone(), value.clone()))
                }));
            }
        }
    }

    Ok(Some(Resolution {
        links,
        synthetic_vars,
    }))
}

/// Conditions on the relationship variable of an association proxy.
fn resolve_rel_where(
    ctx: &ResolveContext<'_>,
    arg: &ChainArg,
) -> Result<Option<Resolution>, ResolveFailure> {
    if !ctx.has_association {
        return Err(QueryError::invalid_argument(
            "rel_where is only available on association proxies",
        )
        .into());
    }

    let ChainArg::Filter(filter) = arg else {
        return Ok(None);
    };

    let (raw, conditions) = filter.parts();
    let mut links: Vec<Link> = raw.map(raw_link).into_iter().collect();
    if !conditions.is_empty() {
        links.push(Link::literal(Clause::Where(Predicate::Fields {
            variable: ctx.rel_var.to_string(),
            fields: conditions
                .iter()
                .map(|(key, value)| (key.clone(), value.to_value()))
                .collect(),
        })));
    }
    Ok(Some(Resolution::new(links)))
}

fn resolve_order(
    _ctx: &ResolveContext<'_>,
    arg: &ChainArg,
) -> Result<Option<Resolution>, ResolveFailure> {
    let ChainArg::Order(order) = arg else {
        return Ok(None);
    };
    Ok(Some(Resolution::new(vec![order_link(order.clone())])))
}

fn association_identity(key: &str, value: &FilterValue) -> Result<NodeId, QueryError> {
    match value {
        FilterValue::Entity(entity) => entity.neo_id().ok_or_else(|| {
            QueryError::invalid_argument(format!(
                "entity given for '{}' condition has not been saved",
                key
            ))
        }),
        FilterValue::Value(value) => value.as_i64().ok_or_else(|| {
            QueryError::invalid_argument(format!("Invalid value for '{}' condition", key))
        }),
    }
}
