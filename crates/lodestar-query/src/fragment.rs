//! Query fragment assembler.
//!
//! A [`QueryFragment`] is the low-level, backend-shaped form of a query:
//! ordered START/MATCH/WHERE/CREATE/RETURN/ORDER BY/SKIP/LIMIT clauses plus
//! bound parameters. Every operation consumes the fragment and returns the
//! updated value, so a fragment handed to a caller is never changed behind
//! their back.
//!
//! Rendering is deterministic:
//!
//! ```text
//! START .. MATCH .. WHERE .. CREATE .. RETURN .. ORDER BY .. SKIP .. LIMIT ..
//! ```
//!
//! Scalar values in predicates are always bound as `$name` parameters. Raw
//! predicate and order text is emitted verbatim.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Parameter bindings, name to value.
pub type Params = HashMap<String, Value>;

/// Anything that is not a Cypher identifier character
static PARAM_SANITIZE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]+").unwrap());
static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Output from rendering a fragment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderedQuery {
    /// The generated Cypher text
    pub cypher: String,
    /// Parameters to bind to the query
    pub params: Params,
}

/// A single WHERE predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Caller-supplied text, emitted verbatim without parameter binding
    Raw(String),
    /// `variable.field = $param` for each field
    Fields {
        variable: String,
        fields: Vec<(String, Value)>,
    },
    /// `ID(variable) = $param`
    Identity { variable: String, id: i64 },
}

impl Predicate {
    /// Equality on a single field of `variable`.
    pub fn field_eq(
        variable: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self::Fields {
            variable: variable.into(),
            fields: vec![(field.into(), value.into())],
        }
    }
}

/// Sort direction for ORDER BY items
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// One ORDER BY item.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderItem {
    /// Verbatim order text, e.g. `ID(result) DESC`
    Raw(String),
    /// `variable.field [DESC]`
    Field {
        variable: String,
        field: String,
        direction: SortDirection,
    },
}

/// Kind tag for a [`Clause`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseKind {
    Start,
    Match,
    Where,
    Create,
    Return,
    Order,
    Skip,
    Limit,
    Params,
}

impl fmt::Display for ClauseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClauseKind::Start => "start",
            ClauseKind::Match => "match",
            ClauseKind::Where => "where",
            ClauseKind::Create => "create",
            ClauseKind::Return => "return",
            ClauseKind::Order => "order",
            ClauseKind::Skip => "skip",
            ClauseKind::Limit => "limit",
            ClauseKind::Params => "params",
        };
        f.write_str(name)
    }
}

/// A primitive fragment operation together with its argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Start(String),
    Match(String),
    Where(Predicate),
    Create(String),
    Return(String),
    Order(Vec<OrderItem>),
    Skip(u64),
    Limit(u64),
    Params(Params),
}

impl Clause {
    pub fn kind(&self) -> ClauseKind {
        match self {
            Clause::Start(_) => ClauseKind::Start,
            Clause::Match(_) => ClauseKind::Match,
            Clause::Where(_) => ClauseKind::Where,
            Clause::Create(_) => ClauseKind::Create,
            Clause::Return(_) => ClauseKind::Return,
            Clause::Order(_) => ClauseKind::Order,
            Clause::Skip(_) => ClauseKind::Skip,
            Clause::Limit(_) => ClauseKind::Limit,
            Clause::Params(_) => ClauseKind::Params,
        }
    }
}

/// The in-progress composed query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFragment {
    starts: Vec<String>,
    matches: Vec<String>,
    predicates: Vec<Predicate>,
    creates: Vec<String>,
    returns: Vec<String>,
    orders: Vec<OrderItem>,
    skip: Option<u64>,
    limit: Option<u64>,
    params: Params,
}

impl QueryFragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a START binding, e.g. `n=node($id)`
    pub fn start(mut self, binding: impl Into<String>) -> Self {
        self.starts.push(binding.into());
        self
    }

    /// Append a MATCH pattern
    pub fn match_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.matches.push(pattern.into());
        self
    }

    /// Append a predicate; all predicates are AND-joined
    pub fn where_clause(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Append a CREATE pattern
    pub fn create(mut self, pattern: impl Into<String>) -> Self {
        self.creates.push(pattern.into());
        self
    }

    /// Append a RETURN expression
    pub fn return_expr(mut self, expr: impl Into<String>) -> Self {
        self.returns.push(expr.into());
        self
    }

    /// Append ORDER BY items
    pub fn order(mut self, items: impl IntoIterator<Item = OrderItem>) -> Self {
        self.orders.extend(items);
        self
    }

    /// Drop every ORDER BY item (aggregations do not need them)
    pub fn without_order(mut self) -> Self {
        self.orders.clear();
        self
    }

    pub fn skip(mut self, n: u64) -> Self {
        self.skip = Some(n);
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Merge parameter bindings; new values win on collision
    pub fn params(mut self, params: Params) -> Self {
        self.params.extend(params);
        self
    }

    /// Apply a [`Clause`] value to the fragment.
    pub fn apply(self, clause: Clause) -> Self {
        match clause {
            Clause::Start(binding) => self.start(binding),
            Clause::Match(pattern) => self.match_pattern(pattern),
            Clause::Where(predicate) => self.where_clause(predicate),
            Clause::Create(pattern) => self.create(pattern),
            Clause::Return(expr) => self.return_expr(expr),
            Clause::Order(items) => self.order(items),
            Clause::Skip(n) => self.skip(n),
            Clause::Limit(n) => self.limit(n),
            Clause::Params(params) => self.params(params),
        }
    }

    pub fn bound_params(&self) -> &Params {
        &self.params
    }

    pub fn has_return(&self) -> bool {
        !self.returns.is_empty()
    }

    /// Render to Cypher text plus the full parameter map.
    pub fn render(&self) -> RenderedQuery {
        let mut params = self.params.clone();
        let mut sections = Vec::new();

        if !self.starts.is_empty() {
            sections.push(format!("START {}", self.starts.join(", ")));
        }

        if !self.matches.is_empty() {
            sections.push(format!("MATCH {}", self.matches.join(", ")));
        }

        if !self.predicates.is_empty() {
            let wrap_raw = self.predicates.len() > 1;
            let conditions: Vec<String> = self
                .predicates
                .iter()
                .flat_map(|p| render_predicate(p, wrap_raw, &mut params))
                .collect();
            sections.push(format!("WHERE {}", conditions.join(" AND ")));
        }

        if !self.creates.is_empty() {
            sections.push(format!("CREATE {}", self.creates.join(", ")));
        }

        if !self.returns.is_empty() {
            sections.push(format!("RETURN {}", self.returns.join(", ")));
        }

        if !self.orders.is_empty() {
            let items: Vec<String> = self.orders.iter().map(render_order_item).collect();
            sections.push(format!("ORDER BY {}", items.join(", ")));
        }

        if let Some(skip) = self.skip {
            sections.push(format!("SKIP {}", skip));
        }

        if let Some(limit) = self.limit {
            sections.push(format!("LIMIT {}", limit));
        }

        RenderedQuery {
            cypher: sections.join(" "),
            params,
        }
    }
}

fn render_predicate(predicate: &Predicate, wrap_raw: bool, params: &mut Params) -> Vec<String> {
    match predicate {
        Predicate::Raw(text) if wrap_raw => vec![format!("({})", text)],
        Predicate::Raw(text) => vec![text.clone()],
        Predicate::Fields { variable, fields } => fields
            .iter()
            .map(|(field, value)| render_field_condition(variable, field, value, params))
            .collect(),
        Predicate::Identity { variable, id } => {
            let name = bind_param(params, &format!("{}_id", variable), Value::from(*id));
            vec![format!("ID({}) = ${}", variable, name)]
        }
    }
}

fn render_field_condition(variable: &str, field: &str, value: &Value, params: &mut Params) -> String {
    let target = if field == "neo_id" {
        format!("ID({})", variable)
    } else {
        property_access(variable, field)
    };

    if value.is_null() {
        return format!("{} IS NULL", target);
    }

    let name = bind_param(params, &format!("{}_{}", variable, field), value.clone());
    format!("{} = ${}", target, name)
}

fn render_order_item(item: &OrderItem) -> String {
    match item {
        OrderItem::Raw(text) => text.clone(),
        OrderItem::Field {
            variable,
            field,
            direction: SortDirection::Asc,
        } => property_access(variable, field),
        OrderItem::Field {
            variable,
            field,
            direction: SortDirection::Desc,
        } => format!("{} DESC", property_access(variable, field)),
    }
}

/// `var.field`, back-quoting fields that are not plain identifiers
fn property_access(variable: &str, field: &str) -> String {
    if IDENTIFIER_RE.is_match(field) {
        format!("{}.{}", variable, field)
    } else {
        format!("{}.`{}`", variable, field.replace('`', "``"))
    }
}

/// Bind `value` under a name derived from `base`.
///
/// A free name is taken as is. A name already bound to the same value is
/// reused; otherwise a numeric suffix is appended until the name is free.
fn bind_param(params: &mut Params, base: &str, value: Value) -> String {
    let base = sanitize_param_name(base);

    let mut name = base.clone();
    let mut suffix = 2;
    loop {
        match params.get(&name) {
            None => {
                params.insert(name.clone(), value);
                return name;
            }
            Some(existing) if *existing == value => return name,
            Some(_) => {
                name = format!("{}_{}", base, suffix);
                suffix += 1;
            }
        }
    }
}

/// Reduce arbitrary text to a usable Cypher parameter name.
pub fn sanitize_param_name(raw: &str) -> String {
    let cleaned = PARAM_SANITIZE_RE.replace_all(raw, "_");
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        "param".to_string()
    } else if cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        format!("p_{}", cleaned)
    } else {
        cleaned.to_string()
    }
}
