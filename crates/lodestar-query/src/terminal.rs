//! Terminal operations: everything that assembles a proxy and runs it.
//!
//! Validation happens before anything is rendered, so a misuse error never
//! leaves a half-issued query behind. Session errors are returned unchanged.

use crate::error::{QueryError, Result};
use crate::fragment::{Params, Predicate, QueryFragment};
use crate::model::{Entity, EntityRef, NodeId};
use crate::proxy::QueryProxy;
use crate::resolver::{FilterValue, OrderArg};
use serde_json::Value;
use std::str::FromStr;

/// Qualifier accepted by [`QueryProxy::count`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountQualifier {
    Distinct,
}

impl FromStr for CountQualifier {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "distinct" => Ok(CountQualifier::Distinct),
            other => Err(QueryError::invalid_argument(format!(
                "count accepts `distinct` or nothing as a qualifier, got {:?}",
                other
            ))),
        }
    }
}

/// Condition for [`QueryProxy::exists`]
#[derive(Debug, Clone)]
pub enum ExistsCondition {
    /// A node with this identity is in the result set
    Id(NodeId),
    /// A node with `key = value` is in the result set
    Field(String, FilterValue),
}

/// Other end of an edge to create
#[derive(Debug, Clone)]
pub enum EdgeTarget {
    Entity(EntityRef),
    /// Looked up through the association's target model
    Id(NodeId),
}

impl From<EntityRef> for EdgeTarget {
    fn from(entity: EntityRef) -> Self {
        EdgeTarget::Entity(entity)
    }
}

impl From<&EntityRef> for EdgeTarget {
    fn from(entity: &EntityRef) -> Self {
        EdgeTarget::Entity(entity.clone())
    }
}

impl From<NodeId> for EdgeTarget {
    fn from(id: NodeId) -> Self {
        EdgeTarget::Id(id)
    }
}

/// Column name Cypher gives a RETURN expression
fn column_name(expr: &str) -> &str {
    let upper = expr.to_ascii_uppercase();
    match upper.rfind(" AS ") {
        Some(pos) => expr[pos + 4..].trim(),
        None => expr.trim(),
    }
}

impl QueryProxy {
    /// Assembled query as text and parameters, without a RETURN clause
    pub fn render(&self) -> Result<crate::fragment::RenderedQuery> {
        Ok(self.query()?.render())
    }

    /// Return `exprs` for every row, one `Vec` per row.
    pub fn pluck_many(&self, exprs: &[&str]) -> Result<Vec<Vec<Value>>> {
        let fragment = exprs
            .iter()
            .fold(self.query()?, |fragment, expr| fragment.return_expr(*expr));
        self.pluck_from(fragment, exprs)
    }

    /// Return one expression for every row.
    pub fn pluck(&self, expr: &str) -> Result<Vec<Value>> {
        Ok(self
            .pluck_many(&[expr])?
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .collect())
    }

    fn pluck_from(&self, fragment: QueryFragment, exprs: &[&str]) -> Result<Vec<Vec<Value>>> {
        let result = self.execute(&fragment)?;
        result
            .records
            .iter()
            .map(|record| {
                exprs
                    .iter()
                    .map(|expr| {
                        let column = column_name(expr);
                        record.get(column).cloned().ok_or_else(|| {
                            QueryError::UnexpectedResult(format!(
                                "row is missing column '{}'",
                                column
                            ))
                        })
                    })
                    .collect()
            })
            .collect()
    }

    /// Every matching node
    pub fn to_list(&self) -> Result<Vec<Value>> {
        let identity = self.identity().to_string();
        self.pluck(&identity)
    }

    /// Realise, then index. The engine is not asked for a single row.
    pub fn get(&self, index: usize) -> Result<Option<Value>> {
        Ok(self.to_list()?.into_iter().nth(index))
    }

    /// Node with the lowest identity, `None` when nothing matches
    pub fn first(&self) -> Result<Option<Value>> {
        self.first_or_last(false)
    }

    /// Node with the highest identity, `None` when nothing matches
    pub fn last(&self) -> Result<Option<Value>> {
        self.first_or_last(true)
    }

    fn first_or_last(&self, descending: bool) -> Result<Option<Value>> {
        let identity = self.identity().to_string();
        let order = if descending {
            format!("ID({}) DESC", identity)
        } else {
            format!("ID({})", identity)
        };
        Ok(self
            .order(OrderArg::Raw(order))?
            .limit(1)?
            .pluck(&identity)?
            .into_iter()
            .next())
    }

    /// Number of matching nodes.
    pub fn count(&self, qualifier: Option<CountQualifier>) -> Result<u64> {
        let identity = self.identity().to_string();
        let expr = match qualifier {
            Some(CountQualifier::Distinct) => format!("count(DISTINCT {}) AS {}", identity, identity),
            None => format!("count({}) AS {}", identity, identity),
        };
        self.aggregate(self.query()?, &expr)
    }

    /// `count` with the qualifier given as text, e.g. from user input
    pub fn count_with(&self, qualifier: &str) -> Result<u64> {
        let qualifier = qualifier.parse::<CountQualifier>()?;
        self.count(Some(qualifier))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(!self.exists(None)?)
    }

    /// Whether any node matches, optionally under an extra condition.
    pub fn exists(&self, condition: Option<ExistsCondition>) -> Result<bool> {
        let identity = self.identity().to_string();
        let scoped = match condition {
            Some(ExistsCondition::Id(id)) => {
                let mut params = Params::new();
                params.insert("exists_condition".to_string(), Value::from(id));
                self.where_raw(format!("ID({}) = $exists_condition", identity))?
                    .params(params)
            }
            Some(ExistsCondition::Field(key, value)) => self.where_eq(key, value)?,
            None => self.clone(),
        };
        let expr = format!("count({}) AS count", identity);
        Ok(scoped.aggregate(scoped.query()?, &expr)? > 0)
    }

    /// Whether `entity` is in the result set
    pub fn includes(&self, entity: &dyn Entity) -> Result<bool> {
        let id = entity.neo_id().ok_or_else(|| {
            QueryError::invalid_argument("includes only accepts saved entities")
        })?;
        let identity = self.identity().to_string();
        let mut params = Params::new();
        params.insert("include_id".to_string(), Value::from(id));

        let scoped = self
            .where_raw(format!("ID({}) = $include_id", identity))?
            .params(params);
        let expr = format!("count({}) AS count", identity);
        Ok(scoped.aggregate(scoped.query()?, &expr)? > 0)
    }

    /// Relationship this hop used to reach `entity`, if any
    pub fn first_rel_to(&self, entity: &dyn Entity) -> Result<Option<Value>> {
        if self.association.is_none() {
            return Err(QueryError::invalid_association(
                "first_rel_to is only available on association proxies",
            ));
        }
        let id = entity.neo_id().ok_or_else(|| {
            QueryError::invalid_argument("first_rel_to only accepts saved entities")
        })?;
        let rel_var = self.rel_var();
        Ok(self
            .match_to(id)?
            .limit(1)?
            .pluck(&rel_var)?
            .into_iter()
            .next())
    }

    /// Run a single-value aggregation with ORDER BY removed.
    fn aggregate(&self, fragment: QueryFragment, expr: &str) -> Result<u64> {
        let fragment = fragment.without_order().return_expr(expr);
        let column = column_name(expr);
        let result = self.execute(&fragment)?;

        let Some(record) = result.records.first() else {
            return Ok(0);
        };
        record
            .get(column)
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                QueryError::UnexpectedResult(format!(
                    "aggregation column '{}' is missing or not a count",
                    column
                ))
            })
    }

    /// Create an edge of this proxy's association from its anchor entity to
    /// each target.
    ///
    /// Targets given by identity are looked up through the target model;
    /// identities that do not resolve are skipped. Unsaved targets (and an
    /// unsaved anchor) are saved first. Returns `false` when a before-create
    /// callback halted creation; edges already created stay created.
    pub fn create_edge<T>(&self, targets: impl IntoIterator<Item = T>, properties: Params) -> Result<bool>
    where
        T: Into<EdgeTarget>,
    {
        let association = self.association.as_ref().ok_or_else(|| {
            QueryError::invalid_association("edges can only be created on association proxies")
        })?;
        let start = self.anchor_entity().cloned().ok_or_else(|| {
            QueryError::invalid_association(format!(
                "creating '{}' edges needs a proxy anchored at an entity",
                association.name()
            ))
        })?;

        let mut others: Vec<EntityRef> = Vec::new();
        for target in targets {
            match target.into() {
                EdgeTarget::Entity(entity) => others.push(entity),
                EdgeTarget::Id(id) => {
                    let model = self.model.as_ref().ok_or_else(|| {
                        QueryError::invalid_argument(format!(
                            "cannot look up node {} without a target model",
                            id
                        ))
                    })?;
                    if let Some(entity) = model.find(id)? {
                        others.push(entity);
                    }
                }
            }
        }

        if let Some(model) = &self.model {
            if let Some(wrong) = others.iter().find(|o| o.model_label() != model.label()) {
                return Err(QueryError::ModelMismatch {
                    expected: model.label().to_string(),
                    found: wrong.model_label().to_string(),
                });
            }
        }

        let arrow = association.arrow_syntax(Some(&self.rel_var()), &properties, true)?;

        for other in others {
            let other_id = match other.neo_id() {
                Some(id) => id,
                None => other.save()?,
            };

            if !association.before_create(start.as_ref(), other.as_ref()) {
                tracing::debug!(
                    association = association.name(),
                    target = other_id,
                    "before-create callback halted edge creation"
                );
                return Ok(false);
            }

            let start_id = match start.neo_id() {
                Some(id) => id,
                None => start.save()?,
            };

            let fragment = QueryFragment::new()
                .match_pattern("(start)")
                .match_pattern("(end)")
                .where_clause(Predicate::Identity {
                    variable: "start".to_string(),
                    id: start_id,
                })
                .where_clause(Predicate::Identity {
                    variable: "end".to_string(),
                    id: other_id,
                })
                .create(format!("(start){}(end)", arrow.pattern))
                .params(arrow.params.clone());
            self.execute(&fragment)?;

            association.after_create(start.as_ref(), other.as_ref());
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use crate::session::{QueryResult, Record};
    use crate::test_support::{people_schema, MockSession, RecordingCallbacks, TestEntity};
    use serde_json::json;
    use std::sync::Arc;
    use test_case::test_case;

    fn setup() -> (Arc<MockSession>, QueryProxy) {
        let session = Arc::new(MockSession::new());
        let proxy = QueryProxy::new(people_schema().model("Person"), session.clone());
        (session, proxy)
    }

    fn count_row(column: &str, n: u64) -> QueryResult {
        QueryResult::with_records(vec![Record::from_pairs([(column, json!(n))])])
    }

    #[test_case("n.name", "n.name" ; "plain expression")]
    #[test_case("count(result) AS result", "result" ; "upper alias")]
    #[test_case("count(result) as total", "total" ; "lower alias")]
    fn test_column_name(expr: &str, expected: &str) {
        assert_eq!(column_name(expr), expected);
    }

    // =========================================================================
    // Realisation
    // =========================================================================

    #[test]
    fn test_to_list_plucks_identity() {
        let (session, proxy) = setup();
        session.push_rows("result", vec![json!({"name": "Ada"}), json!({"name": "Bob"})]);

        let people = proxy.where_eq("active", true).unwrap().to_list().unwrap();

        assert_eq!(people.len(), 2);
        assert_eq!(
            session.last_query().unwrap().cypher,
            "MATCH (result:`Person`) WHERE result.active = $result_active RETURN result"
        );
    }

    #[test]
    fn test_pluck_many_columns() {
        let (session, proxy) = setup();
        session.push_result(QueryResult::with_records(vec![Record::from_pairs([
            ("result.name", json!("Ada")),
            ("result.age", json!(36)),
        ])]));

        let rows = proxy.pluck_many(&["result.name", "result.age"]).unwrap();

        assert_eq!(rows, vec![vec![json!("Ada"), json!(36)]]);
        assert!(session
            .last_query()
            .unwrap()
            .cypher
            .ends_with("RETURN result.name, result.age"));
    }

    #[test]
    fn test_missing_column_is_unexpected_result() {
        let (session, proxy) = setup();
        session.push_rows("other", vec![json!(1)]);

        let result = proxy.to_list();

        assert!(matches!(result, Err(QueryError::UnexpectedResult(_))));
    }

    #[test]
    fn test_get_realises_then_indexes() {
        let (session, proxy) = setup();
        session.push_rows("result", vec![json!("a"), json!("b")]);
        session.push_rows("result", vec![json!("a"), json!("b")]);

        assert_eq!(proxy.get(1).unwrap(), Some(json!("b")));
        assert_eq!(proxy.get(5).unwrap(), None);
        assert!(!session.last_query().unwrap().cypher.contains("SKIP"));
    }

    // =========================================================================
    // first / last
    // =========================================================================

    #[test]
    fn test_first_orders_by_identity() {
        let (session, proxy) = setup();
        session.push_rows("result", vec![json!({"name": "Ada"})]);

        let first = proxy.first().unwrap();

        assert_eq!(first, Some(json!({"name": "Ada"})));
        assert_eq!(
            session.last_query().unwrap().cypher,
            "MATCH (result:`Person`) RETURN result ORDER BY ID(result) LIMIT 1"
        );
    }

    #[test]
    fn test_last_orders_descending() {
        let (session, proxy) = setup();

        proxy.last().unwrap();

        assert_eq!(
            session.last_query().unwrap().cypher,
            "MATCH (result:`Person`) RETURN result ORDER BY ID(result) DESC LIMIT 1"
        );
    }

    #[test]
    fn test_first_on_empty_is_none() {
        let (_session, proxy) = setup();
        assert_eq!(proxy.first().unwrap(), None);
        assert_eq!(proxy.last().unwrap(), None);
    }

    // =========================================================================
    // Aggregations
    // =========================================================================

    #[test]
    fn test_count_plain() {
        let (session, proxy) = setup();
        session.push_result(count_row("result", 3));

        assert_eq!(proxy.count(None).unwrap(), 3);
        assert_eq!(
            session.last_query().unwrap().cypher,
            "MATCH (result:`Person`) RETURN count(result) AS result"
        );
    }

    #[test]
    fn test_count_distinct() {
        let (session, proxy) = setup();
        session.push_result(count_row("result", 2));

        assert_eq!(proxy.count(Some(CountQualifier::Distinct)).unwrap(), 2);
        assert!(session
            .last_query()
            .unwrap()
            .cypher
            .contains("count(DISTINCT result)"));
    }

    #[test]
    fn test_count_drops_order() {
        let (session, proxy) = setup();
        session.push_result(count_row("result", 1));

        proxy.order(OrderArg::asc("name")).unwrap().count(None).unwrap();

        assert!(!session.last_query().unwrap().cypher.contains("ORDER BY"));
    }

    #[test_case("distinct" ; "lower")]
    #[test_case("DISTINCT" ; "upper")]
    fn test_count_qualifier_parses(text: &str) {
        assert_eq!(text.parse::<CountQualifier>().unwrap(), CountQualifier::Distinct);
    }

    #[test]
    fn test_count_rejects_other_qualifiers_before_querying() {
        let (session, proxy) = setup();

        let result = proxy.count_with("unique");

        assert!(matches!(result, Err(QueryError::InvalidArgument(_))));
        assert!(session.queries().is_empty());
    }

    #[test]
    fn test_count_with_no_rows_is_zero() {
        let (_session, proxy) = setup();
        assert_eq!(proxy.count(None).unwrap(), 0);
    }

    #[test]
    fn test_exists_and_is_empty() {
        let (session, proxy) = setup();
        session.push_result(count_row("count", 1));
        session.push_result(count_row("count", 0));

        assert!(proxy.exists(None).unwrap());
        assert!(proxy.is_empty().unwrap());
        assert_eq!(
            session.last_query().unwrap().cypher,
            "MATCH (result:`Person`) RETURN count(result) AS count"
        );
    }

    #[test]
    fn test_exists_by_id() {
        let (session, proxy) = setup();
        session.push_result(count_row("count", 1));

        assert!(proxy.exists(Some(ExistsCondition::Id(9))).unwrap());

        let query = session.last_query().unwrap();
        assert!(query.cypher.contains("WHERE ID(result) = $exists_condition"));
        assert_eq!(query.params.get("exists_condition"), Some(&json!(9)));
    }

    #[test]
    fn test_exists_by_field() {
        let (session, proxy) = setup();
        session.push_result(count_row("count", 0));

        let found = proxy
            .exists(Some(ExistsCondition::Field("name".to_string(), "Zed".into())))
            .unwrap();

        assert!(!found);
        assert!(session
            .last_query()
            .unwrap()
            .cypher
            .contains("WHERE result.name = $result_name"));
    }

    #[test]
    fn test_includes() {
        let (session, proxy) = setup();
        session.push_result(count_row("count", 1));
        let ada = TestEntity::persisted("Person", 4);

        assert!(proxy.includes(&ada).unwrap());
        assert_eq!(
            session.last_query().unwrap().params.get("include_id"),
            Some(&json!(4))
        );
    }

    #[test]
    fn test_includes_rejects_unsaved_entity() {
        let (session, proxy) = setup();

        let result = proxy.includes(&TestEntity::new("Person"));

        assert!(matches!(result, Err(QueryError::InvalidArgument(_))));
        assert!(session.queries().is_empty());
    }

    #[test]
    fn test_session_errors_pass_through() {
        let (session, proxy) = setup();
        session.fail_next(SessionError::Connection("engine down".to_string()));

        let result = proxy.to_list();

        assert_eq!(
            result,
            Err(QueryError::Session(SessionError::Connection(
                "engine down".to_string()
            )))
        );
    }

    #[test]
    fn test_context_reaches_session() {
        let (session, proxy) = setup();

        proxy.with_context("dashboard").to_list().unwrap();

        assert_eq!(session.contexts(), vec![Some("dashboard".to_string())]);
    }

    // =========================================================================
    // first_rel_to
    // =========================================================================

    #[test]
    fn test_first_rel_to() {
        let (session, proxy) = setup();
        session.push_rows("rel1", vec![json!({"since": 2019})]);
        let bob = TestEntity::persisted("Person", 8);

        let rel = proxy.association("friends").unwrap().first_rel_to(&bob).unwrap();

        assert_eq!(rel, Some(json!({"since": 2019})));
        let cypher = session.last_query().unwrap().cypher;
        assert!(cypher.contains("WHERE ID(result) = $result_neo_id"));
        assert!(cypher.ends_with("RETURN rel1 LIMIT 1"));
    }

    #[test]
    fn test_first_rel_to_requires_association() {
        let (_session, proxy) = setup();
        let bob = TestEntity::persisted("Person", 8);

        let result = proxy.first_rel_to(&bob);

        assert!(matches!(result, Err(QueryError::InvalidAssociation(_))));
    }

    // =========================================================================
    // create_edge
    // =========================================================================

    #[test]
    fn test_create_edge_requires_association() {
        let (session, proxy) = setup();
        let bob: EntityRef = Arc::new(TestEntity::persisted("Person", 2));

        let result = proxy.create_edge([bob], Params::new());

        assert!(matches!(result, Err(QueryError::InvalidAssociation(_))));
        assert!(session.queries().is_empty());
    }

    #[test]
    fn test_create_edge_requires_anchor() {
        let (session, proxy) = setup();
        let bob: EntityRef = Arc::new(TestEntity::persisted("Person", 2));

        let result = proxy
            .association("friends")
            .unwrap()
            .create_edge([bob], Params::new());

        assert!(matches!(result, Err(QueryError::InvalidAssociation(_))));
        assert!(session.queries().is_empty());
    }

    #[test]
    fn test_create_edge_issues_create() {
        let session = Arc::new(MockSession::new());
        let schema = people_schema();
        let ada: EntityRef = Arc::new(TestEntity::persisted("Person", 1));
        let bob: EntityRef = Arc::new(TestEntity::persisted("Person", 2));
        let friends = QueryProxy::for_entity(ada, schema.model("Person"), session.clone())
            .association("friends")
            .unwrap();

        let mut props = Params::new();
        props.insert("since".to_string(), json!(2020));
        let created = friends.create_edge([&bob], props).unwrap();

        assert!(created);
        let query = session.last_query().unwrap();
        assert_eq!(
            query.cypher,
            "MATCH (start), (end) WHERE ID(start) = $start_id AND ID(end) = $end_id \
             CREATE (start)-[rel1:`FRIENDS_WITH` {since: $rel1_since}]->(end)"
        );
        assert_eq!(query.params.get("start_id"), Some(&json!(1)));
        assert_eq!(query.params.get("end_id"), Some(&json!(2)));
        assert_eq!(query.params.get("rel1_since"), Some(&json!(2020)));
    }

    #[test]
    fn test_create_edge_model_mismatch() {
        let session = Arc::new(MockSession::new());
        let schema = people_schema();
        let ada: EntityRef = Arc::new(TestEntity::persisted("Person", 1));
        let acme: EntityRef = Arc::new(TestEntity::persisted("Company", 50));
        let friends = QueryProxy::for_entity(ada, schema.model("Person"), session.clone())
            .association("friends")
            .unwrap();

        let result = friends.create_edge([acme], Params::new());

        assert_eq!(
            result,
            Err(QueryError::ModelMismatch {
                expected: "Person".to_string(),
                found: "Company".to_string(),
            })
        );
        assert!(session.queries().is_empty());
    }

    #[test]
    fn test_create_edge_saves_unsaved_ends() {
        let session = Arc::new(MockSession::new());
        let schema = people_schema();
        let ada = Arc::new(TestEntity::new("Person"));
        let bob = Arc::new(TestEntity::new("Person"));
        let ada_ref: EntityRef = ada.clone();
        let bob_ref: EntityRef = bob.clone();
        let friends = QueryProxy::for_entity(ada_ref, schema.model("Person"), session.clone());
        // Anchor is unsaved, so go through `nested` instead of assembling the parent
        let friends = QueryProxy::nested(
            Arc::new(friends),
            schema.model("Person").association_for("friends").unwrap(),
        );

        friends.create_edge([bob_ref], Params::new()).unwrap();

        assert!(ada.is_persisted());
        assert!(bob.is_persisted());
        assert_eq!(ada.save_count(), 1);
        assert_eq!(bob.save_count(), 1);
    }

    #[test]
    fn test_create_edge_by_id_uses_model_find() {
        let session = Arc::new(MockSession::new());
        let schema = people_schema();
        schema.insert_entity(Arc::new(TestEntity::persisted("Person", 77)));
        let ada: EntityRef = Arc::new(TestEntity::persisted("Person", 1));
        let friends = QueryProxy::for_entity(ada, schema.model("Person"), session.clone())
            .association("friends")
            .unwrap();

        friends.create_edge([77_i64, 78], Params::new()).unwrap();

        // 78 is unknown and skipped
        assert_eq!(session.queries().len(), 1);
        assert_eq!(
            session.last_query().unwrap().params.get("end_id"),
            Some(&json!(77))
        );
    }

    #[test]
    fn test_create_edge_runs_callbacks() {
        let session = Arc::new(MockSession::new());
        let callbacks = Arc::new(RecordingCallbacks::allowing());
        let schema = people_schema();
        schema.set_callbacks("Person", "friends", callbacks.clone());
        let ada: EntityRef = Arc::new(TestEntity::persisted("Person", 1));
        let bob: EntityRef = Arc::new(TestEntity::persisted("Person", 2));
        let carl: EntityRef = Arc::new(TestEntity::persisted("Person", 3));
        let friends = QueryProxy::for_entity(ada, schema.model("Person"), session.clone())
            .association("friends")
            .unwrap();

        assert!(friends.create_edge([bob, carl], Params::new()).unwrap());

        assert_eq!(callbacks.before_calls(), vec![(Some(1), Some(2)), (Some(1), Some(3))]);
        assert_eq!(callbacks.after_calls(), vec![(Some(1), Some(2)), (Some(1), Some(3))]);
        assert_eq!(session.queries().len(), 2);
    }

    #[test]
    fn test_before_callback_halts_creation() {
        let session = Arc::new(MockSession::new());
        let callbacks = Arc::new(RecordingCallbacks::rejecting());
        let schema = people_schema();
        schema.set_callbacks("Person", "friends", callbacks.clone());
        let ada: EntityRef = Arc::new(TestEntity::persisted("Person", 1));
        let bob: EntityRef = Arc::new(TestEntity::persisted("Person", 2));
        let friends = QueryProxy::for_entity(ada, schema.model("Person"), session.clone())
            .association("friends")
            .unwrap();

        assert!(!friends.create_edge([bob], Params::new()).unwrap());

        assert!(session.queries().is_empty());
        assert!(callbacks.after_calls().is_empty());
    }

    #[test]
    fn test_create_edge_needs_relationship_type() {
        let session = Arc::new(MockSession::new());
        let schema = people_schema();
        let ada: EntityRef = Arc::new(TestEntity::persisted("Person", 1));
        let bob: EntityRef = Arc::new(TestEntity::persisted("Person", 2));
        let untyped = QueryProxy::for_entity(ada, schema.model("Person"), session.clone())
            .association("acquaintances")
            .unwrap();

        let result = untyped.create_edge([bob], Params::new());

        assert!(matches!(result, Err(QueryError::InvalidAssociation(_))));
        assert!(session.queries().is_empty());
    }
}
