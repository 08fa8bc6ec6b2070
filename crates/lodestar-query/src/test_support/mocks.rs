//! Mock implementations for testing
//!
//! - [`MockSession`] records every query and replays queued results
//! - [`Schema`] is an in-memory set of models with associations
//! - [`TestEntity`] is an entity whose `save` assigns a fresh identity
//! - [`RecordingCallbacks`] records edge-creation callbacks
//!
//! ```rust
//! use lodestar_query::test_support::{people_schema, MockSession};
//! use lodestar_query::QueryProxy;
//! use std::sync::Arc;
//!
//! let session = Arc::new(MockSession::new());
//! let people = QueryProxy::new(people_schema().model("Person"), session.clone());
//!
//! people.to_list().unwrap();
//! assert_eq!(session.queries().len(), 1);
//! ```

use crate::association::{Association, AssociationCallbacks, Direction};
use crate::error::{Result, SessionError};
use crate::fragment::RenderedQuery;
use crate::model::{Entity, EntityRef, ModelDescriptor, ModelRef, NodeId};
use crate::session::{QueryResult, Record, Session};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Mock Session
// ============================================================================

#[derive(Debug, Default)]
struct MockSessionState {
    /// Results handed out in order; an empty queue yields an empty result
    results: VecDeque<QueryResult>,
    /// Every query seen, with the proxy context it ran under
    queries: Vec<(RenderedQuery, Option<String>)>,
    /// Error returned by the next `run`
    fail_next: Option<SessionError>,
}

/// Session that records queries instead of talking to an engine.
#[derive(Debug, Clone, Default)]
pub struct MockSession {
    state: Arc<Mutex<MockSessionState>>,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result for a future query
    pub fn push_result(&self, result: QueryResult) {
        self.state.lock().unwrap().results.push_back(result);
    }

    /// Queue a result with one row per value, all under `column`
    pub fn push_rows(&self, column: &str, values: Vec<Value>) {
        let records = values
            .into_iter()
            .map(|value| Record::from_pairs([(column, value)]))
            .collect();
        self.push_result(QueryResult::with_records(records));
    }

    /// Make the next `run` fail with `error`
    pub fn fail_next(&self, error: SessionError) {
        self.state.lock().unwrap().fail_next = Some(error);
    }

    pub fn queries(&self) -> Vec<RenderedQuery> {
        let state = self.state.lock().unwrap();
        state.queries.iter().map(|(query, _)| query.clone()).collect()
    }

    pub fn last_query(&self) -> Option<RenderedQuery> {
        let state = self.state.lock().unwrap();
        state.queries.last().map(|(query, _)| query.clone())
    }

    pub fn contexts(&self) -> Vec<Option<String>> {
        let state = self.state.lock().unwrap();
        state.queries.iter().map(|(_, context)| context.clone()).collect()
    }
}

impl Session for MockSession {
    fn run(&self, query: &RenderedQuery, context: Option<&str>) -> std::result::Result<QueryResult, SessionError> {
        let mut state = self.state.lock().unwrap();
        state
            .queries
            .push((query.clone(), context.map(str::to_string)));

        if let Some(error) = state.fail_next.take() {
            return Err(error);
        }
        Ok(state.results.pop_front().unwrap_or_default())
    }
}

// ============================================================================
// Schema
// ============================================================================

#[derive(Debug, Clone)]
struct AssociationSpec {
    name: String,
    direction: Direction,
    relationship_type: Option<String>,
    target: String,
}

#[derive(Debug, Clone, Default)]
struct ModelSpec {
    associations: Vec<AssociationSpec>,
    /// Names reported as associations that have no descriptor
    phantoms: Vec<String>,
}

#[derive(Default)]
struct SchemaState {
    models: Mutex<HashMap<String, ModelSpec>>,
    entities: Mutex<HashMap<NodeId, EntityRef>>,
    callbacks: Mutex<HashMap<(String, String), Arc<dyn AssociationCallbacks>>>,
}

/// In-memory set of models.
///
/// Cloning shares state, so entities and callbacks added after a model
/// handle was taken are still seen through it.
#[derive(Clone, Default)]
pub struct Schema {
    state: Arc<SchemaState>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(self, label: &str) -> Self {
        self.state
            .models
            .lock()
            .unwrap()
            .entry(label.to_string())
            .or_default();
        self
    }

    /// Declare an association from `label` to `target`
    pub fn associate(
        self,
        label: &str,
        name: &str,
        direction: Direction,
        relationship_type: Option<&str>,
        target: &str,
    ) -> Self {
        self.state
            .models
            .lock()
            .unwrap()
            .entry(label.to_string())
            .or_default()
            .associations
            .push(AssociationSpec {
                name: name.to_string(),
                direction,
                relationship_type: relationship_type.map(str::to_string),
                target: target.to_string(),
            });
        self
    }

    /// Report `name` as an association of `label` without a descriptor
    pub fn phantom(self, label: &str, name: &str) -> Self {
        self.state
            .models
            .lock()
            .unwrap()
            .entry(label.to_string())
            .or_default()
            .phantoms
            .push(name.to_string());
        self
    }

    pub fn model(&self, label: &str) -> ModelRef {
        Arc::new(SchemaModel {
            label: label.to_string(),
            schema: self.state.clone(),
        })
    }

    /// Make `entity` findable through its model
    pub fn insert_entity(&self, entity: EntityRef) {
        if let Some(id) = entity.neo_id() {
            self.state.entities.lock().unwrap().insert(id, entity);
        }
    }

    pub fn set_callbacks(&self, label: &str, association: &str, callbacks: Arc<dyn AssociationCallbacks>) {
        self.state
            .callbacks
            .lock()
            .unwrap()
            .insert((label.to_string(), association.to_string()), callbacks);
    }
}

/// Model handle handed out by [`Schema::model`]
pub struct SchemaModel {
    label: String,
    schema: Arc<SchemaState>,
}

impl ModelDescriptor for SchemaModel {
    fn label(&self) -> &str {
        &self.label
    }

    fn association_for(&self, name: &str) -> Option<Association> {
        let spec = {
            let models = self.schema.models.lock().unwrap();
            models
                .get(&self.label)?
                .associations
                .iter()
                .find(|a| a.name == name)?
                .clone()
        };

        let target: ModelRef = Arc::new(SchemaModel {
            label: spec.target.clone(),
            schema: self.schema.clone(),
        });
        let mut association = Association::new(spec.name, spec.direction).with_target(target);
        if let Some(rel_type) = spec.relationship_type {
            association = association.with_type(rel_type);
        }
        let callbacks = self
            .schema
            .callbacks
            .lock()
            .unwrap()
            .get(&(self.label.clone(), name.to_string()))
            .cloned();
        if let Some(callbacks) = callbacks {
            association = association.with_callbacks(callbacks);
        }
        Some(association)
    }

    fn has_association(&self, name: &str) -> bool {
        let models = self.schema.models.lock().unwrap();
        models.get(&self.label).is_some_and(|spec| {
            spec.associations.iter().any(|a| a.name == name)
                || spec.phantoms.iter().any(|p| p == name)
        })
    }

    fn find(&self, id: NodeId) -> Result<Option<EntityRef>> {
        let entities = self.schema.entities.lock().unwrap();
        Ok(entities
            .get(&id)
            .filter(|entity| entity.model_label() == self.label)
            .cloned())
    }
}

/// Person and Company models used throughout the tests.
///
/// - Person.friends: out FRIENDS_WITH to Person
/// - Person.followers: in FOLLOWS from Person
/// - Person.employer: out WORKS_AT to Company
/// - Person.knows: KNOWS either way to Person
/// - Person.acquaintances: out, untyped, to Person
/// - Company.employees: in WORKS_AT from Person
/// - Broken claims a `ghost` association it cannot describe
pub fn people_schema() -> Schema {
    Schema::new()
        .associate("Person", "friends", Direction::Out, Some("FRIENDS_WITH"), "Person")
        .associate("Person", "followers", Direction::In, Some("FOLLOWS"), "Person")
        .associate("Person", "employer", Direction::Out, Some("WORKS_AT"), "Company")
        .associate("Person", "knows", Direction::Both, Some("KNOWS"), "Person")
        .associate("Person", "acquaintances", Direction::Out, None, "Person")
        .associate("Company", "employees", Direction::In, Some("WORKS_AT"), "Person")
        .define("Broken")
        .phantom("Broken", "ghost")
}

// ============================================================================
// Entities and callbacks
// ============================================================================

static NEXT_ID: AtomicI64 = AtomicI64::new(10_000);

/// Entity whose identity is assigned on first save.
#[derive(Debug)]
pub struct TestEntity {
    label: String,
    id: Mutex<Option<NodeId>>,
    saves: AtomicUsize,
}

impl TestEntity {
    /// Unsaved entity
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            id: Mutex::new(None),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn persisted(label: &str, id: NodeId) -> Self {
        Self {
            label: label.to_string(),
            id: Mutex::new(Some(id)),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl Entity for TestEntity {
    fn neo_id(&self) -> Option<NodeId> {
        *self.id.lock().unwrap()
    }

    fn save(&self) -> Result<NodeId> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        let mut id = self.id.lock().unwrap();
        Ok(*id.get_or_insert_with(|| NEXT_ID.fetch_add(1, Ordering::SeqCst)))
    }

    fn model_label(&self) -> &str {
        &self.label
    }
}

type CallPair = (Option<NodeId>, Option<NodeId>);

/// Callbacks that record `(from, to)` identities of every call.
#[derive(Debug, Default)]
pub struct RecordingCallbacks {
    allow: bool,
    before: Mutex<Vec<CallPair>>,
    after: Mutex<Vec<CallPair>>,
}

impl RecordingCallbacks {
    pub fn allowing() -> Self {
        Self {
            allow: true,
            ..Self::default()
        }
    }

    /// Before-create always returns `false`
    pub fn rejecting() -> Self {
        Self::default()
    }

    pub fn before_calls(&self) -> Vec<CallPair> {
        self.before.lock().unwrap().clone()
    }

    pub fn after_calls(&self) -> Vec<CallPair> {
        self.after.lock().unwrap().clone()
    }
}

impl AssociationCallbacks for RecordingCallbacks {
    fn before_create(&self, from: &dyn Entity, to: &dyn Entity) -> bool {
        self.before.lock().unwrap().push((from.neo_id(), to.neo_id()));
        self.allow
    }

    fn after_create(&self, from: &dyn Entity, to: &dyn Entity) {
        self.after.lock().unwrap().push((from.neo_id(), to.neo_id()));
    }
}
