//! Test doubles for the session and mapping-layer boundaries.
//!
//! Compiled for this crate's tests and, behind the `test-utils` feature, for
//! downstream crates that want to exercise proxies without a graph engine.

pub mod mocks;

pub use mocks::{people_schema, MockSession, RecordingCallbacks, Schema, SchemaModel, TestEntity};
