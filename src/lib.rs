//! # paperflow-rs
//!
//! Dispatch-and-reconciliation pipeline for document backlogs.
//!
//! Reads unprocessed rows from a Postgres catalog, joins each against a
//! locally discovered artifact, submits the artifact to a remote async
//! processing service, polls the resulting task to completion under a
//! bounded-attempt retry policy, persists successful payloads, and marks
//! completion back in the catalog so reruns are idempotent.

pub mod artifact;
pub mod catalog;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod failures;
pub mod model;
pub mod remote;
pub mod run;
pub mod sink;
pub mod telemetry;
