//! Fixture databases for every published schema version.
//!
//! A [`FixtureSet`] turns a version's catalog entry into the generators a
//! [`fixgen_checkout::CheckoutController`] runs at that version's snapshot,
//! and hashes what they wrote into a manifest afterwards.
//!
//! # Modules
//!
//! - [`generator`]: artifact preparation, registration and run submission
//! - [`scenario`]: the individual fixture scenarios
//! - [`catalog`]: version to scenario list and schema level
//! - [`manifest`]: BLAKE3 manifests of written artifacts
//! - [`benchmark`]: timed benchmark databases
//! - [`error`]: [`FixtureError`]

pub mod benchmark;
pub mod catalog;
pub mod error;
pub mod generator;
pub mod manifest;
pub mod scenario;

pub use benchmark::{run_benchmarks, BenchmarkReport, DEFAULT_RUNS};
pub use catalog::{scenarios_for, schema_level, FixtureSet};
pub use error::FixtureError;
pub use generator::DatasetSpec;
pub use manifest::{ArtifactRecord, FixtureManifest};
pub use scenario::Scenario;
