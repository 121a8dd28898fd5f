//! Integration tests - Mappings compiled against a YAML domain model
//!
//! These tests drive the public API the way a caller does: build or load a
//! mapping, compile it against raw result metadata and inspect the plan.


mod collection_fetch_tests;
mod legacy_fetch_tests;
mod relation_fetch_tests;
