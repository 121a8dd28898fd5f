//! Unit tests - Builders, cache keys and join resolution in isolation

mod domain_model_tests;
mod fetch_builder_tests;
