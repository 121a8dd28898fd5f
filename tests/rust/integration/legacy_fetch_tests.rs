//! Top-level fetches attached by owner alias

use std::sync::Arc;

use fetchplan::assembly::plan::FetchTiming;
use fetchplan::mapping::{MappingError, ResultSetMapping};
use fetchplan::plan_cache::PlanCache;

use super::fixtures::*;

#[test]
fn test_legacy_fetch_compiles_like_nested_relation() {
    let mut legacy = ResultSetMapping::new();
    legacy.add_entity("Employee", "e").unwrap();
    legacy
        .add_fetch("e", "d", "department")
        .unwrap()
        .add_property_columns("title", &["dept_title"])
        .unwrap();

    let mut nested = ResultSetMapping::new();
    nested
        .add_entity("Employee", "e")
        .unwrap()
        .add_relation("department", "d")
        .unwrap()
        .add_property_columns("title", &["dept_title"])
        .unwrap();

    let metadata = employee_metadata(&["dept_title"]);
    let plan = legacy.compile(&model(), &metadata).unwrap();

    let department = entity_fetch(root(&plan, "e").find_fetch("department"));
    assert_eq!(department.timing, FetchTiming::Immediate);
    assert_eq!(department.table_alias.as_deref(), Some("d"));
    assert_eq!(
        basic_selection(department.find_fetch("title")).column_alias,
        "dept_title"
    );

    assert_eq!(plan, nested.compile(&model(), &metadata).unwrap());
}

#[test]
fn test_legacy_fetch_chain() {
    let mut mapping = ResultSetMapping::new();
    mapping.add_entity("Employee", "e").unwrap();
    // Declared before its owner on purpose.
    mapping
        .add_fetch("m", "md", "department")
        .unwrap()
        .add_property_columns("title", &["mgr_dept_title"])
        .unwrap();
    mapping.add_fetch("e", "m", "manager").unwrap();

    let metadata = employee_metadata(&["mgr_dept_title"]);
    let plan = mapping.compile(&model(), &metadata).unwrap();

    let manager = entity_fetch(root(&plan, "e").find_fetch("manager"));
    let department = entity_fetch(manager.find_fetch("department"));
    assert_eq!(department.table_alias.as_deref(), Some("md"));
    assert_eq!(
        basic_selection(department.find_fetch("title")).column_alias,
        "mgr_dept_title"
    );
}

#[test]
fn test_orphan_legacy_fetch_fails_compilation() {
    let mut mapping = ResultSetMapping::new();
    mapping.add_entity("Employee", "e").unwrap();
    mapping.add_fetch("x", "d", "department").unwrap();

    assert!(matches!(
        mapping.compile(&model(), &employee_metadata(&[])),
        Err(MappingError::UnknownOwnerAlias { .. })
    ));
}

#[test]
fn test_legacy_alias_clashing_with_join_alias() {
    let mut mapping = ResultSetMapping::new();
    mapping
        .add_entity("Employee", "e")
        .unwrap()
        .add_relation("manager", "m")
        .unwrap();
    mapping.add_fetch("e", "m", "department").unwrap();

    match mapping.compile(&model(), &employee_metadata(&[])) {
        Err(MappingError::DuplicateAlias { alias, existing }) => {
            assert_eq!(alias, "m");
            assert_eq!(existing, "e.manager");
        }
        other => panic!("expected a duplicate alias, got {:?}", other),
    }
}

#[test]
fn test_legacy_and_nested_declarations_share_cache_key() {
    let mut legacy = ResultSetMapping::new();
    legacy.add_entity("Employee", "e").unwrap();
    legacy
        .add_fetch("e", "m", "manager")
        .unwrap()
        .add_property_columns("name", &["mgr_name"])
        .unwrap();

    let mut nested = ResultSetMapping::new();
    nested
        .add_entity("Employee", "e")
        .unwrap()
        .add_relation("manager", "m")
        .unwrap()
        .add_property_columns("name", &["mgr_name"])
        .unwrap();

    assert_eq!(legacy.cache_key_form(), nested.cache_key_form());

    let cache = PlanCache::with_defaults();
    let metadata = employee_metadata(&["mgr_name"]);
    let first = cache.get_or_compile(&legacy, &model(), &metadata).unwrap();
    let second = cache.get_or_compile(&nested, &model(), &metadata).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.metrics().hits, 1);

    let mut orphan = ResultSetMapping::new();
    orphan.add_entity("Employee", "e").unwrap();
    orphan.add_fetch("x", "m", "manager").unwrap();
    assert_eq!(orphan.cache_key_form().legacy_fetches.len(), 1);
}
