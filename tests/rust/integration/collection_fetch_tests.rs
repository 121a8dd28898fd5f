//! Compiling plural attributes

use fetchplan::assembly::plan::{CollectionElementFetch, FetchTiming};
use fetchplan::mapping::{MappingError, ResultSetMapping};

use super::fixtures::*;

#[test]
fn test_entity_collection_resolves_element_children() {
    let mut mapping = ResultSetMapping::new();
    mapping
        .add_entity("Employee", "e")
        .unwrap()
        .add_relation("reports", "r")
        .unwrap()
        .add_property_columns("name", &["report_name"])
        .unwrap();

    let metadata = employee_metadata(&["report_name"]);
    let plan = mapping.compile(&model(), &metadata).unwrap();

    let reports = collection_fetch(root(&plan, "e").find_fetch("reports"));
    assert_eq!(reports.timing, FetchTiming::Immediate);
    assert_eq!(reports.table_alias.as_deref(), Some("r"));
    assert_eq!(reports.key[0].table_alias, "r");
    assert_eq!(reports.key[0].column_alias, "manager_id");
    assert!(reports.index.is_none());

    let element = match &reports.element {
        Some(CollectionElementFetch::Entity(element)) => element,
        other => panic!("expected an entity element, got {:?}", other),
    };
    assert_eq!(element.path.to_string(), "e.reports.element");
    assert_eq!(element.identifier[0].table_alias, "r");
    let name = basic_selection(element.find_fetch("name"));
    assert_eq!(name.column_alias, "report_name");
    assert_eq!(name.table_alias, "r");
}

#[test]
fn test_basic_collection_index_and_element_overrides() {
    let mut mapping = ResultSetMapping::new();
    mapping
        .add_entity("Employee", "e")
        .unwrap()
        .add_relation("nicknames", "n")
        .unwrap()
        .add_property_columns("element", &["nick"])
        .unwrap()
        .add_property_columns("index", &["pos"])
        .unwrap();

    let metadata = employee_metadata(&["employee_id", "pos", "nick"]);
    let plan = mapping.compile(&model(), &metadata).unwrap();

    let nicknames = collection_fetch(root(&plan, "e").find_fetch("nicknames"));
    assert_eq!(nicknames.key[0].column, "employee_id");
    assert_eq!(nicknames.key[0].table_alias, "n");

    let index = nicknames.index.as_ref().expect("indexed collection");
    assert_eq!(index.column, "position");
    assert_eq!(index.column_alias, "pos");

    match &nicknames.element {
        Some(CollectionElementFetch::Basic(element)) => {
            assert_eq!(element.selection.column, "nickname");
            assert_eq!(element.selection.column_alias, "nick");
            assert_eq!(element.path.to_string(), "e.nicknames.element");
        }
        other => panic!("expected a basic element, got {:?}", other),
    }
}

#[test]
fn test_collection_key_columns_bind_in_collection_table() {
    let mut mapping = ResultSetMapping::new();
    mapping
        .add_entity("Employee", "e")
        .unwrap()
        .add_relation("nicknames", "n")
        .unwrap()
        .declare_columns()
        .add_column("owner_ref")
        .unwrap();

    let metadata = employee_metadata(&["owner_ref", "position", "nickname"]);
    let plan = mapping.compile(&model(), &metadata).unwrap();

    let nicknames = collection_fetch(root(&plan, "e").find_fetch("nicknames"));
    assert_eq!(nicknames.key.len(), 1);
    assert_eq!(nicknames.key[0].column_alias, "owner_ref");
    assert_eq!(nicknames.key[0].table_alias, "n");
}

#[test]
fn test_collection_children_must_exist_on_element() {
    let mut mapping = ResultSetMapping::new();
    mapping
        .add_entity("Employee", "e")
        .unwrap()
        .add_relation("reports", "r")
        .unwrap()
        .add_property_columns("salary", &["report_salary"])
        .unwrap();

    let err = mapping
        .compile(&model(), &employee_metadata(&["report_salary"]))
        .unwrap_err();
    assert!(matches!(err, MappingError::UnknownRelation { .. }));
}

#[test]
fn test_property_builder_cannot_map_collection() {
    let mut mapping = ResultSetMapping::new();
    mapping
        .add_entity("Employee", "e")
        .unwrap()
        .add_property_columns("reports", &["report_id"])
        .unwrap();

    let err = mapping
        .compile(&model(), &employee_metadata(&["report_id"]))
        .unwrap_err();
    assert!(matches!(err, MappingError::UnsupportedMappingShape { .. }));
}
