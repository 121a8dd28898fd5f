//! Builder construction rules

use fetchplan::mapping::{
    EntityResultBuilder, FetchBuilder, MappingError, PropertyFetchBuilder, RelationFetchBuilder,
};

#[test]
fn test_add_column_requires_explicit_mode() {
    let mut manager = RelationFetchBuilder::new("e", "m", "manager");
    assert_eq!(
        manager.add_column("mgr_id").unwrap_err(),
        MappingError::InvalidMappingState {
            relation: "manager".to_string(),
            column: "mgr_id".to_string(),
        }
    );
    assert_eq!(manager.column_aliases(), None);

    manager.declare_columns();
    assert_eq!(manager.column_aliases(), Some(&[][..]));
    manager.add_column("mgr_id").unwrap();
    assert_eq!(manager.column_aliases(), Some(&["mgr_id".to_string()][..]));
    assert_eq!(
        manager.cache_key_form().columns,
        Some(vec!["mgr_id".to_string()])
    );
}

#[test]
fn test_declare_columns_keeps_existing_columns() {
    let mut manager = RelationFetchBuilder::with_columns("e", "m", "manager", &["mgr_id"]);
    manager.declare_columns();
    assert_eq!(manager.column_aliases(), Some(&["mgr_id".to_string()][..]));
}

#[test]
fn test_duplicate_child_rejected() {
    let mut root = EntityResultBuilder::new("Employee", "e");
    root.add_relation("manager", "m").unwrap();

    assert_eq!(
        root.add_relation("manager", "m2").unwrap_err(),
        MappingError::DuplicateMapping {
            owner: "e".to_string(),
            relation: "manager".to_string(),
        }
    );
    assert!(matches!(
        root.add_property("manager"),
        Err(MappingError::DuplicateMapping { .. })
    ));

    let mut manager = RelationFetchBuilder::new("e", "m", "manager");
    manager.add_property("name").unwrap();
    assert!(matches!(
        manager.add_child("name", PropertyFetchBuilder::new("name").into()),
        Err(MappingError::DuplicateMapping { .. })
    ));
}

#[test]
fn test_replace_child_is_explicit() {
    let mut root = EntityResultBuilder::new("Employee", "e");
    root.add_property_columns("name", &["emp_name"]).unwrap();

    let previous = root.replace_child(
        "name",
        PropertyFetchBuilder::with_columns("name", &["full_name"]).into(),
    );
    assert!(matches!(previous, Some(FetchBuilder::PropertyPath(_))));
    match root.find_child("name") {
        Some(FetchBuilder::PropertyPath(property)) => {
            assert_eq!(property.column_aliases(), &["full_name".to_string()])
        }
        other => panic!("unexpected child {:?}", other),
    }
}

#[test]
fn test_nested_relations_are_owned_by_parent_alias() {
    let mut root = EntityResultBuilder::new("Employee", "e");
    let department = root
        .add_relation("manager", "m")
        .unwrap()
        .add_relation("department", "md")
        .unwrap();
    assert_eq!(department.owner_alias(), "m");
    assert_eq!(department.table_alias(), "md");

    let mut seen = Vec::new();
    root.visit_children(|name, _| seen.push(name.to_string()));
    assert_eq!(seen, vec!["manager".to_string()]);
}
