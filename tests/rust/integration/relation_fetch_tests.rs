//! Compiling relation builders against the fixture model

use fetchplan::assembly::plan::{DomainResult, Fetch, FetchTiming};
use fetchplan::domain_model::JdbcType;
use fetchplan::mapping::{EntityResultBuilder, MappingError, ResultSetMapping, ScalarResultBuilder};
use fetchplan::result_metadata::ResultSetMetadata;
use test_case::test_case;

use super::fixtures::*;

#[test]
fn test_manager_with_explicit_key_column() {
    let mut mapping = ResultSetMapping::new();
    mapping
        .add_entity("Employee", "e")
        .unwrap()
        .add_relation("manager", "m")
        .unwrap()
        .declare_columns()
        .add_column("mgr_id")
        .unwrap();

    let metadata = employee_metadata(&["mgr_id"]);
    let plan = mapping.compile(&model(), &metadata).unwrap();

    let manager = entity_fetch(root(&plan, "e").find_fetch("manager"));
    assert_eq!(manager.timing, FetchTiming::Immediate);
    assert_eq!(manager.table_alias.as_deref(), Some("m"));
    assert_eq!(manager.key.len(), 1);
    assert_eq!(manager.key[0].column_alias, "mgr_id");
    assert_eq!(manager.key[0].column, "manager_id");
    assert_eq!(manager.key[0].table_alias, "e");
    assert_eq!(manager.key[0].position, 6);

    // The target itself is read from the joined alias.
    assert_eq!(manager.identifier[0].table_alias, "m");
    assert!(plan.positions().contains(&6));
}

#[test]
fn test_nested_associations_default_to_delayed() {
    let mut mapping = ResultSetMapping::new();
    mapping.add_entity("Employee", "e").unwrap();

    let plan = mapping.compile(&model(), &employee_metadata(&[])).unwrap();
    let result = root(&plan, "e");

    let department = entity_fetch(result.find_fetch("department"));
    assert_eq!(department.timing, FetchTiming::Delayed);
    assert_eq!(department.table_alias, None);
    assert_eq!(department.key.len(), 1);
    assert_eq!(department.key[0].column_alias, "dept_id");
    assert!(department.identifier.is_empty());
    assert!(department.fetches.is_empty());

    let reports = collection_fetch(result.find_fetch("reports"));
    assert_eq!(reports.timing, FetchTiming::Delayed);
    assert!(reports.key.is_empty());
    assert!(reports.element.is_none());

    // Attribute fetches keep the model's declaration order.
    let names: Vec<&str> = result.fetches.iter().map(|f| f.name()).collect();
    assert_eq!(
        names,
        vec!["name", "address", "manager", "department", "reports", "nicknames"]
    );
}

#[test]
fn test_child_override_applies_inside_relation_scope() {
    let mut mapping = ResultSetMapping::new();
    mapping
        .add_entity("Employee", "e")
        .unwrap()
        .add_relation("manager", "m")
        .unwrap()
        .add_property_columns("name", &["mgr_name"])
        .unwrap();

    let metadata = employee_metadata(&["mgr_name"]);
    let plan = mapping.compile(&model(), &metadata).unwrap();
    let result = root(&plan, "e");

    let manager = entity_fetch(result.find_fetch("manager"));
    let manager_name = basic_selection(manager.find_fetch("name"));
    assert_eq!(manager_name.column_alias, "mgr_name");
    assert_eq!(manager_name.table_alias, "m");

    // The root keeps its default column.
    assert_eq!(basic_selection(result.find_fetch("name")).column_alias, "name");
    // No columns declared: the key is read under its model column name.
    assert_eq!(manager.key[0].column_alias, "manager_id");
}

#[test]
fn test_only_innermost_scope_is_consulted() {
    let mut mapping = ResultSetMapping::new();
    let employee = mapping.add_entity("Employee", "e").unwrap();
    employee.add_property_columns("name", &["emp_name"]).unwrap();
    employee
        .add_relation("manager", "m")
        .unwrap()
        .add_relation("department", "md")
        .unwrap()
        .add_property_columns("title", &["mgr_dept_title"])
        .unwrap();

    let metadata = employee_metadata(&["emp_name", "mgr_dept_title"]);
    let plan = mapping.compile(&model(), &metadata).unwrap();
    let result = root(&plan, "e");

    assert_eq!(basic_selection(result.find_fetch("name")).column_alias, "emp_name");

    let manager = entity_fetch(result.find_fetch("manager"));
    // The root's override of "name" does not leak into the manager scope.
    assert_eq!(basic_selection(manager.find_fetch("name")).column_alias, "name");

    let department = entity_fetch(manager.find_fetch("department"));
    assert_eq!(department.timing, FetchTiming::Immediate);
    assert_eq!(department.table_alias.as_deref(), Some("md"));
    assert_eq!(department.key[0].table_alias, "m");
    assert_eq!(
        basic_selection(department.find_fetch("title")).column_alias,
        "mgr_dept_title"
    );
    assert_eq!(department.path.to_string(), "e.manager.department");
}

#[test]
fn test_declared_empty_columns_use_standard_generation() {
    let mut mapping = ResultSetMapping::new();
    mapping
        .add_entity("Employee", "e")
        .unwrap()
        .add_relation("manager", "m")
        .unwrap()
        .declare_columns();

    let plan = mapping.compile(&model(), &employee_metadata(&[])).unwrap();
    let manager = entity_fetch(root(&plan, "e").find_fetch("manager"));
    assert_eq!(manager.timing, FetchTiming::Immediate);
    assert_eq!(manager.key[0].column_alias, "manager_id");

    let mut absent = ResultSetMapping::new();
    absent
        .add_entity("Employee", "e")
        .unwrap()
        .add_relation("manager", "m")
        .unwrap();
    assert_ne!(absent.cache_key_form(), mapping.cache_key_form());
}

#[test]
fn test_explicit_columns_on_value_attribute_rejected() {
    let mut mapping = ResultSetMapping::new();
    mapping
        .add_entity("Employee", "e")
        .unwrap()
        .add_relation("name", "n")
        .unwrap()
        .declare_columns();

    let err = mapping.compile(&model(), &employee_metadata(&[])).unwrap_err();
    assert!(
        matches!(err, MappingError::UnsupportedMappingShape { .. }),
        "unexpected error: {:?}",
        err
    );
}

#[test]
fn test_composite_key_binds_positionally() {
    let mut mapping = ResultSetMapping::new();
    mapping
        .add_entity("Order", "o")
        .unwrap()
        .add_relation("customer", "c")
        .unwrap()
        .declare_columns()
        .add_column("fk_a")
        .unwrap()
        .add_column("fk_b")
        .unwrap();

    let metadata = ResultSetMetadata::from_names(&["id", "fk_a", "fk_b", "region", "number", "name"]);
    let plan = mapping.compile(&model(), &metadata).unwrap();

    let customer = entity_fetch(root(&plan, "o").find_fetch("customer"));
    let key: Vec<(&str, &str, usize)> = customer
        .key
        .iter()
        .map(|s| (s.column.as_str(), s.column_alias.as_str(), s.position))
        .collect();
    assert_eq!(
        key,
        vec![("customer_region", "fk_a", 1), ("customer_no", "fk_b", 2)]
    );
    assert_eq!(customer.key[1].jdbc_type, JdbcType::Bigint);
    assert_eq!(customer.identifier.len(), 2);
}

#[test_case(&["fk_a"] ; "too few columns")]
#[test_case(&["fk_a", "fk_b", "fk_c"] ; "too many columns")]
fn test_composite_key_cardinality_mismatch(columns: &[&str]) {
    let mut mapping = ResultSetMapping::new();
    let customer = mapping
        .add_entity("Order", "o")
        .unwrap()
        .add_relation("customer", "c")
        .unwrap()
        .declare_columns();
    for column in columns {
        customer.add_column(column).unwrap();
    }

    let metadata =
        ResultSetMetadata::from_names(&["id", "fk_a", "fk_b", "fk_c", "region", "number", "name"]);
    let err = mapping.compile(&model(), &metadata).unwrap_err();
    assert!(
        matches!(err, MappingError::UnresolvableColumn { .. }),
        "unexpected error: {:?}",
        err
    );
}

#[test]
fn test_entity_builder_describes_target() {
    let mut target = EntityResultBuilder::new("Employee", "m");
    target.add_id_column("mgr_pk");
    target.add_property_columns("name", &["mgr_name"]).unwrap();

    let mut mapping = ResultSetMapping::new();
    mapping
        .add_entity("Employee", "e")
        .unwrap()
        .add_relation("manager", "m")
        .unwrap()
        .declare_columns()
        .add_column("mgr_id")
        .unwrap()
        .set_entity_builder(target);

    let metadata = employee_metadata(&["mgr_id", "mgr_pk", "mgr_name"]);
    let plan = mapping.compile(&model(), &metadata).unwrap();

    let manager = entity_fetch(root(&plan, "e").find_fetch("manager"));
    assert_eq!(manager.key[0].column_alias, "mgr_id");
    assert_eq!(manager.identifier[0].column_alias, "mgr_pk");
    assert_eq!(basic_selection(manager.find_fetch("name")).column_alias, "mgr_name");
}

#[test]
fn test_entity_builder_for_wrong_target_rejected() {
    let mut mapping = ResultSetMapping::new();
    mapping
        .add_entity("Employee", "e")
        .unwrap()
        .add_relation("manager", "m")
        .unwrap()
        .declare_columns()
        .add_column("mgr_id")
        .unwrap()
        .set_entity_builder(EntityResultBuilder::new("Department", "m"));

    let err = mapping
        .compile(&model(), &employee_metadata(&["mgr_id"]))
        .unwrap_err();
    assert!(matches!(err, MappingError::UnsupportedMappingShape { .. }));
}

#[test]
fn test_unknown_names_rejected() {
    let metadata = employee_metadata(&[]);

    let mut unknown_relation = ResultSetMapping::new();
    unknown_relation
        .add_entity("Employee", "e")
        .unwrap()
        .add_relation("boss", "b")
        .unwrap();
    assert!(matches!(
        unknown_relation.compile(&model(), &metadata),
        Err(MappingError::UnknownRelation { .. })
    ));

    let mut unknown_grandchild = ResultSetMapping::new();
    unknown_grandchild
        .add_entity("Employee", "e")
        .unwrap()
        .add_relation("manager", "m")
        .unwrap()
        .add_property_columns("salary", &["mgr_salary"])
        .unwrap();
    assert!(matches!(
        unknown_grandchild.compile(&model(), &metadata),
        Err(MappingError::UnknownRelation { .. })
    ));

    let mut unknown_entity = ResultSetMapping::new();
    unknown_entity.add_entity("Ghost", "g").unwrap();
    assert!(matches!(
        unknown_entity.compile(&model(), &metadata),
        Err(MappingError::UnknownEntity { .. })
    ));
}

#[test]
fn test_missing_raw_column_rejected() {
    let mut mapping = ResultSetMapping::new();
    mapping.add_entity("Employee", "e").unwrap();

    let metadata = ResultSetMetadata::from_names(&["id", "name", "street", "manager_id", "dept_id"]);
    let err = mapping.compile(&model(), &metadata).unwrap_err();
    match err {
        MappingError::UnresolvableColumn { path, .. } => assert_eq!(path, "e.address.city"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_scalar_results_follow_entity_results() {
    let mut mapping = ResultSetMapping::new();
    mapping.add_entity("Employee", "e").unwrap();
    mapping.add_scalar(ScalarResultBuilder::new("total").with_type(JdbcType::Bigint));

    let metadata = employee_metadata(&["TOTAL"]);
    let plan = mapping.compile(&model(), &metadata).unwrap();

    assert_eq!(plan.results().len(), 2);
    match &plan.results()[1] {
        DomainResult::Scalar(scalar) => {
            assert_eq!(scalar.selection.position, 6);
            assert_eq!(scalar.selection.jdbc_type, JdbcType::Bigint);
            assert_eq!(scalar.selection.table_alias, "");
        }
        other => panic!("expected a scalar result, got {:?}", other),
    }
}

#[test]
fn test_declared_empty_columns_keep_child_overrides() {
    let mut mapping = ResultSetMapping::new();
    mapping
        .add_entity("Employee", "e")
        .unwrap()
        .add_relation("manager", "m")
        .unwrap()
        .declare_columns()
        .add_property_columns("name", &["mgr_name"])
        .unwrap()
        .add_relation("department", "md")
        .unwrap()
        .add_property_columns("title", &["mgr_dept_title"])
        .unwrap();

    let metadata = employee_metadata(&["mgr_name", "mgr_dept_title"]);
    let plan = mapping.compile(&model(), &metadata).unwrap();

    let manager = entity_fetch(root(&plan, "e").find_fetch("manager"));
    assert_eq!(manager.timing, FetchTiming::Immediate);
    assert_eq!(manager.key[0].column_alias, "manager_id");

    let manager_name = basic_selection(manager.find_fetch("name"));
    assert_eq!(manager_name.column_alias, "mgr_name");
    assert_eq!(manager_name.table_alias, "m");

    let department = entity_fetch(manager.find_fetch("department"));
    assert_eq!(department.table_alias.as_deref(), Some("md"));
    assert_eq!(
        basic_selection(department.find_fetch("title")).column_alias,
        "mgr_dept_title"
    );
}

#[test]
fn test_relation_children_merge_with_entity_builder() {
    let mut target = EntityResultBuilder::new("Employee", "m");
    target.add_id_column("mgr_pk");

    let mut mapping = ResultSetMapping::new();
    mapping
        .add_entity("Employee", "e")
        .unwrap()
        .add_relation("manager", "m")
        .unwrap()
        .declare_columns()
        .add_column("mgr_id")
        .unwrap()
        .add_property_columns("name", &["mgr_name"])
        .unwrap()
        .set_entity_builder(target);

    let metadata = employee_metadata(&["mgr_id", "mgr_pk", "mgr_name"]);
    let plan = mapping.compile(&model(), &metadata).unwrap();
    let result = root(&plan, "e");

    let manager = entity_fetch(result.find_fetch("manager"));
    assert_eq!(manager.identifier[0].column_alias, "mgr_pk");
    let manager_name = basic_selection(manager.find_fetch("name"));
    assert_eq!(manager_name.column_alias, "mgr_name");
    assert_eq!(manager_name.table_alias, "m");
    assert_eq!(basic_selection(result.find_fetch("name")).column_alias, "name");
}

#[test]
fn test_child_declared_on_relation_and_entity_builder_rejected() {
    let mut target = EntityResultBuilder::new("Employee", "m");
    target.add_property_columns("name", &["mgr_name"]).unwrap();

    let mut mapping = ResultSetMapping::new();
    mapping
        .add_entity("Employee", "e")
        .unwrap()
        .add_relation("manager", "m")
        .unwrap()
        .declare_columns()
        .add_column("mgr_id")
        .unwrap()
        .add_property_columns("name", &["boss_name"])
        .unwrap()
        .set_entity_builder(target);

    let metadata = employee_metadata(&["mgr_id", "mgr_name", "boss_name"]);
    match mapping.compile(&model(), &metadata) {
        Err(MappingError::DuplicateMapping { owner, relation }) => {
            assert_eq!(owner, "e.manager");
            assert_eq!(relation, "name");
        }
        other => panic!("expected a duplicate mapping, got {:?}", other),
    }
}

#[test]
fn test_embedded_relation_children_checked_against_components() {
    let mut valid = ResultSetMapping::new();
    valid
        .add_entity("Employee", "e")
        .unwrap()
        .add_relation("address", "a")
        .unwrap()
        .add_property_columns("city", &["home_city"])
        .unwrap();

    let plan = valid
        .compile(&model(), &employee_metadata(&["home_city"]))
        .unwrap();
    match root(&plan, "e").find_fetch("address") {
        Some(Fetch::Embedded(address)) => {
            let city = address
                .components
                .iter()
                .find(|c| c.name == "city")
                .expect("city component");
            assert_eq!(city.selection.column_alias, "home_city");
        }
        other => panic!("expected an embedded fetch, got {:?}", other),
    }

    let mut unknown = ResultSetMapping::new();
    unknown
        .add_entity("Employee", "e")
        .unwrap()
        .add_relation("address", "a")
        .unwrap()
        .add_property_columns("zipcode", &["zip"])
        .unwrap();
    match unknown.compile(&model(), &employee_metadata(&["zip"])) {
        Err(MappingError::UnknownRelation { relation, .. }) => assert_eq!(relation, "zipcode"),
        other => panic!("expected an unknown relation, got {:?}", other),
    }
}
