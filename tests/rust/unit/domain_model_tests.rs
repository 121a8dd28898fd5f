//! Domain model loading and validation

use fetchplan::domain_model::errors::DomainModelError;
use fetchplan::domain_model::{DomainModel, DomainModelLookup, JdbcType, RelationKind};
use test_case::test_case;

const EMPLOYEE: &str = r#"
entities:
  - name: Employee
    table: employees
    identifier:
      columns: [{ column: id, type: bigint }]
    attributes:
      - name: manager
        kind: to_one
        target: Employee
        key: [{ column: manager_id, type: bigint }]
"#;

#[test]
fn test_tables_default_to_owner() {
    let model = DomainModel::from_yaml_str(EMPLOYEE).unwrap();
    let employee = model.find_entity("Employee").unwrap();
    assert_eq!(employee.identifier.name, "id");
    assert_eq!(employee.identifier.columns[0].table, "employees");

    match &employee.find_attribute("manager").unwrap().kind {
        RelationKind::ToOne { key, .. } => {
            assert_eq!(key.parts[0].table, "employees");
            assert_eq!(key.parts[0].jdbc_type, JdbcType::Bigint);
        }
        other => panic!("unexpected kind {:?}", other),
    }
    assert!(model.find_entity("Department").is_none());
}

#[test_case(
    "entities:\n  - name: A\n    table: a\n    identifier: { columns: [] }\n"
    ; "identifier without columns"
)]
#[test_case(
    "entities:\n  - name: A\n    table: a\n    identifier: { columns: [{ column: id }] }\n    attributes:\n      - { name: b, kind: to_one, target: B, key: [{ column: b_id }] }\n"
    ; "unknown target"
)]
#[test_case(
    "entities:\n  - name: A\n    table: a\n    identifier: { columns: [{ column: id }] }\n  - name: A\n    table: a2\n    identifier: { columns: [{ column: id }] }\n"
    ; "duplicate entity"
)]
#[test_case(
    "entities:\n  - name: A\n    table: a\n    identifier: { columns: [{ column: id }] }\n    attributes:\n      - { name: x, kind: basic, column: { column: x } }\n      - { name: x, kind: basic, column: { column: x2 } }\n"
    ; "duplicate attribute"
)]
#[test_case(
    "entities:\n  - name: A\n    table: a\n    identifier: { columns: [{ column: id }] }\n    attributes:\n      - { name: tags, kind: plural, key: [{ column: a_id }], element: { basic: { column: tag } } }\n"
    ; "basic collection without table"
)]
fn test_invalid_models_rejected(yaml: &str) {
    let err = DomainModel::from_yaml_str(yaml).unwrap_err();
    assert!(
        !matches!(
            err,
            DomainModelError::ConfigParseError { .. } | DomainModelError::ConfigReadError { .. }
        ),
        "expected a validation error, got {:?}",
        err
    );
}

#[test]
fn test_unparseable_model() {
    assert!(matches!(
        DomainModel::from_yaml_str("entities: [ { name: A } ]"),
        Err(DomainModelError::ConfigParseError { .. })
    ));
}

#[test_case("bigint", JdbcType::Bigint)]
#[test_case("VARCHAR", JdbcType::Varchar)]
#[test_case("int", JdbcType::Integer)]
fn test_column_type_names(name: &str, expected: JdbcType) {
    assert_eq!(name.parse::<JdbcType>().unwrap(), expected);
}
