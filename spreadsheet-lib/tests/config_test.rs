//! Validators built from JSON configuration documents.

use spreadsheet_lib::{AutoDecoder, ConfigError, SpreadsheetValidator, ValidationConfig};
use tempfile::TempDir;

mod common;

const PRODUCTS_CONFIG: &str = r#"{
    "field_name": "catalogue",
    "max_rows": 3,
    "rules": {
        "sku": [
            "required",
            {"rule": "schema", "schema": {"type": "string", "pattern": "^[A-Z]{3}-[0-9]{3}$"}},
            "distinct"
        ],
        "price": "required|numeric|min:0",
        "stock": ["nullable", "integer", "between:0,1000"]
    },
    "attributes": {"sku": "SKU", "price": "Price (EUR)"},
    "messages": {"sku.distinct": "The :attribute was listed twice."}
}"#;

fn products_validator() -> SpreadsheetValidator {
    let config = ValidationConfig::from_json(PRODUCTS_CONFIG).unwrap();
    SpreadsheetValidator::from_config(config).unwrap()
}

#[test]
fn test_config_builds_a_validator_with_its_constraints() {
    let validator = products_validator();
    let constraints = validator.constraints();
    assert_eq!(constraints.field_name, "catalogue");
    assert_eq!(constraints.min_rows, 1);
    assert_eq!(constraints.max_rows, 3);
    assert_eq!(constraints.data_row_start_index, 2);

    let attributes: Vec<&str> = validator.catalog().iter().map(|(name, _)| name).collect();
    assert_eq!(attributes, vec!["sku", "price", "stock"]);
}

#[test]
fn test_config_dataset_passes() {
    let dir = TempDir::new().unwrap();
    let upload = common::csv_upload(
        dir.path(),
        "products.csv",
        &[
            "SKU,Price (EUR),stock",
            "ABC-001,9.99,10",
            "ABC-002,0,",
        ],
    );

    let rows = products_validator().validate(&upload, &AutoDecoder).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["price"], serde_json::json!("0"));
}

#[test]
fn test_config_schema_rule_reports_the_cell() {
    let dir = TempDir::new().unwrap();
    let upload = common::csv_upload(
        dir.path(),
        "products.csv",
        &["SKU,Price (EUR),stock", "abc-1,9.99,10"],
    );

    let failure = products_validator()
        .validate(&upload, &AutoDecoder)
        .unwrap_err();
    let messages = failure.report().get("sku").unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("The SKU @ A2 is invalid: "));
}

#[test]
fn test_config_custom_distinct_message() {
    let dir = TempDir::new().unwrap();
    let upload = common::csv_upload(
        dir.path(),
        "products.csv",
        &[
            "SKU,Price (EUR),stock",
            "ABC-001,9.99,10",
            "ABC-001,4.50,3",
        ],
    );

    let failure = products_validator()
        .validate(&upload, &AutoDecoder)
        .unwrap_err();
    assert_eq!(
        failure.report().get("sku").unwrap(),
        &["The SKU @ A3 was listed twice.".to_string()]
    );
}

#[test]
fn test_config_numeric_bounds() {
    let dir = TempDir::new().unwrap();
    let upload = common::csv_upload(
        dir.path(),
        "products.csv",
        &["SKU,Price (EUR),stock", "ABC-001,9.99,5000"],
    );

    let failure = products_validator()
        .validate(&upload, &AutoDecoder)
        .unwrap_err();
    assert_eq!(
        failure.report().get("stock").unwrap(),
        &["The stock @ C2 must be between 0 and 1000.".to_string()]
    );
}

#[test]
fn test_config_max_rows_is_keyed_by_field_name() {
    let dir = TempDir::new().unwrap();
    let upload = common::csv_upload(
        dir.path(),
        "products.csv",
        &[
            "SKU,Price (EUR),stock",
            "ABC-001,1,1",
            "ABC-002,1,1",
            "ABC-003,1,1",
            "ABC-004,1,1",
        ],
    );

    let failure = products_validator()
        .validate(&upload, &AutoDecoder)
        .unwrap_err();
    assert_eq!(
        failure.report().get("catalogue").unwrap(),
        &["The catalogue allows up to 3 rows except the header row".to_string()]
    );
}

#[test]
fn test_config_rejects_unknown_rules() {
    let config = ValidationConfig::from_json(r#"{"rules": {"sku": ["required", "uppercase"]}}"#)
        .unwrap();
    assert!(matches!(
        SpreadsheetValidator::from_config(config),
        Err(ConfigError::InvalidRule { .. })
    ));
}

#[test]
fn test_config_rejects_start_index_below_two() {
    let config = ValidationConfig::from_json(r#"{"data_row_start_index": 1, "rules": {"sku": "required"}}"#)
        .unwrap();
    assert!(matches!(
        SpreadsheetValidator::from_config(config),
        Err(ConfigError::DataRowStartIndex(1))
    ));
}

#[test]
fn test_config_from_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("products.json");
    std::fs::write(&path, PRODUCTS_CONFIG).unwrap();

    let config = ValidationConfig::from_path(&path).unwrap();
    assert_eq!(config.field_name, "catalogue");
    assert!(ValidationConfig::from_path(&dir.path().join("missing.json")).is_err());
}
