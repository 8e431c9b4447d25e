use std::fs;

use stringdex_cli::validation::{
    ValidationContext, validate_context, validate_file_path, validate_input_path,
    validate_search_pattern,
};
use tempfile::TempDir;

#[test]
fn test_validate_file_path_exists() {
    let temp_dir = TempDir::new().unwrap();
    let test_file = temp_dir.path().join("Localizable.strings");
    fs::write(&test_file, "\"a\" = \"b\";").unwrap();

    assert!(validate_file_path(test_file.to_str().unwrap()).is_ok());
}

#[test]
fn test_validate_file_path_directory() {
    let temp_dir = TempDir::new().unwrap();
    let error = validate_file_path(temp_dir.path().to_str().unwrap()).unwrap_err();
    assert!(error.contains("Path is not a file"));
}

#[test]
fn test_validate_input_path_accepts_directories() {
    let temp_dir = TempDir::new().unwrap();
    assert!(validate_input_path(temp_dir.path().to_str().unwrap()).is_ok());
    assert!(validate_input_path("").is_err());
    assert!(
        validate_input_path("nonexistent_dir/Foo.app")
            .unwrap_err()
            .contains("Path does not exist")
    );
}

#[test]
fn test_validate_search_pattern() {
    assert!(validate_search_pattern("Update s%").is_ok());
    assert!(validate_search_pattern("").is_err());
}

#[test]
fn test_validate_context_reports_first_failure() {
    let temp_dir = TempDir::new().unwrap();
    let context = ValidationContext::new()
        .with_input_path(temp_dir.path().to_str().unwrap().to_string())
        .with_input_path("missing/Thing.app".to_string());

    let error = validate_context(&context).unwrap_err();
    assert!(error.starts_with("Input path 2 validation failed"), "{}", error);
}

#[test]
fn test_validate_context_language_prefixes() {
    let ok = ValidationContext::new()
        .with_search_pattern("OK".to_string())
        .with_language_prefix("de".to_string())
        .with_language_prefix("German".to_string());
    assert!(validate_context(&ok).is_ok());

    let bad = ValidationContext::new()
        .with_search_pattern("OK".to_string())
        .with_language_prefix("d e".to_string());
    assert!(
        validate_context(&bad)
            .unwrap_err()
            .contains("Language prefix validation failed")
    );
}
