use super::*;

const VALID_CRTDL: &str = r#"{
  "cohortDefinition": {
    "inclusionCriteria": [[{"termCodes": [{"code": "diabetes"}]}]]
  },
  "dataExtraction": {
    "attributeGroups": [{"groupReference": "Patient", "attributes": []}]
  }
}"#;

#[test]
fn valid_crtdl_passes() {
    validate_bytes(VALID_CRTDL.as_bytes()).unwrap();
}

#[yare::parameterized(
    not_json            = { "{not json", "not valid JSON" },
    no_cohort           = { r#"{"dataExtraction": {"attributeGroups": []}}"#, "cohortDefinition" },
    cohort_not_object   = { r#"{"cohortDefinition": 3, "dataExtraction": {"attributeGroups": []}}"#, "cohortDefinition" },
    no_inclusion        = { r#"{"cohortDefinition": {}, "dataExtraction": {"attributeGroups": []}}"#, "inclusionCriteria" },
    inclusion_not_array = { r#"{"cohortDefinition": {"inclusionCriteria": {}}, "dataExtraction": {"attributeGroups": []}}"#, "inclusionCriteria" },
    no_extraction       = { r#"{"cohortDefinition": {"inclusionCriteria": []}}"#, "dataExtraction" },
    no_groups           = { r#"{"cohortDefinition": {"inclusionCriteria": []}, "dataExtraction": {}}"#, "attributeGroups" },
)]
fn invalid_crtdl_is_rejected(content: &str, expected_in_message: &str) {
    let err = validate_bytes(content.as_bytes()).unwrap_err();
    assert!(
        err.to_string().contains(expected_in_message),
        "error {err} should mention {expected_in_message}"
    );
}

#[test]
fn validate_file_returns_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cohort.crtdl");
    std::fs::write(&path, VALID_CRTDL).unwrap();

    let bytes = validate_file(&path).unwrap();
    assert_eq!(bytes, VALID_CRTDL.as_bytes());
}

#[test]
fn oversized_file_is_rejected_before_parsing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.json");
    let padding = "x".repeat((MAX_CRTDL_BYTES + 1) as usize);
    std::fs::write(&path, padding).unwrap();

    assert!(matches!(validate_file(&path), Err(CrtdlError::TooLarge { .. })));
}
