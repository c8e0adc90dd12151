use super::*;

const VALID_CRTDL: &str = r#"{
  "cohortDefinition": {"inclusionCriteria": [[{"termCodes": [{"code": "diabetes"}]}]]},
  "dataExtraction": {"attributeGroups": [{"groupReference": "Patient", "attributes": []}]}
}"#;

#[test]
fn existing_directory_is_local_dir() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().to_str().unwrap();
    assert_eq!(classify(input).unwrap(), InputType::LocalDir);
}

#[yare::parameterized(
    plain_http   = { "http://files.example/export/", InputType::HttpUrl },
    plain_https  = { "https://files.example/data.ndjson", InputType::HttpUrl },
    torch_status = { "http://torch.example/fhir/__status/abc-123", InputType::TorchUrl },
    torch_https  = { "https://torch.example/fhir/__status/abc-123", InputType::TorchUrl },
)]
fn urls_classify_by_fhir_segment(input: &str, expected: InputType) {
    assert_eq!(classify(input).unwrap(), expected);
}

#[yare::parameterized(
    crtdl_ext = { "cohort.crtdl" },
    json_ext  = { "cohort.json" },
)]
fn valid_crtdl_file_classifies(file_name: &str) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(file_name);
    std::fs::write(&path, VALID_CRTDL).unwrap();

    assert_eq!(classify(path.to_str().unwrap()).unwrap(), InputType::CrtdlFile);
}

#[test]
fn crtdl_file_with_bad_content_fails_with_crtdl_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cohort.json");
    std::fs::write(&path, r#"{"unrelated": true}"#).unwrap();

    assert!(matches!(
        classify(path.to_str().unwrap()),
        Err(ClassifyError::InvalidCrtdl { .. })
    ));
}

#[test]
fn file_with_other_extension_is_unknown() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cohort.txt");
    std::fs::write(&path, VALID_CRTDL).unwrap();

    assert!(matches!(
        classify(path.to_str().unwrap()),
        Err(ClassifyError::UnknownInput { .. })
    ));
}

#[yare::parameterized(
    empty     = { "" },
    missing   = { "/no/such/path" },
    ftp       = { "ftp://files.example/export" },
    word      = { "hello" },
)]
fn everything_else_is_unknown(input: &str) {
    // classify is total: every string yields a type or UnknownInput.
    assert!(matches!(classify(input), Err(ClassifyError::UnknownInput { .. })));
}
