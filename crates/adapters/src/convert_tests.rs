use super::*;
use aether_core::ErrorKind;
use wiremock::matchers::{header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn convert_posts_ndjson_group_and_returns_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("content-type", NDJSON_CONTENT_TYPE))
        .and(header("X-Resource-Type", "Patient"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("id,name\np1,x\n", "text/csv"))
        .expect(1)
        .mount(&server)
        .await;

    let convert = HttpConvert::new(reqwest::Client::new());
    let ndjson = b"{\"resourceType\":\"Patient\",\"id\":\"p1\"}\n".to_vec();
    let out = convert.convert(&server.uri(), "Patient", ndjson).await.unwrap();
    assert_eq!(out, b"id,name\np1,x\n");
}

#[tokio::test]
async fn conversion_errors_classify_by_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let convert = HttpConvert::new(reqwest::Client::new());
    let err = convert.convert(&server.uri(), "Patient", Vec::new()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Transient);
    assert_eq!(err.http_status, Some(500));
}
