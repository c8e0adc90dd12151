use super::*;
use aether_core::{DimpConfig, ErrorKind};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn dimp_config(url: &str) -> DimpConfig {
    DimpConfig { url: Some(url.to_string()), ..DimpConfig::default() }
}

#[tokio::test]
async fn de_identify_posts_resource_and_returns_body() {
    let server = MockServer::start().await;
    let input = json!({"resourceType": "Patient", "id": "p1", "name": [{"family": "Müller"}]});
    let output = json!({"resourceType": "Patient", "id": "psn-1"});
    Mock::given(method("POST"))
        .and(path("/$de-identify"))
        .and(body_json(&input))
        .respond_with(ResponseTemplate::new(200).set_body_json(&output))
        .expect(1)
        .mount(&server)
        .await;

    let dimp = HttpDimp::new(reqwest::Client::new());
    let result = dimp.de_identify(&dimp_config(&server.uri()), &input).await.unwrap();
    assert_eq!(result, output);
}

#[tokio::test]
async fn payload_too_large_is_permanent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(413))
        .mount(&server)
        .await;

    let dimp = HttpDimp::new(reqwest::Client::new());
    let err = dimp
        .de_identify(&dimp_config(&server.uri()), &json!({"resourceType": "Bundle"}))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Permanent);
    assert_eq!(err.http_status, Some(413));
}

#[tokio::test]
async fn service_unavailable_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dimp = HttpDimp::new(reqwest::Client::new());
    let err = dimp
        .de_identify(&dimp_config(&server.uri()), &json!({"resourceType": "Patient"}))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Transient);
}

#[tokio::test]
async fn missing_url_is_permanent() {
    let dimp = HttpDimp::new(reqwest::Client::new());
    let err = dimp
        .de_identify(&DimpConfig::default(), &json!({"resourceType": "Patient"}))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Permanent);
}
