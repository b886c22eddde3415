//! Mock backend routes and test payloads

use super::config::API_KEY;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Token embedded in signed URLs handed out by the mock backend
pub const SIGN_TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.test";

/// Deterministic, non-uniform payload of `len` bytes
pub fn material_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn object_path(bucket: &str, object: &str) -> String {
    format!("/storage/v1/object/sign/{}/{}", bucket, object)
}

/// Answer signing requests for `bucket/object` with a relative signed URL
pub async fn mount_signing(server: &MockServer, bucket: &str, object: &str) {
    Mock::given(method("POST"))
        .and(path(object_path(bucket, object)))
        .and(header("apikey", API_KEY))
        .and(header("authorization", format!("Bearer {}", API_KEY).as_str()))
        .and(body_json(serde_json::json!({ "expiresIn": 3600 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "signedURL": format!("/object/sign/{}/{}?token={}", bucket, object, SIGN_TOKEN)
        })))
        .mount(server)
        .await;
}

/// Refuse signing requests the way the storage API does for missing objects
pub async fn mount_signing_error(server: &MockServer, message: &str) {
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "statusCode": "404",
            "error": "not_found",
            "message": message
        })))
        .mount(server)
        .await;
}

/// Serve `body` at the signed URL of `bucket/object`
pub async fn mount_object(server: &MockServer, bucket: &str, object: &str, body: Vec<u8>) {
    mount_object_response(
        server,
        bucket,
        object,
        ResponseTemplate::new(200).set_body_bytes(body),
    )
    .await;
}

/// Serve an arbitrary response at the signed URL of `bucket/object`
pub async fn mount_object_response(
    server: &MockServer,
    bucket: &str,
    object: &str,
    response: ResponseTemplate,
) {
    Mock::given(method("GET"))
        .and(path(object_path(bucket, object)))
        .and(query_param("token", SIGN_TOKEN))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Serve `body` after `delay`
pub async fn mount_slow_object(
    server: &MockServer,
    bucket: &str,
    object: &str,
    body: Vec<u8>,
    delay: Duration,
) {
    mount_object_response(
        server,
        bucket,
        object,
        ResponseTemplate::new(200)
            .set_body_bytes(body)
            .set_delay(delay),
    )
    .await;
}

/// Expect exactly `times` counter increments for `material_id`
pub async fn mount_counter(server: &MockServer, material_id: &str, status: u16, times: u64) {
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/increment_download_count"))
        .and(header("apikey", API_KEY))
        .and(body_json(serde_json::json!({ "material_id": material_id })))
        .respond_with(ResponseTemplate::new(status))
        .expect(times)
        .mount(server)
        .await;
}
