//! Change feed over server-sent events.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use classfete_integration_tests::{TestApp, file_part, png};
use futures::StreamExt;
use reqwest::{Response, StatusCode};
use reqwest::multipart::Form;

/// Read the stream until a `change` event carrying `needle` arrives.
async fn wait_for_change(resp: Response, needle: &str) -> String {
    let mut stream = resp.bytes_stream();
    let mut buffer = String::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(chunk) = stream.next().await {
            buffer.push_str(&String::from_utf8_lossy(&chunk.unwrap()));
            if buffer.contains("event: change") && buffer.contains(needle) {
                return;
            }
        }
    })
    .await
    .expect("change event within timeout");
    buffer
}

#[tokio::test]
async fn test_gallery_insert_is_streamed() {
    let app = TestApp::spawn().await;
    let admin = app.admin("admin@example.com").await;

    let events = app
        .visitor()
        .get(app.url("/api/events/gallery_images"))
        .send()
        .await
        .unwrap();
    assert_eq!(events.status(), StatusCode::OK);
    assert!(
        events.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );

    let form = Form::new().part("file", file_part("a.png", "image/png", png(2, 2)));
    admin.client.post(app.url("/api/uploads")).multipart(form).send().await.unwrap();

    let received = wait_for_change(events, "\"INSERT\"").await;
    assert!(received.contains("\"table\":\"gallery_images\""));
}

#[tokio::test]
async fn test_role_changes_stream_to_admins_only() {
    let app = TestApp::spawn().await;
    let admin = app.admin("admin@example.com").await;
    let alice = app.sign_up("alice@example.com").await;

    let denied = alice
        .client
        .get(app.url("/api/events/user_roles"))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let events = admin
        .client
        .get(app.url("/api/events/user_roles"))
        .send()
        .await
        .unwrap();
    assert_eq!(events.status(), StatusCode::OK);

    admin
        .client
        .post(app.url(&format!("/api/admin/users/{}/toggle-admin", alice.id)))
        .json(&serde_json::json!({ "currently_admin": false }))
        .send()
        .await
        .unwrap();

    let received = wait_for_change(events, &alice.id.to_string()).await;
    assert!(received.contains("\"user_roles\""));
}

#[tokio::test]
async fn test_unknown_table() {
    let app = TestApp::spawn().await;
    let resp = app
        .visitor()
        .get(app.url("/api/events/secrets"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
