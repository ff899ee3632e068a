//! Admin role toggling through the API and the dashboard form.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use classfete_integration_tests::TestApp;
use reqwest::StatusCode;
use serde_json::{Value, json};

fn is_admin(users: &[Value], email: &str) -> bool {
    users
        .iter()
        .find(|u| u["email"] == email)
        .and_then(|u| u["is_admin"].as_bool())
        .unwrap()
}

#[tokio::test]
async fn test_toggle_round_trip() {
    let app = TestApp::spawn().await;
    let admin = app.admin("admin@example.com").await;
    let alice = app.sign_up("alice@example.com").await;
    let toggle = app.url(&format!("/api/admin/users/{}/toggle-admin", alice.id));

    let users: Vec<Value> = admin
        .client
        .get(app.url("/api/admin/users"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(users.len(), 2);
    assert!(!is_admin(&users, "alice@example.com"));

    let granted: Vec<Value> = admin
        .client
        .post(&toggle)
        .json(&json!({ "currently_admin": false }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(is_admin(&granted, "alice@example.com"));

    // Alice can use admin endpoints on her next request.
    let resp = alice.client.get(app.url("/api/admin/users")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let revoked: Vec<Value> = admin
        .client
        .post(&toggle)
        .json(&json!({ "currently_admin": true }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(revoked, users);
}

#[tokio::test]
async fn test_non_admin_cannot_toggle() {
    let app = TestApp::spawn().await;
    let alice = app.sign_up("alice@example.com").await;

    let resp = alice
        .client
        .post(app.url(&format!("/api/admin/users/{}/toggle-admin", alice.id)))
        .json(&json!({ "currently_admin": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let session: Value = alice.client.get(app.url("/api/session")).send().await.unwrap().json().await.unwrap();
    assert_eq!(session["is_admin"], false);
}

#[tokio::test]
async fn test_dashboard_role_form() {
    let app = TestApp::spawn().await;
    let admin = app.admin("admin@example.com").await;
    let alice = app.sign_up("alice@example.com").await;
    let user_id = alice.id.to_string();

    let resp = admin
        .client
        .post(app.url("/moderation/roles"))
        .form(&[("user_id", user_id.as_str()), ("currently_admin", "false")])
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_redirection());

    let session: Value = alice.client.get(app.url("/api/session")).send().await.unwrap().json().await.unwrap();
    assert_eq!(session["is_admin"], true);
}
