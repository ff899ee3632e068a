//! Session handling and route gating.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use classfete_integration_tests::{PASSWORD, TestApp};
use classfete_site::backend::Backend;
use reqwest::{StatusCode, header};
use serde_json::Value;

fn location(resp: &reqwest::Response) -> &str {
    resp.headers()[header::LOCATION].to_str().unwrap()
}

#[tokio::test]
async fn test_intro_shown_once_per_session() {
    let app = TestApp::spawn().await;
    let client = app.visitor();

    let first = client.get(app.url("/")).send().await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert!(first.text().await.unwrap().contains("/intro/complete"));

    let done = client.get(app.url("/intro/complete")).send().await.unwrap();
    assert!(done.status().is_redirection());
    assert_eq!(location(&done), "/");

    let home = client.get(app.url("/")).send().await.unwrap().text().await.unwrap();
    assert!(!home.contains("http-equiv=\"refresh\""));
}

#[tokio::test]
async fn test_moderation_page_gating() {
    let app = TestApp::spawn().await;

    let anon = app.visitor().get(app.url("/moderation")).send().await.unwrap();
    assert_eq!(anon.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&anon), "/auth");

    let user = app.sign_up("user@example.com").await;
    let resp = user.client.get(app.url("/moderation")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");

    let admin = app.admin("admin@example.com").await;
    let resp = admin.client.get(app.url("/moderation")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains("user@example.com"));
}

#[tokio::test]
async fn test_admin_api_returns_401_and_403() {
    let app = TestApp::spawn().await;

    let anon = app
        .visitor()
        .get(app.url("/api/moderation/pending"))
        .send()
        .await
        .unwrap();
    assert_eq!(anon.status(), StatusCode::UNAUTHORIZED);
    let body: Value = anon.json().await.unwrap();
    assert!(body["error"].is_string());

    let user = app.sign_up("user@example.com").await;
    for path in ["/api/moderation/pending", "/api/admin/users"] {
        let resp = user.client.get(app.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{path}");
    }
}

#[tokio::test]
async fn test_admin_flag_follows_role_table() {
    let app = TestApp::spawn().await;
    let user = app.sign_up("user@example.com").await;

    let session: Value = user.client.get(app.url("/api/session")).send().await.unwrap().json().await.unwrap();
    assert_eq!(session["is_admin"], false);

    app.backend
        .insert_role(user.id, classfete_core::Role::Admin)
        .await
        .unwrap();
    let session: Value = user.client.get(app.url("/api/session")).send().await.unwrap().json().await.unwrap();
    assert_eq!(session["is_admin"], true);
    assert_eq!(session["user"]["email"], "user@example.com");
    assert!(session["user"].get("access_token").is_none());
}

#[tokio::test]
async fn test_login_errors_and_logout() {
    let app = TestApp::spawn().await;
    app.sign_up("user@example.com").await;

    let client = app.visitor();
    let bad = client
        .post(app.url("/auth/login"))
        .form(&[("email", "user@example.com"), ("password", "wrong-password")])
        .send()
        .await
        .unwrap();
    assert!(location(&bad).starts_with("/auth?"));
    assert!(location(&bad).contains("error="));

    let ok = client
        .post(app.url("/auth/login"))
        .form(&[("email", "user@example.com"), ("password", PASSWORD)])
        .send()
        .await
        .unwrap();
    assert!(location(&ok).starts_with('/'));
    assert!(!location(&ok).contains("error="));

    let signed_in = client.get(app.url("/auth")).send().await.unwrap();
    assert_eq!(location(&signed_in), "/");

    client.post(app.url("/auth/logout")).send().await.unwrap();
    let session: Value = client.get(app.url("/api/session")).send().await.unwrap().json().await.unwrap();
    assert!(session["user"].is_null());
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::spawn().await;
    let client = app.visitor();

    let live = client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(live.status(), StatusCode::OK);
    let ready = client.get(app.url("/health/ready")).send().await.unwrap();
    assert_eq!(ready.status(), StatusCode::OK);

    let resp = client.get(app.url("/health")).send().await.unwrap();
    assert!(resp.headers().contains_key("x-request-id"));
}
