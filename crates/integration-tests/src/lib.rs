//! Integration tests for Class Fete.
//!
//! Each test spawns the full site router on an ephemeral port, backed by a
//! fresh [`MemoryBackend`], and talks to it over HTTP with cookie-carrying
//! clients. No external services are needed:
//!
//! ```bash
//! cargo test -p classfete-integration-tests
//! ```

#![allow(clippy::missing_panics_doc, clippy::unwrap_used, clippy::expect_used)]

use std::io::Cursor;
use std::net::SocketAddr;

use classfete_core::{Role, UserId};
use classfete_site::backend::{Backend, BackendClient, MemoryBackend};
use classfete_site::config::SiteConfig;
use classfete_site::{AppState, app};
use reqwest::{Client, redirect};
use serde_json::Value;

pub const PASSWORD: &str = "secret1";

/// A running site.
pub struct TestApp {
    pub addr: SocketAddr,
    pub backend: MemoryBackend,
}

impl TestApp {
    /// Bind on `127.0.0.1:0` and serve in the background.
    pub async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");

        let mut config = SiteConfig::local();
        config.port = addr.port();
        config.base_url = format!("http://{addr}");

        let backend = MemoryBackend::new(&config.base_url, &config.storage_bucket);
        let state = AppState::with_backend(config, BackendClient::Memory(backend.clone()));

        tokio::spawn(async move {
            axum::serve(
                listener,
                app(state).into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("test server");
        });

        Self { addr, backend }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// A visitor with its own cookie jar. Redirects are not followed.
    #[must_use]
    pub fn visitor(&self) -> Client {
        Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .build()
            .expect("build client")
    }

    /// Register `email` through the auth form and return the signed-in client.
    pub async fn sign_up(&self, email: &str) -> TestUser {
        let client = self.visitor();
        let resp = client
            .post(self.url("/auth/register"))
            .form(&[("email", email), ("password", PASSWORD)])
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_redirection(), "register: {}", resp.status());

        let session: Value = client
            .get(self.url("/api/session"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let id: UserId = serde_json::from_value(session["user"]["id"].clone())
            .expect("signed in after register");

        TestUser { client, id }
    }

    /// Register `email` and grant it the admin role.
    pub async fn admin(&self, email: &str) -> TestUser {
        let user = self.sign_up(email).await;
        self.backend.insert_role(user.id, Role::Admin).await.unwrap();
        user
    }

    /// Gallery rows as seen by `client`.
    pub async fn gallery(&self, client: &Client) -> Vec<Value> {
        client
            .get(self.url("/api/gallery"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}

/// A signed-in user.
pub struct TestUser {
    pub client: Client,
    pub id: UserId,
}

/// A small valid PNG.
#[must_use]
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png)
        .expect("encode png");
    bytes.into_inner()
}

/// A multipart file part.
#[must_use]
pub fn file_part(name: &str, content_type: &str, bytes: Vec<u8>) -> reqwest::multipart::Part {
    reqwest::multipart::Part::bytes(bytes)
        .file_name(name.to_owned())
        .mime_str(content_type)
        .expect("valid mime")
}

/// Statuses of `rows`, in order.
#[must_use]
pub fn statuses(rows: &[Value]) -> Vec<&str> {
    rows.iter()
        .filter_map(|row| row["status"].as_str())
        .collect()
}
