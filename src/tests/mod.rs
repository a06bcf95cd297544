//! Integration tests for the awards backend.
//!
//! Each test spins up the full router on an ephemeral port over a scratch
//! database and talks to it over HTTP.

mod admin;
mod auth;

use chrono::{Duration, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::Config;
use crate::{create_router, AppState};

pub const PASSWORD: &str = "correct-horse-battery";
pub const ADMIN_EMAIL: &str = "admin@example.com";

/// A signed-in test user.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub staff_id: String,
}

/// Test fixture for integration tests.
pub struct TestFixture {
    pub client: Client,
    pub base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut config = Config::for_tests(temp_dir.path());
        adjust(&mut config);

        let state = AppState::build(config)
            .await
            .expect("Failed to build app state");
        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .unwrap(),
            base_url: format!("http://{}", addr),
            _temp_dir: temp_dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(token)
    }

    pub fn post(&self, path: &str, token: &str, body: Value) -> RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(token).json(&body)
    }

    pub fn put(&self, path: &str, token: &str, body: Value) -> RequestBuilder {
        self.client.put(self.url(path)).bearer_auth(token).json(&body)
    }

    pub fn delete(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.delete(self.url(path)).bearer_auth(token)
    }

    pub async fn sign_up(&self, name: &str, email: &str) -> Session {
        let resp = self
            .client
            .post(self.url("/api/auth/sign-up"))
            .json(&json!({
                "name": name,
                "email": email,
                "password": PASSWORD,
                "position": "Engineer",
                "department": "Platform"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201, "sign-up failed for {}", email);

        let body: Value = resp.json().await.unwrap();
        Session {
            token: body["data"]["accessToken"].as_str().unwrap().to_string(),
            staff_id: body["data"]["staff"]["id"].as_str().unwrap().to_string(),
        }
    }

    pub async fn admin(&self) -> Session {
        self.sign_up("Ada Admin", ADMIN_EMAIL).await
    }

    /// Create a published category that is taking nominations.
    pub async fn open_category(&self, admin: &Session, title: &str) -> String {
        let resp = self
            .post(
                "/api/admin/categories",
                &admin.token,
                json!({
                    "title": title,
                    "description": "Awarded for outstanding work",
                    "type": "Individual Award",
                    "status": "published",
                    "nominationDeadline": (Utc::now() + Duration::days(7)).to_rfc3339()
                }),
            )
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        data(resp).await["id"].as_str().unwrap().to_string()
    }

    /// Move a category's windows so that voting is open now.
    pub async fn open_voting(&self, admin: &Session, category_id: &str) {
        let resp = self
            .put(
                &format!("/api/admin/categories/{}", category_id),
                &admin.token,
                json!({
                    "nominationDeadline": (Utc::now() - Duration::hours(2)).to_rfc3339(),
                    "votingStart": (Utc::now() - Duration::hours(1)).to_rfc3339(),
                    "votingEnd": (Utc::now() + Duration::days(1)).to_rfc3339()
                }),
            )
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(data(resp).await["phase"], "voting");
    }

    /// Nominate an existing staff member and return the nomination id.
    pub async fn nominate(&self, nominator: &Session, category_id: &str, nominee_id: &str) -> String {
        let resp = self
            .post(
                "/api/nominations",
                &nominator.token,
                json!({
                    "categoryId": category_id,
                    "nomineeId": nominee_id,
                    "reason": "Always goes the extra mile"
                }),
            )
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        data(resp).await["id"].as_str().unwrap().to_string()
    }
}

/// Unwrap the `data` member of a success envelope.
pub async fn data(resp: Response) -> Value {
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true, "unexpected error body: {}", body);
    body["data"].clone()
}

/// Unwrap the `error` member of a failure envelope.
pub async fn error(resp: Response) -> Value {
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    body["error"].clone()
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/does-not-exist"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
