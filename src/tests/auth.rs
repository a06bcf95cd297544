use serde_json::json;

use super::{data, error, TestFixture, ADMIN_EMAIL, PASSWORD};

#[tokio::test]
async fn test_session_lifecycle() {
    let fixture = TestFixture::new().await;
    let session = fixture.sign_up("Sam Staff", "sam@example.com").await;

    // Bearer header
    let resp = fixture
        .get("/api/auth/session", &session.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let info = data(resp).await;
    assert_eq!(info["staff"]["email"], "sam@example.com");
    assert_eq!(info["isAdmin"], false);
    assert_eq!(info["method"], "password");
    assert!(info.get("accessToken").is_none());

    // Alternate header
    let resp = fixture
        .client
        .get(fixture.url("/api/auth/session"))
        .header("x-session-token", &session.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/sign-out"))
        .bearer_auth(&session.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .get("/api/auth/session", &session.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert_eq!(error(resp).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_missing_and_tampered_tokens() {
    let fixture = TestFixture::new().await;
    let session = fixture.sign_up("Sam Staff", "sam@example.com").await;

    let resp = fixture
        .client
        .get(fixture.url("/api/my-votes"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let (id, _) = session.token.split_once('.').unwrap();
    let forged = format!("{}.{}", id, "x".repeat(43));
    let resp = fixture.get("/api/my-votes", &forged).send().await.unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_sign_in_with_password() {
    let fixture = TestFixture::new().await;
    fixture.sign_up("Sam Staff", "sam@example.com").await;

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/sign-in"))
        .json(&json!({ "email": "SAM@example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let info = data(resp).await;
    assert!(info["accessToken"].as_str().unwrap().contains('.'));

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/sign-in"))
        .json(&json!({ "email": "sam@example.com", "password": "not-the-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/sign-in"))
        .json(&json!({ "email": "nobody@example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_sign_up_rules() {
    let fixture = TestFixture::with_config(|config| {
        config.allowed_email_domain = Some("example.com".to_string());
    })
    .await;

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/sign-up"))
        .json(&json!({ "name": "Short", "email": "short@example.com", "password": "1234567" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(error(resp).await["code"], "VALIDATION_ERROR");

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/sign-up"))
        .json(&json!({ "name": "Outsider", "email": "out@elsewhere.org", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    fixture.sign_up("Sam Staff", "sam@example.com").await;
    let resp = fixture
        .client
        .post(fixture.url("/api/auth/sign-up"))
        .json(&json!({ "name": "Sam Again", "email": "sam@example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
}

#[tokio::test]
async fn test_admin_email_gets_admin_role() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin().await;

    let resp = fixture
        .get("/api/auth/session", &admin.token)
        .send()
        .await
        .unwrap();
    let info = data(resp).await;
    assert_eq!(info["staff"]["email"], ADMIN_EMAIL);
    assert_eq!(info["staff"]["role"], "admin");
    assert_eq!(info["isAdmin"], true);
}

#[tokio::test]
async fn test_sign_up_cannot_take_over_existing_record() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin().await;

    let resp = fixture
        .post(
            "/api/admin/staff",
            &admin.token,
            json!({ "name": "The Boss", "email": "boss@example.com", "role": "admin" }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let boss_id = data(resp).await["id"].as_str().unwrap().to_string();

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/sign-up"))
        .json(&json!({ "name": "Stranger", "email": "Boss@Example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body = error(resp).await;
    assert_eq!(body["code"], "CONFLICT");

    // No password was attached to the record.
    let resp = fixture
        .client
        .post(fixture.url("/api/auth/sign-in"))
        .json(&json!({ "email": "boss@example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = fixture
        .get(&format!("/api/staff/{}", boss_id), &admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(data(resp).await["name"], "The Boss");
}

#[tokio::test]
async fn test_set_password_after_magic_link() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin().await;

    let resp = fixture
        .post(
            "/api/admin/staff",
            &admin.token,
            json!({ "name": "Nora Nominee", "email": "nora@example.com" }),
        )
        .send()
        .await
        .unwrap();
    let nora_id = data(resp).await["id"].as_str().unwrap().to_string();

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/password"))
        .json(&json!({ "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/magic-link"))
        .json(&json!({ "email": "nora@example.com" }))
        .send()
        .await
        .unwrap();
    let token = data(resp).await["token"].as_str().unwrap().to_string();
    let resp = fixture
        .client
        .post(fixture.url("/api/auth/magic-link/verify"))
        .json(&json!({ "token": token }))
        .send()
        .await
        .unwrap();
    let access_token = data(resp).await["accessToken"].as_str().unwrap().to_string();

    let resp = fixture
        .post("/api/auth/password", &access_token, json!({ "password": "short" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .post("/api/auth/password", &access_token, json!({ "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/sign-in"))
        .json(&json!({ "email": "nora@example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(data(resp).await["staff"]["id"], nora_id.as_str());

    // Changing it again needs the current password.
    let resp = fixture
        .post(
            "/api/auth/password",
            &access_token,
            json!({ "password": "another-long-password" }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = fixture
        .post(
            "/api/auth/password",
            &access_token,
            json!({ "password": "another-long-password", "currentPassword": PASSWORD }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_magic_link_flow() {
    let fixture = TestFixture::new().await;
    let session = fixture.sign_up("Sam Staff", "sam@example.com").await;

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/magic-link"))
        .json(&json!({ "email": "sam@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let link = data(resp).await;
    assert_eq!(link["sent"], true);
    let token = link["token"].as_str().unwrap().to_string();

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/magic-link/verify"))
        .json(&json!({ "token": token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let info = data(resp).await;
    assert_eq!(info["staff"]["id"], session.staff_id.as_str());
    assert_eq!(info["method"], "magic_link");

    // Single use
    let resp = fixture
        .client
        .post(fixture.url("/api/auth/magic-link/verify"))
        .json(&json!({ "token": token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_magic_link_does_not_reveal_accounts() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/magic-link"))
        .json(&json!({ "email": "ghost@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let link = data(resp).await;
    assert_eq!(link["sent"], true);
    assert!(link.get("token").is_none());
}

#[tokio::test]
async fn test_google_sign_in_unconfigured() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/auth/google?next=/vote"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
    assert_eq!(error(resp).await["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_google_sign_in_redirects_with_hosted_domain() {
    let fixture = TestFixture::with_config(|config| {
        config.allowed_email_domain = Some("example.com".to_string());
        config.google = Some(crate::config::GoogleOAuthConfig {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            redirect_url: "http://127.0.0.1:8080/auth/callback".to_string(),
        });
    })
    .await;

    let resp = fixture
        .client
        .get(fixture.url("/api/auth/google?next=/vote"))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_redirection());
    let location = resp.headers()["location"].to_str().unwrap().to_string();
    assert!(location.starts_with("https://accounts.google.com/"));
    assert!(location.contains("hd=example.com"));

    // A callback with an unknown state is refused before any exchange.
    let resp = fixture
        .client
        .get(fixture.url("/auth/callback?code=abc&state=forged"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}
