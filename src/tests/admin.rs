use serde_json::json;

use super::{data, error, TestFixture};

const PNG_BYTES: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D', b'R',
];

#[tokio::test]
async fn test_department_lifecycle() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin().await;
    let staff = fixture.sign_up("Sam Staff", "sam@example.com").await;

    let resp = fixture
        .post(
            "/api/admin/departments",
            &admin.token,
            json!({ "name": "Platform", "description": "Infrastructure and tooling" }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let department_id = data(resp).await["id"].as_str().unwrap().to_string();

    let resp = fixture
        .post("/api/admin/departments", &admin.token, json!({ "name": "Platform" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // Both signed-up accounts are in Platform.
    let resp = fixture
        .delete(&format!("/api/admin/departments/{}", department_id), &admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let err = error(resp).await;
    assert_eq!(err["code"], "CONFLICT");
    assert_eq!(err["details"]["staff"], 2);

    let resp = fixture
        .put(
            &format!("/api/admin/departments/{}", department_id),
            &admin.token,
            json!({ "name": "Developer Platform" }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(data(resp).await["name"], "Developer Platform");

    let resp = fixture
        .get(&format!("/api/staff/{}", staff.staff_id), &staff.token)
        .send()
        .await
        .unwrap();
    assert_eq!(data(resp).await["department"], "Developer Platform");

    let resp = fixture
        .client
        .get(fixture.url("/api/departments"))
        .send()
        .await
        .unwrap();
    let departments = data(resp).await;
    assert_eq!(departments.as_array().unwrap().len(), 1);

    // Move everyone out, then the department can go.
    for id in [&admin.staff_id, &staff.staff_id] {
        let resp = fixture
            .put(
                &format!("/api/admin/staff/{}", id),
                &admin.token,
                json!({ "department": "Finance" }),
            )
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }
    let resp = fixture
        .delete(&format!("/api/admin/departments/{}", department_id), &admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_staff_management() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin().await;
    let staff = fixture.sign_up("Sam Staff", "sam@example.com").await;

    let resp = fixture
        .put(
            &format!("/api/admin/staff/{}", admin.staff_id),
            &admin.token,
            json!({ "role": "staff" }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .delete(&format!("/api/admin/staff/{}", admin.staff_id), &admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .put(
            &format!("/api/admin/staff/{}", staff.staff_id),
            &admin.token,
            json!({ "role": "admin", "position": "Lead Engineer" }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let updated = data(resp).await;
    assert_eq!(updated["role"], "admin");
    assert_eq!(updated["position"], "Lead Engineer");

    // The promotion applies to the existing session.
    let resp = fixture
        .get("/api/admin/feedback", &staff.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // A referenced staff member cannot be deleted.
    let category_id = fixture.open_category(&admin, "Referenced").await;
    fixture.nominate(&admin, &category_id, &staff.staff_id).await;
    let resp = fixture
        .delete(&format!("/api/admin/staff/{}", staff.staff_id), &admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let resp = fixture
        .post(
            "/api/admin/staff",
            &admin.token,
            json!({ "name": "Temp Worker", "email": "temp@example.com" }),
        )
        .send()
        .await
        .unwrap();
    let temp_id = data(resp).await["id"].as_str().unwrap().to_string();
    let resp = fixture
        .delete(&format!("/api/admin/staff/{}", temp_id), &admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .get("/api/staff/search?q=temp", &admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(data(resp).await["total"], 0);
}

#[tokio::test]
async fn test_profile_update_and_search() {
    let fixture = TestFixture::new().await;
    let staff = fixture.sign_up("Sam Staff", "sam@example.com").await;
    fixture.sign_up("Priya Patel", "priya@example.com").await;

    let resp = fixture
        .put(
            "/api/me",
            &staff.token,
            json!({ "name": "Samira Staff", "position": "Designer", "role": "admin" }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let me = data(resp).await;
    assert_eq!(me["name"], "Samira Staff");
    assert_eq!(me["position"], "Designer");
    assert_eq!(me["role"], "staff");

    let resp = fixture
        .get("/api/staff/search?q=sami", &staff.token)
        .send()
        .await
        .unwrap();
    let found = data(resp).await;
    assert_eq!(found["total"], 1);
    assert_eq!(found["results"][0]["staff"]["id"], staff.staff_id.as_str());

    let resp = fixture
        .get("/api/staff/search?q=designer", &staff.token)
        .send()
        .await
        .unwrap();
    assert_eq!(data(resp).await["total"], 1);

    let resp = fixture.get("/api/staff", &staff.token).send().await.unwrap();
    assert_eq!(data(resp).await.as_array().unwrap().len(), 2);

    let resp = fixture
        .client
        .get(fixture.url("/api/staff"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_search_offset_is_bounded() {
    let fixture = TestFixture::new().await;
    let staff = fixture.sign_up("Sam Staff", "sam@example.com").await;

    for offset in ["18446744073709551615", "100000000000", "1001"] {
        let resp = fixture
            .get(&format!("/api/staff/search?q=sam&offset={}", offset), &staff.token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        assert_eq!(error(resp).await["code"], "VALIDATION_ERROR");
    }

    // The server is still answering.
    let resp = fixture
        .get("/api/staff/search?q=sam&offset=1000", &staff.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(data(resp).await["total"], 0);

    let resp = fixture
        .get("/api/staff/search?q=sam", &staff.token)
        .send()
        .await
        .unwrap();
    assert_eq!(data(resp).await["total"], 1);
}

#[tokio::test]
async fn test_avatar_null_clears_it() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin().await;
    let staff = fixture.sign_up("Sam Staff", "sam@example.com").await;

    let resp = fixture
        .put(
            "/api/me",
            &staff.token,
            json!({ "avatar": "/uploads/avatars/sam.png" }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(data(resp).await["avatar"], "/uploads/avatars/sam.png");

    // Leaving the field out keeps it.
    let resp = fixture
        .put("/api/me", &staff.token, json!({ "position": "Designer" }))
        .send()
        .await
        .unwrap();
    assert_eq!(data(resp).await["avatar"], "/uploads/avatars/sam.png");

    let resp = fixture
        .put("/api/me", &staff.token, json!({ "avatar": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(data(resp).await.get("avatar").map_or(true, |v| v.is_null()));

    fixture
        .put(
            &format!("/api/admin/staff/{}", staff.staff_id),
            &admin.token,
            json!({ "avatar": "/uploads/avatars/other.png" }),
        )
        .send()
        .await
        .unwrap();
    let resp = fixture
        .put(
            &format!("/api/admin/staff/{}", staff.staff_id),
            &admin.token,
            json!({ "avatar": null }),
        )
        .send()
        .await
        .unwrap();
    assert!(data(resp).await.get("avatar").map_or(true, |v| v.is_null()));
}

#[tokio::test]
async fn test_feedback_flow() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin().await;
    let staff = fixture.sign_up("Sam Staff", "sam@example.com").await;

    let resp = fixture
        .client
        .post(fixture.url("/api/feedback"))
        .json(&json!({ "type": "bug", "message": "The vote button is hidden on mobile" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .client
        .post(fixture.url("/api/feedback"))
        .json(&json!({
            "type": "feature",
            "message": "Let us vote from the email",
            "userEmail": "Visitor@Example.com",
            "userName": "Vic"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let anonymous = data(resp).await;
    assert_eq!(anonymous["userEmail"], "visitor@example.com");
    assert!(anonymous["userId"].is_null());
    assert_eq!(anonymous["status"], "new");

    let resp = fixture
        .post(
            "/api/feedback",
            &staff.token,
            json!({ "type": "improvement", "message": "Show my past votes" }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let signed_in = data(resp).await;
    assert_eq!(signed_in["userId"], staff.staff_id.as_str());
    assert_eq!(signed_in["userEmail"], "sam@example.com");
    let feedback_id = signed_in["id"].as_str().unwrap().to_string();

    let resp = fixture
        .put(
            &format!("/api/admin/feedback/{}", feedback_id),
            &admin.token,
            json!({ "status": "resolved" }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(data(resp).await["status"], "resolved");

    let resp = fixture
        .get("/api/admin/feedback?status=resolved", &admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(data(resp).await.as_array().unwrap().len(), 1);

    let resp = fixture
        .get("/api/admin/feedback", &admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(data(resp).await.as_array().unwrap().len(), 2);

    let resp = fixture
        .delete(&format!("/api/admin/feedback/{}", feedback_id), &admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .get("/api/admin/feedback", &staff.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_dashboard_and_analytics() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin().await;
    let staff = fixture.sign_up("Sam Staff", "sam@example.com").await;
    let category_id = fixture.open_category(&admin, "Analytics Award").await;
    fixture.nominate(&admin, &category_id, &staff.staff_id).await;
    fixture.nominate(&staff, &category_id, &staff.staff_id).await;

    fixture
        .post(
            "/api/feedback",
            &staff.token,
            json!({ "type": "other", "message": "Nice portal" }),
        )
        .send()
        .await
        .unwrap();

    let resp = fixture
        .get("/api/admin/dashboard", &admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let dashboard = data(resp).await;
    assert_eq!(dashboard["totals"]["staff"], 2);
    assert_eq!(dashboard["totals"]["categories"], 1);
    assert_eq!(dashboard["totals"]["publishedCategories"], 1);
    assert_eq!(dashboard["totals"]["nominations"], 2);
    assert_eq!(dashboard["totals"]["votes"], 0);
    assert_eq!(dashboard["totals"]["feedback"], 1);
    assert_eq!(dashboard["pendingNominations"], 2);
    assert_eq!(dashboard["recentNominations"].as_array().unwrap().len(), 2);

    let resp = fixture
        .get("/api/admin/analytics", &admin.token)
        .send()
        .await
        .unwrap();
    let analytics = data(resp).await;
    assert_eq!(analytics["topNominated"][0]["nominee"]["id"], staff.staff_id.as_str());
    assert_eq!(analytics["topNominated"][0]["count"], 2);
    assert_eq!(analytics["nominationsByDepartment"][0]["department"], "Platform");
    assert_eq!(analytics["categoryActivity"][0]["nominations"], 2);
    assert_eq!(analytics["participation"]["voters"], 0);
    assert_eq!(analytics["participation"]["percentage"], 0.0);

    let resp = fixture
        .get("/api/admin/analytics", &staff.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_image_uploads() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin().await;
    let staff = fixture.sign_up("Sam Staff", "sam@example.com").await;

    let resp = fixture
        .client
        .put(fixture.url("/api/uploads/staff-avatars"))
        .bearer_auth(&staff.token)
        .header("content-type", "image/png")
        .body(PNG_BYTES.to_vec())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let image = data(resp).await;
    assert_eq!(image["bucket"], "staff-avatars");
    let path = image["path"].as_str().unwrap().to_string();
    assert!(path.ends_with(".png"));
    assert!(image["url"]
        .as_str()
        .unwrap()
        .ends_with(&format!("/storage/staff-avatars/{}", path)));

    let resp = fixture
        .client
        .get(fixture.url(&format!("/storage/staff-avatars/{}", path)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.bytes().await.unwrap().as_ref(), PNG_BYTES);

    // Content that does not match its declared type
    let resp = fixture
        .client
        .put(fixture.url("/api/uploads/staff-avatars"))
        .bearer_auth(&staff.token)
        .header("content-type", "image/png")
        .body(b"not really an image".to_vec())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .client
        .put(fixture.url("/api/uploads/category-images"))
        .bearer_auth(&staff.token)
        .header("content-type", "image/png")
        .body(PNG_BYTES.to_vec())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = fixture
        .client
        .put(fixture.url("/api/uploads/category-images"))
        .bearer_auth(&admin.token)
        .header("content-type", "image/png")
        .body(PNG_BYTES.to_vec())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let resp = fixture
        .client
        .put(fixture.url("/api/uploads/documents"))
        .bearer_auth(&admin.token)
        .header("content-type", "image/png")
        .body(PNG_BYTES.to_vec())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
