use formbuilder_server::test_util::*;
use http::{Method, StatusCode};
use serde_json::{json, Map, Value};
use tower::ServiceExt;
use uuid::Uuid;

#[tokio::test]
async fn ping() {
    run_test(|app| async move {
        let response = app.oneshot(request(Method::GET, "/api/ping")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_to_string(response).await, "Pong!");
    })
    .await;
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    run_test(|app| async move {
        let response = app
            .oneshot(request(Method::GET, "/api/submissions/user"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_to_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Authorization header missing");
    })
    .await;
}

#[tokio::test]
async fn malformed_header_is_unauthorized() {
    run_test(|app| async move {
        let response = app
            .oneshot(authed_request(Method::GET, "/api/user/profile", "short"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    })
    .await;
}

#[tokio::test]
async fn foreign_signature_is_unauthorized() {
    run_test(|app| async move {
        let (_, token) = new_user();
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[2] = "c2lnbmVkLWJ5LXNvbWVvbmUtZWxzZQ";
        let forged = parts.join(".");
        let response = app
            .oneshot(authed_request(Method::GET, "/api/admin/users", &forged))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_to_json(response).await;
        assert_eq!(body["message"], "JWT: Invalid signature");
    })
    .await;
}

#[tokio::test]
async fn short_search_query_is_rejected() {
    run_test(|app| async move {
        let response = app
            .oneshot(request(Method::GET, "/api/search?q=a"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_to_json(response).await;
        assert_eq!(body["message"], "Search query must be at least 2 characters long");
    })
    .await;
}

#[tokio::test]
async fn malformed_template_id_is_rejected() {
    run_test(|app| async move {
        let response = app
            .oneshot(request(Method::GET, "/api/templates/not-a-uuid"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    })
    .await;
}

async fn send(app: &axum::Router, request: http::Request<axum::body::Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_to_json(response).await)
}

fn survey(fields: Value) -> Value {
    json!({
        "title": "Team survey",
        "description": "Quarterly check-in",
        "isPublic": true,
        "templateFields": fields,
    })
}

fn values(pairs: &[(&String, Value)]) -> Value {
    let map: Map<String, Value> = pairs
        .iter()
        .map(|(key, value)| ((*key).clone(), value.clone()))
        .collect();
    Value::Object(map)
}

fn field_ids(detail: &Value) -> Vec<String> {
    detail["templateFields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|field| field["id"].as_str().unwrap().to_owned())
        .collect()
}

#[tokio::test]
#[ignore = "needs a PostgreSQL database"]
async fn submission_is_validated_against_template() {
    run_db_test(|app| async move {
        let (_, owner) = new_user();
        let (_, respondent) = new_user();
        let template = survey(json!([
            { "type": "STRING", "title": "Name", "required": true },
            { "type": "INTEGER", "title": "Age" },
            { "type": "CHECKBOX", "title": "Agree", "required": true },
        ]));
        let (status, detail) = send(
            &app,
            json_request(Method::POST, "/api/templates", &owner, &template),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let ids = field_ids(&detail);
        assert_eq!(ids.len(), 3);
        let template_id = detail["id"].as_str().unwrap().to_owned();

        let invalid = json!({
            "templateId": template_id,
            "values": values(&[(&ids[0], json!("")), (&ids[1], json!("twelve")), (&ids[2], json!(false))]),
        });
        let (status, body) = send(
            &app,
            json_request(Method::POST, "/api/submissions", &respondent, &invalid),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"].as_array().unwrap().len(), 3);

        let unknown = json!({
            "templateId": template_id,
            "values": values(&[(&Uuid::new_v4().to_string(), json!("x"))]),
        });
        let (status, _) = send(
            &app,
            json_request(Method::POST, "/api/submissions", &respondent, &unknown),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let valid = json!({
            "templateId": template_id,
            "values": values(&[(&ids[0], json!("Ada")), (&ids[1], json!("36")), (&ids[2], json!(true))]),
        });
        let (status, body) = send(
            &app,
            json_request(Method::POST, "/api/submissions", &respondent, &valid),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Submission created successfully");

        let path = format!("/api/submissions?templateId={template_id}");
        let (status, _) = send(&app, authed_request(Method::GET, &path, &respondent)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, submissions) = send(&app, authed_request(Method::GET, &path, &owner)).await;
        assert_eq!(status, StatusCode::OK);
        let answers = submissions[0]["answers"].as_array().unwrap();
        assert_eq!(answers[0]["value"], "Ada");
        assert_eq!(answers[1]["value"], 36);
    })
    .await;
}

#[tokio::test]
#[ignore = "needs a PostgreSQL database"]
async fn update_keeps_field_identities() {
    run_db_test(|app| async move {
        let (_, owner) = new_user();
        let template = survey(json!([
            { "type": "STRING", "title": "A" },
            { "type": "TEXT", "title": "B" },
            { "type": "CHECKBOX", "title": "C" },
        ]));
        let (_, detail) = send(
            &app,
            json_request(Method::POST, "/api/templates", &owner, &template),
        )
        .await;
        let ids = field_ids(&detail);
        let path = format!("/api/templates/{}", detail["id"].as_str().unwrap());

        let update = survey(json!([
            { "id": ids[2], "type": "CHECKBOX", "title": "C" },
            { "id": ids[0], "type": "STRING", "title": "A2" },
            { "type": "INTEGER", "title": "D" },
        ]));
        let (status, updated) =
            send(&app, json_request(Method::PUT, &path, &owner, &update)).await;
        assert_eq!(status, StatusCode::OK);
        let new_ids = field_ids(&updated);
        assert_eq!(new_ids.len(), 3);
        assert_eq!(new_ids[0], ids[2]);
        assert_eq!(new_ids[1], ids[0]);
        assert!(!ids.contains(&new_ids[2]));
        assert_eq!(updated["templateFields"][1]["title"], "A2");

        let resend = survey(json!([
            { "id": new_ids[0], "type": "CHECKBOX", "title": "C" },
            { "id": new_ids[1], "type": "STRING", "title": "A2" },
            { "id": new_ids[2], "type": "INTEGER", "title": "D" },
        ]));
        let (status, again) = send(&app, json_request(Method::PUT, &path, &owner, &resend)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(field_ids(&again), new_ids);

        let (_, stranger) = new_user();
        let (status, _) = send(&app, json_request(Method::PUT, &path, &stranger, &resend)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    })
    .await;
}

#[tokio::test]
#[ignore = "needs a PostgreSQL database"]
async fn private_template_is_visible_to_grantees_only() {
    run_db_test(|app| async move {
        let (_, owner) = new_user();
        let (grantee_id, grantee) = new_user();
        let (_, stranger) = new_user();
        let (status, _) = send(
            &app,
            authed_request(Method::GET, "/api/user/profile", &grantee),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let mut template = survey(json!([{ "type": "STRING", "title": "Q" }]));
        template["isPublic"] = json!(false);
        template["accessGrants"] = json!([grantee_id]);
        let (status, detail) = send(
            &app,
            json_request(Method::POST, "/api/templates", &owner, &template),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let path = format!("/api/templates/{}", detail["id"].as_str().unwrap());

        let (status, _) = send(&app, authed_request(Method::GET, &path, &grantee)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, authed_request(Method::GET, &path, &stranger)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, request(Method::GET, &path)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    })
    .await;
}

#[tokio::test]
#[ignore = "needs a PostgreSQL database"]
async fn tags_are_case_insensitive() {
    run_db_test(|app| async move {
        let (_, user) = new_user();
        let name = format!("Tag{}", &Uuid::new_v4().simple().to_string()[..8]);
        let (status, created) = send(
            &app,
            json_request(Method::POST, "/api/tags", &user, &json!({ "name": name })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, existing) = send(
            &app,
            json_request(
                Method::POST,
                "/api/tags",
                &user,
                &json!({ "name": name.to_lowercase() }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["id"], existing["id"]);
    })
    .await;
}

#[tokio::test]
#[ignore = "needs a PostgreSQL database"]
async fn dangling_tag_rolls_back_the_whole_update() {
    run_db_test(|app| async move {
        let (_, owner) = new_user();
        let template = survey(json!([
            { "type": "STRING", "title": "A" },
            { "type": "INTEGER", "title": "B" },
        ]));
        let (_, detail) = send(
            &app,
            json_request(Method::POST, "/api/templates", &owner, &template),
        )
        .await;
        let ids = field_ids(&detail);
        let path = format!("/api/templates/{}", detail["id"].as_str().unwrap());

        let mut update = survey(json!([
            { "id": ids[1], "type": "INTEGER", "title": "B2" },
            { "type": "TEXT", "title": "C" },
        ]));
        update["templateTags"] = json!([Uuid::new_v4()]);
        let (status, body) = send(&app, json_request(Method::PUT, &path, &owner, &update)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Referenced tag, topic or user does not exist");

        let (status, after) = send(&app, authed_request(Method::GET, &path, &owner)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(field_ids(&after), ids);
        let fields = after["templateFields"].as_array().unwrap();
        assert_eq!(fields[0]["title"], "A");
        assert_eq!(fields[0]["order"], 0);
        assert_eq!(fields[1]["title"], "B");
        assert_eq!(fields[1]["order"], 1);
    })
    .await;
}

#[tokio::test]
#[ignore = "needs a PostgreSQL database"]
async fn deleted_user_cannot_come_back() {
    run_db_test(|app| async move {
        let (admin_id, admin) = new_user();
        let (member_id, member) = new_user();
        for token in [&admin, &member] {
            let (status, _) =
                send(&app, authed_request(Method::GET, "/api/user/profile", token)).await;
            assert_eq!(status, StatusCode::OK);
        }
        promote_to_admin(admin_id).await;

        let path = format!("/api/admin/users?userId={member_id}");
        let (status, body) = send(&app, authed_request(Method::DELETE, &path, &admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User deleted successfully");

        let (status, body) = send(
            &app,
            authed_request(Method::GET, "/api/user/profile", &member),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Your account no longer exists");

        let (status, _) = send(&app, authed_request(Method::DELETE, &path, &admin)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    })
    .await;
}
