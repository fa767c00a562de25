#[macro_use]
mod common;

use actix_web::http::{header, StatusCode};
use actix_web::test;
use pretty_assertions::assert_eq;
use serde_json::json;
use taskdesk::auth::token::encode_token;
use taskdesk::models::Role;
use uuid::Uuid;

use common::{bearer, call, lazy_pool, token_for};

#[actix_rt::test]
async fn test_missing_token_is_rejected() {
    let app = test_app!(lazy_pool());

    let req = test::TestRequest::get().uri("/api/tasks").to_request();
    let (status, body) = call(&app, req).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Not authorized, no token");
}

#[actix_rt::test]
async fn test_malformed_authorization_header_is_rejected() {
    let app = test_app!(lazy_pool());

    for value in ["Token abc", "Bearer ", "Bearer not.a.jwt"] {
        let req = test::TestRequest::get()
            .uri("/api/auth/profile")
            .insert_header((header::AUTHORIZATION, value))
            .to_request();
        let (status, _) = call(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "header {:?}", value);
    }
}

#[test_log::test(actix_rt::test)]
async fn test_expired_token_is_rejected() {
    let app = test_app!(lazy_pool());
    let token = encode_token(
        common::JWT_SECRET,
        Uuid::new_v4(),
        Role::Admin,
        chrono::Duration::seconds(-60),
    )
    .unwrap();

    let req = test::TestRequest::get()
        .uri("/api/users")
        .insert_header(bearer(&token))
        .to_request();
    let (status, body) = call(&app, req).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("ExpiredSignature"));
}

#[actix_rt::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let app = test_app!(lazy_pool());
    let token = encode_token(
        "some-other-secret",
        Uuid::new_v4(),
        Role::Admin,
        chrono::Duration::days(1),
    )
    .unwrap();

    let req = test::TestRequest::get()
        .uri("/api/users")
        .insert_header(bearer(&token))
        .to_request();
    let (status, _) = call(&app, req).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_member_gets_forbidden_on_admin_routes() {
    let app = test_app!(lazy_pool());
    let token = token_for(Uuid::new_v4(), Role::Member);

    for uri in [
        "/api/users".to_string(),
        format!("/api/users/{}", Uuid::new_v4()),
        "/api/tasks/dashboard-data".to_string(),
        "/api/reports/export/tasks".to_string(),
        "/api/reports/export/users".to_string(),
    ] {
        let req = test::TestRequest::get()
            .uri(&uri)
            .insert_header(bearer(&token))
            .to_request();
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "GET {}", uri);
        assert!(body["error"].as_str().unwrap().starts_with("Not allowed to"));
    }
}

#[actix_rt::test]
async fn test_wrong_invite_token_is_rejected_not_downgraded() {
    let app = test_app!(lazy_pool());

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "name": "Mallory",
            "email": "mallory@example.com",
            "password": "password123",
            "adminInviteToken": "guessed"
        }))
        .to_request();
    let (status, body) = call(&app, req).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Invalid admin invite token");
}

#[actix_rt::test]
async fn test_register_validation_errors_are_bad_requests() {
    let app = test_app!(lazy_pool());

    let invalid = [
        json!({ "name": "", "email": "a@example.com", "password": "password123" }),
        json!({ "name": "Ann", "email": "not-an-email", "password": "password123" }),
        json!({ "name": "Ann", "email": "a@example.com", "password": "123" }),
        json!({ "name": "Ann", "email": "a@example.com" }),
    ];
    for payload in invalid {
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(&payload)
            .to_request();
        let (status, _) = call(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {}", payload);
    }

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{not json")
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

fn multipart_body(boundary: &str, field: &str, file_name: &str, mime: &str) -> Vec<u8> {
    let mut body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
         Content-Type: {mime}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(&[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

fn upload_request(body: Vec<u8>, boundary: &str) -> actix_http::Request {
    test::TestRequest::post()
        .uri("/api/auth/upload-image")
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        ))
        .set_payload(body)
        .to_request()
}

#[actix_rt::test]
async fn test_upload_image_without_token() {
    let app = test_app!(lazy_pool());
    let boundary = "taskdeskboundary";

    let req = upload_request(
        multipart_body(boundary, "image", "my avatar.png", "image/png"),
        boundary,
    );
    let (status, body) = call(&app, req).await;

    assert_eq!(status, StatusCode::OK, "body {}", body);
    let url = body["imageUrl"].as_str().unwrap();
    assert!(url.contains("/uploads/"));
    assert!(url.ends_with("-my_avatar.png"));

    let file_name = url.rsplit('/').next().unwrap();
    assert!(common::upload_dir().join(file_name).exists());
}

#[actix_rt::test]
async fn test_upload_rejects_other_formats_and_missing_files() {
    let app = test_app!(lazy_pool());
    let boundary = "taskdeskboundary";

    let req = upload_request(
        multipart_body(boundary, "image", "anim.gif", "image/gif"),
        boundary,
    );
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = upload_request(
        multipart_body(boundary, "document", "face.png", "image/png"),
        boundary,
    );
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file uploaded");

    let req = test::TestRequest::post()
        .uri("/api/auth/upload-image")
        .set_json(json!({ "image": "inline" }))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// Database-backed flows; skipped unless DATABASE_URL is set.

async fn register(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
    >,
    payload: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&payload)
        .to_request();
    call(app, req).await
}

#[test_log::test(actix_rt::test)]
async fn test_register_login_and_profile_flow() {
    let Some(pool) = common::db_pool().await else {
        return;
    };
    let app = test_app!(pool);
    let email = common::unique_email("flow");

    let (status, registered) = register(
        &app,
        json!({ "name": "Flow User", "email": email, "password": "password123" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "body {}", registered);
    assert_eq!(registered["role"], "member");
    assert_eq!(registered["email"], email);
    assert!(registered["token"].is_string());
    assert!(registered.get("passwordHash").is_none());

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": email.to_uppercase(), "password": "password123" }))
        .to_request();
    let (status, logged_in) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logged_in["_id"], registered["_id"]);
    let token = logged_in["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/api/auth/profile")
        .insert_header(bearer(&token))
        .to_request();
    let (status, profile) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["name"], "Flow User");
    assert!(profile.get("passwordHash").is_none());

    let req = test::TestRequest::put()
        .uri("/api/auth/profile")
        .insert_header(bearer(&token))
        .set_json(json!({ "name": "Renamed User", "password": "newpassword" }))
        .to_request();
    let (status, updated) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Renamed User");
    assert!(updated["token"].is_string());

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": email, "password": "newpassword" }))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_rt::test]
async fn test_profile_update_rejects_taken_email_and_weak_password() {
    let Some(pool) = common::db_pool().await else {
        return;
    };
    let (owner, _) = common::seed_user(&pool, "emailowner", Role::Member).await;
    let (_, token) = common::seed_user(&pool, "emailclaimer", Role::Member).await;
    let app = test_app!(pool);

    let req = test::TestRequest::put()
        .uri("/api/auth/profile")
        .insert_header(bearer(&token))
        .set_json(json!({ "email": owner.email.to_uppercase() }))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email already registered");

    let req = test::TestRequest::put()
        .uri("/api/auth/profile")
        .insert_header(bearer(&token))
        .set_json(json!({ "password": "123" }))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Password must be at least 6 characters long");
}

#[actix_rt::test]
async fn test_duplicate_email_is_case_insensitive() {
    let Some(pool) = common::db_pool().await else {
        return;
    };
    let app = test_app!(pool);
    let email = common::unique_email("dup");

    let (status, _) = register(
        &app,
        json!({ "name": "First", "email": email, "password": "password123" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = register(
        &app,
        json!({ "name": "Second", "email": email.to_uppercase(), "password": "password123" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email already registered");
}

#[actix_rt::test]
async fn test_invite_token_registers_admin() {
    let Some(pool) = common::db_pool().await else {
        return;
    };
    let app = test_app!(pool);

    let (status, body) = register(
        &app,
        json!({
            "name": "Boss",
            "email": common::unique_email("boss"),
            "password": "password123",
            "adminInviteToken": common::INVITE_TOKEN
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "admin");
}

#[actix_rt::test]
async fn test_invalid_credentials_look_identical() {
    let Some(pool) = common::db_pool().await else {
        return;
    };
    let app = test_app!(pool);
    let email = common::unique_email("creds");

    let (status, _) = register(
        &app,
        json!({ "name": "Creds", "email": email, "password": "password123" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": common::unique_email("nobody"), "password": "password123" }))
        .to_request();
    let unknown_email = call(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": email, "password": "wrong-password" }))
        .to_request();
    let wrong_password = call(&app, req).await;

    assert_eq!(unknown_email.0, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email, wrong_password);
}

#[actix_rt::test]
async fn test_admin_can_fetch_single_user() {
    let Some(pool) = common::db_pool().await else {
        return;
    };
    let (_, admin_token) = common::seed_user(&pool, "lookupadmin", Role::Admin).await;
    let (member, _) = common::seed_user(&pool, "lookupmember", Role::Member).await;
    let app = test_app!(pool);

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}", member.id))
        .insert_header(bearer(&admin_token))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["_id"], member.id.to_string());
    assert!(body.get("passwordHash").is_none());

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}", Uuid::new_v4()))
        .insert_header(bearer(&admin_token))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri("/api/users")
        .insert_header(bearer(&admin_token))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let listed = body
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["_id"] == member.id.to_string())
        .expect("member listed");
    assert_eq!(listed["pendingTasks"], 0);
    assert!(body.as_array().unwrap().iter().all(|u| u["role"] == "member"));
}
