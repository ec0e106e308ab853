mod support;

use axum::http::StatusCode;
use sea_orm::{DatabaseBackend, MockDatabase};
use serde_json::json;

use projectmgmt_api::{
    auth::{SystemRole, TokenSubject},
    db::entities::user,
    test_helpers::{access_token, empty_router, fixtures, refresh_token_for, test_router},
};

use support::{get, json, send};

fn subject(user: &user::Model) -> TokenSubject {
    TokenSubject {
        user_id: user.id,
        email: user.email.clone(),
        organization_id: None,
        role_id: None,
        permissions: Vec::new(),
    }
}

#[tokio::test]
async fn health_is_public() {
    let (status, body) = send(empty_router(), get("/api/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn me_without_token_is_anonymous() {
    let (status, body) = send(empty_router(), get("/api/auth/me", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["authenticated"], false);
    assert!(body["data"]["user"].is_null());
}

#[tokio::test]
async fn me_with_token_returns_identity() {
    let user = fixtures::user("ada@example.com");
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![user.clone()]])
        .into_connection();
    let token = access_token(&subject(&user));

    let (status, body) = send(test_router(db), get("/api/auth/me", Some(&token))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["authenticated"], true);
    assert_eq!(body["data"]["user"]["email"], "ada@example.com");
}

#[tokio::test]
async fn me_with_garbage_token_falls_back_to_anonymous() {
    let (status, body) = send(empty_router(), get("/api/auth/me", Some("not-a-jwt"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["authenticated"], false);
}

#[tokio::test]
async fn logout_requires_access_token() {
    let (status, body) = send(
        empty_router(),
        json("POST", "/api/auth/logout", None, json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Access token required");
}

#[tokio::test]
async fn refresh_token_cannot_authenticate() {
    let user = fixtures::user("ada@example.com");
    let token = refresh_token_for(&subject(&user));

    let (status, body) = send(empty_router(), get("/api/auth/me", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["authenticated"], false);

    let (status, body) = send(
        empty_router(),
        json("POST", "/api/auth/logout", Some(&token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid or expired token");
}

#[tokio::test]
async fn refresh_rejects_access_token_signature() {
    let user = fixtures::user("ada@example.com");
    let token = access_token(&subject(&user));

    let (status, body) = send(
        empty_router(),
        json(
            "POST",
            "/api/auth/refresh",
            None,
            json!({ "refreshToken": token }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid refresh token");
}

#[tokio::test]
async fn login_validates_before_touching_storage() {
    let (status, body) = send(
        empty_router(),
        json(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "not-an-email", "password": "" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["field"].as_str())
        .collect();
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
}

#[tokio::test]
async fn login_with_malformed_json_gets_envelope() {
    let (status, body) = send(
        empty_router(),
        json("POST", "/api/auth/login", None, json!({ "email": 42 })),
    )
    .await;

    assert!(status.is_client_error());
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn forgot_password_hides_unknown_emails() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<user::Model>::new()])
        .into_connection();

    let (status, body) = send(
        test_router(db),
        json(
            "POST",
            "/api/auth/forgot-password",
            None,
            json!({ "email": "nobody@example.com" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        "If an account with that email exists, we've sent a password reset link."
    );
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn forgot_password_answers_known_and_unknown_emails_alike() {
    let user = fixtures::user("ada@example.com");
    let known = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[user.clone()], [user.clone()], [user]])
        .into_connection();
    let unknown = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<user::Model>::new()])
        .into_connection();

    let request = |email: &str| {
        json(
            "POST",
            "/api/auth/forgot-password",
            None,
            json!({ "email": email }),
        )
    };
    let known = send(test_router(known), request("ada@example.com")).await;
    let unknown = send(test_router(unknown), request("nobody@example.com")).await;

    assert_eq!(known.0, StatusCode::OK);
    assert_eq!(known, unknown);
}

#[tokio::test]
async fn organizations_list_needs_no_working_organization() {
    let user = fixtures::user("ada@example.com");
    let org = fixtures::organization("acme");
    let role = fixtures::role(org.id, SystemRole::TeamMember);
    let membership = fixtures::membership(org.id, user.id, role.id);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![user.clone()]])
        .append_query_results([vec![membership]])
        .append_query_results([vec![org]])
        .append_query_results([vec![role]])
        .into_connection();
    let token = access_token(&subject(&user));

    let (status, body) = send(test_router(db), get("/api/organizations", Some(&token))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["slug"], "acme");
    assert_eq!(body["data"][0]["role"], "team_member");
}

#[tokio::test]
async fn profile_update_reports_field_errors() {
    let user = fixtures::user("ada@example.com");
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![user.clone()]])
        .into_connection();
    let token = access_token(&subject(&user));

    let (status, body) = send(
        test_router(db),
        json(
            "PUT",
            "/api/users/profile",
            Some(&token),
            json!({ "locale": "x" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "locale");
}

#[tokio::test]
#[ignore = "requires Postgres database"]
async fn register_login_refresh_round_trip() {
    use projectmgmt_api::{config::AppConfig, db::connection};

    let cfg = AppConfig::from_env().unwrap();
    let db = connection::connect(cfg.database.as_ref().unwrap()).await.unwrap();
    let app = test_router(db);
    let email = format!("{}@example.com", uuid::Uuid::new_v4());

    let (status, body) = send(
        app.clone(),
        json(
            "POST",
            "/api/auth/register",
            None,
            json!({
                "email": email,
                "password": "Sup3r-secret!",
                "firstName": "Ada",
                "lastName": "Lovelace",
                "organizationName": format!("Org {}", uuid::Uuid::new_v4()),
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let refresh = body["data"]["refreshToken"].as_str().unwrap().to_string();

    let (status, body) = send(
        app.clone(),
        json(
            "POST",
            "/api/auth/refresh",
            None,
            json!({ "refreshToken": refresh }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(body["data"]["refreshToken"].as_str().unwrap(), refresh);

    let (status, _) = send(
        app,
        json(
            "POST",
            "/api/auth/refresh",
            None,
            json!({ "refreshToken": refresh }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
