use std::sync::Arc;

use axum::{Router, middleware};
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};

use crate::{
    auth::{TokenIssuer, TokenSubject},
    config::{AppConfig, AuthConfig},
    middleware::json_error_middleware,
    routes::router,
    state::AppState,
};

pub const TEST_ACCESS_SECRET: &str = "test-access-secret";
pub const TEST_REFRESH_SECRET: &str = "test-refresh-secret";

/// Fixed timestamp used by fixtures so assertions stay deterministic.
pub fn ts() -> DateTime<FixedOffset> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
        .single()
        .expect("valid fixture timestamp")
        .fixed_offset()
}

pub fn test_config() -> AppConfig {
    AppConfig {
        auth: Some(AuthConfig::with_secrets(
            TEST_ACCESS_SECRET,
            TEST_REFRESH_SECRET,
        )),
        ..AppConfig::default()
    }
}

pub fn test_issuer() -> TokenIssuer {
    TokenIssuer::new(
        TEST_ACCESS_SECRET.as_bytes(),
        TEST_REFRESH_SECRET.as_bytes(),
        900,
        604_800,
    )
}

pub fn test_state(db: DatabaseConnection) -> Arc<AppState> {
    AppState::new(test_config(), db).expect("test state should build")
}

/// Application router with the same error rewriting the server installs.
pub fn test_router(db: DatabaseConnection) -> Router {
    router(test_state(db)).layer(middleware::from_fn(json_error_middleware))
}

pub fn empty_router() -> Router {
    test_router(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
}

/// Signed access token for `subject`, as login would have issued it.
pub fn access_token(subject: &TokenSubject) -> String {
    let issuer = test_issuer();
    issuer
        .encode_access(&issuer.access_claims(subject))
        .expect("access token should encode")
}

pub fn refresh_token_for(subject: &TokenSubject) -> String {
    let issuer = test_issuer();
    issuer
        .encode_refresh(&issuer.refresh_claims(subject))
        .expect("refresh token should encode")
}

pub mod fixtures {
    use chrono::{Duration, Utc};
    use serde_json::json;
    use uuid::Uuid;

    use super::ts;
    use crate::auth::{AuthUser, OrgContext, ProjectRole, SystemRole, TokenSubject, permission_strings};
    use crate::db::dao::role_dao::permissions_json;
    use crate::db::entities::{
        board, board_column, comment, organization, organization_user, project, project_member,
        refresh_token, role, task, task_assignment, user, user_password,
    };

    pub fn user(email: &str) -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            created_at: ts(),
            updated_at: ts(),
            email: email.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            is_active: true,
            email_verified: false,
            avatar_url: None,
            title: None,
            timezone: "UTC".to_string(),
            locale: "en".to_string(),
            last_login_at: None,
            password_reset_token_hash: None,
            password_reset_expires_at: None,
        }
    }

    pub fn password(user_id: Uuid, hash: &str) -> user_password::Model {
        user_password::Model {
            id: Uuid::new_v4(),
            created_at: ts(),
            updated_at: ts(),
            user_id,
            password_hash: hash.to_string(),
        }
    }

    pub fn organization(slug: &str) -> organization::Model {
        organization::Model {
            id: Uuid::new_v4(),
            created_at: ts(),
            updated_at: ts(),
            slug: slug.to_string(),
            name: slug.to_string(),
            description: None,
            logo_url: None,
        }
    }

    pub fn role(organization_id: Uuid, system_role: SystemRole) -> role::Model {
        role::Model {
            id: Uuid::new_v4(),
            created_at: ts(),
            updated_at: ts(),
            organization_id,
            name: system_role.as_str().to_string(),
            description: None,
            permissions: permissions_json(&system_role.permissions()),
            is_system_role: true,
        }
    }

    pub fn membership(
        organization_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> organization_user::Model {
        organization_user::Model {
            id: Uuid::new_v4(),
            created_at: ts(),
            updated_at: ts(),
            organization_id,
            user_id,
            role_id,
            status: organization_user::MembershipStatus::Active.as_str().to_string(),
        }
    }

    pub fn refresh_token(
        token: &str,
        user_id: Uuid,
        organization_id: Option<Uuid>,
    ) -> refresh_token::Model {
        refresh_token::Model {
            id: Uuid::new_v4(),
            created_at: ts(),
            updated_at: ts(),
            token: token.to_string(),
            user_id,
            organization_id,
            expires_at: (Utc::now() + Duration::days(7)).fixed_offset(),
        }
    }

    pub fn project(organization_id: Uuid, name: &str) -> project::Model {
        project::Model {
            id: Uuid::new_v4(),
            created_at: ts(),
            updated_at: ts(),
            organization_id,
            name: name.to_string(),
            slug: name.to_lowercase(),
            description: None,
            status: project::ProjectStatus::Active.as_str().to_string(),
            priority: project::Priority::Medium.as_str().to_string(),
            start_date: None,
            end_date: None,
            budget: None,
            currency: None,
            created_by_id: Uuid::new_v4(),
        }
    }

    pub fn project_member(
        project_id: Uuid,
        user_id: Uuid,
        project_role: ProjectRole,
    ) -> project_member::Model {
        project_member::Model {
            id: Uuid::new_v4(),
            created_at: ts(),
            updated_at: ts(),
            project_id,
            user_id,
            role: project_role.as_str().to_string(),
        }
    }

    pub fn board(project_id: Uuid) -> board::Model {
        board::Model {
            id: Uuid::new_v4(),
            created_at: ts(),
            updated_at: ts(),
            project_id,
            name: "Main Board".to_string(),
            kind: board::KIND_KANBAN.to_string(),
            position: 0,
        }
    }

    pub fn board_column(board_id: Uuid, name: &str, position: i32) -> board_column::Model {
        board_column::Model {
            id: Uuid::new_v4(),
            created_at: ts(),
            updated_at: ts(),
            board_id,
            name: name.to_string(),
            color: None,
            position,
        }
    }

    pub fn task(project_id: Uuid, title: &str, created_by_id: Uuid) -> task::Model {
        task::Model {
            id: Uuid::new_v4(),
            created_at: ts(),
            updated_at: ts(),
            project_id,
            parent_id: None,
            title: title.to_string(),
            description: None,
            status: task::TaskStatus::Todo.as_str().to_string(),
            priority: project::Priority::Medium.as_str().to_string(),
            start_date: None,
            due_date: None,
            estimated_hours: None,
            actual_hours: None,
            tags: json!([]),
            created_by_id,
        }
    }

    pub fn assignment(task_id: Uuid, user_id: Uuid) -> task_assignment::Model {
        task_assignment::Model {
            id: Uuid::new_v4(),
            created_at: ts(),
            updated_at: ts(),
            task_id,
            user_id,
            role: task_assignment::AssignmentRole::Assignee.as_str().to_string(),
        }
    }

    pub fn comment(task_id: Uuid, author_id: Uuid, content: &str) -> comment::Model {
        comment::Model {
            id: Uuid::new_v4(),
            created_at: ts(),
            updated_at: ts(),
            task_id,
            author_id,
            parent_id: None,
            content: content.to_string(),
        }
    }

    /// Token subject for `user` working inside `membership`'s organization.
    pub fn subject(
        user: &user::Model,
        membership: &organization_user::Model,
        permissions: Vec<String>,
    ) -> TokenSubject {
        TokenSubject {
            user_id: user.id,
            email: user.email.clone(),
            organization_id: Some(membership.organization_id),
            role_id: Some(membership.role_id),
            permissions,
        }
    }

    /// Resolved organization context for `user_id` holding `system_role`.
    pub fn org_context(user_id: Uuid, organization_id: Uuid, system_role: SystemRole) -> OrgContext {
        let role = role(organization_id, system_role);
        OrgContext {
            user: AuthUser {
                id: user_id,
                email: "member@example.com".to_string(),
                organization_id: Some(organization_id),
                role_id: Some(role.id),
                permissions: permission_strings(&system_role.permissions()),
            },
            organization_id,
            membership: membership(organization_id, user_id, role.id),
            role_permissions: system_role.permissions(),
        }
    }
}
