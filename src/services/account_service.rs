use chrono::{Duration, Utc};
use sea_orm::{Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{
        SystemRole, TokenError, TokenIssuer, TokenPair, TokenSubject,
        password::{
            generate_reset_token, hash_password, hash_token, password_strength_errors,
            verify_password,
        },
        permission_strings,
    },
    db::dao::{
        DaoBase, DaoContext, DaoLayerError, MembershipDao, OrganizationDao, RefreshTokenDao,
        RoleDao, UserDao, UserPasswordDao, user_dao::NewUser,
    },
    db::entities::{organization, user},
    error::{AppError, FieldError, validate_with},
    services::{
        organization_service::{OrganizationService, OrganizationSummary},
        slug::sanitize_slug,
        user_service::UserView,
    },
};

pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const ACCOUNT_INACTIVE: &str = "Account is inactive";
pub const NO_ACTIVE_ORGANIZATION: &str = "No active organization found";
pub const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";
pub const EXPIRED_REFRESH_TOKEN: &str = "Invalid or expired refresh token";
pub const ACCESS_REVOKED: &str = "User not found or access revoked";
pub const INVALID_RESET_TOKEN: &str = "Invalid or expired reset token";
pub const WRONG_CURRENT_PASSWORD: &str = "Current password is incorrect";

const ADMIN_ROLE_DESCRIPTION: &str = "Full access to organization";

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(rename = "firstName")]
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[serde(rename = "lastName")]
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
    pub password: String,
    #[serde(rename = "organizationName")]
    #[validate(length(min = 1, message = "Organization name is required"))]
    pub organization_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    /// Working organization to log into; falls back to the earliest joined.
    #[serde(rename = "organizationId", default)]
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[serde(rename = "refreshToken")]
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Reset token is required"))]
    pub token: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[serde(rename = "currentPassword")]
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserView,
    pub organizations: Vec<OrganizationSummary>,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Credential flows: registration, sessions and password lifecycle.
pub struct AccountService<'a> {
    daos: DaoContext,
    tokens: &'a TokenIssuer,
    reset_ttl: Duration,
}

impl<'a> AccountService<'a> {
    pub fn new(daos: DaoContext, tokens: &'a TokenIssuer, reset_ttl: Duration) -> Self {
        Self {
            daos,
            tokens,
            reset_ttl,
        }
    }

    /// Creates a workspace: organization, its first user, that user's
    /// password and admin role, and the active membership tying them
    /// together. All five rows commit or none do.
    pub async fn register(&self, body: RegisterRequest) -> Result<AuthResponse, AppError> {
        let slug = sanitize_slug(&body.organization_name);
        let mut extra = password_strength_errors("password", &body.password);
        if !body.organization_name.is_empty() && slug.is_empty() {
            extra.push(FieldError::new(
                "organizationName",
                "Invalid organization name",
            ));
        }
        validate_with(&body, extra)?;

        let email = normalize_email(&body.email);
        if self.daos.user().find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("Email address already exists"));
        }
        if self.daos.organization().find_by_slug(&slug).await?.is_some() {
            return Err(AppError::conflict("Organization name already taken"));
        }

        let password_hash = hash_password(&body.password)?;
        let org_name = body.organization_name.trim().to_string();

        let txn = self.daos.db().begin().await?;
        let organization = OrganizationDao::create_with(
            &txn,
            organization::ActiveModel {
                slug: Set(slug),
                name: Set(org_name.clone()),
                description: Set(Some(format!("{org_name} workspace"))),
                logo_url: Set(None),
                ..Default::default()
            },
        )
        .await?;
        let user = UserDao::create_with(
            &txn,
            user::ActiveModel::from(NewUser {
                email,
                first_name: body.first_name.trim().to_string(),
                last_name: body.last_name.trim().to_string(),
            }),
        )
        .await?;
        UserPasswordDao::create_for_user_with(&txn, user.id, password_hash).await?;
        let role = RoleDao::create_system_role_with(
            &txn,
            organization.id,
            SystemRole::OrganizationAdmin,
            ADMIN_ROLE_DESCRIPTION,
        )
        .await?;
        let membership =
            MembershipDao::create_active_with(&txn, organization.id, user.id, role.id).await?;
        txn.commit().await?;

        let permissions = permission_strings(&role.permission_list());
        let tokens = self
            .start_session(&user, organization.id, role.id, permissions.clone())
            .await?;

        tracing::info!(
            user_id = %user.id,
            organization_id = %organization.id,
            "workspace registered"
        );

        Ok(AuthResponse {
            organizations: vec![OrganizationSummary {
                id: organization.id,
                name: organization.name,
                slug: organization.slug,
                logo_url: organization.logo_url,
                role: role.name,
                permissions,
                joined_at: membership.created_at,
                role_id: role.id,
            }],
            user: user.into(),
            tokens,
        })
    }

    pub async fn login(&self, body: LoginRequest) -> Result<AuthResponse, AppError> {
        validate_with(&body, Vec::new())?;

        let email = normalize_email(&body.email);
        let mut user = self
            .daos
            .user()
            .find_by_email(&email)
            .await?
            .ok_or_else(invalid_credentials)?;
        let password = self
            .daos
            .user_password()
            .find_by_user(user.id)
            .await?
            .ok_or_else(invalid_credentials)?;
        if !verify_password(&body.password, &password.password_hash)? {
            tracing::debug!(user_id = %user.id, "login rejected: wrong password");
            return Err(invalid_credentials());
        }
        if !user.is_active {
            return Err(AppError::unauthorized(ACCOUNT_INACTIVE));
        }

        let now = Utc::now().fixed_offset();
        self.daos.user().set_last_login(&user.id, &now).await?;
        user.last_login_at = Some(now);

        let memberships = self.daos.membership().active_for_user(user.id).await?;
        let organizations = OrganizationService::new(self.daos.clone())
            .summaries(memberships)
            .await?;
        let working = select_organization(&organizations, body.organization_id)
            .ok_or_else(|| AppError::forbidden(NO_ACTIVE_ORGANIZATION))?;

        let tokens = self
            .start_session(&user, working.id, working.role_id, working.permissions.clone())
            .await?;

        tracing::info!(user_id = %user.id, organization_id = %working.id, "user logged in");

        Ok(AuthResponse {
            user: user.into(),
            organizations,
            tokens,
        })
    }

    /// Revokes every refresh token of the user; access tokens simply expire.
    pub async fn logout(&self, user_id: Uuid) -> Result<u64, AppError> {
        let revoked = self.daos.refresh_token().delete_for_user(user_id).await?;
        tracing::info!(user_id = %user_id, revoked, "user logged out");
        Ok(revoked)
    }

    /// Exchanges a live refresh token for a new pair. The presented token is
    /// consumed: a second use, even a concurrent one, is rejected.
    pub async fn refresh(&self, body: RefreshRequest) -> Result<TokenPair, AppError> {
        validate_with(&body, Vec::new())?;

        let claims = self
            .tokens
            .verify_refresh(&body.refresh_token)
            .map_err(|err| match err {
                TokenError::InvalidTokenType => AppError::from(err),
                _ => AppError::unauthorized(INVALID_REFRESH_TOKEN),
            })?;

        let stored = self
            .daos
            .refresh_token()
            .find_live(&body.refresh_token, claims.sub)
            .await?
            .ok_or_else(|| AppError::unauthorized(EXPIRED_REFRESH_TOKEN))?;

        let user = match self.daos.user().find_by_id(claims.sub).await {
            Ok(user) if user.is_active => user,
            Ok(_) | Err(DaoLayerError::NotFound { .. }) => {
                return Err(AppError::unauthorized(ACCESS_REVOKED));
            }
            Err(err) => return Err(err.into()),
        };
        let organization_id = stored
            .organization_id
            .ok_or_else(|| AppError::unauthorized(ACCESS_REVOKED))?;
        let membership = self
            .daos
            .membership()
            .find_active(user.id, organization_id)
            .await?
            .ok_or_else(|| AppError::unauthorized(ACCESS_REVOKED))?;
        let role = match self.daos.role().find_by_id(membership.role_id).await {
            Ok(role) => role,
            Err(DaoLayerError::NotFound { .. }) => {
                return Err(AppError::unauthorized(ACCESS_REVOKED));
            }
            Err(err) => return Err(err.into()),
        };

        let subject = TokenSubject {
            user_id: user.id,
            email: user.email.clone(),
            organization_id: Some(organization_id),
            role_id: Some(role.id),
            permissions: permission_strings(&role.permission_list()),
        };
        let pair = self.tokens.issue_pair(&subject)?;

        match self
            .daos
            .refresh_token()
            .rotate(
                stored.id,
                user.id,
                Some(organization_id),
                &pair.refresh_token,
                pair.refresh_expires_at,
            )
            .await
        {
            Ok(_) => {
                tracing::debug!(user_id = %user.id, "refresh token rotated");
                Ok(pair)
            }
            Err(DaoLayerError::NotFound { .. }) => {
                tracing::warn!(user_id = %user.id, "refresh token reused");
                Err(AppError::unauthorized(EXPIRED_REFRESH_TOKEN))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Issues a reset token when the account exists. The raw token is only
    /// handed to the dispatcher and returned; storage keeps its digest.
    /// Failures after the lookup are logged and answered like an unknown email.
    pub async fn forgot_password(
        &self,
        body: ForgotPasswordRequest,
    ) -> Result<Option<String>, AppError> {
        validate_with(&body, Vec::new())?;

        let email = normalize_email(&body.email);
        let Some(user) = self.daos.user().find_by_email(&email).await? else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(None);
        };

        let token = generate_reset_token();
        let expires_at = (Utc::now() + self.reset_ttl).fixed_offset();
        if let Err(err) = self
            .daos
            .user()
            .set_reset_token(&user.id, hash_token(&token), expires_at)
            .await
        {
            tracing::error!(
                user_id = %user.id,
                error = %err,
                "failed to store password reset token"
            );
            return Ok(None);
        }

        dispatch_reset_link(&user, &token);
        Ok(Some(token))
    }

    /// Consumes a reset token: new password, reset state cleared and every
    /// session revoked, atomically.
    pub async fn reset_password(&self, body: ResetPasswordRequest) -> Result<(), AppError> {
        validate_with(&body, password_strength_errors("password", &body.password))?;

        let user = self
            .daos
            .user()
            .find_by_reset_hash(&hash_token(&body.token))
            .await?
            .ok_or_else(|| AppError::bad_request(INVALID_RESET_TOKEN))?;
        let now = Utc::now().fixed_offset();
        if !user.password_reset_expires_at.is_some_and(|at| at > now) {
            return Err(AppError::bad_request(INVALID_RESET_TOKEN));
        }

        let password_hash = hash_password(&body.password)?;

        let txn = self.daos.db().begin().await?;
        UserPasswordDao::replace_with(&txn, user.id, password_hash).await?;
        UserDao::clear_reset_token_with(&txn, user.id).await?;
        let revoked = RefreshTokenDao::delete_for_user_with(&txn, user.id).await?;
        txn.commit().await?;

        tracing::info!(user_id = %user.id, revoked, "password reset");
        Ok(())
    }

    /// Existing sessions stay valid after a change.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        body: ChangePasswordRequest,
    ) -> Result<(), AppError> {
        validate_with(
            &body,
            password_strength_errors("newPassword", &body.new_password),
        )?;

        let current = self
            .daos
            .user_password()
            .find_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;
        if !verify_password(&body.current_password, &current.password_hash)? {
            return Err(AppError::bad_request(WRONG_CURRENT_PASSWORD));
        }

        let password_hash = hash_password(&body.new_password)?;
        self.daos
            .user_password()
            .replace(user_id, password_hash)
            .await?;

        tracing::info!(user_id = %user_id, "password changed; sessions kept");
        Ok(())
    }

    async fn start_session(
        &self,
        user: &user::Model,
        organization_id: Uuid,
        role_id: Uuid,
        permissions: Vec<String>,
    ) -> Result<TokenPair, AppError> {
        let subject = TokenSubject {
            user_id: user.id,
            email: user.email.clone(),
            organization_id: Some(organization_id),
            role_id: Some(role_id),
            permissions,
        };
        let pair = self.tokens.issue_pair(&subject)?;
        self.daos
            .refresh_token()
            .store(
                user.id,
                Some(organization_id),
                &pair.refresh_token,
                pair.refresh_expires_at,
            )
            .await?;
        Ok(pair)
    }
}

fn invalid_credentials() -> AppError {
    AppError::unauthorized(INVALID_CREDENTIALS)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// The requested organization when the user is an active member of it,
/// otherwise the earliest joined one.
fn select_organization(
    organizations: &[OrganizationSummary],
    requested: Option<Uuid>,
) -> Option<&OrganizationSummary> {
    requested
        .and_then(|id| organizations.iter().find(|org| org.id == id))
        .or_else(|| organizations.first())
}

// Stand-in for mail delivery.
fn dispatch_reset_link(user: &user::Model, token: &str) {
    tracing::info!(user_id = %user.id, "password reset token issued");
    tracing::debug!(email = %user.email, reset_token = %token, "password reset link");
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use sea_orm::{DatabaseBackend, DatabaseConnection, DbErr, MockDatabase, MockExecResult};
    use uuid::Uuid;

    use super::*;
    use crate::auth::{SystemRole, TokenType};
    use crate::db::entities::{organization, organization_user, refresh_token, role, user};
    use crate::test_helpers::{fixtures, test_issuer};

    fn service<'a>(db: &DatabaseConnection, issuer: &'a TokenIssuer) -> AccountService<'a> {
        AccountService::new(DaoContext::new(db), issuer, Duration::minutes(10))
    }

    fn register_body() -> RegisterRequest {
        RegisterRequest {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "Ada@Example.com".to_string(),
            password: "Secret123".to_string(),
            organization_name: "Acme".to_string(),
        }
    }

    fn login_body(organization_id: Option<Uuid>) -> LoginRequest {
        LoginRequest {
            email: "ada@example.com".to_string(),
            password: "Secret123".to_string(),
            organization_id,
        }
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn register_reports_every_invalid_field() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let issuer = test_issuer();
        let body = RegisterRequest {
            first_name: String::new(),
            email: "nope".to_string(),
            password: "weak".to_string(),
            organization_name: "!!!".to_string(),
            ..register_body()
        };

        let err = service(&db, &issuer)
            .register(body)
            .await
            .expect_err("body is invalid");
        let mut fields: Vec<_> = err.field_errors().iter().map(|e| e.field.clone()).collect();
        fields.dedup();
        assert_eq!(fields, ["email", "firstName", "organizationName", "password"]);
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn register_rejects_existing_email() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[fixtures::user("ada@example.com")]])
            .into_connection();
        let issuer = test_issuer();

        let err = service(&db, &issuer)
            .register(register_body())
            .await
            .expect_err("email is taken");
        assert!(matches!(err, AppError::Conflict(ref m) if m == "Email address already exists"));
    }

    #[tokio::test]
    async fn register_rejects_taken_organization_slug() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([[fixtures::organization("acme")]])
            .into_connection();
        let issuer = test_issuer();

        let err = service(&db, &issuer)
            .register(register_body())
            .await
            .expect_err("slug is taken");
        assert!(matches!(err, AppError::Conflict(ref m) if m == "Organization name already taken"));
    }

    #[tokio::test]
    async fn register_creates_workspace_and_session() {
        let org = fixtures::organization("acme");
        let user = fixtures::user("ada@example.com");
        let role = fixtures::role(org.id, SystemRole::OrganizationAdmin);
        let membership = fixtures::membership(org.id, user.id, role.id);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([Vec::<organization::Model>::new()])
            .append_query_results([[org.clone()]])
            .append_query_results([[user.clone()]])
            .append_query_results([[fixtures::password(user.id, "hash")]])
            .append_query_results([[role.clone()]])
            .append_query_results([[membership]])
            .append_query_results([[fixtures::refresh_token("stored", user.id, Some(org.id))]])
            .into_connection();
        let issuer = test_issuer();

        let response = service(&db, &issuer)
            .register(register_body())
            .await
            .expect("registration should succeed");

        assert_eq!(response.user.id, user.id);
        assert_eq!(response.organizations.len(), 1);
        assert_eq!(response.organizations[0].role, "organization_admin");
        assert_eq!(response.organizations[0].permissions, vec!["*:*".to_string()]);
        assert_eq!(response.tokens.expires_in, 900);

        let claims = issuer
            .verify_access(&response.tokens.access_token)
            .expect("access token verifies");
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.organization_id, Some(org.id));
        assert_eq!(claims.role_id, Some(role.id));
        let refresh = issuer
            .verify_refresh(&response.tokens.refresh_token)
            .expect("refresh token verifies");
        assert_eq!(refresh.token_type, TokenType::Refresh);

        let json = serde_json::to_value(&response).unwrap();
        assert!(json["accessToken"].is_string());
        assert_eq!(json["expiresIn"], 900);
    }

    #[tokio::test]
    async fn register_rolls_back_when_role_insert_fails() {
        let org = fixtures::organization("acme");
        let user = fixtures::user("ada@example.com");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([Vec::<organization::Model>::new()])
            .append_query_results([[org]])
            .append_query_results([[user.clone()]])
            .append_query_results([[fixtures::password(user.id, "hash")]])
            .append_query_errors([DbErr::Custom("role insert failed".to_string())])
            .into_connection();
        let issuer = test_issuer();

        let result = service(&db, &issuer).register(register_body()).await;
        assert!(result.is_err());

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("ROLLBACK"));
        assert!(!log.contains("COMMIT"));
        assert!(!log.contains("refresh_tokens"));
    }

    #[tokio::test]
    async fn login_rejects_wrong_password_like_unknown_email() {
        let user = fixtures::user("ada@example.com");
        let hash = hash_password("Secret123").unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user.clone()]])
            .append_query_results([[fixtures::password(user.id, &hash)]])
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();
        let issuer = test_issuer();
        let service = service(&db, &issuer);

        let mut body = login_body(None);
        body.password = "Wrong1234".to_string();
        let wrong = service.login(body).await.expect_err("wrong password");
        let unknown = service.login(login_body(None)).await.expect_err("unknown email");

        for err in [wrong, unknown] {
            assert!(matches!(err, AppError::Unauthorized(ref m) if m == INVALID_CREDENTIALS));
        }
    }

    #[tokio::test]
    async fn login_rejects_inactive_account() {
        let mut user = fixtures::user("ada@example.com");
        user.is_active = false;
        let hash = hash_password("Secret123").unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user.clone()]])
            .append_query_results([[fixtures::password(user.id, &hash)]])
            .into_connection();
        let issuer = test_issuer();

        let err = service(&db, &issuer)
            .login(login_body(None))
            .await
            .expect_err("inactive");
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == ACCOUNT_INACTIVE));
    }

    fn login_db(
        user: &user::Model,
        memberships: Vec<organization_user::Model>,
        organizations: Vec<organization::Model>,
        roles: Vec<role::Model>,
        stored: Option<refresh_token::Model>,
    ) -> DatabaseConnection {
        let hash = hash_password("Secret123").unwrap();
        let mut mock = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user.clone()]])
            .append_query_results([[fixtures::password(user.id, &hash)]])
            .append_query_results([[user.clone()], [user.clone()]])
            .append_query_results([memberships.clone()]);
        if !memberships.is_empty() {
            mock = mock
                .append_query_results([organizations])
                .append_query_results([roles]);
        }
        if let Some(stored) = stored {
            mock = mock.append_query_results([[stored]]);
        }
        mock.into_connection()
    }

    #[tokio::test]
    async fn login_uses_requested_organization_when_member() {
        let user = fixtures::user("ada@example.com");
        let first = fixtures::organization("first");
        let second = fixtures::organization("second");
        let admin = fixtures::role(first.id, SystemRole::OrganizationAdmin);
        let viewer = fixtures::role(second.id, SystemRole::Viewer);
        let db = login_db(
            &user,
            vec![
                fixtures::membership(first.id, user.id, admin.id),
                fixtures::membership(second.id, user.id, viewer.id),
            ],
            vec![first.clone(), second.clone()],
            vec![admin, viewer.clone()],
            Some(fixtures::refresh_token("stored", user.id, Some(second.id))),
        );
        let issuer = test_issuer();

        let response = service(&db, &issuer)
            .login(login_body(Some(second.id)))
            .await
            .expect("login should succeed");

        let claims = issuer.verify_access(&response.tokens.access_token).unwrap();
        assert_eq!(claims.organization_id, Some(second.id));
        assert_eq!(claims.role_id, Some(viewer.id));
        assert!(!claims.permissions.contains(&"*:*".to_string()));
        assert_eq!(response.organizations.len(), 2);
        assert!(response.user.last_login_at.is_some());
    }

    #[tokio::test]
    async fn login_falls_back_to_earliest_membership() {
        let user = fixtures::user("ada@example.com");
        let first = fixtures::organization("first");
        let admin = fixtures::role(first.id, SystemRole::OrganizationAdmin);
        let db = login_db(
            &user,
            vec![fixtures::membership(first.id, user.id, admin.id)],
            vec![first.clone()],
            vec![admin],
            Some(fixtures::refresh_token("stored", user.id, Some(first.id))),
        );
        let issuer = test_issuer();

        let response = service(&db, &issuer)
            .login(login_body(Some(Uuid::new_v4())))
            .await
            .expect("login should succeed");

        let claims = issuer.verify_access(&response.tokens.access_token).unwrap();
        assert_eq!(claims.organization_id, Some(first.id));
        assert_eq!(claims.permissions, vec!["*:*".to_string()]);
    }

    #[tokio::test]
    async fn login_without_active_membership_is_forbidden() {
        let user = fixtures::user("ada@example.com");
        let db = login_db(&user, Vec::new(), Vec::new(), Vec::new(), None);
        let issuer = test_issuer();

        let err = service(&db, &issuer)
            .login(login_body(None))
            .await
            .expect_err("no organization");
        assert!(matches!(err, AppError::Forbidden(ref m) if m == NO_ACTIVE_ORGANIZATION));
    }

    fn refresh_subject(user: &user::Model) -> TokenSubject {
        TokenSubject {
            user_id: user.id,
            email: user.email.clone(),
            organization_id: None,
            role_id: None,
            permissions: Vec::new(),
        }
    }

    #[tokio::test]
    async fn refresh_rotates_the_stored_token() {
        let user = fixtures::user("ada@example.com");
        let org = fixtures::organization("acme");
        let role = fixtures::role(org.id, SystemRole::ProjectManager);
        let issuer = test_issuer();
        let presented = issuer
            .encode_refresh(&issuer.refresh_claims(&refresh_subject(&user)))
            .unwrap();
        let stored = fixtures::refresh_token(&presented, user.id, Some(org.id));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[stored.clone()]])
            .append_query_results([[user.clone()]])
            .append_query_results([[fixtures::membership(org.id, user.id, role.id)]])
            .append_query_results([[role.clone()]])
            .append_exec_results([exec(1)])
            .append_query_results([[fixtures::refresh_token("next", user.id, Some(org.id))]])
            .into_connection();

        let pair = service(&db, &issuer)
            .refresh(RefreshRequest {
                refresh_token: presented.clone(),
            })
            .await
            .expect("refresh should succeed");

        assert_ne!(pair.refresh_token, presented);
        let claims = issuer.verify_access(&pair.access_token).unwrap();
        assert_eq!(claims.organization_id, Some(org.id));
        assert_eq!(claims.role_id, Some(role.id));
        assert!(claims.permissions.contains(&"project:*".to_string()));
    }

    #[tokio::test]
    async fn refresh_of_consumed_token_is_rejected() {
        let user = fixtures::user("ada@example.com");
        let issuer = test_issuer();
        let presented = issuer
            .encode_refresh(&issuer.refresh_claims(&refresh_subject(&user)))
            .unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<refresh_token::Model>::new()])
            .into_connection();

        let err = service(&db, &issuer)
            .refresh(RefreshRequest {
                refresh_token: presented,
            })
            .await
            .expect_err("already used");
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == EXPIRED_REFRESH_TOKEN));
    }

    #[tokio::test]
    async fn refresh_loses_race_for_the_same_token() {
        let user = fixtures::user("ada@example.com");
        let org = fixtures::organization("acme");
        let role = fixtures::role(org.id, SystemRole::Viewer);
        let issuer = test_issuer();
        let presented = issuer
            .encode_refresh(&issuer.refresh_claims(&refresh_subject(&user)))
            .unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[fixtures::refresh_token(&presented, user.id, Some(org.id))]])
            .append_query_results([[user.clone()]])
            .append_query_results([[fixtures::membership(org.id, user.id, role.id)]])
            .append_query_results([[role]])
            .append_exec_results([exec(0)])
            .into_connection();

        let err = service(&db, &issuer)
            .refresh(RefreshRequest {
                refresh_token: presented,
            })
            .await
            .expect_err("another request consumed it");
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == EXPIRED_REFRESH_TOKEN));
    }

    #[tokio::test]
    async fn refresh_rejects_access_tokens_and_revoked_memberships() {
        let user = fixtures::user("ada@example.com");
        let issuer = test_issuer();
        let access = issuer
            .encode_access(&issuer.access_claims(&refresh_subject(&user)))
            .unwrap();
        let presented = issuer
            .encode_refresh(&issuer.refresh_claims(&refresh_subject(&user)))
            .unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[fixtures::refresh_token(
                &presented,
                user.id,
                Some(Uuid::new_v4()),
            )]])
            .append_query_results([[user.clone()]])
            .append_query_results([Vec::<organization_user::Model>::new()])
            .into_connection();
        let service = service(&db, &issuer);

        let err = service
            .refresh(RefreshRequest {
                refresh_token: access,
            })
            .await
            .expect_err("access token presented");
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == INVALID_REFRESH_TOKEN));

        let err = service
            .refresh(RefreshRequest {
                refresh_token: presented,
            })
            .await
            .expect_err("membership gone");
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == ACCESS_REVOKED));
    }

    #[tokio::test]
    async fn forgot_password_is_silent_for_unknown_email() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();
        let issuer = test_issuer();

        let token = service(&db, &issuer)
            .forgot_password(ForgotPasswordRequest {
                email: "ghost@example.com".to_string(),
            })
            .await
            .expect("always succeeds");
        assert!(token.is_none());
    }

    #[tokio::test]
    async fn forgot_password_stores_digest_not_token() {
        let user = fixtures::user("ada@example.com");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user.clone()], [user.clone()], [user.clone()]])
            .into_connection();
        let issuer = test_issuer();

        let token = service(&db, &issuer)
            .forgot_password(ForgotPasswordRequest {
                email: "ada@example.com".to_string(),
            })
            .await
            .expect("request succeeds")
            .expect("user exists");

        assert_eq!(token.len(), 64);
        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains(&hash_token(&token)));
        assert!(!log.contains(&token));
    }

    #[tokio::test]
    async fn forgot_password_store_failure_looks_like_unknown_email() {
        let user = fixtures::user("ada@example.com");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user.clone()], [user]])
            .append_query_errors([DbErr::Custom("update failed".to_string())])
            .into_connection();
        let issuer = test_issuer();

        let token = service(&db, &issuer)
            .forgot_password(ForgotPasswordRequest {
                email: "ada@example.com".to_string(),
            })
            .await
            .expect("request still succeeds");
        assert!(token.is_none());
    }

    #[tokio::test]
    async fn reset_password_rejects_expired_token() {
        let mut user = fixtures::user("ada@example.com");
        user.password_reset_token_hash = Some(hash_token("raw"));
        user.password_reset_expires_at = Some((Utc::now() - Duration::minutes(1)).fixed_offset());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user]])
            .into_connection();
        let issuer = test_issuer();

        let err = service(&db, &issuer)
            .reset_password(ResetPasswordRequest {
                token: "raw".to_string(),
                password: "NewSecret1".to_string(),
            })
            .await
            .expect_err("expired");
        assert!(matches!(err, AppError::BadRequest(ref m) if m == INVALID_RESET_TOKEN));
    }

    #[tokio::test]
    async fn reset_password_replaces_hash_and_revokes_sessions() {
        let mut user = fixtures::user("ada@example.com");
        user.password_reset_token_hash = Some(hash_token("raw"));
        user.password_reset_expires_at = Some((Utc::now() + Duration::minutes(5)).fixed_offset());
        let password = fixtures::password(user.id, "old");
        let mut cleared = user.clone();
        cleared.password_reset_token_hash = None;
        cleared.password_reset_expires_at = None;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user.clone()]])
            .append_query_results([[password.clone()], [password.clone()], [password]])
            .append_query_results([[user], [cleared]])
            .append_exec_results([exec(3)])
            .into_connection();
        let issuer = test_issuer();

        service(&db, &issuer)
            .reset_password(ResetPasswordRequest {
                token: "raw".to_string(),
                password: "NewSecret1".to_string(),
            })
            .await
            .expect("reset should succeed");

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("refresh_tokens"));
    }

    #[tokio::test]
    async fn change_password_checks_current_and_new() {
        let user_id = Uuid::new_v4();
        let hash = hash_password("Secret123").unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[fixtures::password(user_id, &hash)]])
            .into_connection();
        let issuer = test_issuer();
        let service = service(&db, &issuer);

        let err = service
            .change_password(
                user_id,
                ChangePasswordRequest {
                    current_password: "Secret123".to_string(),
                    new_password: "weak".to_string(),
                },
            )
            .await
            .expect_err("weak new password");
        assert!(err.field_errors().iter().all(|e| e.field == "newPassword"));

        let err = service
            .change_password(
                user_id,
                ChangePasswordRequest {
                    current_password: "Wrong1234".to_string(),
                    new_password: "NewSecret1".to_string(),
                },
            )
            .await
            .expect_err("wrong current password");
        assert!(matches!(err, AppError::BadRequest(ref m) if m == WRONG_CURRENT_PASSWORD));
    }
}
