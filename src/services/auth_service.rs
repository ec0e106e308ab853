use crate::{
    auth::{AuthUser, OrgContext, TokenIssuer},
    db::dao::{DaoBase, DaoContext, DaoLayerError},
    error::AppError,
};

pub const USER_NOT_ACTIVE: &str = "User not found or inactive";
pub const ORGANIZATION_REQUIRED: &str = "Organization context required";
pub const ORGANIZATION_DENIED: &str = "Access denied to organization";

/// Resolves bearer tokens into identities and working-organization contexts.
/// Everything is re-read from storage on each call.
pub struct AuthService<'a> {
    daos: DaoContext,
    tokens: &'a TokenIssuer,
}

impl<'a> AuthService<'a> {
    pub fn new(daos: DaoContext, tokens: &'a TokenIssuer) -> Self {
        Self { daos, tokens }
    }

    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, AppError> {
        let claims = self.tokens.verify_access(token)?;

        let user = match self.daos.user().find_by_id(claims.sub).await {
            Ok(user) if user.is_active => user,
            Ok(_) | Err(DaoLayerError::NotFound { .. }) => {
                return Err(AppError::unauthorized(USER_NOT_ACTIVE));
            }
            Err(err) => return Err(err.into()),
        };

        Ok(AuthUser {
            id: user.id,
            email: user.email,
            organization_id: claims.organization_id,
            role_id: claims.role_id,
            permissions: claims.permissions,
        })
    }

    pub async fn organization_context(&self, user: AuthUser) -> Result<OrgContext, AppError> {
        let organization_id = user
            .organization_id
            .ok_or_else(|| AppError::forbidden(ORGANIZATION_REQUIRED))?;

        let membership = self
            .daos
            .membership()
            .find_active(user.id, organization_id)
            .await?
            .ok_or_else(|| AppError::forbidden(ORGANIZATION_DENIED))?;

        let role = match self.daos.role().find_by_id(membership.role_id).await {
            Ok(role) => role,
            Err(DaoLayerError::NotFound { .. }) => {
                return Err(AppError::forbidden(ORGANIZATION_DENIED));
            }
            Err(err) => return Err(err.into()),
        };

        Ok(OrgContext {
            user,
            organization_id,
            membership,
            role_permissions: role.permission_list(),
        })
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase};
    use uuid::Uuid;

    use super::*;
    use crate::auth::{SystemRole, TokenSubject};
    use crate::db::entities::{organization_user, role, user};
    use crate::test_helpers::{fixtures, refresh_token_for, test_issuer};

    fn subject_for(user: &user::Model, organization_id: Option<Uuid>) -> TokenSubject {
        TokenSubject {
            user_id: user.id,
            email: user.email.clone(),
            organization_id,
            role_id: None,
            permissions: vec!["project:read".to_string()],
        }
    }

    fn auth_user(organization_id: Option<Uuid>) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            organization_id,
            role_id: None,
            permissions: Vec::new(),
        }
    }

    #[tokio::test]
    async fn authenticate_attaches_claims_of_live_user() {
        let user = fixtures::user("a@x.com");
        let org_id = Uuid::new_v4();
        let issuer = test_issuer();
        let token = issuer
            .encode_access(&issuer.access_claims(&subject_for(&user, Some(org_id))))
            .unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user.clone()]])
            .into_connection();

        let identity = AuthService::new(DaoContext::new(&db), &issuer)
            .authenticate(&token)
            .await
            .expect("token should authenticate");

        assert_eq!(identity.id, user.id);
        assert_eq!(identity.organization_id, Some(org_id));
        assert_eq!(identity.permissions, vec!["project:read".to_string()]);
    }

    #[tokio::test]
    async fn authenticate_rejects_inactive_or_missing_users() {
        let mut inactive = fixtures::user("a@x.com");
        inactive.is_active = false;
        let issuer = test_issuer();
        let token = issuer
            .encode_access(&issuer.access_claims(&subject_for(&inactive, None)))
            .unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![inactive], Vec::<user::Model>::new()])
            .into_connection();
        let service = AuthService::new(DaoContext::new(&db), &issuer);

        for _ in 0..2 {
            let err = service.authenticate(&token).await.expect_err("should reject");
            assert!(matches!(err, AppError::Unauthorized(ref m) if m == USER_NOT_ACTIVE));
        }
    }

    #[tokio::test]
    async fn authenticate_rejects_refresh_tokens_without_touching_storage() {
        let user = fixtures::user("a@x.com");
        let token = refresh_token_for(&subject_for(&user, None));
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let issuer = test_issuer();

        let err = AuthService::new(DaoContext::new(&db), &issuer)
            .authenticate(&token)
            .await
            .expect_err("refresh token is not an access token");
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn organization_context_requires_claim() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let issuer = test_issuer();

        let err = AuthService::new(DaoContext::new(&db), &issuer)
            .organization_context(auth_user(None))
            .await
            .expect_err("claim is missing");
        assert!(matches!(err, AppError::Forbidden(ref m) if m == ORGANIZATION_REQUIRED));
    }

    #[tokio::test]
    async fn organization_context_requires_active_membership() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<organization_user::Model>::new()])
            .into_connection();
        let issuer = test_issuer();

        let err = AuthService::new(DaoContext::new(&db), &issuer)
            .organization_context(auth_user(Some(Uuid::new_v4())))
            .await
            .expect_err("no membership");
        assert!(matches!(err, AppError::Forbidden(ref m) if m == ORGANIZATION_DENIED));
    }

    #[tokio::test]
    async fn organization_context_loads_role_permissions() {
        let org_id = Uuid::new_v4();
        let user = auth_user(Some(org_id));
        let role: role::Model = fixtures::role(org_id, SystemRole::TeamMember);
        let membership = fixtures::membership(org_id, user.id, role.id);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[membership.clone()]])
            .append_query_results([[role]])
            .into_connection();
        let issuer = test_issuer();

        let ctx = AuthService::new(DaoContext::new(&db), &issuer)
            .organization_context(user)
            .await
            .expect("member should resolve");

        assert_eq!(ctx.organization_id, org_id);
        assert_eq!(ctx.membership.id, membership.id);
        assert_eq!(ctx.role_permissions, SystemRole::TeamMember.permissions());
    }
}
