mod identity;
pub mod jwt;
pub mod password;
pub mod permissions;
mod types;

pub use identity::{AuthUser, OrgContext};
pub use jwt::{TokenError, TokenIssuer};
pub use permissions::{
    Action, Condition, Permission, PermissionContext, Resource, SystemRole, has_permission,
    permission_string_granted, permission_strings, system_role_permissions,
};
pub use types::{Claims, ProjectRole, TokenPair, TokenSubject, TokenType};
