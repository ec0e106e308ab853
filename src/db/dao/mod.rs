pub mod base;
pub mod base_traits;
pub mod board_dao;
pub mod comment_dao;
mod context;
pub mod error;
pub mod membership_dao;
pub mod organization_dao;
pub mod project_dao;
pub mod project_member_dao;
pub mod refresh_token_dao;
pub mod role_dao;
pub mod task_assignment_dao;
pub mod task_dao;
pub mod user_dao;
pub mod user_password_dao;

pub use base::{ColumnFilter, DaoBase, FilterOp, PaginatedResponse};
pub use base_traits::{HasCreatedAtColumn, HasIdActiveModel, TimestampedActiveModel};
pub use board_dao::{BoardColumnDao, BoardDao};
pub use comment_dao::CommentDao;
pub use context::DaoContext;
pub use error::{DaoLayerError, DaoResult};
pub use membership_dao::MembershipDao;
pub use organization_dao::OrganizationDao;
pub use project_dao::ProjectDao;
pub use project_member_dao::ProjectMemberDao;
pub use refresh_token_dao::RefreshTokenDao;
pub use role_dao::RoleDao;
pub use task_assignment_dao::TaskAssignmentDao;
pub use task_dao::TaskDao;
pub use user_dao::UserDao;
pub use user_password_dao::UserPasswordDao;
