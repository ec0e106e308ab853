#[allow(unused_imports)]
pub mod prelude {
    pub use super::board::Entity as Board;
    pub use super::board_column::Entity as BoardColumn;
    pub use super::comment::Entity as Comment;
    pub use super::organization::Entity as Organization;
    pub use super::organization_user::Entity as OrganizationUser;
    pub use super::project::Entity as Project;
    pub use super::project_member::Entity as ProjectMember;
    pub use super::refresh_token::Entity as RefreshToken;
    pub use super::role::Entity as Role;
    pub use super::task::Entity as Task;
    pub use super::task_assignment::Entity as TaskAssignment;
    pub use super::user::Entity as User;
    pub use super::user_password::Entity as UserPassword;
}

pub mod board;
pub mod board_column;
pub mod comment;
pub mod organization;
pub mod organization_user;
pub mod project;
pub mod project_member;
pub mod refresh_token;
pub mod role;
pub mod task;
pub mod task_assignment;
pub mod user;
pub mod user_password;
