pub mod account_service;
pub mod auth_service;
mod context;
pub mod organization_service;
pub mod pagination;
pub mod project_service;
pub mod slug;
pub mod task_service;
pub mod user_service;

pub use context::ServiceContext;
