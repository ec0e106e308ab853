pub mod auth;
pub mod health;
pub mod organizations;
pub mod projects;
mod router;
pub mod tasks;
pub mod users;

pub use router::router;
