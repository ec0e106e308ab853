pub mod auth;
mod json_error;
mod panic;
pub mod permissions;

pub use auth::{authenticate, optional_auth, require_organization};
pub use json_error::json_error_middleware;
pub use panic::catch_panic_layer;
pub use permissions::RequirePermissionsLayer;
