use anyhow::{Result, bail};

use super::AppConfig;

pub fn validate(cfg: &AppConfig) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    if cfg.general.host.trim().is_empty() {
        errors.push("general.host must not be empty".to_string());
    }

    if let Some(database) = cfg.database.as_ref() {
        if database.url.trim().is_empty() {
            errors.push("database.url must not be empty".to_string());
        }

        if database.min_idle > database.max_connections {
            errors.push(format!(
                "database.min_idle ({}) must be <= database.max_connections ({})",
                database.min_idle, database.max_connections
            ));
        }
    }

    if let Some(auth) = cfg.auth.as_ref() {
        if auth.jwt_secret.trim().is_empty() {
            errors.push("auth.jwt_secret must not be empty".to_string());
        }

        if auth.jwt_refresh_secret.trim().is_empty() {
            errors.push("auth.jwt_refresh_secret must not be empty".to_string());
        }

        if !auth.jwt_secret.is_empty() && auth.jwt_secret == auth.jwt_refresh_secret {
            errors.push("auth.jwt_secret and auth.jwt_refresh_secret must differ".to_string());
        }

        if auth.access_ttl_secs == 0 {
            errors.push("auth.access_ttl_secs must be > 0".to_string());
        }

        if auth.refresh_ttl_secs <= auth.access_ttl_secs {
            errors.push(
                "auth.refresh_ttl_secs must be greater than auth.access_ttl_secs".to_string(),
            );
        }

        if auth.password_reset_ttl_secs == 0 {
            errors.push("auth.password_reset_ttl_secs must be > 0".to_string());
        }
    }

    if errors.is_empty() {
        return Ok(());
    }

    bail!("invalid app config:\n- {}", errors.join("\n- "))
}
