use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        optional(var).unwrap_or_else(|| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let positive_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        match parse_u32(var, default)? {
            0 => Err(invalid(var, "must be greater than zero".to_string())),
            n => Ok(n),
        }
    };

    let username = require("FAVSYNC_USERNAME")?;
    let database_url = optional("DATABASE_URL");
    let jwt_secret = optional("FAVSYNC_JWT_SECRET");
    let auth_secret_word = optional("FAVSYNC_AUTH_SECRET_WORD");

    let env = parse_environment(&or_default("FAVSYNC_ENV", "development"))?;

    let bind_addr = or_default("FAVSYNC_BIND_ADDR", "0.0.0.0:8080")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("FAVSYNC_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("FAVSYNC_LOG_LEVEL", "info");

    let site_origin = or_default("FAVSYNC_SITE_ORIGIN", "https://letterboxd.com")
        .trim_end_matches('/')
        .to_string();
    if !site_origin.starts_with("http://") && !site_origin.starts_with("https://") {
        return Err(invalid(
            "FAVSYNC_SITE_ORIGIN",
            "must start with http:// or https://".to_string(),
        ));
    }

    let image_width = positive_u32("FAVSYNC_IMAGE_WIDTH", "2000")?;
    let image_height = positive_u32("FAVSYNC_IMAGE_HEIGHT", "3000")?;

    let page_timeout_secs = parse_u64("FAVSYNC_PAGE_TIMEOUT_SECS", "30")?;
    if page_timeout_secs == 0 {
        return Err(invalid(
            "FAVSYNC_PAGE_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }
    let settle_delay_ms = parse_u64("FAVSYNC_SETTLE_DELAY_MS", "2000")?;
    let chrome_path = optional("FAVSYNC_CHROME_PATH").map(PathBuf::from);
    let sync_deadline_secs = parse_u64("FAVSYNC_SYNC_DEADLINE_SECS", "90")?;
    if sync_deadline_secs == 0 {
        return Err(invalid(
            "FAVSYNC_SYNC_DEADLINE_SECS",
            "must be greater than zero".to_string(),
        ));
    }
    let sync_schedule = parse_schedule(&or_default("FAVSYNC_SYNC_SCHEDULE", "0 0 3 * * *"));

    let db_max_connections = parse_u32("FAVSYNC_DB_MAX_CONNECTIONS", "5")?;
    let db_min_connections = parse_u32("FAVSYNC_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("FAVSYNC_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    if db_min_connections > db_max_connections {
        return Err(invalid(
            "FAVSYNC_DB_MIN_CONNECTIONS",
            format!(
                "min connections ({db_min_connections}) exceeds max connections ({db_max_connections})"
            ),
        ));
    }

    Ok(AppConfig {
        username,
        database_url,
        jwt_secret,
        auth_secret_word,
        env,
        bind_addr,
        log_level,
        site_origin,
        image_width,
        image_height,
        page_timeout_secs,
        settle_delay_ms,
        chrome_path,
        sync_deadline_secs,
        sync_schedule,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "FAVSYNC_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_schedule(raw: &str) -> Option<String> {
    if raw.eq_ignore_ascii_case("off") {
        None
    } else {
        Some(raw.to_string())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
