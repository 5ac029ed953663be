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

/// Load application configuration from environment variables already in the
/// process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files. Useful for
/// testing or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual
/// environment so it can be tested with a pure `HashMap` lookup.
pub(crate) fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_i64 = |var: &str, default: &str| -> Result<i64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<i64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let database_url = require("DATABASE_URL")?;
    let upstream_access_key = require("GRAMDELTA_UPSTREAM_ACCESS_KEY")?;

    let env = parse_environment(&or_default("GRAMDELTA_ENV", "development"));

    let bind_addr = parse_addr("GRAMDELTA_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("GRAMDELTA_LOG_LEVEL", "info");

    let upstream_base_url = or_default("GRAMDELTA_UPSTREAM_BASE_URL", "https://api.hikerapi.com");
    let upstream_request_timeout_secs =
        parse_u64("GRAMDELTA_UPSTREAM_REQUEST_TIMEOUT_SECS", "30")?;
    let upstream_user_agent = or_default(
        "GRAMDELTA_UPSTREAM_USER_AGENT",
        "gramdelta/0.1 (follower-analytics)",
    );
    let upstream_page_cap = parse_usize("GRAMDELTA_UPSTREAM_PAGE_CAP", "500")?;
    let upstream_inter_page_delay_ms = parse_u64("GRAMDELTA_UPSTREAM_INTER_PAGE_DELAY_MS", "0")?;

    let db_max_connections = parse_u32("GRAMDELTA_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("GRAMDELTA_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("GRAMDELTA_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let snapshot_retention_days = parse_i64("GRAMDELTA_SNAPSHOT_RETENTION_DAYS", "30")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        upstream_base_url,
        upstream_access_key,
        upstream_request_timeout_secs,
        upstream_user_agent,
        upstream_page_cap,
        upstream_inter_page_delay_ms,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        snapshot_retention_days,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
pub(crate) fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
