// src/config.rs

use std::env;
use std::str::FromStr;

use dotenvy::dotenv;

use crate::exam::timer::{DEFAULT_DURATION_SECS, MAX_DURATION_SECS};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    /// Countdown for papers that do not set their own duration.
    pub exam_duration_secs: u32,
    /// How long a finished session's outcome stays in memory.
    pub session_retention_secs: u64,
    pub server_port: u16,
    /// Built frontend bundle to serve at `/`, if any.
    pub static_dir: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        Self {
            database_url,
            jwt_secret,
            jwt_expiration: parse_var("JWT_EXPIRATION", 86_400, |v| *v > 0),
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            exam_duration_secs: parse_var("EXAM_DURATION_SECS", DEFAULT_DURATION_SECS, |v| {
                (1..=MAX_DURATION_SECS).contains(v)
            }),
            session_retention_secs: parse_var("SESSION_RETENTION_SECS", 900, |_| true),
            server_port: parse_var("SERVER_PORT", 3000, |_| true),
            static_dir: env::var("STATIC_DIR").ok(),
        }
    }
}

/// Reads an optional variable, falling back to `default` when it is unset,
/// unparsable or rejected by `valid`.
fn parse_var<T: FromStr>(key: &str, default: T, valid: impl Fn(&T) -> bool) -> T {
    parse_value(key, env::var(key).ok(), default, valid)
}

fn parse_value<T: FromStr>(
    key: &str,
    raw: Option<String>,
    default: T,
    valid: impl Fn(&T) -> bool,
) -> T {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        _ => {
            tracing::warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn duration(raw: Option<&str>) -> u32 {
        parse_value(
            "EXAM_DURATION_SECS",
            raw.map(str::to_string),
            DEFAULT_DURATION_SECS,
            |v| (1..=MAX_DURATION_SECS).contains(v),
        )
    }

    #[test]
    fn test_duration_parses_and_trims() {
        assert_eq!(duration(Some(" 3600 ")), 3600);
        assert_eq!(duration(None), DEFAULT_DURATION_SECS);
    }

    #[test]
    fn test_duration_rejects_zero_and_out_of_range() {
        assert_eq!(duration(Some("0")), DEFAULT_DURATION_SECS);
        assert_eq!(duration(Some("86401")), DEFAULT_DURATION_SECS);
        assert_eq!(duration(Some("4294967295")), DEFAULT_DURATION_SECS);
        assert_eq!(duration(Some("three hours")), DEFAULT_DURATION_SECS);
    }
}
