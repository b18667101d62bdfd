// ABOUTME: Server configuration loaded from environment variables
// ABOUTME: Port, CORS origin, database path, JWT secret, and reminder hour

use std::env;
use std::num::ParseIntError;
use std::path::PathBuf;

use thiserror::Error;

use trellis_notifications::reminder::DEFAULT_REMINDER_HOUR_UTC;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid port number: {0}")]
    InvalidPort(#[from] ParseIntError),
    #[error("Port {0} is out of valid range (1-65535)")]
    PortOutOfRange(u16),
    #[error("JWT_SECRET environment variable is not defined")]
    MissingJwtSecret,
    #[error("Invalid reminder hour: {0} (expected 0-23)")]
    InvalidReminderHour(String),
}

#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub cors_origin: String,
    pub database_path: Option<PathBuf>,
    pub jwt_secret: String,
    pub reminder_hour_utc: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port_str = env::var("PORT").unwrap_or_else(|_| "4001".to_string());
        let port = port_str.parse::<u16>()?;

        if port == 0 {
            return Err(ConfigError::PortOutOfRange(port));
        }

        let cors_origin =
            env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:5173".to_string());

        let database_path = env::var("TRELLIS_DB_PATH").ok().map(PathBuf::from);

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::MissingJwtSecret)?;

        let reminder_hour_utc = match env::var("REMINDER_HOUR_UTC") {
            Ok(value) => {
                let hour = value
                    .parse::<u32>()
                    .map_err(|_| ConfigError::InvalidReminderHour(value.clone()))?;
                if hour > 23 {
                    return Err(ConfigError::InvalidReminderHour(value));
                }
                hour
            }
            Err(_) => DEFAULT_REMINDER_HOUR_UTC,
        };

        Ok(Config {
            port,
            cors_origin,
            database_path,
            jwt_secret,
            reminder_hour_utc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "PORT",
            "CORS_ORIGIN",
            "TRELLIS_DB_PATH",
            "JWT_SECRET",
            "REMINDER_HOUR_UTC",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn jwt_secret_is_required() {
        clear_env();
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::MissingJwtSecret)
        ));
    }

    #[test]
    #[serial]
    fn defaults_apply_when_only_the_secret_is_set() {
        clear_env();
        env::set_var("JWT_SECRET", "s3cret");

        let config = Config::from_env().unwrap();
        assert_eq!(config.port, 4001);
        assert_eq!(config.reminder_hour_utc, DEFAULT_REMINDER_HOUR_UTC);
        assert!(config.database_path.is_none());
    }

    #[test]
    #[serial]
    fn out_of_range_reminder_hour_is_rejected() {
        clear_env();
        env::set_var("JWT_SECRET", "s3cret");
        env::set_var("REMINDER_HOUR_UTC", "24");

        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidReminderHour(_))
        ));
    }
}
