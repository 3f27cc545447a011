//! Process configuration, read once from the environment at startup.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `PORT` | `3000` | listening port |
//! | `APP_ENV` | `development` | `production` or `development` |
//! | `SESSION_COOKIE` | `session` | name of the session cookie |
//! | `TELEMETRY_DSN` | unset | Sentry DSN; unset logs events instead |
//! | `TELEMETRY_RELEASE` | crate version | release reported with every event |
//! | `TELEMETRY_SERVICE` | `api` | `service` tag |
//! | `TELEMETRY_TIMEOUT_MS` | `2000` | bound on one capture call |

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::error::Error;
use crate::telemetry::TelemetryConfig;

/// Deployment mode.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production  => "production",
        }
    }

    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

impl FromStr for Environment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _                     => Err(()),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub environment: Environment,
    pub session_cookie: String,
    pub telemetry: TelemetryConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key → value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let port = match lookup("PORT") {
            Some(v) => v.trim().parse().map_err(|_| Error::Config {
                key: "PORT",
                reason: format!("`{v}` is not a port number"),
            })?,
            None => 3000,
        };

        let environment = match lookup("APP_ENV") {
            Some(v) => v.parse().map_err(|()| Error::Config {
                key: "APP_ENV",
                reason: format!("`{v}` is neither production nor development"),
            })?,
            None => Environment::Development,
        };

        let timeout = match lookup("TELEMETRY_TIMEOUT_MS") {
            Some(v) => Duration::from_millis(v.trim().parse().map_err(|_| Error::Config {
                key: "TELEMETRY_TIMEOUT_MS",
                reason: format!("`{v}` is not a number of milliseconds"),
            })?),
            None => Duration::from_secs(2),
        };

        let defaults = TelemetryConfig::default();
        let telemetry = TelemetryConfig {
            dsn: lookup("TELEMETRY_DSN").filter(|v| !v.trim().is_empty()),
            environment,
            release: lookup("TELEMETRY_RELEASE").unwrap_or(defaults.release),
            service: lookup("TELEMETRY_SERVICE").unwrap_or(defaults.service),
            timeout,
        };

        Ok(Self {
            port,
            environment,
            session_cookie: lookup("SESSION_COOKIE").unwrap_or_else(|| "session".to_owned()),
            telemetry,
        })
    }

    /// `0.0.0.0:<port>`.
    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
