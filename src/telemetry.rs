//! Error telemetry: the events sent to the external monitoring service
//! (Sentry) and the sinks that deliver them.
//!
//! The sink configuration (service tag, environment, release) is fixed at
//! startup through [`TelemetryConfig`] and stamped on every [`Event`] by the
//! [`ErrorHandler`](crate::ErrorHandler).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, warn};

use crate::config::Environment;
use crate::kind::Severity;

/// Fixed startup configuration of the telemetry pipeline.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Sentry DSN. `None` means "log only".
    pub dsn: Option<String>,
    pub environment: Environment,
    pub release: String,
    /// Value of the `service` tag.
    pub service: String,
    /// Upper bound for one capture call.
    pub timeout: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: Environment::Development,
            release: env!("CARGO_PKG_VERSION").to_owned(),
            service: "api".to_owned(),
            timeout: Duration::from_secs(2),
        }
    }
}

/// The user an event is attributed to.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct EventUser {
    pub id: String,
    pub username: String,
    pub email: String,
}

/// One captured error.
#[derive(Clone, Debug, Serialize)]
pub struct Event {
    pub severity: Severity,
    /// Registered kind name; `None` for unexpected failures.
    pub kind: Option<&'static str>,
    pub message: String,
    /// `file:line:column` where an application error was raised.
    pub location: Option<String>,
    /// `source()` chain of the failure, outermost first.
    pub causes: Vec<String>,
    pub user: Option<EventUser>,
    pub method: String,
    pub path: String,
    pub environment: Environment,
    pub release: String,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid DSN: {0}")]
    InvalidDsn(#[from] sentry::types::ParseDsnError),

    #[error("event dropped by the client")]
    Dropped,

    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for captured events.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn capture(&self, event: &Event) -> Result<(), TelemetryError>;
}

// ── LogSink ───────────────────────────────────────────────────────────────────

/// Writes events to the process log. Used when no DSN is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

#[async_trait]
impl TelemetrySink for LogSink {
    async fn capture(&self, event: &Event) -> Result<(), TelemetryError> {
        let user = event.user.as_ref().map(|u| u.username.as_str()).unwrap_or("anonymous");
        let kind = event.kind.unwrap_or("UNEXPECTED");
        match event.severity {
            Severity::Error => error!(
                kind, user, method = %event.method, path = %event.path,
                location = ?event.location, causes = ?event.causes, "{}", event.message
            ),
            Severity::Warning => warn!(
                kind, user, method = %event.method, path = %event.path,
                location = ?event.location, causes = ?event.causes, "{}", event.message
            ),
        }
        Ok(())
    }
}

// ── SentrySink ────────────────────────────────────────────────────────────────

/// Sends events to Sentry.
///
/// Owns its own client and hub instead of the process-global one, so several
/// sinks (and tests) can coexist. Each event is captured inside a scope that
/// carries the user, the level and the startup tags. Delivery happens on the
/// client's background transport; the client is flushed when the sink drops.
pub struct SentrySink {
    hub: sentry::Hub,
    client: Arc<sentry::Client>,
    timeout: Duration,
}

impl SentrySink {
    /// Builds a client for `config.dsn` with the default HTTP transport.
    pub fn new(config: &TelemetryConfig) -> Result<Self, TelemetryError> {
        let dsn = config.dsn.as_deref().unwrap_or_default().parse()?;
        Ok(Self::with_options(config, sentry::ClientOptions {
            dsn: Some(dsn),
            transport: Some(Arc::new(sentry::transports::DefaultTransportFactory)),
            ..Default::default()
        }))
    }

    /// Builds a client from `options`, filling in environment and release
    /// from `config`.
    pub fn with_options(config: &TelemetryConfig, options: sentry::ClientOptions) -> Self {
        let options = sentry::ClientOptions {
            environment: Some(config.environment.to_string().into()),
            release: Some(config.release.clone().into()),
            attach_stacktrace: true,
            shutdown_timeout: config.timeout,
            ..options
        };
        let client = Arc::new(sentry::Client::with_options(options));
        let hub = sentry::Hub::new(Some(Arc::clone(&client)), Arc::new(sentry::Scope::default()));
        Self { hub, client, timeout: config.timeout }
    }
}

impl fmt::Debug for SentrySink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SentrySink")
            .field("enabled", &self.client.is_enabled())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Drop for SentrySink {
    fn drop(&mut self) {
        if !self.client.close(Some(self.timeout)) {
            warn!("sentry did not flush pending events before shutdown");
        }
    }
}

#[async_trait]
impl TelemetrySink for SentrySink {
    async fn capture(&self, event: &Event) -> Result<(), TelemetryError> {
        let id = self.hub.with_scope(
            |scope| {
                scope.set_user(event.user.as_ref().map(|u| sentry::protocol::User {
                    id: Some(u.id.clone()),
                    username: Some(u.username.clone()),
                    email: Some(u.email.clone()),
                    ..Default::default()
                }));
                scope.set_level(Some(sentry_level(event.severity)));
                for (key, value) in &event.tags {
                    scope.set_tag(key, value);
                }
            },
            || self.hub.capture_event(sentry_event(event)),
        );

        if id.is_nil() {
            return Err(TelemetryError::Dropped);
        }
        Ok(())
    }
}

fn sentry_level(severity: Severity) -> sentry::protocol::Level {
    match severity {
        Severity::Error   => sentry::protocol::Level::Error,
        Severity::Warning => sentry::protocol::Level::Warning,
    }
}

/// The exception carries the kind as its type and, when known, a single
/// frame pointing at the code that raised the error.
fn sentry_event(event: &Event) -> sentry::protocol::Event<'static> {
    use sentry::protocol::{Exception, Frame, Map, Stacktrace};

    let stacktrace = event.location.as_deref().and_then(parse_location).map(|(file, line, col)| {
        Stacktrace {
            frames: vec![Frame {
                filename: Some(file.to_owned()),
                lineno: Some(line),
                colno: Some(col),
                in_app: Some(true),
                ..Default::default()
            }],
            ..Default::default()
        }
    });

    let mut extra = Map::new();
    extra.insert("method".to_owned(), event.method.clone().into());
    extra.insert("path".to_owned(), event.path.clone().into());
    if !event.causes.is_empty() {
        extra.insert("causes".to_owned(), event.causes.clone().into());
    }

    sentry::protocol::Event {
        level: sentry_level(event.severity),
        message: Some(event.message.clone()),
        culprit: event.location.clone(),
        exception: vec![Exception {
            ty: event.kind.unwrap_or("UNEXPECTED").to_owned(),
            value: Some(event.message.clone()),
            stacktrace,
            ..Default::default()
        }]
        .into(),
        extra,
        ..Default::default()
    }
}

/// Splits `file:line:column`.
fn parse_location(location: &str) -> Option<(&str, u64, u64)> {
    let mut parts = location.rsplitn(3, ':');
    let col = parts.next()?.parse().ok()?;
    let line = parts.next()?.parse().ok()?;
    Some((parts.next()?, line, col))
}

// ── RecordingSink ─────────────────────────────────────────────────────────────

/// Keeps every event in memory, for tests and local runs.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every capture fails. Events are still recorded.
    pub fn failing() -> Self {
        Self { events: Mutex::default(), failing: AtomicBool::new(true) }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl TelemetrySink for RecordingSink {
    async fn capture(&self, event: &Event) -> Result<(), TelemetryError> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).push(event.clone());
        if self.failing.load(Ordering::Relaxed) {
            return Err(TelemetryError::Unavailable("recording sink set to fail".to_owned()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> Event {
        Event {
            severity: Severity::Warning,
            kind: Some("OPERATION_FORBIDDEN"),
            message: "403 - Forbidden operation".to_owned(),
            location: Some("src/app.rs:90:20".to_owned()),
            causes: Vec::new(),
            user: Some(EventUser {
                id: "u1".to_owned(),
                username: "alice".to_owned(),
                email: "alice@example.com".to_owned(),
            }),
            method: "GET".to_owned(),
            path: "/getGame/bob".to_owned(),
            environment: Environment::Production,
            release: "1.0.0".to_owned(),
            tags: BTreeMap::from([("service".to_owned(), "api".to_owned())]),
        }
    }

    #[test]
    fn event_serializes_with_lowercase_names() {
        let json = serde_json::to_value(event()).unwrap();
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["kind"], "OPERATION_FORBIDDEN");
        assert_eq!(json["user"]["username"], "alice");
        assert_eq!(json["environment"], "production");
        assert_eq!(json["tags"]["service"], "api");
    }

    #[tokio::test]
    async fn recording_sink_records_even_when_failing() {
        let sink = RecordingSink::failing();
        assert!(sink.capture(&event()).await.is_err());
        assert_eq!(sink.events().len(), 1);
    }

    #[tokio::test]
    async fn log_sink_accepts_every_event() {
        assert!(LogSink.capture(&event()).await.is_ok());
    }

    fn sentry_sink() -> (SentrySink, Arc<sentry::test::TestTransport>) {
        let transport = sentry::test::TestTransport::new();
        let config = TelemetryConfig {
            environment: Environment::Production,
            release: "1.0.0".to_owned(),
            ..TelemetryConfig::default()
        };
        let sink = SentrySink::with_options(&config, sentry::ClientOptions {
            dsn: Some("https://public@sentry.invalid/1".parse().unwrap()),
            transport: Some(Arc::new(transport.clone())),
            ..Default::default()
        });
        (sink, transport)
    }

    #[tokio::test]
    async fn sentry_sink_scopes_user_level_and_tags() {
        let (sink, transport) = sentry_sink();
        sink.capture(&event()).await.unwrap();

        let events = transport.fetch_and_clear_events();
        assert_eq!(events.len(), 1);
        let captured = &events[0];
        assert_eq!(captured.level, sentry::protocol::Level::Warning);
        assert_eq!(captured.tags["service"], "api");
        assert_eq!(captured.environment.as_deref(), Some("production"));
        assert_eq!(captured.release.as_deref(), Some("1.0.0"));

        let user = captured.user.as_ref().unwrap();
        assert_eq!(user.id.as_deref(), Some("u1"));
        assert_eq!(user.username.as_deref(), Some("alice"));
        assert_eq!(user.email.as_deref(), Some("alice@example.com"));
    }

    #[tokio::test]
    async fn sentry_event_points_at_the_raise_site() {
        let (sink, transport) = sentry_sink();
        sink.capture(&event()).await.unwrap();

        let events = transport.fetch_and_clear_events();
        let captured = &events[0];
        assert_eq!(captured.culprit.as_deref(), Some("src/app.rs:90:20"));

        let exception = &captured.exception.values[0];
        assert_eq!(exception.ty, "OPERATION_FORBIDDEN");
        let frame = &exception.stacktrace.as_ref().unwrap().frames[0];
        assert_eq!(frame.filename.as_deref(), Some("src/app.rs"));
        assert_eq!((frame.lineno, frame.colno), (Some(90), Some(20)));
    }

    #[test]
    fn sentry_sink_rejects_a_malformed_dsn() {
        let config = TelemetryConfig { dsn: Some("not a dsn".to_owned()), ..TelemetryConfig::default() };
        assert!(matches!(SentrySink::new(&config), Err(TelemetryError::InvalidDsn(_))));
    }

    #[test]
    fn location_splits_from_the_right() {
        assert_eq!(parse_location("src/app.rs:90:20"), Some(("src/app.rs", 90, 20)));
        assert_eq!(parse_location("C:/src/app.rs:1:2"), Some(("C:/src/app.rs", 1, 2)));
        assert_eq!(parse_location("src/app.rs"), None);
    }
}
