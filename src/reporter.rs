//! The terminal error handler.
//!
//! Entered at most once per request, when a stage forwards a
//! [`Failure`]. It always produces exactly one response and never calls
//! back into the chain:
//!
//! 1. status and severity come from the failure's [`ErrorKind`] when it is a
//!    registered [`ApplicationError`]; anything else is `500` / `error`;
//! 2. an [`Event`] is built, attributed to the resolved user if there is one;
//! 3. the event goes to the [`TelemetrySink`], bounded by the configured
//!    timeout. Sink errors, timeouts and panics are logged and swallowed;
//! 4. the response carries the status only. No message, no body.
//!
//! [`ApplicationError`]: crate::ApplicationError

use std::collections::BTreeMap;
use std::error::Error as _;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{error, warn};

use crate::fault::Failure;
use crate::kind::{ErrorKind, ErrorRegistry, Severity};
use crate::middleware::panic_message;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;
use crate::telemetry::{Event, EventUser, TelemetryConfig, TelemetrySink};

/// Maps failures to statuses and reports them.
#[derive(Clone)]
pub struct ErrorHandler {
    registry: Arc<ErrorRegistry>,
    sink: Arc<dyn TelemetrySink>,
    config: TelemetryConfig,
}

impl ErrorHandler {
    pub fn new(
        registry: Arc<ErrorRegistry>,
        sink: Arc<dyn TelemetrySink>,
        config: TelemetryConfig,
    ) -> Self {
        Self { registry, sink, config }
    }

    pub fn registry(&self) -> &ErrorRegistry {
        &self.registry
    }

    /// Status and severity for `failure`.
    ///
    /// An application error whose kind is not in the registry is treated as
    /// unexpected.
    pub fn classify(&self, failure: &Failure) -> (u16, Severity) {
        status_and_severity(self.registered_kind(failure))
    }

    pub async fn handle(&self, req: &Request, failure: Failure) -> Response {
        let kind = self.registered_kind(&failure).copied();
        let (status, severity) = status_and_severity(kind.as_ref());
        let event = self.event(req, &failure, kind, severity);

        // The sink may panic before handing back its future, so the call itself
        // runs inside the guarded future.
        let capture = AssertUnwindSafe(async { self.sink.capture(&event).await }).catch_unwind();
        match tokio::time::timeout(self.config.timeout, capture).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => warn!(status, "telemetry capture failed: {e}"),
            Ok(Err(panic)) => error!(status, "telemetry sink panicked: {}", panic_message(&*panic)),
            Err(_)         => warn!(status, timeout = ?self.config.timeout, "telemetry capture timed out"),
        }

        Response::status(status)
    }

    fn registered_kind<'a>(&self, failure: &'a Failure) -> Option<&'a ErrorKind> {
        let kind = failure.kind()?;
        if self.registry.contains(kind) {
            Some(kind)
        } else {
            warn!(kind = kind.name(), "application error with unregistered kind");
            None
        }
    }

    fn event(&self, req: &Request, failure: &Failure, kind: Option<ErrorKind>, severity: Severity) -> Event {
        let user = req.me().map(|me| EventUser {
            id: me.id.clone(),
            username: me.handle.clone(),
            email: me.email.clone(),
        });

        let mut causes = Vec::new();
        let mut source = failure.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        Event {
            severity,
            kind: kind.map(|k| k.name()),
            message: failure.to_string(),
            location: failure.location().map(ToString::to_string),
            causes,
            user,
            method: req.method().to_string(),
            path: req.path().to_owned(),
            environment: self.config.environment,
            release: self.config.release.clone(),
            tags: BTreeMap::from([("service".to_owned(), self.config.service.clone())]),
        }
    }
}

fn status_and_severity(kind: Option<&ErrorKind>) -> (u16, Severity) {
    match kind {
        Some(kind) => (kind.status(), kind.severity()),
        None       => (Status::InternalServerError.into(), Severity::Error),
    }
}
