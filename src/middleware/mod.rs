//! Middleware chain.
//!
//! A request passes through an ordered list of [`Stage`]s. Each stage looks
//! at the request (and may update its context), then returns one
//! [`Outcome`]:
//!
//! | Outcome | Driver does |
//! |---|---|
//! | `Continue` | runs the next stage |
//! | `Respond(res)` | sends `res`, stops |
//! | `Fail(failure)` | hands `failure` to the [`ErrorHandler`], sends its response, stops |
//!
//! When every stage continues, the request was not handled by anyone and the
//! driver answers `404` with an empty body. The error handler is reached only
//! through an explicit `Fail`, never by falling off the end.
//!
//! A panic inside a stage is caught at the driver and forwarded as an
//! unexpected failure, exactly like a returned error.
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use warden::middleware::{Chain, auth::Authenticate, session::SessionCookie};
//! # use warden::{ErrorHandler, Router, identity::MemoryDirectory, kind::ErrorRegistry};
//! # use warden::telemetry::{LogSink, TelemetryConfig};
//! let errors = ErrorHandler::new(
//!     Arc::new(ErrorRegistry::standard()?),
//!     Arc::new(LogSink),
//!     TelemetryConfig::default(),
//! );
//! let chain = Chain::new(errors)
//!     .stage(SessionCookie::new("session"))
//!     .stage(Authenticate::new(Arc::new(MemoryDirectory::new())))
//!     .stage(Router::new());
//! # Ok::<(), warden::Error>(())
//! ```

use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{Instrument, debug, info_span};

use crate::fault::Failure;
use crate::reporter::ErrorHandler;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

pub mod auth;
pub mod session;

/// What a stage decided.
#[derive(Debug)]
pub enum Outcome {
    /// Not handled here; try the next stage.
    Continue,
    /// Final response.
    Respond(Response),
    /// Forward to the terminal error handler.
    Fail(Failure),
}

/// One step of the chain.
#[async_trait]
pub trait Stage: Send + Sync {
    async fn call(&self, req: &mut Request) -> Outcome;
}

/// The ordered stage list plus the terminal error handler.
pub struct Chain {
    stages: Vec<Box<dyn Stage>>,
    errors: ErrorHandler,
}

impl Chain {
    pub fn new(errors: ErrorHandler) -> Self {
        Self { stages: Vec::new(), errors }
    }

    /// Appends a stage. Stages run in the order they are added.
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Runs one request through the chain and produces exactly one response.
    pub async fn handle(&self, req: Request) -> Response {
        let span = info_span!("request", method = %req.method(), path = %req.path());
        self.drive(req).instrument(span).await
    }

    async fn drive(&self, mut req: Request) -> Response {
        for (index, stage) in self.stages.iter().enumerate() {
            let outcome = AssertUnwindSafe(stage.call(&mut req))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Outcome::Fail(Failure::unexpected(panic_message(&*panic))));

            match outcome {
                Outcome::Continue => {
                    debug!(stage = index, "continue");
                }
                Outcome::Respond(res) => {
                    debug!(stage = index, status = res.status_code(), "responded");
                    return res;
                }
                Outcome::Fail(failure) => {
                    debug!(stage = index, "failed");
                    return self.errors.handle(&req, failure).await;
                }
            }
        }

        debug!("no stage handled the request");
        Response::status(Status::NotFound)
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::kind::{ErrorRegistry, OPERATION_FORBIDDEN};
    use crate::method::Method;
    use crate::telemetry::{RecordingSink, TelemetryConfig};

    struct Fixed(fn() -> Outcome, Arc<AtomicUsize>);

    #[async_trait]
    impl Stage for Fixed {
        async fn call(&self, _req: &mut Request) -> Outcome {
            self.1.fetch_add(1, Ordering::SeqCst);
            (self.0)()
        }
    }

    struct Panics;

    #[async_trait]
    impl Stage for Panics {
        async fn call(&self, _req: &mut Request) -> Outcome {
            panic!("boom")
        }
    }

    fn chain(sink: Arc<RecordingSink>) -> Chain {
        Chain::new(ErrorHandler::new(
            Arc::new(ErrorRegistry::standard().unwrap()),
            sink,
            TelemetryConfig::default(),
        ))
    }

    fn get() -> Request {
        Request::new(Method::Get, "/")
    }

    #[tokio::test]
    async fn stages_run_in_order_until_one_responds() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let third = Arc::new(AtomicUsize::new(0));

        let res = chain(Arc::new(RecordingSink::new()))
            .stage(Fixed(|| Outcome::Continue, first.clone()))
            .stage(Fixed(|| Outcome::Respond(Response::text("hi")), second.clone()))
            .stage(Fixed(|| Outcome::Continue, third.clone()))
            .handle(get())
            .await;

        assert_eq!(res.status_code(), 200);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(third.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn falling_off_the_end_is_a_bare_404_without_a_report() {
        let sink = Arc::new(RecordingSink::new());
        let res = chain(sink.clone())
            .stage(Fixed(|| Outcome::Continue, Arc::default()))
            .handle(get())
            .await;

        assert_eq!(res.status_code(), 404);
        assert!(res.body().is_empty());
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn failure_skips_remaining_stages() {
        let after = Arc::new(AtomicUsize::new(0));
        let sink = Arc::new(RecordingSink::new());

        let res = chain(sink.clone())
            .stage(Fixed(|| Outcome::Fail(OPERATION_FORBIDDEN.into()), Arc::default()))
            .stage(Fixed(|| Outcome::Continue, after.clone()))
            .handle(get())
            .await;

        assert_eq!(res.status_code(), 403);
        assert_eq!(after.load(Ordering::SeqCst), 0);
        assert_eq!(sink.events().len(), 1);
    }

    #[tokio::test]
    async fn panicking_stage_becomes_an_unexpected_500() {
        let sink = Arc::new(RecordingSink::new());
        let res = chain(sink.clone()).stage(Panics).handle(get()).await;

        assert_eq!(res.status_code(), 500);
        assert!(res.body().is_empty());
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert!(events[0].kind.is_none());
        assert!(events[0].message.contains("boom"));
    }
}
