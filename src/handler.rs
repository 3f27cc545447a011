//! Route handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! The router needs to hold handlers of *different* types in a single
//! `HashMap<Method, Tree>`, so each one is hidden behind a trait object
//! (`dyn ErasedHandler`):
//!
//! ```text
//! async fn get_game(req: Request) -> Result<Outcome, Failure> { … }
//!        ↓ router.on(Method::Get, "/getGame/{userId}", get_game)
//! get_game.into_boxed_handler()                    ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(get_game))                    ← stored as BoxedHandler
//!        ↓
//! handler.call(req)  at request time               ← one vtable dispatch
//!        ↓
//! Box::pin(async { get_game(req).await.into_outcome() })
//! ```
//!
//! Handlers receive the request by value, context included. Whatever they
//! return is normalized to an [`Outcome`] through [`IntoOutcome`], so a
//! handler may return a plain [`Response`], an [`Outcome`], or a
//! `Result<_, Failure>` and use `?` on its external calls.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::fault::Failure;
use crate::middleware::Outcome;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::status::Status;

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to an [`Outcome`].
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Outcome> + Send + 'static>>;

#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── IntoOutcome ───────────────────────────────────────────────────────────────

/// Conversion of a handler's return value into an [`Outcome`].
pub trait IntoOutcome {
    fn into_outcome(self) -> Outcome;
}

impl IntoOutcome for Outcome {
    fn into_outcome(self) -> Outcome { self }
}

impl IntoOutcome for Response {
    fn into_outcome(self) -> Outcome { Outcome::Respond(self) }
}

impl IntoOutcome for Status {
    fn into_outcome(self) -> Outcome { Outcome::Respond(self.into_response()) }
}

impl IntoOutcome for Failure {
    fn into_outcome(self) -> Outcome { Outcome::Fail(self) }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoOutcome,
    E: Into<Failure>,
{
    fn into_outcome(self) -> Outcome {
        match self {
            Ok(v)  => v.into_outcome(),
            Err(e) => Outcome::Fail(e.into()),
        }
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// Automatically satisfied for any function or closure with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoOutcome
/// ```
///
/// Sealed: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Bridges a concrete handler `F` to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_outcome() })
    }
}
