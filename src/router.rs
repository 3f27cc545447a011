//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. The router is itself a
//! [`Stage`]: a matched handler's [`Outcome`] is the stage's outcome, and an
//! unmatched path yields [`Outcome::Continue`] so later stages (another
//! router, the not-found fallback) get their turn.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::middleware::{Outcome, Stage};
use crate::request::Request;

/// The application router.
///
/// Build it once at startup and add it to a [`Chain`](crate::middleware::Chain).
/// Each [`Router::on`] call returns `self` so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics on a malformed or conflicting path. Routes are fixed at startup.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.add(method, path, handler)
    }

    /// Shorthand for `on(Method::Get, ..)`.
    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.add(Method::Get, path, handler)
    }

    fn add(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub(crate) fn lookup(
        &self,
        method: Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl Stage for Router {
    async fn call(&self, req: &mut Request) -> Outcome {
        let Some((handler, params)) = self.lookup(req.method(), req.path()) else {
            return Outcome::Continue;
        };
        let mut routed = req.clone();
        routed.params = params;
        handler.call(routed).await
    }
}
