//! Per-request state.
//!
//! A [`RequestContext`] is created empty for every inbound request, filled in
//! by the middleware stages, read by the route handlers and finally by the
//! terminal error handler. It lives inside the [`Request`](crate::Request)
//! and is dropped with it; it is never shared between requests.

use serde_json::{Map, Value};

use crate::identity::UserIdentity;

/// Client-held session, decoded from the session cookie.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Session {
    /// Identity reference carried by the token. Rewritten to the canonical
    /// handle once the user is resolved.
    pub user: Option<String>,
}

/// Typed per-request state passed through the chain.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    session: Option<Session>,
    me: Option<UserIdentity>,
    locals: Map<String, Value>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    pub fn set_session(&mut self, session: Session) {
        self.session = Some(session);
    }

    /// The identity reference of the session, if any.
    pub fn session_user(&self) -> Option<&str> {
        self.session.as_ref()?.user.as_deref()
    }

    /// The resolved user, `None` for anonymous requests.
    pub fn me(&self) -> Option<&UserIdentity> {
        self.me.as_ref()
    }

    pub fn set_me(&mut self, me: UserIdentity) {
        self.me = Some(me);
    }

    /// Response-local data used to compose views.
    pub fn locals(&self) -> &Map<String, Value> {
        &self.locals
    }

    pub fn insert_local(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.locals.insert(key.into(), value.into());
    }
}
