//! Session cookie decoding.
//!
//! Reads the client-held session token from a named cookie and stores it in
//! the request context. Signing and encryption of the token belong to the
//! layer in front of warden; here the cookie value is the identity reference.

use async_trait::async_trait;

use crate::context::Session;
use crate::middleware::{Outcome, Stage};
use crate::request::Request;

/// Decodes the session cookie into [`Session`]. Never fails, never responds.
pub struct SessionCookie {
    name: String,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Stage for SessionCookie {
    async fn call(&self, req: &mut Request) -> Outcome {
        let user = req.cookie(&self.name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned);

        req.ctx_mut().set_session(Session { user });
        Outcome::Continue
    }
}
