//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;

use crate::context::RequestContext;
use crate::identity::UserIdentity;
use crate::method::Method;

/// An incoming HTTP request plus its per-request [`RequestContext`].
#[derive(Clone, Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Option<String>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) ctx: RequestContext,
}

impl Request {
    /// Builds a request by hand. The server uses this too; tests use it to
    /// drive a [`Chain`](crate::middleware::Chain) without a socket.
    ///
    /// `target` may carry a query string: `"/connect?redirect=/games"`.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p.to_owned(), Some(q.to_owned())),
            None         => (target.to_owned(), None),
        };
        Self {
            method,
            path,
            query,
            headers: Vec::new(),
            body: Bytes::new(),
            params: HashMap::new(),
            ctx: RequestContext::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a cookie value from the `cookie` header.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("cookie"))
            .flat_map(|(_, v)| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }

    /// Returns the first query-string value for `key`. No percent-decoding.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.as_deref()?
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/getGame/{userId}`, `req.param("userId")` on `/getGame/42`
    /// returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn ctx(&self) -> &RequestContext { &self.ctx }
    pub fn ctx_mut(&mut self) -> &mut RequestContext { &mut self.ctx }

    /// Shortcut for `req.ctx().me()`.
    pub fn me(&self) -> Option<&UserIdentity> { self.ctx.me() }
}
