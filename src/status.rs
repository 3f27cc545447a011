//! HTTP status codes used by warden itself.
//!
//! Anything that takes a status accepts `impl Into<u16>`, so [`Status`] and
//! raw codes mix freely. Error kinds carry raw codes (including the
//! non-standard 420).
//!
//! ```rust
//! use warden::{Response, Status};
//!
//! Response::status(Status::NotFound);
//! Response::status(420u16);
//! ```

/// Status codes the framework and built-in handlers produce.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    Ok,                  // 200
    Found,               // 302
    BadRequest,          // 400
    NotFound,            // 404
    MethodNotAllowed,    // 405
    InternalServerError, // 500
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        match s {
            Status::Ok                  => 200,
            Status::Found               => 302,
            Status::BadRequest          => 400,
            Status::NotFound            => 404,
            Status::MethodNotAllowed    => 405,
            Status::InternalServerError => 500,
        }
    }
}
