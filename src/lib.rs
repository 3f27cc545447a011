//! # warden
//!
//! Request handling for a small web backend: session-based authentication,
//! a closed taxonomy of application errors, and one terminal error handler
//! that maps every failure to a status code and reports it to an external
//! monitoring service.
//!
//! ## The contract
//!
//! Every request runs through an ordered [`Chain`](middleware::Chain) of
//! stages. Each stage returns an [`Outcome`]: continue, respond, or fail.
//!
//! - Expected failures are raised as an [`ApplicationError`] bound to a
//!   registered [`ErrorKind`](kind::ErrorKind). Status and severity come
//!   from the kind.
//! - Anything else (storage faults, panics) is unexpected: `500`, severity
//!   `error`.
//! - Clients only ever see the bare status. Operators see the kind, the
//!   message, the cause chain and the user through the telemetry sink.
//! - A failing, slow or panicking telemetry sink never prevents the response.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warden::{Config, Server, app};
//! use warden::game::MemoryGameStore;
//! use warden::identity::MemoryDirectory;
//! use warden::telemetry::LogSink;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), warden::Error> {
//!     let config = Config::from_env()?;
//!     let chain = app::build(&config, app::Services {
//!         directory: Arc::new(MemoryDirectory::new()),
//!         games: Arc::new(MemoryGameStore::new()),
//!         sink: Arc::new(LogSink),
//!     })?;
//!     Server::bind(&config.listen_addr())?.serve(chain).await
//! }
//! ```

mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod app;
pub mod config;
pub mod context;
pub mod fault;
pub mod game;
pub mod identity;
pub mod kind;
pub mod middleware;
pub mod observability;
pub mod reporter;
pub mod telemetry;

pub use config::Config;
pub use error::Error;
pub use fault::{ApplicationError, Failure};
pub use handler::{Handler, IntoOutcome};
pub use method::Method;
pub use middleware::Outcome;
pub use reporter::ErrorHandler;
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use status::Status;
