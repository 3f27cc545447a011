//! Error kinds and the sealed registry that holds them.
//!
//! An [`ErrorKind`] is a named, immutable record: HTTP status, [`Severity`]
//! and a short description. Handlers never invent kinds on the fly. Every
//! kind the application may raise is defined once at startup, collected into
//! a [`RegistryBuilder`], and sealed into an [`ErrorRegistry`]. Once sealed,
//! the registry has no mutating API; share it behind an `Arc`.
//!
//! ```rust
//! use warden::kind::{ErrorRegistry, MUST_CONNECT, Severity};
//!
//! let registry = ErrorRegistry::standard()?;
//! let kind = registry.get("MUST_CONNECT").unwrap();
//! assert_eq!(kind.status(), 420);
//! assert_eq!(kind.severity(), Severity::Error);
//! assert!(registry.contains(&MUST_CONNECT));
//! # Ok::<(), warden::Error>(())
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::Error;

// ── Severity ──────────────────────────────────────────────────────────────────

/// How loudly an error is reported to operators.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error   => "error",
            Self::Warning => "warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── ErrorKind ─────────────────────────────────────────────────────────────────

/// A named error classification: status code, severity, description.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct ErrorKind {
    name: &'static str,
    status: u16,
    severity: Severity,
    description: &'static str,
}

impl ErrorKind {
    /// Defines a kind. Usable in `const` items, where an out-of-range status
    /// is a compile error.
    ///
    /// # Panics
    ///
    /// Panics if `status` is not within `100..=599`.
    pub const fn new(
        name: &'static str,
        status: u16,
        severity: Severity,
        description: &'static str,
    ) -> Self {
        assert!(status >= 100 && status <= 599, "http status must be within 100..=599");
        Self { name, status, severity, description }
    }

    /// Runtime counterpart of [`ErrorKind::new`].
    pub fn try_new(
        name: &'static str,
        status: u16,
        severity: Severity,
        description: &'static str,
    ) -> Result<Self, Error> {
        if !(100..=599).contains(&status) {
            return Err(Error::InvalidKind { name, reason: format!("status {status} out of range") });
        }
        if name.is_empty() {
            return Err(Error::InvalidKind { name, reason: "empty name".to_owned() });
        }
        Ok(Self { name, status, severity, description })
    }

    pub fn name(&self) -> &'static str { self.name }
    pub fn status(&self) -> u16 { self.status }
    pub fn severity(&self) -> Severity { self.severity }
    pub fn description(&self) -> &'static str { self.description }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.status)
    }
}

/// Caller identity resolved but not authorized for the resource.
pub const OPERATION_FORBIDDEN: ErrorKind =
    ErrorKind::new("OPERATION_FORBIDDEN", 403, Severity::Warning, "Forbidden operation");

/// Referenced resource does not exist.
pub const MODEL_NOT_FOUND: ErrorKind =
    ErrorKind::new("MODEL_NOT_FOUND", 404, Severity::Warning, "Model not found");

/// Action requires an authenticated session. 420 is intentional.
pub const MUST_CONNECT: ErrorKind =
    ErrorKind::new("MUST_CONNECT", 420, Severity::Error, "User must connect");

// ── Registry ──────────────────────────────────────────────────────────────────

/// Collects kinds at startup. Consumed by [`RegistryBuilder::seal`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    kinds: BTreeMap<&'static str, ErrorKind>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `kind`. A second kind with the same name is rejected.
    pub fn define(mut self, kind: ErrorKind) -> Result<Self, Error> {
        if self.kinds.contains_key(kind.name) {
            return Err(Error::InvalidKind { name: kind.name, reason: "already defined".to_owned() });
        }
        self.kinds.insert(kind.name, kind);
        Ok(self)
    }

    pub fn seal(self) -> ErrorRegistry {
        ErrorRegistry { kinds: self.kinds }
    }
}

/// Immutable name → kind mapping.
#[derive(Debug, Clone)]
pub struct ErrorRegistry {
    kinds: BTreeMap<&'static str, ErrorKind>,
}

impl ErrorRegistry {
    /// The three kinds the application raises.
    pub fn standard() -> Result<Self, Error> {
        Ok(RegistryBuilder::new()
            .define(OPERATION_FORBIDDEN)?
            .define(MODEL_NOT_FOUND)?
            .define(MUST_CONNECT)?
            .seal())
    }

    pub fn get(&self, name: &str) -> Option<&ErrorKind> {
        self.kinds.get(name)
    }

    /// True only if a kind with this name is registered *and* identical.
    pub fn contains(&self, kind: &ErrorKind) -> bool {
        self.kinds.get(kind.name).is_some_and(|k| k == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ErrorKind> {
        self.kinds.values()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
