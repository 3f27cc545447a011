//! Session → user resolution.
//!
//! The stage never rejects a request. Without a session, or when the session
//! points to an account that no longer exists, the request simply continues
//! as anonymous. Only a fault of the directory itself is forwarded, as an
//! unexpected failure.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::fault::Failure;
use crate::identity::UserDirectory;
use crate::middleware::{Outcome, Stage};
use crate::request::Request;

/// Resolves the session's identity reference through a [`UserDirectory`].
pub struct Authenticate {
    directory: Arc<dyn UserDirectory>,
}

impl Authenticate {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Stage for Authenticate {
    async fn call(&self, req: &mut Request) -> Outcome {
        let Some(reference) = req.ctx().session_user().map(str::to_owned) else {
            return Outcome::Continue;
        };

        let me = match self.directory.find_by_handle(&reference).await {
            Ok(Some(me)) => me,
            Ok(None) => {
                debug!(session = %reference, "stale session, continuing anonymous");
                return Outcome::Continue;
            }
            Err(e) => {
                warn!(session = %reference, "user lookup failed: {e}");
                return Outcome::Fail(Failure::from(e));
            }
        };

        let ctx = req.ctx_mut();
        if let Some(session) = ctx.session_mut() {
            session.user = Some(me.handle.clone());
        }
        ctx.set_me(me);
        Outcome::Continue
    }
}
