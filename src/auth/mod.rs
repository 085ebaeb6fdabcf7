//! Session acquisition
//!
//! Two ways into the portal exist: a username/password login
//! ([`CredentialAuthenticator`]) and a guest link ([`GuestLinkAuthenticator`]). Both
//! first try the cached session, confirm it with a live probe, and only then fall back
//! to a fresh login. Caching goes through the shared [`SessionPersistence`] helper.
//!
//! After the portal rejects a session, [`Authenticator::reauthenticate`] drops the
//! cached record and logs in again without probing it.

pub mod credential;
pub mod guest;

use crate::error::PortalResult;
use crate::session::{Session, SessionKind, SessionStore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

pub use credential::CredentialAuthenticator;
pub use guest::{guest_account_id, GuestLinkAuthenticator};

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Key the session is cached under
    fn account_id(&self) -> &str;

    /// A session the portal currently accepts
    async fn authenticate(&self) -> PortalResult<Session>;

    /// Fresh login after the portal rejected the current session
    async fn reauthenticate(&self) -> PortalResult<Session>;

    /// Persist a session after a request it authorized
    fn remember(&self, session: &Session);
}

/// Cache access shared by the authenticators
#[derive(Clone)]
pub struct SessionPersistence {
    store: Arc<dyn SessionStore>,
    account_id: String,
}

impl SessionPersistence {
    pub fn new(store: Arc<dyn SessionStore>, account_id: impl Into<String>) -> Self {
        Self {
            store,
            account_id: account_id.into(),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Cached session of the expected kind
    pub fn load(&self, kind: SessionKind) -> Option<Session> {
        let session = self.store.load(&self.account_id)?;
        if session.kind != kind {
            debug!(account_id = %self.account_id, "Cached session has a different kind, ignoring it");
            return None;
        }
        Some(session)
    }

    /// Drop the cached record so it is never offered again
    pub fn forget(&self) {
        match self.store.remove(&self.account_id) {
            Ok(()) => debug!(account_id = %self.account_id, "Cached session discarded"),
            Err(e) => warn!(account_id = %self.account_id, error = %e, "Failed to discard cached session"),
        }
    }

    /// Store a copy stamped with the current time. Failures are logged, not raised.
    pub fn save(&self, session: &Session) {
        let mut stamped = session.clone();
        stamped.touch();
        if let Err(e) = self.store.save(&self.account_id, &stamped) {
            warn!(account_id = %self.account_id, error = %e, "Failed to persist session");
        }
    }
}
