use super::{Authenticator, SessionPersistence};
use crate::error::{ConfigError, PortalError, PortalResult};
use crate::portal::{PortalClient, PortalHttp};
use crate::session::{Session, SessionKind};
use async_trait::async_trait;
use reqwest::Url;
use std::sync::Arc;
use tracing::{info, warn};

/// `guest_<token>` for a link of the form `…/mc/<token>`
pub fn guest_account_id(guest_url: &str) -> Option<String> {
    let url = Url::parse(guest_url).ok()?;
    let mut segments = url.path_segments()?;
    segments.find(|segment| *segment == "mc")?;
    let token = segments.next().filter(|token| !token.is_empty())?;
    Some(format!("guest_{token}"))
}

/// Access through a shared guest link, no credentials involved
pub struct GuestLinkAuthenticator {
    http: PortalHttp,
    portal: Arc<dyn PortalClient>,
    guest_url: Url,
    persistence: SessionPersistence,
}

impl GuestLinkAuthenticator {
    /// Fails when the link carries no guest token
    pub fn new(
        http: PortalHttp,
        portal: Arc<dyn PortalClient>,
        guest_url: &str,
        persistence: SessionPersistence,
    ) -> Result<Self, ConfigError> {
        let parsed = Url::parse(guest_url)
            .map_err(|e| ConfigError::Invalid(format!("guest link is not a url: {e}")))?;
        if guest_account_id(guest_url).is_none() {
            return Err(ConfigError::Invalid("guest link has no /mc/<token> part".to_string()));
        }

        Ok(Self {
            http,
            portal,
            guest_url: parsed,
            persistence,
        })
    }

    /// The stored session is valid when the landing page still exposes a contract id
    async fn probe(&self, session: &mut Session) -> bool {
        match self.portal.guest_contract_id(session).await {
            Ok(Some(_)) => true,
            Ok(None) => {
                info!(account_id = %self.account_id(), "Cached guest session shows no contract");
                false
            }
            Err(e) => {
                info!(account_id = %self.account_id(), error = %e, "Cached guest session rejected");
                false
            }
        }
    }

    async fn open_link(&self) -> PortalResult<Session> {
        let mut session = Session::new(SessionKind::Guest);
        let response = self.http.get_page(&mut session, self.guest_url.clone()).await?;

        if response.status != 200 {
            return Err(PortalError::AuthFailed(format!(
                "guest link answered with status {}",
                response.status
            )));
        }

        info!(account_id = %self.account_id(), "Opened guest session");
        Ok(session)
    }

    async fn fresh_session(&self) -> PortalResult<Session> {
        let session = self.open_link().await.inspect_err(|e| {
            warn!(account_id = %self.account_id(), error = %e, "Guest login failed");
        })?;
        self.persistence.save(&session);
        Ok(session)
    }
}

#[async_trait]
impl Authenticator for GuestLinkAuthenticator {
    fn account_id(&self) -> &str {
        self.persistence.account_id()
    }

    async fn authenticate(&self) -> PortalResult<Session> {
        if let Some(mut cached) = self.persistence.load(SessionKind::Guest) {
            if self.probe(&mut cached).await {
                info!(account_id = %self.account_id(), "Reusing cached guest session");
                self.persistence.save(&cached);
                return Ok(cached);
            }
        }

        self.fresh_session().await
    }

    async fn reauthenticate(&self) -> PortalResult<Session> {
        self.persistence.forget();
        self.fresh_session().await
    }

    fn remember(&self, session: &Session) {
        self.persistence.save(session);
    }
}
