use super::{Authenticator, SessionPersistence};
use crate::error::{PortalError, PortalResult};
use crate::portal::{html, PortalClient, PortalHttp};
use crate::session::{Session, SessionKind};
use async_trait::async_trait;
use reqwest::Method;
use std::sync::Arc;
use tracing::{info, warn};

const AUTHORIZATION_PATH: &str = "/oauth2/authorization/authorization-code-grant";

/// Cookie that marks a completed login
pub const SESSION_COOKIE: &str = "SESSION";

/// Username/password login through the portal's OAuth authorization-code flow
pub struct CredentialAuthenticator {
    http: PortalHttp,
    portal: Arc<dyn PortalClient>,
    username: String,
    password: String,
    contract_id: Option<String>,
    persistence: SessionPersistence,
}

impl CredentialAuthenticator {
    pub fn new(
        http: PortalHttp,
        portal: Arc<dyn PortalClient>,
        username: impl Into<String>,
        password: impl Into<String>,
        contract_id: Option<String>,
        persistence: SessionPersistence,
    ) -> Self {
        Self {
            http,
            portal,
            username: username.into(),
            password: password.into(),
            contract_id,
            persistence,
        }
    }

    /// The stored session is valid when the consumption endpoint accepts it
    async fn probe(&self, session: &mut Session) -> bool {
        let Some(contract_id) = self.contract_id.as_deref() else {
            return false;
        };
        match self.portal.fetch_snapshot(session, contract_id).await {
            Ok(_) => true,
            Err(e) => {
                info!(account_id = %self.account_id(), error = %e, "Cached session rejected");
                false
            }
        }
    }

    async fn login(&self) -> PortalResult<Session> {
        let mut session = Session::new(SessionKind::Credential);

        let start = self.http.url(AUTHORIZATION_PATH)?;
        let page = self.http.get_page(&mut session, start).await?;
        if !page.is_success() {
            return Err(PortalError::AuthFailed(format!(
                "authorization flow ended with status {}",
                page.status
            )));
        }

        let mut form = html::login_form(&page.body)
            .ok_or_else(|| PortalError::AuthFailed("login form not found".to_string()))?;
        form.set("username", &self.username);
        form.set("password", &self.password);

        let action = page
            .url
            .join(&form.action)
            .map_err(|e| PortalError::Parse(format!("invalid login form action: {e}")))?;

        let response = self
            .http
            .navigate(&mut session, Method::POST, action, Some(&form.inputs))
            .await?;

        if !session.has_cookie(SESSION_COOKIE) {
            return Err(PortalError::AuthFailed(format!(
                "no {SESSION_COOKIE} cookie after login (status {})",
                response.status
            )));
        }

        info!(account_id = %self.username, "Logged in with credentials");
        Ok(session)
    }

    async fn fresh_session(&self) -> PortalResult<Session> {
        let session = self.login().await.inspect_err(|e| {
            warn!(account_id = %self.account_id(), error = %e, "Credential login failed");
        })?;
        self.persistence.save(&session);
        Ok(session)
    }
}

#[async_trait]
impl Authenticator for CredentialAuthenticator {
    fn account_id(&self) -> &str {
        self.persistence.account_id()
    }

    async fn authenticate(&self) -> PortalResult<Session> {
        if let Some(mut cached) = self.persistence.load(SessionKind::Credential) {
            if self.probe(&mut cached).await {
                info!(account_id = %self.account_id(), "Reusing cached session");
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
