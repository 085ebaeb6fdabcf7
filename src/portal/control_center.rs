use super::html;
use super::http::{PortalHttp, PortalResponse};
use super::payload::{self, Payload};
use super::PortalClient;
use crate::error::{PortalError, PortalResult};
use crate::models::{ConsumptionSnapshot, ConsumptionSummary, RefillResult};
use crate::session::Session;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use tracing::{debug, info, warn};

const USAGES_PAGE: &str = "/usages.html";
const GUEST_LANDING_PAGE: &str = "/unlimited-highspeed";

/// Client for the control center's consumption and refill endpoints
#[derive(Debug, Clone)]
pub struct ControlCenterClient {
    http: PortalHttp,
}

impl ControlCenterClient {
    pub fn new(http: PortalHttp) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &PortalHttp {
        &self.http
    }

    pub fn consumption_path(contract_id: &str, guest: bool) -> String {
        let base = format!("/service/mssa/contracts/{contract_id}/consumption/aggregations");
        if guest {
            format!("{base}/data-volume-for-landingpage")
        } else {
            base
        }
    }

    pub fn refill_path(contract_id: &str) -> String {
        format!("/service/mssa/contracts/{contract_id}/consumption/highspeed-volume")
    }

    /// Page carrying the refill csrf token for this kind of session
    pub fn token_page(session: &Session) -> &'static str {
        if session.is_guest() {
            GUEST_LANDING_PAGE
        } else {
            USAGES_PAGE
        }
    }

    async fn consumption_body(&self, session: &mut Session, contract_id: &str) -> PortalResult<String> {
        let url = self
            .http
            .url(&Self::consumption_path(contract_id, session.is_guest()))?;
        let response = self.http.api_request(session, Method::GET, url, &[]).await?;

        match response.status {
            200 => Ok(response.body),
            401 | 403 => Err(PortalError::AuthExpired),
            status => Err(PortalError::Status {
                status,
                action: "fetching consumption",
            }),
        }
    }

    async fn load_page(&self, session: &mut Session, path: &'static str) -> PortalResult<PortalResponse> {
        let url = self.http.url(path)?;
        let page = self.http.get_page(session, url).await?;
        match page.status {
            200 => Ok(page),
            401 | 403 => Err(PortalError::AuthExpired),
            status => Err(PortalError::Status {
                status,
                action: "loading portal page",
            }),
        }
    }

    async fn csrf_token(&self, session: &mut Session) -> PortalResult<String> {
        let path = Self::token_page(session);
        let page = self.load_page(session, path).await?;
        let token = html::csrf_token(&page.body).ok_or(PortalError::MissingCsrfToken(path))?;
        debug!(page = path, "Found refill csrf token");
        Ok(token)
    }
}

#[async_trait]
impl PortalClient for ControlCenterClient {
    async fn fetch_snapshot(&self, session: &mut Session, contract_id: &str) -> PortalResult<ConsumptionSnapshot> {
        let body = self.consumption_body(session, contract_id).await?;
        Ok(payload::snapshot_or_empty(&body, Utc::now()))
    }

    async fn request_refill(&self, session: &mut Session, contract_id: &str) -> PortalResult<RefillResult> {
        let token = self.csrf_token(session).await?;
        let url = self.http.url(&Self::refill_path(contract_id))?;

        info!(contract_id, "Requesting high-speed volume refill");
        let response = self
            .http
            .api_request(session, Method::POST, url, &[("X-CSRF-TOKEN", token)])
            .await?;

        let result = match response.status {
            204 => RefillResult::booked(204),
            400 => RefillResult::denied(400),
            401 | 403 => return Err(PortalError::AuthExpired),
            status => {
                warn!(contract_id, status, "Refill request failed");
                RefillResult::failed(Some(status), format!("refill failed with status {status}"))
            }
        };
        Ok(result)
    }

    async fn fetch_summary(&self, session: &mut Session, contract_id: &str) -> PortalResult<ConsumptionSummary> {
        let body = self.consumption_body(session, contract_id).await?;
        let payload = Payload::parse(&body)?;
        Ok(payload.summary(contract_id, Utc::now()))
    }

    async fn guest_contract_id(&self, session: &mut Session) -> PortalResult<Option<String>> {
        let page = self.load_page(session, GUEST_LANDING_PAGE).await?;
        let contract_id = html::contract_id(&page.body);
        match &contract_id {
            Some(id) => debug!(contract_id = %id, "Guest landing page exposes contract id"),
            None => debug!("Guest landing page has no contract id"),
        }
        Ok(contract_id)
    }
}
