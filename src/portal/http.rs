//! HTTP plumbing for the portal
//!
//! Redirects are followed by hand so `Set-Cookie` headers from every hop land in the
//! [`Session`] cookie map; reqwest's own redirect handling would drop them.

use crate::error::{PortalError, PortalResult};
use crate::session::Session;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, COOKIE, LOCATION, SET_COOKIE};
use reqwest::{redirect, Client, Method, RequestBuilder, Response, StatusCode, Url};
use std::time::Duration;
use tracing::{debug, trace};

pub const MAX_REDIRECTS: usize = 10;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36";
const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const JSON_ACCEPT: &str = "application/json";
const LANGUAGE: &str = "de-DE,de;q=0.9,en-US;q=0.8,en;q=0.7";

/// Final response of a navigation, body already read
#[derive(Debug, Clone)]
pub struct PortalResponse {
    pub status: u16,
    pub url: Url,
    pub body: String,
}

impl PortalResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone)]
pub struct PortalHttp {
    client: Client,
    base_url: Url,
}

impl PortalHttp {
    pub fn new(base_url: &str, timeout: Duration) -> PortalResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| PortalError::Parse(format!("invalid portal url {base_url}: {e}")))?;

        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a path or absolute URL against the portal base
    pub fn url(&self, path: &str) -> PortalResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| PortalError::Parse(format!("invalid url {path}: {e}")))
    }

    async fn send(&self, session: &mut Session, mut request: RequestBuilder) -> PortalResult<Response> {
        if let Some(cookie) = session.cookie_header() {
            request = request.header(COOKIE, cookie);
        }
        for (name, value) in &session.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.header(ACCEPT_LANGUAGE, LANGUAGE).send().await?;

        for value in response.headers().get_all(SET_COOKIE) {
            if let Ok(raw) = value.to_str() {
                session.ingest_set_cookie(raw);
            }
        }

        Ok(response)
    }

    /// Load a page, following redirects and collecting cookies along the way.
    /// A form, when given, is sent with the first request only.
    pub async fn navigate(
        &self,
        session: &mut Session,
        method: Method,
        url: Url,
        form: Option<&[(String, String)]>,
    ) -> PortalResult<PortalResponse> {
        let mut method = method;
        let mut url = url;
        let mut form = form;

        for hop in 0..=MAX_REDIRECTS {
            let mut request = self
                .client
                .request(method.clone(), url.clone())
                .header(ACCEPT, HTML_ACCEPT);
            if let Some(fields) = form {
                request = request.form(fields);
            }

            let response = self.send(session, request).await?;
            let status = response.status();

            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned)
                    .ok_or_else(|| PortalError::Parse(format!("redirect without location from {url}")))?;

                let next = url
                    .join(&location)
                    .map_err(|e| PortalError::Parse(format!("invalid redirect {location}: {e}")))?;
                trace!(hop, status = status.as_u16(), from = %url, to = %next, "Following redirect");

                if status != StatusCode::TEMPORARY_REDIRECT && status != StatusCode::PERMANENT_REDIRECT {
                    method = Method::GET;
                    form = None;
                }
                url = next;
                continue;
            }

            let body = response.text().await?;
            debug!(status = status.as_u16(), url = %url, "Navigation finished");
            return Ok(PortalResponse {
                status: status.as_u16(),
                url,
                body,
            });
        }

        Err(PortalError::TooManyRedirects(MAX_REDIRECTS))
    }

    pub async fn get_page(&self, session: &mut Session, url: Url) -> PortalResult<PortalResponse> {
        self.navigate(session, Method::GET, url, None).await
    }

    /// Single JSON API call, no redirect following
    pub async fn api_request(
        &self,
        session: &mut Session,
        method: Method,
        url: Url,
        extra_headers: &[(&str, String)],
    ) -> PortalResult<PortalResponse> {
        let referer = self.url("/usages.html")?;
        let mut request = self
            .client
            .request(method, url.clone())
            .header(ACCEPT, JSON_ACCEPT)
            .header("X-HR", "true")
            .header("Referer", referer.as_str())
            .header("Origin", self.base_url.origin().ascii_serialization());
        for (name, value) in extra_headers {
            request = request.header(*name, value.as_str());
        }

        let response = self.send(session, request).await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(status, url = %url, "API call finished");

        Ok(PortalResponse { status, url, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_resolution() {
        let http = PortalHttp::new("https://control-center.example", Duration::from_secs(5)).unwrap();
        assert_eq!(
            http.url("/usages.html").unwrap().as_str(),
            "https://control-center.example/usages.html"
        );
        assert_eq!(
            http.url("https://other.example/x").unwrap().as_str(),
            "https://other.example/x"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(PortalHttp::new("not a url", Duration::from_secs(5)).is_err());
    }
}
