//! Authenticated portal sessions
//!
//! A [`Session`] is the cookie and header state that lets portal calls succeed. It is
//! owned by exactly one monitor and persisted through a [`store::SessionStore`] after
//! every successful authenticated request.

pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use store::{FileSessionStore, MemorySessionStore, SessionStore};

/// Which login flow produced the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Credential,
    Guest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub kind: SessionKind,
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(rename = "savedAt", default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(kind: SessionKind) -> Self {
        Self {
            kind,
            cookies: BTreeMap::new(),
            headers: BTreeMap::new(),
            saved_at: None,
        }
    }

    pub fn is_guest(&self) -> bool {
        self.kind == SessionKind::Guest
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn has_cookie(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    pub fn set_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    /// Apply one `Set-Cookie` header value. Attributes other than expiry are ignored;
    /// an empty value or `Max-Age=0` removes the cookie.
    pub fn ingest_set_cookie(&mut self, header: &str) {
        let mut parts = header.split(';');
        let Some((name, value)) = parts.next().and_then(|pair| pair.split_once('=')) else {
            return;
        };
        let name = name.trim();
        if name.is_empty() {
            return;
        }

        let expired = parts.any(|attr| {
            attr.split_once('=').is_some_and(|(key, val)| {
                key.trim().eq_ignore_ascii_case("max-age") && val.trim().starts_with(['0', '-'])
            })
        });

        let value = value.trim().trim_matches('"');
        if expired || value.is_empty() {
            self.cookies.remove(name);
        } else {
            self.cookies.insert(name.to_string(), value.to_string());
        }
    }

    /// Value for a `Cookie` request header, `None` when no cookies are held
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn touch(&mut self) {
        self.saved_at = Some(Utc::now());
    }
}
