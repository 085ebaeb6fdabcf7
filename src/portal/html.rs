//! Markup scraping for the few values the portal only exposes in HTML
//!
//! Only three things are ever read: the login form, the refill CSRF token and the
//! guest contract id. Regexes are enough for that.

use regex::Regex;
use std::sync::OnceLock;

/// Login form fields and target
#[derive(Debug, Clone, PartialEq)]
pub struct LoginForm {
    pub action: String,
    pub inputs: Vec<(String, String)>,
}

impl LoginForm {
    /// Set a field, replacing an existing input of the same name
    pub fn set(&mut self, name: &str, value: &str) {
        match self.inputs.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.inputs.push((name.to_string(), value.to_string())),
        }
    }
}

fn form_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<form\b([^>]*)>(.*?)</form>").expect("form regex is a constant"))
}

fn input_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<input\b[^>]*>").expect("input regex is a constant"))
}

fn meta_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("meta regex is a constant"))
}

fn body_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<body\b[^>]*>").expect("body regex is a constant"))
}

fn attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)([a-z_:][-a-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
            .expect("attribute regex is a constant")
    })
}

/// Value of attribute `name` inside a single tag
pub fn attribute(tag: &str, name: &str) -> Option<String> {
    attr_re().captures_iter(tag).find_map(|caps| {
        let key = caps.get(1)?.as_str();
        if !key.eq_ignore_ascii_case(name) {
            return None;
        }
        let raw = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4))?;
        Some(unescape(raw.as_str()))
    })
}

fn unescape(raw: &str) -> String {
    raw.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// The `#kc-form-login` form, or the first form on the page
pub fn login_form(html: &str) -> Option<LoginForm> {
    let forms: Vec<_> = form_re().captures_iter(html).collect();
    let chosen = forms
        .iter()
        .find(|caps| attribute(&caps[1], "id").as_deref() == Some("kc-form-login"))
        .or_else(|| forms.first())?;

    let action = attribute(&chosen[1], "action")?;
    let inputs = input_re()
        .find_iter(&chosen[2])
        .filter_map(|tag| {
            let name = attribute(tag.as_str(), "name")?;
            let value = attribute(tag.as_str(), "value").unwrap_or_default();
            Some((name, value))
        })
        .collect();

    Some(LoginForm { action, inputs })
}

/// Content of `<meta name="_csrf">`
pub fn csrf_token(html: &str) -> Option<String> {
    meta_re()
        .find_iter(html)
        .find(|tag| attribute(tag.as_str(), "name").as_deref() == Some("_csrf"))
        .and_then(|tag| attribute(tag.as_str(), "content"))
        .filter(|token| !token.is_empty())
}

/// `data-contract-id` of the page body
pub fn contract_id(html: &str) -> Option<String> {
    let body = body_re().find(html)?;
    attribute(body.as_str(), "data-contract-id").filter(|id| !id.trim().is_empty())
}
