//! Bearer token and OAuth flow extraction from HAR (HTTP Archive) captures.
//!
//! Looks in three places for tokens in each entry:
//! - `Authorization: Bearer ...` request headers
//! - JWTs anywhere in response body text
//! - `access_token=<jwt>` parameters in response body text
//!
//! Alongside tokens it records `code=` values seen in response bodies and the
//! request URLs of OAuth authorize and callback steps.

use crate::types::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Top-level HAR document. Only the fields we read are modelled.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Har {
    pub log: HarLog,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HarLog {
    pub entries: Vec<HarEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HarEntry {
    pub started_date_time: String,
    pub request: HarRequest,
    pub response: HarResponse,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HarRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<HarHeader>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HarHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HarResponse {
    pub content: HarContent,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HarContent {
    pub text: Option<String>,
}

/// Where in a HAR entry a token was seen.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HarTokenSource {
    Header,
    ResponseBody,
    AccessToken,
}

/// A token found in a HAR capture.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HarToken {
    pub token: String,
    pub url: String,
    pub method: String,
    pub timestamp: String,
    pub source: HarTokenSource,
}

/// Everything pulled out of one HAR capture.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct HarExtraction {
    /// Unique tokens, in capture order.
    pub bearer_tokens: Vec<HarToken>,
    /// Unique OAuth authorization codes from response bodies.
    pub oauth_codes: Vec<String>,
    /// Request URLs of OAuth authorize steps.
    pub auth_urls: Vec<String>,
    /// Request URLs of OAuth callback steps.
    pub callback_urls: Vec<String>,
}

const AUTHORIZE_PATH: &str = "oauth2/v1/authorize";
const CALLBACK_PATH: &str = "oauth/okta/callback";

fn bearer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"eyJ[a-zA-Z0-9_-]+\.[a-zA-Z0-9_-]+\.[a-zA-Z0-9_-]+").unwrap()
    })
}

fn access_token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"access_token=([a-zA-Z0-9_-]+\.[a-zA-Z0-9_-]+\.[a-zA-Z0-9_-]+)").unwrap()
    })
}

fn oauth_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"code=([a-zA-Z0-9_-]+)").unwrap())
}

impl Har {
    /// Parse a HAR document from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a HAR document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

/// Collect tokens, OAuth codes and OAuth URLs from every entry, in capture order.
pub fn extract_tokens(har: &Har) -> HarExtraction {
    let mut seen = HashSet::new();
    let mut found = HarExtraction::default();

    for entry in &har.log.entries {
        let tokens = &mut found.bearer_tokens;
        let mut push = |token: &str, source: HarTokenSource| {
            if seen.insert(token.to_string()) {
                tokens.push(HarToken {
                    token: token.to_string(),
                    url: entry.request.url.clone(),
                    method: entry.request.method.clone(),
                    timestamp: entry.started_date_time.clone(),
                    source,
                });
            }
        };

        for header in &entry.request.headers {
            if !header.name.eq_ignore_ascii_case("authorization") {
                continue;
            }
            if let Some(token) = bearer_from_header(&header.value) {
                push(token, HarTokenSource::Header);
            }
        }

        if let Some(ref text) = entry.response.content.text {
            for m in bearer_pattern().find_iter(text) {
                push(m.as_str(), HarTokenSource::ResponseBody);
            }
            for cap in access_token_pattern().captures_iter(text) {
                if let Some(m) = cap.get(1) {
                    push(m.as_str(), HarTokenSource::AccessToken);
                }
            }
            for cap in oauth_code_pattern().captures_iter(text) {
                if let Some(m) = cap.get(1) {
                    let code = m.as_str().to_string();
                    if !found.oauth_codes.contains(&code) {
                        found.oauth_codes.push(code);
                    }
                }
            }
        }

        let url = &entry.request.url;
        if url.contains(AUTHORIZE_PATH) {
            found.auth_urls.push(url.clone());
        } else if url.contains(CALLBACK_PATH) {
            found.callback_urls.push(url.clone());
        }
    }

    debug!("Scanned {} HAR entries", har.log.entries.len());
    info!(
        "Found {} bearer tokens, {} OAuth codes in HAR",
        found.bearer_tokens.len(),
        found.oauth_codes.len()
    );
    found
}

/// Token part of a `Bearer <jwt>` header value, if it is JWT-shaped.
fn bearer_from_header(value: &str) -> Option<&str> {
    let (_, rest) = value.split_once("Bearer ")?;
    let token = rest.trim();
    bearer_pattern()
        .find(token)
        .filter(|m| m.start() == 0)
        .map(|_| token)
}

#[cfg(test)]
mod tests {
    use super::*;

    const JWT_A: &str = "eyJhbGciOiJIUzI1NiJ9.eyJ1c2VyIjoiYSJ9.c2lnYQ";
    const JWT_B: &str = "eyJhbGciOiJIUzI1NiJ9.eyJ1c2VyIjoiYiJ9.c2lnYg";

    fn sample_har() -> String {
        format!(
            r#"{{
              "log": {{
                "entries": [
                  {{
                    "startedDateTime": "2024-05-01T10:00:00.000Z",
                    "request": {{
                      "method": "GET",
                      "url": "https://api.example.com/me",
                      "headers": [
                        {{"name": "Accept", "value": "application/json"}},
                        {{"name": "authorization", "value": "Bearer {a}"}}
                      ]
                    }},
                    "response": {{"content": {{"text": "{{\"token\": \"{a}\"}}"}}}}
                  }},
                  {{
                    "startedDateTime": "2024-05-01T10:00:05.000Z",
                    "request": {{"method": "POST", "url": "https://login.example.com/cb", "headers": []}},
                    "response": {{"content": {{"text": "redirect?access_token={b}&state=1"}}}}
                  }},
                  {{
                    "request": {{"method": "GET", "url": "https://cdn.example.com/app.js"}},
                    "response": {{"content": {{}}}}
                  }}
                ]
              }}
            }}"#,
            a = JWT_A,
            b = JWT_B
        )
    }

    #[test]
    fn test_extract_tokens() {
        let har = Har::from_json(&sample_har()).unwrap();
        let tokens = extract_tokens(&har).bearer_tokens;

        assert_eq!(tokens.len(), 2);

        assert_eq!(tokens[0].token, JWT_A);
        assert_eq!(tokens[0].source, HarTokenSource::Header);
        assert_eq!(tokens[0].url, "https://api.example.com/me");
        assert_eq!(tokens[0].method, "GET");
        assert_eq!(tokens[0].timestamp, "2024-05-01T10:00:00.000Z");

        // Body pattern sees it before the access_token pattern does
        assert_eq!(tokens[1].token, JWT_B);
        assert_eq!(tokens[1].source, HarTokenSource::ResponseBody);
        assert_eq!(tokens[1].method, "POST");
    }

    #[test]
    fn test_oauth_codes_are_unique() {
        let har = Har::from_json(
            r#"{"log": {"entries": [
              {"request": {"url": "https://app.example.com/a"},
               "response": {"content": {"text": "next?code=abc_123&state=x code=def-456"}}},
              {"request": {"url": "https://app.example.com/b"},
               "response": {"content": {"text": "code=abc_123"}}}
            ]}}"#,
        )
        .unwrap();

        let found = extract_tokens(&har);
        assert_eq!(found.oauth_codes, vec!["abc_123", "def-456"]);
        assert!(found.bearer_tokens.is_empty());
    }

    #[test]
    fn test_oauth_flow_urls() {
        let har = Har::from_json(
            r#"{"log": {"entries": [
              {"request": {"url": "https://idp.example.com/oauth2/v1/authorize?client_id=web"}},
              {"request": {"url": "https://app.example.com/oauth/okta/callback?code=zz"}},
              {"request": {"url": "https://app.example.com/api/me"}},
              {"request": {"url": "https://idp.example.com/oauth2/v1/authorize?client_id=web"}}
            ]}}"#,
        )
        .unwrap();

        let found = extract_tokens(&har);
        assert_eq!(
            found.auth_urls,
            vec![
                "https://idp.example.com/oauth2/v1/authorize?client_id=web",
                "https://idp.example.com/oauth2/v1/authorize?client_id=web",
            ]
        );
        assert_eq!(
            found.callback_urls,
            vec!["https://app.example.com/oauth/okta/callback?code=zz"]
        );
        // Request URLs are not searched for codes
        assert!(found.oauth_codes.is_empty());
    }

    #[test]
    fn test_bearer_header_requires_jwt_shape() {
        assert_eq!(bearer_from_header(&format!("Bearer {}", JWT_A)), Some(JWT_A));
        assert_eq!(bearer_from_header("Bearer opaque-token"), None);
        assert_eq!(bearer_from_header("Basic dXNlcjpwYXNz"), None);
    }

    #[test]
    fn test_empty_and_invalid_har() {
        let har = Har::from_json("{}").unwrap();
        assert_eq!(extract_tokens(&har), HarExtraction::default());
        assert!(Har::from_json("not json").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("jwtscout-har-{}.har", std::process::id()));
        std::fs::write(&path, sample_har()).unwrap();
        let har = Har::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(har.log.entries.len(), 3);
    }
}
