//! Token inspector: decode the payload of a candidate and judge its expiry.
//!
//! No signature, issuer or audience checks are made. Any structural problem
//! with the candidate becomes a `malformed` verdict, never an error.

use crate::locator::matcher::preview;
use crate::types::{JwtScoutError, Result};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use tracing::{info, warn};

/// Default window before expiry in which a token is reported as needing refresh.
pub const DEFAULT_REFRESH_THRESHOLD_SECS: i64 = 3600;

/// URL-safe decoder that also accepts non-zero trailing bits in the last
/// character, as lenient JWT producers emit them.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

/// Why a verdict came out the way it did.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerdictReason {
    /// `exp` is in the future.
    Valid,
    /// No candidate to inspect.
    NoToken,
    /// Wrong segment count, undecodable or non-object payload.
    Malformed,
    /// `exp` is at or before the current time.
    Expired,
    /// The payload carries no usable `exp` claim.
    NoExpiry,
}

impl fmt::Display for VerdictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Valid => "valid",
            Self::NoToken => "no token",
            Self::Malformed => "malformed",
            Self::Expired => "expired",
            Self::NoExpiry => "no expiry claim",
        };
        f.write_str(s)
    }
}

/// Validity of a candidate, based solely on `exp`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Verdict {
    pub valid: bool,
    pub reason: VerdictReason,
}

impl Verdict {
    fn valid() -> Self {
        Self {
            valid: true,
            reason: VerdictReason::Valid,
        }
    }

    fn invalid(reason: VerdictReason) -> Self {
        Self {
            valid: false,
            reason,
        }
    }
}

/// Display-oriented view of the standard claims. Absent claims stay `None`.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ClaimsSummary {
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: Option<Value>,
    pub roles: Option<Value>,
    /// Seconds from inspection time until `exp`; negative once expired.
    pub expires_in_secs: Option<i64>,
    /// True when the remaining lifetime is within the refresh threshold.
    pub needs_refresh: bool,
}

/// Everything learned about one candidate.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Inspection {
    pub verdict: Verdict,
    /// Decoded payload, when it could be decoded.
    pub claims: Option<Map<String, Value>>,
    pub summary: Option<ClaimsSummary>,
}

impl Inspection {
    fn rejected(reason: VerdictReason) -> Self {
        Self {
            verdict: Verdict::invalid(reason),
            claims: None,
            summary: None,
        }
    }
}

/// Expiry-based token inspector.
#[derive(Debug, Clone)]
pub struct Inspector {
    refresh_threshold_secs: i64,
}

impl Inspector {
    pub fn new() -> Self {
        Self {
            refresh_threshold_secs: DEFAULT_REFRESH_THRESHOLD_SECS,
        }
    }

    /// Set the refresh window used for [`ClaimsSummary::needs_refresh`].
    pub fn with_refresh_threshold(mut self, secs: i64) -> Self {
        self.refresh_threshold_secs = secs;
        self
    }

    /// Inspect a candidate against the current time.
    pub fn inspect(&self, candidate: Option<&str>) -> Inspection {
        self.inspect_at(candidate, Utc::now().timestamp())
    }

    /// Inspect a candidate against `now` (epoch seconds).
    pub fn inspect_at(&self, candidate: Option<&str>, now: i64) -> Inspection {
        let Some(token) = candidate else {
            return Inspection::rejected(VerdictReason::NoToken);
        };

        let claims = match decode_payload(token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!("Token {} is malformed: {}", preview(token), e);
                return Inspection::rejected(VerdictReason::Malformed);
            }
        };

        let exp = claims.get("exp").and_then(Value::as_f64);
        let verdict = match exp {
            None => Verdict::invalid(VerdictReason::NoExpiry),
            Some(exp) if exp > now as f64 => Verdict::valid(),
            Some(_) => Verdict::invalid(VerdictReason::Expired),
        };

        let summary = self.summarize(&claims, now);
        log_claims(&summary, &verdict);

        Inspection {
            verdict,
            claims: Some(claims),
            summary: Some(summary),
        }
    }

    fn summarize(&self, claims: &Map<String, Value>, now: i64) -> ClaimsSummary {
        let exp = claims.get("exp").and_then(Value::as_f64);
        // `as` saturates out-of-range floats, the subtraction must not overflow
        let expires_in_secs = exp.map(|exp| (exp as i64).saturating_sub(now));

        ClaimsSummary {
            issued_at: claims.get("iat").and_then(Value::as_f64).and_then(epoch_to_datetime),
            expires_at: exp.and_then(epoch_to_datetime),
            user: claims.get("user").cloned(),
            roles: claims.get("roles").cloned(),
            expires_in_secs,
            needs_refresh: expires_in_secs
                .map(|remaining| remaining <= self.refresh_threshold_secs)
                .unwrap_or(false),
        }
    }
}

impl Default for Inspector {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode the middle segment of a three-segment token into a JSON object.
pub fn decode_payload(token: &str) -> Result<Map<String, Value>> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(JwtScoutError::MalformedToken(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }

    let bytes = decode_segment(segments[1])?;
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(JwtScoutError::MalformedToken(
            "payload is not a JSON object".to_string(),
        )),
        Err(e) => Err(JwtScoutError::MalformedToken(format!(
            "payload is not JSON: {}",
            e
        ))),
    }
}

/// Base64 decode a segment, accepting either alphabet and optional padding.
fn decode_segment(segment: &str) -> Result<Vec<u8>> {
    let normalized: String = segment
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            c => c,
        })
        .collect();

    PAYLOAD_ENGINE
        .decode(normalized)
        .map_err(|e| JwtScoutError::MalformedToken(format!("payload is not base64: {}", e)))
}

/// Epoch seconds -> timestamp, going through epoch milliseconds.
fn epoch_to_datetime(secs: f64) -> Option<DateTime<Utc>> {
    let millis = secs * 1000.0;
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

fn log_claims(summary: &ClaimsSummary, verdict: &Verdict) {
    if let Some(iat) = summary.issued_at {
        info!("   Issued at: {}", iat);
    }
    if let Some(exp) = summary.expires_at {
        info!("   Expires at: {}", exp);
    }
    if let Some(ref user) = summary.user {
        info!("   User: {}", user);
    }
    if let Some(ref roles) = summary.roles {
        info!("   Roles: {}", roles);
    }
    info!("Token verdict: {}", verdict.reason);
}

/// `first20...last20` form of a token for display.
pub fn short_form(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 40 {
        return token.to_string();
    }
    let head: String = chars[..20].iter().collect();
    let tail: String = chars[chars.len() - 20..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn make_token(payload: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{}.{}.c2lnbmF0dXJl", header, body)
    }

    #[test]
    fn test_future_exp_is_valid() {
        let token = make_token(&json!({ "exp": NOW + 7200 }));
        let inspection = Inspector::new().inspect_at(Some(&token), NOW);
        assert_eq!(inspection.verdict, Verdict::valid());
        let summary = inspection.summary.unwrap();
        assert_eq!(summary.expires_in_secs, Some(7200));
        assert!(!summary.needs_refresh);
    }

    #[test]
    fn test_past_exp_is_expired() {
        let token = make_token(&json!({ "exp": NOW - 1 }));
        let inspection = Inspector::new().inspect_at(Some(&token), NOW);
        assert!(!inspection.verdict.valid);
        assert_eq!(inspection.verdict.reason, VerdictReason::Expired);
    }

    #[test]
    fn test_exp_equal_to_now_is_expired() {
        let token = make_token(&json!({ "exp": NOW }));
        let inspection = Inspector::new().inspect_at(Some(&token), NOW);
        assert_eq!(inspection.verdict.reason, VerdictReason::Expired);
    }

    #[test]
    fn test_missing_exp_is_invalid() {
        let token = make_token(&json!({ "user": "alice" }));
        let inspection = Inspector::new().inspect_at(Some(&token), NOW);
        assert!(!inspection.verdict.valid);
        assert_eq!(inspection.verdict.reason, VerdictReason::NoExpiry);
        // Claims still decoded for display
        assert_eq!(inspection.summary.unwrap().user, Some(json!("alice")));
    }

    #[test]
    fn test_non_numeric_exp_is_no_expiry() {
        let token = make_token(&json!({ "exp": "tomorrow" }));
        let inspection = Inspector::new().inspect_at(Some(&token), NOW);
        assert_eq!(inspection.verdict.reason, VerdictReason::NoExpiry);
    }

    #[test]
    fn test_absent_candidate() {
        let inspection = Inspector::new().inspect_at(None, NOW);
        assert_eq!(inspection.verdict.reason, VerdictReason::NoToken);
        assert!(inspection.claims.is_none());
    }

    #[test]
    fn test_wrong_segment_count_is_malformed() {
        let inspector = Inspector::new();
        for token in ["eyJhbGci.eyJleHAiOjF9", "eyJhbGci.eyJleHAiOjF9.sig.extra", "eyJ"] {
            let inspection = inspector.inspect_at(Some(token), NOW);
            assert_eq!(inspection.verdict.reason, VerdictReason::Malformed, "{}", token);
        }
    }

    #[test]
    fn test_undecodable_payload_is_malformed() {
        let inspector = Inspector::new();

        let not_base64 = "eyJhbGciOiJIUzI1NiJ9.!!!not-base64!!!.sig";
        assert_eq!(
            inspector.inspect_at(Some(not_base64), NOW).verdict.reason,
            VerdictReason::Malformed
        );

        let not_json = format!("eyJhbGciOiJIUzI1NiJ9.{}.sig", URL_SAFE_NO_PAD.encode("not json"));
        assert_eq!(
            inspector.inspect_at(Some(&not_json), NOW).verdict.reason,
            VerdictReason::Malformed
        );

        let not_object = format!("eyJhbGciOiJIUzI1NiJ9.{}.sig", URL_SAFE_NO_PAD.encode("[1,2]"));
        assert_eq!(
            inspector.inspect_at(Some(&not_object), NOW).verdict.reason,
            VerdictReason::Malformed
        );
    }

    #[test]
    fn test_padded_standard_alphabet_payload() {
        use base64::engine::general_purpose::STANDARD;
        // '>' in the payload produces '+' or '/' under the standard alphabet
        let payload = json!({ "exp": NOW + 10, "note": ">>>???" }).to_string();
        let token = format!("eyJhbGciOiJIUzI1NiJ9.{}.sig", STANDARD.encode(payload));
        let inspection = Inspector::new().inspect_at(Some(&token), NOW);
        assert!(inspection.verdict.valid);
    }

    #[test]
    fn test_claims_summary() {
        let token = make_token(&json!({
            "iat": 1_699_990_000,
            "exp": NOW + 600,
            "user": { "id": 7, "email": "ops@example.com" },
            "roles": ["admin", "viewer"]
        }));
        let inspection = Inspector::new().inspect_at(Some(&token), NOW);
        let summary = inspection.summary.unwrap();

        assert_eq!(
            summary.issued_at,
            DateTime::from_timestamp(1_699_990_000, 0)
        );
        assert_eq!(summary.expires_at, DateTime::from_timestamp(NOW + 600, 0));
        assert_eq!(summary.roles, Some(json!(["admin", "viewer"])));
        assert_eq!(summary.user.unwrap()["email"], "ops@example.com");
        assert!(summary.needs_refresh);
        assert_eq!(inspection.claims.unwrap().len(), 4);
    }

    #[test]
    fn test_absent_claims_are_omitted() {
        let token = make_token(&json!({ "exp": NOW + 10 }));
        let summary = Inspector::new().inspect_at(Some(&token), NOW).summary.unwrap();
        assert!(summary.issued_at.is_none());
        assert!(summary.user.is_none());
        assert!(summary.roles.is_none());
    }

    #[test]
    fn test_refresh_threshold() {
        let token = make_token(&json!({ "exp": NOW + 120 }));
        let strict = Inspector::new().with_refresh_threshold(60);
        assert!(!strict.inspect_at(Some(&token), NOW).summary.unwrap().needs_refresh);

        let loose = Inspector::new().with_refresh_threshold(300);
        assert!(loose.inspect_at(Some(&token), NOW).summary.unwrap().needs_refresh);
    }

    #[test]
    fn test_short_form() {
        let token = "a".repeat(20) + &"b".repeat(30) + &"c".repeat(20);
        assert_eq!(short_form(&token), format!("{}...{}", "a".repeat(20), "c".repeat(20)));
        assert_eq!(short_form("eyJshort"), "eyJshort");
    }

    #[test]
    fn test_huge_negative_exp_is_expired() {
        let token = make_token(&json!({ "exp": -1e300 }));
        let inspection = Inspector::new().inspect_at(Some(&token), NOW);
        assert_eq!(inspection.verdict.reason, VerdictReason::Expired);

        let summary = inspection.summary.unwrap();
        assert_eq!(summary.expires_in_secs, Some(i64::MIN));
        assert!(summary.expires_at.is_none());
        assert!(summary.needs_refresh);
    }

    #[test]
    fn test_exp_near_i64_max_is_valid() {
        let token = make_token(&json!({ "exp": 9.3e18 }));
        let inspection = Inspector::new().inspect_at(Some(&token), -NOW);
        assert!(inspection.verdict.valid);

        let summary = inspection.summary.unwrap();
        assert_eq!(summary.expires_in_secs, Some(i64::MAX));
        assert!(summary.expires_at.is_none());
        assert!(!summary.needs_refresh);
    }

    #[test]
    fn test_payload_with_trailing_bits_decodes() {
        // Pad with JSON whitespace so the encoding ends in a 2-character group
        let mut payload = json!({ "exp": NOW + 60 }).to_string();
        while payload.len() % 3 != 1 {
            payload.push(' ');
        }
        let mut body = URL_SAFE_NO_PAD.encode(&payload);
        // Last char of a 2-char group only carries 2 significant bits
        assert!(body.ends_with('A'));
        body.pop();
        body.push('B');

        let token = format!("eyJhbGciOiJIUzI1NiJ9.{}.sig", body);
        let inspection = Inspector::new().inspect_at(Some(&token), NOW);
        assert!(inspection.verdict.valid);
        assert_eq!(inspection.claims.unwrap()["exp"], json!(NOW + 60));
    }
}
