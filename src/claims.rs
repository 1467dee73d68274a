//! Bearer token claims.
//!
//! Tokens are JWTs issued by the backend. The client only reads the payload
//! to show who is signed in and whether the token has expired; it never
//! verifies the signature.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use thiserror::Error;

use crate::fields::Role;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimsError {
    #[error("token is not a JWT (expected header.payload.signature)")]
    Malformed,

    #[error("token payload is not valid base64url: {0}")]
    Encoding(String),

    #[error("token payload is not valid JSON claims: {0}")]
    Payload(String),
}

/// Claims the backend puts in its tokens. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    /// Account email.
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub user_role: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Expiry as seconds since the Unix epoch.
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// The role to act on: `role`, then `user_role`, then the first of `roles`.
    pub fn effective_role(&self) -> Option<Role> {
        self.role
            .as_deref()
            .or(self.user_role.as_deref())
            .or(self.roles.first().map(String::as_str))
            .filter(|r| !r.trim().is_empty())
            .map(Role::parse)
    }

    /// Whether the token has expired at `now` (Unix seconds).
    /// Tokens without `exp` never expire client-side.
    pub fn is_expired(&self, now: i64) -> bool {
        self.exp.is_some_and(|exp| exp <= now)
    }
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Decode the payload segment of a JWT.
pub fn decode_claims(token: &str) -> Result<TokenClaims, ClaimsError> {
    let mut segments = token.trim().split('.');
    let payload = match (segments.next(), segments.next()) {
        (Some(_), Some(payload)) if !payload.is_empty() => payload,
        _ => return Err(ClaimsError::Malformed),
    };

    // Some issuers pad the segment; the URL-safe engine here does not accept it.
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ClaimsError::Encoding(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| ClaimsError::Payload(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with(payload: &str) -> String {
        format!("eyJhbGciOiJIUzI1NiJ9.{}.c2ln", URL_SAFE_NO_PAD.encode(payload))
    }

    #[test]
    fn test_decode_standard_claims() {
        let token = token_with(r#"{"sub":"jane@example.com","user_id":"g-1","role":"Graduate","exp":2000000000}"#);
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("jane@example.com"));
        assert_eq!(claims.user_id.as_deref(), Some("g-1"));
        assert_eq!(claims.effective_role(), Some(Role::Graduate));
        assert!(!claims.is_expired(1_900_000_000));
        assert!(claims.is_expired(2_000_000_000));
    }

    #[test]
    fn test_role_fallbacks() {
        let claims = decode_claims(&token_with(r#"{"user_role":"ADMIN"}"#)).unwrap();
        assert_eq!(claims.effective_role(), Some(Role::Admin));

        let claims =
            decode_claims(&token_with(r#"{"roles":["mentor","admin"],"user_id":7}"#)).unwrap();
        assert_eq!(claims.effective_role(), Some(Role::Other("mentor".to_string())));
        assert_eq!(claims.user_id.as_deref(), Some("7"));

        let claims = decode_claims(&token_with("{}")).unwrap();
        assert_eq!(claims.effective_role(), None);
        assert!(!claims.is_expired(i64::MAX));
    }

    #[test]
    fn test_padded_payload_is_accepted() {
        let padded = format!(
            "h.{}.s",
            base64::engine::general_purpose::URL_SAFE.encode(r#"{"sub":"a"}"#)
        );
        assert_eq!(decode_claims(&padded).unwrap().sub.as_deref(), Some("a"));
    }

    #[test]
    fn test_malformed_tokens_are_errors() {
        assert_eq!(decode_claims("not-a-jwt"), Err(ClaimsError::Malformed));
        assert_eq!(decode_claims("a..c"), Err(ClaimsError::Malformed));
        assert!(matches!(decode_claims("a.!!!.c"), Err(ClaimsError::Encoding(_))));
        let not_json = format!("a.{}.c", URL_SAFE_NO_PAD.encode("hello"));
        assert!(matches!(decode_claims(&not_json), Err(ClaimsError::Payload(_))));
    }
}
