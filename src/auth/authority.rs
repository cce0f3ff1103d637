use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Action;

/// Claims carried by a capability token: one deployment and the subset of
/// actions the bearer may invoke on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the deployment id.
    pub sub: String,
    /// Allowed action names.
    pub actions: Vec<String>,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
}

/// Authority issues and validates signed, scoped, expiring capability tokens.
///
/// Validity is recomputed entirely from the token's own content and the
/// shared secret; there is no server-side token state and no revocation list.
pub struct Authority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl Authority {
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact; the default 60s leeway would keep expired access
        // tokens alive for a noticeable fraction of their lifetime.
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issues a token binding `subject` to `actions`, expiring `ttl_seconds`
    /// from now.
    pub fn issue(&self, subject: &str, actions: &[Action], ttl_seconds: i64) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            actions: actions.iter().map(|a| a.as_str().to_string()).collect(),
            iat: now,
            exp: now + ttl_seconds,
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|_| Error::InvalidToken)
    }

    /// Validates signature, expiry, and that `required` is in the embedded
    /// action set; returns the subject (deployment id).
    pub fn validate(&self, token: &str, required: Action) -> Result<String> {
        let data =
            decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => Error::TokenExpired,
                    _ => Error::InvalidToken,
                }
            })?;

        if !data.claims.actions.iter().any(|a| a == required.as_str()) {
            return Err(Error::Forbidden(required.as_str().to_string()));
        }

        Ok(data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authority() -> Authority {
        Authority::new(b"test-secret")
    }

    #[test]
    fn test_issue_and_validate_in_scope_action() {
        let authority = authority();
        let token = authority
            .issue("ab12cd34", &[Action::Pull], 600)
            .unwrap();
        let subject = authority.validate(&token, Action::Pull).unwrap();
        assert_eq!(subject, "ab12cd34");
    }

    #[test]
    fn test_out_of_scope_action_is_forbidden() {
        let authority = authority();
        let token = authority
            .issue("ab12cd34", &[Action::Pull], 600)
            .unwrap();
        let err = authority.validate(&token, Action::Destroy).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let authority = authority();
        let token = authority
            .issue("ab12cd34", &[Action::Pull], -60)
            .unwrap();
        let err = authority.validate(&token, Action::Pull).unwrap_err();
        assert!(matches!(err, Error::TokenExpired));
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let authority = authority();
        let token = authority
            .issue("ab12cd34", &[Action::Pull], 600)
            .unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('a') { 'b' } else { 'a' });
        assert!(matches!(
            authority.validate(&tampered, Action::Pull).unwrap_err(),
            Error::InvalidToken
        ));
    }

    #[test]
    fn test_foreign_secret_is_rejected() {
        let token = authority()
            .issue("ab12cd34", &[Action::Pull], 600)
            .unwrap();
        let other = Authority::new(b"another-secret");
        assert!(matches!(
            other.validate(&token, Action::Pull).unwrap_err(),
            Error::InvalidToken
        ));
    }

    #[test]
    fn test_full_access_set_validates_every_member() {
        let authority = authority();
        let token = authority
            .issue("ab12cd34", Action::access_set(), 600)
            .unwrap();
        for action in Action::access_set() {
            assert!(authority.validate(&token, *action).is_ok());
        }
        assert!(authority.validate(&token, Action::Webhook).is_err());
    }
}
