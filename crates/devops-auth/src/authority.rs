use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::TokenError;
use crate::ledger::{InMemoryLedger, TransactionLedger, TransactionRecord, TransactionStats};
use crate::security::constant_time_eq;

/// Decoded token claims: the caller's claims plus `jti`, `iat` and `exp`.
pub type Claims = Map<String, Value>;

/// Default token lifetime (10 minutes).
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 600;

/// Startup configuration for a [`TokenAuthority`].
#[derive(Clone)]
pub struct AuthorityConfig {
    /// The one API key callers must present.
    pub api_key: String,
    /// HS256 signing secret.
    pub signing_secret: Vec<u8>,
    /// Lifetime of an issued token.
    pub token_ttl: Duration,
}

impl AuthorityConfig {
    pub fn new(api_key: impl Into<String>, signing_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            api_key: api_key.into(),
            signing_secret: signing_secret.into(),
            token_ttl: Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
        }
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }
}

impl std::fmt::Debug for AuthorityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorityConfig")
            .field("api_key", &"[REDACTED]")
            .field("signing_secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

/// Issues signed single-use tokens and validates them against the ledger.
pub struct TokenAuthority {
    api_key: Vec<u8>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl: Duration,
    ledger: Arc<dyn TransactionLedger>,
    clock: Arc<dyn Clock>,
}

impl TokenAuthority {
    /// Build an authority with an in-memory ledger and the system clock.
    pub fn new(config: AuthorityConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against `clock`, not the library's wall clock.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            api_key: config.api_key.into_bytes(),
            encoding_key: EncodingKey::from_secret(&config.signing_secret),
            decoding_key: DecodingKey::from_secret(&config.signing_secret),
            validation,
            token_ttl: config.token_ttl,
            ledger: Arc::new(InMemoryLedger::new()),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_ledger(mut self, ledger: Arc<dyn TransactionLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// Exact match against the configured key, in constant time.
    pub fn validate_api_key(&self, key: &str) -> bool {
        constant_time_eq(key.as_bytes(), &self.api_key)
    }

    /// Sign `claims` into a fresh single-use token and record it in the ledger.
    ///
    /// `jti`, `iat` and `exp` are always set by the authority; caller-supplied
    /// values for those keys are overwritten in the token but kept in the
    /// ledger's copy of the caller's claims.
    pub fn issue_token(&self, claims: Claims) -> Result<String, TokenError> {
        let issued_at = self.clock.now();
        let expires_at = issued_at + self.token_ttl;
        let jti = Uuid::new_v4().to_string();

        let mut payload = claims.clone();
        payload.insert("jti".to_string(), Value::String(jti.clone()));
        payload.insert("iat".to_string(), Value::from(issued_at.timestamp()));
        payload.insert("exp".to_string(), Value::from(expires_at.timestamp()));

        let token = encode(&Header::new(Algorithm::HS256), &payload, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        let registered = self.ledger.register(TransactionRecord {
            jti: jti.clone(),
            generated_at: issued_at,
            expires_at,
            payload: claims,
            used: false,
            used_at: None,
        });
        if !registered {
            return Err(TokenError::Signing(format!(
                "transaction id {jti} is already registered"
            )));
        }

        tracing::debug!(jti = %jti, expires_at = %expires_at, "issued token");
        Ok(token)
    }

    /// Verify signature and expiry, then consume the token.
    ///
    /// A token can succeed here at most once. On success the ledger entry is
    /// marked used and the full decoded claims are returned.
    pub fn validate_token(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => {
                    TokenError::Invalid("Signature verification failed".to_string())
                }
                _ => TokenError::Invalid(e.to_string()),
            }
        })?;
        let claims = data.claims;

        let now = self.clock.now();
        let exp = claims
            .get("exp")
            .and_then(Value::as_i64)
            .ok_or_else(|| TokenError::Invalid("exp claim must be an integer".to_string()))?;
        if exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        let jti = claims
            .get("jti")
            .and_then(Value::as_str)
            .ok_or(TokenError::UnknownTransaction)?;

        self.ledger.consume(jti, token, now)?;

        tracing::debug!(jti = %jti, "token consumed");
        Ok(claims)
    }

    pub fn stats(&self) -> TransactionStats {
        self.ledger.stats()
    }

    pub fn transaction(&self, jti: &str) -> Option<TransactionRecord> {
        self.ledger.get(jti)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde_json::json;

    const API_KEY: &str = "2f5ae96c-b558-4c7b-a590-a501ae1c3f6c";

    fn authority() -> TokenAuthority {
        TokenAuthority::new(AuthorityConfig::new(API_KEY, b"test-secret".to_vec()))
    }

    fn claims(value: Value) -> Claims {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn validates_correct_api_key() {
        assert!(authority().validate_api_key(API_KEY));
    }

    #[test]
    fn rejects_wrong_api_key() {
        let auth = authority();
        assert!(!auth.validate_api_key("wrong-api-key"));
        assert!(!auth.validate_api_key(""));
    }

    #[test]
    fn issued_token_validates_once() {
        let auth = authority();
        let token = auth.issue_token(claims(json!({"test": "data"}))).unwrap();

        let decoded = auth.validate_token(&token).unwrap();
        assert_eq!(decoded["test"], "data");
        assert!(decoded["jti"].is_string());
        assert!(decoded["iat"].is_i64());
        assert!(decoded["exp"].is_i64());

        assert_eq!(auth.validate_token(&token), Err(TokenError::AlreadyUsed));
    }

    #[test]
    fn identical_claims_yield_distinct_tokens() {
        let auth = authority();
        let a = auth.issue_token(claims(json!({"test": "same"}))).unwrap();
        let b = auth.issue_token(claims(json!({"test": "same"}))).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn expiry_is_issuance_plus_ttl() {
        let auth = authority();
        let token = auth.issue_token(Claims::new()).unwrap();
        let decoded = auth.validate_token(&token).unwrap();

        let iat = decoded["iat"].as_i64().unwrap();
        let exp = decoded["exp"].as_i64().unwrap();
        assert_eq!(exp - iat, DEFAULT_TOKEN_TTL_SECS);

        let record = auth.transaction(decoded["jti"].as_str().unwrap()).unwrap();
        assert_eq!(record.expires_at - record.generated_at, auth.token_ttl());
    }

    #[test]
    fn token_past_expiry_fails_as_expired() {
        let clock = Arc::new(ManualClock::default());
        let auth = authority().with_clock(clock.clone());
        let token = auth.issue_token(Claims::new()).unwrap();

        clock.advance(Duration::seconds(DEFAULT_TOKEN_TTL_SECS + 1));

        assert_eq!(auth.validate_token(&token), Err(TokenError::Expired));
        assert_eq!(auth.stats().used_tokens, 0);
    }

    #[test]
    fn token_just_inside_window_is_accepted() {
        let clock = Arc::new(ManualClock::default());
        let auth = authority().with_clock(clock.clone());
        let token = auth.issue_token(Claims::new()).unwrap();

        clock.advance(Duration::seconds(DEFAULT_TOKEN_TTL_SECS - 2));

        assert!(auth.validate_token(&token).is_ok());
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let other = TokenAuthority::new(AuthorityConfig::new(API_KEY, b"other-secret".to_vec()));
        let token = other.issue_token(Claims::new()).unwrap();

        match authority().validate_token(&token) {
            Err(TokenError::Invalid(_)) => {}
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn garbage_token_is_invalid() {
        match authority().validate_token("not.a.jwt") {
            Err(TokenError::Invalid(_)) => {}
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn correctly_signed_token_from_another_ledger_is_unknown() {
        let issuer = authority();
        let token = issuer.issue_token(Claims::new()).unwrap();

        assert_eq!(
            authority().validate_token(&token),
            Err(TokenError::UnknownTransaction)
        );
    }

    #[test]
    fn authorities_sharing_a_ledger_share_single_use() {
        let ledger: Arc<dyn TransactionLedger> = Arc::new(InMemoryLedger::new());
        let a = authority().with_ledger(ledger.clone());
        let b = authority().with_ledger(ledger.clone());

        let token = a.issue_token(Claims::new()).unwrap();
        assert!(b.validate_token(&token).is_ok());
        assert_eq!(a.validate_token(&token), Err(TokenError::AlreadyUsed));
        assert_eq!(ledger.stats().used_tokens, 1);
    }

    #[test]
    fn caller_cannot_choose_the_identifier() {
        let auth = authority();
        let token = auth
            .issue_token(claims(json!({"jti": "chosen", "exp": 1})))
            .unwrap();

        let decoded = auth.validate_token(&token).unwrap();
        assert_ne!(decoded["jti"], "chosen");
        assert!(auth.transaction("chosen").is_none());

        let record = auth.transaction(decoded["jti"].as_str().unwrap()).unwrap();
        assert_eq!(record.payload["jti"], "chosen");
    }

    #[test]
    fn stats_follow_issuance_and_use() {
        let auth = authority();
        let t1 = auth.issue_token(Claims::new()).unwrap();
        auth.issue_token(Claims::new()).unwrap();
        assert_eq!(
            auth.stats(),
            TransactionStats {
                total_transactions: 2,
                active_tokens: 2,
                used_tokens: 0,
            }
        );

        auth.validate_token(&t1).unwrap();
        assert_eq!(
            auth.stats(),
            TransactionStats {
                total_transactions: 2,
                active_tokens: 1,
                used_tokens: 1,
            }
        );
    }

    #[test]
    fn used_record_keeps_caller_claims_and_use_time() {
        let clock = Arc::new(ManualClock::default());
        let auth = authority().with_clock(clock.clone());
        let token = auth.issue_token(claims(json!({"test": "devops"}))).unwrap();

        clock.advance(Duration::seconds(5));
        let decoded = auth.validate_token(&token).unwrap();

        let record = auth.transaction(decoded["jti"].as_str().unwrap()).unwrap();
        assert!(record.used);
        assert_eq!(record.used_at, Some(clock.now()));
        assert_eq!(record.payload, claims(json!({"test": "devops"})));
    }

    #[test]
    fn config_debug_redacts_secrets() {
        let config = AuthorityConfig::new(API_KEY, b"test-secret".to_vec());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains(API_KEY));
        assert!(!rendered.contains("test-secret"));
    }
}
