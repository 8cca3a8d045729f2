pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use password::{compare_password, hash_password, PasswordError, PasswordHasher};

/// Tokens are always signed with HS256.
const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Accepted on validation. Anything outside the HMAC family is rejected.
const HMAC_FAMILY: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// NumericDate fields: integer or fractional seconds since the epoch.
/// Fractions are dropped.
mod numeric_date {
    use serde::{de, Deserialize, Deserializer};
    use serde_json::Number;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let n = Number::deserialize(deserializer)?;
        n.as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                    .map(|f| f.floor() as i64)
            })
            .ok_or_else(|| de::Error::custom(format!("numeric date out of range: {}", n)))
    }
}

/// `(iat, exp)` for a token issued now, or an error when `now + ttl` overflows
fn issue_window(ttl: Duration) -> Result<(i64, i64), JwtError> {
    let now = Utc::now();
    let exp = now
        .checked_add_signed(ttl)
        .ok_or_else(|| JwtError::TokenGeneration("token lifetime out of range".to_string()))?;
    Ok((now.timestamp(), exp.timestamp()))
}

/// Fixed claim set. Only `exp` is required when decoding; missing fields are zero-filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role: String,
    #[serde(deserialize_with = "numeric_date::deserialize")]
    pub exp: i64,
    #[serde(default, deserialize_with = "numeric_date::deserialize")]
    pub iat: i64,
}

impl Claims {
    pub fn new(
        user_id: i64,
        email: impl Into<String>,
        role: impl Into<String>,
        ttl: Duration,
    ) -> Result<Self, JwtError> {
        let (iat, exp) = issue_window(ttl)?;
        Ok(Self {
            user_id,
            email: email.into(),
            role: role.into(),
            exp,
            iat,
        })
    }
}

/// Open claim set: arbitrary top-level keys next to `exp` and `iat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomClaims {
    #[serde(flatten)]
    pub data: Map<String, Value>,
    #[serde(deserialize_with = "numeric_date::deserialize")]
    pub exp: i64,
    #[serde(default, deserialize_with = "numeric_date::deserialize")]
    pub iat: i64,
}

impl CustomClaims {
    pub fn new(mut data: Map<String, Value>, ttl: Duration) -> Result<Self, JwtError> {
        // exp/iat belong to the issuer
        data.remove("exp");
        data.remove("iat");

        let (iat, exp) = issue_window(ttl)?;
        Ok(Self { data, exp, iat })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// String value, or `""` when missing or not a string
    pub fn get_string(&self, key: &str) -> String {
        match self.data.get(key) {
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        }
    }

    /// Non-negative integer, or `0`. Accepts whole floats and numeric strings.
    pub fn get_u64(&self, key: &str) -> u64 {
        match self.data.get(key) {
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
                .unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    /// Signed integer, or `0`. Accepts whole floats and numeric strings.
    pub fn get_i64(&self, key: &str) -> i64 {
        match self.data.get(key) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    pub fn get_f64(&self, key: &str) -> f64 {
        match self.data.get(key) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    pub fn get_bool(&self, key: &str) -> bool {
        matches!(self.data.get(key), Some(Value::Bool(true)))
    }
}

/// Verified payload of either token flavour
#[derive(Debug, Clone, PartialEq)]
pub enum TokenClaims {
    Standard(Claims),
    Custom(CustomClaims),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JwtError {
    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    ExpiredToken,

    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("token payload must be a JSON object")]
    InvalidPayload,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
}

trait Expiring {
    fn expires_at(&self) -> i64;
}

impl Expiring for Claims {
    fn expires_at(&self) -> i64 {
        self.exp
    }
}

impl Expiring for CustomClaims {
    fn expires_at(&self) -> i64 {
        self.exp
    }
}

/// Issue a token carrying the fixed claim set
pub fn generate_token(
    user_id: i64,
    email: &str,
    role: &str,
    secret: &str,
    ttl: Duration,
) -> Result<String, JwtError> {
    sign(&Claims::new(user_id, email, role, ttl)?, secret)
}

/// Issue a token from any payload that serializes to a JSON object
pub fn generate_custom_token<P: Serialize>(
    payload: &P,
    secret: &str,
    ttl: Duration,
) -> Result<String, JwtError> {
    let data = match serde_json::to_value(payload) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return Err(JwtError::InvalidPayload),
        Err(e) => return Err(JwtError::TokenGeneration(e.to_string())),
    };
    sign(&CustomClaims::new(data, ttl)?, secret)
}

fn sign<T: Serialize>(claims: &T, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::new(SIGNING_ALGORITHM), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Verify signature and expiry, returning the fixed claim set
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    verify(token, secret)
}

/// Verify signature and expiry, returning the open claim set
pub fn validate_custom_token(token: &str, secret: &str) -> Result<CustomClaims, JwtError> {
    verify(token, secret)
}

fn verify<T: DeserializeOwned + Expiring>(token: &str, secret: &str) -> Result<T, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let mut validation = Validation::new(SIGNING_ALGORITHM);
    validation.algorithms = HMAC_FAMILY.to_vec();
    validation.validate_aud = false;
    // `exp` presence and format are enforced by the claim types, which also
    // accept fractional NumericDates. Expiry is checked below with a strict
    // comparison and no leeway.
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation.leeway = 0;

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<T>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
        _ => JwtError::InvalidToken,
    })?;

    if token_data.claims.expires_at() <= Utc::now().timestamp() {
        return Err(JwtError::ExpiredToken);
    }

    Ok(token_data.claims)
}

/// Decode claims without checking signature or expiry.
/// Only for tokens that were already verified upstream.
pub fn parse_claims_unverified(token: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(SIGNING_ALGORITHM);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|_| JwtError::InvalidToken)
}
