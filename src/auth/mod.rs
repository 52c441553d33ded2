use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config;
use crate::store::User;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User uuid.
    pub sub: Uuid,
    pub username: String,
    pub role: String,
    /// Session uuid; the session must still be live when the token is used.
    pub sid: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user: &User, session_id: Uuid) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user.uuid,
            username: user.username.clone(),
            role: user.role.as_str().to_string(),
            sid: session_id,
            exp,
            iat: now.timestamp(),
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    InvalidToken(String),
    InvalidSecret,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::InvalidToken(msg) => write!(f, "Invalid JWT token: {}", msg),
            JwtError::InvalidSecret => write!(f, "Invalid JWT secret"),
        }
    }
}

impl std::error::Error for JwtError {}

pub fn generate_jwt(claims: &Claims) -> Result<String, JwtError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn validate_jwt(token: &str) -> Result<Claims, JwtError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}

/// Per-user salt. A random uuid is plenty of entropy here.
pub fn generate_salt() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    hash_password(password, salt) == expected_hash
}

/// Sessions store a digest of the issued token, never the token itself.
pub fn token_fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Role;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: 1,
            uuid: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: String::new(),
            salt: String::new(),
            role: Role::User,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn password_hash_round_trips() {
        let salt = generate_salt();
        let hash = hash_password("hunter2hunter2", &salt);
        assert!(verify_password("hunter2hunter2", &salt, &hash));
        assert!(!verify_password("wrong-password", &salt, &hash));
    }

    #[test]
    fn same_password_different_salt_different_hash() {
        let a = hash_password("hunter2hunter2", &generate_salt());
        let b = hash_password("hunter2hunter2", &generate_salt());
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let fp = token_fingerprint("some.jwt.token");
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn jwt_round_trips_claims() {
        let user = sample_user();
        let sid = Uuid::new_v4();
        let claims = Claims::new(&user, sid);
        assert!(claims.exp > claims.iat);

        let token = generate_jwt(&claims).unwrap();
        let decoded = validate_jwt(&token).unwrap();
        assert_eq!(decoded.sub, user.uuid);
        assert_eq!(decoded.username, "alice");
        assert_eq!(decoded.role, "USER");
        assert_eq!(decoded.sid, sid);
    }

    #[test]
    fn tampered_token_rejected() {
        let user = sample_user();
        let claims = Claims::new(&user, Uuid::new_v4());
        let mut token = generate_jwt(&claims).unwrap();
        token.push('x');
        assert!(matches!(
            validate_jwt(&token),
            Err(JwtError::InvalidToken(_))
        ));
    }
}
