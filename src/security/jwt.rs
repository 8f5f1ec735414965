use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const REALM_CUSTOMER: &str = "customer";
pub const REALM_ADMIN: &str = "admin";

const TOKEN_EXPIRY_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub realm: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn subject_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|_| anyhow!("Invalid subject in token"))
    }
}

pub fn issue_token(
    secret: &str,
    subject: Uuid,
    realm: &str,
    email: &str,
    role: Option<&str>,
) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: subject.to_string(),
        realm: realm.to_string(),
        email: email.to_string(),
        role: role.map(String::from),
        exp: (now + Duration::hours(TOKEN_EXPIRY_HOURS)).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| anyhow!("Failed to sign token: {}", e))
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.set_required_spec_claims(&["sub", "exp"]);
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| anyhow!("Invalid token: {}", e))?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_decode_roundtrip() {
        let id = Uuid::new_v4();
        let token = issue_token("sekrit", id, REALM_ADMIN, "ops@example.com", Some("staff"))
            .unwrap();
        let claims = decode_token("sekrit", &token).unwrap();
        assert_eq!(claims.subject_id().unwrap(), id);
        assert_eq!(claims.realm, REALM_ADMIN);
        assert_eq!(claims.email, "ops@example.com");
        assert_eq!(claims.role.as_deref(), Some("staff"));
    }

    #[test]
    fn test_decode_rejects_wrong_secret() {
        let token =
            issue_token("sekrit", Uuid::new_v4(), REALM_CUSTOMER, "a@b.c", None).unwrap();
        assert!(decode_token("other", &token).is_err());
    }
}
