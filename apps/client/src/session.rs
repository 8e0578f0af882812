use barberia_agenda::{wire::Claims, Role};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::error::ClientError;

/// Who is calling and where. Passed explicitly to [`crate::ApiClient`];
/// nothing in this crate reads credentials from globals.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub base_url: String,
    pub token: String,
    pub role: Role,
    pub user_id: i64,
}

impl Session {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, role: Role, user_id: i64) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            token: token.into(),
            role,
            user_id,
        }
    }

    /// Read the user id and role from the JWT payload. The client has no
    /// secret, so signature and expiry are left for the server to check.
    pub fn from_token(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, ClientError> {
        let token = token.into();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let claims = decode::<Claims>(&token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|e| {
                tracing::warn!("unreadable session token: {}", e);
                ClientError::Validation("Token de sesión inválido".into())
            })?
            .claims;

        Ok(Self::new(base_url, token, claims.rol, claims.id))
    }

    /// `BARBERIA_API_URL` and `BARBERIA_TOKEN`; `BARBERIA_ROLE` overrides
    /// the role found in the token.
    pub fn from_env() -> Result<Self, ClientError> {
        let base_url =
            std::env::var("BARBERIA_API_URL").unwrap_or_else(|_| "http://localhost:3000".into());
        let token = std::env::var("BARBERIA_TOKEN")
            .map_err(|_| ClientError::Validation("BARBERIA_TOKEN no está definido".into()))?;

        let mut session = Self::from_token(base_url, token)?;
        if let Ok(role) = std::env::var("BARBERIA_ROLE") {
            session.role = role.parse().map_err(ClientError::Validation)?;
        }
        Ok(session)
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}
