use axum::http::{header, HeaderMap, StatusCode};
use barberia_agenda::Role;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::models::{api_error, forbidden, ApiError};

pub use barberia_agenda::wire::Claims;

/// Lifetime of tokens printed by `barberia-server token` (30 days).
pub const TOKEN_TTL_SECS: i64 = 30 * 86400;

/// Sign the claims as an HS256 JWT.
pub fn sign_token(claims: &Claims, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify signature and expiry, returning the claims.
pub fn verify_token(token: &str, secret: &str) -> Option<Claims> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.leeway = 0;

    match decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            tracing::warn!("rejected token: {}", e);
            None
        }
    }
}

/// Extract the caller from `Authorization: Bearer <token>`.
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<Claims, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "Falta el token de autorización"))?;

    verify_token(token.trim(), secret)
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "Sesión inválida o expirada"))
}

pub fn require_staff(claims: &Claims) -> Result<(), ApiError> {
    if claims.rol.is_staff() {
        Ok(())
    } else {
        Err(forbidden())
    }
}

pub fn require_admin(claims: &Claims) -> Result<(), ApiError> {
    if claims.rol == Role::Admin {
        Ok(())
    } else {
        Err(forbidden())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret";

    fn make_claims(rol: Role, exp_offset: i64) -> Claims {
        Claims {
            id: 7,
            rol,
            nombre: "Juan Pérez".into(),
            exp: chrono::Utc::now().timestamp() + exp_offset,
        }
    }

    #[test]
    fn test_round_trip() {
        let claims = make_claims(Role::Barbero, 3600);
        let token = sign_token(&claims, SECRET).unwrap();
        assert_eq!(verify_token(&token, SECRET), Some(claims));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = sign_token(&make_claims(Role::Admin, 3600), SECRET).unwrap();
        assert!(verify_token(&token, "other").is_none());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let token = sign_token(&make_claims(Role::Cliente, 3600), SECRET).unwrap();
        let forged_claims = sign_token(&make_claims(Role::Admin, 3600), "other").unwrap();
        // Admin payload under the original signature
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = forged_claims.split('.').nth(1).unwrap();
        let forged = parts.join(".");
        assert_ne!(forged, token);
        assert!(verify_token(&forged, SECRET).is_none());
    }

    #[test]
    fn test_expired_rejected() {
        let token = sign_token(&make_claims(Role::Cliente, -1), SECRET).unwrap();
        assert!(verify_token(&token, SECRET).is_none());
    }

    #[test]
    fn test_name_with_dots_survives() {
        let mut claims = make_claims(Role::Cliente, 3600);
        claims.nombre = "J. R. Martínez".into();
        let token = sign_token(&claims, SECRET).unwrap();
        assert_eq!(verify_token(&token, SECRET).unwrap().nombre, "J. R. Martínez");
    }

    #[test]
    fn test_authenticate_requires_bearer_scheme() {
        let token = sign_token(&make_claims(Role::Cliente, 3600), SECRET).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Token {token}")).unwrap(),
        );
        let err = authenticate(&headers, SECRET).unwrap_err();
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        assert_eq!(authenticate(&headers, SECRET).unwrap().id, 7);
    }

    #[test]
    fn test_role_guards() {
        assert!(require_staff(&make_claims(Role::Barbero, 60)).is_ok());
        assert!(require_staff(&make_claims(Role::Cliente, 60)).is_err());
        assert!(require_admin(&make_claims(Role::Barbero, 60)).is_err());
    }
}
