use std::sync::OnceLock;

use axum::{
    extract::Request,
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::{app_error::AppError, config};

/// Claims decoded from a verified bearer token and attached to the request
/// extensions for downstream handlers. Role checks (if any) happen in the
/// handlers, not here.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    pub exp: usize,
}

static DECODING_KEY: OnceLock<DecodingKey> = OnceLock::new();

/// Install the verification key from loaded config. Called once at startup;
/// later calls have no effect.
pub fn init(jwt_secret: &str) {
    let _ = DECODING_KEY.set(DecodingKey::from_secret(jwt_secret.as_bytes()));
}

fn decoding_key() -> &'static DecodingKey {
    // init() runs at startup; the dev default only covers contexts that skip
    // the startup wiring.
    DECODING_KEY.get_or_init(|| DecodingKey::from_secret(config::DEFAULT_JWT_SECRET.as_bytes()))
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}

fn decode_claims(token: &str, key: &DecodingKey) -> jsonwebtoken::errors::Result<AuthClaims> {
    Ok(decode::<AuthClaims>(token, key, &Validation::new(Algorithm::HS256))?.claims)
}

/// Identity-verification gate applied selectively to mutating routes.
/// 401 when no bearer token is present, 403 when verification fails.
pub async fn verify_token(mut req: Request, next: Next) -> Result<Response, AppError> {
    let token = bearer_token(&req).ok_or(AppError::Unauthorized)?;

    let claims = decode_claims(token, decoding_key()).map_err(|err| {
        tracing::debug!("Token verification failed: {err}");
        AppError::Forbidden("forbidden access".to_string())
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_auth(value: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/payments");
        if let Some(value) = value {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn signed_token(secret: &[u8], email: &str) -> String {
        let claims = AuthClaims {
            sub: Some("uid-1".to_string()),
            email: Some(email.to_string()),
            role: Some("user".to_string()),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        };
        jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    #[test]
    fn missing_header_yields_no_token() {
        let req = request_with_auth(None);
        assert!(bearer_token(&req).is_none());
    }

    #[test]
    fn non_bearer_header_yields_no_token() {
        let req = request_with_auth(Some("Basic dXNlcjpwYXNz"));
        assert!(bearer_token(&req).is_none());
    }

    #[test]
    fn empty_bearer_header_yields_no_token() {
        let req = request_with_auth(Some("Bearer "));
        assert!(bearer_token(&req).is_none());
    }

    #[test]
    fn bearer_header_is_stripped() {
        let req = request_with_auth(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&req), Some("abc.def.ghi"));
    }

    #[test]
    fn roundtrip_token_decodes() {
        let token = signed_token(b"unit-secret", "buyer@example.com");
        let decoded = decode_claims(&token, &DecodingKey::from_secret(b"unit-secret")).unwrap();
        assert_eq!(decoded.email.as_deref(), Some("buyer@example.com"));
    }

    #[test]
    fn wrong_key_is_rejected() {
        let token = signed_token(b"unit-secret", "buyer@example.com");
        assert!(decode_claims(&token, &DecodingKey::from_secret(b"another-secret")).is_err());
    }

    #[test]
    fn startup_installed_key_drives_verification() {
        init("configured-secret");
        let token = signed_token(b"configured-secret", "admin@example.com");
        assert!(decode_claims(&token, decoding_key()).is_ok());
    }
}
