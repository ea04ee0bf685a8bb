use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use std::future::{ready, Ready};

use actix_web::dev::{Payload, ServiceRequest};
use actix_web::{web, Error, FromRequest, HttpMessage, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use log::warn;

use crate::config::Config;
use crate::errors::AppError;

/// Access-token claims issued by the hosted auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub aud: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

const AUDIENCE: &str = "authenticated";

/// Validates an access token and returns the claims if valid.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[AUDIENCE]);
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
}

/// Validator function for the `HttpAuthentication::bearer` middleware.
/// Valid claims are stored in the request extensions for `AuthUser`.
pub async fn validator(
    req: ServiceRequest,
    credentials: BearerAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    let config = req.app_data::<web::Data<Config>>().cloned();
    let Some(config) = config else {
        return Err((actix_web::error::ErrorInternalServerError("Missing configuration"), req));
    };
    match validate_token(credentials.token(), &config.jwt_secret) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            Ok(req)
        }
        Err(err) => {
            warn!("Rejected bearer token: {}", err);
            Err((AppError::Unauthorized("Invalid token".to_string()).into(), req))
        }
    }
}

/// The signed-in user for the current request.
///
/// Handlers take this as an argument instead of reading shared state.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub access_token: String,
}

impl AuthUser {
    fn from_claims(claims: &Claims, access_token: String) -> Result<Self, AppError> {
        let id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("Token subject is not a user id".to_string()))?;
        Ok(Self { id, email: claims.email.clone(), access_token })
    }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|auth| auth.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn extract_user(req: &HttpRequest) -> Result<AuthUser, AppError> {
    let token = bearer_token(req).ok_or_else(|| AppError::Unauthorized("Missing token".to_string()))?;

    if let Some(claims) = req.extensions().get::<Claims>() {
        return AuthUser::from_claims(claims, token);
    }

    // Route without the middleware: validate here.
    let config = req
        .app_data::<web::Data<Config>>()
        .ok_or_else(|| AppError::InternalServerError("Missing configuration".to_string()))?;
    let claims = validate_token(&token, &config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))?;
    AuthUser::from_claims(&claims, token)
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(extract_user(req))
    }
}

/// Mints a token the way the auth service does. Test-only.
#[cfg(test)]
pub fn generate_token(user_id: Uuid, email: &str, secret: &str) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
        email: Some(email.to_string()),
        aud: Some(AUDIENCE.to_string()),
        role: Some("authenticated".to_string()),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .expect("token encodes")
}
