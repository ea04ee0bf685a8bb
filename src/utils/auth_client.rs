use log::{error, info};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;

/// Client for the hosted email/password auth service.
#[derive(Clone, Debug)]
pub struct AuthClient {
    http: Client,
    base_url: String,
    anon_key: String,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUserInfo {
    pub id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: String,
    pub user: AuthUserInfo,
}

/// Sign-up returns a session when email confirmation is off and just the
/// user when it is on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignUpOutcome {
    Session(Session),
    PendingConfirmation(AuthUserInfo),
}

#[derive(Deserialize, Default)]
struct ServiceError {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl ServiceError {
    fn into_message(self, status: StatusCode) -> String {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
            .unwrap_or_else(|| format!("Auth service responded with {}", status))
    }
}

impl AuthClient {
    pub fn new(http: Client, config: &Config) -> Self {
        Self {
            http,
            base_url: format!("{}/auth/v1", config.supabase_url),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.anon_key)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AppError> {
        let response = self
            .request(self.http.post(format!("{}/signup", self.base_url)))
            .json(&Credentials { email, password })
            .send()
            .await
            .map_err(transport_error)?;
        let outcome = parse_json::<SignUpOutcome>(response).await?;
        info!("Signed up {}", email);
        Ok(outcome)
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let response = self
            .request(self.http.post(format!("{}/token?grant_type=password", self.base_url)))
            .json(&Credentials { email, password })
            .send()
            .await
            .map_err(transport_error)?;
        parse_json::<Session>(response).await
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        let response = self
            .request(self.http.post(format!("{}/logout", self.base_url)))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(transport_error)?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(service_error(response).await)
    }

    /// Resolves the user behind an access token.
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUserInfo, AppError> {
        let response = self
            .request(self.http.get(format!("{}/user", self.base_url)))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(transport_error)?;
        parse_json::<AuthUserInfo>(response).await
    }
}

fn transport_error(err: reqwest::Error) -> AppError {
    error!("Auth service unreachable: {}", err);
    AppError::InternalServerError(err.to_string())
}

async fn parse_json<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, AppError> {
    if !response.status().is_success() {
        return Err(service_error(response).await);
    }
    response.json::<T>().await.map_err(|e| {
        error!("Unexpected auth service payload: {}", e);
        AppError::InternalServerError(e.to_string())
    })
}

async fn service_error(response: Response) -> AppError {
    let status = response.status();
    let message = response
        .json::<ServiceError>()
        .await
        .unwrap_or_default()
        .into_message(status);
    map_status(status, message)
}

fn map_status(status: StatusCode, message: String) -> AppError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => AppError::BadRequest(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unauthorized(message),
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::CONFLICT => AppError::Conflict(message),
        _ => {
            error!("Auth service error {}: {}", status, message);
            AppError::InternalServerError(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_message_prefers_msg() {
        let err: ServiceError = serde_json::from_str(
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        )
        .unwrap();
        assert_eq!(err.into_message(StatusCode::BAD_REQUEST), "Invalid login credentials");

        let err: ServiceError = serde_json::from_str(r#"{"msg":"User already registered"}"#).unwrap();
        assert_eq!(err.into_message(StatusCode::UNPROCESSABLE_ENTITY), "User already registered");
    }

    #[test]
    fn statuses_map_to_app_errors() {
        assert!(matches!(map_status(StatusCode::BAD_REQUEST, "x".into()), AppError::BadRequest(_)));
        assert!(matches!(map_status(StatusCode::UNAUTHORIZED, "x".into()), AppError::Unauthorized(_)));
        assert!(matches!(map_status(StatusCode::BAD_GATEWAY, "x".into()), AppError::InternalServerError(_)));
    }

    #[test]
    fn sign_up_without_confirmation_yields_session() {
        let body = r#"{
            "access_token": "t", "token_type": "bearer", "expires_in": 3600,
            "refresh_token": "r",
            "user": {"id": "7b0f6c1e-3a39-4c1b-9d5e-0c2a8f8e4b11", "email": "a@b.co"}
        }"#;
        assert!(matches!(serde_json::from_str::<SignUpOutcome>(body).unwrap(), SignUpOutcome::Session(_)));

        let pending = r#"{"id": "7b0f6c1e-3a39-4c1b-9d5e-0c2a8f8e4b11", "email": "a@b.co", "role": ""}"#;
        assert!(matches!(
            serde_json::from_str::<SignUpOutcome>(pending).unwrap(),
            SignUpOutcome::PendingConfirmation(_)
        ));
    }
}
