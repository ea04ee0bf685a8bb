use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use validator::Validate;
use log::info;
use crate::errors::AppError;
use crate::utils::auth_client::{AuthClient, AuthUserInfo, SignUpOutcome};
use crate::utils::jwt::AuthUser;
use crate::utils::validation::validate_payload;

#[derive(Deserialize, Validate)]
pub struct AuthRequest {
    #[validate(email(message = "Invalid email format"))]
    email: String,

    #[validate(length(min = 6, max = 72, message = "Password must be between 6 and 72 characters"))]
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    user: AuthUserInfo,
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    user: Option<AuthUserInfo>,
}

// POST /v1/auth/login
pub async fn login(
    req: web::Json<AuthRequest>,
    auth: web::Data<AuthClient>,
) -> Result<HttpResponse, AppError> {
    validate_payload(&*req)?;

    let session = auth.sign_in_with_password(&req.email, &req.password).await?;
    info!("User {} signed in", session.user.id);

    Ok(HttpResponse::Ok().json(AuthResponse {
        user: session.user,
        access_token: Some(session.access_token),
        refresh_token: Some(session.refresh_token),
        expires_in: Some(session.expires_in),
        message: "Logged in successfully!".to_string(),
    }))
}

// POST /v1/auth/signup
pub async fn signup(
    req: web::Json<AuthRequest>,
    auth: web::Data<AuthClient>,
) -> Result<HttpResponse, AppError> {
    validate_payload(&*req)?;

    let response = match auth.sign_up(&req.email, &req.password).await? {
        SignUpOutcome::Session(session) => AuthResponse {
            user: session.user,
            access_token: Some(session.access_token),
            refresh_token: Some(session.refresh_token),
            expires_in: Some(session.expires_in),
            message: "Sign up successful!".to_string(),
        },
        SignUpOutcome::PendingConfirmation(user) => AuthResponse {
            user,
            access_token: None,
            refresh_token: None,
            expires_in: None,
            message: "Sign up successful! Please check your email for the confirmation link.".to_string(),
        },
    };

    Ok(HttpResponse::Created().json(response))
}

// POST /v1/auth/logout
pub async fn logout(
    user: AuthUser,
    auth: web::Data<AuthClient>,
) -> Result<HttpResponse, AppError> {
    auth.sign_out(&user.access_token).await?;
    info!("User {} signed out", user.id);
    Ok(HttpResponse::NoContent().finish())
}

// GET /v1/auth/session
pub async fn session(
    user: AuthUser,
    auth: web::Data<AuthClient>,
) -> Result<HttpResponse, AppError> {
    let info = auth.get_user(&user.access_token).await?;
    Ok(HttpResponse::Ok().json(SessionResponse { user: Some(info) }))
}
