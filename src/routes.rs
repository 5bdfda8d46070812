//! HTTP endpoints for registration, sessions, profile lookup and password
//! resets. Request bodies are url-encoded forms, responses are JSON and the
//! session travels in the `session_id` cookie.

use crate::{
    authentication::{ResetToken, SessionId, authentication_actor::AuthenticationActorHandler},
    axum_util::{self, ApiError},
    error::Error,
    redact::redact_pairs,
};
use axum::{
    Form, Json, Router,
    extract::{State, rejection::FormRejection},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use tracing::instrument;

pub const SESSION_COOKIE_NAME: &str = "session_id";

#[derive(Default, Deserialize)]
pub struct CredentialsForm {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Default, Deserialize)]
pub struct ResetPasswordTokenForm {
    email: Option<String>,
}

#[derive(Default, Deserialize)]
pub struct UpdatePasswordForm {
    email: Option<String>,
    reset_token: Option<String>,
    new_password: Option<String>,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct EmailMessageResponse {
    email: Option<String>,
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct ProfileResponse {
    email: String,
}

#[derive(Debug, Serialize)]
struct ResetTokenResponse {
    email: String,
    reset_token: String,
}

/// A body that is not a url-encoded form counts as a form with every field
/// missing.
fn form_or_default<T: Default>(form: Result<Form<T>, FormRejection>) -> T {
    match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            tracing::debug!("Treating unreadable form as empty: {}", rejection);
            T::default()
        }
    }
}

fn session_id(jar: &CookieJar) -> Option<SessionId> {
    jar.get(SESSION_COOKIE_NAME)
        .map(|cookie| SessionId(cookie.value().to_string()))
}

async fn welcome() -> impl IntoResponse {
    Json(MessageResponse {
        message: "Bienvenue",
    })
}

#[instrument(skip_all)]
async fn register(
    State(auth): State<AuthenticationActorHandler>,
    form: Result<Form<CredentialsForm>, FormRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let form = form_or_default(form);
    tracing::info!(
        "registration: {}",
        redact_pairs(&[
            ("email", form.email.as_deref().unwrap_or_default()),
            ("password", form.password.as_deref().unwrap_or_default()),
        ])
    );
    let (Some(email), Some(password)) = (form.email, form.password) else {
        return Err(ApiError::BadRequest("email and password are required"));
    };
    match auth.register_user(email.clone(), password).await {
        Ok(_) => Ok(Json(EmailMessageResponse {
            email: Some(email),
            message: "user created",
        })),
        Err(Error::UserAlreadyExists(_)) => Err(ApiError::BadRequest("email already registered")),
        Err(e) => Err(e.into()),
    }
}

#[instrument(skip_all)]
async fn login(
    State(auth): State<AuthenticationActorHandler>,
    jar: CookieJar,
    form: Result<Form<CredentialsForm>, FormRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let form = form_or_default(form);
    tracing::info!(
        "login: {}",
        redact_pairs(&[
            ("email", form.email.as_deref().unwrap_or_default()),
            ("password", form.password.as_deref().unwrap_or_default()),
        ])
    );
    let (Some(email), Some(password)) = (form.email, form.password) else {
        return Err(ApiError::Unauthorized);
    };
    if !auth.valid_login(email.clone(), password).await? {
        return Err(ApiError::Unauthorized);
    }
    let Some(session_id) = auth.create_session(email.clone()).await? else {
        return Err(ApiError::Unauthorized);
    };

    let cookie = Cookie::build((SESSION_COOKIE_NAME, session_id.0))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    Ok((
        jar.add(cookie),
        Json(EmailMessageResponse {
            email: Some(email),
            message: "logged in",
        }),
    ))
}

#[instrument(skip_all)]
async fn logout(
    State(auth): State<AuthenticationActorHandler>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let Some(user) = auth.get_user_from_session_id(session_id(&jar)).await? else {
        return Err(ApiError::Forbidden);
    };
    auth.destroy_session(user.id).await?;
    tracing::info!("logged out user {}", user.id);

    Ok((
        jar.remove(Cookie::build(SESSION_COOKIE_NAME).path("/")),
        (StatusCode::FOUND, [(header::LOCATION, "/")]),
    ))
}

#[instrument(skip_all)]
async fn profile(
    State(auth): State<AuthenticationActorHandler>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let Some(user) = auth.get_user_from_session_id(session_id(&jar)).await? else {
        return Err(ApiError::Forbidden);
    };
    Ok(Json(ProfileResponse { email: user.email }))
}

#[instrument(skip_all)]
async fn get_reset_password_token(
    State(auth): State<AuthenticationActorHandler>,
    form: Result<Form<ResetPasswordTokenForm>, FormRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let form = form_or_default(form);
    tracing::info!(
        "reset token request: {}",
        redact_pairs(&[("email", form.email.as_deref().unwrap_or_default())])
    );
    let Some(email) = form.email else {
        return Err(ApiError::Forbidden);
    };
    match auth.get_reset_password_token(email.clone()).await {
        Ok(ResetToken(reset_token)) => Ok(Json(ResetTokenResponse { email, reset_token })),
        Err(Error::UnknownEmail) => Err(ApiError::Forbidden),
        Err(e) => Err(e.into()),
    }
}

#[instrument(skip_all)]
async fn update_password(
    State(auth): State<AuthenticationActorHandler>,
    form: Result<Form<UpdatePasswordForm>, FormRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let form = form_or_default(form);
    tracing::info!(
        "password update: {}",
        redact_pairs(&[
            ("email", form.email.as_deref().unwrap_or_default()),
            ("reset_token", form.reset_token.as_deref().unwrap_or_default()),
            ("new_password", form.new_password.as_deref().unwrap_or_default()),
        ])
    );
    match auth
        .update_password(form.reset_token.map(ResetToken), form.new_password)
        .await
    {
        Ok(()) => Ok(Json(EmailMessageResponse {
            email: form.email,
            message: "Password updated",
        })),
        Err(Error::InvalidResetToken) => Err(ApiError::Forbidden),
        Err(e) => Err(e.into()),
    }
}

pub fn router(auth: AuthenticationActorHandler) -> Router {
    Router::new()
        .route("/", get(welcome))
        .route("/users", post(register))
        .route("/sessions", post(login).delete(logout))
        .route("/sessions/", post(login).delete(logout))
        .route("/profile", get(profile))
        .route("/profile/", get(profile))
        .route(
            "/reset_password",
            post(get_reset_password_token).put(update_password),
        )
        .route(
            "/reset_password/",
            post(get_reset_password_token).put(update_password),
        )
        .fallback(axum_util::not_found)
        .with_state(auth)
}
