use axum::{
    extract::{FromRef, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{error, info, instrument, warn};

use crate::auth::dto::{
    is_valid_email, ApiJson, AuthResponse, ForgotPasswordRequest, LoginRequest, PublicUser,
    ResetPasswordRequest, SignupRequest, StatusResponse, UpdatePasswordRequest,
};
use crate::auth::error::AuthError;
use crate::auth::jwt::JwtKeys;
use crate::auth::middleware::CurrentUser;
use crate::auth::password;
use crate::auth::repo_types::User;
use crate::auth::reset::{self, RESET_TOKEN_TTL};
use crate::auth::transport;
use crate::state::AppState;

/// Signs a session token for `user` and sets the cookie next to the JSON
/// body. Called only after every credential mutation is durable, so the
/// token's `iat` can never lag a pending change.
fn send_token(
    state: &AppState,
    jar: CookieJar,
    secure: bool,
    user: User,
    status: StatusCode,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), AuthError> {
    let keys = JwtKeys::from_ref(state);
    let token = keys.sign(user.id)?;
    let max_age = TimeDuration::seconds(keys.ttl.as_secs() as i64);
    let jar = jar.add(transport::session_cookie(token.clone(), max_age, secure));
    Ok((
        status,
        jar,
        Json(AuthResponse {
            token,
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(state, headers, jar, payload))]
pub async fn signup(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    ApiJson(mut payload): ApiJson<SignupRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), AuthError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.name = payload.name.trim().to_string();

    if payload.name.is_empty() {
        return Err(AuthError::Validation("Please tell us your name!".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AuthError::Validation("Please provide a valid email".into()));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(AuthError::Validation("Password too short".into()));
    }
    if payload.password != payload.password_confirm {
        return Err(AuthError::Validation("Passwords are not the same!".into()));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AuthError::EmailInUse);
    }

    let hash = password::hash_password(state.config.hash.clone(), payload.password).await?;

    let user = User::create(&state.db, &payload.name, &payload.email, &hash).await?;

    if let Err(e) = state.mailer.send_welcome(&user.email, &user.name).await {
        warn!(error = %e, user_id = %user.id, "welcome mail failed");
    }

    info!(user_id = %user.id, email = %user.email, "user signed up");
    send_token(
        &state,
        jar,
        transport::secure_request(&headers),
        user,
        StatusCode::CREATED,
    )
}

#[instrument(skip(state, headers, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    ApiJson(mut payload): ApiJson<LoginRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), AuthError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(AuthError::MissingFields("email and password"));
    }

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or(AuthError::IncorrectCredentials)?;

    let ok = password::verify_password(payload.password, user.password_hash.clone()).await?;
    if !ok {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(AuthError::IncorrectCredentials);
    }

    info!(user_id = %user.id, "user logged in");
    send_token(
        &state,
        jar,
        transport::secure_request(&headers),
        user,
        StatusCode::OK,
    )
}

/// Stateless logout: the token stays cryptographically valid until expiry,
/// the browser just stops carrying it.
#[instrument(skip(jar))]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<StatusResponse>) {
    (
        jar.add(transport::logout_cookie()),
        Json(StatusResponse {
            status: "success",
            message: None,
        }),
    )
}

/// Mints a reset token, stores only its digest and mails the plain text.
/// When delivery fails the digest is cleared again so the attempt leaves
/// nothing behind.
#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(mut payload): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<StatusResponse>, AuthError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or(AuthError::EmailNotFound)?;

    let token = reset::generate_token();
    let expires = OffsetDateTime::now_utc() + RESET_TOKEN_TTL;
    User::set_reset_token(&state.db, user.id, &token.hash, expires).await?;

    let reset_url = format!(
        "{}/api/v1/users/resetPassword/{}",
        state.config.public_base_url, token.plain
    );
    if let Err(e) = state.mailer.send_password_reset(&user.email, &reset_url).await {
        error!(error = %e, user_id = %user.id, "reset mail failed");
        if let Err(e) = User::clear_reset_token(&state.db, user.id).await {
            error!(error = %e, user_id = %user.id, "rollback of reset token failed");
        }
        return Err(AuthError::EmailDelivery);
    }

    info!(user_id = %user.id, "reset token issued");
    Ok(Json(StatusResponse {
        status: "success",
        message: Some("Token sent to email!".into()),
    }))
}

/// Consumes a reset token. Unknown, expired and already-used tokens are the
/// same 400 to the caller.
#[instrument(skip(state, headers, jar, token, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Path(token): Path<String>,
    ApiJson(payload): ApiJson<ResetPasswordRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), AuthError> {
    if payload.password.len() < 8 {
        return Err(AuthError::Validation("Password too short".into()));
    }
    if payload.password != payload.password_confirm {
        return Err(AuthError::Validation("Passwords are not the same!".into()));
    }

    // Look the digest up first so garbage tokens do not cost an argon2 hash.
    let token_hash = reset::hash_token(&token);
    if User::find_by_reset_token(&state.db, &token_hash).await?.is_none() {
        return Err(AuthError::InvalidOrExpiredResetToken);
    }

    let hash = password::hash_password(state.config.hash.clone(), payload.password).await?;

    // The conditional update is the real decision point; the lookup above is
    // advisory and a concurrent consumer can still lose here.
    let user = User::consume_reset_token(&state.db, &token_hash, &hash)
        .await?
        .ok_or(AuthError::InvalidOrExpiredResetToken)?;

    info!(user_id = %user.id, "password reset");
    send_token(
        &state,
        jar,
        transport::secure_request(&headers),
        user,
        StatusCode::OK,
    )
}

/// Password change for a logged-in user. Still demands the current password
/// so a hijacked session cannot silently lock the owner out.
#[instrument(skip(state, current, headers, jar, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    current: CurrentUser,
    headers: HeaderMap,
    jar: CookieJar,
    ApiJson(payload): ApiJson<UpdatePasswordRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), AuthError> {
    if payload.password.len() < 8 {
        return Err(AuthError::Validation("Password too short".into()));
    }
    if payload.password != payload.password_confirm {
        return Err(AuthError::Validation("Passwords are not the same!".into()));
    }

    let user = User::find_by_id(&state.db, current.id)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    let ok =
        password::verify_password(payload.password_current, user.password_hash.clone()).await?;
    if !ok {
        warn!(user_id = %user.id, "password update with wrong current password");
        return Err(AuthError::IncorrectPassword);
    }

    let hash = password::hash_password(state.config.hash.clone(), payload.password).await?;
    let user = User::update_password(&state.db, user.id, &hash).await?;

    info!(user_id = %user.id, "password updated");
    send_token(
        &state,
        jar,
        transport::secure_request(&headers),
        user,
        StatusCode::OK,
    )
}
