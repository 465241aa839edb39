use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::{info, instrument};

use crate::auth::dto::PublicUser;
use crate::auth::error::AuthError;
use crate::auth::middleware::CurrentUser;
use crate::auth::repo_types::User;
use crate::state::AppState;

/// Body of the session status endpoint.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<CurrentUser>,
}

/// Served straight from the gate's identity, no extra lookup.
#[instrument(skip(current))]
pub async fn me(current: CurrentUser) -> Json<PublicUser> {
    Json(PublicUser::from(current))
}

/// Soft delete. The row stays; every auth lookup starts ignoring it.
#[instrument(skip(state, current))]
pub async fn delete_me(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<StatusCode, AuthError> {
    User::deactivate(&state.db, current.id).await?;
    info!(user_id = %current.id, "account deactivated");
    Ok(StatusCode::NO_CONTENT)
}

/// Works logged in or out; never responds 401.
#[instrument(skip(user))]
pub async fn session(user: Option<CurrentUser>) -> Json<SessionResponse> {
    Json(SessionResponse {
        authenticated: user.is_some(),
        user,
    })
}

/// Admin-only listing of active accounts.
#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<PublicUser>>, AuthError> {
    let users = User::list(&state.db).await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}
