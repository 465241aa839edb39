use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::error::AuthError;
use crate::auth::jwt::JwtKeys;
use crate::auth::repo_types::{Role, User};
use crate::auth::transport;
use crate::state::AppState;

/// Identity attached to a request once a gate lets it through. Carries no
/// credential material.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<User> for CurrentUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Missing extension means the route is not behind `authenticate`,
        // which is a wiring bug, not a client error.
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| AuthError::Internal(anyhow::anyhow!("route not behind authenticate")))
    }
}

/// Full token-to-identity resolution: extract, verify, re-check the account,
/// compare the change timestamp against `iat`.
async fn resolve_user(state: &AppState, headers: &HeaderMap) -> Result<CurrentUser, AuthError> {
    let token = transport::extract_token(headers).ok_or(AuthError::MissingCredentials)?;

    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify(&token)?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    if user.password_changed_after(claims.iat) {
        return Err(AuthError::PasswordChangedSince);
    }

    Ok(CurrentUser::from(user))
}

/// Hard gate. Requests that fail any check never reach the handler.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = match resolve_user(&state, req.headers()).await {
        Ok(user) => user,
        Err(e) => {
            warn!(reason = %e, "request rejected");
            return Err(e);
        }
    };
    debug!(user_id = %user.id, "request authenticated");
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Soft gate for endpoints that serve both audiences. Never rejects; a
/// request that fails any check just continues anonymous.
pub async fn maybe_authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    match resolve_user(&state, req.headers()).await {
        Ok(user) => {
            req.extensions_mut().insert(user);
        }
        Err(AuthError::Internal(e)) => {
            warn!(error = ?e, "soft gate failed internally; continuing anonymous");
        }
        Err(e) => {
            debug!(reason = %e, "request not authenticated");
        }
    }
    next.run(req).await
}

/// Role gate. Layer it under `authenticate`; it refuses identities whose
/// role is outside `allowed`.
pub async fn require_role(
    allowed: &'static [Role],
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| AuthError::Internal(anyhow::anyhow!("role gate without authenticate")))?;

    if !allowed.contains(&user.role) {
        warn!(user_id = %user.id, role = ?user.role, "role refused");
        return Err(AuthError::RoleNotPermitted);
    }

    Ok(next.run(req).await)
}
