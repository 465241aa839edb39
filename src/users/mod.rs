use axum::extract::Request;
use axum::middleware::{from_fn, from_fn_with_state, Next};
use axum::routing::{delete, get};
use axum::Router;

use crate::auth::middleware::{authenticate, maybe_authenticate, require_role};
use crate::auth::repo_types::Role;
use crate::state::AppState;

pub mod handlers;

const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Account-facing routes behind the gates. Layer order matters: the layer
/// added last runs first, so `authenticate` always precedes `require_role`.
pub fn router(state: AppState) -> Router<AppState> {
    let session = Router::new()
        .route("/session", get(handlers::session))
        .route_layer(from_fn_with_state(state.clone(), maybe_authenticate));

    let personal = Router::new()
        .route("/me", get(handlers::me))
        .route("/deleteMe", delete(handlers::delete_me))
        .route_layer(from_fn_with_state(state.clone(), authenticate));

    let admin = Router::new()
        .route("/", get(handlers::list_users))
        .route_layer(from_fn(|req: Request, next: Next| {
            require_role(ADMIN_ONLY, req, next)
        }))
        .route_layer(from_fn_with_state(state, authenticate));

    session.merge(personal).merge(admin)
}
