use axum::middleware::from_fn_with_state;
use axum::routing::{get, patch, post};
use axum::Router;

use crate::state::AppState;

pub mod claims;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod reset;
pub mod transport;

/// Account and session routes. The password update sits behind the hard
/// gate; everything else must be reachable logged out.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/signup", post(handlers::signup))
        .route("/login", post(handlers::login))
        .route("/logout", get(handlers::logout))
        .route("/forgotPassword", post(handlers::forgot_password))
        .route("/resetPassword/:token", patch(handlers::reset_password));

    let protected = Router::new()
        .route("/updateMyPassword", patch(handlers::update_password))
        .route_layer(from_fn_with_state(state, middleware::authenticate));

    public.merge(protected)
}
