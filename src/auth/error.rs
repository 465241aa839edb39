use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::auth::jwt::TokenError;

/// Every refusal the auth surface can produce, mapped onto the wire
/// contract in `IntoResponse`.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing credentials")]
    MissingCredentials,
    #[error("invalid token")]
    InvalidToken,
    #[error("expired token")]
    ExpiredToken,
    #[error("user for token no longer exists")]
    UserNotFound,
    #[error("password changed after token was issued")]
    PasswordChangedSince,
    #[error("role not permitted")]
    RoleNotPermitted,
    #[error("reset token invalid or expired")]
    InvalidOrExpiredResetToken,
    #[error("missing fields: {0}")]
    MissingFields(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("incorrect email or password")]
    IncorrectCredentials,
    #[error("current password is wrong")]
    IncorrectPassword,
    #[error("no user with that email")]
    EmailNotFound,
    #[error("email already registered")]
    EmailInUse,
    #[error("mail delivery failed")]
    EmailDelivery,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => Self::ExpiredToken,
            TokenError::Invalid => Self::InvalidToken,
        }
    }
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingCredentials
            | Self::InvalidToken
            | Self::ExpiredToken
            | Self::UserNotFound
            | Self::PasswordChangedSince
            | Self::IncorrectCredentials
            | Self::IncorrectPassword => StatusCode::UNAUTHORIZED,
            Self::RoleNotPermitted => StatusCode::FORBIDDEN,
            Self::InvalidOrExpiredResetToken | Self::MissingFields(_) | Self::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::EmailNotFound => StatusCode::NOT_FOUND,
            Self::EmailInUse => StatusCode::CONFLICT,
            Self::EmailDelivery | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::MissingCredentials => {
                "You are not logged in! Please log in to get access.".into()
            }
            // Both token refusals share one message on the wire.
            Self::InvalidToken | Self::ExpiredToken => {
                "Invalid or expired token. Please log in again.".into()
            }
            Self::UserNotFound => "The user belonging to this token does no longer exist.".into(),
            Self::PasswordChangedSince => {
                "User recently changed password! Please log in again.".into()
            }
            Self::RoleNotPermitted => "You do not have permission to perform this action".into(),
            Self::InvalidOrExpiredResetToken => "Token is invalid or has expired".into(),
            Self::MissingFields(fields) => format!("Please provide {fields}!"),
            Self::Validation(msg) => msg.clone(),
            Self::IncorrectCredentials => "Incorrect email or password".into(),
            Self::IncorrectPassword => "Your current password is wrong.".into(),
            Self::EmailNotFound => "There is no user with email address.".into(),
            Self::EmailInUse => "Email already registered".into(),
            Self::EmailDelivery => "There was an error sending the email. Try again later!".into(),
            Self::Internal(_) => "Something went very wrong!".into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Internal(e) = &self {
            error!(error = ?e, "internal error");
        }
        let status = self.status_code();
        let body = ErrorBody {
            // "fail" marks problems the caller can fix, "error" is ours.
            status: if status.is_client_error() { "fail" } else { "error" },
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(err: AuthError) -> serde_json::Value {
        let res = err.into_response();
        let bytes = res
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[test]
    fn status_codes_match_contract() {
        assert_eq!(
            AuthError::MissingCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::ExpiredToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::UserNotFound.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::PasswordChangedSince.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::RoleNotPermitted.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::InvalidOrExpiredResetToken.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AuthError::EmailNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AuthError::EmailInUse.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AuthError::EmailDelivery.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn token_refusals_are_indistinguishable() {
        assert_eq!(
            AuthError::InvalidToken.status_code(),
            AuthError::ExpiredToken.status_code()
        );
        assert_eq!(
            AuthError::InvalidToken.public_message(),
            AuthError::ExpiredToken.public_message()
        );
    }

    #[test]
    fn token_error_maps_to_matching_variants() {
        assert!(matches!(
            AuthError::from(TokenError::Expired),
            AuthError::ExpiredToken
        ));
        assert!(matches!(
            AuthError::from(TokenError::Invalid),
            AuthError::InvalidToken
        ));
    }

    #[tokio::test]
    async fn client_errors_use_fail_status_word() {
        let body = body_of(AuthError::RoleNotPermitted).await;
        assert_eq!(body["status"], "fail");
        assert_eq!(
            body["message"],
            "You do not have permission to perform this action"
        );
    }

    #[tokio::test]
    async fn server_errors_use_error_status_word_and_generic_message() {
        let body = body_of(AuthError::Internal(anyhow::anyhow!("pool exhausted"))).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Something went very wrong!");
    }

    #[tokio::test]
    async fn missing_fields_name_the_fields() {
        let body = body_of(AuthError::MissingFields("email and password")).await;
        assert_eq!(body["message"], "Please provide email and password!");
    }
}
