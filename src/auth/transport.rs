use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

/// Cookie that carries the session token.
pub const SESSION_COOKIE: &str = "jwt";
/// Value written at logout. Both gates treat it as no token at all.
pub const LOGGED_OUT: &str = "loggedout";

const LOGOUT_COOKIE_TTL: Duration = Duration::seconds(10);

/// Pulls the session token out of a request. A `Bearer` authorization
/// header wins and is consumed even when empty; the `jwt` cookie is the
/// fallback.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = value.strip_prefix("Bearer ") {
            if token.is_empty() {
                return None;
            }
            return Some(token.to_string());
        }
    }

    let jar = CookieJar::from_headers(headers);
    jar.get(SESSION_COOKIE)
        .map(|c| c.value())
        .filter(|v| !v.is_empty() && *v != LOGGED_OUT)
        .map(|v| v.to_string())
}

/// Session cookie for a signed token. HttpOnly always; `secure` follows
/// what the proxy reports about the request.
pub fn session_cookie(token: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

/// Logout overwrites the session cookie with a short-lived sentinel.
pub fn logout_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, LOGGED_OUT))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(LOGOUT_COOKIE_TTL)
        .build()
}

/// True when the request reached us over TLS according to the proxy.
pub fn secure_request(headers: &HeaderMap) -> bool {
    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("https"))
        .unwrap_or(false)
}
