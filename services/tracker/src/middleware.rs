//! Session cookie middleware
//!
//! The session cookie carries the numeric Telegram user id. Every request
//! under `/api` passes through [`session_middleware`], which resolves the
//! cookie to a stored user and exposes it through request extensions.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::warn;

use crate::{error::ApiError, state::AppState};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session_id";

/// Session lifetime in days
pub const SESSION_DAYS: i64 = 30;

/// Resolve the session cookie to a user; unknown sessions stay anonymous.
/// A failed lookup answers 500 instead of degrading to anonymous.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(user_id) = session_user_id(&jar) {
        match state.user_repository.find_by_id(user_id).await {
            Ok(Some(mut user)) => {
                user.is_admin = state.admin_policy.is_admin(user.id);
                request.extensions_mut().insert(user);
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Failed to resolve session for user {}", user_id);
                return ApiError::from(e).into_response();
            }
        }
    }

    next.run(request).await
}

/// User id stored in the session cookie, if it parses
pub fn session_user_id(jar: &CookieJar) -> Option<i64> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| cookie.value().parse::<i64>().ok())
}

/// Cookie established after a successful login
pub fn session_cookie(user_id: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, user_id.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(SESSION_DAYS))
        .build()
}

/// Cookie template used to clear the session on logout
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie(42, true);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "42");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(30)));
    }

    #[test]
    fn test_session_user_id_parsing() {
        let jar = CookieJar::new().add(session_cookie(7, false));
        assert_eq!(session_user_id(&jar), Some(7));

        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, "not-a-number"));
        assert_eq!(session_user_id(&jar), None);

        assert_eq!(session_user_id(&CookieJar::new()), None);
    }
}
