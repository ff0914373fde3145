//! Cookie transport for the signed session.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::config::SESSION_MAX_AGE_SECONDS;

/// Create session cookie.
pub fn session_cookie(name: &str, token: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), token.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(Duration::seconds(SESSION_MAX_AGE_SECONDS))
        .build()
}

/// Create removal cookie for session.
pub fn clear_session_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("console.session-token", "jwt", false);
        assert_eq!(cookie.value(), "jwt");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::hours(24)));

        let cleared = clear_session_cookie("console.session-token");
        assert_eq!(cleared.max_age(), Some(Duration::ZERO));
    }
}
