//! Session and PKCE verifier cookies

use crate::config::CookieConfig;
use crate::contract::{Session, SessionCookies};
use tower_cookies::cookie::time::Duration;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};

/// PKCE verifiers only need to survive one OAuth round trip
const VERIFIER_MAX_AGE_SECS: i64 = 600;

fn cookie(name: &str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

fn removal(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), String::new())).path("/").build()
}

pub fn read_session(cookies: &Cookies, names: &CookieConfig) -> SessionCookies {
    SessionCookies {
        access_token: cookies
            .get(&names.access_token)
            .map(|c| c.value().to_string()),
        refresh_token: cookies
            .get(&names.refresh_token)
            .map(|c| c.value().to_string()),
    }
}

pub fn store_session(cookies: &Cookies, names: &CookieConfig, session: &Session) {
    let mut access = cookie(&names.access_token, session.access_token.clone(), names.secure);
    if let Some(expires_in) = session.expires_in {
        access.set_max_age(Duration::seconds(expires_in));
    }
    cookies.add(access);

    match &session.refresh_token {
        Some(refresh) => cookies.add(cookie(&names.refresh_token, refresh.clone(), names.secure)),
        None => cookies.remove(removal(&names.refresh_token)),
    }
}

pub fn clear_session(cookies: &Cookies, names: &CookieConfig) {
    cookies.remove(removal(&names.access_token));
    cookies.remove(removal(&names.refresh_token));
}

pub fn store_verifier(cookies: &Cookies, names: &CookieConfig, verifier: &str) {
    let mut verifier = cookie(&names.code_verifier, verifier.to_string(), names.secure);
    verifier.set_max_age(Duration::seconds(VERIFIER_MAX_AGE_SECS));
    cookies.add(verifier);
}

/// Read and drop the verifier cookie
pub fn take_verifier(cookies: &Cookies, names: &CookieConfig) -> Option<String> {
    let verifier = cookies
        .get(&names.code_verifier)
        .map(|c| c.value().to_string());
    if verifier.is_some() {
        cookies.remove(removal(&names.code_verifier));
    }
    verifier
}
