//! Page paths used for routing and redirects

pub const ROOT: &str = "/";

pub const PRIVATE_PREFIX: &str = "/private";
pub const TICKETS: &str = "/private/tickets";
pub const MESSAGES: &str = "/private/messages";
pub const PROFILE: &str = "/private/account/profile";
pub const SETTINGS: &str = "/private/account/settings";

pub const LOGIN: &str = "/auth/login";
pub const SIGN_UP: &str = "/auth/sign-up";
pub const COMPLETE_PROFILE: &str = "/auth/complete-profile";
pub const FORGOT_PASSWORD: &str = "/auth/forgot-password";
pub const RESET_PASSWORD: &str = "/auth/reset-password";
pub const CHECK_EMAIL: &str = "/auth/check-email";
pub const EMAIL_CHANGING: &str = "/auth/email-changing";
pub const CALLBACK: &str = "/auth/callback";
pub const AUTH_ERROR: &str = "/auth/error";
pub const LOGOUT: &str = "/auth/logout";

/// Chat detail page
pub fn chat(chat_id: impl std::fmt::Display) -> String {
    format!("{MESSAGES}/{chat_id}")
}

/// `/auth/check-email?reason=...`
pub fn check_email(reason: &str) -> String {
    format!("{CHECK_EMAIL}?reason={reason}")
}

/// `true` for `/private` and everything below it
pub fn is_private(path: &str) -> bool {
    path == PRIVATE_PREFIX || path.starts_with("/private/")
}
