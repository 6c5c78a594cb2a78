//! Form validation
//!
//! Each form arrives as raw strings; validation returns a typed value or
//! per-field messages in [`FieldErrors`].

use crate::contract::{
    FieldErrors, HelpdeskError, TicketCategory, TicketDraft, TicketPriority, TicketStatus,
};
use serde::Deserialize;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_NAME_LEN: usize = 2;
pub const TITLE_MAX_LEN: usize = 255;
pub const DESCRIPTION_MAX_LEN: usize = 1500;

const PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters";
const INVALID_EMAIL: &str = "Invalid email address";
const NAME_TOO_SHORT: &str = "Name must be at least 2 characters";

// ===== Forms =====

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TicketForm {
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub category: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignUpForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CompleteProfileForm {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ForgotPasswordForm {
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResetPasswordForm {
    pub password: String,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PasswordChangeForm {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmailChangeForm {
    pub new_email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MessageForm {
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub content: String,
}

/// Avatar file as received from a multipart upload
#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: bytes::Bytes,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub full_name: String,
    pub occupation: Option<String>,
    pub avatar: Option<AvatarUpload>,
}

// ===== Rules =====

fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// Loose address check: one `@`, non-empty local part, dotted domain, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

fn check_email(errors: &mut FieldErrors, field: &str, email: &str) {
    if !is_valid_email(email.trim()) {
        errors.add(field, INVALID_EMAIL);
    }
}

fn check_password(errors: &mut FieldErrors, field: &str, password: &str) {
    if char_len(password) < MIN_PASSWORD_LEN {
        errors.add(field, PASSWORD_TOO_SHORT);
    }
}

fn check_name(errors: &mut FieldErrors, field: &str, name: &str) {
    if char_len(name.trim()) < MIN_NAME_LEN {
        errors.add(field, NAME_TOO_SHORT);
    }
}

pub fn validate_ticket(form: &TicketForm) -> Result<TicketDraft, HelpdeskError> {
    let mut errors = FieldErrors::new();
    let title = form.title.trim();
    let description = form.description.trim();

    if title.is_empty() {
        errors.add("title", "Title is required");
    } else if char_len(title) < 2 {
        errors.add("title", "Title must be at least 2 characters");
    } else if char_len(title) > TITLE_MAX_LEN {
        errors.add("title", "Title must be at most 255 characters");
    }
    if char_len(description) > DESCRIPTION_MAX_LEN {
        errors.add("description", "Description must be at most 1500 characters");
    }

    let status = form.status.parse::<TicketStatus>().ok();
    if status.is_none() {
        errors.add("status", "Please select a status");
    }
    let priority = form.priority.parse::<TicketPriority>().ok();
    if priority.is_none() {
        errors.add("priority", "Please select a priority");
    }
    let category = form.category.parse::<TicketCategory>().ok();
    if category.is_none() {
        errors.add("category", "Please select a category");
    }

    match (status, priority, category) {
        (Some(status), Some(priority), Some(category)) if errors.is_empty() => Ok(TicketDraft {
            title: title.to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            status,
            priority,
            category,
        }),
        _ => Err(HelpdeskError::Validation(errors)),
    }
}

pub fn validate_login(form: &LoginForm) -> Result<(), HelpdeskError> {
    let mut errors = FieldErrors::new();
    check_email(&mut errors, "email", &form.email);
    check_password(&mut errors, "password", &form.password);
    errors.into_result(())
}

pub fn validate_sign_up(form: &SignUpForm) -> Result<(), HelpdeskError> {
    let mut errors = FieldErrors::new();
    check_name(&mut errors, "full_name", &form.full_name);
    check_email(&mut errors, "email", &form.email);
    check_password(&mut errors, "password", &form.password);
    errors.into_result(())
}

pub fn validate_complete_profile(form: &CompleteProfileForm) -> Result<(), HelpdeskError> {
    let mut errors = FieldErrors::new();
    check_name(&mut errors, "name", &form.name);
    errors.into_result(())
}

pub fn validate_forgot_password(form: &ForgotPasswordForm) -> Result<(), HelpdeskError> {
    let mut errors = FieldErrors::new();
    check_email(&mut errors, "email", &form.email);
    errors.into_result(())
}

pub fn validate_reset_password(form: &ResetPasswordForm) -> Result<(), HelpdeskError> {
    let mut errors = FieldErrors::new();
    check_password(&mut errors, "password", &form.password);
    check_password(&mut errors, "confirmPassword", &form.confirm_password);
    if form.password != form.confirm_password {
        errors.add("confirmPassword", "Passwords do not match");
    }
    errors.into_result(())
}

pub fn validate_password_change(form: &PasswordChangeForm) -> Result<(), HelpdeskError> {
    let mut errors = FieldErrors::new();
    check_password(&mut errors, "current_password", &form.current_password);
    check_password(&mut errors, "new_password", &form.new_password);
    check_password(&mut errors, "confirm_password", &form.confirm_password);
    if form.new_password != form.confirm_password {
        errors.add("confirm_password", "Passwords do not match");
    }
    errors.into_result(())
}

pub fn validate_email_change(form: &EmailChangeForm) -> Result<(), HelpdeskError> {
    let mut errors = FieldErrors::new();
    check_email(&mut errors, "new_email", &form.new_email);
    errors.into_result(())
}

/// Trimmed content of 1..=`max_len` characters
pub fn validate_content(field: &str, content: &str, max_len: usize) -> Result<String, HelpdeskError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(HelpdeskError::field(field, "Message cannot be empty"));
    }
    if char_len(content) > max_len {
        return Err(HelpdeskError::field(
            field,
            format!("Message must be at most {max_len} characters"),
        ));
    }
    Ok(content.to_string())
}

pub fn validate_profile(form: &ProfileForm, max_avatar_bytes: usize) -> Result<(), HelpdeskError> {
    let mut errors = FieldErrors::new();
    check_name(&mut errors, "full_name", &form.full_name);

    if let Some(avatar) = &form.avatar {
        if avatar.bytes.len() >= max_avatar_bytes {
            errors.add("avatar", "Max 5 MB upload size.");
        }
        if avatar_extension(avatar).is_none() {
            errors.add("avatar", "Please upload an image file.");
        }
    }
    errors.into_result(())
}

/// File extension for an image upload, from its content type or file name
pub fn avatar_extension(avatar: &AvatarUpload) -> Option<String> {
    let mime: mime::Mime = avatar.content_type.parse().ok()?;
    if mime.type_() != mime::IMAGE {
        return None;
    }
    let from_name = avatar
        .file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));
    Some(from_name.unwrap_or_else(|| match mime.subtype().as_str() {
        "svg+xml" => "svg".to_string(),
        "jpeg" => "jpg".to_string(),
        other => other.to_string(),
    }))
}

/// Parse `"1,2, 3"` into ticket ids; blank input is an error
pub fn parse_ticket_ids(raw: Option<&str>) -> Result<Vec<i64>, HelpdeskError> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(HelpdeskError::field("ticketId", "Ticket ID is required"));
    }
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<i64>()
                .map_err(|_| HelpdeskError::field("ticketId", format!("Invalid ticket ID '{id}'")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket_form() -> TicketForm {
        TicketForm {
            title: "Printer on fire".to_string(),
            description: "Third floor".to_string(),
            status: "open".to_string(),
            priority: "high".to_string(),
            category: "bug".to_string(),
        }
    }

    fn field_errors(result: Result<impl std::fmt::Debug, HelpdeskError>) -> FieldErrors {
        match result {
            Err(HelpdeskError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_ticket_becomes_draft() {
        let draft = validate_ticket(&ticket_form()).unwrap();
        assert_eq!(draft.title, "Printer on fire");
        assert_eq!(draft.description.as_deref(), Some("Third floor"));
        assert_eq!(draft.status, TicketStatus::Open);
        assert_eq!(draft.priority, TicketPriority::High);
        assert_eq!(draft.category, TicketCategory::Bug);
    }

    #[test]
    fn blank_description_is_absent() {
        let mut form = ticket_form();
        form.description = "   ".to_string();
        assert_eq!(validate_ticket(&form).unwrap().description, None);
    }

    #[test]
    fn ticket_rules_report_every_field() {
        let form = TicketForm {
            title: "x".to_string(),
            description: "d".repeat(1501),
            status: "pending".to_string(),
            priority: String::new(),
            category: "chore".to_string(),
        };
        let errors = field_errors(validate_ticket(&form));
        assert_eq!(
            errors.get("title"),
            Some(&["Title must be at least 2 characters".to_string()][..])
        );
        assert!(errors.get("description").is_some());
        assert_eq!(
            errors.get("status"),
            Some(&["Please select a status".to_string()][..])
        );
        assert!(errors.get("priority").is_some());
        assert!(errors.get("category").is_some());
    }

    #[test]
    fn title_bounds() {
        let mut form = ticket_form();
        form.title = String::new();
        assert_eq!(
            field_errors(validate_ticket(&form)).get("title"),
            Some(&["Title is required".to_string()][..])
        );

        form.title = "t".repeat(TITLE_MAX_LEN);
        assert!(validate_ticket(&form).is_ok());
        form.title = "t".repeat(TITLE_MAX_LEN + 1);
        assert!(validate_ticket(&form).is_err());
    }

    #[test]
    fn email_check_is_loose_but_not_empty() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("a.b+c@mail.example.org"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("ada"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada@@example.com"));
        assert!(!is_valid_email("ada @example.com"));
        assert!(!is_valid_email("ada@example..com"));
    }

    #[test]
    fn sign_up_requires_name_email_and_password() {
        let errors = field_errors(validate_sign_up(&SignUpForm {
            full_name: "A".to_string(),
            email: "nope".to_string(),
            password: "12345".to_string(),
        }));
        assert_eq!(errors.get("full_name").map(<[String]>::len), Some(1));
        assert_eq!(
            errors.get("email"),
            Some(&["Invalid email address".to_string()][..])
        );
        assert_eq!(
            errors.get("password"),
            Some(&["Password must be at least 6 characters".to_string()][..])
        );
    }

    #[test]
    fn password_confirmation_must_match() {
        let errors = field_errors(validate_reset_password(&ResetPasswordForm {
            password: "secret1".to_string(),
            confirm_password: "secret2".to_string(),
        }));
        assert_eq!(
            errors.get("confirmPassword"),
            Some(&["Passwords do not match".to_string()][..])
        );

        let errors = field_errors(validate_password_change(&PasswordChangeForm {
            current_password: "oldpass".to_string(),
            new_password: "newpass1".to_string(),
            confirm_password: "newpass2".to_string(),
        }));
        assert!(errors.get("confirm_password").is_some());
        assert!(errors.get("current_password").is_none());
    }

    #[test]
    fn content_is_trimmed_and_bounded() {
        assert_eq!(validate_content("content", "  hi  ", 10).unwrap(), "hi");
        assert!(validate_content("content", "   ", 10).is_err());
        assert!(validate_content("content", &"x".repeat(11), 10).is_err());
        assert!(validate_content("content", &"é".repeat(10), 10).is_ok());
    }

    #[test]
    fn avatar_must_be_a_small_image() {
        let avatar = |content_type: &str, size: usize| AvatarUpload {
            file_name: "me.PNG".to_string(),
            content_type: content_type.to_string(),
            bytes: bytes::Bytes::from(vec![0u8; size]),
        };
        let form = |upload| ProfileForm {
            full_name: "Ada".to_string(),
            occupation: None,
            avatar: Some(upload),
        };

        assert!(validate_profile(&form(avatar("image/png", 10)), 100).is_ok());
        assert!(validate_profile(&form(avatar("image/png", 100)), 100).is_err());
        assert!(validate_profile(&form(avatar("application/pdf", 10)), 100).is_err());
        assert_eq!(
            avatar_extension(&avatar("image/png", 1)).as_deref(),
            Some("png")
        );

        let unnamed = AvatarUpload {
            file_name: "blob".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: bytes::Bytes::new(),
        };
        assert_eq!(avatar_extension(&unnamed).as_deref(), Some("jpg"));
    }

    #[test]
    fn ticket_ids_parse_from_comma_list() {
        assert_eq!(parse_ticket_ids(Some("1")).unwrap(), vec![1]);
        assert_eq!(parse_ticket_ids(Some("1, 2,3")).unwrap(), vec![1, 2, 3]);
        assert!(parse_ticket_ids(None).is_err());
        assert!(parse_ticket_ids(Some("  ")).is_err());
        assert!(parse_ticket_ids(Some("1,x")).is_err());
    }
}
