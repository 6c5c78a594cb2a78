//! Authentication, settings and profile flow tests

mod common;

use bytes::Bytes;
use common::{print_test_header, TestApp, PASSWORD};
use helpdesk_service::contract::*;
use helpdesk_service::domain::repository::TableRepository;
use helpdesk_service::domain::validation::*;
use helpdesk_service::paths;

fn validation_field(result: Result<impl std::fmt::Debug, HelpdeskError>, field: &str) -> Vec<String> {
    match result {
        Err(HelpdeskError::Validation(errors)) => errors
            .get(field)
            .map(<[String]>::to_vec)
            .unwrap_or_default(),
        other => panic!("expected validation error on {field}, got {other:?}"),
    }
}

// ===== Sign up / login =====

#[tokio::test]
async fn test_sign_up_creates_user_profile() {
    print_test_header(
        "test_sign_up_creates_user_profile",
        "Sign-up registers the identity and a profile with role user",
    );

    let app = TestApp::new().await;
    let account = &app.module.state().account;

    let redirect = account
        .sign_up(&SignUpForm {
            full_name: "  Jane Doe ".to_string(),
            email: "jane@test.io".to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap();
    assert_eq!(redirect, "/auth/check-email?reason=verify-email");

    let profiles = app.profiles().list(&QueryOptions::new()).await.unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].full_name.as_deref(), Some("Jane Doe"));
    assert_eq!(profiles[0].role, Some(UserRole::User));
    assert!(profiles[0].is_complete());

    let duplicate = account
        .sign_up(&SignUpForm {
            full_name: "Jane Again".to_string(),
            email: "jane@test.io".to_string(),
            password: PASSWORD.to_string(),
        })
        .await;
    assert_eq!(
        validation_field(duplicate, "email"),
        vec!["User already registered".to_string()]
    );
}

#[tokio::test]
async fn test_sign_up_validates_form() {
    let app = TestApp::new().await;
    let account = &app.module.state().account;

    let result = account
        .sign_up(&SignUpForm {
            full_name: "J".to_string(),
            email: "not-an-email".to_string(),
            password: "123".to_string(),
        })
        .await;
    match result {
        Err(HelpdeskError::Validation(errors)) => {
            for field in ["full_name", "email", "password"] {
                assert!(errors.get(field).is_some(), "missing error for {field}");
            }
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(app.profiles().list(&QueryOptions::new()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_login_with_wrong_password_flags_password_field() {
    let app = TestApp::new().await;
    let actor = app.actor("joe@test.io", "Joe", UserRole::User).await;
    let account = &app.module.state().account;

    let session = account
        .login(&LoginForm {
            email: "joe@test.io".to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap();
    assert_eq!(session.user.map(|u| u.id), Some(actor.user.id));

    let denied = account
        .login(&LoginForm {
            email: "joe@test.io".to_string(),
            password: "wrong-password".to_string(),
        })
        .await;
    assert!(!validation_field(denied, "password").is_empty());
}

// ===== OAuth =====

#[tokio::test]
async fn test_start_oauth_rejects_unconfigured_provider() {
    let app = TestApp::new().await;
    let account = &app.module.state().account;

    let redirect = account.start_oauth("google").await.unwrap();
    assert!(redirect.url.contains("provider=google"));
    assert!(redirect.url.contains("http://helpdesk.test/auth/callback"));

    let unsupported = account.start_oauth("myspace").await;
    assert_eq!(
        validation_field(unsupported, "provider"),
        vec!["Provider not supported.".to_string()]
    );
}

#[tokio::test]
async fn test_oauth_callback_routes_by_profile_state() {
    print_test_header(
        "test_oauth_callback_routes_by_profile_state",
        "Callback goes to complete-profile, tickets, login or the error page",
    );

    let app = TestApp::new().await;
    let account = &app.module.state().account;

    // fresh identity, no profile yet
    let newcomer = app.bare_actor("new@test.io");
    app.identity.add_code("code-1", newcomer.user.id);
    let outcome = account
        .oauth_callback(&RequestContext::anonymous(), Some("code-1"), Some("verifier"))
        .await
        .unwrap();
    assert_eq!(outcome.redirect, paths::COMPLETE_PROFILE);
    assert!(outcome.session.is_some());

    // returning user with a profile
    let member = app.actor("member@test.io", "Member", UserRole::User).await;
    app.identity.add_code("code-2", member.user.id);
    let outcome = account
        .oauth_callback(&RequestContext::anonymous(), Some("code-2"), Some("verifier"))
        .await
        .unwrap();
    assert_eq!(outcome.redirect, paths::TICKETS);

    // code reuse, missing verifier
    let reused = account
        .oauth_callback(&RequestContext::anonymous(), Some("code-2"), Some("verifier"))
        .await
        .unwrap();
    assert_eq!(reused.redirect, paths::AUTH_ERROR);
    let no_verifier = account
        .oauth_callback(&RequestContext::anonymous(), Some("code-3"), None)
        .await
        .unwrap();
    assert_eq!(no_verifier.redirect, paths::AUTH_ERROR);

    // no code: the request session decides
    let anonymous = account
        .oauth_callback(&RequestContext::anonymous(), None, None)
        .await
        .unwrap();
    assert_eq!(anonymous.redirect, paths::LOGIN);
    let signed_in = account.oauth_callback(&member.ctx(), None, None).await.unwrap();
    assert_eq!(signed_in.redirect, paths::TICKETS);
    assert!(signed_in.session.is_none());
}

// ===== Password recovery =====

#[tokio::test]
async fn test_forgot_and_reset_password() {
    let app = TestApp::new().await;
    let actor = app.actor("joe@test.io", "Joe", UserRole::User).await;
    let account = &app.module.state().account;

    let redirect = account
        .forgot_password(&ForgotPasswordForm {
            email: " joe@test.io ".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(redirect, paths::check_email("forgot-password"));
    assert_eq!(*app.identity.recovery_emails.read(), vec!["joe@test.io".to_string()]);

    let mismatch = account
        .reset_password(
            &actor.ctx(),
            &ResetPasswordForm {
                password: "new-password".to_string(),
                confirm_password: "other-password".to_string(),
            },
        )
        .await;
    assert!(!validation_field(mismatch, "confirmPassword").is_empty());

    account
        .reset_password(
            &actor.ctx(),
            &ResetPasswordForm {
                password: "new-password".to_string(),
                confirm_password: "new-password".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(app.identity.password_of(actor.user.id).as_deref(), Some("new-password"));
}

// ===== Settings =====

#[tokio::test]
async fn test_change_password_requires_current_password() {
    print_test_header(
        "test_change_password_requires_current_password",
        "A wrong current password is a field error and changes nothing",
    );

    let app = TestApp::new().await;
    let actor = app.actor("joe@test.io", "Joe", UserRole::User).await;
    let account = &app.module.state().account;

    let wrong = account
        .change_password(
            &actor.ctx(),
            &PasswordChangeForm {
                current_password: "not-my-password".to_string(),
                new_password: "brand-new-pass".to_string(),
                confirm_password: "brand-new-pass".to_string(),
            },
        )
        .await;
    assert_eq!(
        validation_field(wrong, "current_password"),
        vec!["Invalid current password".to_string()]
    );
    assert_eq!(app.identity.password_of(actor.user.id).as_deref(), Some(PASSWORD));

    account
        .change_password(
            &actor.ctx(),
            &PasswordChangeForm {
                current_password: PASSWORD.to_string(),
                new_password: "brand-new-pass".to_string(),
                confirm_password: "brand-new-pass".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(
        app.identity.password_of(actor.user.id).as_deref(),
        Some("brand-new-pass")
    );
}

#[tokio::test]
async fn test_change_email_sets_pending_address() {
    let app = TestApp::new().await;
    let actor = app.actor("joe@test.io", "Joe", UserRole::User).await;
    let account = &app.module.state().account;

    let user = account
        .change_email(
            &actor.ctx(),
            &EmailChangeForm {
                new_email: "joe@new.io".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(user.email.as_deref(), Some("joe@test.io"));
    assert_eq!(user.new_email.as_deref(), Some("joe@new.io"));

    let invalid = account
        .change_email(
            &actor.ctx(),
            &EmailChangeForm {
                new_email: "nope".to_string(),
            },
        )
        .await;
    assert!(!validation_field(invalid, "new_email").is_empty());
}

#[tokio::test]
async fn test_delete_account_removes_messages_profile_and_identity() {
    print_test_header(
        "test_delete_account_removes_messages_profile_and_identity",
        "Account deletion clears the caller's messages, profile and identity",
    );

    let app = TestApp::new().await;
    let leaving = app.actor("leaving@test.io", "Leaving", UserRole::User).await;
    let staying = app.actor("staying@test.io", "Staying", UserRole::User).await;
    let chats = &app.module.state().chats;

    let chat = chats.create_chat(&leaving.ctx(), staying.profile_id()).await.unwrap();
    chats.send_message(&leaving.ctx(), chat.chat_id, "bye").await.unwrap();
    chats.send_message(&staying.ctx(), chat.chat_id, "see you").await.unwrap();

    app.module
        .state()
        .account
        .delete_account(&leaving.ctx())
        .await
        .unwrap();

    let messages: TableRepository<Message> = TableRepository::new(app.rows());
    let left = messages.list(&QueryOptions::new()).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].profile_id, staying.profile_id());
    assert!(app
        .profiles()
        .find_by_user_id(leaving.user.id)
        .await
        .unwrap()
        .is_none());
    assert!(app.identity.user(leaving.user.id).is_none());
    assert_eq!(*app.identity.deleted.read(), vec![leaving.user.id]);
}

#[tokio::test]
async fn test_delete_account_surfaces_identity_failure() {
    let app = TestApp::new().await;
    let actor = app.actor("joe@test.io", "Joe", UserRole::User).await;
    *app.identity.fail_admin_delete.write() = true;

    let result = app.module.state().account.delete_account(&actor.ctx()).await;
    assert_eq!(
        result,
        Err(HelpdeskError::backend(
            "Failed to delete account. Please, try again later"
        ))
    );
}

// ===== Profile =====

#[tokio::test]
async fn test_profile_update_uploads_avatar() {
    print_test_header(
        "test_profile_update_uploads_avatar",
        "A new avatar is stored under the user's folder and its public URL saved",
    );

    let app = TestApp::new().await;
    let actor = app.actor("joe@test.io", "Joe", UserRole::User).await;
    let profiles = &app.module.state().profiles;

    let updated = profiles
        .update(
            &actor.ctx(),
            ProfileForm {
                full_name: " Joe Bloggs ".to_string(),
                occupation: Some(" Plumber ".to_string()),
                avatar: Some(AvatarUpload {
                    file_name: "me.PNG".to_string(),
                    content_type: "image/png".to_string(),
                    bytes: Bytes::from_static(b"\x89PNG fake"),
                }),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.full_name.as_deref(), Some("Joe Bloggs"));
    assert_eq!(updated.occupation.as_deref(), Some("Plumber"));
    let url = updated.avatar_url.unwrap();
    let prefix = format!("https://cdn.test/avatars/{}/", actor.user.id);
    assert!(url.starts_with(&prefix), "unexpected avatar url {url}");
    assert!(url.ends_with(".png"));

    let stored = app.storage.objects.read();
    assert_eq!(stored.len(), 1);
    let (bytes, content_type) = stored.values().next().unwrap();
    assert_eq!(content_type, "image/png");
    assert_eq!(&bytes[..], b"\x89PNG fake");
}

#[tokio::test]
async fn test_profile_update_rejects_non_image() {
    let app = TestApp::new().await;
    let actor = app.actor("joe@test.io", "Joe", UserRole::User).await;

    let result = app
        .module
        .state()
        .profiles
        .update(
            &actor.ctx(),
            ProfileForm {
                full_name: "Joe".to_string(),
                occupation: None,
                avatar: Some(AvatarUpload {
                    file_name: "notes.txt".to_string(),
                    content_type: "text/plain".to_string(),
                    bytes: Bytes::from_static(b"hello"),
                }),
            },
        )
        .await;
    assert!(!validation_field(result, "avatar").is_empty());
    assert!(app.storage.objects.read().is_empty());
}

#[tokio::test]
async fn test_complete_profile_creates_or_fills_in() {
    let app = TestApp::new().await;
    let profiles = &app.module.state().profiles;

    let newcomer = app.bare_actor("new@test.io");
    let created = profiles
        .complete_profile(
            &newcomer.ctx(),
            &CompleteProfileForm {
                name: "New Person".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(created.user_id, Some(newcomer.user.id));
    assert_eq!(created.role, Some(UserRole::User));
    assert!(created.is_complete());

    // an existing staff profile keeps its role
    let agent = app.actor("agent@test.io", "Agent", UserRole::Agent).await;
    let renamed = profiles
        .complete_profile(
            &agent.ctx(),
            &CompleteProfileForm {
                name: "Agent Renamed".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.id, agent.profile_id());
    assert_eq!(renamed.full_name.as_deref(), Some("Agent Renamed"));
    assert_eq!(renamed.role, Some(UserRole::Agent));

    let blank = profiles
        .complete_profile(&newcomer.ctx(), &CompleteProfileForm { name: " ".to_string() })
        .await;
    assert!(!validation_field(blank, "name").is_empty());
}
