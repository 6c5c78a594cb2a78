//! Profile page and profile completion

use crate::config::Config;
use crate::contract::{
    HelpdeskError, NewProfile, ObjectStorage, Profile, ProfileChanges, RequestContext, UserRole,
};
use crate::domain::repository::ProfileRepository;
use crate::domain::validation::{
    avatar_extension, validate_complete_profile, validate_profile, AvatarUpload,
    CompleteProfileForm, ProfileForm,
};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone)]
pub struct ProfileService {
    profiles: ProfileRepository,
    storage: Arc<dyn ObjectStorage>,
    config: Arc<Config>,
}

impl ProfileService {
    pub fn new(
        profiles: ProfileRepository,
        storage: Arc<dyn ObjectStorage>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            profiles,
            storage,
            config,
        }
    }

    pub fn load(&self, ctx: &RequestContext) -> Result<Profile, HelpdeskError> {
        ctx.require_profile().cloned()
    }

    /// Profile bound to an identity, if one was created
    pub async fn find_for_user(&self, user_id: Uuid) -> Result<Option<Profile>, HelpdeskError> {
        Ok(self.profiles.find_by_user_id(user_id).await?)
    }

    /// Update name and occupation; a new avatar is uploaded before the row changes
    pub async fn update(
        &self,
        ctx: &RequestContext,
        form: ProfileForm,
    ) -> Result<Profile, HelpdeskError> {
        validate_profile(&form, self.config.max_avatar_bytes)?;
        let user = ctx.require_user()?;
        let profile = ctx.require_profile()?;

        let avatar_url = match &form.avatar {
            Some(avatar) => Some(self.upload_avatar(user.id, avatar).await?),
            None => None,
        };

        let changes = ProfileChanges {
            full_name: Some(form.full_name.trim().to_string()),
            role: None,
            occupation: form.occupation.map(|o| o.trim().to_string()),
            avatar_url,
        };
        let updated = self.profiles.update(&profile.id, &changes).await?;
        info!(profile_id = %profile.id, "profile updated");
        Ok(updated)
    }

    async fn upload_avatar(
        &self,
        user_id: Uuid,
        avatar: &AvatarUpload,
    ) -> Result<String, HelpdeskError> {
        let extension = avatar_extension(avatar)
            .ok_or_else(|| HelpdeskError::field("avatar", "Please upload an image file."))?;
        let path = format!("{user_id}/{}.{extension}", nanoid::nanoid!());
        let bucket = &self.config.avatar_bucket;

        self.storage
            .upload(bucket, &path, avatar.bytes.clone(), &avatar.content_type, true)
            .await?;
        debug!(%user_id, path = %path, "avatar uploaded");
        Ok(self.storage.public_url(bucket, &path))
    }

    /// Create the caller's profile with role `user`, or fill in a partial one
    pub async fn complete_profile(
        &self,
        ctx: &RequestContext,
        form: &CompleteProfileForm,
    ) -> Result<Profile, HelpdeskError> {
        validate_complete_profile(form)?;
        let user = ctx.require_user()?;
        let full_name = form.name.trim().to_string();

        let profile = match &ctx.profile {
            Some(existing) => {
                let changes = ProfileChanges {
                    full_name: Some(full_name),
                    role: existing.role.is_none().then_some(UserRole::User),
                    ..ProfileChanges::default()
                };
                self.profiles.update(&existing.id, &changes).await?
            }
            None => {
                self.profiles
                    .create(&NewProfile {
                        user_id: user.id,
                        full_name,
                        role: UserRole::User,
                    })
                    .await?
            }
        };
        info!(user_id = %user.id, profile_id = %profile.id, "profile completed");
        Ok(profile)
    }
}
