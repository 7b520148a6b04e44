//! Reading and editing the signed-in user's profile.

use thiserror::Error;

use crate::backend::{Backend, BackendError};
use crate::checkout::{is_valid_pincode, normalize_phone};
use crate::model::{Profile, ProfileUpdate};

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile not found for user {0}")]
    NotFound(String),

    #[error("invalid {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },

    #[error("nothing to update")]
    EmptyUpdate,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub async fn load_profile(backend: &dyn Backend, user_id: &str) -> Result<Profile, ProfileError> {
    backend
        .profile(user_id)
        .await?
        .ok_or_else(|| ProfileError::NotFound(user_id.to_string()))
}

/// Trims the supplied fields and checks phone and pincode formats.
/// Blank values are dropped from the update.
pub fn validate_update(update: &ProfileUpdate) -> Result<ProfileUpdate, ProfileError> {
    fn clean(value: Option<&String>) -> Option<String> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    let phone = match clean(update.phone.as_ref()) {
        Some(raw) => Some(normalize_phone(&raw).ok_or(ProfileError::InvalidField {
            field: "phone",
            reason: "expected a 10 digit mobile number",
        })?),
        None => None,
    };
    let pincode = clean(update.pincode.as_ref());
    if pincode.as_deref().is_some_and(|p| !is_valid_pincode(p)) {
        return Err(ProfileError::InvalidField {
            field: "pincode",
            reason: "expected 6 digits",
        });
    }

    let cleaned = ProfileUpdate {
        name: clean(update.name.as_ref()),
        phone,
        default_address: clean(update.default_address.as_ref()),
        city: clean(update.city.as_ref()),
        pincode,
    };
    if cleaned.is_empty() {
        return Err(ProfileError::EmptyUpdate);
    }
    Ok(cleaned)
}

pub async fn update_profile(
    backend: &dyn Backend,
    user_id: &str,
    update: &ProfileUpdate,
) -> Result<Profile, ProfileError> {
    let update = validate_update(update)?;
    let profile = backend.update_profile(user_id, &update).await?;
    tracing::info!(user_id, "profile updated");
    Ok(profile)
}
