use magna_entity::user;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::{IntoParams, ToSchema};

/// The public profile of a user, as embedded in other responses
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl From<user::Model> for UserProfile {
    fn from(value: user::Model) -> Self {
        Self {
            id: value.id,
            username: value.username,
            avatar_url: value.avatar_url,
        }
    }
}

/// The full details of a user
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<user::Model> for UserAccount {
    fn from(value: user::Model) -> Self {
        Self {
            id: value.id,
            username: value.username,
            avatar_url: value.avatar_url,
            bio: value.bio,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// Create or update the profile of the calling user
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserSearch {
    /// Only return users whose username contains this text
    #[serde(default)]
    pub q: Option<String>,
}
