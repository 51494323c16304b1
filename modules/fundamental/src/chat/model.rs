use crate::user::model::UserProfile;
use magna_common::model::{DEFAULT_LIMIT, MAX_LIMIT, MAX_OFFSET};
use magna_entity::{conversation, message};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

pub use magna_entity::message::MessageType;

/// A message, with the public profile of its sender
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender: UserProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub message_type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
    pub is_read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Message {
    pub fn new(message: message::Model, sender: UserProfile) -> Self {
        Self {
            id: message.id,
            chat_id: message.conversation_id,
            sender,
            content: message.content,
            message_type: message.message_type,
            file_url: message.file_url,
            file_name: message.file_name,
            file_size: message.file_size,
            is_read: message.is_read,
            created_at: message.created_at,
        }
    }
}

/// A chat, as seen by one of its members
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub id: Uuid,
    /// The stored name of the chat
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The name to show: the name of a group, or the username of the other member of a direct chat
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub is_group: bool,
    pub members: Vec<UserProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<Message>,
    /// Messages of other members, not yet read
    pub unread_count: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ChatSummary {
    /// Create the summary of a chat, from the perspective of `viewer`.
    pub fn new(
        viewer: &str,
        conversation: conversation::Model,
        mut members: Vec<UserProfile>,
        last_message: Option<Message>,
        unread_count: u64,
    ) -> Self {
        members.sort_by(|a, b| a.username.cmp(&b.username));

        let display_name = match conversation.is_group {
            true => conversation.name.clone(),
            false => members
                .iter()
                .find(|member| member.id != viewer)
                .map(|member| member.username.clone())
                .or_else(|| conversation.name.clone()),
        };

        Self {
            id: conversation.id,
            name: conversation.name,
            display_name,
            is_group: conversation.is_group,
            members,
            last_message,
            unread_count,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDirectChat {
    #[serde(default)]
    pub other_user_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupChat {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub member_ids: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddMembers {
    #[serde(default)]
    pub user_ids: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    #[serde(default)]
    pub content: Option<String>,
    /// Defaults to `TEXT`
    #[serde(default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<i64>,
}

impl SendMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }
}

/// The result of marking messages as read
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    /// The number of messages which changed to "read"
    pub updated: u64,
}

/// A page of messages, page `1` holds the most recent ones.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MessagePage {
    /// The page to return, starting with `1`
    #[serde(default = "default::page")]
    pub page: u64,
    /// The number of messages per page
    #[serde(default = "default::limit")]
    pub limit: u64,
}

impl Default for MessagePage {
    fn default() -> Self {
        Self {
            page: default::page(),
            limit: default::limit(),
        }
    }
}

impl MessagePage {
    /// The limit, clamped to `1..=MAX_LIMIT`.
    pub fn effective_limit(&self) -> u64 {
        self.limit.clamp(1, MAX_LIMIT)
    }

    /// The number of messages to skip, counting from the most recent one.
    ///
    /// Saturates at [`MAX_OFFSET`].
    pub fn offset(&self) -> u64 {
        self.page
            .max(1)
            .saturating_sub(1)
            .saturating_mul(self.effective_limit())
            .min(MAX_OFFSET)
    }
}

mod default {
    pub(super) const fn page() -> u64 {
        1
    }

    pub(super) const fn limit() -> u64 {
        super::DEFAULT_LIMIT
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 50, 0, 50)]
    #[case(0, 50, 0, 50)]
    #[case(3, 10, 20, 10)]
    #[case(2, 0, 1, 1)]
    #[case(2, 1000, 100, 100)]
    #[case(u64::MAX, 100, MAX_OFFSET, 100)]
    #[case(MAX_OFFSET / 10, 100, MAX_OFFSET, 100)]
    fn message_page(
        #[case] page: u64,
        #[case] limit: u64,
        #[case] offset: u64,
        #[case] effective: u64,
    ) {
        let page = MessagePage { page, limit };
        assert_eq!(page.offset(), offset);
        assert_eq!(page.effective_limit(), effective);
    }

    fn profile(id: &str) -> UserProfile {
        UserProfile {
            id: id.into(),
            username: format!("name-{id}"),
            avatar_url: None,
        }
    }

    fn conversation(name: Option<&str>, is_group: bool) -> conversation::Model {
        let now = OffsetDateTime::now_utc();
        conversation::Model {
            id: Uuid::now_v7(),
            name: name.map(Into::into),
            is_group,
            direct_key: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn direct_display_name() {
        let members = vec![profile("u1"), profile("u2")];

        let summary = ChatSummary::new("u1", conversation(None, false), members.clone(), None, 0);
        assert_eq!(summary.display_name.as_deref(), Some("name-u2"));

        let summary = ChatSummary::new("u2", conversation(None, false), members, None, 0);
        assert_eq!(summary.display_name.as_deref(), Some("name-u1"));

        // the other member left
        let summary = ChatSummary::new(
            "u1",
            conversation(Some("old"), false),
            vec![profile("u1")],
            None,
            0,
        );
        assert_eq!(summary.display_name.as_deref(), Some("old"));
    }

    #[test]
    fn group_display_name() {
        let summary = ChatSummary::new(
            "u1",
            conversation(Some("Team"), true),
            vec![profile("u1"), profile("u2"), profile("u3")],
            None,
            0,
        );
        assert_eq!(summary.display_name.as_deref(), Some("Team"));
        assert_eq!(summary.members.len(), 3);
    }
}
