#[cfg(test)]
mod test;

use crate::{
    chat::model::{
        AddMembers, ChatSummary, CreateGroupChat, Message, MessagePage, MessageType, SendMessage,
    },
    user::{
        model::UserProfile,
        service::{ensure_users, profiles},
    },
    Error,
};
use magna_common::{
    db::{limiter::LimiterTrait, retry_contended, Database},
    model::PaginatedResults,
    time::now,
};
use magna_entity::{
    conversation::{self, direct_key},
    conversation_member, message,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_query::Expr;
use std::collections::{BTreeSet, HashMap};
use time::OffsetDateTime;
use uuid::Uuid;

/// Attempts to open a direct chat while other requests write the same one.
const WRITE_ATTEMPTS: u32 = 5;

pub struct ChatService {
    db: Database,
}

impl ChatService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open the direct chat between `user` and `other`, creating it if necessary.
    ///
    /// There is only one direct chat per pair of users. If one of them left it before, they
    /// rejoin the existing chat.
    pub async fn create_direct_chat(&self, user: &str, other: &str) -> Result<ChatSummary, Error> {
        let other = other.trim();
        if other.is_empty() {
            return Err(Error::bad_request("The other user id must not be empty"));
        }
        if other == user {
            return Err(Error::bad_request(
                "A direct chat requires two different users",
            ));
        }

        let pair = BTreeSet::from([user.to_string(), other.to_string()]);
        ensure_users(&pair, &self.db).await?;

        let key = direct_key(user, other);
        let (key, pair) = (key.as_str(), &pair);
        let id = retry_contended(WRITE_ATTEMPTS, || self.open_direct(key, pair)).await?;

        self.summary(user, id, &self.db).await
    }

    async fn open_direct(&self, key: &str, members: &BTreeSet<String>) -> Result<Uuid, DbErr> {
        let tx = self.db.begin().await?;
        let now = now();

        let conversation = match conversation::Entity::find()
            .filter(conversation::Column::DirectKey.eq(key))
            .one(&tx)
            .await?
        {
            Some(conversation) => conversation,
            None => {
                log::debug!("Creating direct chat {key}");
                conversation::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    name: Set(None),
                    is_group: Set(false),
                    direct_key: Set(Some(key.to_string())),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&tx)
                .await?
            }
        };

        if insert_members(conversation.id, members, now, &tx).await? > 0 {
            touch(conversation.id, now, &tx).await?;
        }

        tx.commit().await?;

        Ok(conversation.id)
    }

    /// Create a group chat, `user` becomes a member too.
    pub async fn create_group_chat(
        &self,
        user: &str,
        request: CreateGroupChat,
    ) -> Result<ChatSummary, Error> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(Error::bad_request("A group chat requires a name"));
        }

        let mut members = user_ids(&request.member_ids);
        members.remove(user);
        if members.len() < 2 {
            return Err(Error::bad_request(
                "A group chat requires at least two other members",
            ));
        }
        members.insert(user.to_string());

        ensure_users(&members, &self.db).await?;

        let tx = self.db.begin().await?;
        let now = now();

        let conversation = conversation::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(Some(name.to_string())),
            is_group: Set(true),
            direct_key: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&tx)
        .await?;

        insert_members(conversation.id, &members, now, &tx).await?;

        tx.commit().await?;

        log::debug!(
            "Created group chat {} with {} members",
            conversation.id,
            members.len()
        );

        self.summary(user, conversation.id, &self.db).await
    }

    /// Get a single chat.
    pub async fn get_chat(&self, user: &str, id: Uuid) -> Result<ChatSummary, Error> {
        ensure_member(id, user, &self.db).await?;
        self.summary(user, id, &self.db).await
    }

    /// Add users to a group chat, users which are already members are ignored.
    pub async fn add_members(
        &self,
        user: &str,
        id: Uuid,
        request: AddMembers,
    ) -> Result<ChatSummary, Error> {
        let tx = self.db.begin().await?;
        ensure_member(id, user, &tx).await?;

        let conversation = conversation::Entity::find_by_id(id)
            .one(&tx)
            .await?
            .ok_or_else(not_a_member)?;
        if !conversation.is_group {
            return Err(Error::bad_request(
                "Members can only be added to group chats",
            ));
        }

        let users = user_ids(&request.user_ids);
        if users.is_empty() {
            return Err(Error::bad_request("No users to add"));
        }
        ensure_users(&users, &tx).await?;

        let now = now();
        if insert_members(id, &users, now, &tx).await? > 0 {
            touch(id, now, &tx).await?;
        }

        tx.commit().await?;

        self.summary(user, id, &self.db).await
    }

    /// Leave a chat. The chat, including its messages, is deleted when its last member leaves.
    pub async fn leave_chat(&self, user: &str, id: Uuid) -> Result<(), Error> {
        let tx = self.db.begin().await?;
        ensure_member(id, user, &tx).await?;

        conversation_member::Entity::delete_by_id((id, user.to_string()))
            .exec(&tx)
            .await?;

        let remaining = conversation_member::Entity::find()
            .filter(conversation_member::Column::ConversationId.eq(id))
            .count(&tx)
            .await?;

        if remaining == 0 {
            log::debug!("Last member left chat {id}, deleting it");
            message::Entity::delete_many()
                .filter(message::Column::ConversationId.eq(id))
                .exec(&tx)
                .await?;
            conversation::Entity::delete_by_id(id).exec(&tx).await?;
        } else {
            touch(id, now(), &tx).await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Send a message to a chat.
    pub async fn send_message(
        &self,
        user: &str,
        id: Uuid,
        request: SendMessage,
    ) -> Result<Message, Error> {
        let tx = self.db.begin().await?;
        ensure_member(id, user, &tx).await?;
        validate(&request)?;

        let now = now();
        let message = message::ActiveModel {
            id: Set(Uuid::now_v7()),
            conversation_id: Set(id),
            sender_id: Set(user.to_string()),
            content: Set(request.content),
            message_type: Set(request.message_type),
            file_url: Set(request.file_url),
            file_name: Set(request.file_name),
            file_size: Set(request.file_size),
            is_read: Set(false),
            created_at: Set(now),
        }
        .insert(&tx)
        .await?;

        touch(id, now, &tx).await?;

        tx.commit().await?;

        let users = profiles([user], &self.db).await?;
        Ok(Message::new(message, sender(&users, user)))
    }

    /// Get a page of messages, the items of a page are ordered oldest first.
    pub async fn get_chat_messages(
        &self,
        user: &str,
        id: Uuid,
        page: MessagePage,
    ) -> Result<PaginatedResults<Message>, Error> {
        ensure_member(id, user, &self.db).await?;

        let limiter = message::Entity::find()
            .filter(message::Column::ConversationId.eq(id))
            .order_by_desc(message::Column::CreatedAt)
            .order_by_desc(message::Column::Id)
            .limiting(&self.db, page.offset(), page.effective_limit());

        let total = limiter.total().await?;
        let mut messages = limiter.fetch().await?;
        messages.reverse();

        let users = profiles(
            messages.iter().map(|message| message.sender_id.clone()),
            &self.db,
        )
        .await?;

        Ok(PaginatedResults {
            total,
            items: messages
                .into_iter()
                .map(|message| {
                    let sender = sender(&users, &message.sender_id);
                    Message::new(message, sender)
                })
                .collect(),
        })
    }

    /// Mark all messages of other members as read, returning the number of changed messages.
    pub async fn mark_messages_as_read(&self, user: &str, id: Uuid) -> Result<u64, Error> {
        ensure_member(id, user, &self.db).await?;

        let result = message::Entity::update_many()
            .col_expr(message::Column::IsRead, Expr::value(true))
            .filter(message::Column::ConversationId.eq(id))
            .filter(message::Column::SenderId.ne(user))
            .filter(message::Column::IsRead.eq(false))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    /// All chats of a user, most recently active first.
    pub async fn get_user_chats(&self, user: &str) -> Result<Vec<ChatSummary>, Error> {
        let ids = conversation_member::Entity::find()
            .filter(conversation_member::Column::UserId.eq(user))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|membership| membership.conversation_id)
            .collect::<Vec<_>>();

        if ids.is_empty() {
            return Ok(vec![]);
        }

        let conversations = conversation::Entity::find()
            .filter(conversation::Column::Id.is_in(ids))
            .order_by_desc(conversation::Column::UpdatedAt)
            .order_by_desc(conversation::Column::Id)
            .all(&self.db)
            .await?;

        summaries(user, conversations, &self.db).await
    }

    async fn summary<C: ConnectionTrait>(
        &self,
        viewer: &str,
        id: Uuid,
        connection: &C,
    ) -> Result<ChatSummary, Error> {
        let conversation = conversation::Entity::find_by_id(id)
            .one(connection)
            .await?
            .ok_or_else(not_a_member)?;

        summaries(viewer, vec![conversation], connection)
            .await?
            .pop()
            .ok_or_else(not_a_member)
    }
}

fn not_a_member() -> Error {
    Error::Forbidden("Not a member of this chat".into())
}

/// Ensure that `user` is a member of the conversation.
///
/// A conversation which doesn't exist looks the same as one the user is not a member of.
async fn ensure_member<C: ConnectionTrait>(
    conversation: Uuid,
    user: &str,
    connection: &C,
) -> Result<(), Error> {
    match conversation_member::Entity::find_by_id((conversation, user.to_string()))
        .one(connection)
        .await?
    {
        Some(_) => Ok(()),
        None => Err(not_a_member()),
    }
}

fn validate(request: &SendMessage) -> Result<(), Error> {
    let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());

    match request.message_type {
        MessageType::Text if !present(&request.content) => {
            return Err(Error::bad_request("A text message requires content"));
        }
        message_type if message_type.has_file() && !present(&request.file_url) => {
            return Err(Error::bad_request("A file message requires a file URL"));
        }
        _ => {}
    }

    if request.file_size.is_some_and(|size| size < 0) {
        return Err(Error::bad_request("The file size must not be negative"));
    }

    Ok(())
}

/// Trimmed, non-empty and unique user ids.
fn user_ids(ids: &[String]) -> BTreeSet<String> {
    ids.iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn sender(users: &HashMap<String, UserProfile>, id: &str) -> UserProfile {
    users.get(id).cloned().unwrap_or_else(|| UserProfile {
        id: id.to_string(),
        username: id.to_string(),
        avatar_url: None,
    })
}

/// Add memberships for all users which are not yet members, returning the number of new members.
async fn insert_members<C: ConnectionTrait>(
    conversation: Uuid,
    users: &BTreeSet<String>,
    now: OffsetDateTime,
    connection: &C,
) -> Result<u64, DbErr> {
    let existing = conversation_member::Entity::find()
        .filter(conversation_member::Column::ConversationId.eq(conversation))
        .all(connection)
        .await?
        .into_iter()
        .map(|membership| membership.user_id)
        .collect::<BTreeSet<_>>();

    let new = users
        .difference(&existing)
        .map(|user| conversation_member::ActiveModel {
            conversation_id: Set(conversation),
            user_id: Set(user.clone()),
            joined_at: Set(now),
        })
        .collect::<Vec<_>>();

    if new.is_empty() {
        return Ok(0);
    }

    conversation_member::Entity::insert_many(new)
        .exec_without_returning(connection)
        .await
}

/// Bump the last activity of a conversation.
async fn touch<C: ConnectionTrait>(
    conversation: Uuid,
    now: OffsetDateTime,
    connection: &C,
) -> Result<(), DbErr> {
    conversation::Entity::update_many()
        .col_expr(conversation::Column::UpdatedAt, Expr::value(now))
        .filter(conversation::Column::Id.eq(conversation))
        .exec(connection)
        .await?;
    Ok(())
}

async fn summaries<C: ConnectionTrait>(
    viewer: &str,
    conversations: Vec<conversation::Model>,
    connection: &C,
) -> Result<Vec<ChatSummary>, Error> {
    let ids = conversations
        .iter()
        .map(|conversation| conversation.id)
        .collect::<Vec<_>>();

    let memberships = conversation_member::Entity::find()
        .filter(conversation_member::Column::ConversationId.is_in(ids.clone()))
        .all(connection)
        .await?;

    let mut last_messages = HashMap::new();
    for id in &ids {
        if let Some(message) = message::Entity::find()
            .filter(message::Column::ConversationId.eq(*id))
            .order_by_desc(message::Column::CreatedAt)
            .order_by_desc(message::Column::Id)
            .one(connection)
            .await?
        {
            last_messages.insert(*id, message);
        }
    }

    let unread = message::Entity::find()
        .select_only()
        .column(message::Column::ConversationId)
        .column_as(Expr::col(message::Column::Id).count(), "unread")
        .filter(message::Column::ConversationId.is_in(ids))
        .filter(message::Column::IsRead.eq(false))
        .filter(message::Column::SenderId.ne(viewer))
        .group_by(message::Column::ConversationId)
        .into_tuple::<(Uuid, i64)>()
        .all(connection)
        .await?
        .into_iter()
        .collect::<HashMap<_, _>>();

    let users = profiles(
        memberships
            .iter()
            .map(|membership| membership.user_id.clone())
            .chain(last_messages.values().map(|message| message.sender_id.clone())),
        connection,
    )
    .await?;

    let mut members = HashMap::<Uuid, Vec<UserProfile>>::new();
    for membership in memberships {
        members
            .entry(membership.conversation_id)
            .or_default()
            .push(sender(&users, &membership.user_id));
    }

    Ok(conversations
        .into_iter()
        .map(|conversation| {
            let id = conversation.id;
            let last_message = last_messages.remove(&id).map(|message| {
                let sender = sender(&users, &message.sender_id);
                Message::new(message, sender)
            });
            let unread_count = unread.get(&id).copied().unwrap_or_default().max(0) as u64;

            ChatSummary::new(
                viewer,
                conversation,
                members.remove(&id).unwrap_or_default(),
                last_message,
                unread_count,
            )
        })
        .collect())
}
