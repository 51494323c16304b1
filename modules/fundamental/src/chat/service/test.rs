use super::*;
use magna_test_context::MagnaContext;
use test_context::test_context;
use test_log::test;

fn ids(members: &[UserProfile]) -> Vec<&str> {
    members.iter().map(|member| member.id.as_str()).collect()
}

#[test_context(MagnaContext)]
#[test(tokio::test)]
async fn direct_chat_is_unique(ctx: &MagnaContext) -> Result<(), anyhow::Error> {
    ctx.create_users(["u1", "u2", "u3"]).await?;
    let service = ChatService::new(ctx.db.clone());

    let first = service.create_direct_chat("u1", "u2").await?;
    let second = service.create_direct_chat("u2", "u1").await?;
    let again = service.create_direct_chat("u1", " u2 ").await?;

    assert_eq!(first.id, second.id);
    assert_eq!(first.id, again.id);
    assert!(!first.is_group);
    assert_eq!(ids(&first.members), ["u1", "u2"]);
    assert_eq!(first.display_name.as_deref(), Some("u2"));
    assert_eq!(second.display_name.as_deref(), Some("u1"));

    let other = service.create_direct_chat("u1", "u3").await?;
    assert_ne!(first.id, other.id);

    Ok(())
}

#[test_context(MagnaContext)]
#[test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn concurrent_direct_chat(ctx: &MagnaContext) -> Result<(), anyhow::Error> {
    ctx.create_users(["u1", "u2"]).await?;

    for _ in 0..5 {
        let first = ChatService::new(ctx.db.clone());
        let second = ChatService::new(ctx.db.clone());

        let (first, second) = tokio::join!(
            tokio::spawn(async move { first.create_direct_chat("u1", "u2").await }),
            tokio::spawn(async move { second.create_direct_chat("u2", "u1").await }),
        );
        let (first, second) = (first??, second??);

        assert_eq!(first.id, second.id);
        assert_eq!(ids(&first.members), ["u1", "u2"]);
    }

    let chats = conversation::Entity::find().count(&ctx.db).await?;
    assert_eq!(chats, 1);

    Ok(())
}

#[test_context(MagnaContext)]
#[test(tokio::test)]
async fn direct_chat_rejects_invalid_users(ctx: &MagnaContext) -> Result<(), anyhow::Error> {
    ctx.create_users(["u1"]).await?;
    let service = ChatService::new(ctx.db.clone());

    let result = service.create_direct_chat("u1", "u1").await;
    assert!(matches!(result, Err(Error::BadRequest(_))));
    let result = service.create_direct_chat("u1", "  ").await;
    assert!(matches!(result, Err(Error::BadRequest(_))));
    let result = service.create_direct_chat("u1", "nobody").await;
    assert!(matches!(result, Err(Error::NotFound(_))));

    assert!(service.get_user_chats("u1").await?.is_empty());

    Ok(())
}

#[test_context(MagnaContext)]
#[test(tokio::test)]
async fn send_and_list(ctx: &MagnaContext) -> Result<(), anyhow::Error> {
    ctx.create_users(["u1", "u2"]).await?;
    let service = ChatService::new(ctx.db.clone());

    let chat = service.create_direct_chat("u1", "u2").await?;
    let sent = service
        .send_message("u1", chat.id, SendMessage::text("hi"))
        .await?;
    assert_eq!(sent.chat_id, chat.id);
    assert_eq!(sent.sender.id, "u1");
    assert_eq!(sent.content.as_deref(), Some("hi"));
    assert_eq!(sent.message_type, MessageType::Text);
    assert!(!sent.is_read);

    let messages = service
        .get_chat_messages("u2", chat.id, MessagePage::default())
        .await?;
    assert_eq!(messages.total, 1);
    assert_eq!(messages.items, vec![sent.clone()]);

    // the recipient sees an unread message, the sender doesn't
    let chats = service.get_user_chats("u2").await?;
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0].unread_count, 1);
    assert_eq!(chats[0].last_message.as_ref(), Some(&sent));
    assert!(chats[0].updated_at >= sent.created_at);

    let chats = service.get_user_chats("u1").await?;
    assert_eq!(chats[0].unread_count, 0);

    Ok(())
}

#[test_context(MagnaContext)]
#[test(tokio::test)]
async fn file_messages(ctx: &MagnaContext) -> Result<(), anyhow::Error> {
    ctx.create_users(["u1", "u2"]).await?;
    let service = ChatService::new(ctx.db.clone());
    let chat = service.create_direct_chat("u1", "u2").await?;

    let image = service
        .send_message(
            "u1",
            chat.id,
            SendMessage {
                message_type: MessageType::Image,
                file_url: Some("https://example.com/cat.png".into()),
                file_name: Some("cat.png".into()),
                file_size: Some(1024),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(image.message_type, MessageType::Image);
    assert_eq!(image.content, None);
    assert_eq!(image.file_size, Some(1024));

    let result = service
        .send_message(
            "u1",
            chat.id,
            SendMessage {
                message_type: MessageType::File,
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(Error::BadRequest(_))));

    let result = service
        .send_message("u1", chat.id, SendMessage::text("   "))
        .await;
    assert!(matches!(result, Err(Error::BadRequest(_))));

    let result = service
        .send_message(
            "u1",
            chat.id,
            SendMessage {
                file_size: Some(-1),
                ..SendMessage::text("negative")
            },
        )
        .await;
    assert!(matches!(result, Err(Error::BadRequest(_))));

    let messages = service
        .get_chat_messages("u1", chat.id, MessagePage::default())
        .await?;
    assert_eq!(messages.total, 1);

    Ok(())
}

#[test_context(MagnaContext)]
#[test(tokio::test)]
async fn non_members_are_forbidden(ctx: &MagnaContext) -> Result<(), anyhow::Error> {
    ctx.create_users(["u1", "u2", "u3"]).await?;
    let service = ChatService::new(ctx.db.clone());
    let chat = service.create_direct_chat("u1", "u2").await?;

    let result = service.get_chat("u3", chat.id).await;
    assert!(matches!(result, Err(Error::Forbidden(_))));
    let result = service
        .send_message("u3", chat.id, SendMessage::text("hello?"))
        .await;
    assert!(matches!(result, Err(Error::Forbidden(_))));
    let result = service
        .get_chat_messages("u3", chat.id, MessagePage::default())
        .await;
    assert!(matches!(result, Err(Error::Forbidden(_))));
    let result = service.mark_messages_as_read("u3", chat.id).await;
    assert!(matches!(result, Err(Error::Forbidden(_))));
    let result = service.leave_chat("u3", chat.id).await;
    assert!(matches!(result, Err(Error::Forbidden(_))));

    // an unknown chat looks the same
    let result = service.get_chat("u1", Uuid::now_v7()).await;
    assert!(matches!(result, Err(Error::Forbidden(_))));

    Ok(())
}

#[test_context(MagnaContext)]
#[test(tokio::test)]
async fn group_chat(ctx: &MagnaContext) -> Result<(), anyhow::Error> {
    ctx.create_users(["u1", "u2", "u3", "u4"]).await?;
    let service = ChatService::new(ctx.db.clone());

    let group = service
        .create_group_chat(
            "u1",
            CreateGroupChat {
                name: " Team ".into(),
                member_ids: vec!["u2".into(), "u3".into(), "u3".into(), "u1".into()],
            },
        )
        .await?;
    assert!(group.is_group);
    assert_eq!(group.name.as_deref(), Some("Team"));
    assert_eq!(group.display_name.as_deref(), Some("Team"));
    assert_eq!(ids(&group.members), ["u1", "u2", "u3"]);

    for user in ["u1", "u2", "u3"] {
        assert_eq!(service.get_user_chats(user).await?.len(), 1);
    }
    assert!(service.get_user_chats("u4").await?.is_empty());

    Ok(())
}

#[test_context(MagnaContext)]
#[test(tokio::test)]
async fn group_chat_validation(ctx: &MagnaContext) -> Result<(), anyhow::Error> {
    ctx.create_users(["u1", "u2", "u3"]).await?;
    let service = ChatService::new(ctx.db.clone());

    let result = service
        .create_group_chat(
            "u1",
            CreateGroupChat {
                name: "  ".into(),
                member_ids: vec!["u2".into(), "u3".into()],
            },
        )
        .await;
    assert!(matches!(result, Err(Error::BadRequest(_))));

    // the creator doesn't count
    let result = service
        .create_group_chat(
            "u1",
            CreateGroupChat {
                name: "Pair".into(),
                member_ids: vec!["u1".into(), "u2".into()],
            },
        )
        .await;
    assert!(matches!(result, Err(Error::BadRequest(_))));

    let result = service
        .create_group_chat(
            "u1",
            CreateGroupChat {
                name: "Ghosts".into(),
                member_ids: vec!["u2".into(), "ghost".into()],
            },
        )
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));

    assert!(service.get_user_chats("u1").await?.is_empty());

    Ok(())
}

#[test_context(MagnaContext)]
#[test(tokio::test)]
async fn add_members(ctx: &MagnaContext) -> Result<(), anyhow::Error> {
    ctx.create_users(["u1", "u2", "u3", "u4", "u5"]).await?;
    let service = ChatService::new(ctx.db.clone());

    let group = service
        .create_group_chat(
            "u1",
            CreateGroupChat {
                name: "Team".into(),
                member_ids: vec!["u2".into(), "u3".into()],
            },
        )
        .await?;

    let updated = service
        .add_members(
            "u2",
            group.id,
            AddMembers {
                user_ids: vec!["u3".into(), "u4".into()],
            },
        )
        .await?;
    assert_eq!(ids(&updated.members), ["u1", "u2", "u3", "u4"]);

    let result = service
        .add_members(
            "u5",
            group.id,
            AddMembers {
                user_ids: vec!["u5".into()],
            },
        )
        .await;
    assert!(matches!(result, Err(Error::Forbidden(_))));

    let result = service
        .add_members("u1", group.id, AddMembers::default())
        .await;
    assert!(matches!(result, Err(Error::BadRequest(_))));

    let result = service
        .add_members(
            "u1",
            group.id,
            AddMembers {
                user_ids: vec!["ghost".into()],
            },
        )
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));

    // direct chats stay between two users
    let direct = service.create_direct_chat("u1", "u2").await?;
    let result = service
        .add_members(
            "u1",
            direct.id,
            AddMembers {
                user_ids: vec!["u3".into()],
            },
        )
        .await;
    assert!(matches!(result, Err(Error::BadRequest(_))));

    Ok(())
}

#[test_context(MagnaContext)]
#[test(tokio::test)]
async fn leave_chat(ctx: &MagnaContext) -> Result<(), anyhow::Error> {
    ctx.create_users(["u1", "u2"]).await?;
    let service = ChatService::new(ctx.db.clone());

    let chat = service.create_direct_chat("u1", "u2").await?;
    service
        .send_message("u1", chat.id, SendMessage::text("bye"))
        .await?;

    service.leave_chat("u1", chat.id).await?;
    assert!(service.get_user_chats("u1").await?.is_empty());
    let remaining = service.get_chat("u2", chat.id).await?;
    assert_eq!(ids(&remaining.members), ["u2"]);

    // rejoining reuses the chat, including its history
    let rejoined = service.create_direct_chat("u1", "u2").await?;
    assert_eq!(rejoined.id, chat.id);
    assert_eq!(ids(&rejoined.members), ["u1", "u2"]);
    let messages = service
        .get_chat_messages("u1", chat.id, MessagePage::default())
        .await?;
    assert_eq!(messages.total, 1);

    // the last member to leave removes the chat
    service.leave_chat("u1", chat.id).await?;
    service.leave_chat("u2", chat.id).await?;
    assert!(conversation::Entity::find_by_id(chat.id)
        .one(&ctx.db)
        .await?
        .is_none());
    assert_eq!(
        message::Entity::find()
            .filter(message::Column::ConversationId.eq(chat.id))
            .count(&ctx.db)
            .await?,
        0
    );

    // and a new one is created next time
    let fresh = service.create_direct_chat("u2", "u1").await?;
    assert_ne!(fresh.id, chat.id);

    Ok(())
}

#[test_context(MagnaContext)]
#[test(tokio::test)]
async fn mark_as_read(ctx: &MagnaContext) -> Result<(), anyhow::Error> {
    ctx.create_users(["u1", "u2"]).await?;
    let service = ChatService::new(ctx.db.clone());
    let chat = service.create_direct_chat("u1", "u2").await?;

    for text in ["one", "two"] {
        service
            .send_message("u1", chat.id, SendMessage::text(text))
            .await?;
    }
    service
        .send_message("u2", chat.id, SendMessage::text("three"))
        .await?;

    assert_eq!(service.get_chat("u2", chat.id).await?.unread_count, 2);
    assert_eq!(service.get_chat("u1", chat.id).await?.unread_count, 1);

    // only messages of others are marked
    assert_eq!(service.mark_messages_as_read("u2", chat.id).await?, 2);
    assert_eq!(service.mark_messages_as_read("u2", chat.id).await?, 0);
    assert_eq!(service.get_chat("u2", chat.id).await?.unread_count, 0);
    assert_eq!(service.get_chat("u1", chat.id).await?.unread_count, 1);

    let messages = service
        .get_chat_messages("u1", chat.id, MessagePage::default())
        .await?;
    let read = messages
        .items
        .iter()
        .map(|message| message.is_read)
        .collect::<Vec<_>>();
    assert_eq!(read, [true, true, false]);

    Ok(())
}

#[test_context(MagnaContext)]
#[test(tokio::test)]
async fn paging(ctx: &MagnaContext) -> Result<(), anyhow::Error> {
    ctx.create_users(["u1", "u2"]).await?;
    let service = ChatService::new(ctx.db.clone());
    let chat = service.create_direct_chat("u1", "u2").await?;

    for i in 0..5 {
        service
            .send_message("u1", chat.id, SendMessage::text(format!("m{i}")))
            .await?;
    }

    let content = |page: &PaginatedResults<Message>| {
        page.items
            .iter()
            .filter_map(|message| message.content.clone())
            .collect::<Vec<_>>()
    };

    let latest = service
        .get_chat_messages("u2", chat.id, MessagePage { page: 1, limit: 2 })
        .await?;
    assert_eq!(latest.total, 5);
    assert_eq!(content(&latest), ["m3", "m4"]);

    let older = service
        .get_chat_messages("u2", chat.id, MessagePage { page: 2, limit: 2 })
        .await?;
    assert_eq!(content(&older), ["m1", "m2"]);

    let oldest = service
        .get_chat_messages("u2", chat.id, MessagePage { page: 3, limit: 2 })
        .await?;
    assert_eq!(content(&oldest), ["m0"]);

    let beyond = service
        .get_chat_messages("u2", chat.id, MessagePage { page: 4, limit: 2 })
        .await?;
    assert_eq!(beyond.total, 5);
    assert!(beyond.items.is_empty());

    let far_beyond = service
        .get_chat_messages(
            "u2",
            chat.id,
            MessagePage {
                page: u64::MAX,
                limit: 100,
            },
        )
        .await?;
    assert_eq!(far_beyond.total, 5);
    assert!(far_beyond.items.is_empty());

    Ok(())
}

#[test_context(MagnaContext)]
#[test(tokio::test)]
async fn most_recent_chat_first(ctx: &MagnaContext) -> Result<(), anyhow::Error> {
    ctx.create_users(["u1", "u2", "u3"]).await?;
    let service = ChatService::new(ctx.db.clone());

    let first = service.create_direct_chat("u1", "u2").await?;
    let second = service.create_direct_chat("u1", "u3").await?;

    service
        .send_message("u2", first.id, SendMessage::text("ping"))
        .await?;

    let chats = service.get_user_chats("u1").await?;
    assert_eq!(
        chats.iter().map(|chat| chat.id).collect::<Vec<_>>(),
        [first.id, second.id]
    );

    Ok(())
}
