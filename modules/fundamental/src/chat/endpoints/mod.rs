#[cfg(test)]
mod test;

use crate::{
    chat::{
        model::{
            AddMembers, ChatSummary, CreateDirectChat, CreateGroupChat, Message, MessagePage,
            ReadReceipt, SendMessage,
        },
        service::ChatService,
    },
    Error,
};
use actix_web::{delete, get, post, web, HttpResponse, Responder};
use magna_auth::{authenticator::user::UserDetails, utoipa::AuthResponse};
use magna_common::{db::Database, model::PaginatedResults};
use uuid::Uuid;

/// mount the "chat" module
pub fn configure(svc: &mut utoipa_actix_web::service_config::ServiceConfig, db: Database) {
    svc.app_data(web::Data::new(ChatService::new(db)))
        .service(list_chats)
        .service(create_direct)
        .service(create_group)
        .service(get_chat)
        .service(list_messages)
        .service(send_message)
        .service(mark_as_read)
        .service(add_members)
        .service(leave);
}

#[utoipa::path(
    tag = "chat",
    operation_id = "listChats",
    responses(
        (status = 200, description = "The chats of the current user, most recent first", body = [ChatSummary]),
        AuthResponse,
    )
)]
#[get("/v1/chats")]
/// List chats
async fn list_chats(
    service: web::Data<ChatService>,
    user: UserDetails,
) -> Result<impl Responder, Error> {
    Ok(HttpResponse::Ok().json(service.get_user_chats(&user.id).await?))
}

#[utoipa::path(
    tag = "chat",
    operation_id = "createDirectChat",
    request_body = CreateDirectChat,
    responses(
        (status = 200, description = "The direct chat with the other user", body = ChatSummary),
        (status = 400, description = "Invalid other user"),
        (status = 404, description = "Unknown user"),
        AuthResponse,
    )
)]
#[post("/v1/chats/direct")]
/// Open a direct chat, creating it if needed
async fn create_direct(
    service: web::Data<ChatService>,
    user: UserDetails,
    web::Json(request): web::Json<CreateDirectChat>,
) -> Result<impl Responder, Error> {
    Ok(HttpResponse::Ok().json(
        service
            .create_direct_chat(&user.id, &request.other_user_id)
            .await?,
    ))
}

#[utoipa::path(
    tag = "chat",
    operation_id = "createGroupChat",
    request_body = CreateGroupChat,
    responses(
        (status = 201, description = "The group chat was created", body = ChatSummary),
        (status = 400, description = "Missing name or not enough members"),
        (status = 404, description = "Unknown user"),
        AuthResponse,
    )
)]
#[post("/v1/chats/group")]
/// Create a group chat
async fn create_group(
    service: web::Data<ChatService>,
    user: UserDetails,
    web::Json(request): web::Json<CreateGroupChat>,
) -> Result<impl Responder, Error> {
    Ok(HttpResponse::Created().json(service.create_group_chat(&user.id, request).await?))
}

#[utoipa::path(
    tag = "chat",
    operation_id = "getChat",
    params(
        ("chatId", Path, description = "The id of the chat"),
    ),
    responses(
        (status = 200, description = "The chat", body = ChatSummary),
        (status = 403, description = "Not a member of this chat"),
        AuthResponse,
    )
)]
#[get("/v1/chats/{chatId}")]
/// Get a chat
async fn get_chat(
    service: web::Data<ChatService>,
    user: UserDetails,
    id: web::Path<Uuid>,
) -> Result<impl Responder, Error> {
    Ok(HttpResponse::Ok().json(service.get_chat(&user.id, *id).await?))
}

#[utoipa::path(
    tag = "chat",
    operation_id = "listMessages",
    params(
        ("chatId", Path, description = "The id of the chat"),
        MessagePage,
    ),
    responses(
        (status = 200, description = "A page of messages, oldest first", body = PaginatedResults<Message>),
        (status = 403, description = "Not a member of this chat"),
        AuthResponse,
    )
)]
#[get("/v1/chats/{chatId}/messages")]
/// List messages
async fn list_messages(
    service: web::Data<ChatService>,
    user: UserDetails,
    id: web::Path<Uuid>,
    web::Query(page): web::Query<MessagePage>,
) -> Result<impl Responder, Error> {
    Ok(HttpResponse::Ok().json(service.get_chat_messages(&user.id, *id, page).await?))
}

#[utoipa::path(
    tag = "chat",
    operation_id = "sendMessage",
    params(
        ("chatId", Path, description = "The id of the chat"),
    ),
    request_body = SendMessage,
    responses(
        (status = 201, description = "The message was sent", body = Message),
        (status = 400, description = "Missing content or file"),
        (status = 403, description = "Not a member of this chat"),
        AuthResponse,
    )
)]
#[post("/v1/chats/{chatId}/messages")]
/// Send a message
async fn send_message(
    service: web::Data<ChatService>,
    user: UserDetails,
    id: web::Path<Uuid>,
    web::Json(request): web::Json<SendMessage>,
) -> Result<impl Responder, Error> {
    Ok(HttpResponse::Created().json(service.send_message(&user.id, *id, request).await?))
}

#[utoipa::path(
    tag = "chat",
    operation_id = "markChatAsRead",
    params(
        ("chatId", Path, description = "The id of the chat"),
    ),
    responses(
        (status = 200, description = "Messages of other members were marked as read", body = ReadReceipt),
        (status = 403, description = "Not a member of this chat"),
        AuthResponse,
    )
)]
#[post("/v1/chats/{chatId}/read")]
/// Mark messages as read
async fn mark_as_read(
    service: web::Data<ChatService>,
    user: UserDetails,
    id: web::Path<Uuid>,
) -> Result<impl Responder, Error> {
    let updated = service.mark_messages_as_read(&user.id, *id).await?;
    Ok(HttpResponse::Ok().json(ReadReceipt { updated }))
}

#[utoipa::path(
    tag = "chat",
    operation_id = "addChatMembers",
    params(
        ("chatId", Path, description = "The id of the chat"),
    ),
    request_body = AddMembers,
    responses(
        (status = 200, description = "The updated chat", body = ChatSummary),
        (status = 400, description = "Not a group chat, or no users"),
        (status = 403, description = "Not a member of this chat"),
        (status = 404, description = "Unknown user"),
        AuthResponse,
    )
)]
#[post("/v1/chats/{chatId}/members")]
/// Add members to a group chat
async fn add_members(
    service: web::Data<ChatService>,
    user: UserDetails,
    id: web::Path<Uuid>,
    web::Json(request): web::Json<AddMembers>,
) -> Result<impl Responder, Error> {
    Ok(HttpResponse::Ok().json(service.add_members(&user.id, *id, request).await?))
}

#[utoipa::path(
    tag = "chat",
    operation_id = "leaveChat",
    params(
        ("chatId", Path, description = "The id of the chat"),
    ),
    responses(
        (status = 204, description = "The current user left the chat"),
        (status = 403, description = "Not a member of this chat"),
        AuthResponse,
    )
)]
#[delete("/v1/chats/{chatId}/members/me")]
/// Leave a chat
async fn leave(
    service: web::Data<ChatService>,
    user: UserDetails,
    id: web::Path<Uuid>,
) -> Result<impl Responder, Error> {
    service.leave_chat(&user.id, *id).await?;
    Ok(HttpResponse::NoContent().finish())
}
