
use crate::{
    friend::{
        model::{FriendRequest, NewFriendRequest},
        service::FriendService,
    },
    user::model::UserProfile,
    Error,
};
use actix_web::{delete, get, post, web, HttpResponse, Responder};
use magna_auth::{authenticator::user::UserDetails, utoipa::AuthResponse};
use magna_common::db::Database;
use uuid::Uuid;

/// mount the "friend" module
pub fn configure(svc: &mut utoipa_actix_web::service_config::ServiceConfig, db: Database) {
    svc.app_data(web::Data::new(FriendService::new(db)))
        .service(send_request)
        .service(list_requests)
        .service(accept)
        .service(decline)
        .service(list_friends)
        .service(remove_friend);
}

#[utoipa::path(
    tag = "friend",
    operation_id = "sendFriendRequest",
    request_body = NewFriendRequest,
    responses(
        (status = 201, description = "The request was sent", body = FriendRequest),
        (status = 400, description = "Invalid addressee"),
        (status = 404, description = "Unknown user"),
        (status = 409, description = "A request or friendship already exists"),
        AuthResponse,
    )
)]
#[post("/v1/friends/requests")]
/// Send a friend request
async fn send_request(
    service: web::Data<FriendService>,
    user: UserDetails,
    web::Json(request): web::Json<NewFriendRequest>,
) -> Result<impl Responder, Error> {
    Ok(HttpResponse::Created().json(service.send_request(&user.id, &request.user_id).await?))
}

#[utoipa::path(
    tag = "friend",
    operation_id = "listFriendRequests",
    responses(
        (status = 200, description = "Pending requests addressed to the current user", body = [FriendRequest]),
        AuthResponse,
    )
)]
#[get("/v1/friends/requests")]
/// List pending friend requests
async fn list_requests(
    service: web::Data<FriendService>,
    user: UserDetails,
) -> Result<impl Responder, Error> {
    Ok(HttpResponse::Ok().json(service.list_requests(&user.id).await?))
}

#[utoipa::path(
    tag = "friend",
    operation_id = "acceptFriendRequest",
    params(
        ("id", Path, description = "The id of the friend request"),
    ),
    responses(
        (status = 200, description = "The accepted request", body = FriendRequest),
        (status = 404, description = "No pending request addressed to the current user"),
        AuthResponse,
    )
)]
#[post("/v1/friends/requests/{id}/accept")]
/// Accept a friend request
async fn accept(
    service: web::Data<FriendService>,
    user: UserDetails,
    id: web::Path<Uuid>,
) -> Result<impl Responder, Error> {
    Ok(HttpResponse::Ok().json(service.respond(&user.id, *id, true).await?))
}

#[utoipa::path(
    tag = "friend",
    operation_id = "declineFriendRequest",
    params(
        ("id", Path, description = "The id of the friend request"),
    ),
    responses(
        (status = 200, description = "The declined request", body = FriendRequest),
        (status = 404, description = "No pending request addressed to the current user"),
        AuthResponse,
    )
)]
#[post("/v1/friends/requests/{id}/decline")]
/// Decline a friend request
async fn decline(
    service: web::Data<FriendService>,
    user: UserDetails,
    id: web::Path<Uuid>,
) -> Result<impl Responder, Error> {
    Ok(HttpResponse::Ok().json(service.respond(&user.id, *id, false).await?))
}

#[utoipa::path(
    tag = "friend",
    operation_id = "listFriends",
    responses(
        (status = 200, description = "The friends of the current user", body = [UserProfile]),
        AuthResponse,
    )
)]
#[get("/v1/friends")]
/// List friends
async fn list_friends(
    service: web::Data<FriendService>,
    user: UserDetails,
) -> Result<impl Responder, Error> {
    Ok(HttpResponse::Ok().json(service.list_friends(&user.id).await?))
}

#[utoipa::path(
    tag = "friend",
    operation_id = "removeFriend",
    params(
        ("userId", Path, description = "The id of the friend"),
    ),
    responses(
        (status = 204, description = "The friendship was ended"),
        (status = 404, description = "Not friends with this user"),
        AuthResponse,
    )
)]
#[delete("/v1/friends/{userId}")]
/// Remove a friend
async fn remove_friend(
    service: web::Data<FriendService>,
    user: UserDetails,
    other: web::Path<String>,
) -> Result<impl Responder, Error> {
    service.remove_friend(&user.id, &other).await?;
    Ok(HttpResponse::NoContent().finish())
}
