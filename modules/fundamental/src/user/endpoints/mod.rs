
use crate::{
    user::{
        model::{ProfileRequest, UserAccount, UserProfile, UserSearch},
        service::UserService,
    },
    Error,
};
use actix_web::{get, put, web, HttpResponse, Responder};
use magna_auth::{authenticator::user::UserDetails, utoipa::AuthResponse};
use magna_common::{
    db::Database,
    model::{Paginated, PaginatedResults},
};

/// mount the "user" module
pub fn configure(svc: &mut utoipa_actix_web::service_config::ServiceConfig, db: Database) {
    svc.app_data(web::Data::new(UserService::new(db)))
        .service(upsert_profile)
        .service(search)
        .service(get);
}

#[utoipa::path(
    tag = "user",
    operation_id = "upsertProfile",
    request_body = ProfileRequest,
    responses(
        (status = 200, description = "The stored profile", body = UserAccount),
        (status = 400, description = "The username is empty"),
        (status = 409, description = "The username is already taken"),
        AuthResponse,
    )
)]
#[put("/v1/users/me")]
/// Create or update the profile of the current user
async fn upsert_profile(
    service: web::Data<UserService>,
    user: UserDetails,
    web::Json(request): web::Json<ProfileRequest>,
) -> Result<impl Responder, Error> {
    Ok(HttpResponse::Ok().json(service.upsert_profile(&user.id, request).await?))
}

#[utoipa::path(
    tag = "user",
    operation_id = "getUser",
    params(
        ("id", Path, description = "The id of the user"),
    ),
    responses(
        (status = 200, description = "The user", body = UserAccount),
        (status = 404, description = "Unknown user"),
        AuthResponse,
    )
)]
#[get("/v1/users/{id}")]
/// Get a user
async fn get(
    service: web::Data<UserService>,
    id: web::Path<String>,
    _: UserDetails,
) -> Result<impl Responder, Error> {
    match service.get_user(&id).await? {
        Some(user) => Ok(HttpResponse::Ok().json(user)),
        None => Err(Error::not_found(format!("Unknown user: {id}"))),
    }
}

#[utoipa::path(
    tag = "user",
    operation_id = "searchUsers",
    params(
        UserSearch,
        Paginated,
    ),
    responses(
        (status = 200, description = "Matching users", body = PaginatedResults<UserProfile>),
        AuthResponse,
    )
)]
#[get("/v1/users")]
/// Search for users
async fn search(
    service: web::Data<UserService>,
    web::Query(search): web::Query<UserSearch>,
    web::Query(paginated): web::Query<Paginated>,
    _: UserDetails,
) -> Result<impl Responder, Error> {
    Ok(HttpResponse::Ok().json(service.search_users(search.q.as_deref(), paginated).await?))
}
