
use crate::{
    user::model::{ProfileRequest, UserAccount, UserProfile},
    Error,
};
use magna_common::{
    db::{limiter::LimiterTrait, Database, DatabaseErrors},
    model::{Paginated, PaginatedResults},
    time::now,
};
use magna_entity::user;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use std::collections::{BTreeSet, HashMap};

pub struct UserService {
    db: Database,
}

impl UserService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create or update the profile of a user.
    pub async fn upsert_profile(
        &self,
        id: &str,
        request: ProfileRequest,
    ) -> Result<UserAccount, Error> {
        let username = request.username.trim();
        if username.is_empty() {
            return Err(Error::bad_request("The username must not be empty"));
        }

        let taken = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .filter(user::Column::Id.ne(id))
            .one(&self.db)
            .await?;
        if taken.is_some() {
            return Err(Error::Conflict(format!(
                "The username '{username}' is already taken"
            )));
        }

        let now = now();
        let result = match user::Entity::find_by_id(id).one(&self.db).await? {
            Some(existing) => {
                let mut model = existing.into_active_model();
                model.username = Set(username.to_string());
                model.avatar_url = Set(request.avatar_url);
                model.bio = Set(request.bio);
                model.updated_at = Set(now);
                model.update(&self.db).await
            }
            None => {
                user::ActiveModel {
                    id: Set(id.to_string()),
                    username: Set(username.to_string()),
                    avatar_url: Set(request.avatar_url),
                    bio: Set(request.bio),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&self.db)
                .await
            }
        };

        match result {
            Ok(model) => Ok(model.into()),
            Err(err) if err.is_duplicate() => Err(Error::Conflict(format!(
                "The username '{username}' is already taken"
            ))),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<UserAccount>, Error> {
        Ok(user::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Into::into))
    }

    /// Search users by a part of their username, ordered by username.
    pub async fn search_users(
        &self,
        q: Option<&str>,
        paginated: Paginated,
    ) -> Result<PaginatedResults<UserProfile>, Error> {
        let mut select = user::Entity::find().order_by_asc(user::Column::Username);
        if let Some(q) = q.map(str::trim).filter(|q| !q.is_empty()) {
            select = select.filter(user::Column::Username.contains(q));
        }

        let limiter = select.limiting(
            &self.db,
            paginated.effective_offset(),
            paginated.effective_limit(),
        );
        let total = limiter.total().await?;

        Ok(PaginatedResults {
            total,
            items: limiter.fetch().await?.into_iter().map(Into::into).collect(),
        })
    }
}

/// Load the public profiles of a set of users.
///
/// Unknown ids are missing from the result.
pub(crate) async fn profiles<C: ConnectionTrait>(
    ids: impl IntoIterator<Item = impl Into<String>>,
    connection: &C,
) -> Result<HashMap<String, UserProfile>, Error> {
    let ids = ids.into_iter().map(Into::into).collect::<BTreeSet<String>>();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    Ok(user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(connection)
        .await?
        .into_iter()
        .map(|user| (user.id.clone(), UserProfile::from(user)))
        .collect())
}

/// Ensure that all users exist, failing with [`Error::NotFound`] otherwise.
pub(crate) async fn ensure_users<C: ConnectionTrait>(
    ids: &BTreeSet<String>,
    connection: &C,
) -> Result<(), Error> {
    let found = profiles(ids.iter().cloned(), connection).await?;
    let missing = ids
        .iter()
        .filter(|id| !found.contains_key(*id))
        .map(String::as_str)
        .collect::<Vec<_>>();

    match missing.is_empty() {
        true => Ok(()),
        false => Err(Error::not_found(format!(
            "Unknown user(s): {}",
            missing.join(", ")
        ))),
    }
}
