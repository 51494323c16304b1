
use crate::{
    friend::model::FriendRequest,
    user::{
        model::UserProfile,
        service::{ensure_users, profiles},
    },
    Error,
};
use magna_common::{
    db::{retry_contended, Database},
    time::now,
};
use magna_entity::friend_request::{self, pair_key, Status};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Attempts to store a request while the other side sends one too.
const WRITE_ATTEMPTS: u32 = 5;

pub struct FriendService {
    db: Database,
}

impl FriendService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Send a friend request from `requester` to `addressee`.
    ///
    /// There is at most one request per pair of users. A declined request may be sent again, by
    /// either side.
    pub async fn send_request(
        &self,
        requester: &str,
        addressee: &str,
    ) -> Result<FriendRequest, Error> {
        let addressee = addressee.trim();
        if addressee.is_empty() {
            return Err(Error::bad_request("The user id must not be empty"));
        }
        if addressee == requester {
            return Err(Error::bad_request(
                "Sending a friend request to yourself is not possible",
            ));
        }

        let pair = BTreeSet::from([requester.to_string(), addressee.to_string()]);
        ensure_users(&pair, &self.db).await?;

        let key = pair_key(requester, addressee);
        let model = retry_contended(WRITE_ATTEMPTS, || {
            Self::open_request(requester, addressee, &key, &self.db)
        })
        .await?;

        log::debug!("Friend request {} from {requester} to {addressee}", model.id);

        let mut result = Self::with_profiles(vec![model], &self.db).await?;
        result
            .pop()
            .ok_or_else(|| Error::Any(anyhow::anyhow!("Friend request vanished")))
    }

    async fn open_request(
        requester: &str,
        addressee: &str,
        key: &str,
        db: &Database,
    ) -> Result<friend_request::Model, Error> {
        let now = now();
        let tx = db.begin().await?;

        let model = match friend_request::Entity::find()
            .filter(friend_request::Column::PairKey.eq(key))
            .one(&tx)
            .await?
        {
            Some(existing) if existing.status == Status::Declined => {
                let mut model = existing.into_active_model();
                model.requester_id = Set(requester.to_string());
                model.addressee_id = Set(addressee.to_string());
                model.status = Set(Status::Pending);
                model.updated_at = Set(now);
                model.update(&tx).await?
            }
            Some(existing) => {
                return Err(Error::Conflict(match existing.status {
                    Status::Accepted => "You are already friends".to_string(),
                    _ => "A friend request between you already exists".to_string(),
                }));
            }
            None => {
                friend_request::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    requester_id: Set(requester.to_string()),
                    addressee_id: Set(addressee.to_string()),
                    pair_key: Set(key.to_string()),
                    status: Set(Status::Pending),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&tx)
                .await?
            }
        };

        tx.commit().await?;

        Ok(model)
    }

    /// Accept or decline a pending request addressed to `user`.
    pub async fn respond(
        &self,
        user: &str,
        id: Uuid,
        accept: bool,
    ) -> Result<FriendRequest, Error> {
        let request = friend_request::Entity::find_by_id(id)
            .filter(friend_request::Column::AddresseeId.eq(user))
            .filter(friend_request::Column::Status.eq(Status::Pending))
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::not_found(format!("No pending friend request: {id}")))?;

        let mut model = request.into_active_model();
        model.status = Set(match accept {
            true => Status::Accepted,
            false => Status::Declined,
        });
        model.updated_at = Set(now());
        let model = model.update(&self.db).await?;

        let mut result = Self::with_profiles(vec![model], &self.db).await?;
        result
            .pop()
            .ok_or_else(|| Error::Any(anyhow::anyhow!("Friend request vanished")))
    }

    /// Pending requests addressed to `user`, newest first.
    pub async fn list_requests(&self, user: &str) -> Result<Vec<FriendRequest>, Error> {
        let requests = friend_request::Entity::find()
            .filter(friend_request::Column::AddresseeId.eq(user))
            .filter(friend_request::Column::Status.eq(Status::Pending))
            .order_by_desc(friend_request::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Self::with_profiles(requests, &self.db).await
    }

    /// The friends of `user`, ordered by username.
    pub async fn list_friends(&self, user: &str) -> Result<Vec<UserProfile>, Error> {
        let friends = friend_request::Entity::find()
            .filter(friend_request::Column::Status.eq(Status::Accepted))
            .filter(
                Condition::any()
                    .add(friend_request::Column::RequesterId.eq(user))
                    .add(friend_request::Column::AddresseeId.eq(user)),
            )
            .all(&self.db)
            .await?
            .into_iter()
            .map(|request| match request.requester_id == user {
                true => request.addressee_id,
                false => request.requester_id,
            });

        let mut result = profiles(friends, &self.db)
            .await?
            .into_values()
            .collect::<Vec<_>>();
        result.sort_by(|a, b| a.username.cmp(&b.username));

        Ok(result)
    }

    /// End the friendship between `user` and `other`.
    pub async fn remove_friend(&self, user: &str, other: &str) -> Result<(), Error> {
        let result = friend_request::Entity::delete_many()
            .filter(friend_request::Column::PairKey.eq(pair_key(user, other)))
            .filter(friend_request::Column::Status.eq(Status::Accepted))
            .exec(&self.db)
            .await?;

        match result.rows_affected {
            0 => Err(Error::not_found(format!("Not friends with: {other}"))),
            _ => Ok(()),
        }
    }

    async fn with_profiles<C: ConnectionTrait>(
        requests: Vec<friend_request::Model>,
        connection: &C,
    ) -> Result<Vec<FriendRequest>, Error> {
        let users = profiles(
            requests
                .iter()
                .flat_map(|request| [&request.requester_id, &request.addressee_id])
                .cloned(),
            connection,
        )
        .await?;

        let profile = |id: &String| {
            users.get(id).cloned().ok_or_else(|| {
                Error::Any(anyhow::anyhow!("Missing user of friend request: {id}"))
            })
        };

        requests
            .into_iter()
            .map(|request| {
                Ok(FriendRequest {
                    requester: profile(&request.requester_id)?,
                    addressee: profile(&request.addressee_id)?,
                    id: request.id,
                    status: request.status,
                    created_at: request.created_at,
                    updated_at: request.updated_at,
                })
            })
            .collect()
    }
}
