pub use sea_orm_migration::prelude::*;

mod m0000010_create_user;
mod m0000020_create_conversation;
mod m0000030_create_conversation_member;
mod m0000040_create_message;
mod m0000050_create_friend_request;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m0000010_create_user::Migration),
            Box::new(m0000020_create_conversation::Migration),
            Box::new(m0000030_create_conversation_member::Migration),
            Box::new(m0000040_create_message::Migration),
            Box::new(m0000050_create_friend_request::Migration),
        ]
    }
}
