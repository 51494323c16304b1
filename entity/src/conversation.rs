use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "conversation")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: Option<String>,
    pub is_group: bool,
    /// The ordered pair of members for direct conversations, `None` for groups.
    #[sea_orm(unique)]
    pub direct_key: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::conversation_member::Entity")]
    Member,
    #[sea_orm(has_many = "super::message::Entity")]
    Message,
}

impl Related<super::conversation_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl Related<super::message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Message.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        super::conversation_member::Relation::User.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::conversation_member::Relation::Conversation.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// The key identifying the direct conversation between two users, independent of their order.
pub fn direct_key(a: &str, b: &str) -> String {
    let (a, b) = if a <= b { (a, b) } else { (b, a) };
    // the length prefix keeps ids containing the separator apart
    format!("{}:{a}:{b}", a.len())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn direct_key_is_symmetric() {
        assert_eq!(direct_key("u1", "u2"), "2:u1:u2");
        assert_eq!(direct_key("u2", "u1"), "2:u1:u2");
    }

    #[test]
    fn direct_key_is_unambiguous() {
        assert_ne!(direct_key("a:b", "c"), direct_key("a", "b:c"));
    }
}
