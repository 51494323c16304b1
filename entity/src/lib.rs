pub mod conversation;
pub mod conversation_member;
pub mod friend_request;
pub mod message;
pub mod user;
