use crate::test::caller;
use actix_http::StatusCode;
use actix_web::test::TestRequest;
use magna_test_context::{auth::TestAuthentication, call::CallService, MagnaContext};
use serde_json::{json, Value};
use test_context::test_context;
use test_log::test;

#[test_context(MagnaContext)]
#[test(actix_web::test)]
async fn direct_conversation(ctx: &MagnaContext) -> Result<(), anyhow::Error> {
    ctx.create_users(["u1", "u2"]).await?;
    let app = caller(ctx).await?;

    let request = TestRequest::post()
        .uri("/api/v1/chats/direct")
        .set_json(json!({"otherUserId": "u2"}))
        .to_request()
        .test_auth("u1");
    let chat: Value = app.call_and_read_body_json(request).await;
    assert_eq!(chat["isGroup"], false);
    assert_eq!(chat["displayName"], "u2");
    assert_eq!(chat["unreadCount"], 0);
    let id = chat["id"].as_str().unwrap_or_default().to_string();

    let request = TestRequest::post()
        .uri(&format!("/api/v1/chats/{id}/messages"))
        .set_json(json!({"content": "hi"}))
        .to_request()
        .test_auth("u1");
    let response = app.call_service(request).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let request = TestRequest::get()
        .uri(&format!("/api/v1/chats/{id}/messages?page=1&limit=10"))
        .to_request()
        .test_auth("u2");
    let messages: Value = app.call_and_read_body_json(request).await;
    assert_eq!(messages["total"], 1);
    assert_eq!(messages["items"][0]["content"], "hi");
    assert_eq!(messages["items"][0]["messageType"], "TEXT");
    assert_eq!(messages["items"][0]["chatId"], id.as_str());
    assert_eq!(messages["items"][0]["sender"]["id"], "u1");

    let request = TestRequest::get()
        .uri("/api/v1/chats")
        .to_request()
        .test_auth("u2");
    let chats: Value = app.call_and_read_body_json(request).await;
    assert_eq!(chats[0]["id"], id.as_str());
    assert_eq!(chats[0]["displayName"], "u1");
    assert_eq!(chats[0]["unreadCount"], 1);
    assert_eq!(chats[0]["lastMessage"]["content"], "hi");

    let request = TestRequest::post()
        .uri(&format!("/api/v1/chats/{id}/read"))
        .to_request()
        .test_auth("u2");
    let receipt: Value = app.call_and_read_body_json(request).await;
    assert_eq!(receipt, json!({"updated": 1}));

    let request = TestRequest::delete()
        .uri(&format!("/api/v1/chats/{id}/members/me"))
        .to_request()
        .test_auth("u2");
    let response = app.call_service(request).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let request = TestRequest::get()
        .uri(&format!("/api/v1/chats/{id}"))
        .to_request()
        .test_auth("u2");
    let response = app.call_service(request).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    Ok(())
}

#[test_context(MagnaContext)]
#[test(actix_web::test)]
async fn group_conversation(ctx: &MagnaContext) -> Result<(), anyhow::Error> {
    ctx.create_users(["u1", "u2", "u3", "u4"]).await?;
    let app = caller(ctx).await?;

    let request = TestRequest::post()
        .uri("/api/v1/chats/group")
        .set_json(json!({"name": "Team", "memberIds": ["u2", "u3"]}))
        .to_request()
        .test_auth("u1");
    let response = app.call_service(request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let chat: Value = actix_web::test::read_body_json(response).await;
    assert_eq!(chat["isGroup"], true);
    assert_eq!(chat["name"], "Team");
    assert_eq!(chat["members"].as_array().map(Vec::len), Some(3));
    let id = chat["id"].as_str().unwrap_or_default().to_string();

    let request = TestRequest::post()
        .uri(&format!("/api/v1/chats/{id}/members"))
        .set_json(json!({"userIds": ["u4"]}))
        .to_request()
        .test_auth("u3");
    let chat: Value = app.call_and_read_body_json(request).await;
    assert_eq!(chat["members"].as_array().map(Vec::len), Some(4));

    let request = TestRequest::post()
        .uri(&format!("/api/v1/chats/{id}/messages"))
        .set_json(json!({"messageType": "IMAGE"}))
        .to_request()
        .test_auth("u4");
    let response = app.call_service(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = TestRequest::post()
        .uri("/api/v1/chats/group")
        .set_json(json!({"name": "Too small", "memberIds": ["u2"]}))
        .to_request()
        .test_auth("u1");
    let response = app.call_service(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[test_context(MagnaContext)]
#[test(actix_web::test)]
async fn malformed_chat_id(ctx: &MagnaContext) -> Result<(), anyhow::Error> {
    ctx.create_users(["u1"]).await?;
    let app = caller(ctx).await?;

    let request = TestRequest::get()
        .uri("/api/v1/chats/not-a-uuid")
        .to_request()
        .test_auth("u1");
    let response = app.call_service(request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[test_context(MagnaContext)]
#[test(actix_web::test)]
async fn requires_authentication(ctx: &MagnaContext) -> Result<(), anyhow::Error> {
    let app = caller(ctx).await?;

    let request = TestRequest::get().uri("/api/v1/chats").to_request();
    let response = app.call_service(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}
