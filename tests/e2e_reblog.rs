//! E2E tests for status reblog endpoints

mod common;

use common::TestServer;
use serde_json::Value;
use socialcore::data::Visibility;

#[tokio::test]
async fn test_reblog_and_unreblog_public_status() {
    let server = TestServer::new().await;
    let (author, _) = server.create_account_with_token("author", false).await;
    let (_reader, token) = server.create_account_with_token("reader", false).await;
    let status = server.create_status(&author, Visibility::Public).await;

    let response = server
        .post_as(&format!("/api/v1/statuses/{}/reblog", status.id), &token)
        .await;
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["reblog"]["id"], status.id);
    assert_eq!(json["reblog"]["reblogs_count"], 1);
    assert_eq!(json["reblog"]["reblogged"], true);

    let response = server
        .post_as(&format!("/api/v1/statuses/{}/unreblog", status.id), &token)
        .await;
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["id"], status.id);
    assert_eq!(json["reblogs_count"], 0);
    assert_eq!(json["reblogged"], false);
}

#[tokio::test]
async fn test_reblog_twice_keeps_count() {
    let server = TestServer::new().await;
    let (author, _) = server.create_account_with_token("author", false).await;
    let (_reader, token) = server.create_account_with_token("reader", false).await;
    let status = server.create_status(&author, Visibility::Unlisted).await;
    let path = format!("/api/v1/statuses/{}/reblog", status.id);

    server.post_as(&path, &token).await;
    let response = server.post_as(&path, &token).await;

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["reblog"]["reblogs_count"], 1);
}

#[tokio::test]
async fn test_reblog_private_status_is_not_found() {
    let server = TestServer::new().await;
    let (author, _) = server.create_account_with_token("author", false).await;
    let (_reader, token) = server.create_account_with_token("reader", false).await;
    let status = server.create_status(&author, Visibility::Private).await;

    let response = server
        .post_as(&format!("/api/v1/statuses/{}/reblog", status.id), &token)
        .await;
    assert_eq!(response.status(), 404);

    let response = server
        .post_as(&format!("/api/v1/statuses/{}/unreblog", status.id), &token)
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_unreblog_after_author_blocks_reblogger() {
    let server = TestServer::new().await;
    let (author, _) = server.create_account_with_token("author", false).await;
    let (reader, token) = server.create_account_with_token("reader", false).await;
    let status = server.create_status(&author, Visibility::Public).await;

    server
        .post_as(&format!("/api/v1/statuses/{}/reblog", status.id), &token)
        .await;
    server
        .state
        .db
        .insert_block(&author.id, &reader.id)
        .await
        .unwrap();

    let response = server
        .post_as(&format!("/api/v1/statuses/{}/unreblog", status.id), &token)
        .await;
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["reblogs_count"], 0);
    assert_eq!(json["reblogged"], false);
}

#[tokio::test]
async fn test_reblog_requires_valid_token() {
    let server = TestServer::new().await;
    let (author, _) = server.create_account_with_token("author", false).await;
    let status = server.create_status(&author, Visibility::Public).await;
    let path = format!("/api/v1/statuses/{}/reblog", status.id);

    let response = server.client.post(server.url(&path)).send().await.unwrap();
    assert_eq!(response.status(), 401);

    let response = server.post_as(&path, "not-a-token").await;
    assert_eq!(response.status(), 401);
}
