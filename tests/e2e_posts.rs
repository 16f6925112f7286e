//! E2E tests for post creation, retrieval, update, deletion and uploads

mod common;

use buddyscript::client::{ClientError, ImageFile};
use common::{TestServer, bearer, png_image};
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};

#[tokio::test]
async fn test_create_post_with_image() {
    let server = TestServer::new().await;
    let alice = server.sign_up("Alice").await;

    let post = alice
        .api
        .create_post("Hello buddies", false, Some(png_image()))
        .await
        .unwrap();
    assert_eq!(post.content, "Hello buddies");
    assert_eq!(post.author.id, alice.user.id);
    assert!(!post.is_private);
    assert!(post.reactions.is_empty());
    assert_eq!(post.comment_count, 0);

    let image = post.image.expect("image path");
    assert!(image.starts_with("/uploads/post-"));
    assert!(image.ends_with(".png"));

    let served = server.client.get(server.url(&image)).send().await.unwrap();
    assert_eq!(served.status(), 200);
    assert_eq!(served.bytes().await.unwrap().as_ref(), png_image().bytes.as_slice());
}

#[tokio::test]
async fn test_failed_post_insert_discards_uploaded_image() {
    let server = TestServer::new().await;
    let alice = server.sign_up("Alice").await;

    // Make every post insert fail after the image has been stored
    let db_url = format!("sqlite:{}", server.state.config.database.path.display());
    let pool = sqlx::SqlitePool::connect(&db_url).await.unwrap();
    sqlx::query(
        "CREATE TRIGGER reject_posts BEFORE INSERT ON posts \
         BEGIN SELECT RAISE(ABORT, 'posts are read-only'); END",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;

    let error = alice
        .api
        .create_post("doomed", false, Some(png_image()))
        .await
        .expect_err("insert must fail");
    assert!(matches!(error, ClientError::Api { status: 500, .. }));

    let uploads = &server.state.config.storage.uploads_dir;
    let leftovers: Vec<_> = std::fs::read_dir(uploads)
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}

#[tokio::test]
async fn test_create_post_requires_content() {
    let server = TestServer::new().await;
    let alice = server.sign_up("Alice").await;

    let error = alice
        .api
        .create_post("   ", false, None)
        .await
        .expect_err("blank content must be rejected");
    assert!(matches!(error, ClientError::Api { status: 400, .. }));
}

#[tokio::test]
async fn test_create_post_rejects_non_images() {
    let server = TestServer::new().await;
    let alice = server.sign_up("Alice").await;

    let error = alice
        .api
        .create_post(
            "with a script",
            false,
            Some(ImageFile {
                file_name: "evil.sh".to_string(),
                content_type: "text/x-shellscript".to_string(),
                bytes: b"#!/bin/sh".to_vec(),
            }),
        )
        .await
        .expect_err("non-image upload must be rejected");
    match error {
        ClientError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Only images are allowed");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_create_post_rejects_oversized_image() {
    let server = TestServer::new().await;
    let alice = server.sign_up("Alice").await;

    let form = Form::new().text("content", "big one").part(
        "image",
        Part::bytes(vec![0u8; 65 * 1024])
            .file_name("big.jpg")
            .mime_str("image/jpeg")
            .unwrap(),
    );
    let response = server
        .client
        .post(server.url("/api/posts"))
        .header("Authorization", bearer(&alice.token))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_private_post_is_hidden_from_others() {
    let server = TestServer::new().await;
    let alice = server.sign_up("Alice").await;
    let bob = server.sign_up("Bob").await;

    let post = alice.api.create_post("secret", true, None).await.unwrap();
    assert!(post.is_private);

    assert_eq!(alice.api.get_post(&post.id).await.unwrap().id, post.id);
    let error = bob.api.get_post(&post.id).await.unwrap_err();
    assert!(matches!(error, ClientError::Api { status: 403, .. }));
}

#[tokio::test]
async fn test_get_missing_post_is_404() {
    let server = TestServer::new().await;
    let alice = server.sign_up("Alice").await;

    let error = alice.api.get_post("01HZZZZZZZZZZZZZZZZZZZZZZZ").await.unwrap_err();
    assert!(matches!(error, ClientError::Api { status: 404, .. }));
}

#[tokio::test]
async fn test_update_post_is_owner_only() {
    let server = TestServer::new().await;
    let alice = server.sign_up("Alice").await;
    let bob = server.sign_up("Bob").await;
    let post = alice.api.create_post("first draft", false, None).await.unwrap();

    let response = server
        .client
        .put(server.url(&format!("/api/posts/{}", post.id)))
        .header("Authorization", bearer(&bob.token))
        .json(&json!({ "content": "hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let updated = alice.api.update_post(&post.id, "final draft").await.unwrap();
    assert_eq!(updated.content, "final draft");
    assert!(updated.updated_at >= post.updated_at);

    let empty = alice.api.update_post(&post.id, "").await.unwrap_err();
    assert!(matches!(empty, ClientError::Api { status: 400, .. }));
}

#[tokio::test]
async fn test_update_rejects_malformed_json() {
    let server = TestServer::new().await;
    let alice = server.sign_up("Alice").await;
    let post = alice.api.create_post("hello", false, None).await.unwrap();

    let response = server
        .client
        .put(server.url(&format!("/api/posts/{}", post.id)))
        .header("Authorization", bearer(&alice.token))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_delete_post_is_owner_only_and_cascades() {
    let server = TestServer::new().await;
    let alice = server.sign_up("Alice").await;
    let bob = server.sign_up("Bob").await;

    let post = alice
        .api
        .create_post("short lived", false, Some(png_image()))
        .await
        .unwrap();
    let comment = bob.api.create_comment(&post.id, "nice", None).await.unwrap();
    bob.api.reply(&comment.id, "really", None).await.unwrap();
    bob.api
        .react_to_post(&post.id, buddyscript::data::ReactionType::Love)
        .await
        .unwrap();

    let forbidden = bob.api.delete_post(&post.id).await.unwrap_err();
    assert!(matches!(forbidden, ClientError::Api { status: 403, .. }));

    let deleted = alice.api.delete_post(&post.id).await.unwrap();
    assert_eq!(deleted.message, "Post deleted successfully");

    let gone = alice.api.get_post(&post.id).await.unwrap_err();
    assert!(matches!(gone, ClientError::Api { status: 404, .. }));
    assert!(server.state.db.get_comment(&comment.id).await.unwrap().is_none());

    let image = server
        .client
        .get(server.url(post.image.as_deref().unwrap()))
        .send()
        .await
        .unwrap();
    assert_eq!(image.status(), 404);

    let again = alice.api.delete_post(&post.id).await.unwrap_err();
    assert!(matches!(again, ClientError::Api { status: 404, .. }));
}
