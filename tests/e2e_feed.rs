//! E2E tests for feed pagination and private post filtering

mod common;

use std::collections::HashSet;

use common::{TestServer, bearer};
use serde_json::Value;

#[tokio::test]
async fn test_feed_paginates_25_posts() {
    let server = TestServer::new().await;
    let alice = server.sign_up("Alice").await;

    for i in 0..25 {
        alice
            .api
            .create_post(&format!("post {i}"), false, None)
            .await
            .unwrap();
    }

    let first = alice.api.feed(Some(1), Some(10)).await.unwrap();
    assert_eq!(first.posts.len(), 10);
    assert_eq!(first.pagination.current_page, 1);
    assert_eq!(first.pagination.total_pages, 3);
    assert_eq!(first.pagination.total_posts, 25);
    assert!(first.pagination.has_more);

    let third = alice.api.feed(Some(3), Some(10)).await.unwrap();
    assert_eq!(third.posts.len(), 5);
    assert!(!third.pagination.has_more);

    let beyond = alice.api.feed(Some(4), Some(10)).await.unwrap();
    assert!(beyond.posts.is_empty());
    assert!(!beyond.pagination.has_more);

    // Newest first, and pages never overlap
    let second = alice.api.feed(Some(2), Some(10)).await.unwrap();
    let all: Vec<_> = first
        .posts
        .iter()
        .chain(&second.posts)
        .chain(&third.posts)
        .collect();
    assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    let ids: HashSet<_> = all.iter().map(|post| post.id.as_str()).collect();
    assert_eq!(ids.len(), 25);
}

#[tokio::test]
async fn test_feed_defaults_and_caps_limit() {
    let server = TestServer::new().await;
    let alice = server.sign_up("Alice").await;
    for i in 0..12 {
        alice
            .api
            .create_post(&format!("post {i}"), false, None)
            .await
            .unwrap();
    }

    let default_page = alice.api.feed(None, None).await.unwrap();
    assert_eq!(default_page.posts.len(), 10);
    assert_eq!(default_page.pagination.current_page, 1);

    let capped = alice.api.feed(Some(1), Some(500)).await.unwrap();
    assert_eq!(capped.posts.len(), 12);
    assert_eq!(capped.pagination.total_pages, 1);
}

#[tokio::test]
async fn test_feed_rejects_invalid_paging() {
    let server = TestServer::new().await;
    let alice = server.sign_up("Alice").await;

    for query in ["page=0", "page=-1", "limit=0", "limit=-5"] {
        let response = server
            .client
            .get(server.url(&format!("/api/posts?{query}")))
            .header("Authorization", bearer(&alice.token))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400, "{query}");
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_private_posts_never_leak_into_other_feeds() {
    let server = TestServer::new().await;
    let alice = server.sign_up("Alice").await;
    let bob = server.sign_up("Bob").await;

    let mut private_ids = HashSet::new();
    for i in 0..14 {
        let private = i % 2 == 0;
        let post = alice
            .api
            .create_post(&format!("alice {i}"), private, None)
            .await
            .unwrap();
        if private {
            private_ids.insert(post.id);
        }
    }
    bob.api.create_post("bob public", false, None).await.unwrap();
    bob.api.create_post("bob private", true, None).await.unwrap();

    for limit in [1u32, 3, 7, 50] {
        let mut page = 1;
        let mut seen = 0;
        loop {
            let feed = bob.api.feed(Some(page), Some(limit)).await.unwrap();
            for post in &feed.posts {
                assert!(!private_ids.contains(&post.id), "private post leaked");
                assert!(!post.is_private || post.author.id == bob.user.id);
            }
            seen += feed.posts.len();
            if !feed.pagination.has_more {
                break;
            }
            page += 1;
        }
        // 7 public posts from Alice plus both of Bob's
        assert_eq!(seen, 9, "limit {limit}");
    }

    let alice_feed = alice.api.feed(Some(1), Some(50)).await.unwrap();
    assert_eq!(alice_feed.pagination.total_posts, 15);
}

#[tokio::test]
async fn test_feed_posts_carry_counts() {
    let server = TestServer::new().await;
    let alice = server.sign_up("Alice").await;
    let bob = server.sign_up("Bob").await;

    let post = alice.api.create_post("count me", false, None).await.unwrap();
    bob.api.create_comment(&post.id, "one", None).await.unwrap();
    bob.api.create_comment(&post.id, "two", None).await.unwrap();
    bob.api
        .react_to_post(&post.id, buddyscript::data::ReactionType::Like)
        .await
        .unwrap();

    let feed = alice.api.feed(Some(1), Some(10)).await.unwrap();
    let entry = feed.posts.iter().find(|p| p.id == post.id).unwrap();
    assert_eq!(entry.comment_count, 2);
    assert_eq!(entry.likes.len(), 1);
    assert_eq!(entry.likes[0].id, bob.user.id);
    assert_eq!(
        entry.reaction_counts.get(&buddyscript::data::ReactionType::Like),
        Some(&1)
    );
}
