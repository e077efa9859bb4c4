//! Redis Tag Index Integration Tests
//!
//! These tests require a running Redis instance and skip themselves when none
//! is reachable.
//!
//! ```bash
//! docker run --rm -p 6379:6379 redis:7
//! cargo test --features redis --test redis_integration_test
//! ```
//!
//! ## Environment Variables
//!
//! - `TEST_REDIS_URL`: Redis connection URL (default: "redis://localhost:6379")

#![cfg(feature = "redis")]

mod common;

use common::*;
use resource_kit::backend::{CacheBackend, RedisBackend, RedisConfig, TagStamp};
use resource_kit::store::InMemoryStore;
use resource_kit::{CrudOrchestrator, PageRequest};
use std::env;
use std::time::Duration;

/// Helper: Get Redis connection URL from environment or use default
fn get_redis_url() -> String {
    env::var("TEST_REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

/// Helper: Create a test Redis backend
async fn create_test_backend() -> Result<RedisBackend, Box<dyn std::error::Error>> {
    let backend = RedisBackend::from_connection_string(&get_redis_url()).await?;
    Ok(backend)
}

/// Helper: Check if Redis is available
async fn is_redis_available() -> bool {
    match create_test_backend().await {
        Ok(backend) => backend.health_check().await.unwrap_or(false),
        Err(_) => false,
    }
}

/// Helper: Tag unique to this run so parallel runs never share state
fn unique_tag(prefix: &str) -> String {
    format!("{}_{}", prefix, rand::random::<u32>())
}

#[tokio::test]
async fn test_redis_connection_with_config() {
    if !is_redis_available().await {
        println!("⚠️  Redis not available, skipping test");
        return;
    }

    let config = RedisConfig {
        pool_size: 4,
        connection_timeout: Duration::from_secs(2),
        ..Default::default()
    };

    let backend = RedisBackend::new(config)
        .await
        .expect("Failed to create Redis backend from config");

    assert!(backend.health_check().await.expect("Health check failed"));
    assert!(backend.pool_stats().connections <= 4);
}

#[tokio::test]
async fn test_redis_eviction_hides_every_tagged_entry() {
    if !is_redis_available().await {
        println!("⚠️  Redis not available, skipping test");
        return;
    }

    let backend = create_test_backend()
        .await
        .expect("Failed to create Redis backend");
    let tag = unique_tag("it_evict");
    let generation = backend
        .tag_generation(&tag)
        .await
        .expect("Failed to read generation");
    let stamps = [TagStamp::new(tag.clone(), generation)];

    for i in 0..5 {
        backend
            .set(&format!("{}:id:{}", tag, i), vec![i], &stamps, None)
            .await
            .expect("Failed to set");
    }

    let removed = backend.evict_by_tag(&tag).await.expect("Failed to evict");
    assert_eq!(removed, 5);

    for i in 0..5 {
        assert!(backend
            .get(&format!("{}:id:{}", tag, i))
            .await
            .expect("Failed to get")
            .is_none());
    }
    assert_eq!(
        backend.evict_by_tag(&tag).await.expect("Failed to evict"),
        0
    );
}

#[tokio::test]
async fn test_redis_ttl_expiration() {
    if !is_redis_available().await {
        println!("⚠️  Redis not available, skipping test");
        return;
    }

    let backend = create_test_backend()
        .await
        .expect("Failed to create Redis backend");
    let tag = unique_tag("it_ttl");
    let key = format!("{}:all", tag);

    backend
        .set(
            &key,
            b"expires".to_vec(),
            &[TagStamp::new(tag.clone(), 0)],
            Some(Duration::from_secs(1)),
        )
        .await
        .expect("Failed to set");
    assert!(backend.get(&key).await.expect("Failed to get").is_some());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(backend.get(&key).await.expect("Failed to get").is_none());
}

#[tokio::test]
async fn test_orchestrator_over_redis() {
    if !is_redis_available().await {
        println!("⚠️  Redis not available, skipping test");
        return;
    }

    let backend = create_test_backend()
        .await
        .expect("Failed to create Redis backend");
    let genres = CrudOrchestrator::new(
        genre_descriptor().with_tag(unique_tag("it_generos")),
        GenreProjection,
        InMemoryStore::new(),
        backend,
    );

    genres
        .create(genre("Comedia"))
        .await
        .expect("Failed to create");
    let first = genres
        .list(PageRequest::default())
        .await
        .expect("Failed to list");
    assert_eq!(first.total_count, 1);

    genres
        .replace(1, genre("Comedia-Drama"))
        .await
        .expect("Failed to replace");
    let second = genres
        .list(PageRequest::default())
        .await
        .expect("Failed to list");
    assert_eq!(second.items[0].name, "Comedia-Drama");

    genres.delete(1).await.expect("Failed to delete");
    let third = genres
        .list(PageRequest::default())
        .await
        .expect("Failed to list");
    assert_eq!(third.total_count, 0);
}

#[tokio::test]
async fn test_redis_tag_key_set_expires_with_its_entries() {
    if !is_redis_available().await {
        println!("⚠️  Redis not available, skipping test");
        return;
    }

    let backend = create_test_backend()
        .await
        .expect("Failed to create Redis backend");
    let tag = unique_tag("it_members");
    let stamps = [TagStamp::new(tag.clone(), 0)];

    for page in 1..=5 {
        backend
            .set(
                &format!("{}:page:{}:10", tag, page),
                vec![page],
                &stamps,
                Some(Duration::from_secs(1)),
            )
            .await
            .expect("Failed to set");
    }
    assert_eq!(
        backend.tracked_keys(&tag).await.expect("Failed to count keys"),
        5
    );

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(
        backend.tracked_keys(&tag).await.expect("Failed to count keys"),
        0
    );
}

#[tokio::test]
async fn test_redis_stale_read_leaves_the_key_alone() {
    use redis::AsyncCommands;

    if !is_redis_available().await {
        println!("⚠️  Redis not available, skipping test");
        return;
    }

    let backend = create_test_backend()
        .await
        .expect("Failed to create Redis backend");
    let mut raw = redis::Client::open(get_redis_url())
        .expect("Failed to open Redis client")
        .get_multiplexed_async_connection()
        .await
        .expect("Failed to connect");
    let tag = unique_tag("it_stale");
    let key = format!("{}:all", tag);

    backend
        .set(&key, b"old".to_vec(), &[TagStamp::new(tag.clone(), 0)], None)
        .await
        .expect("Failed to set");
    // Generation moves on without the entry being deleted.
    raw.incr::<_, _, ()>(format!("tag:{}:generation", tag), 1)
        .await
        .expect("Failed to bump generation");

    assert!(backend.get(&key).await.expect("Failed to get").is_none());
    let exists: bool = raw.exists(&key).await.expect("Failed to check key");
    assert!(exists);

    backend
        .set(&key, b"new".to_vec(), &[TagStamp::new(tag.clone(), 1)], None)
        .await
        .expect("Failed to set");
    assert_eq!(
        backend.get(&key).await.expect("Failed to get"),
        Some(b"new".to_vec())
    );
}
