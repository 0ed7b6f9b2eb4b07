//! 旁路缓存的集成测试
//!
//! 需要一个可用的 Redis，设置 TEST_REDIS_URL 后运行，
//! 未设置时测试直接跳过。键名都带随机前缀，互不干扰。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bzion_backend::cache::CacheStore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn test_store() -> Option<CacheStore> {
    let url = std::env::var("TEST_REDIS_URL").ok()?;
    let client = redis::Client::open(url).ok()?;
    Some(CacheStore::with_client(client))
}

fn fresh_domain(base: &str) -> String {
    format!("{}_{}", base, Uuid::new_v4().simple())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Stats {
    total: i64,
    active: i64,
    tags: Vec<String>,
}

fn sample_stats() -> Stats {
    Stats {
        total: 42,
        active: 7,
        tags: vec!["a".into(), "b".into()],
    }
}

#[tokio::test]
async fn set_then_get_roundtrips() {
    let Some(store) = test_store() else {
        eprintln!("skipping: TEST_REDIS_URL not set");
        return;
    };
    let key = format!("{}:stats", fresh_domain("quotes"));

    store.set(&key, &sample_stats(), Some(30)).await;
    let cached: Option<Stats> = store.get(&key).await;
    assert_eq!(cached, Some(sample_stats()));

    store.del(&key).await;
    let gone: Option<Stats> = store.get(&key).await;
    assert_eq!(gone, None);
}

#[tokio::test]
async fn ttl_expires_entries() {
    let Some(store) = test_store() else {
        eprintln!("skipping: TEST_REDIS_URL not set");
        return;
    };
    let key = format!("{}:stats", fresh_domain("quotes"));

    store.set(&key, &sample_stats(), Some(1)).await;
    assert!(store.get::<Stats>(&key).await.is_some());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(store.get::<Stats>(&key).await, None);
}

#[tokio::test]
async fn prefix_invalidation_spares_other_domains() {
    let Some(store) = test_store() else {
        eprintln!("skipping: TEST_REDIS_URL not set");
        return;
    };
    let quotes = fresh_domain("quotes");
    let users = fresh_domain("users");

    store
        .set(&format!("{}:stats", quotes), &sample_stats(), Some(60))
        .await;
    store
        .set(&format!("{}:list:1", quotes), &vec![1, 2, 3], Some(60))
        .await;
    store
        .set(&format!("{}:stats", users), &sample_stats(), Some(60))
        .await;

    store.invalidate_pattern(&quotes).await;

    // 同一领域的全部视图一起失效
    assert_eq!(store.get::<Stats>(&format!("{}:stats", quotes)).await, None);
    assert_eq!(
        store.get::<Vec<i32>>(&format!("{}:list:1", quotes)).await,
        None
    );
    // 无关前缀不受影响
    assert_eq!(
        store.get::<Stats>(&format!("{}:stats", users)).await,
        Some(sample_stats())
    );

    store.del(&format!("{}:stats", users)).await;
}

#[tokio::test]
async fn cached_query_computes_once_per_key() {
    let Some(store) = test_store() else {
        eprintln!("skipping: TEST_REDIS_URL not set");
        return;
    };
    let key = format!("{}:stats", fresh_domain("dashboard"));
    let calls = AtomicUsize::new(0);

    for _ in 0..3 {
        let value: Result<Stats, String> = store
            .cached_query(&key, 30, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(sample_stats())
            })
            .await;
        assert_eq!(value.unwrap(), sample_stats());
    }
    // ttl 内同一个键只回源一次
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // 不同键各自回源
    let other_key = format!("{}:stats", fresh_domain("dashboard"));
    let _: Result<Stats, String> = store
        .cached_query(&other_key, 30, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(sample_stats())
        })
        .await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    store.del(&key).await;
    store.del(&other_key).await;
}
