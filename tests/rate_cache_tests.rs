//! Interruption-rate cache behavior: TTL, single-flight and degradation

mod test_utils;

use chrono::Utc;
use spot_optimizer::advisor::{
    FileStore, InterruptionRateCache, MemoryStore, RankEntry, RankStore, RegionRanks,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use test_utils::CountingSource;

fn cache_with(source: Arc<CountingSource>, ttl: Duration) -> InterruptionRateCache {
    InterruptionRateCache::new(Arc::new(MemoryStore::new()), source).with_ttl(ttl)
}

#[tokio::test]
async fn test_calls_within_ttl_fetch_once() {
    let source = Arc::new(CountingSource::new(&[("m5.large", 1)]));
    let cache = cache_with(source.clone(), Duration::from_secs(3600));

    let first = cache.get_or_refresh("us-west-2").await;
    let second = cache.get_or_refresh("us-west-2").await;

    assert_eq!(source.calls(), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_expired_entry_fetches_exactly_once_more() {
    let source = Arc::new(CountingSource::new(&[("m5.large", 1)]));
    let cache = cache_with(source.clone(), Duration::from_millis(200));

    cache.get_or_refresh("us-west-2").await;
    cache.get_or_refresh("us-west-2").await;
    assert_eq!(source.calls(), 1);

    tokio::time::sleep(Duration::from_millis(300)).await;
    cache.get_or_refresh("us-west-2").await;
    cache.get_or_refresh("us-west-2").await;
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_concurrent_callers_share_one_fetch() {
    let source = Arc::new(
        CountingSource::new(&[("r5.xlarge", 0)]).with_delay(Duration::from_millis(200)),
    );
    let cache = Arc::new(cache_with(source.clone(), Duration::from_secs(3600)));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            cache.get_or_refresh("eu-west-1").await
        }));
    }
    for handle in handles {
        let ranks = handle.await.unwrap();
        assert_eq!(ranks.lookup("r5.xlarge").unwrap().rank, 0);
    }

    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_regions_are_fetched_independently() {
    let source = Arc::new(
        CountingSource::new(&[("m5.large", 3)]).with_delay(Duration::from_millis(50)),
    );
    let cache = Arc::new(cache_with(source.clone(), Duration::from_secs(3600)));

    let (west, east) = tokio::join!(
        cache.get_or_refresh("us-west-2"),
        cache.get_or_refresh("us-east-1")
    );
    assert_eq!(west.region(), "us-west-2");
    assert_eq!(east.region(), "us-east-1");
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_slow_source_times_out_to_neutral() {
    let source = Arc::new(
        CountingSource::new(&[("m5.large", 0)]).with_delay(Duration::from_secs(5)),
    );
    let cache = cache_with(source.clone(), Duration::from_secs(3600))
        .with_fetch_timeout(Duration::from_millis(100));

    let result = cache.get_or_refresh("us-west-2").await;
    assert!(result.is_neutral());
    assert!(result.lookup("m5.large").is_none());

    // Neutral fallback is not stored; the next call tries again
    assert!(cache.entry_age("us-west-2").is_none());
}

#[tokio::test]
async fn test_failed_refresh_keeps_serving_stale_entry() {
    let store = Arc::new(MemoryStore::new());
    let stale = RegionRanks::new(
        "us-west-2",
        Utc::now() - chrono::Duration::hours(2),
        Vec::new(),
        BTreeMap::from([(
            "c5.large".to_string(),
            RankEntry {
                rank: 4,
                savings: None,
            },
        )]),
    );
    store.set("us-west-2", &stale).unwrap();

    let source = Arc::new(CountingSource::failing());
    let cache = InterruptionRateCache::new(store, source.clone());

    let result = cache.get_or_refresh("us-west-2").await;
    assert_eq!(result.lookup("c5.large").unwrap().rank, 4);
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_file_store_survives_new_cache_instance() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("interruption-rates");

    let first_source = Arc::new(CountingSource::new(&[("m6i.large", 1)]));
    let cache = InterruptionRateCache::new(Arc::new(FileStore::new(&dir)), first_source.clone());
    cache.get_or_refresh("us-west-2").await;
    assert_eq!(first_source.calls(), 1);

    // A new process would build a new cache over the same directory
    let second_source = Arc::new(CountingSource::new(&[]));
    let reopened =
        InterruptionRateCache::new(Arc::new(FileStore::new(&dir)), second_source.clone());
    let result = reopened.get_or_refresh("us-west-2").await;
    assert_eq!(result.lookup("m6i.large").unwrap().rank, 1);
    assert_eq!(second_source.calls(), 0);

    reopened.clear().unwrap();
    assert!(reopened.entry_age("us-west-2").is_none());
}
