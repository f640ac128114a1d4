use std::time::Duration;
use tokio::time;

use crate::cache::ResponseCache;

#[tokio::test(start_paused = true)]
async fn test_store_then_lookup_before_ttl() {
    let cache = ResponseCache::new();
    cache.store("k", "v", Duration::from_secs(10)).unwrap();

    time::advance(Duration::from_secs(9)).await;
    assert_eq!(cache.lookup("k").unwrap().as_deref(), Some("v"));
}

#[tokio::test(start_paused = true)]
async fn test_lookup_after_ttl_is_absent() {
    let cache = ResponseCache::new();
    cache.store("k", "v", Duration::from_secs(10)).unwrap();

    time::advance(Duration::from_millis(10_001)).await;
    assert_eq!(cache.lookup("k").unwrap(), None);

    // Lazy expiry removed the entry
    assert_eq!(cache.len(), 0);
}

#[tokio::test]
async fn test_missing_key() {
    let cache = ResponseCache::new();
    assert_eq!(cache.lookup("never-stored").unwrap(), None);
}

#[tokio::test]
async fn test_last_write_wins() {
    let cache = ResponseCache::new();
    cache.store("k", "first", Duration::from_secs(60)).unwrap();
    cache.store("k", "second", Duration::from_secs(60)).unwrap();

    assert_eq!(cache.lookup("k").unwrap().as_deref(), Some("second"));
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_flush() {
    let cache = ResponseCache::new();
    cache.store("a", "1", Duration::from_secs(60)).unwrap();
    cache.store("b", "2", Duration::from_secs(60)).unwrap();
    assert_eq!(cache.len(), 2);

    cache.flush().unwrap();
    assert!(cache.is_empty());
    assert_eq!(cache.lookup("a").unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_purge_expired_keeps_live_entries() {
    let cache = ResponseCache::new();
    cache.store("short", "1", Duration::from_secs(1)).unwrap();
    cache.store("long", "2", Duration::from_secs(100)).unwrap();

    time::advance(Duration::from_secs(2)).await;
    assert_eq!(cache.purge_expired().unwrap(), 1);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.lookup("long").unwrap().as_deref(), Some("2"));
}

#[tokio::test(start_paused = true)]
async fn test_background_sweeper_bounds_memory() {
    let cache = ResponseCache::new();
    cache.start_sweeper(Duration::from_secs(5));
    cache.store("k", "v", Duration::from_secs(1)).unwrap();

    // No lookup happens, only the sweeper can remove it
    time::sleep(Duration::from_secs(6)).await;
    assert_eq!(cache.len(), 0);

    cache.stop_sweeper();
}

#[tokio::test(start_paused = true)]
async fn test_live_len_skips_unswept_expired_entries() {
    let cache = ResponseCache::new();
    cache.store("short", "1", Duration::from_secs(1)).unwrap();
    cache.store("long", "2", Duration::from_secs(100)).unwrap();

    time::advance(Duration::from_secs(2)).await;
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.live_len(), 1);
}
