use std::collections::HashSet;

use agora::cache::{CacheConfig, FeedCache, feed_page_key};
use metrics_util::debugging::DebuggingRecorder;

#[test]
fn feed_cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let cache = FeedCache::from_config(&CacheConfig::default());
    let key = feed_page_key(1);

    assert!(cache.get::<Vec<u32>>(&key).is_none());
    assert!(cache.set(&key, &vec![1_u32, 2, 3], cache.ttl()));
    assert_eq!(cache.get::<Vec<u32>>(&key), Some(vec![1, 2, 3]));
    assert!(cache.invalidate_feed());

    // Unavailable backends surface as errors and misses, never failures.
    let disabled = FeedCache::disabled();
    assert!(disabled.get::<Vec<u32>>(&key).is_none());
    assert!(!disabled.set(&key, &vec![1_u32], disabled.ttl()));

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "agora_feed_cache_hit_total",
        "agora_feed_cache_miss_total",
        "agora_feed_cache_error_total",
        "agora_feed_cache_invalidate_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
