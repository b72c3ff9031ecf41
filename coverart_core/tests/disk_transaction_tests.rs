//! Editor and snapshot guarantees as seen through the resolver

mod support;

use coverart_core::{DataSource, Error, RequestPolicy};
use coverart_test_utils::ArtworkBuilder;
use std::time::Duration;
use support::Pipeline;

#[tokio::test]
async fn test_failed_stream_leaves_no_entry() {
    let mut p = Pipeline::new().await;
    p.fetcher.expect_broken_stream(128, 3);
    let item = ArtworkBuilder::movie(1).build();
    let key = Pipeline::key(&item);

    let err = p
        .resolver
        .resolve(&item, &RequestPolicy::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Network(_)));
    assert!(p.disk.open_snapshot(&key).is_none());
    assert!(p.disk.open_editor(&key).is_some());
    assert!(p.temp_files().is_empty());
}

#[tokio::test]
async fn test_concurrent_editors_are_exclusive() {
    let p = Pipeline::new().await;
    let key = Pipeline::key(&ArtworkBuilder::movie(2).build());

    let first = p.disk.open_editor(&key);
    let second = p.disk.open_editor(&key);

    assert!(first.is_some());
    assert!(second.is_none());
    drop(first);
    assert!(p.disk.open_editor(&key).is_some());
}

#[tokio::test]
async fn test_busy_key_still_resolves() {
    let p = Pipeline::new().await;
    let item = ArtworkBuilder::movie(2).build();
    let key = Pipeline::key(&item);
    let held = p.disk.open_editor(&key).unwrap();

    let result = p
        .resolver
        .resolve(&item, &RequestPolicy::default())
        .await
        .unwrap();

    assert_eq!(result.source, DataSource::Network);
    assert_eq!(result.image.byte_size(), 1024);
    held.abort();
    assert!(!p.disk.contains(&key));
}

#[tokio::test]
async fn test_parallel_resolutions_of_same_key() {
    let mut p = Pipeline::new().await;
    p.fetcher.with_delay(Duration::from_millis(20));
    let item = ArtworkBuilder::movie(6).build();

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let resolver = p.resolver.clone();
            let item = item.clone();
            tokio::spawn(async move {
                resolver
                    .resolve(&item, &RequestPolicy::network_only().with_disk_write(true))
                    .await
            })
        })
        .collect();

    for task in tasks {
        let result = task.await.unwrap().unwrap();
        assert_eq!(result.image.byte_size(), 1024);
    }

    let key = Pipeline::key(&item);
    assert!(p.disk.contains(&key));
    assert!(!p.disk.is_locked(&key));
    assert!(p.temp_files().is_empty());
}

#[tokio::test]
async fn test_cancelled_resolution_releases_editor() {
    let mut p = Pipeline::new().await;
    p.fetcher.expect_stalled_stream(256, 2);
    let item = ArtworkBuilder::movie(7).build();
    let key = Pipeline::key(&item);

    let task = {
        let resolver = p.resolver.clone();
        let item = item.clone();
        tokio::spawn(async move { resolver.resolve(&item, &RequestPolicy::default()).await })
    };

    tokio::time::timeout(Duration::from_secs(5), async {
        while !p.disk.is_locked(&key) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("resolution never opened an editor");

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    assert!(!p.disk.is_locked(&key));
    assert!(p.disk.open_snapshot(&key).is_none());
    assert!(p.disk.open_editor(&key).is_some());
    assert!(p.temp_files().is_empty());
}

#[tokio::test]
async fn test_entries_survive_reopen() {
    let p = Pipeline::new().await;
    let item = ArtworkBuilder::movie(9).build();
    let key = Pipeline::key(&item);
    p.resolver
        .resolve(&item, &RequestPolicy::default())
        .await
        .unwrap();

    let reopened = coverart_core::DiskCache::open(p.disk.root(), 1024 * 1024)
        .await
        .unwrap();
    let snapshot = reopened.open_snapshot(&key).unwrap();
    assert_eq!(snapshot.read().await.unwrap().len(), 1024);
}

#[tokio::test]
async fn test_budget_evicts_least_recently_read() {
    let p = Pipeline::with_disk_budget(2500).await;
    let a = ArtworkBuilder::movie(1).build();
    let b = ArtworkBuilder::movie(2).build();
    let c = ArtworkBuilder::movie(3).build();
    let policy = RequestPolicy::default().with_memory_read(false);

    p.resolver.resolve(&a, &policy).await.unwrap();
    p.resolver.resolve(&b, &policy).await.unwrap();
    // Reading `a` again makes `b` the eviction candidate
    assert_eq!(
        p.resolver.resolve(&a, &policy).await.unwrap().source,
        DataSource::Disk
    );
    p.resolver.resolve(&c, &policy).await.unwrap();

    assert!(p.disk.contains(&Pipeline::key(&a)));
    assert!(!p.disk.contains(&Pipeline::key(&b)));
    assert!(p.disk.contains(&Pipeline::key(&c)));
    assert!(p.disk.stats().total_size_bytes <= 2500);
}
