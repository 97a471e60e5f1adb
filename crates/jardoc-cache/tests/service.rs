mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use jardoc_cache::{CachePolicy, DocService, ServiceSettings};
use pretty_assertions::assert_eq;
use support::{project, version, FakeRepository};

fn settings(excluded: &[&str]) -> ServiceSettings {
    ServiceSettings {
        project: project(),
        policy: CachePolicy {
            snapshot_ttl: Duration::from_secs(60),
            ..CachePolicy::default()
        },
        refresh_interval: None,
        excluded_versions: excluded.iter().map(|v| v.to_string()).collect(),
    }
}

#[tokio::test(start_paused = true)]
async fn start_loads_versions_and_honours_exclusions() {
    let repo = Arc::new(FakeRepository::new(&["1.0", "2.0-SNAPSHOT", "3.0"]));
    let service = DocService::start(repo.clone(), settings(&["3.0"])).await.unwrap();

    assert_eq!(service.versions().len(), 3);
    assert_eq!(service.latest(), Some(version("1.0")));
    assert_eq!(service.find_version("3.0"), Some(version("3.0")));

    service.versions().include("3.0");
    assert_eq!(service.latest(), Some(version("3.0")));

    service.shutdown().await;
}

#[tokio::test]
async fn start_fails_when_the_version_list_is_unavailable() {
    let repo = Arc::new(FakeRepository::new(&["1.0"]));
    repo.fail_listing.store(true, Ordering::SeqCst);

    let err = DocService::start(repo, settings(&[])).await.unwrap_err();
    assert!(!err.is_not_found());
}

#[tokio::test(start_paused = true)]
async fn refresher_replaces_versions_and_survives_failures() {
    let repo = Arc::new(FakeRepository::new(&["1.0"]));
    let service = DocService::start(repo.clone(), settings(&[])).await.unwrap();
    assert_eq!(repo.listings.load(Ordering::SeqCst), 1);

    repo.versions.lock().push("2.0".into());
    // Default interval is half the snapshot TTL.
    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(repo.listings.load(Ordering::SeqCst), 2);
    assert_eq!(service.latest(), Some(version("2.0")));

    repo.fail_listing.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(repo.listings.load(Ordering::SeqCst), 3);
    assert_eq!(service.versions().len(), 2);

    service.shutdown().await;
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(repo.listings.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn refresher_expires_snapshots() {
    let repo = Arc::new(FakeRepository::new(&["1.0-SNAPSHOT"]));
    let service = DocService::start(repo.clone(), settings(&[])).await.unwrap();
    let snapshot = version("1.0-SNAPSHOT");

    service.get_or_fetch(&snapshot).await.unwrap();
    assert!(service.cache().contains(&snapshot));

    // Ticks at 30s (fresh) and 60s (exactly stale) and 90s.
    tokio::time::sleep(Duration::from_secs(91)).await;
    assert!(!service.cache().contains(&snapshot));

    service.shutdown().await;
}

#[tokio::test]
async fn refresh_now_runs_a_cycle_immediately() {
    let repo = Arc::new(FakeRepository::new(&["1.0"]));
    let service = DocService::start(repo.clone(), settings(&[])).await.unwrap();

    repo.versions.lock().push("1.1".into());
    service.refresh_now().await;
    assert_eq!(service.latest(), Some(version("1.1")));

    service.shutdown().await;
    service.shutdown().await;
}
