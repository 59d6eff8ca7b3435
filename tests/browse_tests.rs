//! Integration tests for directory listing
//!
//! Covers target resolution (probe and explicit path), hidden-entry
//! filtering, creation-time ordering, display projection and the
//! hold-plus-grace listing cache.

mod common;

use std::sync::Arc;
use std::time::Duration;

use skylight::{BrowseError, BrowseTarget, Browser, ClientConfig, MemoryShare};

use common::{TestEnvironment, sample_tree, ts};

/// Flat directory with explicit stamps, for order and cache tests
fn flat_tree(share: &MemoryShare) {
    share.add_file("/flat/old.log", b"old");
    share.stamp("/flat/old.log", ts(10));
    share.add_file("/flat/new.log", b"new");
    share.stamp("/flat/new.log", ts(30));
    share.add_file("/flat/mid.log", b"mid");
    share.stamp("/flat/mid.log", ts(20));
}

fn names(entries: &[skylight::ShareEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.name.as_str()).collect()
}

#[tokio::test]
async fn test_probe_lists_marker_directory_newest_first() {
    let env = TestEnvironment::new();
    sample_tree(&env.share);
    env.connect().await;

    let listing = env.probing_browser().entries().await.unwrap();
    assert_eq!(
        names(&listing),
        vec!["sunrise.mp4", "drafts", "ledger.txt", "harbor.mov"]
    );
}

#[tokio::test]
async fn test_hidden_entries_are_excluded() {
    let env = TestEnvironment::new();
    sample_tree(&env.share);
    env.connect().await;

    let listing = env.probing_browser().entries().await.unwrap();
    assert!(listing.iter().all(|e| !e.name.starts_with('.')));
    assert_eq!(listing.len(), 4);
}

#[tokio::test]
async fn test_projection_titles_and_item_counts() {
    let env = TestEnvironment::new();
    sample_tree(&env.share);
    env.connect().await;

    let listing = env.probing_browser().entries().await.unwrap();

    let sunrise = &listing[0];
    assert_eq!(sunrise.title, "Sunrise.mp");
    assert!(!sunrise.is_dir);
    assert_eq!(sunrise.item_count, "");

    let drafts = &listing[1];
    assert_eq!(drafts.title, "Draft");
    assert!(drafts.is_dir);
    // hidden children still count
    assert_eq!(drafts.item_count, "3 items");
    assert_eq!(drafts.path, std::path::Path::new("/Shows/Sample Clips/drafts"));
}

#[tokio::test]
async fn test_single_character_name_projects_empty_title() {
    let env = TestEnvironment::new();
    env.share.add_file("/flat/a", b"tiny");
    env.connect().await;

    let listing = env.browser_at("/flat").entries().await.unwrap();
    assert_eq!(listing[0].name, "a");
    assert_eq!(listing[0].title, "");
}

#[tokio::test]
async fn test_probe_without_marker_match_is_target_not_found() {
    let env = TestEnvironment::new();
    env.share.add_dir("/Incoming");
    env.share.add_dir("/Shows");
    env.share.add_dir("/Archive");
    // a marker-named file and an unmarked directory, but no marker directory
    env.share.add_file("/Shows/Sample index.txt", b"flat file");
    env.share.add_dir("/Shows/Raw Takes");
    env.connect().await;

    let err = env.probing_browser().entries().await.unwrap_err();
    assert!(matches!(err, BrowseError::TargetNotFound));
}

#[tokio::test]
async fn test_probe_with_short_root_is_target_not_found() {
    let env = TestEnvironment::new();
    env.share.add_dir("/OnlyOne");
    env.connect().await;

    let err = env.probing_browser().entries().await.unwrap_err();
    assert!(matches!(err, BrowseError::TargetNotFound));
}

#[tokio::test]
async fn test_custom_probe_parameters() {
    let env = TestEnvironment::new();
    sample_tree(&env.share);
    env.connect().await;

    let browser = env.probing_browser().target(BrowseTarget::Probe {
        root_index: 1,
        marker: "Raw".to_string(),
    });
    let listing = browser.entries().await.unwrap();
    assert!(listing.is_empty());
}

#[tokio::test]
async fn test_explicit_path_target() {
    let env = TestEnvironment::new();
    flat_tree(&env.share);
    env.connect().await;

    let listing = env.browser_at("/flat").entries().await.unwrap();
    assert_eq!(names(&listing), vec!["new.log", "mid.log", "old.log"]);
}

#[tokio::test]
async fn test_missing_path_target_is_target_not_found() {
    let env = TestEnvironment::new();
    env.connect().await;

    let err = env.browser_at("/absent").entries().await.unwrap_err();
    assert!(matches!(err, BrowseError::TargetNotFound));
}

#[tokio::test]
async fn test_listing_before_connect_is_an_access_error() {
    let env = TestEnvironment::new();
    sample_tree(&env.share);

    let err = env.probing_browser().entries().await.unwrap_err();
    assert!(matches!(err, BrowseError::NotConnected));
}

#[tokio::test]
async fn test_live_lease_suppresses_relisting() {
    let env = TestEnvironment::new();
    flat_tree(&env.share);
    env.connect().await;

    let browser = env.browser_at("/flat");
    let first = browser.entries().await.unwrap();
    assert_eq!(env.share.list_calls(), 1);

    let second = browser.entries().await.unwrap();
    assert_eq!(env.share.list_calls(), 1);
    assert_eq!(names(&first), names(&second));
}

#[tokio::test]
async fn test_release_within_grace_still_reuses() {
    let env = TestEnvironment::new();
    flat_tree(&env.share);
    env.connect().await;

    let browser = env.browser_at("/flat");
    let listing = browser.entries().await.unwrap();
    drop(listing);

    // default grace is five seconds; an immediate call lands inside it
    browser.entries().await.unwrap();
    assert_eq!(env.share.list_calls(), 1);
}

#[tokio::test]
async fn test_expired_grace_runs_the_listing_again() {
    let env = TestEnvironment::new();
    flat_tree(&env.share);
    env.connect().await;

    let mut config = ClientConfig::default();
    config.listing_grace_secs = 1;
    let browser = Browser::with_config(Arc::clone(&env.slot), &config)
        .target(BrowseTarget::Path("/flat".into()));

    let listing = browser.entries().await.unwrap();
    assert_eq!(env.share.list_calls(), 1);
    drop(listing);

    env.share.add_file("/flat/late.log", b"late");
    env.share.stamp("/flat/late.log", ts(40));

    tokio::time::sleep(Duration::from_millis(1300)).await;

    let refreshed = browser.entries().await.unwrap();
    assert_eq!(env.share.list_calls(), 2);
    assert_eq!(refreshed[0].name, "late.log");
}

#[tokio::test]
async fn test_failed_listing_is_not_cached() {
    let env = TestEnvironment::new();
    env.connect().await;

    let browser = env.browser_at("/flaky");
    let err = browser.entries().await.unwrap_err();
    assert!(matches!(err, BrowseError::TargetNotFound));

    env.share.add_file("/flaky/ready.txt", b"here now");
    let listing = browser.entries().await.unwrap();
    assert_eq!(names(&listing), vec!["ready.txt"]);
}

#[tokio::test]
async fn test_selection_round_trip() {
    let env = TestEnvironment::new();
    flat_tree(&env.share);
    env.connect().await;

    let browser = env.browser_at("/flat");
    let listing = browser.entries().await.unwrap();
    assert!(browser.selected().is_none());

    browser.select(listing[0].clone());
    assert_eq!(browser.selected().unwrap().name, "new.log");

    browser.clear_selection();
    assert!(browser.selected().is_none());
}
