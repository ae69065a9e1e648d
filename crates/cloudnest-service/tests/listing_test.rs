//! Cache-first listing, trees and breadcrumbs.

mod helpers;

use std::sync::Arc;

use cloudnest_cache::keys;
use cloudnest_cache::storage::MemoryStorage;
use cloudnest_core::config::ClientConfig;
use cloudnest_core::traits::DurableStorage;
use cloudnest_core::types::ItemId;
use cloudnest_entity::{Item, ItemKind};
use cloudnest_service::{DriveContext, ListOptions};

use helpers::{FakeApi, context, sample_items};

#[tokio::test]
async fn test_second_listing_is_served_from_cache() {
    let api = FakeApi::with_items(sample_items());
    let ctx = context(Arc::clone(&api));

    let first = ctx.items.list(None, &ListOptions::default()).await.unwrap();
    let second = ctx.items.list(None, &ListOptions::default()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    assert_eq!(api.calls("list"), 1);
    assert!(ctx.store.contains(&keys::files(None)));
}

#[tokio::test]
async fn test_force_refresh_bypasses_cache() {
    let api = FakeApi::with_items(sample_items());
    let ctx = context(Arc::clone(&api));

    ctx.items.list(None, &ListOptions::default()).await.unwrap();
    ctx.items.list(None, &ListOptions::refresh()).await.unwrap();
    assert_eq!(api.calls("list"), 2);
}

#[tokio::test]
async fn test_listing_concatenates_every_page() {
    let api = FakeApi::with_items(sample_items());
    api.set_page_size(2);
    let ctx = context(Arc::clone(&api));

    let root = ctx.items.list(None, &ListOptions::default()).await.unwrap();
    let names: Vec<&str> = root.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Docs", "Photos", "readme.txt"]);
    assert_eq!(api.calls("list"), 2);
}

#[tokio::test]
async fn test_kind_filter_applies_to_cached_listing() {
    let api = FakeApi::with_items(sample_items());
    let ctx = context(Arc::clone(&api));
    let folders_only = ListOptions {
        kind: Some(ItemKind::Folder),
        ..ListOptions::default()
    };

    let folders = ctx.items.list(None, &folders_only).await.unwrap();
    let all = ctx.items.list(None, &ListOptions::default()).await.unwrap();

    assert_eq!(folders.len(), 2);
    assert!(folders.iter().all(Item::is_folder));
    assert_eq!(all.len(), 3);
    assert_eq!(api.calls("list"), 1);
}

#[tokio::test]
async fn test_cache_survives_restart() {
    let api = FakeApi::with_items(sample_items());
    let storage: Arc<dyn DurableStorage> = Arc::new(MemoryStorage::new());

    let first = DriveContext::new(ClientConfig::default(), Arc::clone(&storage), api.clone());
    first.items.list(None, &ListOptions::default()).await.unwrap();
    drop(first);

    let second = DriveContext::new(ClientConfig::default(), storage, api.clone());
    let root = second.items.list(None, &ListOptions::default()).await.unwrap();
    assert_eq!(root.len(), 3);
    assert_eq!(api.calls("list"), 1);
}

#[tokio::test]
async fn test_listing_failure_is_not_cached() {
    let api = FakeApi::with_items(sample_items());
    api.fail_listing(Some("1"));
    let ctx = context(Arc::clone(&api));

    let err = ctx
        .items
        .list(Some(&ItemId::from("1")), &ListOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(!ctx.store.contains(&keys::files(Some(&ItemId::from("1")))));
}

#[tokio::test]
async fn test_forest_and_lazy_expand() {
    let api = FakeApi::with_items(sample_items());
    let ctx = context(Arc::clone(&api));

    let mut roots = ctx.items.forest(None).await.unwrap();
    let names: Vec<&str> = roots.iter().map(|n| n.name()).collect();
    assert_eq!(names, vec!["Docs", "Photos"]);
    assert!(roots.iter().all(|n| !n.is_loaded));

    let docs = &mut roots[0];
    ctx.items.expand(docs).await.unwrap();
    assert!(docs.is_loaded);
    assert_eq!(docs.children.len(), 1);
    assert_eq!(docs.children[0].name(), "Reports");
    assert_eq!(docs.files.len(), 1);
    assert_eq!(docs.files[0].name, "notes.txt");

    let cached = ctx.items.forest(None).await.unwrap();
    assert_eq!(cached.len(), 2);
    assert_eq!(api.calls("list"), 2);
}

#[tokio::test]
async fn test_breadcrumb_runs_root_first() {
    let api = FakeApi::with_items(sample_items());
    let ctx = context(Arc::clone(&api));

    let trail = ctx.items.breadcrumb(&ItemId::from("3")).await.unwrap();
    let names: Vec<&str> = trail.iter().map(|s| s.name.as_str()).collect();
    let paths: Vec<&str> = trail.iter().map(|s| s.path.as_str()).collect();
    assert_eq!(names, vec!["Docs", "Reports", "Archive"]);
    assert_eq!(paths, vec!["Docs", "Docs/Reports", "Docs/Reports/Archive"]);
}

#[tokio::test]
async fn test_breadcrumb_refetches_once_for_unknown_folder() {
    let api = FakeApi::with_items(sample_items());
    let ctx = context(Arc::clone(&api));

    let missing = ctx.items.breadcrumb(&ItemId::from("99")).await.unwrap();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].name, "Folder 99");
    assert_eq!(api.calls("folder_tree"), 2);

    let known = ctx.items.breadcrumb(&ItemId::from("2")).await.unwrap();
    assert_eq!(known.len(), 2);
    assert_eq!(api.calls("folder_tree"), 2);
}

#[tokio::test]
async fn test_move_targets_exclude_subject_subtree() {
    let api = FakeApi::with_items(sample_items());
    let ctx = context(Arc::clone(&api));

    let targets = ctx.items.move_targets(&[ItemId::from("2")]).await.unwrap();
    let ids: Vec<&str> = targets
        .iter()
        .flat_map(|root| root.iter())
        .map(|node| node.id().as_str())
        .collect();
    assert!(ids.contains(&"1"));
    assert!(ids.contains(&"4"));
    assert!(!ids.contains(&"2"));
    assert!(!ids.contains(&"3"));

    ctx.items.move_targets(&[ItemId::from("2")]).await.unwrap();
    assert_eq!(api.calls("folder_tree"), 2);
}

#[tokio::test]
async fn test_remote_search_is_cached_by_query() {
    let api = FakeApi::with_items(sample_items());
    let ctx = context(Arc::clone(&api));

    let hits = ctx.items.search_remote("Report", false).await.unwrap();
    assert_eq!(hits.len(), 3);
    ctx.items.search_remote("report ", false).await.unwrap();
    assert_eq!(api.calls("list"), 1);
    assert!(ctx.store.contains(&keys::search("report")));

    assert!(ctx.items.search_remote("   ", false).await.unwrap().is_empty());
}
