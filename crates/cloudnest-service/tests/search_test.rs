//! Recursive indexing and debounced search input.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::TryRecvError;

use cloudnest_core::events::{InvalidationEvent, SearchMode};
use cloudnest_service::search::IndexOutcome;

use helpers::{FakeApi, context, sample_items};

#[tokio::test]
async fn test_index_walks_every_folder() {
    let api = FakeApi::with_items(sample_items());
    let ctx = context(Arc::clone(&api));

    let outcome = ctx.indexer.index_all(false).await;
    assert_eq!(
        outcome,
        IndexOutcome::Completed {
            folders: 5,
            items: 8,
            failed: 0,
        }
    );
    assert!(!ctx.indexer.is_indexing());

    let hits = ctx.indexer.search("REPORT");
    let paths: Vec<&str> = hits.iter().map(|h| h.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "/Docs/Reports/Archive/old-report.pdf",
            "/Docs/Reports/q1-report.pdf",
            "/Docs/Reports",
        ]
    );
}

#[tokio::test]
async fn test_exact_match_ranks_first() {
    let api = FakeApi::with_items(sample_items());
    let ctx = context(Arc::clone(&api));
    ctx.indexer.index_all(false).await;

    let hits = ctx.indexer.search("reports");
    assert_eq!(hits.len(), 1);
    assert!(hits[0].exact);

    let hits = ctx.indexer.search("txt");
    let names: Vec<&str> = hits.iter().map(|h| h.item.name.as_str()).collect();
    assert_eq!(names, vec!["notes.txt", "readme.txt"]);
    assert!(ctx.indexer.search("   ").is_empty());
}

#[tokio::test]
async fn test_failed_folder_is_skipped() {
    let api = FakeApi::with_items(sample_items());
    api.fail_listing(Some("2"));
    let ctx = context(Arc::clone(&api));

    let outcome = ctx.indexer.index_all(false).await;
    assert_eq!(
        outcome,
        IndexOutcome::Completed {
            folders: 3,
            items: 5,
            failed: 1,
        }
    );

    let hits = ctx.indexer.search("report");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].path, "/Docs/Reports");
}

#[tokio::test(start_paused = true)]
async fn test_second_pass_while_running_is_a_no_op() {
    let api = FakeApi::with_items(sample_items());
    api.set_list_latency(Duration::from_millis(100));
    let ctx = context(Arc::clone(&api));

    let running = ctx.indexer.spawn_index_all(false);
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(ctx.indexer.is_indexing());
    assert_eq!(ctx.indexer.index_all(false).await, IndexOutcome::AlreadyRunning);

    let outcome = running.await.unwrap();
    assert!(matches!(outcome, IndexOutcome::Completed { failed: 0, .. }));
    assert_eq!(api.calls("list"), 5);
}

#[tokio::test]
async fn test_forced_pass_refetches() {
    let api = FakeApi::with_items(sample_items());
    let ctx = context(Arc::clone(&api));

    ctx.indexer.index_all(false).await;
    ctx.indexer.index_all(false).await;
    assert_eq!(api.calls("list"), 5);

    ctx.indexer.index_all(true).await;
    assert_eq!(api.calls("list"), 10);
    assert_eq!(ctx.indexer.indexed_items(), 8);
}

#[tokio::test(start_paused = true)]
async fn test_search_box_publishes_last_query_only() {
    let api = FakeApi::with_items(sample_items());
    let ctx = context(Arc::clone(&api));
    ctx.indexer.index_all(false).await;
    let mut events = ctx.bus.watch();

    let mut search = ctx.search_box(SearchMode::Local);
    let results = search.results();
    search.input("rep");
    tokio::time::sleep(Duration::from_millis(100)).await;
    search.input(" report ");
    assert!(search.is_pending());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(
        events.try_recv().unwrap(),
        InvalidationEvent::GlobalSearch {
            query: "report".into(),
            mode: SearchMode::Local,
        }
    );
    assert_eq!(events.try_recv().unwrap_err(), TryRecvError::Empty);
    assert_eq!(results.borrow().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_remote_mode_leaves_local_results_empty() {
    let api = FakeApi::with_items(sample_items());
    let ctx = context(Arc::clone(&api));
    ctx.indexer.index_all(false).await;
    let mut events = ctx.bus.watch();

    let mut search = ctx.search_box(SearchMode::Remote);
    search.input("report");
    tokio::time::sleep(Duration::from_millis(400)).await;

    match events.try_recv().unwrap() {
        InvalidationEvent::GlobalSearch { mode, .. } => assert_eq!(mode, SearchMode::Remote),
        other => panic!("unexpected event {other:?}"),
    }
    assert!(search.results().borrow().is_empty());

    search.input("archive");
    search.clear();
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(events.try_recv().unwrap_err(), TryRecvError::Empty);
}

#[tokio::test(start_paused = true)]
async fn test_index_rebuilds_after_mutation() {
    let api = FakeApi::with_items(sample_items());
    let ctx = context(Arc::clone(&api));
    let _subs = ctx.keep_index_fresh();
    ctx.indexer.index_all(false).await;
    assert!(ctx.indexer.search("invoices").is_empty());

    ctx.mutations.create_folder("Invoices", None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let hits = ctx.indexer.search("invoices");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].path, "/Invoices");
}
