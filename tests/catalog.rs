mod common;

use common::{indexed, no_detail, Scripted, ScriptedService};
use doc_insights::catalog::{FileCatalog, SENTINEL_GROUP};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

const TIMEOUT: Duration = Duration::from_secs(60);

fn paths(catalog: &FileCatalog) -> Vec<String> {
    catalog
        .view()
        .files()
        .iter()
        .map(|f| f.path.clone())
        .collect()
}

#[tokio::test]
async fn test_load_replaces_list() {
    let (service, _ctl) = ScriptedService::new();
    let catalog = FileCatalog::new(service.clone(), TIMEOUT);
    assert!(catalog.view().files().is_empty());

    service.set_files(&["repoA/x.md", "repoA/y.md", "standalone.txt"]);
    assert!(catalog.load_catalog().await);
    assert_eq!(paths(&catalog), vec!["repoA/x.md", "repoA/y.md", "standalone.txt"]);

    service.set_files(&["repoB/z.md"]);
    assert!(catalog.load_catalog().await);
    assert_eq!(paths(&catalog), vec!["repoB/z.md"]);
    assert!(!catalog.view().is_loading());
}

#[tokio::test]
async fn test_failure_keeps_previous_list() {
    let (service, _ctl) = ScriptedService::new();
    let catalog = FileCatalog::new(service.clone(), TIMEOUT);
    service.set_files(&["repoA/x.md"]);
    catalog.load_catalog().await;

    service.script_files(Scripted::Fail(no_detail(500)));
    assert!(!catalog.load_catalog().await);

    assert_eq!(paths(&catalog), vec!["repoA/x.md"]);
    assert!(!catalog.view().is_loading());
}

#[tokio::test]
async fn test_overlapping_loads_keep_newest() {
    let (service, _ctl) = ScriptedService::new();
    let catalog = Arc::new(FileCatalog::new(service.clone(), TIMEOUT));
    let (release_old, held_old) = oneshot::channel();
    let (release_new, held_new) = oneshot::channel();
    service.script_files(Scripted::Hold(held_old));
    service.script_files(Scripted::Hold(held_new));

    let c = catalog.clone();
    let older = tokio::spawn(async move { c.load_catalog().await });
    while service.list_calls() < 1 {
        tokio::task::yield_now().await;
    }
    let c = catalog.clone();
    let newer = tokio::spawn(async move { c.load_catalog().await });
    while service.list_calls() < 2 {
        tokio::task::yield_now().await;
    }
    assert!(catalog.view().is_loading());

    release_new.send(Ok(indexed(&["new/a.md"]))).unwrap();
    assert!(newer.await.unwrap());
    assert_eq!(paths(&catalog), vec!["new/a.md"]);
    // The older fetch is still outstanding.
    assert!(catalog.view().is_loading());

    release_old.send(Ok(indexed(&["old/a.md"]))).unwrap();
    assert!(!older.await.unwrap());
    assert_eq!(paths(&catalog), vec!["new/a.md"]);
    assert!(!catalog.view().is_loading());
}

#[tokio::test(start_paused = true)]
async fn test_hung_fetch_times_out() {
    let (service, _ctl) = ScriptedService::new();
    let catalog = FileCatalog::new(service.clone(), Duration::from_secs(5));
    let (_release, held) = oneshot::channel();
    service.script_files(Scripted::Hold(held));

    assert!(!catalog.load_catalog().await);
    assert!(!catalog.view().is_loading());
}

#[tokio::test]
async fn test_grouped_view_after_load() {
    let (service, _ctl) = ScriptedService::new();
    let catalog = FileCatalog::new(service.clone(), TIMEOUT);

    let mut list: Vec<String> = (0..12).map(|i| format!("handbook/page{:02}.md", i)).collect();
    list.push("notes.txt".to_string());
    list.push("api/spec.yaml".to_string());
    let refs: Vec<&str> = list.iter().map(|s| s.as_str()).collect();
    service.set_files(&refs);
    catalog.load_catalog().await;

    let view = catalog.view();
    let groups = view.groups(10);
    let names: Vec<&str> = groups.iter().map(|g| g.name).collect();
    assert_eq!(names, vec!["handbook", SENTINEL_GROUP, "api"]);

    assert_eq!(groups[0].shown.len(), 10);
    assert_eq!(groups[0].total, 12);
    assert_eq!(groups[0].more_label().as_deref(), Some("+2 more files"));
    assert_eq!(groups[1].shown[0].file_name(), "notes.txt");
    assert!(groups[2].more_label().is_none());
}

#[tokio::test]
async fn test_subscribers_see_refresh() {
    let (service, _ctl) = ScriptedService::new();
    let catalog = FileCatalog::new(service.clone(), TIMEOUT);
    let mut rx = catalog.subscribe();
    service.set_files(&["a/b.md"]);

    catalog.load_catalog().await;

    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().files().len(), 1);
}
