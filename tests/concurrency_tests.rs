//! Overlapping navigations: the newest one wins and stale ones leave no trace.

mod common;

use common::mocks::{Harness, HarnessOptions, APP_TITLE};
use pageflow::{NavigateOptions, NavigationOutcome, NavigationPhase};
use std::time::Duration;

fn spawn_navigation(h: &Harness, path: &'static str) -> tokio::task::JoinHandle<NavigationOutcome> {
    let router = h.router.clone();
    tokio::spawn(async move {
        router
            .navigate_with_outcome(path, NavigateOptions::default())
            .await
    })
}

#[tokio::test(start_paused = true)]
async fn test_newer_navigation_supersedes_slow_load() {
    let h = Harness::new();

    let slow = spawn_navigation(&h, "/slow.html");
    tokio::time::sleep(Duration::from_millis(10)).await;
    let fast = h
        .router
        .navigate_with_outcome("/a.html", NavigateOptions::default())
        .await;
    let slow = slow.await.expect("navigation task");

    assert!(fast.is_settled());
    assert_eq!(
        slow,
        NavigationOutcome::Superseded {
            path: "/slow.html".to_string()
        }
    );
    assert_eq!(h.router.current_path(), "/a.html");
    assert_eq!(h.router.phase(), NavigationPhase::Settled);
    assert_eq!(h.document.title(), format!("Page A - {}", APP_TITLE));
    assert!(h.document.content().contains("<p>a</p>"));
    assert_eq!(h.module("slow").inits(), 0);
    assert_eq!(h.journal(), vec!["init:a"]);
}

#[tokio::test(start_paused = true)]
async fn test_module_superseded_during_init_is_released() {
    let h = Harness::with_options(HarnessOptions {
        a_init_delay: Some(Duration::from_millis(50)),
        ..Default::default()
    });

    let slow = spawn_navigation(&h, "/a.html");
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(h.router.navigate("/b.html", NavigateOptions::default()).await);
    let slow = slow.await.expect("navigation task");

    assert!(matches!(slow, NavigationOutcome::Superseded { .. }));
    assert_eq!(h.router.current_path(), "/b.html");
    assert!(h.document.content().contains("<p>b</p>"));
    assert!(h.document.stylesheets("a").is_empty());
    assert_eq!(h.document.stylesheets("b"), vec!["/css/b.css"]);
    // Torn down by the newer navigation, then released once its init finished.
    assert_eq!(h.module("a").cleanups(), 2);
    assert_eq!(h.module("b").cleanups(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_navigations_share_one_load() {
    let h = Harness::new();

    let first = spawn_navigation(&h, "/slow.html");
    let second = spawn_navigation(&h, "/slow.html");
    let first = first.await.expect("navigation task");
    let second = second.await.expect("navigation task");

    assert_eq!(h.source.load_count("/mod-slow.js"), 1);
    assert!(matches!(first, NavigationOutcome::Superseded { .. }));
    assert!(second.is_settled());
    assert_eq!(h.module("slow").inits(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_vetoed_navigation_does_not_supersede() {
    let h = Harness::new();
    let _registration = h
        .router
        .on_before_navigate(|change| Ok((change.to != "/b.html").into()));

    let slow = spawn_navigation(&h, "/slow.html");
    tokio::time::sleep(Duration::from_millis(10)).await;
    let vetoed = h
        .router
        .navigate_with_outcome("/b.html", NavigateOptions::default())
        .await;

    assert!(matches!(vetoed, NavigationOutcome::Vetoed { .. }));
    assert!(slow.await.expect("navigation task").is_settled());
    assert_eq!(h.router.current_path(), "/slow.html");
}
