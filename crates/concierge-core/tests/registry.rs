//! Lazy, once-only tool discovery.

use std::sync::Arc;
use std::time::Duration;

use concierge_core::tools::{Tool, ToolRegistry};
use concierge_test_utils::StaticToolSource;

fn catalogue() -> Vec<Tool> {
    vec![
        Tool::unbound("getInterns", "list of interns"),
        Tool::unbound("getRooms", "meeting rooms and their availability"),
    ]
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn test_concurrent_callers_share_one_discovery() {
    let source = Arc::new(StaticToolSource::new(catalogue()).with_delay(Duration::from_millis(50)));
    let registry = Arc::new(ToolRegistry::new(source.clone(), Duration::from_secs(5)));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.ensure_loaded().await })
        })
        .collect();

    let mut sets = Vec::new();
    for handle in handles {
        sets.push(handle.await.unwrap());
    }

    assert_eq!(source.discoveries(), 1);
    assert!(sets.iter().all(|set| Arc::ptr_eq(set, &sets[0])));
    assert_eq!(sets[0].len(), 2);
}

#[test_log::test(tokio::test)]
async fn test_failed_discovery_is_retried() {
    let source = Arc::new(StaticToolSource::new(catalogue()).fail_next("connection refused"));
    let registry = ToolRegistry::new(source.clone(), Duration::from_secs(5));

    assert!(registry.ensure_loaded().await.is_empty());
    assert!(!registry.is_loaded().await);

    let tools = registry.ensure_loaded().await;
    assert_eq!(tools.len(), 2);
    assert!(registry.is_loaded().await);
    assert_eq!(source.discoveries(), 2);

    registry.ensure_loaded().await;
    assert_eq!(source.discoveries(), 2);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_slow_discovery_is_cut_off() {
    let source = Arc::new(StaticToolSource::new(catalogue()).with_delay(Duration::from_secs(120)));
    let registry = ToolRegistry::new(source, Duration::from_secs(10));

    let started = tokio::time::Instant::now();
    let tools = registry.ensure_loaded().await;

    assert!(tools.is_empty());
    assert!(started.elapsed() < Duration::from_secs(11));
}

#[test_log::test(tokio::test)]
async fn test_disabled_registry_is_always_empty() {
    let registry = ToolRegistry::disabled();
    assert!(!registry.is_enabled());
    assert!(registry.ensure_loaded().await.is_empty());
}
