//! Library-level scenarios for a running bridge on an in-memory page.

use serde_json::json;
use sharebridge::host::memory::{MemoryPage, MemoryWidget};
use sharebridge::host::{GlobalSlot, Page};
use sharebridge::models::ProfileId;
use sharebridge::script::Environment;
use sharebridge::{BridgeBuilder, ShareBridge};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::{Instant, advance};

async fn run_for(ms: u64) {
    for _ in 0..ms / 10 {
        advance(Duration::from_millis(10)).await;
        tokio::task::yield_now().await;
    }
}

fn bridge_on(page: &Arc<MemoryPage>) -> ShareBridge {
    BridgeBuilder::new(page.clone())
        .environment(Environment::Unittest)
        .build()
}

#[test]
fn returned_configs_never_alias_state() {
    let page = Arc::new(MemoryPage::new());
    let bridge = bridge_on(&page);

    let first = bridge.set_share_config(&json!({"url": "https://a.example"}));
    let mut copy = first.to_value();
    copy["url"] = json!("https://mutated.example");

    assert_eq!(bridge.share_url().as_deref(), Some("https://a.example"));
    assert_eq!(
        page.global(GlobalSlot::Share),
        Some(json!({"url": "https://a.example"}))
    );
}

#[test]
fn pubid_sticks_across_config_replacements() {
    let page = Arc::new(MemoryPage::new());
    let bridge = bridge_on(&page);

    bridge.set_general_config(&json!({"pubid": "ra-1", "ui_language": "en"}));
    bridge.set_general_config(&json!({"ui_language": "de"}));
    let config = bridge.set_general_config(&json!("not a map"));

    assert_eq!(config.to_value(), json!({"pubid": "ra-1", "ui_language": "de"}));

    let config = bridge.set_general_config(&json!({"pubid": "ra-2"}));
    assert_eq!(config.pubid(), Some("ra-2"));
    assert_eq!(bridge.profile_id(), ProfileId::new("ra-2"));
}

#[test]
fn twitter_via_unset_leaves_no_empty_objects() {
    let page = Arc::new(MemoryPage::new());
    let bridge = bridge_on(&page);

    bridge.twitter_via(&json!(false));
    assert_eq!(bridge.share_config().to_value(), json!({}));

    bridge.twitter_via(&json!("alice"));
    bridge.twitter_via(&json!(false));
    assert_eq!(
        bridge.share_config().to_value(),
        json!({"passthrough": {"twitter": {}}})
    );
}

#[test]
fn url_shortening_registers_both_maps() {
    let page = Arc::new(MemoryPage::new());
    let bridge = bridge_on(&page);

    bridge.url_shortening("bitly", "twitter");
    bridge.url_shortening("bitly", "facebook");

    assert_eq!(
        bridge.share_config().to_value(),
        json!({
            "url_transforms": {"shorten": {"twitter": "bitly", "facebook": "bitly"}},
            "shorteners": {"bitly": {}}
        })
    );
}

#[test]
fn bootstrap_adopts_all_share_fields_without_widget() {
    let share = json!({
        "url": "https://page.example",
        "title": "Page",
        "description": "Described",
        "media": "https://page.example/m.png"
    });
    let page = Arc::new(MemoryPage::new().with_global(GlobalSlot::Share, share.clone()));

    let bridge = bridge_on(&page);

    assert!(bridge.bootstrap_report().adopted_share);
    assert_eq!(bridge.share_config().to_value(), share);
}

#[test]
fn bootstrap_strips_share_fields_when_widget_loaded_first() {
    let page = Arc::new(MemoryPage::new().with_global(
        GlobalSlot::Share,
        json!({
            "url": "https://page.example",
            "title": "Page",
            "description": "Described",
            "media": "https://page.example/m.png",
            "ui_email_note": "kept"
        }),
    ));
    page.install_widget(Arc::new(MemoryWidget::new()));

    let bridge = bridge_on(&page);

    assert_eq!(bridge.share_config().to_value(), json!({"ui_email_note": "kept"}));
    assert_eq!(bridge.share_url(), None);
}

#[test]
fn fixture_script_carries_profile_id() {
    let page = Arc::new(MemoryPage::new());
    let bridge = BridgeBuilder::new(page.clone())
        .environment(Environment::Unittest)
        .profile_id(ProfileId::new("abc123").unwrap())
        .enable_auto_add()
        .build();

    assert_eq!(page.scripts().len(), 1);
    assert_eq!(page.scripts()[0].src, "addthis_widget.js#pubid=abc123");
    assert_eq!(bridge.add(), None);
}

#[tokio::test(start_paused = true)]
async fn burst_within_50ms_refreshes_exactly_once() {
    let page = Arc::new(MemoryPage::new());
    let widget = Arc::new(MemoryWidget::new());
    let start = Instant::now();
    widget.set_last_refresh_at(Some(start));
    page.install_widget(Arc::clone(&widget));
    let bridge = bridge_on(&page);

    for i in 0..5 {
        bridge.set_share_title(format!("t{i}"));
        run_for(10).await;
    }
    run_for(2000).await;

    let calls = widget.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].title.as_deref(), Some("t4"));
    let fired = calls[0].at.duration_since(start);
    assert!(fired >= Duration::from_millis(500));
    assert!(fired >= Duration::from_millis(40 + 100));
}

#[tokio::test(start_paused = true)]
async fn loaded_before_widget_fires_each_waiter_once() {
    let page = Arc::new(MemoryPage::new());
    let bridge = bridge_on(&page);
    let fired = Arc::new(AtomicUsize::new(0));

    let mut waiters = Vec::new();
    for _ in 0..2 {
        let loaded = bridge.loaded();
        let fired = Arc::clone(&fired);
        waiters.push(tokio::spawn(async move {
            let widget = loaded.await;
            fired.fetch_add(1, Ordering::SeqCst);
            widget
        }));
    }
    run_for(600).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    page.install_widget(Arc::new(MemoryWidget::new()));
    run_for(400).await;

    assert_eq!(fired.load(Ordering::SeqCst), 2);
    let a = waiters.remove(0).await.unwrap();
    let b = waiters.remove(0).await.unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    run_for(1000).await;
    assert_eq!(fired.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn route_changes_refresh_with_current_share() {
    let page = Arc::new(MemoryPage::new());
    let widget = Arc::new(MemoryWidget::new());
    page.install_widget(Arc::clone(&widget));
    let bridge = bridge_on(&page);

    bridge.set_share_url("https://a.example/1");
    run_for(1000).await;
    bridge.location_changed("/2", "/1");
    bridge.set_share_url("https://a.example/2");
    run_for(1000).await;
    bridge.location_changed("/2", "/2");
    run_for(1000).await;

    let urls: Vec<_> = widget.calls().into_iter().map(|c| c.url).collect();
    assert_eq!(
        urls,
        vec![
            Some("https://a.example/1".to_string()),
            Some("https://a.example/2".to_string())
        ]
    );
}
