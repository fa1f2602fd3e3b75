use std::time::Duration;

use kindling::headless::ScrollTarget;
use kindling::{
    ClickEvent, Document, HeadlessWindow, PrefetchMode, Router, RouterError, RouterEvent,
    RouterOptions, RouterState, ScrollBehavior, Window,
};
use serde_json::json;
use tokio::sync::broadcast;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

// ============================================================================
// Helper Functions
// ============================================================================

const HOME: &str = r#"<!DOCTYPE html>
<html><head><title>Home</title><meta name="shared" content="1"></head>
<body><h1>Home</h1><a id="to-next" href="/next">Next</a></body></html>"#;

const NEXT: &str = r#"<!DOCTYPE html>
<html><head><title>Next</title><meta name="shared" content="1">
<script data-reload src="/analytics.js"></script></head>
<body><h1 id="top">Next</h1><p id="setup">Setup</p>
<script>window.ready = true</script></body></html>"#;

/// Router over HOME, sitting at the root of `server`
fn router_at(server: &MockServer, options: RouterOptions) -> Router<HeadlessWindow> {
    let window = HeadlessWindow::new(&format!("{}/", server.uri()));
    Router::new(Document::parse(HOME), window, options)
}

async fn serve(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Collects every event emitted so far
fn drain(rx: &mut broadcast::Receiver<RouterEvent>) -> Vec<RouterEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn title(router: &Router<HeadlessWindow>) -> String {
    router.with_page(|page| page.document.title().unwrap_or_default())
}

// ============================================================================
// Successful Navigation
// ============================================================================

#[tokio::test]
async fn test_navigation_merges_document_and_runs_scripts() {
    let mock_server = MockServer::start().await;
    serve(&mock_server, "/next", NEXT).await;

    let router = router_at(&mock_server, RouterOptions::default());
    let mut rx = router.subscribe();

    let done = router.go("/next#setup").await.unwrap();

    assert!(done);
    assert_eq!(title(&router), "Next");
    assert_eq!(router.state(), RouterState::Idle);

    router.with_page(|page| {
        let h1 = page.document.get_element_by_id("top").unwrap();
        assert_eq!(page.document.text_content(h1), "Next");

        let executed: Vec<Option<&str>> =
            page.window.executed().iter().map(|s| s.src()).collect();
        assert_eq!(executed, vec![Some("/analytics.js"), None]);

        assert_eq!(page.window.history_len(), 2);
        assert!(page.window.location().ends_with("/next#setup"));
        assert_eq!(
            page.window.last_scroll(),
            Some(&ScrollTarget::Element {
                id: Some("setup".to_string()),
                behavior: ScrollBehavior::Smooth
            })
        );
    });

    let events = drain(&mut rx);
    assert!(matches!(events.first(), Some(RouterEvent::FetchStart)));
    assert!(matches!(events.last(), Some(RouterEvent::End)));
}

#[tokio::test]
async fn test_link_click_fetches_and_merges() {
    let mock_server = MockServer::start().await;
    serve(&mock_server, "/next", NEXT).await;

    let router = router_at(&mock_server, RouterOptions::default());
    let mut rx = router.subscribe();

    let anchor = router.with_page(|page| page.document.get_element_by_id("to-next").unwrap());
    let mut click = ClickEvent::new(anchor);
    let navigation = router.on_click(&mut click);

    // Classification happens before the future is polled
    assert!(click.default_prevented());
    assert!(navigation.await);

    assert_eq!(title(&router), "Next");
    router.with_page(|page| {
        assert_eq!(page.window.history_len(), 2);
        assert_eq!(page.window.location(), format!("{}/next", mock_server.uri()));
        assert_eq!(page.window.executed().len(), 2);
    });
    assert!(matches!(drain(&mut rx).last(), Some(RouterEvent::End)));
}

#[tokio::test]
async fn test_navigation_without_anchor_scrolls_to_top() {
    let mock_server = MockServer::start().await;
    serve(&mock_server, "/next", NEXT).await;

    let router = router_at(&mock_server, RouterOptions::default());
    router.with_page(|page| page.window.scroll_to(300.0));

    assert!(router.go("/next").await.unwrap());

    let scroll = router.with_page(|page| page.window.scroll_y());
    assert_eq!(scroll, 0.0);
}

#[tokio::test]
async fn test_unchanged_head_nodes_are_kept() {
    let mock_server = MockServer::start().await;
    serve(&mock_server, "/next", NEXT).await;

    let router = router_at(&mock_server, RouterOptions::default());
    let shared_before = router.with_page(|page| {
        let head = page.document.head().unwrap();
        page.document
            .element_children(head)
            .into_iter()
            .find(|n| page.document.attr(*n, "name") == Some("shared"))
    });

    assert!(router.go("/next").await.unwrap());

    router.with_page(|page| {
        let node = shared_before.unwrap();
        assert!(page.document.is_connected(node));
        let head = page.document.head().unwrap();
        let names: Vec<&str> = page
            .document
            .element_children(head)
            .into_iter()
            .filter_map(|n| page.document.tag_name(n))
            .collect();
        assert_eq!(names, vec!["meta", "title", "script"]);
    });
}

#[tokio::test]
async fn test_navigation_request_carries_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/next"))
        .and(header("X-Kindling", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(NEXT))
        .expect(1)
        .mount(&mock_server)
        .await;

    let router = router_at(&mock_server, RouterOptions::default());
    assert!(router.go("/next").await.unwrap());
}

#[tokio::test]
async fn test_progress_reports_every_byte() {
    let mock_server = MockServer::start().await;
    serve(&mock_server, "/next", NEXT).await;

    let router = router_at(&mock_server, RouterOptions::default());
    let mut rx = router.subscribe();

    assert!(router.go("/next").await.unwrap());

    let progress: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter_map(|event| match event {
            RouterEvent::FetchProgress(p) => Some(p),
            _ => None,
        })
        .collect();

    assert!(!progress.is_empty());
    let last = progress.last().unwrap();
    assert_eq!(last.received, NEXT.len() as u64);
    assert!(progress.windows(2).all(|w| w[0].received <= w[1].received));
}

#[tokio::test]
async fn test_preserved_element_survives_navigation() {
    let mock_server = MockServer::start().await;
    serve(
        &mock_server,
        "/next",
        r#"<html><head><title>Next</title></head><body>
        <div id="player" kindling-preserve>fresh</div><p>new</p></body></html>"#,
    )
    .await;

    let window = HeadlessWindow::new(&format!("{}/", mock_server.uri()));
    let live = Document::parse(
        r#"<html><head><title>Home</title></head><body>
        <div id="player" kindling-preserve>still playing</div></body></html>"#,
    );
    let router = Router::new(live, window, RouterOptions::default());

    assert!(router.go("/next").await.unwrap());

    router.with_page(|page| {
        let player = page.document.get_element_by_id("player").unwrap();
        assert_eq!(page.document.text_content(player), "still playing");
        assert_eq!(page.document.title().as_deref(), Some("Next"));
    });
}

#[tokio::test]
async fn test_view_transition_wraps_body_swap() {
    let mock_server = MockServer::start().await;
    serve(&mock_server, "/next", NEXT).await;

    let window = HeadlessWindow::new(&format!("{}/", mock_server.uri())).with_view_transitions();
    let options = RouterOptions {
        page_transitions: true,
        ..RouterOptions::default()
    };
    let router = Router::new(Document::parse(HOME), window, options);

    assert!(router.go("/next").await.unwrap());
    assert_eq!(router.with_page(|page| page.window.transitions_run()), 1);
}

// ============================================================================
// Rejected Navigation
// ============================================================================

#[tokio::test]
async fn test_same_url_never_fetches() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(HOME))
        .expect(0)
        .mount(&mock_server)
        .await;

    let router = router_at(&mock_server, RouterOptions::default());
    assert!(!router.go("/").await.unwrap());
}

#[tokio::test]
async fn test_disabled_router_never_fetches() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(NEXT))
        .expect(0)
        .mount(&mock_server)
        .await;

    let window = HeadlessWindow::new(&format!("{}/", mock_server.uri())).without_history();
    let router = Router::new(Document::parse(HOME), window, RouterOptions::default());

    assert!(!router.is_enabled());
    assert!(!router.go("/next").await.unwrap());
    assert_eq!(title(&router), "Home");
}

// ============================================================================
// Failure Handling
// ============================================================================

#[tokio::test]
async fn test_network_failure_emits_one_error() {
    let window = HeadlessWindow::new("http://127.0.0.1:1/");
    let router = Router::new(Document::parse(HOME), window, RouterOptions::default());
    let mut rx = router.subscribe();

    let done = router.go("/next").await.unwrap();

    assert!(!done);
    assert_eq!(title(&router), "Home");
    assert_eq!(router.state(), RouterState::Idle);

    let events = drain(&mut rx);
    let errors: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, RouterEvent::Error(_)))
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], RouterEvent::Error(RouterError::Network(_))));
    assert!(!events.iter().any(|e| matches!(e, RouterEvent::End)));
}

#[tokio::test]
async fn test_http_error_status_leaves_page_alone() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("<h1>Not found</h1>"))
        .mount(&mock_server)
        .await;

    let router = router_at(&mock_server, RouterOptions::default());
    let mut rx = router.subscribe();

    assert!(!router.go("/missing").await.unwrap());
    assert_eq!(title(&router), "Home");

    let events = drain(&mut rx);
    assert!(matches!(
        events.last(),
        Some(RouterEvent::Error(RouterError::Status { status: 404, .. }))
    ));
}

#[tokio::test]
async fn test_no_content_response_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let router = router_at(&mock_server, RouterOptions::default());
    let mut rx = router.subscribe();

    assert!(!router.go("/empty").await.unwrap());

    let events = drain(&mut rx);
    assert!(matches!(
        events.last(),
        Some(RouterEvent::Error(RouterError::EmptyBody { status: 204 }))
    ));
}

#[tokio::test]
async fn test_not_modified_is_a_status_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cached"))
        .respond_with(ResponseTemplate::new(304))
        .mount(&mock_server)
        .await;

    let router = router_at(&mock_server, RouterOptions::default());
    let mut rx = router.subscribe();

    assert!(!router.go("/cached").await.unwrap());
    assert_eq!(title(&router), "Home");

    let events = drain(&mut rx);
    assert!(matches!(
        events.last(),
        Some(RouterEvent::Error(RouterError::Status { status: 304, .. }))
    ));
}

// ============================================================================
// History & Concurrency
// ============================================================================

#[tokio::test]
async fn test_back_restores_document_and_scroll() {
    let mock_server = MockServer::start().await;
    serve(&mock_server, "/", HOME).await;
    serve(&mock_server, "/next", NEXT).await;

    let router = router_at(&mock_server, RouterOptions::default());
    router.with_page(|page| page.window.scroll_to(420.0));

    assert!(router.go("/next").await.unwrap());
    assert_eq!(title(&router), "Next");

    assert!(router.back().await);
    assert_eq!(title(&router), "Home");
    router.with_page(|page| {
        assert_eq!(page.window.scroll_y(), 420.0);
        assert_eq!(page.window.history_index(), 0);
        assert_eq!(page.window.history_len(), 2);
    });

    assert!(router.forward().await);
    assert_eq!(title(&router), "Next");
}

#[tokio::test]
async fn test_back_without_recorded_scroll_goes_to_top() {
    let mock_server = MockServer::start().await;
    serve(&mock_server, "/", HOME).await;

    // The first entry was never written by the router, the second by someone else
    let mut window = HeadlessWindow::new(&format!("{}/", mock_server.uri()));
    window.push_state(json!({ "app": "state" }), &format!("{}/next", mock_server.uri()));
    window.scroll_to(250.0);
    let router = Router::new(Document::parse(NEXT), window, RouterOptions::default());

    assert!(router.back().await);

    assert_eq!(title(&router), "Home");
    router.with_page(|page| {
        assert_eq!(page.window.history_index(), 0);
        assert_eq!(page.window.history_state(), None);
        assert_eq!(page.window.scroll_y(), 0.0);
        assert_eq!(page.window.last_scroll(), Some(&ScrollTarget::Offset(0.0)));
    });
}

#[tokio::test]
async fn test_superseded_navigation_is_discarded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><head><title>Slow</title></head><body></body></html>")
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&mock_server)
        .await;
    serve(
        &mock_server,
        "/fast",
        "<html><head><title>Fast</title></head><body></body></html>",
    )
    .await;

    let router = router_at(&mock_server, RouterOptions::default());
    let (slow, fast) = tokio::join!(router.go("/slow"), router.go("/fast"));

    assert!(!slow.unwrap());
    assert!(fast.unwrap());
    assert_eq!(title(&router), "Fast");
    assert_eq!(router.state(), RouterState::Idle);
}

// ============================================================================
// Prefetch
// ============================================================================

#[tokio::test]
async fn test_prefetch_runs_again_after_navigation() {
    let mock_server = MockServer::start().await;
    serve(
        &mock_server,
        "/next",
        r#"<html><head><title>Next</title></head><body>
        <a href="/pricing">Pricing</a></body></html>"#,
    )
    .await;

    let options = RouterOptions {
        prefetch: PrefetchMode::Visible,
        prefetch_delay: Duration::from_millis(10),
        ..RouterOptions::default()
    };
    let router = router_at(&mock_server, options);
    let next_url = format!("{}/next", mock_server.uri());
    let pricing_url = format!("{}/pricing", mock_server.uri());

    assert!(router.with_page(|page| page.prefetcher().is_prefetched(&next_url)));

    assert!(router.go("/next").await.unwrap());
    tokio::time::sleep(Duration::from_millis(100)).await;

    router.with_page(|page| {
        assert!(page.prefetcher().is_prefetched(&pricing_url));
        let head = page.document.head().unwrap();
        let hinted = page
            .document
            .element_children(head)
            .into_iter()
            .any(|n| page.document.attr(n, "href") == Some(pricing_url.as_str()));
        assert!(hinted);
    });
}
