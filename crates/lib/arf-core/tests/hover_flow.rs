use std::path::PathBuf;

use arf_core::dataset::load_dataset;
use arf_core::oracle::HttpDescriptionSource;
use arf_core::tooltip::{FALLBACK_PREFIX, PENDING_TEXT};
use arf_core::{HoverOutcome, TooltipRegistry, TooltipStatus, TreeView};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join("arf.json")
}

async fn load_view() -> TreeView {
    let root = load_dataset(fixture_path())
        .await
        .unwrap_or_else(|err| panic!("failed to load fixture: {err}"));
    let mut view = TreeView::new(root);
    view.render();
    view
}

#[tokio::test]
async fn hover_fetches_each_tool_once_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/generate-description"))
        .and(query_param("tool", "Sherlock"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"response": "Follows a handle everywhere."})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut view = load_view().await;
    let (sherlock, _) = view.reveal("Sherlock").expect("reveal Sherlock");
    let target = view.hover_target(sherlock).expect("Sherlock is displayed");

    let source = HttpDescriptionSource::new(&server.uri()).expect("source");
    let registry = TooltipRegistry::new(source);

    assert_eq!(registry.hover(&target), HoverOutcome::Started);
    assert_eq!(registry.text_for(&target), PENDING_TEXT);
    assert_eq!(
        registry.hover(&target),
        HoverOutcome::AlreadyRequested(TooltipStatus::Pending)
    );
    registry.settle_all().await;

    assert_eq!(registry.status(sherlock), Some(TooltipStatus::Loaded));
    assert_eq!(registry.text_for(&target), "Follows a handle everywhere.");
    assert!(matches!(
        registry.hover(&target),
        HoverOutcome::AlreadyRequested(TooltipStatus::Loaded)
    ));
}

#[tokio::test]
async fn linked_tools_never_reach_the_oracle() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"response": "x"})))
        .expect(0)
        .mount(&server)
        .await;

    let mut view = load_view().await;
    let (namechk, _) = view.reveal("Namechk").expect("reveal Namechk");
    let target = view.hover_target(namechk).expect("Namechk is displayed");

    let registry = TooltipRegistry::new(HttpDescriptionSource::new(&server.uri()).expect("source"));
    assert_eq!(registry.hover(&target), HoverOutcome::Link);
    registry.settle_all().await;
}

#[tokio::test]
async fn oracle_outage_falls_back_to_static_description() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/generate-description"))
        .respond_with(ResponseTemplate::new(500).set_body_string("The digital ether has returned an error."))
        .expect(1)
        .mount(&server)
        .await;

    let mut view = load_view().await;
    let (hunter, _) = view.reveal("Hunter").expect("reveal Hunter");
    let target = view.hover_target(hunter).expect("Hunter is displayed");

    let registry = TooltipRegistry::new(HttpDescriptionSource::new(&server.uri()).expect("source"));
    registry.hover(&target);
    registry.settle(hunter).await;
    registry.hover(&target);
    registry.settle_all().await;

    assert_eq!(registry.status(hunter), Some(TooltipStatus::Failed));
    assert_eq!(
        registry.text_for(&target),
        format!("{FALLBACK_PREFIX}Finds the addresses behind a domain.")
    );
}

#[tokio::test]
async fn unreachable_oracle_is_a_network_failure() {
    let mut view = load_view().await;
    let (maltego, _) = view.reveal("Maltego").expect("reveal Maltego");
    let target = view.hover_target(maltego).expect("Maltego is displayed");

    // Nothing listens on port 9 of localhost.
    let registry = TooltipRegistry::new(
        HttpDescriptionSource::new("http://127.0.0.1:9").expect("source"),
    );
    registry.hover(&target);
    registry.settle(maltego).await;

    assert_eq!(registry.status(maltego), Some(TooltipStatus::Failed));
    assert_eq!(registry.text_for(&target), FALLBACK_PREFIX);
}
