use std::time::Duration;

use pizzaops::client::IntegrationClient;
use pizzaops::error::FlowError;
use pizzaops::flows::connections::{ApproveAll, ConnectionManager, DisconnectGate, LoadState};
use pizzaops::session::{NoticeKind, SessionContext};
use serde_json::json;
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, method, path, path_regex},
};

fn session_for(server: &MockServer) -> SessionContext {
    let base = Url::parse(&server.uri()).unwrap();
    let client = IntegrationClient::new(base, None);
    SessionContext::new(client, Duration::from_secs(5))
}

fn adapter_catalog() -> serde_json::Value {
    json!([
        {
            "id": "square",
            "name": "Square POS",
            "requiredCredentials": [
                {"name": "apiKey", "label": "API Key", "type": "password"},
                {"name": "locationId", "label": "Location ID", "type": "text"}
            ]
        },
        {
            "id": "deliveroo",
            "name": "Deliveroo",
            "requiredCredentials": [
                {"name": "token", "label": "Access Token", "type": "password"}
            ]
        }
    ])
}

fn square_connection() -> serde_json::Value {
    json!({
        "id": "conn-1",
        "system": "square",
        "name": "Square POS",
        "status": "active",
        "connectedAt": "2025-06-01T12:00:00Z"
    })
}

async fn mount_catalog(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/adapters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(adapter_catalog()))
        .mount(server)
        .await;
}

async fn mount_connections(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/connections"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

struct Decline;

#[async_trait::async_trait]
impl DisconnectGate for Decline {
    async fn confirm(&self, _connection_id: &str) -> bool {
        false
    }
}

#[tokio::test]
async fn test_load_populates_the_screen() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server).await;
    mount_connections(&mock_server, json!([square_connection()])).await;

    let mut manager = ConnectionManager::new(session_for(&mock_server));
    assert_eq!(manager.state(), LoadState::Loading);

    manager.load().await;

    assert_eq!(manager.state(), LoadState::Ready);
    assert_eq!(manager.adapters().len(), 2);
    assert_eq!(manager.connections().len(), 1);
    assert!(manager.load_error().is_none());
}

#[tokio::test]
async fn test_either_load_failure_collapses_to_the_generic_error() {
    // Connections fetch fails
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/connections"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let mut manager = ConnectionManager::new(session_for(&mock_server));
    manager.load().await;
    assert_eq!(manager.state(), LoadState::Failed);
    assert_eq!(
        manager.load_error().unwrap().to_string(),
        "Failed to load integration data"
    );

    // Adapter fetch fails
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/adapters"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&mock_server)
        .await;
    mount_connections(&mock_server, json!([])).await;

    let mut manager = ConnectionManager::new(session_for(&mock_server));
    manager.load().await;
    assert_eq!(manager.state(), LoadState::Failed);
}

#[tokio::test]
async fn test_selecting_an_adapter_resets_the_credential_form() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server).await;
    mount_connections(&mock_server, json!([])).await;

    let mut manager = ConnectionManager::new(session_for(&mock_server));
    manager.load().await;

    manager.select_adapter(Some("square"));
    let entries: Vec<_> = manager.credentials().entries().collect();
    assert_eq!(entries, vec![("apiKey", ""), ("locationId", "")]);

    manager.set_credential("apiKey", "sq0atp-xyz");
    assert_eq!(manager.credentials().get("apiKey"), Some("sq0atp-xyz"));

    // Re-selecting the same adapter blanks what was entered
    manager.select_adapter(Some("square"));
    assert_eq!(manager.credentials().get("apiKey"), Some(""));

    // Switching adapters swaps in the other descriptor set
    manager.select_adapter(Some("deliveroo"));
    let entries: Vec<_> = manager.credentials().entries().collect();
    assert_eq!(entries, vec![("token", "")]);
}

#[tokio::test]
async fn test_unknown_selection_clears_the_form() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server).await;
    mount_connections(&mock_server, json!([])).await;

    let mut manager = ConnectionManager::new(session_for(&mock_server));
    manager.load().await;

    manager.select_adapter(Some("square"));
    manager.select_adapter(Some("doordash"));

    assert!(manager.selected_adapter().is_none());
    assert!(manager.credentials().is_empty());
}

#[tokio::test]
async fn test_connect_without_a_selection_issues_no_request() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server).await;
    mount_connections(&mock_server, json!([])).await;
    Mock::given(method("POST"))
        .and(path_regex("^/connect/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut manager = ConnectionManager::new(session_for(&mock_server));
    manager.load().await;

    let result = manager.submit_connect().await;
    assert!(matches!(result, Err(FlowError::Validation(_))));
    assert_eq!(
        manager.form_error(),
        Some("Select an adapter before connecting")
    );
}

#[tokio::test]
async fn test_successful_connect_refreshes_the_connection_list() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server).await;

    // First GET /connections serves the initial load, the second the refresh
    Mock::given(method("GET"))
        .and(path("/connections"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_connections(&mock_server, json!([square_connection()])).await;

    Mock::given(method("POST"))
        .and(path("/connect/square"))
        .and(body_json(json!({
            "apiKey": "sq0atp-xyz",
            "locationId": "L123"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(square_connection()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let ctx = session_for(&mock_server);
    let mut manager = ConnectionManager::new(ctx.clone());
    manager.load().await;
    assert!(manager.connections().is_empty());

    manager.select_adapter(Some("square"));
    manager.set_credential("apiKey", "sq0atp-xyz");
    manager.set_credential("locationId", "L123");

    let connection = manager.submit_connect().await.unwrap();
    assert_eq!(connection.id, "conn-1");

    // Form is discarded, list is re-fetched in full
    assert!(manager.selected_adapter().is_none());
    assert!(manager.credentials().is_empty());
    assert_eq!(manager.connections().len(), 1);
    assert_eq!(manager.state(), LoadState::Ready);

    let notice = ctx.notices.current().unwrap();
    assert_eq!(notice.kind, NoticeKind::Success);
    assert_eq!(notice.text, "Connected to Square POS");

    let refreshes = mock_server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.method == "GET" && request.url.path() == "/connections")
        .count();
    assert_eq!(refreshes, 2);
}

#[tokio::test]
async fn test_failed_connect_preserves_the_form() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server).await;
    mount_connections(&mock_server, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/connect/square"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"message": "Invalid location id"})),
        )
        .mount(&mock_server)
        .await;

    let ctx = session_for(&mock_server);
    let mut manager = ConnectionManager::new(ctx.clone());
    manager.load().await;
    manager.select_adapter(Some("square"));
    manager.set_credential("apiKey", "sq0atp-xyz");
    manager.set_credential("locationId", "bad");

    let result = manager.submit_connect().await;
    assert!(matches!(result, Err(FlowError::Transport(_))));

    // Everything the user entered survives for correction
    assert_eq!(manager.selected_adapter().unwrap().id, "square");
    assert_eq!(manager.credentials().get("apiKey"), Some("sq0atp-xyz"));
    assert_eq!(manager.form_error(), Some("Invalid location id"));

    let notice = ctx.notices.current().unwrap();
    assert_eq!(notice.kind, NoticeKind::Error);
    assert_eq!(notice.text, "Invalid location id");

    // No refresh happened: just the initial load
    let list_calls = mock_server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.url.path() == "/connections")
        .count();
    assert_eq!(list_calls, 1);
}

#[tokio::test]
async fn test_declined_disconnect_is_a_silent_no_op() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server).await;
    mount_connections(&mock_server, json!([square_connection()])).await;
    Mock::given(method("POST"))
        .and(path_regex("^/disconnect/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let ctx = session_for(&mock_server);
    let mut manager = ConnectionManager::new(ctx.clone());
    manager.load().await;

    manager.disconnect("conn-1", &Decline).await.unwrap();

    assert_eq!(manager.connections().len(), 1);
    assert!(ctx.notices.current().is_none());
}

#[tokio::test]
async fn test_confirmed_disconnect_refreshes_and_notifies() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/connections"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([square_connection()])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_connections(&mock_server, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/disconnect/conn-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let ctx = session_for(&mock_server);
    let mut manager = ConnectionManager::new(ctx.clone());
    manager.load().await;

    manager.disconnect("conn-1", &ApproveAll).await.unwrap();

    assert!(manager.connections().is_empty());
    let notice = ctx.notices.current().unwrap();
    assert_eq!(notice.kind, NoticeKind::Success);
    assert_eq!(notice.text, "Disconnected Square POS");
}

#[tokio::test]
async fn test_refresh_failure_after_connect_still_posts_the_success_notice() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/connections"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/connections"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/connect/square"))
        .respond_with(ResponseTemplate::new(200).set_body_json(square_connection()))
        .mount(&mock_server)
        .await;

    let ctx = session_for(&mock_server);
    let mut manager = ConnectionManager::new(ctx.clone());
    manager.load().await;
    manager.select_adapter(Some("square"));

    // The connect itself succeeded, so the caller still gets the connection
    let connection = manager.submit_connect().await.unwrap();
    assert_eq!(connection.id, "conn-1");
    assert_eq!(ctx.notices.current().unwrap().kind, NoticeKind::Success);

    // Only the list region degrades
    assert_eq!(manager.state(), LoadState::Failed);
}
