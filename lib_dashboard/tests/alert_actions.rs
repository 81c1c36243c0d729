//! Acknowledge/annotate round trips: a successful call schedules exactly one
//! resync, a failed call schedules none.

mod common;

use std::sync::Arc;

use common::FakeApi;
use lib_dashboard::core::AlertActionCoordinator;
use lib_dashboard::dashboard::query::QueryBuilder;
use lib_dashboard::dashboard::render::RecordingRenderer;
use lib_dashboard::{DashboardController, FilterControls};

fn setup(api: &Arc<FakeApi>) -> (DashboardController<FakeApi, RecordingRenderer>, AlertActionCoordinator<Arc<FakeApi>>) {
    let query = QueryBuilder::new("tok-1");
    let (controller, handle) = DashboardController::new(
        Arc::clone(api),
        query.clone(),
        FilterControls::default(),
        RecordingRenderer::default(),
    );
    let actions = AlertActionCoordinator::new(Arc::clone(api), query, handle);
    (controller, actions)
}

#[tokio::test]
async fn test_acknowledge_triggers_one_resync() {
    let api = Arc::new(FakeApi::healthy());
    let (mut controller, actions) = setup(&api);

    actions.acknowledge(7).await.unwrap();

    let post = api.calls().into_iter().find(|c| c.method == "POST").unwrap();
    assert_eq!(post.path, "api/alerts/7/ack");
    assert_eq!(post.params.keys(), vec!["token"]);
    assert_eq!(post.params.get("token"), Some("tok-1"));
    assert!(post.body.is_none());

    // Exactly one command was queued, and it was a resync.
    assert_eq!(controller.drain(), 1);
    assert!(controller.step().await);
    assert_eq!(api.gets(), 13);
    assert!(controller.dashboard().state().snapshot().is_some());
}

#[tokio::test]
async fn test_failed_acknowledge_triggers_nothing() {
    let api = Arc::new(FakeApi::healthy());
    api.fail("api/alerts/7/ack");
    let (mut controller, actions) = setup(&api);

    let err = actions.acknowledge(7).await.unwrap_err();

    assert!(err.is_transport());
    assert_eq!(controller.drain(), 0);
    assert_eq!(api.gets(), 0);
    assert!(controller.dashboard().state().snapshot().is_none());
}

#[tokio::test]
async fn test_note_posts_json_body() {
    let api = Arc::new(FakeApi::healthy());
    let (mut controller, actions) = setup(&api);

    actions.add_note(6, "benign scanner, ticket #42").await.unwrap();

    assert_eq!(api.count("POST", "api/alerts/6/note"), 1);
    let post = api.calls().into_iter().find(|c| c.method == "POST").unwrap();
    assert_eq!(post.body, Some(serde_json::json!({"note": "benign scanner, ticket #42"})));
    assert_eq!(controller.drain(), 1);
}

#[tokio::test]
async fn test_acknowledge_through_controller_queue() {
    let api = Arc::new(FakeApi::healthy());
    let (mut controller, _) = setup(&api);
    let handle = controller.handle();

    handle.acknowledge(7);
    assert!(controller.step().await); // spawns the POST
    assert!(controller.step().await); // resync queued by the action
    assert!(controller.step().await); // poll outcome

    assert_eq!(api.count("POST", "api/alerts/7/ack"), 1);
    assert_eq!(api.gets(), 13);
    assert!(controller.dashboard().state().snapshot().is_some());
}
