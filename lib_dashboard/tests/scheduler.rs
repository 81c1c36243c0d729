//! Scheduler timing under a paused tokio clock.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::FakeApi;
use lib_dashboard::dashboard::query::QueryBuilder;
use lib_dashboard::dashboard::render::RecordingRenderer;
use lib_dashboard::{DashboardController, FilterControls, Scheduler, WidgetId};
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn test_poll_and_clock_cadence() {
    let api = Arc::new(FakeApi::healthy());
    let renderer = Arc::new(Mutex::new(RecordingRenderer::default()));
    let (controller, handle) = DashboardController::new(
        Arc::clone(&api),
        QueryBuilder::new("tok-1"),
        FilterControls::default(),
        Arc::clone(&renderer),
    );

    let cancel = CancellationToken::new();
    let controller_task = tokio::spawn(controller.run(cancel.clone()));
    let tasks = Scheduler::new(Duration::from_secs(8), Duration::from_secs(1)).start_timers(handle, cancel.clone());
    assert_eq!(tasks.len(), 2);

    // Ticks at 0s and 8s for polls, every second for the clock.
    tokio::time::sleep(Duration::from_millis(8_500)).await;
    assert_eq!(api.gets(), 2 * 13);
    assert_eq!(renderer.lock().unwrap().count(WidgetId::Clock), 9);
    assert_eq!(renderer.lock().unwrap().count(WidgetId::Stats), 2);

    tasks.shutdown().await;
    let dashboard = controller_task.await.unwrap();
    assert!(dashboard.state().snapshot().is_some());

    // Nothing fires after cancellation.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(api.gets(), 2 * 13);
}

#[tokio::test(start_paused = true)]
async fn test_failing_poll_does_not_stall_clock() {
    let api = Arc::new(FakeApi::healthy());
    api.fail("api/stats");
    let renderer = Arc::new(Mutex::new(RecordingRenderer::default()));
    let (controller, handle) = DashboardController::new(
        Arc::clone(&api),
        QueryBuilder::new("tok-1"),
        FilterControls::default(),
        Arc::clone(&renderer),
    );

    let cancel = CancellationToken::new();
    let controller_task = tokio::spawn(controller.run(cancel.clone()));
    let tasks = Scheduler::new(Duration::from_secs(8), Duration::from_secs(1)).start_timers(handle, cancel.clone());

    tokio::time::sleep(Duration::from_millis(16_500)).await;
    tasks.shutdown().await;
    let dashboard = controller_task.await.unwrap();

    assert_eq!(dashboard.state().consecutive_failures(), 3);
    assert!(dashboard.state().snapshot().is_none());
    assert_eq!(renderer.lock().unwrap().count(WidgetId::Clock), 17);
    assert_eq!(renderer.lock().unwrap().count(WidgetId::Stats), 0);
}

#[tokio::test(start_paused = true)]
async fn test_live_task_is_cancelled_with_the_rest() {
    let api = Arc::new(FakeApi::healthy());
    let (controller, handle) = DashboardController::new(
        Arc::clone(&api),
        QueryBuilder::new("tok-1"),
        FilterControls::default(),
        RecordingRenderer::default(),
    );
    let cancel = CancellationToken::new();
    let controller_task = tokio::spawn(controller.run(cancel.clone()));

    let live = std::future::pending::<()>();
    let tasks = Scheduler::default().start(handle, cancel.clone(), Some(live));
    assert_eq!(tasks.len(), 3);

    tokio::time::sleep(Duration::from_secs(1)).await;
    tasks.shutdown().await;
    assert!(cancel.is_cancelled());
    controller_task.await.unwrap();
}
