//! Notification delivery through a fully wired session

use std::sync::Arc;
use std::time::Duration;

use integration_tests::*;
use kindred_realtime::notify::StaticPushProvider;
use kindred_realtime::RealtimeSession;

async fn session_for(
    gateway: &MockGateway,
    presenter: Arc<CollectingPresenter>,
) -> RealtimeSession {
    RealtimeSession::builder(test_config(gateway))
        .auth(signed_in())
        .push_provider(Arc::new(StaticPushProvider::new(
            Some(format!("push-{}", unique_suffix())),
            "android",
        )))
        .presenter(presenter)
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_registered_device_notified_once_per_event() {
    let gateway = MockGateway::start().await.unwrap();
    let presenter = Arc::new(CollectingPresenter::default());
    let session = session_for(&gateway, presenter.clone()).await;

    session.register_device().await.unwrap();
    assert!(session.is_device_registered());
    assert_eq!(gateway.devices().len(), 1);

    session.connect().await.unwrap();
    gateway.push_event("new_message", new_message("u2", "m1"));
    gateway.push_event("new_message", new_message("u2", "m1"));
    gateway.push_event("new_match", new_match("mt1", "u3"));

    assert!(wait_until(|| presenter.count() == 2).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(presenter.count(), 2);

    let titles: Vec<_> = session
        .gate()
        .history()
        .into_iter()
        .map(|n| n.title)
        .collect();
    assert_eq!(titles, ["User u2", "It's a Match!"]);
}

#[tokio::test]
async fn test_no_notifications_without_registration() {
    let gateway = MockGateway::start().await.unwrap();
    let presenter = Arc::new(CollectingPresenter::default());
    let session = session_for(&gateway, presenter.clone()).await;

    session.connect().await.unwrap();
    gateway.push_event("new_message", new_message("u2", "m1"));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(presenter.count(), 0);
}

#[tokio::test]
async fn test_unregister_removes_device_and_stops_notifications() {
    let gateway = MockGateway::start().await.unwrap();
    let presenter = Arc::new(CollectingPresenter::default());
    let session = session_for(&gateway, presenter.clone()).await;

    session.register_device().await.unwrap();
    session.connect().await.unwrap();
    session.unregister_device().await.unwrap();
    assert!(gateway.devices().is_empty());
    assert!(!session.is_device_registered());

    gateway.push_event("new_message", new_message("u2", "m2"));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(presenter.count(), 0);
}

#[tokio::test]
async fn test_own_message_not_notified() {
    let gateway = MockGateway::start().await.unwrap();
    let presenter = Arc::new(CollectingPresenter::default());
    let session = session_for(&gateway, presenter.clone()).await;

    session.register_device().await.unwrap();
    session.connect().await.unwrap();
    gateway.push_event("new_message", new_message(TEST_USER, "m3"));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(presenter.count(), 0);
}
