//! REST device API against the mock endpoints

use integration_tests::*;
use kindred_core::{DeviceRegistrationApi, DomainError};
use kindred_realtime::api::RestDeviceApi;

#[tokio::test]
async fn test_register_list_unregister() {
    let gateway = MockGateway::start().await.unwrap();
    let api = RestDeviceApi::new(&test_config(&gateway).api, signed_in()).unwrap();
    let registration = registration();

    api.register(&registration).await.unwrap();
    let devices = api.list_devices().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].device_id, registration.device_id);

    api.unregister(&registration.device_id, &registration.push_token)
        .await
        .unwrap();
    assert!(api.list_devices().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let gateway = MockGateway::start().await.unwrap();
    let api = RestDeviceApi::new(&test_config(&gateway).api, signed_in()).unwrap();

    gateway.fail_next_registrations(2, 503);
    api.register(&registration()).await.unwrap();
    assert_eq!(gateway.register_calls(), 3);
    assert_eq!(gateway.devices().len(), 1);
}

#[tokio::test]
async fn test_retries_give_up_after_max_attempts() {
    let gateway = MockGateway::start().await.unwrap();
    let api = RestDeviceApi::new(&test_config(&gateway).api, signed_in()).unwrap();

    gateway.fail_next_registrations(5, 500);
    let result = api.register(&registration()).await;
    assert!(matches!(result, Err(DomainError::Remote { status: 500, .. })));
    assert_eq!(gateway.register_calls(), 3);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let gateway = MockGateway::start().await.unwrap();
    let api = RestDeviceApi::new(&test_config(&gateway).api, signed_in()).unwrap();

    gateway.fail_next_registrations(1, 400);
    let result = api.register(&registration()).await;
    assert!(matches!(result, Err(DomainError::Remote { status: 400, .. })));
    assert_eq!(gateway.register_calls(), 1);
}

#[tokio::test]
async fn test_bad_credential_is_unauthorized() {
    let gateway = MockGateway::start().await.unwrap();
    let api = RestDeviceApi::new(&test_config(&gateway).api, with_token("expired")).unwrap();

    let result = api.register(&registration()).await;
    assert!(matches!(result, Err(DomainError::Unauthorized)));
    assert_eq!(gateway.register_calls(), 0);
}
