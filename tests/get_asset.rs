mod common;

use common::asset_json;
use ion_tiling::{AssetId, AssetStatus, IonClient, IonError};
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

#[tokio::test]
async fn test_get_asset_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/assets/101"))
        .and(header("authorization", "Bearer test_access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(asset_json(101, "IN_PROGRESS", 42)))
        .mount(&server)
        .await;

    let client = IonClient::new_with_url("test_access_token", &server.uri()).unwrap();
    let asset = client.get_asset(&AssetId::new("101")).await.unwrap();

    assert_eq!(asset.id.as_str(), "101");
    assert_eq!(asset.name, "asset 101");
    assert_eq!(asset.status, AssetStatus::InProgress);
    assert_eq!(asset.percent_complete, 42.0);
    assert!(asset.date_added.is_some());
}

#[tokio::test]
async fn test_get_asset_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/assets/999"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let client = IonClient::new_with_url("test_access_token", &server.uri()).unwrap();
    let err = client.get_asset(&AssetId::new("999")).await.unwrap_err();

    assert!(matches!(err, IonError::ApiError { status: 404, .. }));
}
