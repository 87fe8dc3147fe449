//! HTTP behavior of both upstream clients and the orchestrator, against a
//! mock server.

use std::time::Duration;

use forecast_core::{
    Config, Credential, EnvironmentCanadaClient, Location, MinutelySource, OneCallClient,
    Orchestrator, PrecipKind, PrecipitationOutcome, PrecipitationState, RefreshError,
    StationSource, fetch_precipitation, parse_station_document,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

const STATION_XML: &str = include_str!("fixtures/s0000458_e.xml");

fn toronto() -> Location {
    Location::find("Toronto").expect("known location")
}

fn minutely_json(amounts: &[f64]) -> serde_json::Value {
    let minutes: Vec<_> = amounts
        .iter()
        .enumerate()
        .map(|(i, p)| serde_json::json!({ "dt": 1_705_244_400 + i * 60, "precipitation": p }))
        .collect();
    serde_json::json!({
        "lat": 43.6532,
        "lon": -79.3832,
        "timezone": "America/Toronto",
        "timezone_offset": -18000,
        "minutely": minutes,
    })
}

fn station_client(server: &MockServer) -> EnvironmentCanadaClient {
    EnvironmentCanadaClient::new(server.uri(), Duration::from_secs(5)).expect("client builds")
}

fn onecall_client(server: &MockServer) -> OneCallClient {
    OneCallClient::new(format!("{}/onecall", server.uri()), Duration::from_secs(5))
        .expect("client builds")
}

fn config_for(server: &MockServer) -> Config {
    Config {
        station_base_url: server.uri(),
        onecall_url: format!("{}/onecall", server.uri()),
        timeout_secs: 5,
        ..Default::default()
    }
}

async fn mount_station(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/ON/s0000458_e.xml"))
        .respond_with(response)
        .mount(server)
        .await;
}

// ============================================================================
// Station feed
// ============================================================================

#[tokio::test]
async fn station_document_is_fetched_by_province_and_code() {
    let server = MockServer::start().await;
    mount_station(&server, ResponseTemplate::new(200).set_body_string(STATION_XML)).await;

    let doc = station_client(&server)
        .fetch_document(&toronto())
        .await
        .expect("document fetched");
    let bundle = parse_station_document(&doc).expect("fixture parses");

    assert_eq!(bundle.current.condition, "Light Snow");
    assert_eq!(bundle.daily.len(), 3);
}

#[tokio::test]
async fn station_error_status_is_reported_with_body() {
    let server = MockServer::start().await;
    mount_station(&server, ResponseTemplate::new(404).set_body_string("Not Found")).await;

    let err = station_client(&server)
        .fetch_document(&toronto())
        .await
        .unwrap_err();

    match err {
        RefreshError::Status { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "Not Found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn latin1_station_document_keeps_accented_text() {
    let server = MockServer::start().await;
    let mut body = br#"<?xml version="1.0" encoding="ISO-8859-1"?>
<siteData>
  <currentConditions>
    <station>Qu"#
        .to_vec();
    body.extend_from_slice(b"\xE9bec</station>\n    <condition>Brouillard givrant \xE0 l'est</condition>\n");
    body.extend_from_slice(b"  </currentConditions>\n</siteData>");
    mount_station(&server, ResponseTemplate::new(200).set_body_raw(body, "application/xml")).await;

    let doc = station_client(&server)
        .fetch_document(&toronto())
        .await
        .expect("document fetched");
    let bundle = parse_station_document(&doc).expect("document parses");

    assert_eq!(bundle.current.station.as_deref(), Some("Qu\u{e9}bec"));
    assert_eq!(bundle.current.condition, "Brouillard givrant \u{e0} l'est");
}

// ============================================================================
// Minute precipitation
// ============================================================================

#[tokio::test]
async fn minutely_request_carries_coordinates_and_key() {
    let server = MockServer::start().await;
    let mut amounts = vec![0.0, 0.0, 0.0, 3.0, 5.0, 0.0];
    amounts.resize(60, 0.0);

    Mock::given(method("GET"))
        .and(path("/onecall"))
        .and(query_param("lat", "43.6532"))
        .and(query_param("lon", "-79.3832"))
        .and(query_param("exclude", "current,hourly,daily,alerts"))
        .and(query_param("appid", "KEY"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(minutely_json(&amounts)))
        .expect(1)
        .mount(&server)
        .await;

    let loc = toronto();
    let summary = fetch_precipitation(
        &onecall_client(&server),
        loc.latitude,
        loc.longitude,
        &Credential::new("KEY"),
    )
    .await
    .expect("summary");

    assert_eq!(summary.series.len(), 60);
    assert_eq!(summary.onset, Some(3));
    assert_eq!(summary.state.to_string(), "starting in 3 minutes");
}

#[tokio::test]
async fn unauthorized_maps_to_invalid_credential() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/onecall"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "cod": 401,
            "message": "Invalid API key."
        })))
        .mount(&server)
        .await;

    let err = onecall_client(&server)
        .fetch_minutely(43.6532, -79.3832, "BAD")
        .await
        .unwrap_err();

    assert_eq!(err, PrecipKind::InvalidCredential);
}

#[tokio::test]
async fn other_statuses_map_to_unavailable() {
    for status in [403, 429, 500, 503] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/onecall"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let err = onecall_client(&server)
            .fetch_minutely(43.6532, -79.3832, "KEY")
            .await
            .unwrap_err();

        assert!(matches!(err, PrecipKind::Unavailable(_)), "status {status}: {err:?}");
    }
}

#[tokio::test]
async fn undecodable_body_maps_to_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/onecall"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = onecall_client(&server)
        .fetch_minutely(43.6532, -79.3832, "KEY")
        .await
        .unwrap_err();

    assert!(matches!(err, PrecipKind::Unavailable(_)));
}

#[tokio::test]
async fn unreachable_host_maps_to_unavailable_without_leaking_key() {
    let client = OneCallClient::new("http://127.0.0.1:9/onecall", Duration::from_secs(2))
        .expect("client builds");

    let err = client
        .fetch_minutely(43.6532, -79.3832, "SECRET_KEY")
        .await
        .unwrap_err();

    match err {
        PrecipKind::Unavailable(msg) => assert!(!msg.contains("SECRET_KEY"), "{msg}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn absent_minutely_block_expects_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/onecall"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "lat": 43.6532,
            "lon": -79.3832
        })))
        .mount(&server)
        .await;

    let summary = fetch_precipitation(
        &onecall_client(&server),
        43.6532,
        -79.3832,
        &Credential::new("KEY"),
    )
    .await
    .expect("summary");

    assert!(summary.series.is_empty());
    assert_eq!(summary.state, PrecipitationState::NoneExpected);
}

#[tokio::test]
async fn empty_credential_never_reaches_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/onecall"))
        .respond_with(ResponseTemplate::new(200).set_body_json(minutely_json(&[1.0])))
        .expect(0)
        .mount(&server)
        .await;

    let err = fetch_precipitation(
        &onecall_client(&server),
        43.6532,
        -79.3832,
        &Credential::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(err, PrecipKind::MissingCredential);
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

// ============================================================================
// Orchestrator over HTTP
// ============================================================================

#[tokio::test]
async fn rejected_key_still_yields_a_snapshot() {
    let server = MockServer::start().await;
    mount_station(&server, ResponseTemplate::new(200).set_body_string(STATION_XML)).await;
    Mock::given(method("GET"))
        .and(path("/onecall"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let orch = Orchestrator::from_config(&config_for(&server)).expect("orchestrator builds");
    let snapshot = orch
        .refresh(&toronto(), &Credential::new("BAD"))
        .await
        .expect("primary succeeded");

    assert_eq!(
        snapshot.precipitation,
        PrecipitationOutcome::Degraded(PrecipKind::InvalidCredential)
    );
    assert_eq!(snapshot.bundle.alerts.len(), 1);
    assert!(orch.latest().is_some());
}

#[tokio::test]
async fn station_outage_fails_without_calling_secondary() {
    let server = MockServer::start().await;
    mount_station(&server, ResponseTemplate::new(500).set_body_string("boom")).await;
    Mock::given(method("GET"))
        .and(path("/onecall"))
        .respond_with(ResponseTemplate::new(200).set_body_json(minutely_json(&[0.0])))
        .expect(0)
        .mount(&server)
        .await;

    let orch = Orchestrator::from_config(&config_for(&server)).expect("orchestrator builds");
    let err = orch
        .refresh(&toronto(), &Credential::new("KEY"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("500"), "{err}");
    assert!(orch.latest().is_none());
}
