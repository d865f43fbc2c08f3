// HttpMetricsClient against a mock provider (wiremock), plus an end-to-end update through HTTP

mod common;

use chaintps::clock;
use chaintps::config::ProviderConfig;
use chaintps::metrics_client::{FetchError, HttpMetricsClient, MetricsSource};
use chaintps::models::UpdateOutcome;
use chaintps::tps_repo::SeriesStore;
use chaintps::updater::Updater;
use common::{fast_config, recent_body, temp_repo};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_config(base_url: &str, timeout_ms: u64) -> ProviderConfig {
    ProviderConfig {
        base_url: base_url.to_string(),
        timeout_ms,
        page_size: 30,
        time_interval: "day".into(),
    }
}

#[tokio::test]
async fn fetch_metrics_returns_body_untouched() {
    let server = MockServer::start().await;
    let body = serde_json::json!({ "results": [{ "timestamp": "1", "value": "x" }] });
    Mock::given(method("GET"))
        .and(path("/chains/43114/metrics/avgTps"))
        .and(query_param("timeInterval", "day"))
        .and(query_param("pageSize", "30"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpMetricsClient::new(&provider_config(&server.uri(), 1000)).unwrap();
    let got = client.fetch_metrics("43114").await.unwrap();
    assert_eq!(got, body);
}

#[tokio::test]
async fn metrics_url_trims_trailing_slash() {
    let client =
        HttpMetricsClient::new(&provider_config("https://metrics.example.net/v2/", 1000)).unwrap();
    assert_eq!(
        client.metrics_url("1"),
        "https://metrics.example.net/v2/chains/1/metrics/avgTps"
    );
}

#[tokio::test]
async fn fetch_metrics_non_2xx_is_fetch_failed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = HttpMetricsClient::new(&provider_config(&server.uri(), 1000)).unwrap();
    let err = client.fetch_metrics("43114").await.unwrap_err();
    assert!(matches!(err, FetchError::Status(500)));
    assert!(err.to_string().starts_with("fetch failed"));
}

#[tokio::test]
async fn fetch_metrics_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "results": [] }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = HttpMetricsClient::new(&provider_config(&server.uri(), 50)).unwrap();
    let err = client.fetch_metrics("43114").await.unwrap_err();
    assert!(matches!(err, FetchError::Timeout(_)), "got {:?}", err);
}

#[tokio::test]
async fn fetch_metrics_non_json_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let client = HttpMetricsClient::new(&provider_config(&server.uri(), 1000)).unwrap();
    let err = client.fetch_metrics("43114").await.unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)), "got {:?}", err);
}

#[tokio::test]
async fn fetch_metrics_unreachable_host_is_request_error() {
    let client = HttpMetricsClient::new(&provider_config("http://127.0.0.1:9", 1000)).unwrap();
    let err = client.fetch_metrics("43114").await.unwrap_err();
    assert!(err.to_string().starts_with("fetch failed"));
}

#[tokio::test]
async fn updater_over_http_recovers_from_one_503() {
    let server = MockServer::start().await;
    let now = clock::now_secs();
    Mock::given(method("GET"))
        .and(path("/chains/43114/metrics/avgTps"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/chains/43114/metrics/avgTps"))
        .respond_with(ResponseTemplate::new(200).set_body_json(recent_body(now)))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, repo) = temp_repo().await;
    let repo = Arc::new(repo);
    let client = Arc::new(HttpMetricsClient::new(&provider_config(&server.uri(), 1000)).unwrap());
    let updater = Updater::new(client, repo.clone(), fast_config(3));

    let outcome = updater.update_one("43114").await;
    assert!(matches!(outcome, UpdateOutcome::Applied { .. }));
    assert_eq!(repo.count_for_chain("43114").await.unwrap(), 2);
}
