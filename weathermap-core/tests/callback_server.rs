/// Integration tests for the callback server
///
/// Drives a real server on an ephemeral localhost port over HTTP, with the
/// geocoder and weather provider replaced by fixed stubs.
///
/// Run with: cargo test -p weathermap-core --test callback_server
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{StatusCode, header};
use tokio::{io::AsyncWriteExt, net::TcpStream, sync::Notify, task::JoinHandle};
use weathermap_core::{
    Address, CallbackServer, Coordinate, CoordinateLog, GeocodeError, ReportSink, ReverseGeocoder,
    WeatherError, WeatherLookup, WeatherProvider, WeatherReading,
};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct ParisGeocoder;

#[async_trait]
impl ReverseGeocoder for ParisGeocoder {
    async fn reverse(&self, query: &str) -> Result<Option<Address>, GeocodeError> {
        assert_eq!(query, "48.8566, 2.3522");
        let address = serde_json::from_str(r#"{"city":"Paris","state":"","country":"France"}"#)
            .expect("stub address");
        Ok(Some(address))
    }
}

/// Holds every lookup until the test opens the gate.
#[derive(Debug)]
struct GatedGeocoder(Arc<Notify>);

#[async_trait]
impl ReverseGeocoder for GatedGeocoder {
    async fn reverse(&self, query: &str) -> Result<Option<Address>, GeocodeError> {
        self.0.notified().await;
        ParisGeocoder.reverse(query).await
    }
}

#[derive(Debug)]
struct FixedWeather;

#[async_trait]
impl WeatherProvider for FixedWeather {
    async fn current(&self, _coordinate: Coordinate) -> Result<WeatherReading, WeatherError> {
        Ok(WeatherReading {
            temperature_k: 293.15,
            feels_like_k: 292.0,
            humidity_pct: 64,
            description: "clear sky".to_string(),
            wind_speed_mps: Some(3.6),
            sunrise: None,
            sunset: None,
        })
    }
}

#[derive(Default)]
struct CollectingSink(Mutex<Vec<String>>);

impl ReportSink for CollectingSink {
    fn emit(&self, report: &str) {
        self.0.lock().unwrap().push(report.to_string());
    }
}

impl CollectingSink {
    fn reports(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

struct Running {
    addr: SocketAddr,
    handle: JoinHandle<anyhow::Result<CoordinateLog>>,
    sink: Arc<CollectingSink>,
    http: reqwest::Client,
}

async fn start() -> Running {
    start_with(Box::new(ParisGeocoder), Duration::from_secs(5)).await
}

async fn start_with(geocoder: Box<dyn ReverseGeocoder>, grace: Duration) -> Running {
    let sink = Arc::new(CollectingSink::default());
    let lookup = WeatherLookup::new(geocoder, Box::new(FixedWeather));

    let server = CallbackServer::bind("127.0.0.1:0", lookup, sink.clone())
        .await
        .expect("bind callback server")
        .with_shutdown_grace(grace);
    let addr = server.local_addr().expect("local addr");
    let handle = tokio::spawn(server.run());

    // No pooled keep-alive connections, so shutdown never waits on us.
    let http = reqwest::Client::builder().pool_max_idle_per_host(0).build().unwrap();

    Running { addr, handle, sink, http }
}

impl Running {
    async fn post(&self, body: &'static str) -> reqwest::Response {
        self.http
            .post(format!("http://{}/", self.addr))
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .expect("request should reach the server")
    }

    async fn finish(self) -> CoordinateLog {
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server should stop after quit")
            .expect("server task should not panic")
            .expect("server should exit cleanly")
    }
}

const PARIS: &str = r#"{"latitude":48.8566,"longitude":2.3522}"#;

const PARIS_REPORT: &str = "Temperature in Paris, France: 20.00 degrees Celsius or 68.00 degrees Fahrenheit.\n\
Temperature in Paris, France feels like: 18.85 degrees Celsius.\n\
Humidity in Paris, France: 64%\n\
Wind Speed in Paris, France: 3.6 m/s\n\
General Weather in Paris, France: clear sky";

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn click_then_quit_end_to_end() {
    let server = start().await;
    let addr = server.addr;

    let res = server.post(PARIS).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "text/html");
    assert!(res.text().await.unwrap().is_empty());

    let res = server.post("q").await;
    assert_eq!(res.status(), StatusCode::OK);

    let sink = server.sink.clone();
    let log = server.finish().await;

    assert_eq!(log.entries(), &[Coordinate::new(48.8566, 2.3522)]);
    assert_eq!(sink.reports(), vec![PARIS_REPORT.to_string()]);
    assert!(TcpStream::connect(addr).await.is_err(), "server should stop accepting connections");
}

#[tokio::test]
async fn each_click_appends_exactly_one_entry() {
    let server = start().await;

    for _ in 0..3 {
        assert_eq!(server.post(PARIS).await.status(), StatusCode::OK);
    }

    assert_eq!(server.post("Q").await.status(), StatusCode::OK);
    let sink = server.sink.clone();
    let log = server.finish().await;

    assert_eq!(log.len(), 3);
    assert_eq!(sink.reports().len(), 3);
    assert!(log.entries().iter().all(|c| *c == Coordinate::new(48.8566, 2.3522)));
}

#[tokio::test]
async fn malformed_body_is_rejected_and_server_keeps_listening() {
    let server = start().await;

    let res = server.post("{\"latitude\": 1.0").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server.post("hello").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server.post(PARIS).await;
    assert_eq!(res.status(), StatusCode::OK);

    server.post("q").await;
    let log = server.finish().await;
    assert_eq!(log.len(), 1);
}

#[tokio::test]
async fn only_post_is_routed() {
    let server = start().await;

    let res = server.http.get(format!("http://{}/", server.addr)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);

    server.post("q").await;
    assert!(server.finish().await.is_empty());
}

#[tokio::test]
async fn nothing_is_recorded_after_quit() {
    let server = start().await;
    let addr = server.addr;
    let http = server.http.clone();

    assert_eq!(server.post("q").await.status(), StatusCode::OK);
    let log = server.finish().await;
    assert!(log.is_empty());

    let late = http.post(format!("http://{addr}/")).body(PARIS).send().await;
    assert!(late.is_err(), "no connection should be accepted after quit");
}

#[tokio::test]
async fn click_is_answered_before_the_lookup_finishes() {
    let gate = Arc::new(Notify::new());
    let server = start_with(Box::new(GatedGeocoder(gate.clone())), Duration::from_secs(5)).await;

    let res = tokio::time::timeout(Duration::from_secs(2), server.post(PARIS))
        .await
        .expect("response should not wait for the weather lookup");
    assert_eq!(res.status(), StatusCode::OK);
    assert!(server.sink.reports().is_empty());

    gate.notify_one();

    // The quit waits its turn behind the pending lookup.
    assert_eq!(server.post("q").await.status(), StatusCode::OK);
    let sink = server.sink.clone();
    let log = server.finish().await;

    assert_eq!(log.len(), 1);
    assert_eq!(sink.reports(), vec![PARIS_REPORT.to_string()]);
}

#[tokio::test]
async fn stalled_client_does_not_block_shutdown() {
    let server = start_with(Box::new(ParisGeocoder), Duration::from_millis(200)).await;

    let mut stalled = TcpStream::connect(server.addr).await.unwrap();
    stalled.write_all(b"POST / HTTP/1.1\r\nHost: x\r\n").await.unwrap();

    assert_eq!(server.post("q").await.status(), StatusCode::OK);
    assert!(server.finish().await.is_empty());

    drop(stalled);
}
