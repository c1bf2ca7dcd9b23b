//! Canned HTTP endpoints on localhost for exercising the outbound clients.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{Router, extract::RawQuery, http::StatusCode, routing::get};
use tokio::net::TcpListener;

/// Query strings an endpoint received, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct SeenQueries(Arc<Mutex<Vec<String>>>);

impl SeenQueries {
    pub fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// An endpoint at `path` that waits `delay`, then answers `status` with `body`.
pub struct Canned {
    pub path: &'static str,
    pub status: StatusCode,
    pub body: &'static str,
    pub delay: Duration,
}

impl Canned {
    pub fn ok(path: &'static str, body: &'static str) -> Self {
        Self { path, status: StatusCode::OK, body, delay: Duration::ZERO }
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Serve on an ephemeral port; returns the base URL and the query recorder.
    pub async fn serve(self) -> (String, SeenQueries) {
        let seen = SeenQueries::default();
        let recorder = seen.clone();
        let Self { path, status, body, delay } = self;

        let router = Router::new().route(
            path,
            get(move |RawQuery(query): RawQuery| {
                let recorder = recorder.clone();
                async move {
                    recorder.0.lock().unwrap().push(query.unwrap_or_default());
                    tokio::time::sleep(delay).await;
                    (status, body)
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub endpoint");
        let addr = listener.local_addr().expect("stub address");
        tokio::spawn(async move { axum::serve(listener, router).await });

        (format!("http://{addr}"), seen)
    }
}
