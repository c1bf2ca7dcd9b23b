//! Local callback server the patched map posts clicks to.
//!
//! One route, `POST /`. The body is either a coordinate as JSON or the quit
//! signal `q`. A click is answered with 200 as soon as it is recorded; the
//! weather lookup then runs while still holding the coordinate log lock, so a
//! click's report is out before the next click (or the quit) is looked at.

use std::{future::IntoFuture, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use tokio::{
    net::{TcpListener, ToSocketAddrs},
    sync::{Mutex, watch},
};
use tracing::{debug, error, info, warn};

use crate::{
    lookup::WeatherLookup,
    model::{Coordinate, CoordinateLog},
};

/// Body that asks the server to stop, compared case-insensitively.
pub const QUIT_SIGNAL: &str = "q";

/// How long connections may linger after the quit signal before they are dropped.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Where finished weather reports go.
pub trait ReportSink: Send + Sync {
    fn emit(&self, report: &str);
}

/// Prints each report to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl ReportSink for StdoutSink {
    fn emit(&self, report: &str) {
        println!("{report}");
    }
}

/// Shared state backing the handler.
struct ServerState {
    log: Arc<Mutex<CoordinateLog>>,
    lookup: WeatherLookup,
    sink: Arc<dyn ReportSink>,
    shutdown: watch::Sender<bool>,
}

pub fn is_quit_signal(body: &str) -> bool {
    body.eq_ignore_ascii_case(QUIT_SIGNAL)
}

/// A bound, not yet running, callback server.
pub struct CallbackServer {
    listener: TcpListener,
    state: Arc<ServerState>,
    shutdown: watch::Receiver<bool>,
    grace: Duration,
}

impl CallbackServer {
    pub async fn bind(
        addr: impl ToSocketAddrs,
        lookup: WeatherLookup,
        sink: Arc<dyn ReportSink>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.context("Failed to bind callback server")?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let state = Arc::new(ServerState {
            log: Arc::new(Mutex::new(CoordinateLog::new())),
            lookup,
            sink,
            shutdown: shutdown_tx,
        });

        Ok(Self { listener, state, shutdown: shutdown_rx, grace: DEFAULT_SHUTDOWN_GRACE })
    }

    /// Bound on how long open connections can hold up shutdown.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().context("Failed to read callback server address")
    }

    /// Serve until the quit signal arrives, then return the coordinate log.
    ///
    /// Connections still open `grace` after the quit signal (a client that
    /// stalled mid-request, say) no longer keep the server alive.
    pub async fn run(self) -> Result<CoordinateLog> {
        let Self { listener, state, shutdown, grace } = self;
        let addr = listener.local_addr().context("Failed to read callback server address")?;
        let app = router(state.clone());

        info!(%addr, "Server opened");

        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(quit_requested(shutdown.clone()))
            .into_future();

        let deadline = async move {
            quit_requested(shutdown).await;
            tokio::time::sleep(grace).await;
        };

        tokio::select! {
            served = serve => served.context("Callback server failed")?,
            _ = deadline => warn!(?grace, "connections still open after quit, closing anyway"),
        }

        let log = state.log.lock().await.clone();
        info!(clicks = log.len(), "Server closed");
        Ok(log)
    }
}

async fn quit_requested(mut shutdown: watch::Receiver<bool>) {
    // A closed channel also means nobody can ask us to stop anymore.
    let _ = shutdown.wait_for(|stop| *stop).await;
}

fn router(state: Arc<ServerState>) -> Router {
    Router::new().route("/", post(handle_post)).with_state(state)
}

fn ok() -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/html")], ()).into_response()
}

async fn handle_post(State(state): State<Arc<ServerState>>, body: Bytes) -> Response {
    let mut log = state.log.clone().lock_owned().await;

    let stopping = *state.shutdown.borrow();
    if stopping {
        return (StatusCode::SERVICE_UNAVAILABLE, "server is shutting down").into_response();
    }

    let text = match std::str::from_utf8(&body) {
        Ok(text) => text,
        Err(err) => {
            warn!(error = %err, "rejecting non UTF-8 callback body");
            let message = format!("body is not UTF-8: {err}");
            return (StatusCode::BAD_REQUEST, message).into_response();
        }
    };

    if is_quit_signal(text) {
        info!("quit signal received");
        state.shutdown.send_replace(true);
        return ok();
    }

    let coordinate: Coordinate = match serde_json::from_str(text) {
        Ok(coordinate) => coordinate,
        Err(err) => {
            warn!(error = %err, body = text, "rejecting malformed callback body");
            let message = format!("invalid coordinate: {err}");
            return (StatusCode::BAD_REQUEST, message).into_response();
        }
    };

    let coordinate = *log.push(coordinate);
    info!(latitude = coordinate.latitude, longitude = coordinate.longitude, "click received");

    let pending = state.clone();
    tokio::spawn(async move {
        // The log stays locked until the report is out.
        let _log = log;
        match pending.lookup.report(coordinate).await {
            Ok(Some(report)) => pending.sink.emit(&report),
            Ok(None) => debug!("weather lookup skipped"),
            Err(err) => error!(error = %err, "weather lookup failed"),
        }
    });

    ok()
}
