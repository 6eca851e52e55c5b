//! Loopback HTTP service double that serves scripted responses.
//!
//! The server runs on its own thread with a dedicated tokio runtime so tests
//! and the blocking program under test never share an executor.

use std::io;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use tokio::net::TcpListener;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::HarnessError;
use crate::expectation::{Expectation, ExpectationQueue, RecordedRequest, Violation};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// A running service double bound to an ephemeral loopback port.
///
/// Dropping the server stops it. If it is dropped with violations that were
/// never checked through [`MockServer::verify`], the drop panics so a broken
/// script cannot pass silently.
pub struct MockServer {
    address: SocketAddr,
    queue: Arc<ExpectationQueue>,
    shutdown_tx: Option<watch::Sender<bool>>,
    join: Option<JoinHandle<io::Result<()>>>,
    verified: AtomicBool,
}

impl MockServer {
    /// Binds `127.0.0.1:0` and starts serving `expectations` in order.
    ///
    /// # Errors
    ///
    /// Returns an error when the socket cannot be bound or the runtime or
    /// server thread cannot be started.
    pub fn start<I>(expectations: I) -> Result<Self, HarnessError>
    where
        I: IntoIterator<Item = Expectation>,
    {
        let queue = Arc::new(ExpectationQueue::new(expectations));
        let std_listener =
            StdTcpListener::bind(("127.0.0.1", 0)).map_err(HarnessError::Bind)?;
        std_listener
            .set_nonblocking(true)
            .map_err(HarnessError::Bind)?;
        let address = std_listener.local_addr().map_err(HarnessError::Bind)?;

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(HarnessError::Runtime)?;
        let listener = {
            let _context = runtime.enter();
            TcpListener::from_std(std_listener).map_err(HarnessError::Bind)?
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let app = Router::new()
            .fallback(serve_request)
            .with_state(Arc::clone(&queue));
        let join = thread::Builder::new()
            .name("rack-mock-server".to_owned())
            .spawn(move || serve(&runtime, listener, app, shutdown_rx))
            .map_err(HarnessError::Spawn)?;

        info!(%address, "mock server listening");
        Ok(Self {
            address,
            queue,
            shutdown_tx: Some(shutdown_tx),
            join: Some(join),
            verified: AtomicBool::new(false),
        })
    }

    /// Socket address the server listens on.
    #[must_use]
    pub const fn address(&self) -> SocketAddr {
        self.address
    }

    /// Base URL for the program under test, such as `http://127.0.0.1:41234`.
    #[must_use]
    pub fn uri(&self) -> String {
        format!("http://{}", self.address)
    }

    /// Expectations not consumed yet.
    #[must_use]
    pub fn pending(&self) -> Vec<Expectation> {
        self.queue.pending()
    }

    /// Every request received so far.
    #[must_use]
    pub fn received(&self) -> Vec<RecordedRequest> {
        self.queue.received()
    }

    /// Every violation recorded so far.
    #[must_use]
    pub fn violations(&self) -> Vec<Violation> {
        self.queue.violations()
    }

    /// Checks that no request has broken the script so far.
    ///
    /// Calling this marks the violations as reported, so dropping the server
    /// afterwards does not panic.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Violations`] listing every violation.
    pub fn check_violations(&self) -> Result<(), HarnessError> {
        self.verified.store(true, Ordering::SeqCst);
        let violations = self.violations();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::Violations { violations })
        }
    }

    /// Checks that no request broke the script and every expectation was
    /// consumed.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Violations`] or [`HarnessError::Unconsumed`].
    pub fn verify(&self) -> Result<(), HarnessError> {
        self.verify_leaving(0)
    }

    /// Like [`MockServer::verify`], but requires exactly `unconsumed`
    /// expectations to remain.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Violations`] or [`HarnessError::Unconsumed`].
    pub fn verify_leaving(&self, unconsumed: usize) -> Result<(), HarnessError> {
        self.check_violations()?;
        let pending = self.pending();
        if pending.len() != unconsumed {
            return Err(HarnessError::Unconsumed {
                expected: unconsumed,
                pending: pending
                    .iter()
                    .map(|expectation| expectation.request.to_string())
                    .collect(),
            });
        }
        Ok(())
    }

    /// Stops the server and waits for its thread.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Server`] when the server loop failed.
    pub fn shutdown(&mut self) -> Result<(), HarnessError> {
        if let Some(shutdown_tx) = self.shutdown_tx.take()
            && shutdown_tx.send(true).is_err()
        {
            debug!("mock server already stopped");
        }
        let Some(join) = self.join.take() else {
            return Ok(());
        };
        match join.join() {
            Ok(result) => result.map_err(HarnessError::Server),
            Err(_) => Err(HarnessError::Server(io::Error::other(
                "mock server thread panicked",
            ))),
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Err(error) = self.shutdown() {
            warn!(%error, "mock server did not stop cleanly");
        }
        if thread::panicking() || self.verified.load(Ordering::SeqCst) {
            return;
        }
        let violations = self.queue.violations();
        if !violations.is_empty() {
            panic!("{}", HarnessError::Violations { violations });
        }
    }
}

fn serve(
    runtime: &Runtime,
    listener: TcpListener,
    app: Router,
    shutdown_rx: watch::Receiver<bool>,
) -> io::Result<()> {
    runtime.block_on(async move {
        let mut graceful_rx = shutdown_rx.clone();
        let mut wait_rx = shutdown_rx;
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            if graceful_rx.changed().await.is_err() {
                debug!("shutdown channel closed");
            }
        });
        let mut server_task = tokio::spawn(async move { server.await });

        tokio::select! {
            joined = &mut server_task => flatten(joined),
            changed = wait_rx.changed() => {
                if changed.is_err() {
                    debug!("shutdown channel closed");
                }
                if let Ok(joined) = tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut server_task).await {
                    flatten(joined)
                } else {
                    warn!(
                        timeout_ms = SHUTDOWN_TIMEOUT.as_millis(),
                        "mock server shutdown timed out; aborting"
                    );
                    server_task.abort();
                    Ok(())
                }
            }
        }
    })
}

fn flatten(joined: Result<io::Result<()>, tokio::task::JoinError>) -> io::Result<()> {
    match joined {
        Ok(result) => result,
        Err(join_error) => {
            error!(error = %join_error, "mock server task failed");
            Err(io::Error::other(join_error))
        }
    }
}

async fn serve_request(
    State(queue): State<Arc<ExpectationQueue>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = RecordedRequest {
        method: method.as_str().to_owned(),
        path: uri
            .path_and_query()
            .map_or_else(|| uri.path().to_owned(), |target| target.as_str().to_owned()),
        body: String::from_utf8_lossy(&body).into_owned(),
        headers: headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect(),
    };
    debug!(%request, "mock server received request");

    let scripted = queue.handle(request);
    let status =
        StatusCode::from_u16(scripted.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        scripted.body().to_owned(),
    )
        .into_response()
}
