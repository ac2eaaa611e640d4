//! HTTP endpoint.
//!
//! A fixed pool of worker threads pulls requests from one shared
//! `tiny_http` listener and hands them to the [`Dispatcher`]. Workers share
//! nothing else.

use crate::dispatch::{Dispatcher, InboundRequest, IngestError};
use crate::validate::ValidationError;
use sl_common::RequestId;
use std::io::Read;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tiny_http::{Header, Request, Response, Server};
use tracing::{debug, error, info, warn};

const CONTENT_TYPE: &str = "Content-Type: text/plain; charset=utf-8";

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("listener on {addr} has no IP address")]
    NotIp { addr: String },

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Running ingestion server.
pub struct IngestServer {
    server: Arc<Server>,
    workers: Vec<JoinHandle<()>>,
    stopping: Arc<AtomicBool>,
    local_addr: SocketAddr,
}

impl IngestServer {
    /// Bind `addr` and start `workers` threads. Port 0 picks a free port.
    pub fn start(
        addr: SocketAddr,
        workers: usize,
        dispatcher: Arc<Dispatcher>,
    ) -> Result<Self, ServeError> {
        let server = Server::http(addr).map_err(|e| ServeError::Bind {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;
        let local_addr = server
            .server_addr()
            .to_ip()
            .ok_or_else(|| ServeError::NotIp {
                addr: addr.to_string(),
            })?;

        let server = Arc::new(server);
        let stopping = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(workers);

        for index in 0..workers.max(1) {
            let worker_server = Arc::clone(&server);
            let worker_stopping = Arc::clone(&stopping);
            let dispatcher = Arc::clone(&dispatcher);
            let handle = thread::Builder::new()
                .name(format!("sightline-worker-{index}"))
                .spawn(move || worker_loop(&worker_server, &worker_stopping, &dispatcher))
                .map_err(ServeError::Spawn);
            match handle {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    // Release whatever already started before bailing out.
                    stop_workers(&server, &stopping, handles);
                    return Err(e);
                }
            }
        }

        info!(addr = %local_addr, workers = handles.len(), "ingestion server listening");
        Ok(Self {
            server,
            workers: handles,
            stopping,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Block until every worker has exited.
    pub fn wait(self) {
        for handle in self.workers {
            if handle.join().is_err() {
                error!("worker thread panicked");
            }
        }
    }

    /// Stop accepting requests and join the workers.
    pub fn shutdown(self) {
        info!(addr = %self.local_addr, "shutting down ingestion server");
        stop_workers(&self.server, &self.stopping, self.workers);
    }
}

fn stop_workers(server: &Server, stopping: &AtomicBool, workers: Vec<JoinHandle<()>>) {
    stopping.store(true, Ordering::SeqCst);
    // Each unblock releases exactly one waiting `recv`.
    for _ in 0..workers.len() {
        server.unblock();
    }
    for handle in workers {
        if handle.join().is_err() {
            error!("worker thread panicked");
        }
    }
}

fn worker_loop(server: &Server, stopping: &AtomicBool, dispatcher: &Dispatcher) {
    loop {
        match server.recv() {
            Ok(request) => serve_one(request, dispatcher),
            Err(_) if stopping.load(Ordering::SeqCst) => break,
            Err(e) => warn!(error = %e, "failed to accept request"),
        }
    }
    debug!("worker exiting");
}

/// One byte past the body limit, so oversize bodies are still detectable.
fn read_limit(max_body_bytes: usize) -> u64 {
    u64::try_from(max_body_bytes)
        .unwrap_or(u64::MAX)
        .saturating_add(1)
}

fn serve_one(mut request: Request, dispatcher: &Dispatcher) {
    let method = request.method().to_string();
    let limit = read_limit(dispatcher.max_body_bytes());

    let mut body = Vec::new();
    let outcome = match request.as_reader().take(limit).read_to_end(&mut body) {
        Ok(_) => dispatcher.handle(&InboundRequest::new(method, body)),
        Err(e) => dispatcher.reject(
            RequestId::new(),
            IngestError::from(ValidationError::MalformedPayload(format!(
                "failed to read request body: {e}"
            ))),
        ),
    };

    let mut response =
        Response::from_string(outcome.body).with_status_code(outcome.status.code());
    if let Ok(header) = CONTENT_TYPE.parse::<Header>() {
        response = response.with_header(header);
    }
    if let Err(e) = request.respond(response) {
        warn!(request_id = %outcome.request_id, error = %e, "failed to send response");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_limit_is_one_past_max() {
        assert_eq!(read_limit(4096), 4097);
        assert_eq!(read_limit(0), 1);
    }

    #[test]
    fn test_read_limit_saturates() {
        assert_eq!(read_limit(usize::MAX), u64::MAX);
    }
}
