//! Endpoint forwarder -- ships record batches to the downstream endpoint.
//!
//! The forwarder owns the receiving side of the runner's record channel and
//! writes every record as one JSON object per line over TCP.
//!
//! # Delivery
//!
//! - The connection is opened lazily on the first batch.
//! - A failed connect or write is logged, the batch is dropped and the
//!   connection is discarded; the next batch reconnects.
//! - Every connect and write is bounded by the write timeout; an endpoint
//!   that stops reading counts as a failed delivery.
//! - On stop, batches already queued in the channel are delivered before the
//!   task exits. Draining is bounded by the drain timeout, after which the
//!   task is aborted and whatever is left is dropped.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use tarunner_core::error::{PipelineError, TarunnerError};
use tarunner_core::metrics as m;
use tarunner_core::pipeline::{HealthStatus, Pipeline};
use tarunner_core::record::LogRecord;

const ENDPOINT_SCHEMES: [&str; 2] = ["tcp://", "http://"];

/// Default bound on a single connect or batch write.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);
/// Default bound on draining queued batches during stop.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Normalize an endpoint argument to `host:port`.
///
/// A `tcp://` or `http://` prefix and a trailing `/` are stripped.
///
/// # Errors
///
/// Returns an error when the result is empty or has no port.
pub fn normalize_endpoint(endpoint: &str) -> anyhow::Result<String> {
    let trimmed = endpoint.trim();
    let stripped = ENDPOINT_SCHEMES
        .iter()
        .find_map(|scheme| trimmed.strip_prefix(scheme))
        .unwrap_or(trimmed)
        .trim_end_matches('/');

    match stripped.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
            Ok(stripped.to_owned())
        }
        _ => Err(anyhow::anyhow!(
            "invalid endpoint '{}': expected host:port",
            endpoint
        )),
    }
}

/// Wire form of a record.
#[derive(Debug, Serialize)]
struct WireRecord<'a> {
    time_ms: u128,
    body: &'a str,
    attributes: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    execution: Option<u64>,
}

/// Encode a batch as newline-delimited JSON.
fn encode_batch(batch: &[LogRecord]) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    for record in batch {
        let wire = WireRecord {
            time_ms: record.observed_unix_millis(),
            body: &record.body,
            attributes: &record.attributes,
            execution: record.execution,
        };
        serde_json::to_writer(&mut buf, &wire)?;
        buf.push(b'\n');
    }
    Ok(buf)
}

/// Lazily connected TCP writer.
struct Connection {
    endpoint: String,
    stream: Option<TcpStream>,
    write_timeout: Duration,
}

impl Connection {
    async fn deliver(&mut self, batch: Vec<LogRecord>) {
        let payload = match encode_batch(&batch) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, records = batch.len(), "failed to encode batch");
                metrics::counter!(m::FORWARDER_ERRORS_TOTAL).increment(1);
                return;
            }
        };

        let written = tokio::time::timeout(self.write_timeout, self.write(&payload))
            .await
            .unwrap_or_else(|_| {
                Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "endpoint did not accept the batch in time",
                ))
            });
        if let Err(e) = written {
            tracing::warn!(
                endpoint = %self.endpoint,
                error = %e,
                records = batch.len(),
                "delivery failed, batch dropped"
            );
            metrics::counter!(m::FORWARDER_ERRORS_TOTAL).increment(1);
            return;
        }

        metrics::counter!(m::FORWARDER_RECORDS_TOTAL).increment(batch.len() as u64);
        tracing::trace!(records = batch.len(), "batch forwarded");
    }

    /// Write `payload`, connecting first if needed. The stream is kept only on success.
    async fn write(&mut self, payload: &[u8]) -> std::io::Result<()> {
        let mut stream = match self.stream.take() {
            Some(stream) => stream,
            None => {
                let stream = TcpStream::connect(&self.endpoint).await?;
                tracing::debug!(endpoint = %self.endpoint, "connected to endpoint");
                stream
            }
        };
        stream.write_all(payload).await?;
        stream.flush().await?;
        self.stream = Some(stream);
        Ok(())
    }
}

/// Forwarder state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ForwarderState {
    Initialized,
    Running,
    Stopped,
}

/// Endpoint forwarder.
///
/// # Usage
///
/// ```ignore
/// let (mut runner, rx) = RunnerBuilder::new().build()?;
/// let mut forwarder = Forwarder::new("collector:9000", rx.unwrap())?;
/// forwarder.start().await?;
/// ```
pub struct Forwarder {
    endpoint: String,
    state: ForwarderState,
    rx: Option<mpsc::Receiver<Vec<LogRecord>>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    write_timeout: Duration,
    drain_timeout: Duration,
}

impl Forwarder {
    /// Create a forwarder for `endpoint` reading batches from `rx`.
    pub fn new(endpoint: &str, rx: mpsc::Receiver<Vec<LogRecord>>) -> anyhow::Result<Self> {
        Ok(Self {
            endpoint: normalize_endpoint(endpoint)?,
            state: ForwarderState::Initialized,
            rx: Some(rx),
            cancel: CancellationToken::new(),
            task: None,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        })
    }

    /// Bound on a single connect or batch write.
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Bound on draining queued batches during stop.
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Normalized `host:port`.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

async fn forward_loop(
    mut rx: mpsc::Receiver<Vec<LogRecord>>,
    mut connection: Connection,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            batch = rx.recv() => match batch {
                Some(batch) => connection.deliver(batch).await,
                None => {
                    tracing::debug!("record channel closed");
                    break;
                }
            },
            _ = cancel.cancelled() => break,
        }
    }
}

impl Pipeline for Forwarder {
    async fn start(&mut self) -> Result<(), TarunnerError> {
        if self.state == ForwarderState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }
        let rx = self.rx.take().ok_or_else(|| {
            PipelineError::InitFailed("forwarder cannot be restarted".to_owned())
        })?;

        let connection = Connection {
            endpoint: self.endpoint.clone(),
            stream: None,
            write_timeout: self.write_timeout,
        };
        self.task = Some(tokio::spawn(forward_loop(
            rx,
            connection,
            self.cancel.clone(),
        )));
        self.state = ForwarderState::Running;
        tracing::info!(endpoint = %self.endpoint, "forwarder started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), TarunnerError> {
        if self.state != ForwarderState::Running {
            self.state = ForwarderState::Stopped;
            return Ok(());
        }

        self.cancel.cancel();
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.drain_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "forwarder task panicked"),
                Err(_) => {
                    tracing::warn!(
                        endpoint = %self.endpoint,
                        timeout_ms = self.drain_timeout.as_millis() as u64,
                        "drain timed out, dropping undelivered batches"
                    );
                    metrics::counter!(m::FORWARDER_ERRORS_TOTAL).increment(1);
                    task.abort();
                }
            }
        }
        self.state = ForwarderState::Stopped;
        tracing::info!(endpoint = %self.endpoint, "forwarder stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            ForwarderState::Running => match &self.task {
                Some(task) if task.is_finished() => {
                    HealthStatus::Unhealthy("record channel closed".to_owned())
                }
                _ => HealthStatus::Healthy,
            },
            ForwarderState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            ForwarderState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}
