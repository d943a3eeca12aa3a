use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use log::*;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

use pcload_datastore::Database;
use pcload_stream::{Format, PreparedStream, StreamError, StreamOptions, SOURCE_QUERY};

use crate::channel_writer::ChannelWriter;
use crate::config::ServerConfig;

#[derive(Debug, Default, serde::Deserialize)]
pub struct StreamParams {
    pub format: Option<String>,
}

#[derive(Clone)]
struct ServerState {
    db: Database,
    config: Arc<ServerConfig>,
}

/// The HTTP face of the streaming pipeline.
pub struct StreamServer {
    state: ServerState,
}

impl StreamServer {
    pub fn new(config: ServerConfig, db: Database) -> StreamServer {
        StreamServer {
            state: ServerState {
                db,
                config: Arc::new(config),
            },
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(stream_handler))
            .with_state(self.state.clone())
    }

    /// Serve until `shutdown` resolves.
    pub async fn serve_until(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let interface = self.state.config.get_interface();
        let listener = TcpListener::bind(interface).await?;
        info!("Streaming rows on http://{}", listener.local_addr()?);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("Server stopped");
        Ok(())
    }

    /// Serve until interrupted with ctrl-c.
    pub async fn serve(self) -> Result<()> {
        self.serve_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Unable to listen for ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }
}

/// Status for a stream which failed before sending anything.
pub fn status_for(error: &StreamError) -> StatusCode {
    match error {
        StreamError::Store(e) if e.is_pool_exhausted() => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn stream_handler(State(state): State<ServerState>, Query(params): Query<StreamParams>) -> Response {
    let format = Format::from_param(params.format.as_deref());
    let (ready_tx, ready_rx) = oneshot::channel();
    let (body_tx, body_rx) = mpsc::channel(state.config.get_channel_capacity());

    tokio::task::spawn_blocking(move || run_stream(state, format, ready_tx, body_tx));

    match ready_rx.await {
        Ok(Ok(())) => (
            [(header::CONTENT_TYPE, format.content_type())],
            Body::from_stream(ReceiverStream::new(body_rx)),
        )
            .into_response(),
        Ok(Err(e)) => {
            error!("Unable to start a {} stream: {}", format, e);
            (status_for(&e), e.to_string()).into_response()
        }
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "The stream stopped before it started",
        )
            .into_response(),
    }
}

/// Runs on a blocking thread: acquire, prepare, report readiness, then stream into the body channel.
///
/// Every record goes down the channel as its own chunk.  The connection is held for the whole stream and released when
/// this returns, however it returns.
fn run_stream(
    state: ServerState,
    format: Format,
    ready: oneshot::Sender<Result<(), StreamError>>,
    body: mpsc::Sender<std::io::Result<bytes::Bytes>>,
) {
    let options = StreamOptions {
        display_cap: state.config.get_display_cap(),
        progress_every: state.config.get_progress_every(),
        cancel: None,
    };

    let conn = match state.db.acquire() {
        Ok(c) => c,
        Err(e) => {
            let _ = ready.send(Err(e.into()));
            return;
        }
    };
    let prepared = match PreparedStream::prepare(&conn, SOURCE_QUERY, &options) {
        Ok(p) => p,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    if ready.send(Ok(())).is_err() {
        debug!("Request went away before the stream started");
        return;
    }

    // Outlives the writer, which is consumed by the stream.
    let failure = body.clone();
    match prepared.write_to(ChannelWriter::new(body), format, &options) {
        Ok(summary) => info!(
            "Sent {} records as {} in {:?}",
            summary.records, format, summary.elapsed
        ),
        Err(e) => {
            warn!("Stream stopped after {} records: {}", e.rows_written(), e);
            // The client must see a broken transfer, not a short but valid document.
            let _ = failure.blocking_send(Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                e.to_string(),
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_after_acquiring_are_internal_errors() {
        let cancelled = StreamError::Cancelled { rows_written: 0 };
        assert_eq!(status_for(&cancelled), StatusCode::INTERNAL_SERVER_ERROR);

        let cursor = StreamError::Cursor {
            rows_written: 3,
            source: "bad row".into(),
        };
        assert_eq!(status_for(&cursor), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
