//! Stdin/stdout JSON bridge for the search engine.
//!
//! Reads newline-delimited JSON [`SearchRequest`] messages from stdin, runs
//! each through the [`FederatedSearchEngine`], and writes one
//! [`SearchResponse`] per request as newline-delimited JSON to stdout.
//!
//! Stdout is exclusively reserved for the JSON protocol; all diagnostic
//! output (tracing, logs) must be routed to stderr.

use profile_search::{DocumentStore, FederatedSearchEngine};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::host::contract::{
    CommandName, ErrorBody, PARSE_ERROR_ID, SearchRequest, SearchResponse,
};

/// Run the bridge on the process's stdin and stdout until stdin closes, a
/// `runtime.stop` command arrives, or `shutdown` fires.
pub async fn run_stdio_bridge<S: DocumentStore>(
    engine: &FederatedSearchEngine<S>,
    shutdown: CancellationToken,
) -> Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    let writer = BufWriter::new(tokio::io::stdout());
    run_bridge(engine, reader, writer, shutdown).await
}

/// Serve requests from `reader`, writing responses to `writer`.
///
/// Requests are handled one at a time, in arrival order. A search in
/// flight when `shutdown` fires is answered with a `cancelled` error.
pub async fn run_bridge<S, R, W>(
    engine: &FederatedSearchEngine<S>,
    mut reader: R,
    mut writer: W,
    shutdown: CancellationToken,
) -> Result<()>
where
    S: DocumentStore,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                tracing::info!("shutdown requested; stopping search bridge");
                break;
            }
            read = reader.read_line(&mut line) => read
                .map_err(|e| AppError::Bridge(format!("failed to read request: {e}")))?,
        };

        // EOF
        if bytes_read == 0 {
            tracing::info!("input closed (EOF); shutting down search bridge");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let request: SearchRequest = match serde_json::from_str(trimmed) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse search request");
                let response = SearchResponse::error(
                    PARSE_ERROR_ID,
                    ErrorBody::new("parse_error", format!("failed to parse search request: {e}")),
                );
                write_response(&mut writer, &response).await?;
                continue;
            }
        };

        let is_stop = request.command == CommandName::RuntimeStop;
        let response = handle_request(engine, request, &shutdown).await;
        write_response(&mut writer, &response).await?;

        if is_stop {
            tracing::info!("runtime.stop received; shutting down search bridge");
            break;
        }
    }

    Ok(())
}

/// Dispatch one parsed request.
pub async fn handle_request<S: DocumentStore>(
    engine: &FederatedSearchEngine<S>,
    request: SearchRequest,
    shutdown: &CancellationToken,
) -> SearchResponse {
    if let Err(body) = request.validate() {
        return SearchResponse::error(request.request_id, body);
    }

    match request.command {
        CommandName::RuntimeStop => SearchResponse::ok(request.request_id, None),
        CommandName::SearchQuery => {
            let page_size = request
                .page_size
                .unwrap_or(engine.config().default_page_size);
            let outcome = engine
                .search_with_cancellation(
                    &request.filters,
                    page_size,
                    request.cursor.as_deref(),
                    shutdown,
                )
                .await;
            match outcome {
                Ok(page) => {
                    tracing::debug!(
                        request_id = %request.request_id,
                        returned = page.items.len(),
                        has_more = page.has_more(),
                        "search request served"
                    );
                    SearchResponse::ok(request.request_id, Some(page))
                }
                Err(err) => {
                    tracing::warn!(
                        request_id = %request.request_id,
                        kind = err.kind(),
                        error = %err,
                        "search request failed"
                    );
                    SearchResponse::error(request.request_id, ErrorBody::from(&err))
                }
            }
        }
    }
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &SearchResponse,
) -> Result<()> {
    let json = serde_json::to_string(response)
        .map_err(|e| AppError::Bridge(format!("failed to serialize response: {e}")))?;
    write_line(writer, &json).await
}

/// Write a single JSON line and flush.
async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, json: &str) -> Result<()> {
    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| AppError::Bridge(format!("failed to write response: {e}")))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| AppError::Bridge(format!("failed to write newline: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| AppError::Bridge(format!("failed to flush output: {e}")))?;
    Ok(())
}
