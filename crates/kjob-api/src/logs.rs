//! WebSocket relay of an execution's output.
//!
//! One session per connection:
//! 1. no usable identifier in the query: close with 1008, cluster untouched
//! 2. the unit's log stream cannot be opened: close with 1011
//! 3. every line becomes one text frame, in order; a line longer than the read
//!    buffer is split over several frames
//! 4. end of output closes with 1000; a read or write failure closes with 1011
//!
//! The log stream and the socket are owned by the session task and released
//! when it returns.

use std::{fmt::Display, sync::Arc};

use axum::{
    extract::{
        Query, State,
        rejection::QueryRejection,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocketUpgrade, close_code, rejection::WebSocketUpgradeRejection},
    },
    response::{IntoResponse, Response},
};
use futures::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, Sink, SinkExt};
use kjob_core::{ClusterJobClient, StreamOutcome, is_execution_id};
use kjob_model::ExecutionId;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{context::AppContext, error::ApiError};

const REASON_COMPLETED: &str = "All logs are read";
const REASON_MISSING_ID: &str = "No job name provided while requesting for logs";
const REASON_INVALID_ID: &str = "Invalid job name provided while requesting for logs";
const REASON_FAILED: &str = "Something went wrong";

/// Smallest frame payload; any UTF-8 character fits.
const MIN_FRAME_BYTES: usize = 4;

#[derive(Debug, Deserialize)]
pub(crate) struct LogsQuery {
    job_name: Option<String>,
}

/// Why a session has nothing to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NoTarget {
    Missing,
    Malformed,
}

impl NoTarget {
    fn reason(self) -> &'static str {
        match self {
            NoTarget::Missing => REASON_MISSING_ID,
            NoTarget::Malformed => REASON_INVALID_ID,
        }
    }
}

impl LogsQuery {
    fn execution_id(self) -> Result<ExecutionId, NoTarget> {
        let name = self
            .job_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or(NoTarget::Missing)?;

        if !is_execution_id(&name) {
            return Err(NoTarget::Malformed);
        }
        Ok(ExecutionId::from(name))
    }
}

/// GET /jobs/logs?job_name=<id>
pub(crate) async fn stream_logs(
    State(ctx): State<Arc<AppContext>>,
    query: Result<Query<LogsQuery>, QueryRejection>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "websocket upgrade failed");
            return ApiError::InvalidRequest(rejection.body_text()).into_response();
        }
    };
    let target = match query {
        Ok(Query(q)) => q.execution_id(),
        Err(_) => Err(NoTarget::Malformed),
    };

    ws.read_buffer_size(ctx.stream.read_buffer_size)
        .write_buffer_size(ctx.stream.write_buffer_size)
        .on_upgrade(move |mut socket| async move {
            let max_frame = ctx.stream.read_buffer_size;
            let (outcome, frames) = run_session(&mut socket, target, ctx.cluster.as_ref(), max_frame).await;
            ctx.metrics.record_stream_closed(outcome, frames);
        })
}

/// Drive one relay session over `sink`.
///
/// Returns how the session ended and how many text frames were forwarded.
pub(crate) async fn run_session<S>(
    sink: &mut S,
    target: Result<ExecutionId, NoTarget>,
    cluster: &dyn ClusterJobClient,
    max_frame: usize,
) -> (StreamOutcome, u64)
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let id = match target {
        Ok(id) => id,
        Err(why) => {
            warn!(?why, "no usable job name provided while requesting for logs");
            close(sink, close_code::POLICY, why.reason()).await;
            return (StreamOutcome::MissingIdentifier, 0);
        }
    };

    let stream = match cluster.open_log_stream(&id).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(execution = %id, error = %e, "failed to open log stream");
            close(sink, close_code::ERROR, REASON_FAILED).await;
            return (StreamOutcome::OpenFailed, 0);
        }
    };

    relay_lines(stream, sink, &id, max_frame).await
}

/// Forward `reader` line by line until it ends or fails.
///
/// At most `max_frame` bytes are read per frame, so a line without a
/// terminator is never held in full.
pub(crate) async fn relay_lines<R, S>(
    mut reader: R,
    sink: &mut S,
    id: &ExecutionId,
    max_frame: usize,
) -> (StreamOutcome, u64)
where
    R: AsyncBufRead + Unpin,
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let max_frame = max_frame.max(MIN_FRAME_BYTES);
    let mut buf = Vec::with_capacity(max_frame);
    let mut frames = 0u64;
    let mut mid_line = false;

    loop {
        // `buf` only carries an incomplete character (< 4 bytes) between reads.
        let limit = (max_frame - buf.len()) as u64;
        let read = (&mut reader).take(limit).read_until(b'\n', &mut buf).await;

        match read {
            Ok(0) if buf.is_empty() => {
                debug!(execution = %id, frames, "finished streaming logs");
                close(sink, close_code::NORMAL, REASON_COMPLETED).await;
                return (StreamOutcome::Completed, frames);
            }
            Ok(read) => {
                let ends_line = buf.last() == Some(&b'\n');
                let frame = next_frame(&mut buf, read == 0);

                // The terminator of a line that exactly filled the previous frame.
                let continued = std::mem::replace(&mut mid_line, !ends_line && read != 0);
                if continued && ends_line && frame.is_empty() {
                    continue;
                }

                if let Err(e) = sink.send(Message::Text(frame.into())).await {
                    warn!(execution = %id, error = %e, "failed to write logs to client");
                    close(sink, close_code::ERROR, REASON_FAILED).await;
                    return (StreamOutcome::WriteFailed, frames);
                }
                frames += 1;
            }
            Err(e) => {
                warn!(execution = %id, error = %e, "failed to read log stream");
                close(sink, close_code::ERROR, REASON_FAILED).await;
                return (StreamOutcome::ReadFailed, frames);
            }
        }
    }
}

/// Take the next frame out of `buf`.
///
/// A complete line (or the tail at end of stream) is sent whole. A partial line
/// keeps a trailing incomplete UTF-8 sequence in `buf` for the next frame.
fn next_frame(buf: &mut Vec<u8>, at_eof: bool) -> String {
    if at_eof || buf.last() == Some(&b'\n') {
        let line = frame_line(buf);
        buf.clear();
        return line;
    }

    let tail = buf.split_off(buf.len() - incomplete_tail(buf));
    let frame = String::from_utf8_lossy(buf).into_owned();
    *buf = tail;
    frame
}

/// Length of an incomplete UTF-8 sequence at the end of `bytes`.
fn incomplete_tail(bytes: &[u8]) -> usize {
    match std::str::from_utf8(bytes) {
        Err(e) if e.error_len().is_none() => bytes.len() - e.valid_up_to(),
        _ => 0,
    }
}

/// Strip the line terminator (`\n` or `\r\n`) and decode, replacing invalid UTF-8.
fn frame_line(buf: &[u8]) -> String {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

async fn close<S>(sink: &mut S, code: u16, reason: &'static str)
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let frame = CloseFrame {
        code,
        reason: Utf8Bytes::from_static(reason),
    };
    if let Err(e) = sink.send(Message::Close(Some(frame))).await {
        debug!(error = %e, "failed to send close frame");
    }
}
