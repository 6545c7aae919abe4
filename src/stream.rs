//! Long-lived delta streaming
//!
//! The streaming endpoint keeps one HTTP response open and writes one delta
//! per line, with bare newlines as keep-alives. Lines are reassembled across
//! body frames, decoded in wire order and handed to the caller's handler
//! before the next read.
//!
//! The handler runs inline on the reading task. While it runs nothing is
//! read from the connection, so slow work belongs on another task:
//!
//! ```no_run
//! # async fn run(client: nylas::Client) -> nylas::Result<()> {
//! use tokio_util::sync::CancellationToken;
//!
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<nylas::Delta>();
//! tokio::spawn(async move {
//!     while let Some(delta) = rx.recv().await {
//!         println!("{} {}", delta.object, delta.id);
//!     }
//! });
//!
//! let token = CancellationToken::new();
//! client
//!     .stream_deltas("cursor", &token, |delta| {
//!         let _ = tx.send(delta);
//!     })
//!     .await
//! # }
//! ```

use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use http_body_util::BodyExt;
use hyper::Method;
use serde::de::Error as _;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{Client, Query};
use crate::delta::Delta;
use crate::error::{NylasError, Result};

/// Longest line accepted from the stream before it is treated as malformed
pub const MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

// how much of an oversized or truncated line is kept in the error
const LINE_PREVIEW_BYTES: usize = 1024;

impl Client {
    /// Stream deltas after `cursor`, calling `handler` with each one in the
    /// order the server sent them.
    ///
    /// Always ends with an error: [`NylasError::Cancelled`] when `cancel`
    /// fires, [`NylasError::NetworkError`] when the server closes the
    /// stream, [`NylasError::MalformedDelta`] for a bad or truncated line,
    /// or the API/transport error that ended the session. Nothing is
    /// retried; to resume, call again with the cursor of the last delta
    /// handled.
    pub async fn stream_deltas<F>(
        &self,
        cursor: &str,
        cancel: &CancellationToken,
        handler: F,
    ) -> Result<()>
    where
        F: FnMut(Delta),
    {
        let mut query = Query::new();
        query.push("cursor", cursor);
        let req = self
            .user_request(Method::GET, "/delta/streaming")?
            .query(query);

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(NylasError::Cancelled),
            response = self.send(req) => response,
        };
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "failed to open delta stream");
                return Err(e);
            }
        };

        info!(cursor = %cursor, "delta stream opened");

        let body = response
            .into_body()
            .into_data_stream()
            .map_err(NylasError::from);

        let result = consume_delta_stream(body, cancel, handler).await;
        if let Err(e) = &result {
            match e {
                NylasError::Cancelled => info!("delta stream cancelled"),
                e => warn!(error = %e, "delta stream ended"),
            }
        }
        result
    }
}

/// Drive a newline-delimited delta body until it ends.
///
/// Cancellation is checked before every line and raced against every read,
/// so a stalled connection does not delay it. The body ending is an error
/// too: [`NylasError::NetworkError`] after a complete line, or
/// [`NylasError::MalformedDelta`] when it stops partway through one. A line
/// longer than [`MAX_LINE_BYTES`] is malformed.
pub async fn consume_delta_stream<S, F>(
    body: S,
    cancel: &CancellationToken,
    mut handler: F,
) -> Result<()>
where
    S: Stream<Item = Result<Bytes>>,
    F: FnMut(Delta),
{
    futures::pin_mut!(body);
    let mut lines = LineBuffer::default();

    loop {
        while let Some(line) = lines.next_line() {
            if cancel.is_cancelled() {
                return Err(NylasError::Cancelled);
            }
            if is_keep_alive(&line) {
                debug!("delta stream keep-alive");
                continue;
            }
            handler(parse_line(&line)?);
        }

        if lines.len() > MAX_LINE_BYTES {
            return Err(truncated_line(
                lines.as_bytes(),
                format!("line exceeds {} bytes", MAX_LINE_BYTES),
            ));
        }

        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(NylasError::Cancelled),
            frame = body.next() => frame,
        };

        match frame {
            Some(Ok(data)) => lines.extend(&data),
            Some(Err(e)) => return Err(e),
            None if is_keep_alive(lines.as_bytes()) => {
                return Err(NylasError::NetworkError(
                    "delta stream closed by server".to_string(),
                ));
            }
            None => {
                debug!(bytes = lines.len(), "delta stream ended inside a line");
                return Err(truncated_line(
                    lines.as_bytes(),
                    "delta stream closed mid-line".to_string(),
                ));
            }
        }
    }
}

fn is_keep_alive(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

fn parse_line(line: &[u8]) -> Result<Delta> {
    serde_json::from_slice(line).map_err(|source| NylasError::MalformedDelta {
        line: String::from_utf8_lossy(line)
            .trim_end_matches(['\r', '\n'])
            .to_string(),
        source,
    })
}

fn truncated_line(partial: &[u8], reason: String) -> NylasError {
    let preview = &partial[..partial.len().min(LINE_PREVIEW_BYTES)];
    NylasError::MalformedDelta {
        line: String::from_utf8_lossy(preview).into_owned(),
        source: serde_json::Error::custom(reason),
    }
}

/// Accumulates body frames and splits off `\n`-terminated lines
#[derive(Debug, Default)]
struct LineBuffer {
    buf: Vec<u8>,
    // bytes already known not to contain a newline
    scanned: usize,
}

impl LineBuffer {
    fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Next complete line including its terminator
    fn next_line(&mut self) -> Option<Vec<u8>> {
        match self.buf[self.scanned..].iter().position(|&b| b == b'\n') {
            Some(offset) => {
                let end = self.scanned + offset + 1;
                let line = self.buf.drain(..end).collect();
                self.scanned = 0;
                Some(line)
            }
            None => {
                self.scanned = self.buf.len();
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.buf.len()
    }

    fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}
