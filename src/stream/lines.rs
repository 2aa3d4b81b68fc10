/**
 * Buffered line reader over a streaming HTTP body
 *
 * Splits a never-ending byte stream on newlines, reassembling lines that
 * span network chunks, and supports cooperative cancellation from any task
 * while a read is blocked on the connection.
 */
use crate::error::{Error, Result};
use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;

/// Cloneable handle that requests graceful termination of a [`LineStream`]
/// from any other task, even while a read is blocked on the network.
#[derive(Debug, Clone)]
pub struct StreamFinisher {
    token: CancellationToken,
}

impl StreamFinisher {
    /// Asks the stream to stop. Level-triggered: calling this before the
    /// first read, or repeatedly, is safe and never lost.
    pub fn finish(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Lazy, unbounded, single-pass sequence of newline-terminated lines.
///
/// Once the underlying stream ends (EOF, [`StreamFinisher::finish`], or a
/// transport error) every further read reports end of stream; a new cycle
/// requires a new instance.
///
/// Known limitation: framing is strictly one document per line. A document
/// containing a literal embedded newline is mis-split by design, and a
/// trailing fragment with no terminator at EOF is discarded.
pub struct LineStream {
    body: BoxStream<'static, Result<Bytes>>,
    buffer: BytesMut,
    finish: CancellationToken,
    done: bool,
}

impl LineStream {
    /// Wraps an already-open byte-chunk stream.
    #[must_use]
    pub fn new(body: BoxStream<'static, Result<Bytes>>) -> Self {
        Self {
            body,
            buffer: BytesMut::new(),
            finish: CancellationToken::new(),
            done: false,
        }
    }

    /// Wraps the body of a streaming HTTP response. The caller has already
    /// verified the initial status line.
    #[must_use]
    pub fn from_response(response: reqwest::Response) -> Self {
        Self::new(response.bytes_stream().map_err(Error::from).boxed())
    }

    /// Handle for requesting termination from another task.
    #[must_use]
    pub fn finisher(&self) -> StreamFinisher {
        StreamFinisher { token: self.finish.clone() }
    }

    /// Next complete line with the terminator stripped, or `None` at end of
    /// stream. Empty lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the connection fails while no `finish()`
    /// request is pending; a failure after `finish()` was requested is
    /// reported as a clean end of stream.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            // drain lines already buffered before touching the network
            if let Some(line) = self.take_buffered_line() {
                if line.is_empty() {
                    continue;
                }
                return Ok(Some(line));
            }
            if self.done {
                return Ok(None);
            }

            tokio::select! {
                () = self.finish.cancelled() => {
                    self.done = true;
                    return Ok(None);
                }
                chunk = self.body.next() => match chunk {
                    Some(Ok(bytes)) => self.buffer.extend_from_slice(&bytes),
                    Some(Err(error)) => {
                        self.done = true;
                        if self.finish.is_cancelled() {
                            // expected fallout of forcing the connection closed
                            return Ok(None);
                        }
                        return Err(error);
                    }
                    None => {
                        self.done = true;
                        return Ok(None);
                    }
                },
            }
        }
    }

    fn take_buffered_line(&mut self) -> Option<String> {
        let position = self.buffer.iter().position(|&byte| byte == b'\n')?;
        let mut line = self.buffer.split_to(position + 1);
        line.truncate(position);
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

impl std::fmt::Debug for LineStream {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("LineStream")
            .field("buffered_bytes", &self.buffer.len())
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}
