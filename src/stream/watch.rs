use super::lines::{LineStream, StreamFinisher};
use crate::api::notice::WatchEvent;
use crate::error::Result;

/// Lazy, single-pass sequence of parsed watch notices off a streaming HTTP
/// connection. The JSON-per-line shape of [`LineStream`] with the watch
/// notice formatter applied; log following uses the raw [`LineStream`]
/// directly.
#[derive(Debug)]
pub struct WatchStream {
    lines: LineStream,
}

impl WatchStream {
    #[must_use]
    pub fn new(lines: LineStream) -> Self {
        Self { lines }
    }

    /// Wraps the body of an already-validated streaming HTTP response.
    #[must_use]
    pub fn from_response(response: reqwest::Response) -> Self {
        Self::new(LineStream::from_response(response))
    }

    /// Handle for requesting termination from another task, usable before
    /// the first read and while a read is blocked.
    #[must_use]
    pub fn finisher(&self) -> StreamFinisher {
        self.lines.finisher()
    }

    /// Next event, or `None` once the stream has ended.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` for a malformed line and transport errors per
    /// [`LineStream::next_line`].
    pub async fn next_event(&mut self) -> Result<Option<WatchEvent>> {
        match self.lines.next_line().await? {
            Some(line) => Ok(Some(WatchEvent::parse(&line)?)),
            None => Ok(None),
        }
    }
}
