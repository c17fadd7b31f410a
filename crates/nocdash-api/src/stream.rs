//! Server-sent-event stream for alarm investigations.
//!
//! The backend emits frames of the form `data: <json>\n\n` where the
//! JSON carries a `type` tag: `content` chunks, a terminal `done`, or a
//! terminal `error`. Chunk boundaries are arbitrary — a frame may span
//! several network reads, and one read may carry several frames — so we
//! buffer bytes and split on the blank-line delimiter ourselves.

use bytes::Bytes;
use futures_core::Stream;
use futures_util::StreamExt;
use serde::Deserialize;
use tracing::warn;

use crate::Error;

/// One parsed event from an investigation stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A chunk of investigation text, to be appended in arrival order.
    Content { text: String },
    /// Normal end of stream. No further events follow.
    Done,
    /// Backend-reported failure. Terminal, like `Done`.
    Error { message: String },
}

impl StreamEvent {
    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }
}

type ByteStream = std::pin::Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// Handle over a live investigation SSE connection.
///
/// Drive it with [`next_event`](Self::next_event); drop it to abort the
/// underlying request. After a terminal event (or an error) it yields
/// `None` forever.
pub struct InvestigationStream {
    bytes: ByteStream,
    buffer: Vec<u8>,
    finished: bool,
}

// The inner byte stream is opaque; show the parser state instead.
impl std::fmt::Debug for InvestigationStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvestigationStream")
            .field("buffered", &self.buffer.len())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl InvestigationStream {
    pub(crate) fn new<S>(bytes: S) -> Self
    where
        S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    {
        Self {
            bytes: Box::pin(bytes),
            buffer: Vec::new(),
            finished: false,
        }
    }

    /// Next parsed event, or `None` once the stream has ended.
    ///
    /// A transport failure mid-stream is reported once as
    /// [`Error::Stream`]; the stream is finished afterwards. Frames that
    /// don't parse as a known event are skipped with a warning rather
    /// than killing the stream, matching how browsers treat unknown SSE
    /// data.
    pub async fn next_event(&mut self) -> Option<Result<StreamEvent, Error>> {
        if self.finished {
            return None;
        }

        loop {
            if let Some(event) = self.drain_frame() {
                if event.is_terminal() {
                    self.finished = true;
                }
                return Some(Ok(event));
            }

            match self.bytes.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(Error::Stream(e.to_string())));
                }
                None => {
                    // Connection closed without a terminal frame.
                    self.finished = true;
                    if !self.buffer.is_empty() {
                        warn!(
                            bytes = self.buffer.len(),
                            "investigation stream closed with partial frame in buffer"
                        );
                    }
                    return None;
                }
            }
        }
    }

    /// Pop the next complete `data:` frame out of the buffer, if any.
    fn drain_frame(&mut self) -> Option<StreamEvent> {
        loop {
            let end = find_frame_end(&self.buffer)?;
            let frame: Vec<u8> = self.buffer.drain(..end.frame_len).collect();
            self.buffer.drain(..end.delimiter_len);

            let text = String::from_utf8_lossy(&frame);
            if let Some(event) = parse_frame(&text) {
                return Some(event);
            }
            // Comment frames, keep-alives, unknown payloads: skip.
        }
    }

    /// Adapt into a plain `Stream` of events.
    pub fn into_stream(mut self) -> impl Stream<Item = Result<StreamEvent, Error>> + Send {
        async_stream::stream! {
            while let Some(item) = self.next_event().await {
                yield item;
            }
        }
    }
}

struct FrameEnd {
    frame_len: usize,
    delimiter_len: usize,
}

/// Locate the first `\n\n` or `\r\n\r\n` delimiter in `buf`.
fn find_frame_end(buf: &[u8]) -> Option<FrameEnd> {
    let mut i = 0;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' && buf[i + 1] == b'\n' {
            return Some(FrameEnd {
                frame_len: i,
                delimiter_len: 2,
            });
        }
        if i + 3 < buf.len() && buf[i..i + 4] == *b"\r\n\r\n" {
            return Some(FrameEnd {
                frame_len: i,
                delimiter_len: 4,
            });
        }
        i += 1;
    }
    None
}

/// Parse one SSE frame body into an event.
///
/// Multi-line frames concatenate their `data:` lines before JSON
/// parsing, per the SSE spec. Non-`data` fields (`event:`, `id:`,
/// comments) are ignored.
fn parse_frame(frame: &str) -> Option<StreamEvent> {
    let mut data = String::new();
    for line in frame.lines() {
        if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if data.is_empty() {
        return None;
    }

    match serde_json::from_str::<StreamEvent>(&data) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, payload = %data, "skipping unparseable stream frame");
            None
        }
    }
}
