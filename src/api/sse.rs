//! Server-Sent Events framing and stream consumption.
//!
//! All channels share one framing: events are blocks separated by a blank
//! line; within a block every `data:` line contributes to the payload,
//! joined with `\n`. Payloads are JSON on every channel except job logs,
//! which carry plain text.

use futures::StreamExt;
use futures::stream::BoxStream;
use serde::de::DeserializeOwned;

/// One decoded SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// The joined `data:` payload, exactly as sent.
    pub data: String,
}

impl SseEvent {
    /// Parse the payload as JSON.
    ///
    /// # Errors
    ///
    /// Returns the underlying JSON error for malformed payloads; callers
    /// log once and skip per the framing contract.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.data)
    }
}

/// Incremental SSE frame decoder.
///
/// Accepts chunks of arbitrary size and yields complete events as their
/// terminating blank line arrives. CR-LF line endings are tolerated.
#[derive(Debug, Default)]
pub struct SseFrameDecoder {
    buf: String,
}

impl SseFrameDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.push_str(&String::from_utf8_lossy(chunk));

        let mut events = Vec::new();
        while let Some((end, sep_len)) = find_event_boundary(&self.buf) {
            let block = self.buf[..end].to_owned();
            self.buf.drain(..end + sep_len);
            if let Some(event) = parse_event_block(&block) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing event that was never terminated by a blank line.
    ///
    /// Called when the peer closes the stream mid-event.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let block = std::mem::take(&mut self.buf);
        parse_event_block(&block)
    }
}

/// Find the earliest event boundary (`\n\n` or `\r\n\r\n`).
fn find_event_boundary(buf: &str) -> Option<(usize, usize)> {
    let lf = buf.find("\n\n").map(|i| (i, 2));
    let crlf = buf.find("\r\n\r\n").map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (Some(b), None) | (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

/// Extract the event payload from one block of lines.
///
/// Only `data:` fields carry payload; other fields and comments are
/// ignored. Returns `None` for blocks without any data line.
fn parse_event_block(block: &str) -> Option<SseEvent> {
    let mut datas: Vec<&str> = Vec::new();
    for line in block.lines() {
        if let Some(rest) = line.strip_prefix("data:") {
            datas.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if datas.is_empty() {
        return None;
    }
    Some(SseEvent {
        data: datas.join("\n"),
    })
}

/// Outcome of one read on an [`SseStream`].
#[derive(Debug)]
pub enum SseRead {
    /// A complete event arrived.
    Event(SseEvent),
    /// The peer closed the stream; reported exactly once.
    Closed,
    /// The transport failed; reported exactly once, then the stream is closed.
    Failed(String),
}

/// A live SSE stream over an HTTP response body.
pub struct SseStream {
    url: String,
    body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: SseFrameDecoder,
    pending: std::collections::VecDeque<SseEvent>,
    done: bool,
    malformed_logged: bool,
}

impl std::fmt::Debug for SseStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SseStream")
            .field("url", &self.url)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl SseStream {
    /// Wrap an already-validated streaming response.
    #[must_use]
    pub fn from_response(url: String, response: reqwest::Response) -> Self {
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .boxed();
        Self {
            url,
            body,
            decoder: SseFrameDecoder::new(),
            pending: std::collections::VecDeque::new(),
            done: false,
            malformed_logged: false,
        }
    }

    /// The URL this stream was opened against.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Read the next event, suspending until one arrives.
    ///
    /// After the first `Closed` or `Failed`, every further call returns
    /// `Closed` immediately.
    pub async fn next(&mut self) -> SseRead {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return SseRead::Event(event);
            }
            if self.done {
                return SseRead::Closed;
            }

            match self.body.next().await {
                Some(Ok(chunk)) => {
                    self.pending.extend(self.decoder.push(&chunk));
                }
                Some(Err(e)) => {
                    self.done = true;
                    return SseRead::Failed(format!("stream from {} failed: {e}", self.url));
                }
                None => {
                    self.done = true;
                    if let Some(event) = self.decoder.finish() {
                        return SseRead::Event(event);
                    }
                    return SseRead::Closed;
                }
            }
        }
    }

    /// Parse an event as JSON, logging the first malformed payload on this
    /// stream and skipping it (returns `None`).
    pub fn json_or_skip<T: DeserializeOwned>(&mut self, event: &SseEvent) -> Option<T> {
        match event.json() {
            Ok(value) => Some(value),
            Err(e) => {
                if !self.malformed_logged {
                    self.malformed_logged = true;
                    tracing::warn!(url = %self.url, error = %e, "skipping malformed SSE payload");
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(decoder: &mut SseFrameDecoder, chunks: &[&str]) -> Vec<String> {
        let mut out = Vec::new();
        for chunk in chunks {
            out.extend(decoder.push(chunk.as_bytes()).into_iter().map(|e| e.data));
        }
        out
    }

    #[test]
    fn decodes_single_event() {
        let mut decoder = SseFrameDecoder::new();
        let events = collect(&mut decoder, &["data: {\"a\":1}\n\n"]);
        assert_eq!(events, vec!["{\"a\":1}"]);
    }

    #[test]
    fn joins_multiple_data_lines_with_newline() {
        let mut decoder = SseFrameDecoder::new();
        let events = collect(&mut decoder, &["data: line one\ndata: line two\n\n"]);
        assert_eq!(events, vec!["line one\nline two"]);
    }

    #[test]
    fn handles_arbitrary_chunk_boundaries() {
        let mut decoder = SseFrameDecoder::new();
        let events = collect(
            &mut decoder,
            &["da", "ta: {\"x\"", ":2}", "\n", "\ndata: next\n", "\n"],
        );
        assert_eq!(events, vec!["{\"x\":2}", "next"]);
    }

    #[test]
    fn tolerates_crlf_framing() {
        let mut decoder = SseFrameDecoder::new();
        let events = collect(&mut decoder, &["data: a\r\n\r\ndata: b\r\n\r\n"]);
        assert_eq!(events, vec!["a", "b"]);
    }

    #[test]
    fn ignores_comments_and_other_fields() {
        let mut decoder = SseFrameDecoder::new();
        let events = collect(
            &mut decoder,
            &[": keepalive\n\n", "event: message\nid: 7\ndata: payload\n\n"],
        );
        assert_eq!(events, vec!["payload"]);
    }

    #[test]
    fn multiple_events_in_one_chunk() {
        let mut decoder = SseFrameDecoder::new();
        let events = collect(&mut decoder, &["data: 1\n\ndata: 2\n\ndata: 3\n\n"]);
        assert_eq!(events, vec!["1", "2", "3"]);
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut decoder = SseFrameDecoder::new();
        assert!(decoder.push(b"data: tail").is_empty());
        let event = decoder.finish().unwrap();
        assert_eq!(event.data, "tail");
        assert!(decoder.finish().is_none(), "finish drains the buffer");
    }

    #[test]
    fn data_without_space_is_accepted() {
        let mut decoder = SseFrameDecoder::new();
        let events = collect(&mut decoder, &["data:tight\n\n"]);
        assert_eq!(events, vec!["tight"]);
    }

    #[test]
    fn event_json_round_trips() {
        let event = SseEvent {
            data: "{\"type\":\"done\"}".to_owned(),
        };
        let value: serde_json::Value = event.json().unwrap();
        assert_eq!(value["type"], "done");
        assert!(
            SseEvent { data: "not json".to_owned() }.json::<serde_json::Value>().is_err(),
            "malformed payloads surface the parse error"
        );
    }
}
