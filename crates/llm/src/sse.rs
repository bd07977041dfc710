//! Incremental server-sent-events decoding of the Messages stream.
//!
//! Network chunks do not line up with event boundaries, so bytes are buffered
//! until a full line is available and lines are grouped into events at each
//! blank line.

use futures_util::{Stream, StreamExt};

use crate::ai_types::StreamEvent;
use crate::client::truncate;
use crate::error::LlmError;

/// One decoded SSE event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Feeds raw bytes and returns every event completed by them.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.push_line(line) {
                events.push(event);
            }
        }
        events
    }

    /// Flushes a trailing event that was not followed by a blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest).into_owned();
            if let Some(event) = self.push_line(line.trim_end_matches('\r')) {
                return Some(event);
            }
        }
        self.take_event()
    }

    fn push_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.take_event();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "event" => self.event = Some(value.to_owned()),
            "data" => self.data.push(value.to_owned()),
            _ => {},
        }
        None
    }

    fn take_event(&mut self) -> Option<SseEvent> {
        if self.event.is_none() && self.data.is_empty() {
            return None;
        }
        let event = SseEvent { event: self.event.take(), data: self.data.join("\n") };
        self.data.clear();
        Some(event)
    }
}

/// What one Messages API event means for the text stream.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Delta {
    Text(String),
    Stop,
    Skip,
}

pub(crate) fn interpret(event: &SseEvent) -> Result<Delta, LlmError> {
    if event.data.is_empty() {
        return Ok(Delta::Skip);
    }
    let parsed: StreamEvent = serde_json::from_str(&event.data).map_err(|e| {
        LlmError::Decode {
            context: format!("stream event (data: {})", truncate(&event.data, 200)),
            source: e,
        }
    })?;
    match parsed.event_type.as_str() {
        "content_block_delta" => Ok(parsed
            .delta
            .and_then(|d| d.text)
            .filter(|t| !t.is_empty())
            .map_or(Delta::Skip, Delta::Text)),
        "message_stop" => Ok(Delta::Stop),
        "error" => {
            let body = parsed.error.unwrap_or_else(|| crate::ai_types::StreamErrorBody {
                error_type: String::from("unknown"),
                message: String::new(),
            });
            Err(LlmError::Stream(format!("{}: {}", body.error_type, body.message)))
        },
        _ => Ok(Delta::Skip),
    }
}

/// Turns a streamed response body into a stream of text deltas.
pub(crate) fn text_deltas<S, B>(body: S) -> crate::ChunkStream
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut decoder = SseDecoder::default();
        let mut body = Box::pin(body);
        let mut stopped = false;
        'read: while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    yield Err::<String, LlmError>(LlmError::Request(e));
                    stopped = true;
                    break 'read;
                },
            };
            for event in decoder.feed(chunk.as_ref()) {
                match interpret(&event) {
                    Ok(Delta::Text(text)) => yield Ok(text),
                    Ok(Delta::Stop) => stopped = true,
                    Ok(Delta::Skip) => {},
                    Err(e) => {
                        yield Err(e);
                        stopped = true;
                        break 'read;
                    },
                }
            }
            if stopped {
                break;
            }
        }
        if !stopped {
            if let Some(event) = decoder.finish() {
                match interpret(&event) {
                    Ok(Delta::Text(text)) => yield Ok(text),
                    Ok(_) => {},
                    Err(e) => yield Err(e),
                }
            }
        }
    })
}
