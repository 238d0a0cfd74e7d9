//! Server-sent event framing for streamed completions.

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::error::StreamError;

/// One decoded server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// What the event consumer wants after handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Done,
}

/// Incremental frame splitter.
///
/// Bytes are buffered until a blank line closes the event, so a frame (or a
/// multi-byte character) split across network chunks is decoded intact.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend(bytes.iter().copied().filter(|b| *b != b'\r'));

        let mut events = Vec::new();
        while let Some(idx) = find_frame_end(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..idx + 2).collect();
            if let Some(event) = parse_frame(&frame[..idx]) {
                events.push(event);
            }
        }
        events
    }

    /// Decode whatever is left once the body ends without a trailing blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.buffer);
        parse_frame(&rest)
    }
}

fn find_frame_end(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

fn parse_frame(frame: &[u8]) -> Option<SseEvent> {
    let text = String::from_utf8_lossy(frame);
    let mut event = None;
    let mut data: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event = Some(value.to_string()),
            "data" => data.push(value),
            _ => {}
        }
    }

    if data.is_empty() && event.is_none() {
        return None;
    }
    Some(SseEvent {
        event,
        data: data.join("\n"),
    })
}

/// Pull the response body to completion, handing each event to `on_event`.
///
/// Each network read is raced against `cancel`. The body is dropped, and
/// the connection released, on every return path.
pub(crate) async fn drive<F>(
    provider: &'static str,
    cancel: &CancellationToken,
    response: reqwest::Response,
    mut on_event: F,
) -> Result<(), StreamError>
where
    F: FnMut(SseEvent) -> Result<Flow, StreamError>,
{
    let mut body = response.bytes_stream();
    let mut decoder = SseDecoder::default();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StreamError::Cancelled { provider }),
            next = body.next() => next,
        };

        match next {
            Some(Ok(bytes)) => {
                for event in decoder.push(&bytes) {
                    if on_event(event)? == Flow::Done {
                        return Ok(());
                    }
                }
            }
            Some(Err(source)) => return Err(StreamError::Transport { provider, source }),
            None => {
                if let Some(event) = decoder.finish() {
                    on_event(event)?;
                }
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_complete_frames() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b"data: {\"a\":1}\n\ndata: [DONE]\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "{\"a\":1}");
        assert_eq!(events[1].data, "[DONE]");
    }

    #[test]
    fn test_buffers_frame_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"event: message_start\nda").is_empty());
        let events = decoder.push(b"ta: {\"x\":true}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.as_deref(), Some("message_start"));
        assert_eq!(events[0].data, "{\"x\":true}");
    }

    #[test]
    fn test_handles_crlf_and_comments() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b": keep-alive\r\n\r\ndata: hi\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hi");
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let bytes = "data: 你好\n\n".as_bytes();
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(&bytes[..8]).is_empty());
        let events = decoder.push(&bytes[8..]);
        assert_eq!(events[0].data, "你好");
    }

    #[test]
    fn test_finish_flushes_unterminated_frame() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: tail").is_empty());
        let event = decoder.finish().unwrap();
        assert_eq!(event.data, "tail");
        assert!(decoder.finish().is_none());
    }
}
