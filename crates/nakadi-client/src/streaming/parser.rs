//! Newline-delimited frame parser
//!
//! Splits the chunked stream body into frames and decodes each frame as an
//! [`EventBatch`]. Chunk boundaries carry no meaning: a frame may span many
//! chunks and a chunk may hold many frames.

use bytes::{Bytes, BytesMut};
use tracing::trace;

use super::types::{EventBatch, StreamError, StreamResult};

/// Maximum number of frame bytes echoed in a decode error
const MAX_LINE_PREVIEW: usize = 100;

/// Largest frame accepted when none is configured
pub const DEFAULT_MAX_FRAME_SIZE: usize = 32 * 1024 * 1024;

/// Frame parser state
#[derive(Debug)]
pub struct FrameParser {
    /// Bytes of the frame currently being received
    buffer: BytesMut,

    /// Prefix of `buffer` already searched for a newline
    scanned: usize,

    max_frame_size: usize,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl FrameParser {
    /// Create a new frame parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser that rejects frames longer than `max_frame_size` bytes
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            scanned: 0,
            max_frame_size,
        }
    }

    /// Feed a chunk and decode every frame it completes.
    ///
    /// Heartbeat frames (no events) are dropped. Decoding stops at the first
    /// malformed or oversized frame, which is returned as the last element.
    pub fn feed(&mut self, chunk: Bytes) -> Vec<StreamResult<EventBatch>> {
        self.buffer.extend_from_slice(&chunk);

        let mut batches = Vec::new();
        while let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') {
            let pos = self.scanned + offset;
            self.scanned = 0;

            if pos > self.max_frame_size {
                batches.push(Err(self.too_large(pos)));
                return batches;
            }

            let line = self.buffer.split_to(pos + 1);
            match decode_frame(&line[..pos]) {
                Some(Err(e)) => {
                    batches.push(Err(e));
                    return batches;
                }
                Some(Ok(batch)) => batches.push(Ok(batch)),
                None => {}
            }
        }

        self.scanned = self.buffer.len();
        if self.buffer.len() > self.max_frame_size {
            let size = self.buffer.len();
            batches.push(Err(self.too_large(size)));
        }

        batches
    }

    /// Decode whatever is left once the body has ended.
    ///
    /// A final frame is not required to carry a trailing newline.
    pub fn finish(&mut self) -> Option<StreamResult<EventBatch>> {
        self.scanned = 0;
        let rest = self.buffer.split();
        decode_frame(&rest)
    }

    /// Drop the pending bytes and report an oversized frame
    fn too_large(&mut self, size: usize) -> StreamError {
        self.buffer = BytesMut::new();
        self.scanned = 0;
        StreamError::FrameTooLarge {
            size,
            limit: self.max_frame_size,
        }
    }
}

/// Decode a single frame; `None` for blank lines and heartbeats
fn decode_frame(line: &[u8]) -> Option<StreamResult<EventBatch>> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.iter().all(u8::is_ascii_whitespace) {
        return None;
    }

    match serde_json::from_slice::<EventBatch>(line) {
        Ok(batch) if batch.is_heartbeat() => {
            trace!(partition = %batch.cursor.partition, "Heartbeat frame");
            None
        }
        Ok(batch) => Some(Ok(batch)),
        Err(source) => Some(Err(StreamError::Decode {
            line: preview(line),
            source,
        })),
    }
}

fn preview(line: &[u8]) -> String {
    let text = String::from_utf8_lossy(line);
    match text.char_indices().nth(MAX_LINE_PREVIEW) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BATCH: &[u8] = br#"{"cursor":{"partition":"0","offset":"001-0001-000000000000000001","event_type":"test","cursor_token":"t1"},"events":[{"id":1}]}"#;

    fn frame(bytes: &[u8]) -> Bytes {
        let mut line = bytes.to_vec();
        line.push(b'\n');
        Bytes::from(line)
    }

    #[test]
    fn test_parse_single_frame() {
        let mut parser = FrameParser::new();

        let batches = parser.feed(frame(BATCH));

        assert_eq!(batches.len(), 1);
        let batch = batches[0].as_ref().unwrap();
        assert_eq!(batch.cursor.partition, "0");
        assert_eq!(batch.cursor.cursor_token, "t1");
        assert_eq!(batch.events.len(), 1);
    }

    #[test]
    fn test_parse_multiple_frames_in_one_chunk() {
        let mut parser = FrameParser::new();

        let mut chunk = frame(BATCH).to_vec();
        chunk.extend_from_slice(&frame(BATCH));
        let batches = parser.feed(Bytes::from(chunk));

        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn test_parse_frame_split_across_chunks() {
        let mut parser = FrameParser::new();
        let (head, tail) = BATCH.split_at(40);

        assert!(parser.feed(Bytes::copy_from_slice(head)).is_empty());
        let batches = parser.feed(frame(tail));

        assert_eq!(batches.len(), 1);
        assert!(batches[0].is_ok());
    }

    #[test]
    fn test_skip_heartbeats_and_blank_lines() {
        let mut parser = FrameParser::new();
        let heartbeat = br#"{"cursor":{"partition":"0","offset":"BEGIN","event_type":"test","cursor_token":"t0"}}"#;

        let mut chunk = frame(heartbeat).to_vec();
        chunk.extend_from_slice(b"\r\n\n");
        chunk.extend_from_slice(&frame(BATCH));
        let batches = parser.feed(Bytes::from(chunk));

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].as_ref().unwrap().cursor.cursor_token, "t1");
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut parser = FrameParser::new();

        let mut chunk = BATCH.to_vec();
        chunk.extend_from_slice(b"\r\n");
        let batches = parser.feed(Bytes::from(chunk));

        assert_eq!(batches.len(), 1);
        assert!(batches[0].is_ok());
    }

    #[test]
    fn test_malformed_frame_stops_decoding() {
        let mut parser = FrameParser::new();

        let mut chunk = frame(b"{not json").to_vec();
        chunk.extend_from_slice(&frame(BATCH));
        let batches = parser.feed(Bytes::from(chunk));

        assert_eq!(batches.len(), 1);
        match &batches[0] {
            Err(StreamError::Decode { line, .. }) => assert_eq!(line, "{not json"),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_finish_decodes_unterminated_frame() {
        let mut parser = FrameParser::new();

        assert!(parser.feed(Bytes::from_static(BATCH)).is_empty());
        let last = parser.finish().unwrap();

        assert!(last.is_ok());
        assert!(parser.finish().is_none());
    }

    #[test]
    fn test_large_frame_in_small_chunks() {
        let mut parser = FrameParser::new();

        let events: Vec<String> = (0..250_000).map(|i| format!("{{\"id\":{}}}", i)).collect();
        let body = format!(
            r#"{{"cursor":{{"partition":"0","offset":"1","event_type":"test","cursor_token":"t1"}},"events":[{}]}}"#,
            events.join(",")
        );
        let line = frame(body.as_bytes());
        assert!(line.len() > 2 * 1024 * 1024);

        let mut batches = Vec::new();
        for chunk in line.chunks(1024) {
            batches.extend(parser.feed(Bytes::copy_from_slice(chunk)));
        }

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].as_ref().unwrap().events.len(), 250_000);
        assert_eq!(parser.scanned, 0);
        assert!(parser.buffer.is_empty());
    }

    #[test]
    fn test_scan_resumes_after_partial_chunk() {
        let mut parser = FrameParser::new();
        let (head, tail) = BATCH.split_at(60);

        assert!(parser.feed(Bytes::copy_from_slice(head)).is_empty());
        assert_eq!(parser.scanned, 60);

        let mut rest = frame(tail).to_vec();
        rest.extend_from_slice(&BATCH[..10]);
        let batches = parser.feed(Bytes::from(rest));

        assert_eq!(batches.len(), 1);
        assert_eq!(parser.scanned, 10);
    }

    #[test]
    fn test_unterminated_frame_over_limit_is_terminal() {
        let mut parser = FrameParser::with_max_frame_size(4096);

        let mut results = Vec::new();
        for _ in 0..8 {
            results.extend(parser.feed(Bytes::from(vec![b'x'; 1024])));
            if !results.is_empty() {
                break;
            }
        }

        assert_eq!(results.len(), 1);
        match &results[0] {
            Err(StreamError::FrameTooLarge { size, limit }) => {
                assert_eq!(*size, 5 * 1024);
                assert_eq!(*limit, 4096);
            }
            other => panic!("expected oversized frame error, got {:?}", other),
        }
        assert!(parser.buffer.is_empty());
    }

    #[test]
    fn test_terminated_frame_over_limit_is_rejected() {
        let mut parser = FrameParser::with_max_frame_size(BATCH.len() - 1);

        let mut chunk = frame(BATCH).to_vec();
        chunk.extend_from_slice(&frame(BATCH));
        let batches = parser.feed(Bytes::from(chunk));

        assert_eq!(batches.len(), 1);
        assert!(matches!(batches[0], Err(StreamError::FrameTooLarge { .. })));
    }

    #[test]
    fn test_frame_at_limit_is_accepted() {
        let mut parser = FrameParser::with_max_frame_size(BATCH.len());

        let batches = parser.feed(frame(BATCH));

        assert_eq!(batches.len(), 1);
        assert!(batches[0].is_ok());
    }

    #[test]
    fn test_long_line_preview_is_truncated() {
        let line = "x".repeat(500);
        let shown = preview(line.as_bytes());

        assert_eq!(shown.len(), MAX_LINE_PREVIEW + 3);
    }
}
