//! Incremental Server-Sent-Events decoding for streamed assistant replies.
//!
//! The assistant endpoint streams newline-delimited `data: <json>` frames.
//! Chunk boundaries from the transport are arbitrary: they can fall inside a
//! multi-byte UTF-8 character, inside a line, or inside a JSON payload. The
//! [`SseDecoder`] absorbs raw chunks and emits [`StreamEvent`]s once complete
//! frames become available.

use serde::Deserialize;
use tracing::warn;

/// Payload value signalling the producer has finished sending deltas.
const DONE_SENTINEL: &str = "[DONE]";

const DATA_PREFIX: &str = "data: ";

/// Bound on buffered-but-unresolved data. A frame that has still not parsed
/// once the buffer grows past this is dropped instead of buffering without
/// limit on a persistently malformed stream.
const MAX_PENDING_BYTES: usize = 1024 * 1024;

/// An event produced while decoding a streamed reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A non-empty fragment of assistant text, in arrival order.
    Delta(String),
    /// The terminator sentinel was observed.
    Done,
}

/// Scanner state carried across `push` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ScanState {
    /// Consuming complete lines as they appear.
    #[default]
    Scanning,
    /// A `data:` line arrived whose JSON payload did not parse. The line has
    /// been pushed back onto the buffer; scanning resumes on the next chunk.
    AwaitingMoreBytesForFrame,
}

/// Stateful SSE decoder. One instance per response stream; not reusable.
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Decoded text not yet consumed as complete lines.
    buffer: String,
    /// Trailing bytes of an incomplete UTF-8 sequence, carried to the next
    /// chunk so a character split across chunks decodes intact.
    carry: Vec<u8>,
    state: ScanState,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the `[DONE]` sentinel has been observed.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Absorb a chunk of raw bytes and return the events it completes.
    ///
    /// Deltas are emitted one per frame, in arrival order, never batched.
    /// After [`StreamEvent::Done`] has been returned, further pushes are
    /// no-ops.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        if self.done {
            return Vec::new();
        }
        self.decode_into_buffer(chunk);
        // New bytes may complete a previously unparseable frame.
        self.state = ScanState::Scanning;
        self.scan()
    }

    /// End-of-stream flush. Processes any trailing newline-less line on a
    /// best-effort basis; a pending frame that never parsed is dropped.
    ///
    /// A stream that ends without ever sending the sentinel is still a normal
    /// completion: some providers close the socket instead.
    pub fn finish(mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }
        for line in std::mem::take(&mut self.buffer).lines() {
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
                continue;
            };
            let payload = payload.trim();
            if payload == DONE_SENTINEL {
                events.push(StreamEvent::Done);
                break;
            }
            // No more bytes are coming, so a parse failure here is final.
            if let Ok(chunk) = serde_json::from_str::<CompletionChunk>(payload) {
                if let Some(text) = chunk.first_content() {
                    if !text.is_empty() {
                        events.push(StreamEvent::Delta(text));
                    }
                }
            }
        }
        events
    }

    /// Decode `chunk` into the text buffer, carrying over any incomplete
    /// trailing multi-byte sequence. Invalid (not merely incomplete) byte
    /// sequences are replaced lossily rather than failing the stream.
    fn decode_into_buffer(&mut self, chunk: &[u8]) {
        let mut bytes = std::mem::take(&mut self.carry);
        bytes.extend_from_slice(chunk);
        let split = bytes.len() - incomplete_suffix_len(&bytes);
        self.carry = bytes.split_off(split);
        self.buffer.push_str(&String::from_utf8_lossy(&bytes));
    }

    fn scan(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        while self.state == ScanState::Scanning && !self.done {
            let Some(newline) = self.buffer.find('\n') else {
                break;
            };
            let mut line: String = self.buffer.drain(..=newline).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }

            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
                // Unrecognized frame type; skip.
                continue;
            };
            let payload = payload.trim();

            if payload == DONE_SENTINEL {
                self.done = true;
                events.push(StreamEvent::Done);
                break;
            }

            match serde_json::from_str::<CompletionChunk>(payload) {
                Ok(chunk) => {
                    if let Some(text) = chunk.first_content() {
                        if !text.is_empty() {
                            events.push(StreamEvent::Delta(text));
                        }
                    }
                }
                Err(_) => {
                    // The frame may have been split in a way that broke JSON
                    // syntax but not line syntax. Push the line back and wait
                    // for more bytes; if it never resolves it is dropped at
                    // finish().
                    self.buffer.insert(0, '\n');
                    self.buffer.insert_str(0, &line);
                    self.state = ScanState::AwaitingMoreBytesForFrame;
                }
            }
        }

        if self.buffer.len() > MAX_PENDING_BYTES {
            warn!(
                pending_bytes = self.buffer.len(),
                "dropping unresolved SSE data past buffer bound"
            );
            self.buffer.clear();
            self.state = ScanState::Scanning;
        }

        events
    }
}

/// Number of trailing bytes forming the prefix of an incomplete UTF-8
/// sequence. Returns 0 when the slice ends on a character boundary or ends
/// with bytes that can never complete (left for lossy replacement).
fn incomplete_suffix_len(bytes: &[u8]) -> usize {
    let len = bytes.len();
    let start = len.saturating_sub(3);
    for i in (start..len).rev() {
        let b = bytes[i];
        if b < 0x80 {
            return 0;
        }
        if b >= 0xC0 {
            let need = if b >= 0xF0 {
                4
            } else if b >= 0xE0 {
                3
            } else {
                2
            };
            let have = len - i;
            return if have < need { have } else { 0 };
        }
        // Continuation byte; keep scanning back for the lead byte.
    }
    0
}

// Wire shape of a streamed completion frame. Only the first choice's delta
// content is read; everything else is ignored.

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Deserialize, Default)]
struct ChunkDelta {
    content: Option<String>,
}

impl CompletionChunk {
    fn first_content(self) -> Option<String> {
        self.choices.into_iter().next().and_then(|c| c.delta.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta_frame(text: &str) -> String {
        format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":{}}}}}]}}\n\n",
            serde_json::to_string(text).unwrap()
        )
    }

    fn deltas(events: &[StreamEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Delta(t) => Some(t.as_str()),
                StreamEvent::Done => None,
            })
            .collect()
    }

    #[test]
    fn single_chunk_delivery() {
        let mut decoder = SseDecoder::new();
        let body = format!("{}data: [DONE]\n\n", delta_frame("Hi"));

        let events = decoder.push(body.as_bytes());

        assert_eq!(
            events,
            vec![StreamEvent::Delta("Hi".into()), StreamEvent::Done]
        );
        assert!(decoder.is_done());
    }

    #[test]
    fn deltas_arrive_in_order() {
        let mut decoder = SseDecoder::new();
        let body = format!(
            "{}{}{}",
            delta_frame("One "),
            delta_frame("two "),
            delta_frame("three")
        );

        let events = decoder.push(body.as_bytes());

        assert_eq!(deltas(&events), vec!["One ", "two ", "three"]);
    }

    #[test]
    fn frame_split_mid_json_emits_once() {
        let mut decoder = SseDecoder::new();

        let first = decoder.push(b"data: {\"choices\":[{\"delta\":{\"con");
        assert!(first.is_empty());

        let second = decoder.push(b"tent\":\"Hi\"}}]}\n\n");
        assert_eq!(second, vec![StreamEvent::Delta("Hi".into())]);
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let frame = delta_frame("n\u{00b0}1");
        let bytes = frame.as_bytes();
        // Split inside the two-byte degree sign.
        let split = frame.find('\u{00b0}').unwrap() + 1;

        let first = decoder.push(&bytes[..split]);
        assert!(first.is_empty());

        let second = decoder.push(&bytes[split..]);
        assert_eq!(second, vec![StreamEvent::Delta("n\u{00b0}1".into())]);
    }

    #[test]
    fn comment_and_blank_lines_are_ignored() {
        let mut decoder = SseDecoder::new();
        let body = format!(
            ": keep-alive\n\n{}: another heartbeat\n{}",
            delta_frame("a"),
            delta_frame("b")
        );

        let events = decoder.push(body.as_bytes());

        assert_eq!(deltas(&events), vec!["a", "b"]);
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let mut decoder = SseDecoder::new();

        let events = decoder
            .push(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\r\n\r\ndata: [DONE]\r\n");

        assert_eq!(
            events,
            vec![StreamEvent::Delta("Hi".into()), StreamEvent::Done]
        );
    }

    #[test]
    fn unrecognized_frame_types_are_skipped() {
        let mut decoder = SseDecoder::new();
        let body = format!("event: ping\nid: 42\n{}", delta_frame("Hi"));

        let events = decoder.push(body.as_bytes());

        assert_eq!(events, vec![StreamEvent::Delta("Hi".into())]);
    }

    #[test]
    fn missing_delta_fields_are_a_no_op() {
        let mut decoder = SseDecoder::new();

        let events = decoder.push(
            b"data: {\"choices\":[{\"delta\":{}}]}\n\ndata: {\"choices\":[]}\n\ndata: {}\n\n",
        );

        assert!(events.is_empty());
    }

    #[test]
    fn empty_content_is_not_emitted() {
        let mut decoder = SseDecoder::new();

        let events = decoder.push(b"data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n\n");

        assert!(events.is_empty());
    }

    #[test]
    fn nothing_is_consumed_after_done() {
        let mut decoder = SseDecoder::new();
        decoder.push(b"data: [DONE]\n\n");

        let after = decoder.push(delta_frame("late").as_bytes());

        assert!(after.is_empty());
    }

    #[test]
    fn finish_processes_trailing_line_without_newline() {
        let mut decoder = SseDecoder::new();
        let frame = delta_frame("tail");
        decoder.push(frame.trim_end().as_bytes());

        let events = decoder.finish();

        assert_eq!(events, vec![StreamEvent::Delta("tail".into())]);
    }

    #[test]
    fn finish_drops_frame_that_never_parsed() {
        let mut decoder = SseDecoder::new();
        let mid = decoder.push(b"data: {\"choices\":[{\"delta\"\n");
        assert!(mid.is_empty());

        let events = decoder.finish();

        assert!(events.is_empty());
    }

    #[test]
    fn unparseable_line_is_rebuffered_not_discarded() {
        let mut decoder = SseDecoder::new();
        // Line syntax is intact but the JSON is truncated; the decoder parks
        // the line rather than dropping it.
        let first = decoder.push(b"data: {\"choices\":[{\"delta\"\n");
        assert!(first.is_empty());

        // Later frames still come through.
        let later = decoder.push(delta_frame("ok").as_bytes());
        assert_eq!(deltas(&later), vec!["ok"]);
    }

    #[test]
    fn pending_data_is_bounded() {
        let mut decoder = SseDecoder::new();
        // A single malformed data line far past the bound, never terminated.
        let mut body = String::from("data: {\"choices\": [\n");
        body.push_str(&"x".repeat(2 * 1024 * 1024));
        let events = decoder.push(body.as_bytes());

        assert!(events.is_empty());
        assert!(decoder.buffer.len() <= MAX_PENDING_BYTES);
    }

    #[test]
    fn incomplete_suffix_detection() {
        assert_eq!(incomplete_suffix_len(b"abc"), 0);
        assert_eq!(incomplete_suffix_len("é".as_bytes()), 0);
        assert_eq!(incomplete_suffix_len(&"é".as_bytes()[..1]), 1);
        assert_eq!(incomplete_suffix_len(&"€".as_bytes()[..2]), 2);
        assert_eq!(incomplete_suffix_len(&"🦀".as_bytes()[..3]), 3);
        // Stray continuation bytes can never complete.
        assert_eq!(incomplete_suffix_len(&[0x80, 0x80]), 0);
    }
}
