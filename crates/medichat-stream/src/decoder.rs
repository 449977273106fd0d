//! Incremental decoder for chat-completion event streams
//!
//! Bytes arrive with no alignment to lines or events. The decoder keeps one
//! text buffer across chunks, cuts it at line terminators and turns each
//! `data:` line into a text delta.

use std::pin::Pin;

use futures::{Stream, StreamExt};
use medichat_models::ChatCompletionChunk;
use tracing::{debug, warn};

use crate::error::{Result, StreamError};
use crate::utf8::Utf8Decoder;

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";

/// Chunks a pushed-back line may wait for before it is dropped
const MAX_LINE_RETRIES: u32 = 3;

/// A decoded provider event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// Incremental assistant text
    Delta(String),
    /// No further deltas follow
    End(StreamEnd),
}

impl StreamFrame {
    pub fn as_delta(&self) -> Option<&str> {
        match self {
            StreamFrame::Delta(text) => Some(text),
            StreamFrame::End(_) => None,
        }
    }
}

/// How a stream terminated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// The `[DONE]` sentinel was received
    Done,
    /// The transport closed on a line boundary without a sentinel
    Closed,
    /// The transport closed in the middle of an event
    Truncated { tail: String },
}

impl StreamEnd {
    pub fn is_truncated(&self) -> bool {
        matches!(self, StreamEnd::Truncated { .. })
    }
}

/// Boxed stream of decoded frames
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<StreamFrame>> + Send>>;

#[derive(Debug, Default)]
pub struct SseDecoder {
    utf8: Utf8Decoder,
    buffer: String,
    /// Number of chunks the line at the head of `buffer` has failed to parse on
    held_retries: u32,
    dropped_lines: usize,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the `[DONE]` sentinel has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Lines discarded after failing to parse on repeated chunks
    pub fn dropped_lines(&self) -> usize {
        self.dropped_lines
    }

    /// Decode one chunk and return the frames it completes.
    ///
    /// After `[DONE]` further input is ignored.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        let mut frames = Vec::new();
        if self.done {
            return frames;
        }

        let text = self.utf8.decode(chunk);
        self.buffer.push_str(&text);
        self.drain_lines(&mut frames, false);

        if self.done {
            frames.push(StreamFrame::End(StreamEnd::Done));
        }
        frames
    }

    /// Decode the terminated lines still buffered at end of input and
    /// classify the end. Lines that fail to parse are dropped since no more
    /// bytes will arrive; only an unterminated remainder counts as truncation.
    pub fn finish(&mut self) -> (Vec<StreamFrame>, StreamEnd) {
        let mut frames = Vec::new();
        if self.done {
            return (frames, StreamEnd::Done);
        }

        let dangling = self.utf8.finish();
        if let Some(replacement) = dangling {
            self.buffer.push(replacement);
        }
        self.drain_lines(&mut frames, true);
        self.held_retries = 0;

        if self.done {
            return (frames, StreamEnd::Done);
        }

        let tail = std::mem::take(&mut self.buffer);
        let end = if dangling.is_none() && tail.trim().is_empty() {
            StreamEnd::Closed
        } else {
            StreamEnd::Truncated { tail }
        };
        (frames, end)
    }

    /// Cut complete lines off the buffer and decode them into deltas. A line
    /// that fails to parse is pushed back unless `closing` is set or its
    /// retries are used up.
    fn drain_lines(&mut self, frames: &mut Vec<StreamFrame>, closing: bool) {
        while let Some(newline) = self.buffer.find('\n') {
            let raw: String = self.buffer.drain(..=newline).collect();
            let line = raw.trim_end_matches('\n');
            let line = line.strip_suffix('\r').unwrap_or(line);

            if line.trim().is_empty() || line.starts_with(':') {
                continue;
            }
            let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
                continue;
            };

            let payload = payload.trim();
            if payload == DONE_SENTINEL {
                self.done = true;
                self.held_retries = 0;
                self.buffer.clear();
                return;
            }

            match serde_json::from_str::<ChatCompletionChunk>(payload) {
                Ok(chunk) => {
                    self.held_retries = 0;
                    if let Some(content) = chunk.first_delta_text()
                        && !content.is_empty()
                    {
                        frames.push(StreamFrame::Delta(content.to_string()));
                    }
                }
                Err(err) if closing || self.held_retries >= MAX_LINE_RETRIES => {
                    warn!(
                        error = %err,
                        retries = self.held_retries,
                        "Dropping event line that never became valid JSON"
                    );
                    self.held_retries = 0;
                    self.dropped_lines += 1;
                }
                Err(err) => {
                    debug!(error = %err, "Event line incomplete, waiting for more bytes");
                    self.held_retries += 1;
                    let mut restored = String::with_capacity(line.len() + 1 + self.buffer.len());
                    restored.push_str(line);
                    restored.push('\n');
                    restored.push_str(&self.buffer);
                    self.buffer = restored;
                    return;
                }
            }
        }
    }
}

/// Decode a byte stream into frames.
///
/// Every successful stream ends with exactly one `StreamFrame::End`. After
/// `[DONE]` the remaining body is read and discarded so the transport can
/// close on its own. A read error ends the stream with `StreamError::Transport`.
pub fn decode_stream<S, B, E>(body: S) -> FrameStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut body = Box::pin(body);
        let mut decoder = SseDecoder::new();

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    yield Err(StreamError::Transport(err.to_string()));
                    return;
                }
            };

            for frame in decoder.feed(chunk.as_ref()) {
                yield Ok(frame);
            }

            if decoder.is_done() {
                while let Some(rest) = body.next().await {
                    if rest.is_err() {
                        break;
                    }
                }
                return;
            }
        }

        let (frames, end) = decoder.finish();
        for frame in frames {
            yield Ok(frame);
        }
        if let StreamEnd::Truncated { tail } = &end {
            warn!(tail_len = tail.len(), "Stream closed in the middle of an event");
        }
        yield Ok(StreamFrame::End(end));
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn event(text: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"index": 0, "delta": {"content": text}}]})
        )
    }

    fn deltas(frames: &[StreamFrame]) -> Vec<String> {
        frames
            .iter()
            .filter_map(|frame| frame.as_delta().map(str::to_string))
            .collect()
    }

    fn feed_chunks(chunks: &[&[u8]]) -> (Vec<StreamFrame>, StreamEnd) {
        let mut decoder = SseDecoder::new();
        let mut frames = Vec::new();
        for chunk in chunks {
            frames.extend(decoder.feed(chunk));
        }
        let (rest, end) = decoder.finish();
        frames.extend(rest);
        (frames, end)
    }

    #[test]
    fn test_split_json_across_chunks() {
        let chunk1 = b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel";
        let chunk2 = b"lo\"}}]}\n\n";

        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(chunk1).is_empty());
        let frames = decoder.feed(chunk2);
        assert_eq!(frames, vec![StreamFrame::Delta("Hello".to_string())]);
    }

    #[test]
    fn test_done_only() {
        let (frames, end) = feed_chunks(&[b"data: [DONE]\n"]);
        assert_eq!(frames, vec![StreamFrame::End(StreamEnd::Done)]);
        assert_eq!(end, StreamEnd::Done);
    }

    #[test]
    fn test_n_lines_yield_n_deltas() {
        let words = ["The", " patient", " should", " rest", " and", " hydrate"];
        let mut body: String = words.iter().map(|w| event(w)).collect();
        body.push_str("data: [DONE]\n\n");

        let (frames, end) = feed_chunks(&[body.as_bytes()]);
        assert_eq!(deltas(&frames), words);
        assert_eq!(end, StreamEnd::Done);
    }

    #[test]
    fn test_chunk_boundary_invariance() {
        let mut body = String::new();
        for word in ["ضغط", " الدم", " ❤️", " normal", "\n- rest"] {
            body.push_str(&event(word));
        }
        body.push_str(": keep-alive\n\ndata: [DONE]\n\n");
        let bytes = body.as_bytes();

        let (whole, _) = feed_chunks(&[bytes]);
        let expected = deltas(&whole).concat();
        assert_eq!(expected, "ضغط الدم ❤️ normal\n- rest");

        // Every two-way split, including ones inside multi-byte characters.
        for split in 0..=bytes.len() {
            let (frames, end) = feed_chunks(&[&bytes[..split], &bytes[split..]]);
            assert_eq!(deltas(&frames).concat(), expected, "split at {split}");
            assert_eq!(deltas(&frames).len(), 5, "split at {split}");
            assert_eq!(end, StreamEnd::Done);
        }

        // Byte-at-a-time delivery.
        let singles: Vec<&[u8]> = bytes.chunks(1).collect();
        let (frames, _) = feed_chunks(&singles);
        assert_eq!(deltas(&frames).concat(), expected);

        // A few uneven chunk sizes.
        for size in [2, 3, 5, 7, 13, 64] {
            let chunks: Vec<&[u8]> = bytes.chunks(size).collect();
            let (frames, _) = feed_chunks(&chunks);
            assert_eq!(deltas(&frames).concat(), expected, "chunk size {size}");
        }
    }

    #[test]
    fn test_crlf_comments_and_foreign_lines() {
        let body = format!(
            ": OPENROUTER PROCESSING\r\n\r\nevent: message\r\nid: 7\r\n{}data: [DONE]\r\n",
            event("ok").replace('\n', "\r\n")
        );
        let (frames, end) = feed_chunks(&[body.as_bytes()]);
        assert_eq!(deltas(&frames), vec!["ok"]);
        assert_eq!(end, StreamEnd::Done);
    }

    #[test]
    fn test_events_without_text_are_skipped() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n\n",
            "data: {\"choices\":[]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"x\"},\"finish_reason\":\"stop\"}]}\n\n",
        );
        let (frames, end) = feed_chunks(&[body.as_bytes()]);
        assert_eq!(deltas(&frames), vec!["x"]);
        assert_eq!(end, StreamEnd::Closed);
    }

    #[test]
    fn test_input_after_done_ignored() {
        let body = format!("{}data: [DONE]\n\n{}", event("a"), event("b"));
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(body.as_bytes());
        assert_eq!(deltas(&frames), vec!["a"]);
        assert!(decoder.is_done());
        assert!(decoder.feed(event("c").as_bytes()).is_empty());
    }

    #[test]
    fn test_unterminated_tail_is_truncated() {
        let (frames, end) = feed_chunks(&[event("a").as_bytes(), b"data: {\"choices\":[{\"del"]);
        assert_eq!(deltas(&frames), vec!["a"]);
        assert_eq!(
            end,
            StreamEnd::Truncated {
                tail: "data: {\"choices\":[{\"del".to_string()
            }
        );
    }

    #[test]
    fn test_complete_line_without_newline_is_not_decoded() {
        let line = event("late");
        let (frames, end) = feed_chunks(&[line.trim_end().as_bytes()]);
        assert!(frames.is_empty());
        assert!(end.is_truncated());
    }

    #[test]
    fn test_whitespace_tail_is_clean_close() {
        let body = format!("{}\n  ", event("a"));
        let (_, end) = feed_chunks(&[body.as_bytes()]);
        assert_eq!(end, StreamEnd::Closed);
    }

    #[test]
    fn test_dangling_utf8_at_close_is_truncated() {
        let mut body = event("a").into_bytes();
        body.extend_from_slice(&"é".as_bytes()[..1]);
        let (_, end) = feed_chunks(&[&body]);
        assert!(end.is_truncated());
    }

    #[test]
    fn test_malformed_line_is_pushed_back_then_dropped() {
        let mut decoder = SseDecoder::new();
        let bad = b"data: {not json}\n";

        // The bad line blocks the chunk it arrived in.
        assert!(decoder.feed(bad).is_empty());
        assert_eq!(decoder.dropped_lines(), 0);

        // Later chunks retry it; it is dropped after the retry budget and the
        // events queued behind it are then decoded in order.
        let mut frames = Vec::new();
        for word in ["one", "two", "three", "four"] {
            frames.extend(decoder.feed(event(word).as_bytes()));
        }
        assert_eq!(decoder.dropped_lines(), 1);
        assert_eq!(deltas(&frames), vec!["one", "two", "three", "four"]);
        assert_eq!(decoder.finish(), (vec![], StreamEnd::Closed));
    }

    #[test]
    fn test_pushback_does_not_spin_without_new_bytes() {
        let mut decoder = SseDecoder::new();
        // A single feed returns even though the line never parses.
        assert!(decoder.feed(b"data: {\"choices\":\n").is_empty());
        // Empty chunks only advance the retry counter once each.
        for _ in 0..10 {
            decoder.feed(b"");
        }
        assert_eq!(decoder.dropped_lines(), 1);
        assert_eq!(decoder.finish(), (vec![], StreamEnd::Closed));
    }

    #[test]
    fn test_held_line_at_close_is_dropped() {
        let mut decoder = SseDecoder::new();
        decoder.feed(b"data: {oops\n");
        assert_eq!(decoder.finish(), (vec![], StreamEnd::Closed));
        assert_eq!(decoder.dropped_lines(), 1);
    }

    #[test]
    fn test_held_line_at_close_releases_queued_events() {
        let body = concat!(
            "data: {bad}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n",
            "data: [DONE]\n",
        );
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(body.as_bytes()).is_empty());

        let (frames, end) = decoder.finish();
        assert_eq!(frames, vec![StreamFrame::Delta("Hello".to_string())]);
        assert_eq!(end, StreamEnd::Done);
        assert_eq!(decoder.dropped_lines(), 1);
        assert!(decoder.is_done());
    }

    #[test]
    fn test_held_line_at_close_keeps_only_unterminated_tail() {
        let body = format!("data: {{bad}}\n{}data: {{\"choi", event("kept"));
        let (frames, end) = feed_chunks(&[body.as_bytes()]);
        assert_eq!(deltas(&frames), vec!["kept"]);
        assert_eq!(
            end,
            StreamEnd::Truncated {
                tail: "data: {\"choi".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_decode_stream_ends_with_single_end_frame() {
        let chunks: Vec<std::result::Result<Vec<u8>, std::io::Error>> = vec![
            Ok(event("Hel").into_bytes()),
            Ok(event("lo").into_bytes()),
            Ok(b"data: [DONE]\n\n".to_vec()),
            Ok(event("ignored").into_bytes()),
        ];
        let frames: Vec<StreamFrame> = decode_stream(futures::stream::iter(chunks))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(
            frames,
            vec![
                StreamFrame::Delta("Hel".to_string()),
                StreamFrame::Delta("lo".to_string()),
                StreamFrame::End(StreamEnd::Done),
            ]
        );
    }

    #[tokio::test]
    async fn test_decode_stream_flushes_queued_events_at_close() {
        let chunks: Vec<std::result::Result<Vec<u8>, std::io::Error>> = vec![Ok(format!(
            "data: {{bad}}\n{}data: [DONE]\n",
            event("Hello")
        )
        .into_bytes())];
        let frames: Vec<StreamFrame> = decode_stream(futures::stream::iter(chunks))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(
            frames,
            vec![
                StreamFrame::Delta("Hello".to_string()),
                StreamFrame::End(StreamEnd::Done),
            ]
        );
    }

    #[tokio::test]
    async fn test_decode_stream_reports_close_without_sentinel() {
        let chunks: Vec<std::result::Result<Vec<u8>, std::io::Error>> =
            vec![Ok(event("a").into_bytes())];
        let frames: Vec<StreamFrame> = decode_stream(futures::stream::iter(chunks))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(frames.last(), Some(&StreamFrame::End(StreamEnd::Closed)));
    }

    #[tokio::test]
    async fn test_decode_stream_propagates_transport_error() {
        let chunks: Vec<std::result::Result<Vec<u8>, std::io::Error>> = vec![
            Ok(event("a").into_bytes()),
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset by peer",
            )),
        ];
        let mut stream = decode_stream(futures::stream::iter(chunks));
        assert_eq!(
            stream.next().await.unwrap().unwrap(),
            StreamFrame::Delta("a".to_string())
        );
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, StreamError::Transport(ref msg) if msg.contains("reset")));
        assert!(stream.next().await.is_none());
    }
}
