//! Incremental SSE decoder.
//!
//! Only newly pushed bytes are scanned for `\n`; the trailing incomplete line
//! is held back until more bytes arrive or [`SseDecoder::finish`] is called.
//! Splitting on bytes keeps multi-byte UTF-8 sequences intact across chunk
//! boundaries. A line longer than the cap is dropped up to its newline.

use super::StreamEvent;

/// Payload that terminates a stream.
pub const DONE_MARKER: &str = "[DONE]";

/// Longest line the decoder holds back before discarding it.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// A decoded unit from the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum SseItem {
    Event(StreamEvent),
    Done,
}

#[derive(Debug)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    max_line: usize,
    discarding: bool,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line,
            discarding: false,
        }
    }

    /// Feeds a chunk and returns every item completed by it, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseItem> {
        let mut items = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            let (segment, tail) = (&rest[..pos], &rest[pos + 1..]);
            rest = tail;

            if std::mem::take(&mut self.discarding) {
                continue;
            }
            if self.buffer.len() + segment.len() > self.max_line {
                self.drop_line(self.buffer.len() + segment.len());
                self.discarding = false;
                continue;
            }
            self.buffer.extend_from_slice(segment);
            items.extend(parse_line(&self.buffer));
            self.buffer.clear();
        }

        if !self.discarding {
            if self.buffer.len() + rest.len() > self.max_line {
                self.drop_line(self.buffer.len() + rest.len());
            } else {
                self.buffer.extend_from_slice(rest);
            }
        }
        items
    }

    /// Flushes the held-back remainder at end of stream.
    pub fn finish(&mut self) -> Vec<SseItem> {
        let rest = std::mem::take(&mut self.buffer);
        if std::mem::take(&mut self.discarding) {
            return Vec::new();
        }
        parse_line(&rest).into_iter().collect()
    }

    /// Bytes currently held back.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    fn drop_line(&mut self, len: usize) {
        tracing::warn!(len, max = self.max_line, "Dropping oversized SSE line");
        self.buffer.clear();
        self.discarding = true;
    }
}

fn parse_line(raw: &[u8]) -> Option<SseItem> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    if raw.is_empty() {
        return None;
    }

    let line = match std::str::from_utf8(raw) {
        Ok(line) => line,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping SSE line with invalid UTF-8");
            return None;
        }
    };

    let data = line.strip_prefix("data: ")?;
    if data.trim() == DONE_MARKER {
        return Some(SseItem::Done);
    }

    match serde_json::from_str::<StreamEvent>(data) {
        Ok(event) => Some(SseItem::Event(event)),
        Err(e) => {
            tracing::warn!(error = %e, line = %data, "Skipping unparseable SSE event");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn events(items: Vec<SseItem>) -> Vec<StreamEvent> {
        items
            .into_iter()
            .filter_map(|item| match item {
                SseItem::Event(e) => Some(e),
                SseItem::Done => None,
            })
            .collect()
    }

    #[test]
    fn event_split_across_chunks_is_decoded_once() {
        let mut decoder = SseDecoder::new();

        let first = decoder.push(b"data: {\"type\":\"con");
        let second = decoder.push(b"tent\",\"data\":{}}\n");

        assert!(first.is_empty());
        assert_eq!(events(second), vec![StreamEvent::content("")]);
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let mut decoder = SseDecoder::new();
        let items = decoder.push(b"data: {\"type\":\"done\",\"data\":{}}\r\ndata: [DONE]\r\n");
        assert_eq!(items, vec![SseItem::Event(StreamEvent::done()), SseItem::Done]);
    }

    #[test]
    fn non_data_lines_and_bad_json_are_skipped() {
        let mut decoder = SseDecoder::new();
        let items = decoder.push(
            b": keep-alive\nevent: message\ndata: {broken\ndata: {\"type\":\"content\",\"data\":{\"text\":\"ok\"}}\n",
        );
        assert_eq!(events(items), vec![StreamEvent::content("ok")]);
    }

    #[test]
    fn finish_flushes_unterminated_last_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"type\":\"content\",\"data\":{\"text\":\"tail\"}}").is_empty());
        assert_eq!(events(decoder.finish()), vec![StreamEvent::content("tail")]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn multibyte_utf8_split_mid_sequence() {
        let line = "data: {\"type\":\"content\",\"data\":{\"text\":\"Größe 42 👢\"}}\n".as_bytes();
        let split = line.len() - 6;

        let mut decoder = SseDecoder::new();
        assert!(decoder.push(&line[..split]).is_empty());
        let items = decoder.push(&line[split..]);

        assert_eq!(events(items), vec![StreamEvent::content("Größe 42 👢")]);
    }

    #[test]
    fn oversized_line_is_dropped_and_decoding_resumes() {
        let mut decoder = SseDecoder::with_max_line(64);
        let filler = vec![b'x'; 40];

        assert!(decoder.push(b"data: ").is_empty());
        assert!(decoder.push(&filler).is_empty());
        assert!(decoder.push(&filler).is_empty());
        assert_eq!(decoder.buffered_len(), 0);
        assert!(decoder.push(&filler).is_empty());
        assert_eq!(decoder.buffered_len(), 0);

        let items = decoder.push(b"xx\ndata: {\"type\":\"content\",\"data\":{\"text\":\"after\"}}\n");
        assert_eq!(events(items), vec![StreamEvent::content("after")]);
    }

    #[test]
    fn oversized_line_within_one_chunk_is_dropped() {
        let mut decoder = SseDecoder::with_max_line(32);
        let mut chunk = b"data: ".to_vec();
        chunk.extend(vec![b'y'; 64]);
        chunk.extend_from_slice(b"\ndata: [DONE]\n");

        assert_eq!(decoder.push(&chunk), vec![SseItem::Done]);
    }

    #[test]
    fn unterminated_oversized_line_is_not_flushed() {
        let mut decoder = SseDecoder::with_max_line(16);
        assert!(decoder.push(b"data: {\"type\":\"content\",\"data\":{}}").is_empty());
        assert!(decoder.finish().is_empty());
        assert_eq!(decoder.push(b"data: [DONE]\n"), vec![SseItem::Done]);
    }

    fn wire(texts: &[String]) -> Vec<u8> {
        let mut out = Vec::new();
        for text in texts {
            let line = serde_json::to_string(&StreamEvent::content(text.clone())).unwrap();
            out.extend_from_slice(b"data: ");
            out.extend_from_slice(line.as_bytes());
            out.extend_from_slice(b"\n");
        }
        out.extend_from_slice(b"data: [DONE]\n");
        out
    }

    proptest! {
        #[test]
        fn any_fragmentation_yields_same_events(
            texts in proptest::collection::vec("\\PC{0,12}", 1..6),
            cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..12),
        ) {
            let bytes = wire(&texts);
            let mut points: Vec<usize> = cuts.iter().map(|i| i.index(bytes.len() + 1)).collect();
            points.sort_unstable();
            points.dedup();

            let mut decoder = SseDecoder::new();
            let mut items = Vec::new();
            let mut start = 0;
            for point in points {
                items.extend(decoder.push(&bytes[start..point]));
                start = point;
            }
            items.extend(decoder.push(&bytes[start..]));
            items.extend(decoder.finish());

            let expected: Vec<StreamEvent> =
                texts.iter().map(|t| StreamEvent::content(t.clone())).collect();
            prop_assert_eq!(items.last(), Some(&SseItem::Done));
            prop_assert_eq!(events(items), expected);
        }
    }
}
