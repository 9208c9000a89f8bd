//! Server-Sent Events framing for the trip plan progress stream.
//!
//! The backend writes one `data: <json>\n\n` block per progress step. This
//! module splits decoded text into those blocks, buffering a partial block
//! until the next chunk completes it, and turns each block into a
//! `StreamProgress`.

use serde_json::error::Category;

use crate::core::models::StreamProgress;

const EVENT_DELIMITER: &str = "\n\n";
const DATA_PREFIX: &str = "data: ";

/// Result of interpreting one complete event block.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult {
    /// A progress event.
    Progress(Box<StreamProgress>),
    /// The block is not a `data: ` line (keep-alive or comment).
    Ignored,
    /// The payload is syntactically incomplete JSON, typically a block that
    /// was cut by a chunk boundary. Safe to drop.
    Truncated(String),
    /// The payload is well-formed JSON that does not describe a progress event.
    Invalid(String),
}

/// Stateful splitter that buffers incomplete blocks across chunk boundaries.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
}

impl SseParser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Appends `chunk` and returns every block it completed, in stream order.
    ///
    /// Returned blocks are trimmed. The trailing partial block stays buffered.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);

        let Some(last_delimiter) = self.buffer.rfind(EVENT_DELIMITER) else {
            return Vec::new();
        };

        let rest = self.buffer.split_off(last_delimiter + EVENT_DELIMITER.len());
        let complete = std::mem::replace(&mut self.buffer, rest);

        complete
            .split(EVENT_DELIMITER)
            .map(str::trim)
            .filter(|block| !block.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Interprets a single trimmed block.
    #[must_use]
    pub fn parse_block(block: &str) -> ParseResult {
        let Some(payload) = block.strip_prefix(DATA_PREFIX) else {
            return ParseResult::Ignored;
        };

        match serde_json::from_str::<StreamProgress>(payload) {
            Ok(progress) => ParseResult::Progress(Box::new(progress)),
            Err(e) => match e.classify() {
                Category::Syntax | Category::Eof => ParseResult::Truncated(e.to_string()),
                Category::Data | Category::Io => ParseResult::Invalid(e.to_string()),
            },
        }
    }

    /// Returns any buffered, not yet delimited text.
    #[must_use]
    pub fn remaining_buffer(&self) -> &str {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(result: &ParseResult) -> &StreamProgress {
        match result {
            ParseResult::Progress(p) => p,
            other => panic!("expected progress, got {other:?}"),
        }
    }

    #[test]
    fn test_single_block() {
        let mut parser = SseParser::new();
        let blocks = parser.feed("data: {\"step\":1,\"status\":\"ok\",\"progress\":15}\n\n");

        assert_eq!(blocks, vec!["data: {\"step\":1,\"status\":\"ok\",\"progress\":15}"]);
        assert!(parser.remaining_buffer().is_empty());

        let parsed = SseParser::parse_block(&blocks[0]);
        let p = progress(&parsed);
        assert_eq!(p.step, 1);
        assert_eq!(p.status, "ok");
        assert!((p.progress - 15.0).abs() < f64::EPSILON);
        assert!(p.data.is_none());
        assert!(p.error.is_none());
    }

    #[test]
    fn test_multiple_blocks_in_single_chunk() {
        let mut parser = SseParser::new();
        let chunk = concat!(
            "data: {\"step\":1,\"status\":\"a\",\"progress\":15}\n\n",
            "data: {\"step\":2,\"status\":\"b\",\"progress\":35}\n\n",
            "data: {\"step\":3,\"status\":\"c\",\"progress\":55}\n\n"
        );

        let steps: Vec<u32> = parser
            .feed(chunk)
            .iter()
            .map(|b| progress(&SseParser::parse_block(b)).step)
            .collect();

        assert_eq!(steps, vec![1, 2, 3]);
    }

    #[test]
    fn test_block_split_across_chunks() {
        let mut parser = SseParser::new();

        let first = parser.feed("data: {\"step\":1,\"status\":\"ok\",\"progress\":0.5}\n\ndata: {\"step\":2,\"stat");
        assert_eq!(first.len(), 1);
        assert_eq!(parser.remaining_buffer(), "data: {\"step\":2,\"stat");

        let second = parser.feed("us\":\"done\",\"progress\":1}\n\n");
        assert_eq!(second.len(), 1);
        assert_eq!(progress(&SseParser::parse_block(&second[0])).status, "done");
        assert!(parser.remaining_buffer().is_empty());
    }

    #[test]
    fn test_delimiter_split_at_boundary() {
        let mut parser = SseParser::new();

        assert!(parser.feed("data: {\"step\":4}\n").is_empty());
        let blocks = parser.feed("\n");
        assert_eq!(blocks, vec!["data: {\"step\":4}"]);
    }

    #[test]
    fn test_non_data_blocks_are_ignored() {
        assert_eq!(SseParser::parse_block(": keep-alive"), ParseResult::Ignored);
        assert_eq!(SseParser::parse_block("event: progress"), ParseResult::Ignored);
        // the prefix requires the space
        assert_eq!(SseParser::parse_block("data:{\"step\":1}"), ParseResult::Ignored);
    }

    #[test]
    fn test_truncated_json_is_distinguished_from_invalid_json() {
        assert!(matches!(
            SseParser::parse_block("data: {\"step\":2,\"stat"),
            ParseResult::Truncated(_)
        ));
        assert!(matches!(
            SseParser::parse_block("data: not json"),
            ParseResult::Truncated(_)
        ));
        assert!(matches!(
            SseParser::parse_block("data: {\"step\":\"two\"}"),
            ParseResult::Invalid(_)
        ));
        assert!(matches!(
            SseParser::parse_block("data: [1,2]"),
            ParseResult::Invalid(_)
        ));
    }

    #[test]
    fn test_error_event_without_step_or_progress() {
        let parsed = SseParser::parse_block("data: {\"error\":\"quota exceeded\",\"status\":\"failed\"}");
        let p = progress(&parsed);
        assert_eq!(p.error.as_deref(), Some("quota exceeded"));
        assert_eq!(p.step, 0);
    }

    #[test]
    fn test_empty_chunks_and_blank_blocks() {
        let mut parser = SseParser::new();
        assert!(parser.feed("").is_empty());
        assert!(parser.feed("\n\n\n\n").is_empty());
        assert!(parser.remaining_buffer().is_empty());
    }

    #[test]
    fn test_unicode_status() {
        let mut parser = SseParser::new();
        let blocks = parser.feed("data: {\"step\":1,\"status\":\"🔍 正在搜索景点...\",\"progress\":15}\n\n");
        assert_eq!(
            progress(&SseParser::parse_block(&blocks[0])).status,
            "🔍 正在搜索景点..."
        );
    }

    #[test]
    fn test_fragmented_block_across_many_chunks() {
        let mut parser = SseParser::new();
        let full = "data: {\"step\":5,\"status\":\"images\",\"progress\":90}\n\n";

        let mut blocks = Vec::new();
        for piece in full.as_bytes().chunks(5) {
            let piece = std::str::from_utf8(piece).unwrap();
            blocks.extend(parser.feed(piece));
        }

        assert_eq!(blocks.len(), 1);
        assert_eq!(progress(&SseParser::parse_block(&blocks[0])).step, 5);
        assert!(parser.remaining_buffer().is_empty());
    }
}
