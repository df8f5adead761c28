//! Reassembles newline-delimited log lines from arbitrarily split chunks.

use super::line::LogLine;

/// Buffers a partial trailing line across chunk boundaries.
///
/// The buffer holds raw bytes, so a multi-byte UTF-8 sequence split between
/// two chunks still decodes to the right character once its line completes.
#[derive(Debug, Default)]
pub struct LineReassembler {
    pending: Vec<u8>,
}

impl LineReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every line it completed, in order.
    pub fn feed(&mut self, chunk: impl AsRef<[u8]>) -> Vec<LogLine> {
        self.pending.extend_from_slice(chunk.as_ref());

        let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        complete[..last_newline]
            .split(|&b| b == b'\n')
            .map(LogLine::from_bytes)
            .collect()
    }

    /// Emits the unterminated remainder, if any, and clears the buffer.
    /// Call exactly once when the stream ends, whether it ended cleanly or not.
    pub fn flush(&mut self) -> Vec<LogLine> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        let rest = std::mem::take(&mut self.pending);
        vec![LogLine::from_bytes(&rest)]
    }

    /// Returns true if a partial line is buffered.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(lines: &[LogLine]) -> Vec<&str> {
        lines.iter().map(|l| l.as_str()).collect()
    }

    /// Reference: split the whole text once, dropping the empty fragment after
    /// a trailing newline.
    fn split_once_reference(text: &str) -> Vec<String> {
        let mut parts: Vec<String> = text.split('\n').map(str::to_string).collect();
        if parts.last().is_some_and(|p| p.is_empty()) {
            parts.pop();
        }
        parts
    }

    fn feed_in_pieces(text: &str, cuts: &[usize]) -> Vec<String> {
        let bytes = text.as_bytes();
        let mut reassembler = LineReassembler::new();
        let mut out = Vec::new();
        let mut start = 0;
        for &cut in cuts.iter().chain(std::iter::once(&bytes.len())) {
            out.extend(reassembler.feed(&bytes[start..cut]));
            start = cut;
        }
        out.extend(reassembler.flush());
        out.into_iter().map(|l| l.as_str().to_string()).collect()
    }

    #[test]
    fn test_single_chunk_with_trailing_newline() {
        let mut r = LineReassembler::new();
        let lines = r.feed("a\nb\n");
        assert_eq!(texts(&lines), vec!["a", "b"]);
        assert!(!r.has_pending());
        assert!(r.flush().is_empty());
    }

    #[test]
    fn test_partial_line_is_held_until_completed() {
        let mut r = LineReassembler::new();
        assert!(r.feed("Saved 3 new ").is_empty());
        assert!(r.has_pending());

        let lines = r.feed("posts\nStep 2...");
        assert_eq!(texts(&lines), vec!["Saved 3 new posts"]);

        let tail = r.flush();
        assert_eq!(texts(&tail), vec!["Step 2..."]);
        assert!(!r.has_pending());
    }

    #[test]
    fn test_empty_lines_are_preserved() {
        let mut r = LineReassembler::new();
        let lines = r.feed("a\n\nb\n");
        assert_eq!(texts(&lines), vec!["a", "", "b"]);
    }

    #[test]
    fn test_flush_twice_is_empty() {
        let mut r = LineReassembler::new();
        r.feed("tail");
        assert_eq!(r.flush().len(), 1);
        assert!(r.flush().is_empty());
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let text = "وظيفة جديدة\n";
        let bytes = text.as_bytes();
        // Cut inside the first two-byte Arabic character.
        let mut r = LineReassembler::new();
        assert!(r.feed(&bytes[..1]).is_empty());
        let lines = r.feed(&bytes[1..]);
        assert_eq!(texts(&lines), vec!["وظيفة جديدة"]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut r = LineReassembler::new();
        let lines = r.feed(b"ok \xff\n");
        assert_eq!(texts(&lines), vec!["ok \u{fffd}"]);
    }

    #[test]
    fn test_rechunking_matches_single_split() {
        let text = "--- Starting Pipeline ---\n>>> Step 1: Scraping Posts\n[+] Saved 12 new posts\n\n>>> Step 2: Extracting Job Data\nDEBUG: Processing job 1/12\nno newline at end";
        let expected = split_once_reference(text);
        let len = text.len();

        // Every single cut point.
        for cut in 0..=len {
            assert_eq!(feed_in_pieces(text, &[cut]), expected, "cut at {}", cut);
        }

        // Every pair of cut points.
        for a in 0..=len {
            for b in a..=len {
                assert_eq!(feed_in_pieces(text, &[a, b]), expected, "cuts at {} {}", a, b);
            }
        }

        // Byte-at-a-time.
        let all: Vec<usize> = (1..len).collect();
        assert_eq!(feed_in_pieces(text, &all), expected);
    }

    #[test]
    fn test_rechunking_with_trailing_newline() {
        let text = "one\ntwo\nthree\n";
        let expected = split_once_reference(text);
        for cut in 0..=text.len() {
            assert_eq!(feed_in_pieces(text, &[cut]), expected);
        }
    }
}
