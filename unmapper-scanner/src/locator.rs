//! Finding the pointer from a script to its source map.
//!
//! A script advertises its map either through a `SourceMap` / `X-SourceMap`
//! response header or through a trailing `//# sourceMappingURL=...` comment
//! (`//@` in older bundlers). Headers win over the comment.
//!
//! The comment is located with [`LocatorScanner`], which consumes the body in
//! fixed-size chunks and only ever keeps the two most recent ones. Every time
//! a chunk fills up the pattern is run over `previous + current`, so a comment
//! cut in half by a chunk boundary is still found.

use regex::bytes::Regex;
use reqwest::header::HeaderMap;
use std::sync::LazyLock;

pub const SOURCEMAP_HEADERS: [&str; 2] = ["SourceMap", "X-SourceMap"];

static LOCATOR_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"//[#@]\s*sourceMappingURL\s*=\s*([^\s\x00]+?\.map)[\s\x00]")
        .expect("locator pattern is valid")
});

/// Locator advertised through response headers, `SourceMap` first.
pub fn header_locator(headers: &HeaderMap) -> Option<String> {
    SOURCEMAP_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
    })
}

/// Two-chunk sliding window over a byte stream.
pub struct LocatorScanner {
    chunk_size: usize,
    prev: Vec<u8>,
    curr: Vec<u8>,
}

impl LocatorScanner {
    pub fn new(chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            prev: Vec::with_capacity(chunk_size),
            curr: Vec::with_capacity(chunk_size),
        }
    }

    /// Feeds the next piece of the stream. Returns the locator as soon as one
    /// is matched; pieces of any size are re-cut into fixed-size chunks.
    pub fn feed(&mut self, mut data: &[u8]) -> Option<String> {
        while !data.is_empty() {
            let take = (self.chunk_size - self.curr.len()).min(data.len());
            self.curr.extend_from_slice(&data[..take]);
            data = &data[take..];

            if self.curr.len() == self.chunk_size {
                if let Some(found) = self.search(false) {
                    return Some(found);
                }
                std::mem::swap(&mut self.prev, &mut self.curr);
                self.curr.clear();
            }
        }
        None
    }

    /// Signals end of stream. The end of the stream terminates a locator the
    /// same way trailing whitespace would.
    pub fn finish(self) -> Option<String> {
        self.search(true)
    }

    fn search(&self, at_eof: bool) -> Option<String> {
        let mut window = Vec::with_capacity(self.prev.len() + self.curr.len() + 1);
        window.extend_from_slice(&self.prev);
        window.extend_from_slice(&self.curr);
        if at_eof {
            window.push(b'\n');
        }
        LOCATOR_COMMENT
            .captures(&window)
            .and_then(|caps| caps.get(1))
            .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
    }

    /// Bytes currently retained by the window.
    pub fn retained(&self) -> usize {
        self.prev.len() + self.curr.len()
    }
}

/// Runs a whole in-memory body through a scanner.
pub fn find_locator(body: &[u8], chunk_size: usize) -> Option<String> {
    let mut scanner = LocatorScanner::new(chunk_size);
    scanner.feed(body).or_else(|| scanner.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_header_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert("x-sourcemap", HeaderValue::from_static("b.map"));
        assert_eq!(header_locator(&headers), Some("b.map".to_string()));

        headers.insert("sourcemap", HeaderValue::from_static("a.map"));
        assert_eq!(header_locator(&headers), Some("a.map".to_string()));
    }

    #[test]
    fn test_blank_header_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("sourcemap", HeaderValue::from_static("  "));
        headers.insert("x-sourcemap", HeaderValue::from_static("b.map"));
        assert_eq!(header_locator(&headers), Some("b.map".to_string()));
        assert_eq!(header_locator(&HeaderMap::new()), None);
    }

    #[test]
    fn test_trailing_comment() {
        let body = b"console.log(1);\n//# sourceMappingURL=app.js.map\n";
        assert_eq!(find_locator(body, 64), Some("app.js.map".to_string()));
    }

    #[test]
    fn test_comment_at_end_of_stream_without_newline() {
        let body = b"console.log(1);\n//# sourceMappingURL=app.js.map";
        assert_eq!(find_locator(body, 64), Some("app.js.map".to_string()));
    }

    #[test]
    fn test_legacy_at_form_and_spacing() {
        let body = b"x()\n//@ sourceMappingURL = /static/vendor.js.map\n";
        assert_eq!(find_locator(body, 64), Some("/static/vendor.js.map".to_string()));
    }

    #[test]
    fn test_inline_data_uri_is_not_a_locator() {
        let body = b"x()\n//# sourceMappingURL=data:application/json;base64,eyJ2ZXJzaW9uIjozfQ==\n";
        assert_eq!(find_locator(body, 64), None);
    }

    #[test]
    fn test_no_locator() {
        assert_eq!(find_locator(b"function a(){return 1}", 64), None);
        assert_eq!(find_locator(b"", 64), None);
    }

    #[test]
    fn test_match_split_across_chunk_boundary() {
        let comment = b"//# sourceMappingURL=app.js.map\n";
        let chunk_size = 64;
        // Boundary falls in the middle of "sourceMappingURL".
        let mut body = vec![b';'; chunk_size - 10];
        body.extend_from_slice(comment);
        body.extend_from_slice(&vec![b' '; 200]);

        for split in [chunk_size - 10, chunk_size - 1, chunk_size, chunk_size + 7] {
            let mut scanner = LocatorScanner::new(chunk_size);
            let first = scanner.feed(&body[..split]);
            let found = first
                .or_else(|| scanner.feed(&body[split..]))
                .or_else(|| scanner.finish());
            assert_eq!(found, Some("app.js.map".to_string()), "split at {}", split);
        }
    }

    #[test]
    fn test_byte_at_a_time_feed() {
        let mut body = vec![b'a'; 300];
        body.extend_from_slice(b"\n//# sourceMappingURL=main.1f2e.js.map\n");
        let mut scanner = LocatorScanner::new(64);
        let mut found = None;
        for byte in &body {
            if let Some(locator) = scanner.feed(std::slice::from_ref(byte)) {
                found = Some(locator);
                break;
            }
        }
        let found = found.or_else(|| scanner.finish());
        assert_eq!(found, Some("main.1f2e.js.map".to_string()));
    }

    #[test]
    fn test_long_cdn_locator_at_minimum_chunk_size() {
        use crate::config::MIN_CHUNK_SIZE;

        let comment = b"//# sourceMappingURL=https://cdn.example.com/static/js/main.abcdef12.chunk.js.map\n";
        for offset in [0, 4, 60, MIN_CHUNK_SIZE - 30, MIN_CHUNK_SIZE - 1] {
            let mut body = vec![b';'; offset];
            body.extend_from_slice(comment);
            assert_eq!(
                find_locator(&body, MIN_CHUNK_SIZE),
                Some("https://cdn.example.com/static/js/main.abcdef12.chunk.js.map".to_string()),
                "offset {}",
                offset
            );
        }
    }

    #[test]
    fn test_memory_is_bounded_by_two_chunks() {
        let mut scanner = LocatorScanner::new(64);
        for _ in 0..1000 {
            assert!(scanner.feed(&[b'x'; 50]).is_none());
            assert!(scanner.retained() <= 128);
        }
    }
}
