//! Response header parsing for the curl transport.

/// Fields of the final response that the transfer cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ResponseHeaders {
    pub status: Option<u16>,
    pub content_length: Option<u64>,
    /// Total size from `Content-Range: bytes a-b/total`.
    pub range_total: Option<u64>,
    pub content_disposition: Option<String>,
}

impl ResponseHeaders {
    /// Total body size for a transfer that asked to start at `offset`.
    pub fn expected_total(&self, offset: u64) -> Option<u64> {
        match self.status {
            Some(206) => self
                .range_total
                .or_else(|| self.content_length.map(|len| len + offset)),
            _ => self.content_length,
        }
    }
}

/// Parses raw header lines. A status line starts a new response, so after
/// redirects only the last response's headers are kept.
pub(crate) fn parse_response_headers(lines: &[String]) -> ResponseHeaders {
    let mut out = ResponseHeaders::default();
    for line in lines.iter().map(|l| l.trim()) {
        if line.starts_with("HTTP/") {
            out = ResponseHeaders {
                status: line
                    .split_whitespace()
                    .nth(1)
                    .and_then(|code| code.parse().ok()),
                ..ResponseHeaders::default()
            };
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "content-length" => out.content_length = value.parse().ok(),
            "content-range" => {
                out.range_total = value
                    .rsplit_once('/')
                    .and_then(|(_, total)| total.trim().parse().ok());
            }
            "content-disposition" => out.content_disposition = Some(value.to_string()),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn status_and_length() {
        let h = parse_response_headers(&lines(&["HTTP/1.1 200 OK", "Content-Length: 12345"]));
        assert_eq!(h.status, Some(200));
        assert_eq!(h.content_length, Some(12345));
        assert_eq!(h.expected_total(0), Some(12345));
    }

    #[test]
    fn redirect_keeps_only_final_response() {
        let h = parse_response_headers(&lines(&[
            "HTTP/1.1 302 Found",
            "Content-Length: 0",
            "Location: /real",
            "",
            "HTTP/1.1 200 OK",
            "Content-Disposition: attachment; filename=\"a.epub\"",
        ]));
        assert_eq!(h.status, Some(200));
        assert_eq!(h.content_length, None);
        assert!(h.content_disposition.unwrap().contains("a.epub"));
    }

    #[test]
    fn partial_content_total() {
        let h = parse_response_headers(&lines(&[
            "HTTP/1.1 206 Partial Content",
            "Content-Length: 900",
            "Content-Range: bytes 100-999/1000",
        ]));
        assert_eq!(h.range_total, Some(1000));
        assert_eq!(h.expected_total(100), Some(1000));
    }

    #[test]
    fn partial_content_without_range_total() {
        let h = parse_response_headers(&lines(&["HTTP/1.1 206 Partial Content", "Content-Length: 50"]));
        assert_eq!(h.expected_total(150), Some(200));
    }
}
