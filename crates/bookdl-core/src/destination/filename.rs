//! Filename derivation: transport suggestion, URL path, or id fallback.

use crate::record::DownloadId;

/// Linux NAME_MAX.
const NAME_MAX: usize = 255;

/// Picks the on-disk name for a finished download.
///
/// Order: the transport's suggested name, then the last URL path segment,
/// then `"{id}.download"`. Every candidate is sanitized first.
pub fn destination_name(suggested: Option<&str>, url: &str, id: &DownloadId) -> String {
    suggested
        .map(sanitize_filename)
        .filter(|name| is_usable(name))
        .or_else(|| {
            filename_from_url_path(url)
                .map(|segment| sanitize_filename(&segment))
                .filter(|name| is_usable(name))
        })
        .unwrap_or_else(|| format!("{}.download", sanitize_filename(id.as_str())))
}

fn is_usable(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".."
}

/// Makes a candidate name safe to create in the downloads directory.
///
/// Path separators, NUL, control characters and characters that other
/// platforms reject (`:*?"<>|`) become `_`; runs of `_` collapse; leading and
/// trailing dots/spaces are trimmed; the result is capped at 255 bytes on a
/// char boundary. Interior spaces are kept (book titles).
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let bad = c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|');
        if bad {
            if !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.push(c);
        }
    }

    let trimmed = out.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.len() <= NAME_MAX {
        return trimmed.to_string();
    }
    let mut end = NAME_MAX;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}

/// Last non-empty path segment of `url`, percent-decoded.
pub fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = percent_decode(segment);
    is_usable(&decoded).then_some(decoded)
}

/// Filename from a Content-Disposition value. `filename*=UTF-8''...`
/// (RFC 5987) wins over a plain or quoted `filename=`.
pub fn parse_content_disposition_filename(value: &str) -> Option<String> {
    let mut plain = None;
    for param in value.split(';').map(str::trim) {
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let raw = raw.trim();
        match key.as_str() {
            "filename*" => {
                let encoded = raw
                    .split_once("''")
                    .filter(|(charset, _)| charset.eq_ignore_ascii_case("utf-8"))
                    .map(|(_, rest)| rest);
                if let Some(name) = encoded.map(percent_decode).filter(|n| !n.is_empty()) {
                    return Some(name);
                }
            }
            "filename" => {
                let name = match raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
                    Some(quoted) => unescape_quoted(quoted),
                    None => raw.to_string(),
                };
                if !name.is_empty() {
                    plain = Some(name);
                }
            }
            _ => {}
        }
    }
    plain
}

fn unescape_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;
    for c in s.chars() {
        if escaped || c != '\\' {
            out.push(c);
            escaped = false;
        } else {
            escaped = true;
        }
    }
    out
}

/// Lossy percent-decoding; malformed escapes are kept verbatim.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
