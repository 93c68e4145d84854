//! Character encoding resolution for fetched pages and request bodies.
//!
//! Open-web pages frequently misdeclare their charset, so a declared
//! encoding is only trusted when byte sniffing agrees with it (or when the
//! body is verifiably UTF-8 and declared as such).

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

/// How far into a document to look for a `<meta charset>` declaration.
const META_SCAN_BYTES: usize = 1024;

/// Extract the `charset` parameter from a Content-Type header value.
pub fn charset_from_content_type(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        (!value.is_empty()).then_some(value)
    })
}

/// Find a charset declared in the document head (`<meta charset=...>` or an
/// `http-equiv` Content-Type).
pub fn charset_from_meta(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(META_SCAN_BYTES)];
    let lower = head.to_ascii_lowercase();
    let needle = b"charset=";
    let start = lower
        .windows(needle.len())
        .position(|window| window == needle)?
        + needle.len();

    let label: Vec<u8> = lower[start..]
        .iter()
        .skip_while(|b| **b == b'"' || **b == b'\'' || b.is_ascii_whitespace())
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'-' || **b == b'_' || **b == b':')
        .copied()
        .collect();
    Encoding::for_label(&label)
}

/// Guess the encoding from the raw bytes alone.
pub fn sniff(bytes: &[u8]) -> &'static Encoding {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}

/// Resolve the encoding to decode `bytes` with.
///
/// Order: a byte-order mark always wins; otherwise the declared charset
/// (header label, then `<meta>`) is compared with the sniffed one and the
/// sniffed encoding is preferred on disagreement. A body declared UTF-8 that
/// is valid UTF-8 stays UTF-8.
pub fn resolve(bytes: &[u8], declared_label: Option<&str>) -> &'static Encoding {
    if let Some((bom_encoding, _)) = Encoding::for_bom(bytes) {
        return bom_encoding;
    }

    let declared = declared_label
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
        .or_else(|| charset_from_meta(bytes));
    let sniffed = sniff(bytes);

    match declared {
        Some(declared) if declared == sniffed => declared,
        Some(declared) if declared == UTF_8 && std::str::from_utf8(bytes).is_ok() => UTF_8,
        Some(declared) => {
            tracing::debug!(
                declared = declared.name(),
                sniffed = sniffed.name(),
                "declared charset disagrees with content, using sniffed"
            );
            sniffed
        }
        None => sniffed,
    }
}

/// Decode `bytes` with `encoding`, replacing malformed sequences.
pub fn decode(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}
