//! Decoding of `POST /` form bodies into a [`Query`].
//!
//! The body charset comes from the Content-Type `charset=` parameter; without
//! one it is detected from the raw bytes. Each field may appear once.

use encoding_rs::Encoding;
use gleaner_search::Query;
use gleaner_search::encoding::{charset_from_content_type, sniff};

use crate::error::{Result, ServerError};

/// Decode a form-encoded search request.
///
/// `n` larger than `max_results` is clamped to it.
///
/// # Errors
///
/// Returns [`ServerError::Request`] if the body cannot be decoded, a field is
/// missing or repeated, `q` is blank, or `n` is not a positive integer.
pub fn parse_form(content_type: Option<&str>, body: &[u8], max_results: usize) -> Result<Query> {
    let text = decode_body(content_type, body)?;

    let mut q: Option<String> = None;
    let mut n: Option<String> = None;
    for (key, value) in url::form_urlencoded::parse(text.as_bytes()) {
        let slot = match key.as_ref() {
            "q" => &mut q,
            "n" => &mut n,
            _ => continue,
        };
        if slot.is_some() {
            return Err(ServerError::Request(format!("field `{key}` given more than once")));
        }
        *slot = Some(value.into_owned());
    }

    let q = q.ok_or_else(|| ServerError::Request("missing field `q`".into()))?;
    let q = q.trim();
    if q.is_empty() {
        return Err(ServerError::Request("field `q` must not be empty".into()));
    }

    let n = n.ok_or_else(|| ServerError::Request("missing field `n`".into()))?;
    let n: usize = n
        .trim()
        .parse()
        .map_err(|_| ServerError::Request(format!("field `n` must be a positive integer, got `{n}`")))?;
    if n == 0 {
        return Err(ServerError::Request("field `n` must be at least 1".into()));
    }
    if n > max_results {
        tracing::debug!(requested = n, max_results, "clamping result count");
    }

    Ok(Query::new(q, n.min(max_results)))
}

fn decode_body(content_type: Option<&str>, body: &[u8]) -> Result<String> {
    let encoding = match content_type.and_then(charset_from_content_type) {
        Some(label) => Encoding::for_label(label.as_bytes())
            .ok_or_else(|| ServerError::Request(format!("unknown charset `{label}`")))?,
        None => sniff(body),
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| text.into_owned())
        .ok_or_else(|| ServerError::Request(format!("body is not valid {}", encoding.name())))
}
