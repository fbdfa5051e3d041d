//! ETag computation for exported queue documents.
//!
//! The tag is a SHA-256 over the rendered bytes, so two exports of an
//! unchanged queue carry the same tag and a client can skip the download.

use sha2::{Digest, Sha256};

/// Quoted strong ETag for `payload`.
pub fn compute_etag(payload: &[u8]) -> String {
  let hash = Sha256::digest(payload);
  format!("\"{}\"", hex::encode(hash))
}

/// Whether an `If-None-Match` header value names `etag`.
///
/// Accepts `*`, comma-separated lists and bare (unquoted) tags.
pub fn matches_if_none_match(header: &str, etag: &str) -> bool {
  let bare = etag.trim_matches('"');
  header.split(',').map(str::trim).any(|candidate| {
    candidate == "*"
      || candidate.trim_start_matches("W/").trim_matches('"') == bare
  })
}
