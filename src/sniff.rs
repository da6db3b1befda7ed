//! Content sniffing: classify an upload by its leading bytes.
//!
//! The claimed filename is never consulted here. Detection uses the magic
//! number tables of the `infer` crate; anything it cannot place is reported
//! as [`UNKNOWN_MIME_TYPE`] instead of failing, so only the later comparison
//! against the registry decides whether the upload is rejected.

use crate::formats::{Format, FormatKind};
use tracing::debug;

/// Classification returned for content with no recognised signature.
pub const UNKNOWN_MIME_TYPE: &str = "application/octet-stream";

/// Return the MIME type implied by `bytes`.
pub fn sniff(bytes: &[u8]) -> &'static str {
    let mime = infer::get(bytes)
        .map(|t| t.mime_type())
        .unwrap_or(UNKNOWN_MIME_TYPE);
    debug!("Sniffed {} bytes as {}", bytes.len(), mime);
    mime
}

/// The registry image format `bytes` actually contain, if any.
pub fn sniff_image_format(bytes: &[u8]) -> Option<Format> {
    Format::from_mime_type(sniff(bytes)).filter(|f| f.kind() == FormatKind::Image)
}
