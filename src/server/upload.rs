//! Multipart upload parsing.

use crate::error::ConvertError;
use axum::body::Bytes;
use axum::extract::Multipart;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// Name of the multipart field carrying the file.
pub const FILE_FIELD: &str = "file";
/// Name of the multipart field carrying the requested output extension.
pub const OUTPUT_FIELD: &str = "output_format";

const FALLBACK_BASE_NAME: &str = "upload";
/// Longest base name kept, in bytes. Stays well under the 255-byte
/// filename limit of common filesystems once an extension is added.
pub const MAX_BASE_NAME_BYTES: usize = 100;

static UNSAFE_NAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]").unwrap());

/// One uploaded file and the format it should become.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub raw_bytes: Bytes,
    pub claimed_filename: String,
    /// Empty when the field was absent.
    pub requested_output_format: String,
}

impl ConversionRequest {
    /// Read `file` and `output_format` out of a multipart body.
    ///
    /// Unknown fields are skipped. A missing or empty `file` is
    /// [`ConvertError::NoFileProvided`]; the output format is validated later.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ConvertError> {
        let mut file: Option<(String, Bytes)> = None;
        let mut output = String::new();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some(FILE_FIELD) => {
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let data = field.bytes().await?;
                    file = Some((filename, data));
                }
                Some(OUTPUT_FIELD) => {
                    output = field.text().await?.trim().to_string();
                }
                _ => {}
            }
        }

        let (claimed_filename, raw_bytes) = file
            .filter(|(_, data)| !data.is_empty())
            .ok_or(ConvertError::NoFileProvided)?;

        Ok(Self {
            raw_bytes,
            claimed_filename,
            requested_output_format: output,
        })
    }

    /// Extension of the claimed filename, without the dot; empty if none.
    pub fn claimed_extension(&self) -> String {
        Path::new(&self.claimed_filename)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default()
    }

    /// File stem safe for use on disk and in `Content-Disposition`.
    pub fn base_name(&self) -> String {
        sanitize_base_name(&self.claimed_filename)
    }

    /// The requested output, or [`ConvertError::MissingOutputFormat`].
    pub fn output_format(&self) -> Result<&str, ConvertError> {
        if self.requested_output_format.is_empty() {
            Err(ConvertError::MissingOutputFormat)
        } else {
            Ok(&self.requested_output_format)
        }
    }
}

/// Stem of `filename` with unsafe characters replaced by `_`, truncated to
/// [`MAX_BASE_NAME_BYTES`].
pub fn sanitize_base_name(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cleaned = UNSAFE_NAME_CHARS.replace_all(&stem, "_");
    let cleaned = truncate_on_char_boundary(cleaned.trim_start_matches('.'), MAX_BASE_NAME_BYTES);
    if cleaned.is_empty() {
        FALLBACK_BASE_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
