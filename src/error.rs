//! Error types for the convertkit service.
//!
//! Every stage of the pipeline (registry lookup, sniffing, staging, backend
//! dispatch) returns `Result<_, ConvertError>`. The variants fall into two
//! groups:
//!
//! * **Client errors** (400, or 413 for an oversized body): the upload
//!   itself is unusable, e.g. its content does not match its name.
//! * **Conversion errors** (500): the upload was valid but a backend failed.
//!
//! [`ConvertError`] implements [`axum::response::IntoResponse`], so handlers
//! return it directly. Messages never contain filesystem paths: backend
//! details are redacted with [`redact_path`] before they are stored here, and
//! [`ConvertError::Internal`] is only ever logged, never echoed to the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::path::Path;
use thiserror::Error;
use tracing::error;

/// All errors produced while validating or converting an upload.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Upload errors ─────────────────────────────────────────────────────
    /// The multipart body carried no `file` field, or it was empty.
    #[error("No file was provided in the 'file' field")]
    NoFileProvided,

    /// The multipart body carried no usable `output_format` field.
    #[error("No output format was provided in the 'output_format' field")]
    MissingOutputFormat,

    /// The multipart body could not be parsed.
    #[error("Malformed upload: {0}")]
    MalformedUpload(String),

    /// The request body exceeded the configured upload limit.
    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),

    // ── Validation errors ─────────────────────────────────────────────────
    /// The input extension is not in the format registry.
    #[error("Unsupported file extension '{extension}'")]
    UnsupportedExtension { extension: String },

    /// The requested output is not a valid target for this input.
    #[error("Cannot convert '{input}' to '{output}'. Available: [{available}]")]
    UnsupportedOutput {
        input: String,
        output: String,
        available: String,
    },

    /// Sniffed content type disagrees with the claimed extension.
    #[error("File content ({detected}) does not match its '.{extension}' extension (expected {expected})")]
    ContentTypeMismatch {
        extension: String,
        expected: &'static str,
        detected: &'static str,
    },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// An external conversion engine failed or produced no output.
    #[error("{backend} conversion failed: {detail}")]
    Backend {
        backend: &'static str,
        detail: String,
    },

    /// The image codec could not decode or encode the file.
    #[error("Image conversion failed: {0}")]
    ImageConversion(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (I/O on the workspace, join failures).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// Stable machine-readable code sent alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            ConvertError::NoFileProvided => "no_file_provided",
            ConvertError::MissingOutputFormat => "missing_output_format",
            ConvertError::MalformedUpload(_) => "malformed_upload",
            ConvertError::PayloadTooLarge(_) => "payload_too_large",
            ConvertError::UnsupportedExtension { .. } | ConvertError::UnsupportedOutput { .. } => {
                "unsupported_extension"
            }
            ConvertError::ContentTypeMismatch { .. } => "content_type_mismatch",
            ConvertError::Backend { .. } => "conversion_backend_error",
            ConvertError::ImageConversion(_) => "image_conversion_error",
            ConvertError::InvalidConfig(_) | ConvertError::Internal(_) => "internal",
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ConvertError::NoFileProvided
            | ConvertError::MissingOutputFormat
            | ConvertError::MalformedUpload(_)
            | ConvertError::UnsupportedExtension { .. }
            | ConvertError::UnsupportedOutput { .. }
            | ConvertError::ContentTypeMismatch { .. } => StatusCode::BAD_REQUEST,
            ConvertError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ConvertError::Backend { .. }
            | ConvertError::ImageConversion(_)
            | ConvertError::InvalidConfig(_)
            | ConvertError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Build a [`ConvertError::Backend`] with `work_dir` scrubbed from `detail`.
    pub fn backend(backend: &'static str, detail: impl AsRef<str>, work_dir: &Path) -> Self {
        ConvertError::Backend {
            backend,
            detail: redact_path(detail.as_ref(), work_dir),
        }
    }

    /// Build a [`ConvertError::ImageConversion`] with `work_dir` scrubbed.
    pub fn image(detail: impl AsRef<str>, work_dir: &Path) -> Self {
        ConvertError::ImageConversion(redact_path(detail.as_ref(), work_dir))
    }
}

impl IntoResponse for ConvertError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ConvertError::Internal(m) | ConvertError::InvalidConfig(m) => {
                error!(message = %m, "internal server error");
                "internal server error".to_owned()
            }
            ConvertError::Backend { .. } | ConvertError::ImageConversion(_) => {
                error!(error = %self, "conversion failed");
                self.to_string()
            }
            _ => self.to_string(),
        };
        (status, Json(json!({ "error": message, "kind": self.kind() }))).into_response()
    }
}

impl From<axum::extract::multipart::MultipartError> for ConvertError {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ConvertError::PayloadTooLarge(e.body_text())
        } else {
            ConvertError::MalformedUpload(e.body_text())
        }
    }
}

/// Replace every occurrence of `dir` in `text` with `<workspace>`.
pub fn redact_path(text: &str, dir: &Path) -> String {
    let needle = dir.display().to_string();
    if needle.is_empty() {
        return text.to_string();
    }
    text.replace(&needle, "<workspace>")
}
