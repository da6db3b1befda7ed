//! HTTP handlers.
//!
//! Both conversion endpoints follow the same shape: parse the upload,
//! validate it against the registry, then hand off to [`run_conversion`],
//! which owns the workspace for the rest of the request.

use super::upload::ConversionRequest;
use super::AppState;
use crate::convert::ConversionJob;
use crate::error::ConvertError;
use crate::formats::{self, Format, FormatKind};
use crate::sniff;
use crate::stream::WorkspaceStream;
use crate::workspace::Workspace;
use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

/// Body of `GET /formats/{extension}`.
#[derive(Debug, Serialize)]
pub struct FormatsResponse {
    pub formats: Vec<Format>,
}

/// `GET|HEAD /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /formats/{extension}`
pub async fn formats(Path(extension): Path<String>) -> Json<FormatsResponse> {
    Json(FormatsResponse {
        formats: formats::available_outputs(&extension),
    })
}

/// `POST /convert/document`
pub async fn convert_document(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ConvertError> {
    let request = ConversionRequest::from_multipart(multipart).await?;
    let input = validate_document(&request)?;
    let output = formats::resolve_output_format(input, request.output_format()?)
        .inspect_err(|e| warn!("Rejected document upload: {}", e))?;
    run_conversion(&state, &request, input, output).await
}

/// `POST /convert/image`
pub async fn convert_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ConvertError> {
    let request = ConversionRequest::from_multipart(multipart).await?;
    let requested = request.output_format()?;

    let output = Format::from_extension(requested)
        .filter(|f| f.kind() == FormatKind::Image)
        .ok_or_else(|| ConvertError::UnsupportedExtension {
            extension: formats::normalize_extension(requested),
        })
        .inspect_err(|e| warn!("Rejected image upload: {}", e))?;

    let claimed = request.claimed_extension();
    let input = sniff::sniff_image_format(&request.raw_bytes)
        .or_else(|| Format::from_extension(&claimed).filter(|f| f.kind() == FormatKind::Image))
        .ok_or_else(|| ConvertError::UnsupportedExtension { extension: claimed })
        .inspect_err(|e| warn!("Rejected image upload: {}", e))?;

    let output = formats::resolve_output_format(input, output.extension())
        .inspect_err(|e| warn!("Rejected image upload: {}", e))?;
    run_conversion(&state, &request, input, output).await
}

/// Check the claimed extension and the sniffed content agree on a document format.
fn validate_document(request: &ConversionRequest) -> Result<Format, ConvertError> {
    let extension = request.claimed_extension();
    let format = formats::resolve_input_format(&extension)
        .ok()
        .filter(|f| f.kind() == FormatKind::Document)
        .ok_or_else(|| ConvertError::UnsupportedExtension {
            extension: extension.clone(),
        })
        .inspect_err(|e| warn!("Rejected document upload: {}", e))?;

    let detected = sniff::sniff(&request.raw_bytes);
    if !format.accepts_sniffed(detected) {
        let err = ConvertError::ContentTypeMismatch {
            extension,
            expected: format.mime_type(),
            detected,
        };
        warn!("Rejected document upload: {}", err);
        return Err(err);
    }
    Ok(format)
}

/// Stage, convert, and stream the result; the workspace lives exactly as long
/// as this call on failure, or as long as the response body on success.
async fn run_conversion(
    state: &AppState,
    request: &ConversionRequest,
    input: Format,
    output: Format,
) -> Result<Response, ConvertError> {
    let workspace = Workspace::acquire(state.config.scratch_dir.as_deref())
        .map_err(|e| ConvertError::Internal(format!("cannot create workspace: {e}")))?;

    let base = request.base_name();
    info!(
        "Converting '{}' ({} bytes) {} → {}",
        base,
        request.raw_bytes.len(),
        input,
        output
    );

    let job = ConversionJob::stage(&workspace, &base, input, output, &request.raw_bytes).await?;
    let produced = state.converter.run(&job).await?;

    let file = tokio::fs::File::open(&produced)
        .await
        .map_err(|e| ConvertError::Internal(format!("cannot open converted file: {e}")))?;
    let length = file
        .metadata()
        .await
        .map_err(|e| ConvertError::Internal(format!("cannot stat converted file: {e}")))?
        .len();

    let filename = format!("{base}.{}", output.extension());
    Response::builder()
        .header(header::CONTENT_TYPE, output.mime_type())
        .header(header::CONTENT_LENGTH, length)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from_stream(WorkspaceStream::new(file, workspace)))
        .map_err(|e| ConvertError::Internal(e.to_string()))
}
