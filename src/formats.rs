//! Format registry: the fixed table of supported extensions.
//!
//! Each [`Format`] has exactly one canonical extension and one canonical MIME
//! type. Everything else in the crate (validation, dispatch, response headers,
//! `/formats` lookups) is derived from this table.
//!
//! | Input | Valid outputs |
//! |-------|---------------|
//! | `pdf` | `docx` |
//! | `doc`, `docx`, `odt` | `pdf` |
//! | any image | every other image format |

use crate::error::ConvertError;
use serde::Serialize;
use std::fmt;

/// Broad family a format belongs to; decides which endpoint and backend apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Document,
    Image,
}

/// A supported file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Pdf,
    Doc,
    Docx,
    Odt,
    Png,
    Jpeg,
    Bmp,
    Gif,
    Tiff,
}

/// Immutable `(extension, MIME type)` pair for a [`Format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatDescriptor {
    pub extension: &'static str,
    pub canonical_mime_type: &'static str,
}

/// Document formats in registry order.
pub const DOCUMENT_FORMATS: [Format; 4] = [Format::Pdf, Format::Doc, Format::Docx, Format::Odt];

/// Image formats in registry order.
pub const IMAGE_FORMATS: [Format; 5] = [
    Format::Png,
    Format::Jpeg,
    Format::Bmp,
    Format::Gif,
    Format::Tiff,
];

/// MIME types that a `.docx` upload may legitimately sniff as.
///
/// DOCX is a ZIP container; when the sniffer cannot see the `word/` part
/// early enough it reports a plain archive.
pub const DOCX_CONTAINER_MIME_TYPES: [&str; 1] = ["application/zip"];

impl Format {
    /// Look up a format by extension. Case-insensitive, leading `.` ignored.
    pub fn from_extension(ext: &str) -> Option<Format> {
        let ext = normalize_extension(ext);
        let format = match ext.as_str() {
            "pdf" => Format::Pdf,
            "doc" => Format::Doc,
            "docx" => Format::Docx,
            "odt" => Format::Odt,
            "png" => Format::Png,
            "jpeg" | "jpg" => Format::Jpeg,
            "bmp" => Format::Bmp,
            "gif" => Format::Gif,
            "tiff" | "tif" => Format::Tiff,
            _ => return None,
        };
        Some(format)
    }

    /// Reverse lookup from a canonical MIME type.
    pub fn from_mime_type(mime: &str) -> Option<Format> {
        DOCUMENT_FORMATS
            .iter()
            .chain(IMAGE_FORMATS.iter())
            .copied()
            .find(|f| f.mime_type() == mime)
    }

    pub fn descriptor(self) -> FormatDescriptor {
        let (extension, canonical_mime_type) = match self {
            Format::Pdf => ("pdf", "application/pdf"),
            Format::Doc => ("doc", "application/msword"),
            Format::Docx => (
                "docx",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            ),
            Format::Odt => ("odt", "application/vnd.oasis.opendocument.text"),
            Format::Png => ("png", "image/png"),
            Format::Jpeg => ("jpeg", "image/jpeg"),
            Format::Bmp => ("bmp", "image/bmp"),
            Format::Gif => ("gif", "image/gif"),
            Format::Tiff => ("tiff", "image/tiff"),
        };
        FormatDescriptor {
            extension,
            canonical_mime_type,
        }
    }

    pub fn extension(self) -> &'static str {
        self.descriptor().extension
    }

    pub fn mime_type(self) -> &'static str {
        self.descriptor().canonical_mime_type
    }

    pub fn kind(self) -> FormatKind {
        match self {
            Format::Pdf | Format::Doc | Format::Docx | Format::Odt => FormatKind::Document,
            _ => FormatKind::Image,
        }
    }

    /// Valid conversion targets for this format.
    pub fn outputs(self) -> Vec<Format> {
        match self {
            Format::Pdf => vec![Format::Docx],
            Format::Doc | Format::Docx | Format::Odt => vec![Format::Pdf],
            image => IMAGE_FORMATS.iter().copied().filter(|f| *f != image).collect(),
        }
    }

    /// Whether `sniffed` is acceptable content for a file claiming this format.
    pub fn accepts_sniffed(self, sniffed: &str) -> bool {
        sniffed == self.mime_type()
            || (self == Format::Docx && DOCX_CONTAINER_MIME_TYPES.contains(&sniffed))
    }

    /// Matching `image` crate encoder, `None` for documents.
    pub fn image_format(self) -> Option<image::ImageFormat> {
        match self {
            Format::Png => Some(image::ImageFormat::Png),
            Format::Jpeg => Some(image::ImageFormat::Jpeg),
            Format::Bmp => Some(image::ImageFormat::Bmp),
            Format::Gif => Some(image::ImageFormat::Gif),
            Format::Tiff => Some(image::ImageFormat::Tiff),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Lower-case an extension and drop a leading dot and surrounding whitespace.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Resolve an input extension, rejecting anything outside the registry.
pub fn resolve_input_format(extension: &str) -> Result<Format, ConvertError> {
    Format::from_extension(extension).ok_or_else(|| ConvertError::UnsupportedExtension {
        extension: normalize_extension(extension),
    })
}

/// Canonical MIME type expected for content carrying `extension`.
pub fn expected_mime_type(extension: &str) -> Option<&'static str> {
    Format::from_extension(extension).map(Format::mime_type)
}

/// Valid output formats for `extension`; empty when unknown.
pub fn available_outputs(extension: &str) -> Vec<Format> {
    Format::from_extension(extension)
        .map(Format::outputs)
        .unwrap_or_default()
}

/// Resolve `requested` as an output of `input`.
pub fn resolve_output_format(input: Format, requested: &str) -> Result<Format, ConvertError> {
    let outputs = input.outputs();
    match Format::from_extension(requested) {
        Some(out) if outputs.contains(&out) => Ok(out),
        _ => Err(ConvertError::UnsupportedOutput {
            input: input.extension().to_string(),
            output: normalize_extension(requested),
            available: outputs
                .iter()
                .map(|f| f.extension())
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_outputs() {
        assert_eq!(available_outputs("pdf"), vec![Format::Docx]);
        for ext in ["doc", "docx", "odt"] {
            assert_eq!(available_outputs(ext), vec![Format::Pdf], "ext={ext}");
        }
    }

    #[test]
    fn test_image_outputs_exclude_self() {
        for f in IMAGE_FORMATS {
            let outputs = available_outputs(f.extension());
            assert_eq!(outputs.len(), IMAGE_FORMATS.len() - 1);
            assert!(!outputs.contains(&f), "{f} must not convert to itself");
        }
    }

    #[test]
    fn test_unknown_extension_has_no_outputs() {
        assert!(available_outputs("txt").is_empty());
        assert!(available_outputs("").is_empty());
        assert!(matches!(
            resolve_input_format("exe"),
            Err(ConvertError::UnsupportedExtension { .. })
        ));
    }

    #[test]
    fn test_extension_normalisation() {
        assert_eq!(Format::from_extension(".PDF"), Some(Format::Pdf));
        assert_eq!(Format::from_extension(" Jpg "), Some(Format::Jpeg));
        assert_eq!(Format::from_extension("tif"), Some(Format::Tiff));
        assert_eq!(available_outputs("JPG"), available_outputs("jpeg"));
    }

    #[test]
    fn test_expected_mime_type() {
        assert_eq!(expected_mime_type("pdf"), Some("application/pdf"));
        assert_eq!(expected_mime_type("odt"), Some("application/vnd.oasis.opendocument.text"));
        assert_eq!(expected_mime_type("txt"), None);
    }

    #[test]
    fn test_each_extension_has_one_mime() {
        for f in DOCUMENT_FORMATS.iter().chain(IMAGE_FORMATS.iter()) {
            assert_eq!(Format::from_mime_type(f.mime_type()), Some(*f));
            assert_eq!(Format::from_extension(f.extension()), Some(*f));
        }
    }

    #[test]
    fn test_docx_accepts_zip_only() {
        assert!(Format::Docx.accepts_sniffed("application/zip"));
        assert!(Format::Docx.accepts_sniffed(Format::Docx.mime_type()));
        assert!(!Format::Odt.accepts_sniffed("application/zip"));
        assert!(!Format::Pdf.accepts_sniffed("application/octet-stream"));
    }

    #[test]
    fn test_resolve_output_rejects_self_conversion() {
        let err = resolve_output_format(Format::Png, "png").unwrap_err();
        assert_eq!(err.kind(), "unsupported_extension");
        assert_eq!(resolve_output_format(Format::Png, "BMP").unwrap(), Format::Bmp);
        assert_eq!(resolve_output_format(Format::Pdf, "docx").unwrap(), Format::Docx);
        assert!(resolve_output_format(Format::Docx, "odt").is_err());
    }

    #[test]
    fn test_kind() {
        assert_eq!(Format::Odt.kind(), FormatKind::Document);
        assert_eq!(Format::Gif.kind(), FormatKind::Image);
        assert!(Format::Doc.image_format().is_none());
        assert_eq!(Format::Tiff.image_format(), Some(image::ImageFormat::Tiff));
    }
}
