//! Conversion dispatch.
//!
//! [`ConversionJob::stage`] writes the upload into a workspace, and
//! [`Converter::run`] picks a backend for the `(input, output)` pair, runs it
//! off the async executor, and checks that the expected file appeared.
//!
//! | Input | Output | Backend |
//! |-------|--------|---------|
//! | image | image  | [`raster`] re-encode |
//! | pdf   | docx   | [`PdfToDocx`] direct converter |
//! | other documents | pdf | [`OfficeSuite`] headless run |

use crate::config::ServerConfig;
use crate::error::ConvertError;
use crate::formats::{Format, FormatKind};
use crate::pipeline::office::{LibreOffice, OfficeSuite};
use crate::pipeline::pdf_docx::{PdfToDocx, PdfiumDocxConverter};
use crate::pipeline::raster;
use crate::workspace::Workspace;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// A validated conversion with its files staged in a workspace.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub input_format: Format,
    pub output_format: Format,
    pub work_dir: PathBuf,
}

impl ConversionJob {
    /// Write `bytes` to `<workspace>/<base>.<input ext>` and describe the job.
    pub async fn stage(
        workspace: &Workspace,
        base_name: &str,
        input_format: Format,
        output_format: Format,
        bytes: &[u8],
    ) -> Result<Self, ConvertError> {
        let input_path = workspace.file(base_name, input_format.extension());
        let output_path = workspace.file(base_name, output_format.extension());

        tokio::fs::write(&input_path, bytes)
            .await
            .map_err(|e| ConvertError::Internal(format!("failed to stage upload: {e}")))?;
        debug!("Staged {} bytes as {}", bytes.len(), input_path.display());

        Ok(Self {
            input_path,
            output_path,
            input_format,
            output_format,
            work_dir: workspace.path().to_path_buf(),
        })
    }
}

/// Which backend handles a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    PdfToDocx,
    OfficeSuite,
    Image,
}

impl Route {
    pub fn for_formats(input: Format, output: Format) -> Route {
        match (input.kind(), input, output) {
            (FormatKind::Image, _, _) => Route::Image,
            (_, Format::Pdf, Format::Docx) => Route::PdfToDocx,
            _ => Route::OfficeSuite,
        }
    }
}

/// Dispatches jobs to the configured backends.
#[derive(Clone)]
pub struct Converter {
    office: Arc<dyn OfficeSuite>,
    pdf_to_docx: Arc<dyn PdfToDocx>,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("office", &"<dyn OfficeSuite>")
            .field("pdf_to_docx", &"<dyn PdfToDocx>")
            .finish()
    }
}

impl Converter {
    pub fn new(office: Arc<dyn OfficeSuite>, pdf_to_docx: Arc<dyn PdfToDocx>) -> Self {
        Self {
            office,
            pdf_to_docx,
        }
    }

    /// LibreOffice and pdfium backends as described by `config`.
    pub fn from_config(config: &ServerConfig) -> Self {
        let office = LibreOffice::new(config.office_program.clone())
            .with_timeout(config.office_timeout());
        let pdf = PdfiumDocxConverter::new(config.pdfium_library_dir.clone());
        Self::new(Arc::new(office), Arc::new(pdf))
    }

    /// Run `job` and return the path of the produced file.
    pub async fn run(&self, job: &ConversionJob) -> Result<PathBuf, ConvertError> {
        let started = Instant::now();
        let route = Route::for_formats(job.input_format, job.output_format);
        debug!(
            "Dispatching {} → {} via {:?}",
            job.input_format, job.output_format, route
        );

        let input = job.input_path.clone();
        let output = job.output_path.clone();
        let work_dir = job.work_dir.clone();

        let task = match route {
            Route::PdfToDocx => {
                let backend = Arc::clone(&self.pdf_to_docx);
                tokio::task::spawn_blocking(move || backend.convert(&input, &output))
            }
            Route::OfficeSuite => {
                let office = Arc::clone(&self.office);
                let target = job.output_format.extension();
                tokio::task::spawn_blocking(move || office.convert(&input, target, &work_dir))
            }
            Route::Image => {
                let format = job.output_format.image_format().ok_or_else(|| {
                    ConvertError::Internal(format!("{} has no image encoder", job.output_format))
                })?;
                tokio::task::spawn_blocking(move || {
                    raster::convert_image(&input, &output, format)
                        .map_err(|e| ConvertError::image(e.to_string(), &work_dir))
                })
            }
        };

        task.await
            .map_err(|e| ConvertError::Internal(format!("conversion task panicked: {e}")))??;

        if !tokio::fs::try_exists(&job.output_path).await.unwrap_or(false) {
            let detail = format!("no .{} file was produced", job.output_format);
            return Err(match route {
                Route::Image => ConvertError::ImageConversion(detail),
                Route::PdfToDocx => ConvertError::Backend {
                    backend: "PDF to DOCX",
                    detail,
                },
                Route::OfficeSuite => ConvertError::Backend {
                    backend: "LibreOffice",
                    detail,
                },
            });
        }

        info!(
            "Converted {} → {} in {}ms",
            job.input_format,
            job.output_format,
            started.elapsed().as_millis()
        );
        Ok(job.output_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Mutex;

    /// Records calls; writes the expected output unless told not to.
    #[derive(Default)]
    struct FakeOffice {
        calls: Mutex<Vec<(PathBuf, String)>>,
        produce: bool,
    }

    impl OfficeSuite for FakeOffice {
        fn convert(&self, input: &Path, target: &str, out_dir: &Path) -> Result<(), ConvertError> {
            self.calls
                .lock()
                .unwrap()
                .push((input.to_path_buf(), target.to_string()));
            if self.produce {
                let stem = input.file_stem().unwrap().to_string_lossy();
                std::fs::write(out_dir.join(format!("{stem}.{target}")), b"%PDF-1.4").unwrap();
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakePdf {
        calls: Mutex<Vec<PathBuf>>,
    }

    impl PdfToDocx for FakePdf {
        fn convert(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
            self.calls.lock().unwrap().push(input.to_path_buf());
            std::fs::write(output, b"PK\x03\x04").unwrap();
            Ok(())
        }
    }

    fn converter(office: Arc<FakeOffice>, pdf: Arc<FakePdf>) -> Converter {
        Converter::new(office, pdf)
    }

    #[test]
    fn test_routes() {
        assert_eq!(Route::for_formats(Format::Pdf, Format::Docx), Route::PdfToDocx);
        assert_eq!(Route::for_formats(Format::Docx, Format::Pdf), Route::OfficeSuite);
        assert_eq!(Route::for_formats(Format::Odt, Format::Pdf), Route::OfficeSuite);
        assert_eq!(Route::for_formats(Format::Png, Format::Jpeg), Route::Image);
    }

    #[tokio::test]
    async fn test_pdf_to_docx_uses_direct_converter() {
        let office = Arc::new(FakeOffice::default());
        let pdf = Arc::new(FakePdf::default());
        let ws = Workspace::acquire(None).unwrap();
        let job = ConversionJob::stage(&ws, "report", Format::Pdf, Format::Docx, b"%PDF-1.4")
            .await
            .unwrap();

        let out = converter(office.clone(), pdf.clone()).run(&job).await.unwrap();
        assert_eq!(out, ws.path().join("report.docx"));
        assert_eq!(pdf.calls.lock().unwrap().as_slice(), [ws.path().join("report.pdf")]);
        assert!(office.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_documents_use_office_suite() {
        let office = Arc::new(FakeOffice {
            produce: true,
            ..Default::default()
        });
        let pdf = Arc::new(FakePdf::default());
        let ws = Workspace::acquire(None).unwrap();
        let job = ConversionJob::stage(&ws, "notes", Format::Odt, Format::Pdf, b"odt")
            .await
            .unwrap();

        let out = converter(office.clone(), pdf.clone()).run(&job).await.unwrap();
        assert_eq!(out, ws.path().join("notes.pdf"));
        let calls = office.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], (ws.path().join("notes.odt"), "pdf".to_string()));
        assert!(pdf.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_output_is_backend_error() {
        let office = Arc::new(FakeOffice::default());
        let ws = Workspace::acquire(None).unwrap();
        let job = ConversionJob::stage(&ws, "memo", Format::Doc, Format::Pdf, b"doc")
            .await
            .unwrap();

        let err = converter(office, Arc::new(FakePdf::default()))
            .run(&job)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "conversion_backend_error");
        assert!(!err.to_string().contains(&ws.path().display().to_string()));
    }

    #[tokio::test]
    async fn test_image_route_reencodes() {
        let ws = Workspace::acquire(None).unwrap();
        let mut png = Vec::new();
        image::DynamicImage::new_rgba8(4, 4)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let job = ConversionJob::stage(&ws, "photo", Format::Png, Format::Bmp, &png)
            .await
            .unwrap();

        let out = converter(Arc::default(), Arc::default()).run(&job).await.unwrap();
        assert_eq!(out, ws.path().join("photo.bmp"));
        assert_eq!(crate::sniff::sniff(&std::fs::read(out).unwrap()), "image/bmp");
    }

    #[tokio::test]
    async fn test_undecodable_image_is_image_error() {
        let ws = Workspace::acquire(None).unwrap();
        let job = ConversionJob::stage(&ws, "bad", Format::Png, Format::Gif, b"\x89PNG\r\n\x1a\n")
            .await
            .unwrap();
        let err = converter(Arc::default(), Arc::default())
            .run(&job)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "image_conversion_error");
        assert!(!err.to_string().contains(&ws.path().display().to_string()));
    }
}
