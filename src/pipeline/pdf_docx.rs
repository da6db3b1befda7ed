//! Direct PDF → DOCX conversion.
//!
//! Page text is pulled out with pdfium and laid into a fresh Word document:
//! one paragraph per text line, a page break between PDF pages. Layout,
//! images and fonts are not carried over.
//!
//! pdfium keeps thread-local state and is not async-safe; callers run
//! [`PdfToDocx::convert`] inside `spawn_blocking`.

use crate::error::ConvertError;
use docx_rs::{BreakType, Docx, Paragraph, Run};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const BACKEND_NAME: &str = "PDF to DOCX";

/// A blocking converter from a PDF file to a DOCX file.
pub trait PdfToDocx: Send + Sync {
    fn convert(&self, input: &Path, output: &Path) -> Result<(), ConvertError>;
}

/// [`PdfToDocx`] backed by pdfium text extraction and `docx-rs`.
#[derive(Debug, Clone, Default)]
pub struct PdfiumDocxConverter {
    library_dir: Option<PathBuf>,
}

impl PdfiumDocxConverter {
    /// Bind to pdfium in `library_dir`, or the system library when `None`.
    pub fn new(library_dir: Option<PathBuf>) -> Self {
        Self { library_dir }
    }

    fn bind(&self) -> Result<Pdfium, String> {
        let bindings = match &self.library_dir {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| format!("pdfium library unavailable: {e:?}"))?;
        Ok(Pdfium::new(bindings))
    }
}

impl PdfToDocx for PdfiumDocxConverter {
    fn convert(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        let work_dir = input.parent().unwrap_or(Path::new(""));
        let fail = |detail: String| ConvertError::backend(BACKEND_NAME, detail, work_dir);

        let pdfium = self.bind().map_err(fail)?;
        let pages = extract_page_text(&pdfium, input).map_err(fail)?;
        info!("Extracted text from {} PDF pages", pages.len());
        write_docx(&pages, output).map_err(fail)
    }
}

/// Text of every page, in order.
pub fn extract_page_text(pdfium: &Pdfium, input: &Path) -> Result<Vec<String>, String> {
    let document = pdfium
        .load_pdf_from_file(input, None)
        .map_err(|e| format!("cannot open PDF: {e:?}"))?;

    let mut pages = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| format!("cannot read text of page {}: {e:?}", idx + 1))?
            .all();
        debug!("Page {} → {} chars", idx + 1, text.len());
        pages.push(text);
    }
    Ok(pages)
}

/// Write `pages` to `output` as a DOCX document.
pub fn write_docx(pages: &[String], output: &Path) -> Result<(), String> {
    let mut docx = Docx::new();
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            docx = docx.add_paragraph(
                Paragraph::new().add_run(Run::new().add_break(BreakType::Page)),
            );
        }
        for line in page.lines() {
            docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(clean_line(line))));
        }
    }

    let file = std::fs::File::create(output).map_err(|e| format!("cannot create DOCX: {e}"))?;
    docx.build()
        .pack(file)
        .map_err(|e| format!("cannot write DOCX: {e}"))
}

/// Drop control characters that are invalid in WordprocessingML text.
fn clean_line(line: &str) -> String {
    line.trim_end()
        .chars()
        .filter(|c| *c == '\t' || !c.is_control())
        .collect()
}
