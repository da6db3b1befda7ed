//! # convertkit
//!
//! An HTTP service that converts uploaded documents (PDF, DOC, DOCX, ODT)
//! and images (PNG, JPEG, BMP, GIF, TIFF).
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Sniff      classify bytes by magic number, ignore the filename
//!  ├─ 2. Validate   claimed extension vs. sniffed type, allowed outputs
//!  ├─ 3. Stage      write the upload into a per-request workspace
//!  ├─ 4. Dispatch   pdf→docx direct │ documents→LibreOffice │ images→re-encode
//!  └─ 5. Stream     send the file back; workspace removed when the body ends
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use convertkit::{serve, AppState, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::builder()
//!         .bind_address("127.0.0.1:8000")
//!         .build()?;
//!     serve(AppState::new(config), async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `convertkit` binary (clap + anyhow + tracing-subscriber) |
//!
//! ## Scaling limit
//!
//! Requests are not queued. Every document conversion starts its own
//! LibreOffice process, so concurrency is bounded only by host resources.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod formats;
pub mod pipeline;
pub mod server;
pub mod sniff;
pub mod stream;
pub mod workspace;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ServerConfig, ServerConfigBuilder};
pub use convert::{ConversionJob, Converter, Route};
pub use error::ConvertError;
pub use formats::{available_outputs, expected_mime_type, resolve_input_format, Format, FormatDescriptor, FormatKind};
pub use pipeline::office::{LibreOffice, OfficeSuite};
pub use pipeline::pdf_docx::{PdfToDocx, PdfiumDocxConverter};
pub use server::upload::ConversionRequest;
pub use server::{build_router, serve, AppState};
pub use sniff::sniff;
pub use workspace::Workspace;
