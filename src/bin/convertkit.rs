//! Server binary for convertkit.
//!
//! A thin shim over the library crate that maps CLI flags (or their
//! `CONVERTKIT_*` environment variables) to `ServerConfig` and serves until
//! Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use convertkit::{serve, AppState, ServerConfig};
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"ENDPOINTS:
  POST /convert/document   multipart: file, output_format   (pdf→docx, doc/docx/odt→pdf)
  POST /convert/image      multipart: file, output_format   (png, jpeg, bmp, gif, tiff)
  GET  /formats/{ext}      {"formats": [...]}
  GET  /health             {"status": "ok"}

EXAMPLES:
  # Serve on the default address (0.0.0.0:8000)
  convertkit

  # Restrict CORS and use a specific soffice build
  convertkit --cors-origins https://app.example.com --office-program /opt/libreoffice/program/soffice

  # Convert a document
  curl -F file=@report.pdf -F output_format=docx -OJ http://localhost:8000/convert/document

REQUIREMENTS:
  LibreOffice on PATH (or --office-program) for doc/docx/odt → pdf.
  libpdfium on the library search path (or --pdfium-lib-dir) for pdf → docx.
"#;

/// Convert uploaded documents and images over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "convertkit",
    version,
    about = "HTTP service converting documents (PDF, DOC, DOCX, ODT) and images (PNG, JPEG, BMP, GIF, TIFF)",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "CONVERTKIT_BIND", default_value = "0.0.0.0:8000")]
    bind: String,

    /// Comma-separated list of allowed CORS origins ("*" allows any).
    #[arg(long, env = "CONVERTKIT_CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    cors_origins: Vec<String>,

    /// LibreOffice executable used for headless conversion.
    #[arg(long, env = "CONVERTKIT_OFFICE_PROGRAM", default_value = "libreoffice")]
    office_program: PathBuf,

    /// Kill a LibreOffice run after this many seconds.
    #[arg(long, env = "CONVERTKIT_OFFICE_TIMEOUT",
          value_parser = clap::value_parser!(u64).range(1..))]
    office_timeout: Option<u64>,

    /// Directory containing libpdfium (default: system library path).
    #[arg(long, env = "CONVERTKIT_PDFIUM_LIB_DIR")]
    pdfium_lib_dir: Option<PathBuf>,

    /// Parent directory for per-request scratch workspaces.
    #[arg(long, env = "CONVERTKIT_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Maximum upload size in MiB.
    #[arg(long, env = "CONVERTKIT_MAX_UPLOAD_MB", default_value_t = 50,
          value_parser = clap::value_parser!(u64).range(1..=4096))]
    max_upload_mb: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CONVERTKIT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CONVERTKIT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        office = %config.office_program.display(),
        "convertkit starting"
    );

    serve(AppState::new(config), shutdown_signal())
        .await
        .context("Server failed")?;

    info!("convertkit stopped");
    Ok(())
}

/// Map CLI args to `ServerConfig`.
fn build_config(cli: &Cli) -> Result<ServerConfig> {
    let mut builder = ServerConfig::builder()
        .bind_address(&cli.bind)
        .cors_origins(cli.cors_origins.iter().cloned())
        .office_program(cli.office_program.clone())
        .max_upload_bytes((cli.max_upload_mb * 1024 * 1024) as usize);

    if let Some(secs) = cli.office_timeout {
        builder = builder.office_timeout_secs(secs);
    }
    if let Some(ref dir) = cli.pdfium_lib_dir {
        builder = builder.pdfium_library_dir(dir.clone());
    }
    if let Some(ref dir) = cli.scratch_dir {
        builder = builder.scratch_dir(dir.clone());
    }

    builder.build().context("Invalid configuration")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
