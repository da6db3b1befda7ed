//! Server configuration.
//!
//! All runtime behaviour is controlled through [`ServerConfig`], built via
//! [`ServerConfigBuilder`]. The config is constructed once at start-up and
//! handed to [`crate::server::AppState`]; nothing reads the environment after
//! that point.

use crate::error::ConvertError;
use axum::http::{HeaderValue, Uri};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the conversion service.
///
/// # Example
/// ```rust
/// use convertkit::ServerConfig;
///
/// let config = ServerConfig::builder()
///     .bind_address("127.0.0.1:9000")
///     .cors_origins(["https://app.example.com"])
///     .office_timeout_secs(120)
///     .build()
///     .unwrap();
/// assert_eq!(config.office_timeout(), Some(std::time::Duration::from_secs(120)));
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP address to bind. Default: `0.0.0.0:8000`.
    pub bind_address: String,

    /// Allowed CORS origins (`scheme://host[:port]`). Empty, or containing
    /// `*`, allows any origin.
    pub cors_origins: Vec<String>,

    /// Office-suite executable used for headless conversion. Default: `libreoffice`.
    pub office_program: PathBuf,

    /// Kill the office-suite process after this many seconds. Default: no limit.
    pub office_timeout_secs: Option<u64>,

    /// Directory containing the pdfium shared library.
    /// If None, the system library search path is used.
    pub pdfium_library_dir: Option<PathBuf>,

    /// Parent directory for per-request workspaces. If None, the OS temp dir.
    pub scratch_dir: Option<PathBuf>,

    /// Maximum accepted request body in bytes. Default: 50 MiB.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            cors_origins: Vec::new(),
            office_program: PathBuf::from("libreoffice"),
            office_timeout_secs: None,
            pdfium_library_dir: None,
            scratch_dir: None,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Create a new builder for `ServerConfig`.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn office_timeout(&self) -> Option<Duration> {
        self.office_timeout_secs.map(Duration::from_secs)
    }

    /// True when no origin restriction applies.
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn bind_address(mut self, addr: impl Into<String>) -> Self {
        self.config.bind_address = addr.into();
        self
    }

    pub fn cors_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.cors_origins = origins
            .into_iter()
            .map(Into::into)
            .map(|o: String| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        self
    }

    pub fn office_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.office_program = program.into();
        self
    }

    pub fn office_timeout_secs(mut self, secs: u64) -> Self {
        self.config.office_timeout_secs = Some(secs);
        self
    }

    pub fn pdfium_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_dir = Some(dir.into());
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = Some(dir.into());
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServerConfig, ConvertError> {
        let c = &self.config;
        if c.bind_address.trim().is_empty() {
            return Err(ConvertError::InvalidConfig("bind address is empty".into()));
        }
        if c.office_program.as_os_str().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "office program must not be empty".into(),
            ));
        }
        if c.office_timeout_secs == Some(0) {
            return Err(ConvertError::InvalidConfig(
                "office timeout must be ≥ 1 second".into(),
            ));
        }
        if let Some(bad) = c
            .cors_origins
            .iter()
            .find(|o| o.as_str() != "*" && !is_valid_origin(o))
        {
            return Err(ConvertError::InvalidConfig(format!(
                "CORS origin '{bad}' is not of the form scheme://host[:port]"
            )));
        }
        if c.max_upload_bytes == 0 {
            return Err(ConvertError::InvalidConfig(
                "max upload size must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Whether `origin` can match a browser `Origin` header exactly.
pub fn is_valid_origin(origin: &str) -> bool {
    let Ok(uri) = origin.parse::<Uri>() else {
        return false;
    };
    uri.scheme().is_some()
        && uri.authority().is_some()
        && matches!(uri.path(), "" | "/")
        && uri.query().is_none()
        && !origin.ends_with('/')
        && HeaderValue::from_str(origin).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_address, "0.0.0.0:8000");
        assert_eq!(c.office_program, PathBuf::from("libreoffice"));
        assert!(c.office_timeout().is_none());
        assert!(c.allows_any_origin());
    }

    #[test]
    fn test_cors_origins_trimmed() {
        let c = ServerConfig::builder()
            .cors_origins([" https://a.example ", "", "https://b.example"])
            .build()
            .unwrap();
        assert_eq!(c.cors_origins, vec!["https://a.example", "https://b.example"]);
        assert!(!c.allows_any_origin());
    }

    #[test]
    fn test_wildcard_origin() {
        let c = ServerConfig::builder().cors_origins(["*"]).build().unwrap();
        assert!(c.allows_any_origin());
    }

    #[test]
    fn test_origin_validation() {
        assert!(is_valid_origin("https://app.example.com"));
        assert!(is_valid_origin("http://localhost:3000"));
        assert!(!is_valid_origin("app.example.com"));
        assert!(!is_valid_origin("https://app.example.com/"));
        assert!(!is_valid_origin("https://app.example.com/path"));
        assert!(!is_valid_origin("https://exa mple.com"));
        assert!(!is_valid_origin(""));
    }

    #[test]
    fn test_unparseable_origin_rejected() {
        let err = ServerConfig::builder()
            .cors_origins(["https://ok.example", "htps//typo.example"])
            .build()
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));
        assert!(err.to_string().contains("typo.example"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ServerConfig::builder().office_timeout_secs(0).build().is_err());
        assert!(ServerConfig::builder().max_upload_bytes(0).build().is_err());
        assert!(ServerConfig::builder().bind_address(" ").build().is_err());
        assert!(ServerConfig::builder().office_program("").build().is_err());
    }
}
