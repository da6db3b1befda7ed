//! Headless office-suite conversion (LibreOffice).
//!
//! The suite is driven entirely by command-line arguments:
//!
//! ```text
//! libreoffice -env:UserInstallation=file://<out_dir>/.profile \
//!     --headless --convert-to <ext> --outdir <out_dir> <input>
//! ```
//!
//! It writes `<input stem>.<ext>` into `out_dir`. A zero exit status does not
//! guarantee that file exists; the dispatcher checks for it separately.
//!
//! Every run gets its own user profile inside the job's workspace. A shared
//! profile is locked by the first running instance and concurrent
//! invocations would otherwise exit early without converting anything.
//!
//! On Unix the launcher is started in its own process group, so a timeout
//! kills `soffice.bin` and any other helpers along with it.

use crate::error::ConvertError;
use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const BACKEND_NAME: &str = "LibreOffice";
const PROFILE_DIR: &str = ".profile";
const STDERR_LOG: &str = ".office-stderr.log";
const POLL_INTERVAL: Duration = Duration::from_millis(50);
const MAX_DETAIL_CHARS: usize = 500;

/// A blocking, headless document converter.
///
/// Implementations are called from `spawn_blocking` and may block freely.
pub trait OfficeSuite: Send + Sync {
    /// Convert `input` to `target_extension`, writing the result into `out_dir`.
    fn convert(&self, input: &Path, target_extension: &str, out_dir: &Path)
        -> Result<(), ConvertError>;
}

/// Runs a LibreOffice (or compatible `soffice`) executable.
#[derive(Debug, Clone)]
pub struct LibreOffice {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl LibreOffice {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Kill the process if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Command-line arguments for one conversion.
    pub fn args(input: &Path, target_extension: &str, out_dir: &Path) -> Vec<OsString> {
        let profile = out_dir.join(PROFILE_DIR);
        vec![
            format!("-env:UserInstallation=file://{}", profile.display()).into(),
            "--headless".into(),
            "--convert-to".into(),
            target_extension.into(),
            "--outdir".into(),
            out_dir.as_os_str().to_owned(),
            input.as_os_str().to_owned(),
        ]
    }

    fn wait(&self, child: &mut Child) -> std::io::Result<Option<ExitStatus>> {
        let Some(limit) = self.timeout else {
            return child.wait().map(Some);
        };
        let deadline = Instant::now() + limit;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                warn!("{} exceeded {}s, killing it", BACKEND_NAME, limit.as_secs());
                kill_tree(child)?;
                child.wait()?;
                return Ok(None);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Default for LibreOffice {
    fn default() -> Self {
        Self::new("libreoffice")
    }
}

impl OfficeSuite for LibreOffice {
    fn convert(
        &self,
        input: &Path,
        target_extension: &str,
        out_dir: &Path,
    ) -> Result<(), ConvertError> {
        let args = Self::args(input, target_extension, out_dir);
        debug!("Running {} {:?}", self.program.display(), args);

        let stderr_path = out_dir.join(STDERR_LOG);
        let stderr = File::create(&stderr_path)
            .map_err(|e| ConvertError::backend(BACKEND_NAME, e.to_string(), out_dir))?;

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr));
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command
            .spawn()
            .map_err(|e| {
                ConvertError::backend(
                    BACKEND_NAME,
                    format!("failed to start '{}': {}", self.program.display(), e),
                    out_dir,
                )
            })?;

        let status = self
            .wait(&mut child)
            .map_err(|e| ConvertError::backend(BACKEND_NAME, e.to_string(), out_dir))?;

        match status {
            None => Err(ConvertError::backend(
                BACKEND_NAME,
                format!(
                    "timed out after {}s",
                    self.timeout.map(|t| t.as_secs()).unwrap_or_default()
                ),
                out_dir,
            )),
            Some(status) if !status.success() => {
                let detail = std::fs::read_to_string(&stderr_path).unwrap_or_default();
                Err(ConvertError::backend(
                    BACKEND_NAME,
                    format!("exited with {}: {}", status, tail(detail.trim(), MAX_DETAIL_CHARS)),
                    out_dir,
                ))
            }
            Some(_) => Ok(()),
        }
    }
}

/// Kill `child` and everything in its process group.
#[cfg(unix)]
fn kill_tree(child: &mut Child) -> std::io::Result<()> {
    // The child leads its own group (pgid == pid).
    let pgid = child.id() as libc::pid_t;
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        return Ok(());
    }
    warn!("killpg({}) failed: {}, killing the launcher only", pgid, err);
    child.kill()
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) -> std::io::Result<()> {
    child.kill()
}

/// Last `max` characters of `s`.
fn tail(s: &str, max: usize) -> &str {
    let count = s.chars().count();
    if count <= max {
        return s;
    }
    let skip = count - max;
    let start = s.char_indices().nth(skip).map(|(i, _)| i).unwrap_or(0);
    &s[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_layout() {
        let args = LibreOffice::args(Path::new("/w/report.docx"), "pdf", Path::new("/w"));
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args[0], "-env:UserInstallation=file:///w/.profile");
        assert_eq!(
            &args[1..],
            ["--headless", "--convert-to", "pdf", "--outdir", "/w", "/w/report.docx"]
        );
    }

    #[test]
    fn test_tail() {
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("abc", 10), "abc");
        assert_eq!(tail("ééé", 2), "éé");
    }

    #[test]
    fn test_missing_program_is_backend_error() {
        let dir = tempfile::tempdir().unwrap();
        let office = LibreOffice::new("/nonexistent/bin/libreoffice-missing");
        let err = office
            .convert(&dir.path().join("a.doc"), "pdf", dir.path())
            .unwrap_err();
        assert_eq!(err.kind(), "conversion_backend_error");
        assert!(!err.to_string().contains(&dir.path().display().to_string()));
    }

    #[cfg(unix)]
    fn script(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-office.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_reports_stderr() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let program = script(bin.path(), "echo 'source file could not be loaded' >&2\nexit 1");
        let err = LibreOffice::new(program)
            .convert(&work.path().join("a.odt"), "pdf", work.path())
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("could not be loaded"), "got: {msg}");
        assert_eq!(err.kind(), "conversion_backend_error");
    }

    #[cfg(unix)]
    #[test]
    fn test_zero_exit_is_ok() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let program = script(bin.path(), "exit 0");
        LibreOffice::new(program)
            .convert(&work.path().join("a.odt"), "pdf", work.path())
            .expect("zero exit status is success");
    }

    /// Running, i.e. present and not a zombie.
    #[cfg(target_os = "linux")]
    fn running(pid: u32) -> bool {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => stat
                .rsplit(')')
                .next()
                .is_some_and(|rest| !rest.trim_start().starts_with('Z')),
            Err(_) => false,
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_timeout_kills_grandchildren() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let pid_file = work.path().join("worker.pid");
        // Launcher that forks a long-lived worker and waits on it.
        let program = script(
            bin.path(),
            &format!("sleep 30 &\necho $! > '{}'\nwait", pid_file.display()),
        );
        let err = LibreOffice::new(program)
            .with_timeout(Some(Duration::from_secs(1)))
            .convert(&work.path().join("a.doc"), "pdf", work.path())
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));

        let pid: u32 = std::fs::read_to_string(&pid_file)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        for _ in 0..100 {
            if !running(pid) {
                return;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        panic!("worker {pid} survived the timeout");
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_process() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let program = script(bin.path(), "exec sleep 30");
        let started = Instant::now();
        let err = LibreOffice::new(program)
            .with_timeout(Some(Duration::from_secs(1)))
            .convert(&work.path().join("a.doc"), "pdf", work.path())
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
