//! PDF generation through an external headless browser.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::core::DanfeError;

/// Renders bound DANFE markup into a paginated PDF file.
///
/// The trait is the seam between the pipeline and the external rendering
/// engine, so batch processing stays testable without a browser install.
pub trait PdfRenderer {
    /// Render `html` into a PDF at `output`.
    fn render(&self, html: &str, output: &Path) -> Result<(), DanfeError>;
}

/// [`PdfRenderer`] backed by a Chromium-family browser subprocess.
///
/// The markup is handed over through a temporary file which is removed
/// when rendering completes or fails. A non-zero exit status becomes a
/// document-level [`DanfeError::Render`].
pub struct ChromiumRenderer {
    browser_path: PathBuf,
    timeout: Option<Duration>,
}

impl ChromiumRenderer {
    pub fn new(browser_path: impl Into<PathBuf>) -> Self {
        Self {
            browser_path: browser_path.into(),
            timeout: None,
        }
    }

    /// Kill the browser if it has not exited within `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl PdfRenderer for ChromiumRenderer {
    fn render(&self, html: &str, output: &Path) -> Result<(), DanfeError> {
        let mut page = tempfile::Builder::new()
            .prefix("danfe-")
            .suffix(".html")
            .tempfile()?;
        page.write_all(html.as_bytes())?;
        page.flush()?;

        debug!(
            browser = %self.browser_path.display(),
            output = %output.display(),
            "rendering PDF"
        );
        let mut child = Command::new(&self.browser_path)
            .arg("--headless")
            .arg("--disable-gpu")
            .arg("--no-pdf-header-footer")
            .arg("--print-to-pdf-no-header")
            .arg("--no-margins")
            .arg("--disable-extensions")
            .arg(format!("--print-to-pdf={}", output.display()))
            .arg(page.path())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let status = match self.timeout {
            None => child.wait()?,
            Some(limit) => {
                let deadline = Instant::now() + limit;
                loop {
                    if let Some(status) = child.try_wait()? {
                        break status;
                    }
                    if Instant::now() >= deadline {
                        warn!(limit = ?limit, "PDF renderer exceeded timeout, killing");
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(DanfeError::Render("renderer timed out".into()));
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
            }
        };

        if !status.success() {
            return Err(DanfeError::Render(format!(
                "renderer exited with {status}"
            )));
        }
        Ok(())
    }
}
