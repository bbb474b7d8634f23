//! Desktop-automation bridge: headless LibreOffice invoked as a subprocess.
//!
//! A small set of operations (PDF export) cannot be expressed through the
//! spreadsheet library and go through this bridge instead. Calls are
//! synchronous subprocess runs with a timeout; there is no pooling and no
//! retry beyond the ordered attempt list.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time;
use tracing::{debug, warn};

const CANDIDATE_BINARIES: &[&str] = &[
    "/usr/bin/soffice",
    "/usr/local/bin/soffice",
    "/usr/bin/libreoffice",
    "/usr/local/bin/libreoffice",
];

#[async_trait]
pub trait AutomationBridge: Send + Sync {
    fn is_available(&self) -> bool;

    /// Convert a workbook to PDF, writing into `out_dir`; returns the
    /// generated file path.
    async fn convert_to_pdf(&self, workbook: &Path, out_dir: &Path) -> Result<PathBuf>;
}

pub struct LibreOfficeBridge {
    soffice_path: PathBuf,
    timeout: Duration,
}

impl LibreOfficeBridge {
    pub fn new(soffice_path: PathBuf, timeout: Duration) -> Self {
        Self {
            soffice_path,
            timeout,
        }
    }

    /// Probe the configured binary, then the usual install locations.
    pub fn discover(configured: Option<&Path>, timeout: Duration) -> Option<Self> {
        if let Some(path) = configured {
            if path.exists() {
                return Some(Self::new(path.to_path_buf(), timeout));
            }
            warn!(path = %path.display(), "configured soffice binary not found");
        }
        CANDIDATE_BINARIES
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
            .map(|p| Self::new(p, timeout))
    }

    /// A second bridge over a different installed binary, for the ordered
    /// fallback attempt.
    pub fn discover_alternate(exclude: &Path, timeout: Duration) -> Option<Self> {
        CANDIDATE_BINARIES
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists() && p != exclude)
            .map(|p| Self::new(p, timeout))
    }

    pub fn binary_path(&self) -> &Path {
        &self.soffice_path
    }
}

#[async_trait]
impl AutomationBridge for LibreOfficeBridge {
    fn is_available(&self) -> bool {
        self.soffice_path.exists()
    }

    async fn convert_to_pdf(&self, workbook: &Path, out_dir: &Path) -> Result<PathBuf> {
        crate::metrics::METRICS.record_bridge_invocation();

        let abs_path = workbook
            .canonicalize()
            .map_err(|e| anyhow!("failed to canonicalize path: {}", e))?;

        let output = time::timeout(
            self.timeout,
            Command::new(&self.soffice_path)
                .args(["--headless", "--norestore", "--convert-to", "pdf", "--outdir"])
                .arg(out_dir)
                .arg(&abs_path)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output(),
        )
        .await
        .map_err(|_| anyhow!("soffice timed out after {:?}", self.timeout))?
        .map_err(|e| anyhow!("failed to spawn soffice: {}", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "soffice failed (exit {}): {}",
                output.status.code().unwrap_or(-1),
                stderr
            ));
        }

        let stem = abs_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "workbook".to_string());
        let generated = out_dir.join(format!("{stem}.pdf"));
        if !generated.exists() {
            return Err(anyhow!(
                "soffice reported success but {:?} was not produced",
                generated
            ));
        }

        debug!(output = %generated.display(), "bridge produced pdf");
        Ok(generated)
    }
}

/// Ordered-attempt executor: run the primary; on failure run the fallback
/// when one is available; when every attempt fails the PRIMARY error is the
/// one surfaced, with later errors only logged.
pub async fn attempt_with_fallback<T, PFut, FFut>(
    operation_name: &str,
    primary: PFut,
    fallback: Option<FFut>,
) -> Result<T>
where
    PFut: std::future::Future<Output = Result<T>>,
    FFut: std::future::Future<Output = Result<T>>,
{
    match primary.await {
        Ok(result) => Ok(result),
        Err(primary_err) => {
            let Some(fallback) = fallback else {
                return Err(primary_err);
            };
            warn!(
                operation = %operation_name,
                error = %primary_err,
                "primary operation failed, attempting fallback"
            );
            match fallback.await {
                Ok(result) => {
                    debug!(operation = %operation_name, "fallback succeeded");
                    Ok(result)
                }
                Err(fallback_err) => {
                    warn!(
                        operation = %operation_name,
                        error = %fallback_err,
                        "fallback also failed, surfacing primary error"
                    );
                    Err(primary_err)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ok(value: i32) -> Result<i32> {
        Ok(value)
    }

    async fn fail(message: &'static str) -> Result<i32> {
        Err(anyhow!(message))
    }

    #[tokio::test]
    async fn fallback_runs_when_primary_fails() {
        let result = attempt_with_fallback("test", fail("primary failed"), Some(ok(42))).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn primary_error_surfaces_when_both_fail() {
        let result =
            attempt_with_fallback("test", fail("primary failed"), Some(fail("fallback failed")))
                .await;
        assert_eq!(result.unwrap_err().to_string(), "primary failed");
    }

    #[tokio::test]
    async fn primary_error_surfaces_without_fallback() {
        let result =
            attempt_with_fallback(
                "test",
                fail("primary failed"),
                None::<std::future::Ready<Result<i32>>>,
            )
            .await;
        assert_eq!(result.unwrap_err().to_string(), "primary failed");
    }

    #[tokio::test]
    async fn primary_success_skips_fallback() {
        let result = attempt_with_fallback("test", ok(7), Some(fail("unused"))).await;
        assert_eq!(result.unwrap(), 7);
    }
}
