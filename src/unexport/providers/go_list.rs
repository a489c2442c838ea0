//! Thin wrappers around the `go list` tool.

use crate::traits::PackageLoadError;
use crate::unexport::traits::{ConfigurationError, PackageEnumerator};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

/// Subset of `go list -json` output needed to find a package's sources.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GoListPackage {
    pub import_path: String,

    #[serde(default)]
    pub dir: PathBuf,

    #[serde(default)]
    pub go_files: Vec<String>,

    #[serde(default)]
    pub cgo_files: Vec<String>,

    #[serde(default)]
    pub error: Option<GoListError>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GoListError {
    pub err: String,
}

impl GoListPackage {
    /// Build-selected, non-test source files.
    pub fn source_files(&self) -> Vec<PathBuf> {
        self.go_files
            .iter()
            .chain(self.cgo_files.iter())
            .map(|f| self.dir.join(f))
            .collect()
    }
}

/// Splits `go list` output into package paths, dropping blank lines.
pub fn parse_package_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Runs the `go` tool found at `go_binary`.
#[derive(Debug, Clone)]
pub struct GoTool {
    go_binary: PathBuf,
}

impl Default for GoTool {
    fn default() -> Self {
        Self::new("go")
    }
}

impl GoTool {
    pub fn new(go_binary: impl Into<PathBuf>) -> Self {
        Self {
            go_binary: go_binary.into(),
        }
    }

    async fn list(&self, args: &[&str]) -> std::io::Result<std::process::Output> {
        debug!(go = %self.go_binary.display(), ?args, "Running go list");
        Command::new(&self.go_binary)
            .arg("list")
            .args(args)
            .output()
            .await
    }

    /// Looks up the directory and source files of one package.
    pub async fn locate(&self, package: &str) -> Result<GoListPackage, PackageLoadError> {
        let unresolved = |reason: String| PackageLoadError::Unresolved {
            package: package.to_string(),
            reason,
        };

        let output = self
            .list(&["-json", package])
            .await
            .map_err(|e| unresolved(e.to_string()))?;
        if !output.status.success() {
            return Err(unresolved(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let listed: GoListPackage =
            serde_json::from_slice(&output.stdout).map_err(|e| unresolved(e.to_string()))?;
        if let Some(error) = listed.error {
            return Err(unresolved(error.err));
        }
        if listed.go_files.is_empty() && listed.cgo_files.is_empty() {
            return Err(unresolved("no Go source files".to_string()));
        }
        Ok(listed)
    }
}

#[async_trait]
impl PackageEnumerator for GoTool {
    async fn enumerate(&self, pattern: &str) -> Result<Vec<String>, ConfigurationError> {
        let failed = |reason: String| ConfigurationError::Enumeration {
            pattern: pattern.to_string(),
            reason,
        };

        let output = self
            .list(&[pattern])
            .await
            .map_err(|e| failed(e.to_string()))?;
        if !output.status.success() {
            return Err(failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let packages = parse_package_lines(&String::from_utf8_lossy(&output.stdout));
        if packages.is_empty() {
            return Err(ConfigurationError::NoPackages(pattern.to_string()));
        }
        Ok(packages)
    }
}
