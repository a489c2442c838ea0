use crate::unexport::PackageScope;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// A package's type information could not be obtained.
///
/// Recovered per package: the failure is logged and the package contributes
/// no symbols.
#[derive(Error, Debug)]
pub enum PackageLoadError {
    #[error("Failed to resolve package {package}: {reason}")]
    Unresolved { package: String, reason: String },
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Syntax error in {path} at line {line}")]
    Syntax { path: PathBuf, line: usize },
    #[error("Parser setup failed: {0}")]
    Parser(String),
}

#[async_trait]
pub trait PackageTypeProvider: Send + Sync {
    /// Short identifier for logging (e.g., "go-source").
    fn provider_id(&self) -> &str;

    /// Resolves `package` to its declaration scope.
    async fn load(&self, package: &str) -> Result<PackageScope, PackageLoadError>;
}
