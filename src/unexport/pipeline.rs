//! Unexport pipeline coordinator.
//!
//! [`UnexportPipeline`] runs the stages of one invocation in order:
//! 1. **Enumeration**: expand a package pattern into package paths
//! 2. **Extraction**: load each package and collect its exported symbols
//! 3. **Filtering**: drop blacklisted identities (run mode only)
//!
//! Packages that fail to load are logged and skipped. A bad blacklist
//! aborts the run before any package is touched.

use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::executor::ExtractionExecutor;
use crate::model::{flatten, SymbolIdentity};
use crate::traits::PackageTypeProvider;
use crate::unexport::blacklist::{filter, Blacklist};
use crate::unexport::traits::{BlacklistFormatError, ConfigurationError, PackageEnumerator};

// ============================================================================
// Pipeline Types
// ============================================================================

/// Output of one pipeline run.
#[derive(Debug)]
pub struct ScanResult {
    /// Surviving identities in package order, then scope order
    pub symbols: Vec<SymbolIdentity>,

    pub stats: ScanStats,
}

/// Statistics about a pipeline run.
#[derive(Debug, Default, Clone)]
pub struct ScanStats {
    /// Packages whose symbols were extracted
    pub packages_scanned: usize,

    /// Packages skipped because they failed to load
    pub packages_failed: usize,

    /// Exported symbols found before filtering
    pub symbols_found: usize,

    /// Symbols removed by the blacklist
    pub symbols_excluded: usize,

    /// Wall time of the whole run (milliseconds)
    pub total_duration_ms: u64,
}

// ============================================================================
// Pipeline Executor
// ============================================================================

/// Default number of packages extracted at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

pub struct UnexportPipeline<P>
where
    P: PackageTypeProvider + ?Sized + 'static,
{
    provider: Arc<P>,
    concurrency: usize,
}

impl<P> UnexportPipeline<P>
where
    P: PackageTypeProvider + ?Sized + 'static,
{
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Sets how many packages are extracted concurrently. Output order does
    /// not depend on it.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Expands `pattern` with `enumerator`.
    pub async fn enumerate<E>(
        &self,
        enumerator: &E,
        pattern: &str,
    ) -> Result<Vec<String>, ConfigurationError>
    where
        E: PackageEnumerator + ?Sized,
    {
        let packages = enumerator.enumerate(pattern).await?;
        info!(pattern, packages = packages.len(), "Enumerated packages");
        Ok(packages)
    }

    /// Lists every exported symbol of `packages`.
    pub async fn list(&self, packages: &[String]) -> ScanResult {
        let start = std::time::Instant::now();
        let mut stats = ScanStats::default();

        let symbols = self.extract_all(packages, &mut stats).await;
        stats.total_duration_ms = start.elapsed().as_millis() as u64;

        info!(
            packages = stats.packages_scanned,
            failed = stats.packages_failed,
            symbols = stats.symbols_found,
            duration_ms = stats.total_duration_ms,
            "Listing completed"
        );
        ScanResult { symbols, stats }
    }

    /// Collects the symbols of `packages` that should be unexported.
    ///
    /// The blacklist, when given, is loaded first; any error there is fatal.
    pub async fn run(
        &self,
        packages: &[String],
        blacklist: Option<&Path>,
    ) -> Result<ScanResult, BlacklistFormatError> {
        let blacklist = match blacklist {
            Some(path) => Blacklist::from_path(path)?,
            None => Blacklist::new(),
        };
        Ok(self.run_with(packages, &blacklist).await)
    }

    /// Like [`run`](Self::run) with an already-loaded blacklist.
    pub async fn run_with(&self, packages: &[String], blacklist: &Blacklist) -> ScanResult {
        let start = std::time::Instant::now();
        let mut stats = ScanStats::default();

        let candidates = self.extract_all(packages, &mut stats).await;
        let symbols = filter(candidates, blacklist);
        stats.symbols_excluded = stats.symbols_found - symbols.len();
        stats.total_duration_ms = start.elapsed().as_millis() as u64;

        info!(
            packages = stats.packages_scanned,
            failed = stats.packages_failed,
            symbols = stats.symbols_found,
            excluded = stats.symbols_excluded,
            duration_ms = stats.total_duration_ms,
            "Run completed"
        );
        ScanResult { symbols, stats }
    }

    async fn extract_all(&self, packages: &[String], stats: &mut ScanStats) -> Vec<SymbolIdentity> {
        let executor = Arc::new(ExtractionExecutor::new(self.concurrency));
        let results = executor
            .execute_all(Arc::clone(&self.provider), packages)
            .await;

        let mut symbols = Vec::new();
        for groups in results {
            match groups {
                Some(groups) => {
                    stats.packages_scanned += 1;
                    symbols.extend(flatten(groups));
                }
                None => stats.packages_failed += 1,
            }
        }
        stats.symbols_found = symbols.len();
        symbols
    }
}

// ============================================================================
// Tests
// ============================================================================
