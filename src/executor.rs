use crate::model::SymbolGroup;
use crate::traits::{PackageLoadError, PackageTypeProvider};
use crate::unexport::extract::extract;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

pub struct ExtractionExecutor {
    semaphore: Arc<Semaphore>,
}

impl ExtractionExecutor {
    pub fn new(concurrency_limit: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency_limit.max(1))),
        }
    }

    /// Loads one package and extracts its exported symbols.
    #[instrument(skip(self, provider))]
    pub async fn execute<P>(
        &self,
        provider: Arc<P>,
        package: String,
    ) -> Result<Vec<SymbolGroup>, PackageLoadError>
    where
        P: PackageTypeProvider + ?Sized + 'static,
    {
        let _permit = self.semaphore.acquire().await.map_err(|e| {
            PackageLoadError::Unresolved {
                package: package.clone(),
                reason: format!("Semaphore error: {}", e),
            }
        })?;

        info!("Loading package via {}", provider.provider_id());
        let scope = provider.load(&package).await?;
        let groups = extract(&scope);

        let symbols: usize = groups.iter().map(|g| g.iter().count()).sum();
        info!(symbols, "Finished extraction");
        Ok(groups)
    }

    /// Extracts every package, at most `concurrency_limit` at a time.
    ///
    /// Results come back in the order of `packages`. A package that fails to
    /// load is logged and yields `None`.
    pub async fn execute_all<P>(
        self: &Arc<Self>,
        provider: Arc<P>,
        packages: &[String],
    ) -> Vec<Option<Vec<SymbolGroup>>>
    where
        P: PackageTypeProvider + ?Sized + 'static,
    {
        let handles: Vec<_> = packages
            .iter()
            .map(|package| {
                let executor = Arc::clone(self);
                let provider = Arc::clone(&provider);
                let package = package.clone();
                tokio::spawn(async move { executor.execute(provider, package).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (package, handle) in packages.iter().zip(handles) {
            match handle.await {
                Ok(Ok(groups)) => results.push(Some(groups)),
                Ok(Err(e)) => {
                    warn!(package = %package, error = %e, "Skipping package");
                    results.push(None);
                }
                Err(e) => {
                    warn!(package = %package, error = %e, "Extraction task failed");
                    results.push(None);
                }
            }
        }
        results
    }
}
