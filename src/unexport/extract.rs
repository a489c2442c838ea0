//! Symbol extraction: turns a package scope into exported-symbol identities.

use crate::model::{SymbolGroup, SymbolIdentity};
use crate::unexport::traits::{is_exported, PackageScope, TypeShape};
use tracing::debug;

/// Extracts the exported symbols of one package, in scope order.
///
/// - Struct types yield a group owning their exported pointer-method-set
///   methods followed by their exported fields.
/// - Interface types yield nothing; their method names belong to a
///   contract other packages may implement.
/// - Every other exported declaration yields a single identity.
pub fn extract(scope: &PackageScope) -> Vec<SymbolGroup> {
    let mut groups = Vec::new();

    for name in scope.names().filter(|n| is_exported(n)) {
        let symbol = SymbolIdentity::package_level(&scope.path, name);
        match scope.shape(name) {
            TypeShape::Struct => {
                let methods = scope
                    .pointer_method_set(name)
                    .into_iter()
                    .filter(|m| is_exported(m));
                let fields = scope
                    .struct_fields(name)
                    .iter()
                    .map(|f| f.name.clone())
                    .filter(|f| is_exported(f));

                let members = methods
                    .chain(fields)
                    .map(|member| SymbolIdentity::member(&scope.path, name, member))
                    .collect();
                groups.push(SymbolGroup { symbol, members });
            }
            TypeShape::Interface => {
                debug!(package = %scope.path, name, "Skipping interface");
            }
            TypeShape::Other => groups.push(SymbolGroup::single(symbol)),
        }
    }

    groups
}
