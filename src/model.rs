use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one exported symbol: `(package, receiver, name)`.
///
/// `receiver` is empty for package-level declarations and holds the
/// enclosing struct type's name for fields and methods. Equality covers all
/// three fields and is what blacklist membership is checked against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolIdentity {
    pub package: String,
    pub receiver: String,
    pub name: String,
}

impl SymbolIdentity {
    /// Identity of a package-level declaration.
    pub fn package_level(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            receiver: String::new(),
            name: name.into(),
        }
    }

    /// Identity of a field or method scoped to `receiver`.
    pub fn member(
        package: impl Into<String>,
        receiver: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            package: package.into(),
            receiver: receiver.into(),
            name: name.into(),
        }
    }

    pub fn is_package_level(&self) -> bool {
        self.receiver.is_empty()
    }
}

/// Short dotted form used in log lines, e.g. `c.Widget.Label` for a symbol
/// in `github.com/a/b/c`.
impl fmt::Display for SymbolIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<&str> = Vec::with_capacity(3);
        let segments: Vec<&str> = self.package.split('/').collect();
        if segments.len() > 3 {
            if let Some(last) = segments.last() {
                parts.push(*last);
            }
        }
        if !self.receiver.is_empty() {
            parts.push(&self.receiver);
        }
        parts.push(&self.name);
        write!(f, "{}", parts.join("."))
    }
}

/// A package-level symbol together with the members scoped to it.
///
/// Only struct types carry members: the exported methods of the pointer
/// method set first, then the exported fields in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolGroup {
    pub symbol: SymbolIdentity,
    pub members: Vec<SymbolIdentity>,
}

impl SymbolGroup {
    pub fn single(symbol: SymbolIdentity) -> Self {
        Self {
            symbol,
            members: Vec::new(),
        }
    }

    /// Iterates the group owner followed by its members.
    pub fn iter(&self) -> impl Iterator<Item = &SymbolIdentity> {
        std::iter::once(&self.symbol).chain(self.members.iter())
    }
}

/// Flattens groups into the listing order: each owner, then its members.
pub fn flatten(groups: Vec<SymbolGroup>) -> Vec<SymbolIdentity> {
    let mut out = Vec::new();
    for group in groups {
        out.push(group.symbol);
        out.extend(group.members);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_equality_covers_all_fields() {
        let a = SymbolIdentity::member("example.org/m", "Widget", "Show");
        let b = SymbolIdentity::member("example.org/m", "Widget", "Show");
        let c = SymbolIdentity::member("example.org/m", "", "Show");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(c.is_package_level());
    }

    #[test]
    fn test_display_short_form() {
        let deep = SymbolIdentity::member("github.com/a/b/c", "T", "F");
        assert_eq!(deep.to_string(), "c.T.F");

        let shallow = SymbolIdentity::package_level("example.org/m", "F");
        assert_eq!(shallow.to_string(), "F");
    }

    #[test]
    fn test_flatten_keeps_owner_before_members() {
        let groups = vec![
            SymbolGroup {
                symbol: SymbolIdentity::package_level("p", "Widget"),
                members: vec![
                    SymbolIdentity::member("p", "Widget", "Show"),
                    SymbolIdentity::member("p", "Widget", "Label"),
                ],
            },
            SymbolGroup::single(SymbolIdentity::package_level("p", "New")),
        ];

        let names: Vec<String> = flatten(groups).into_iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["Widget", "Widget.Show", "Widget.Label", "New"]);
    }
}
