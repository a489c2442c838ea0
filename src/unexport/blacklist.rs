//! Blacklist loading and filtering.

use crate::model::SymbolIdentity;
use crate::unexport::render::from_record;
use crate::unexport::traits::BlacklistFormatError;
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Identities exempted from rename directives.
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    entries: HashSet<SymbolIdentity>,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `package,receiver,name` rows. Any row with a different field
    /// count rejects the whole blacklist.
    pub fn from_reader<R: Read>(input: R) -> Result<Self, BlacklistFormatError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(input);

        let mut entries = HashSet::new();
        for record in reader.records() {
            let record = record?;
            let symbol = from_record(&record).ok_or_else(|| BlacklistFormatError::FieldCount {
                line: record.position().map(|p| p.line()).unwrap_or_default(),
                found: record.len(),
            })?;
            entries.insert(symbol);
        }
        Ok(Self { entries })
    }

    pub fn from_path(path: &Path) -> Result<Self, BlacklistFormatError> {
        let file = std::fs::File::open(path).map_err(|source| BlacklistFormatError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let blacklist = Self::from_reader(file)?;
        debug!(path = %path.display(), entries = blacklist.len(), "Loaded blacklist");
        Ok(blacklist)
    }

    pub fn insert(&mut self, symbol: SymbolIdentity) {
        self.entries.insert(symbol);
    }

    pub fn contains(&self, symbol: &SymbolIdentity) -> bool {
        self.entries.contains(symbol)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<SymbolIdentity> for Blacklist {
    fn from_iter<I: IntoIterator<Item = SymbolIdentity>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Keeps the candidates not present in `exclusions`, in their original order.
pub fn filter(candidates: Vec<SymbolIdentity>, exclusions: &Blacklist) -> Vec<SymbolIdentity> {
    candidates
        .into_iter()
        .filter(|c| !exclusions.contains(c))
        .collect()
}
