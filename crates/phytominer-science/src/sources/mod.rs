use async_trait::async_trait;

use crate::error::Result;
use crate::identifiers::{is_probably_valid_organic_smiles, is_valid_inchikey};

pub mod cactus;
pub mod pubchem;

/// What a lookup should return for a compound name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    InchiKey,
    Smiles,
}

impl LookupKind {
    pub fn label(self) -> &'static str {
        match self {
            LookupKind::InchiKey => "InChIKey",
            LookupKind::Smiles => "SMILES",
        }
    }

    /// Format check applied to every value before it is accepted or cached.
    pub fn is_valid(self, value: &str) -> bool {
        match self {
            LookupKind::InchiKey => is_valid_inchikey(value),
            LookupKind::Smiles => is_probably_valid_organic_smiles(value),
        }
    }
}

/// A name -> structure service.
///
/// `Ok(None)` means the service answered and does not know the name.
/// Errors are what the service could not answer; see
/// [`ScienceError::is_transient`](crate::error::ScienceError::is_transient).
#[async_trait]
pub trait CompoundLookup: Send + Sync {
    fn name(&self) -> &str;

    async fn lookup(&self, compound: &str, kind: LookupKind) -> Result<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_validators() {
        assert!(LookupKind::InchiKey.is_valid("QEVHRUUCFGRFIF-MDEJGZGSSA-N"));
        assert!(!LookupKind::InchiKey.is_valid("CCO"));
        assert!(LookupKind::Smiles.is_valid("CCO"));
        assert!(!LookupKind::Smiles.is_valid("QEVHRUUCFGRFIF-MDEJGZGSSA-N"));
    }
}
