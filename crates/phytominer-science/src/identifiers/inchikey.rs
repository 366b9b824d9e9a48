use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScienceError};

/// Length of a standard InChIKey, e.g. `QEVHRUUCFGRFIF-MDEJGZGSSA-N`.
pub const INCHIKEY_LEN: usize = 27;

/// Length of the connectivity block (first hash) of an InChIKey.
pub const CONNECTIVITY_BLOCK_LEN: usize = 14;

/// Format check only: 27 characters with at least one hyphen.
pub fn is_valid_inchikey(candidate: &str) -> bool {
    candidate.chars().count() == INCHIKEY_LEN && candidate.contains('-')
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InchiKey(String);

impl InchiKey {
    pub fn parse(input: &str) -> Result<Self> {
        if !is_valid_inchikey(input) {
            return Err(ScienceError::InvalidInchiKey(input.to_string()));
        }
        Ok(Self(input.to_string()))
    }

    /// Simplified key: the connectivity block, which ignores stereochemistry,
    /// protonation and isotopes.
    pub fn simplified(&self) -> &str {
        self.0.get(..CONNECTIVITY_BLOCK_LEN).unwrap_or(&self.0)
    }
}

impl fmt::Display for InchiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glucose_key_is_valid() {
        assert!(is_valid_inchikey("WQZGKKKJIJFFOK-GASJEMHNSA-N"));
    }

    #[test]
    fn wrong_length_is_invalid() {
        assert!(!is_valid_inchikey("WQZGKKKJIJFFOK-GASJEMHNSA"));
        assert!(!is_valid_inchikey("WQZGKKKJIJFFOK-GASJEMHNSA-NN"));
        assert!(!is_valid_inchikey(""));
    }

    #[test]
    fn missing_hyphen_is_invalid() {
        assert!(!is_valid_inchikey("WQZGKKKJIJFFOKXGASJEMHNSAXN"));
    }

    #[test]
    fn parse_rejects_prefixed_key() {
        let err = InchiKey::parse("InChIKey=WQZGKKKJIJFFOK-GASJEMHNSA-N").unwrap_err();
        assert!(matches!(err, ScienceError::InvalidInchiKey(_)));
    }

    #[test]
    fn simplified_is_connectivity_block() {
        let key = InchiKey::parse("QEVHRUUCFGRFIF-MDEJGZGSSA-N").unwrap();
        assert_eq!(key.simplified(), "QEVHRUUCFGRFIF");
        assert_eq!(key.to_string(), "QEVHRUUCFGRFIF-MDEJGZGSSA-N");
    }
}
