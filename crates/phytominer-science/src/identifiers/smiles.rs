/// Cheap plausibility check for an organic SMILES string: it must mention
/// aliphatic carbon and must not contain a hyphen (which would suggest an
/// InChIKey or a name slipped through instead).
pub fn is_probably_valid_organic_smiles(smiles: &str) -> bool {
    smiles.contains('C') && !smiles.contains('-')
}
