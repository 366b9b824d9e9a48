pub mod inchikey;
pub mod smiles;

pub use inchikey::{InchiKey, is_valid_inchikey};
pub use smiles::is_probably_valid_organic_smiles;
