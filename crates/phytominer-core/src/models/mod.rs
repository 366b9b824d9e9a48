pub mod taxon;

pub use taxon::*;
