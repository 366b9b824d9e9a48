//! Loose equality for organism and compound names.

use crate::normalize::{normalize_compound_name, normalize_taxon_name};

/// Leading tokens that mark a hybrid genus, e.g. `× Crataegomespilus`.
pub const HYBRID_MARKERS: &[&str] = &["×", "+"];

fn is_hybrid_marker(word: &str) -> bool {
    HYBRID_MARKERS.contains(&word)
}

/// Abbreviate the genus of a scientific name: `Ficus elastica` becomes
/// `F. elastica`. Single words are returned unchanged; a leading hybrid marker
/// shifts the abbreviation to the following word.
pub fn abbreviate_scientific_name(name: &str) -> String {
    let mut words: Vec<String> = name.split_whitespace().map(ToOwned::to_owned).collect();
    if words.len() < 2 {
        return name.to_string();
    }

    let genus_idx = if is_hybrid_marker(&words[0]) {
        if words.len() < 3 {
            return name.to_string();
        }
        1
    } else {
        0
    };

    let initial = words[genus_idx].chars().next().map(String::from).unwrap_or_default();
    words[genus_idx] = format!("{initial}.");
    words.join(" ")
}

/// Genus and specific epithet of a full name, dropping authority and
/// infraspecific parts. Keeps the hybrid marker when present.
pub fn species_binomial(full_name: &str) -> String {
    let words: Vec<&str> = full_name.split_whitespace().collect();
    let take = match words.first() {
        Some(first) if is_hybrid_marker(first) => 3,
        _ => 2,
    };
    words.into_iter().take(take).collect::<Vec<_>>().join(" ")
}

/// Genus of a full name (or species string). `None` for blank input.
pub fn genus_from_full_name(full_name: &str) -> Option<String> {
    let mut words = full_name.split_whitespace();
    let first = words.next()?;
    if is_hybrid_marker(first) {
        return Some(match words.next() {
            Some(genus) => format!("{first} {genus}"),
            None => first.to_string(),
        });
    }
    Some(first.to_string())
}

fn binomials_match(name1: &str, name2: &str) -> bool {
    let a = species_binomial(&normalize_taxon_name(name1));
    let b = species_binomial(&normalize_taxon_name(name2));
    a == b || strip_whitespace(&a) == strip_whitespace(&b)
}

/// True if both names refer to the same species, allowing either side to use
/// an abbreviated genus (`F. elastica` vs `Ficus elastica`).
pub fn organism_names_match(name1: &str, name2: &str) -> bool {
    binomials_match(name1, name2)
        || binomials_match(&abbreviate_scientific_name(name1), name2)
        || binomials_match(&abbreviate_scientific_name(name2), name1)
}

/// True if two compound mentions are equal after compound normalization,
/// ignoring whitespace differences entirely.
pub fn compound_names_match(name1: &str, name2: &str) -> bool {
    let a = normalize_compound_name(name1);
    let b = normalize_compound_name(name2);
    a == b || strip_whitespace(&a) == strip_whitespace(&b)
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}
