//! Name normalization profiles.
//!
//! Every normalized form is used as an equality key: two raw names refer to
//! the same entity exactly when their normalized forms are equal. Both
//! profiles are idempotent.

/// Characters stripped from either end of a taxon name.
pub const TAXON_PUNCTUATION: &[char] = &[
    '!', '"', '#', '$', '%', '&', '\'', '(', ')', '*', ',', '-', '.', '/', ':', ';', '<', '=',
    '>', '?', '@', '[', '\\', ']', '^', '_', '`', '{', '|', '}', '~',
];

/// Greek letters that compound lookups spell out in Latin.
const GREEK_TRANSLITERATIONS: &[(char, &str)] = &[
    ('β', "beta"),
    ('α', "alpha"),
    ('ψ', "psi"),
    ('γ', "gamma"),
    ('δ', "delta"),
];

/// Collapse every whitespace run (spaces, tabs, newlines) into one space and
/// drop leading/trailing whitespace.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Taxon-name profile: lowercase, strip whitespace and [`TAXON_PUNCTUATION`]
/// from both ends until neither changes the string, then collapse internal
/// whitespace.
pub fn normalize_taxon_name(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let mut current = lowered.as_str();
    loop {
        let stripped = current.trim().trim_matches(TAXON_PUNCTUATION);
        if stripped == current {
            break;
        }
        current = stripped;
    }
    collapse_whitespace(current)
}

/// Compound-name profile: lowercase, strip surrounding whitespace, collapse
/// internal whitespace. Punctuation is significant in chemical names and is
/// left alone.
pub fn normalize_compound_name(raw: &str) -> String {
    collapse_whitespace(&raw.to_lowercase())
}

/// Key used for identifier lookups: the compound-name profile followed by
/// Greek-letter transliteration.
pub fn compound_lookup_key(raw: &str) -> String {
    let mut key = normalize_compound_name(raw);
    for (letter, latin) in GREEK_TRANSLITERATIONS {
        key = key.replace(*letter, latin);
    }
    key
}
