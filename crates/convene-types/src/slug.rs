use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Slug used when a title contains no letters or digits at all.
pub const FALLBACK_SLUG: &str = "event";

/// Derive a URL-safe slug from an event title.
///
/// Accents are folded away ("Café" becomes "cafe"), letters and digits of any
/// script are kept and lowercased, and every run of whitespace or punctuation
/// becomes a single hyphen with none at either end. Apostrophes are dropped
/// so "Don't" becomes "dont" rather than "don-t".
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.nfd() {
        if is_combining_mark(c) || c == '\'' || c == '\u{2019}' {
            continue;
        }
        if c.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.nfc().collect()
    }
}

/// Candidate slug for the `attempt`-th collision: `base`, `base-2`, `base-3`, ...
pub fn with_suffix(base: &str, attempt: u32) -> String {
    if attempt <= 1 {
        base.to_string()
    } else {
        format!("{}-{}", base, attempt)
    }
}
