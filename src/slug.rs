use rand::Rng;

pub const SLUG_SUFFIX_LEN: usize = 5;
/// Base token used when a title slugifies to nothing.
pub const SLUG_FALLBACK_BASE: &str = "decision";

const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Reduce a title to its URL-safe base: lowercased letters and digits, with
/// runs of whitespace/hyphen/underscore collapsed to single hyphens and no
/// hyphens at either end.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_hyphen = false;

    for c in input.trim().to_lowercase().chars() {
        if c.is_alphanumeric() {
            out.push(c);
            last_hyphen = false;
        } else if c.is_whitespace() || c == '-' || c == '_' {
            if !last_hyphen && !out.is_empty() {
                out.push('-');
                last_hyphen = true;
            }
        }
    }

    out.trim_matches('-').to_string()
}

/// Random lowercase-alphanumeric suffix from the thread-local CSPRNG.
pub fn random_suffix(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}
