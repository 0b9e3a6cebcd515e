//! Slug syntax rules and derivation helpers.

use chrono::Utc;

/// Returns true if `slug` satisfies the syntax rules: non-empty, lowercase
/// ASCII letters, digits and hyphens, with no leading or trailing hyphen.
pub fn is_valid(slug: &str) -> bool {
    if slug.is_empty() || slug.starts_with('-') || slug.ends_with('-') {
        return false;
    }
    slug.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Derives a slug from a display name: lowercase, non-alphanumeric runs
/// collapsed to single hyphens, trimmed.
pub fn slugify(name: &str) -> String {
    let mut result = String::new();
    let mut prev_dash = false;
    for c in name.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c);
            prev_dash = false;
        } else if !prev_dash && !result.is_empty() {
            result.push('-');
            prev_dash = true;
        }
    }
    result.trim_end_matches('-').to_string()
}

/// Strips any trailing digits from a requested slug so that allocation
/// counters start from a clean base. An all-numeric slug is kept as-is.
pub fn strip_numeric_suffix(slug: &str) -> &str {
    let stripped = slug.trim_end_matches(|c: char| c.is_ascii_digit());
    if stripped.is_empty() { slug } else { stripped }
}

/// Last-resort slug when the counter loop exhausts: a timestamp plus a
/// random component, treated as collision-free without further checking.
pub fn fallback_slug(base: &str) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", base, Utc::now().timestamp(), &random[..6])
}
