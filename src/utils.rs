//! Utility functions for file naming and path manipulation

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Characters that are illegal in file or folder names on at least one common platform
///
/// The same denylist is applied to album folders and track files so that two names
/// collide on disk exactly when their sanitized forms are equal.
pub const ILLEGAL_NAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Name used when sanitizing leaves nothing usable
const FALLBACK_NAME: &str = "Untitled";

/// Maximum number of suffix attempts when resolving track filename collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Strip filesystem-illegal characters from a single path component
///
/// Removes every character in [`ILLEGAL_NAME_CHARS`] plus control characters, then
/// trims surrounding whitespace. Names that end up empty, or that consist only of
/// dots (`.` and `..` would escape the album folder), become `"Untitled"`.
///
/// # Examples
///
/// ```
/// use wishlist_dl::utils::sanitize_name;
///
/// assert_eq!(sanitize_name("AC/DC - Back in Black"), "ACDC - Back in Black");
/// assert_eq!(sanitize_name("What? <Live>"), "What Live");
/// assert_eq!(sanitize_name("///"), "Untitled");
/// ```
#[must_use]
pub fn sanitize_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !ILLEGAL_NAME_CHARS.contains(c) && !c.is_control())
        .collect();
    let trimmed = cleaned.trim();

    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        return FALLBACK_NAME.to_string();
    }
    trimmed.to_string()
}

/// Build a unique `<stem>.<extension>` filename among those already `taken`
///
/// The first claimant keeps the plain name; later ones get ` (1)`, ` (2)`, ...
/// The returned name is inserted into `taken`.
///
/// # Examples
///
/// ```
/// use std::collections::HashSet;
/// use wishlist_dl::utils::claim_unique_filename;
///
/// let mut taken = HashSet::new();
/// assert_eq!(claim_unique_filename("Intro", "mp3", &mut taken), "Intro.mp3");
/// assert_eq!(claim_unique_filename("Intro", "mp3", &mut taken), "Intro (1).mp3");
/// ```
pub fn claim_unique_filename(stem: &str, extension: &str, taken: &mut HashSet<String>) -> String {
    let plain = format!("{stem}.{extension}");
    if taken.insert(plain.to_lowercase()) {
        return plain;
    }

    for i in 1..=MAX_RENAME_ATTEMPTS {
        let candidate = format!("{stem} ({i}).{extension}");
        if taken.insert(candidate.to_lowercase()) {
            return candidate;
        }
    }

    // Albums never come close to this many identical titles; fall back to the plain
    // name rather than failing the whole plan.
    plain
}

/// Temporary path a track streams into before being renamed into place
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use wishlist_dl::utils::partial_path;
///
/// assert_eq!(
///     partial_path(Path::new("/w/Album/Song.mp3")),
///     Path::new("/w/Album/Song.mp3.part")
/// );
/// ```
#[must_use]
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
