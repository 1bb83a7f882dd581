//! Profile filtering: skip patterns first, then optional git-diff scoping.
//! Both operate on normalized (prefix-stripped) file names.

use regex::Regex;

use crate::paths;
use crate::profile::Profile;

/// Drop profiles whose file name matches any skip pattern. Patterns are
/// unanchored; an empty list passes everything through.
pub fn apply_skip(profiles: Vec<Profile>, patterns: &[Regex]) -> Vec<Profile> {
    if patterns.is_empty() {
        return profiles;
    }
    profiles
        .into_iter()
        .filter(|profile| {
            !patterns
                .iter()
                .any(|pattern| pattern.is_match(&profile.file_name))
        })
        .collect()
}

/// Keep only profiles whose file refers to a path in the changed set.
pub fn apply_diff_scope(
    profiles: Vec<Profile>,
    changed: &[String],
    module_prefix: &str,
) -> Vec<Profile> {
    profiles
        .into_iter()
        .filter(|profile| {
            changed
                .iter()
                .any(|path| paths::matches(&profile.file_name, path, module_prefix))
        })
        .collect()
}
