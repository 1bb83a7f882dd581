//! Path handling shared by the normalizer, the diff scoper and the
//! aggregator: module-prefix resolution, lexical cleaning, and the predicate
//! that matches profile paths against git-changed paths.

/// Resolve the module prefix to strip from profile file names.
///
/// An explicit module name wins; a trailing separator is appended when
/// missing. Otherwise the prefix is the byte-level longest common prefix of
/// all file names. With fewer than two names there is nothing to infer.
pub fn resolve_module_prefix(module_name: &str, file_names: &[&str]) -> String {
    if !module_name.is_empty() {
        if module_name.ends_with('/') {
            return module_name.to_string();
        }
        return format!("{module_name}/");
    }
    longest_common_prefix(file_names)
}

/// Longest common prefix of all names, found by sorting and comparing the
/// first and last entries.
fn longest_common_prefix(names: &[&str]) -> String {
    if names.len() < 2 {
        return String::new();
    }
    let mut sorted: Vec<&str> = names.to_vec();
    sorted.sort_unstable();

    let first = sorted[0];
    let last = sorted[sorted.len() - 1];
    let mut len = first
        .as_bytes()
        .iter()
        .zip(last.as_bytes())
        .take_while(|(a, b)| a == b)
        .count();
    while !first.is_char_boundary(len) {
        len -= 1;
    }
    first[..len].to_string()
}

/// Remove the first occurrence of `prefix` from `name`.
pub fn strip_prefix_once(name: &str, prefix: &str) -> String {
    if prefix.is_empty() {
        return name.to_string();
    }
    name.replacen(prefix, "", 1)
}

/// Lexically clean a slash-separated path: collapse repeated separators,
/// drop `.` elements, resolve `..` against preceding elements, keep a
/// leading `/`. An empty result cleans to `.`.
pub fn clean(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(&prev) if prev != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            _ => parts.push(part),
        }
    }

    let joined = parts.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Directory of a normalized file path. Top-level files map to `"."`,
/// root-level files to `"/"`.
pub fn package_of(file: &str) -> String {
    match file.rsplit_once('/') {
        Some(("", _)) => "/".to_string(),
        Some((dir, _)) => dir.to_string(),
        None => ".".to_string(),
    }
}

/// Final path segment.
pub fn base_name(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, base)| base)
}

/// Everything before the final segment; empty when there is none.
pub fn dir_name(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Decide whether a profile path and a git-changed path refer to the same
/// file. Profiles speak module-qualified paths while git speaks
/// repo-relative ones, so equality is tried under a sequence of widening
/// rules:
///
/// 1. exact equality
/// 2. equality after stripping the module prefix from the profile path
/// 3. equality after lexically cleaning both sides
/// 4. either path is a suffix of the other
/// 5. base names are equal and either directory is a suffix of the other
pub fn matches(profile_path: &str, changed_path: &str, module_prefix: &str) -> bool {
    if profile_path == changed_path {
        return true;
    }
    if !module_prefix.is_empty()
        && strip_prefix_once(profile_path, module_prefix) == changed_path
    {
        return true;
    }
    if clean(profile_path) == clean(changed_path) {
        return true;
    }
    if profile_path.ends_with(changed_path) || changed_path.ends_with(profile_path) {
        return true;
    }
    if base_name(profile_path) == base_name(changed_path) {
        let profile_dir = dir_name(profile_path);
        let changed_dir = dir_name(changed_path);
        return profile_dir.ends_with(changed_dir) || changed_dir.ends_with(profile_dir);
    }
    false
}
