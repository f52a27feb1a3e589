/// String-level path helpers shared by the normalizer, back-fill and the
/// classification tree.
///
/// Record paths are stored exactly as the source reported them (either
/// separator, any case). Comparisons go through [`path_key`], which folds
/// case and separators so `C:\Share\HR` and `c:/share/hr/` meet.

#[inline]
pub fn is_separator(c: char) -> bool {
    c == '\\' || c == '/'
}

/// Strip trailing separators, keeping a lone root separator (`/`).
pub fn trim_trailing_separators(path: &str) -> &str {
    let trimmed = path.trim_end_matches(is_separator);
    if trimmed.is_empty() && !path.is_empty() {
        &path[..1]
    } else {
        trimmed
    }
}

/// `true` if the raw path ends with a separator (extract folder marker).
#[inline]
pub fn has_trailing_separator(path: &str) -> bool {
    path.len() > 1 && path.ends_with(is_separator)
}

/// Final path segment. A drive root like `C:\` yields `C:`.
pub fn leaf_name(path: &str) -> &str {
    let trimmed = trim_trailing_separators(path);
    match trimmed.rfind(is_separator) {
        Some(idx) if idx + 1 < trimmed.len() => &trimmed[idx + 1..],
        _ => trimmed,
    }
}

/// Everything before the final segment, or `None` for a top-level path.
pub fn parent_path(path: &str) -> Option<&str> {
    let trimmed = trim_trailing_separators(path);
    let idx = trimmed.rfind(is_separator)?;
    if idx + 1 == trimmed.len() {
        // `trimmed` is the root separator itself.
        return None;
    }
    if idx == 0 {
        Some(&trimmed[..1])
    } else {
        Some(&trimmed[..idx])
    }
}

/// Case- and separator-insensitive comparison key.
pub fn path_key(path: &str) -> String {
    trim_trailing_separators(path)
        .chars()
        .map(|c| if c == '\\' { '/' } else { c })
        .flat_map(char::to_lowercase)
        .collect()
}

/// `true` if `ancestor` equals `key` or is one of its ancestors.
/// Both arguments must already be keys.
pub fn is_same_or_ancestor(ancestor: &str, key: &str) -> bool {
    if !key.starts_with(ancestor) {
        return false;
    }
    key.len() == ancestor.len()
        || ancestor.ends_with('/')
        || key.as_bytes()[ancestor.len()] == b'/'
}

/// Every strict ancestor of a key, nearest first.
pub fn ancestor_keys(key: &str) -> impl Iterator<Item = &str> {
    let mut current = Some(key);
    std::iter::from_fn(move || {
        let next = parent_path(current?);
        current = next;
        next
    })
}

/// Extension with its leading dot, lowercase-preserving. Empty when the name
/// has no dot or ends with one.
pub fn extension_of(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() => &name[idx..],
        _ => "",
    }
}
