//! Path utilities

/// Normalize path separators to forward slashes (archive convention)
pub fn fix_path_separators(path: impl Into<String>) -> String {
    let path = path.into();
    if path.contains('\\') {
        path.replace('\\', "/")
    } else {
        path
    }
}

/// Final path component of `path`, optionally without its extension.
///
/// Both `/` and `\` count as separators on every platform so archives behave
/// the same everywhere.
pub fn extract_base_name(path: &str, include_extension: bool) -> &str {
    let base = path
        .rfind(['/', '\\'])
        .map_or(path, |sep| &path[sep + 1..]);

    if include_extension {
        return base;
    }
    base.rfind('.').map_or(base, |dot| &base[..dot])
}
