//! Nested archive detection

use crate::config::FilterInfo;
use crate::utils::extract_base_name;

const DEFAULT_NESTED_EXTENSIONS: &[&str] = &["wad"];

/// Whether the entry `name` of the archive `archive_name` looks like a nested
/// archive.
///
/// An entry qualifies when it ends in a nested container extension and sits
/// either at the archive root or in a folder named after the archive itself
/// (`project.zip` containing `project/project.wad`). Names listed in
/// `filter.embeddings` always qualify.
pub fn is_embedded_name(name: &str, archive_name: &str, filter: Option<&FilterInfo>) -> bool {
    let has_nested_extension = match filter {
        Some(info) => info.nested_extensions.iter().any(|ext| has_extension(name, ext)),
        None => DEFAULT_NESTED_EXTENSIONS.iter().any(|ext| has_extension(name, ext)),
    };
    if has_nested_extension && (!name.contains('/') || is_in_archive_folder(name, archive_name)) {
        return true;
    }

    filter.is_some_and(|info| info.embeddings.iter().any(|e| e.eq_ignore_ascii_case(name)))
}

/// The first `.ext` in `name` must also be where the name ends.
fn has_extension(name: &str, ext: &str) -> bool {
    let suffix = format!(".{}", ext.to_ascii_lowercase());
    name.to_ascii_lowercase()
        .find(&suffix)
        .is_some_and(|at| at + suffix.len() == name.len())
}

/// `<archive base name>/<file name>` spelled exactly like `name`.
fn is_in_archive_folder(name: &str, archive_name: &str) -> bool {
    let folder = extract_base_name(archive_name, false);
    let file = extract_base_name(name, true);
    format!("{folder}/{file}").eq_ignore_ascii_case(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_level_wad_is_embedded() {
        assert!(is_embedded_name("other.wad", "mods/project.zip", None));
    }

    #[test]
    fn test_wad_in_archive_named_folder() {
        assert!(is_embedded_name("project/project.wad", "mods/project.zip", None));
        assert!(is_embedded_name("Project/extra.wad", "project.zip", None));
    }

    #[test]
    fn test_wad_elsewhere_is_not_embedded() {
        assert!(!is_embedded_name("maps/other.wad", "project.zip", None));
        assert!(!is_embedded_name("project/sub/deep.wad", "project.zip", None));
    }

    #[test]
    fn test_extension_must_end_name() {
        assert!(!is_embedded_name("other.wad.bak", "project.zip", None));
        assert!(!is_embedded_name("wad", "project.zip", None));
        assert!(!is_embedded_name("notes.txt", "project.zip", None));
    }

    #[test]
    fn test_first_extension_occurrence_decides() {
        assert!(is_embedded_name("a.wad", "project.zip", None));
        assert!(is_embedded_name("A.WAD", "project.zip", None));
        assert!(!is_embedded_name("a.wad.wad", "project.zip", None));
        assert!(!is_embedded_name("project/x.wad.wad", "project.zip", None));
    }

    #[test]
    fn test_explicit_embeddings() {
        let info = FilterInfo::new().with_embedding("Maps/Extra.PK3");
        assert!(is_embedded_name("maps/extra.pk3", "project.zip", Some(&info)));
        assert!(!is_embedded_name("maps/other.pk3", "project.zip", Some(&info)));
    }

    #[test]
    fn test_configured_extensions() {
        let info = FilterInfo::new().with_nested_extensions(["pk3"]);
        assert!(is_embedded_name("extra.pk3", "project.zip", Some(&info)));
        assert!(!is_embedded_name("extra.wad", "project.zip", Some(&info)));
    }
}
