//! Lexical path normalization.
//!
//! Entity IDs are derived from paths, so two spellings of the same location
//! (`/lib//Manga/./Ch1/` and `/lib/Manga/Ch1`) must normalize to the same
//! value. Normalization is purely lexical: nothing touches the filesystem and
//! symlinks are not resolved.

use std::path::{Component, Path, PathBuf};

/// Normalizes a path without touching the filesystem.
///
/// - repeated separators and trailing separators are collapsed,
/// - `.` components are dropped,
/// - `..` removes the previous normal component; at the root of an absolute
///   path it is dropped, at the start of a relative path it is kept.
///
/// An empty result becomes `.`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use shelf_storage::normalize_path;
///
/// assert_eq!(normalize_path("/library//Berserk/./Vol 1/"), Path::new("/library/Berserk/Vol 1"));
/// assert_eq!(normalize_path("/library/Berserk/../Monster"), Path::new("/library/Monster"));
/// assert_eq!(normalize_path("/../library"), Path::new("/library"));
/// assert_eq!(normalize_path("../library/./a/.."), Path::new("../library"));
/// assert_eq!(normalize_path(""), Path::new("."));
/// ```
pub fn normalize(path: impl AsRef<Path>) -> PathBuf {
    let mut prefix = PathBuf::new();
    let mut rooted = false;
    let mut components: Vec<Component<'_>> = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::Prefix(_) => prefix.push(component.as_os_str()),
            Component::RootDir => rooted = true,
            Component::CurDir => {},
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                },
                // Can't go above the root.
                _ if rooted => {},
                _ => components.push(component),
            },
            Component::Normal(_) => components.push(component),
        }
    }
    let mut normalized = prefix;
    if rooted {
        normalized.push(Component::RootDir.as_os_str());
    }
    normalized.extend(components.iter().map(|c| c.as_os_str()));
    match normalized.as_os_str().is_empty() {
        true => PathBuf::from("."),
        false => normalized,
    }
}
