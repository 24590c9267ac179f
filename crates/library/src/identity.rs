//! Stable entity identifiers.
//!
//! IDs are derived from the entity's normalized path, so re-scanning the same
//! tree always produces the same IDs and an entity can be located again
//! without a lookup. The entity kind is hashed along with the path: a title
//! and a chapter can never share an ID even if they somehow share a path.

use shelf_storage::normalize_path;
use std::path::Path;

/// The three levels of the library hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Title,
    Chapter,
    Page,
}

impl EntityKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Chapter => "chapter",
            Self::Page => "page",
        }
    }
}

/// Derive the ID of an entity from its kind and path.
///
/// The result is the kind's prefix, an underscore and the hex-encoded BLAKE3
/// digest of `prefix || 0x00 || normalized path`.
///
/// ```
/// use shelf_library::{EntityKind, stable_id};
///
/// let id = stable_id(EntityKind::Title, "/library/Berserk");
/// assert!(id.starts_with("title_"));
/// assert_eq!(id, stable_id(EntityKind::Title, "/library//Berserk/"));
/// ```
pub fn stable_id(kind: EntityKind, path: impl AsRef<Path>) -> String {
    let path = normalize_path(path.as_ref());
    let mut hasher = blake3::Hasher::new();
    hasher.update(kind.prefix().as_bytes());
    hasher.update(&[0]);
    hasher.update(path.as_os_str().as_encoded_bytes());
    format!("{}_{}", kind.prefix(), hasher.finalize().to_hex())
}
