//! Shared key generation for storage backends.
//!
//! Key format: `{path}/{uuid}`, or just `{uuid}` when the credentials carry
//! no path prefix.

use uuid::Uuid;

/// Generate a fresh object key under the given prefix.
///
/// Leading and trailing slashes of `path` are ignored.
pub fn generate_object_key(path: &str) -> String {
    object_key(path, Uuid::new_v4())
}

pub(crate) fn object_key(path: &str, id: Uuid) -> String {
    let prefix = path.trim_matches('/');
    if prefix.is_empty() {
        id.to_string()
    } else {
        format!("{}/{}", prefix, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_under_prefix() {
        let id = Uuid::nil();
        assert_eq!(
            object_key("uploads/abc", id),
            "uploads/abc/00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            object_key("/uploads/", id),
            "uploads/00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(object_key("", id), "00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn test_keys_are_unique() {
        assert_ne!(generate_object_key("p"), generate_object_key("p"));
    }
}
