//! Filesystem utilities.

use std::path::{Component, Path, PathBuf};

/// Canonicalize a path, but don't fail if it doesn't exist yet.
/// Returns the path as-is if canonicalization fails.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Render a relative path with `/` separators on every platform.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Slash-separated path of `path` relative to `base`.
pub fn rel_slash(base: &Path, path: &Path) -> String {
    to_slash(&relative_path(base, path))
}

/// Whether a file or directory name is hidden (dot-prefixed).
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.') && name != "." && name != ".."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path() {
        let base = Path::new("/ws/app");
        assert_eq!(relative_path(base, Path::new("/ws/app/src/main.ts")), PathBuf::from("src/main.ts"));
        assert_eq!(rel_slash(base, Path::new("/ws/app/src/ui/view.tsx")), "src/ui/view.tsx");
    }

    #[test]
    fn test_to_slash() {
        assert_eq!(to_slash(Path::new("a/b/c.ts")), "a/b/c.ts");
        assert_eq!(to_slash(Path::new("")), "");
        assert_eq!(to_slash(Path::new("./a")), "a");
    }

    #[test]
    fn test_is_hidden() {
        assert!(is_hidden(".git"));
        assert!(!is_hidden("src"));
        assert!(!is_hidden(".."));
    }
}
