//! Import path normalization.
//!
//! Imports are matched against declared targets by logical module identity:
//! a workspace-relative, cleaned path with the source extension removed.
//! Everything here is pure string manipulation on `/`-separated paths.

use crate::core::import::is_relative_import;

/// Base name (without extension) of files that also stand for their directory.
pub const INDEX_FILE_NAME: &str = "index";

/// Recognized source extensions. Declaration forms come first so that
/// `foo.d.ts` strips to `foo` rather than `foo.d`.
pub const SOURCE_EXTENSIONS: &[&str] = &[
    ".d.ts", ".d.mts", ".d.cts", ".ts", ".tsx", ".mts", ".cts", ".js", ".jsx", ".mjs", ".cjs",
];

/// Convert an import written in `src` (a file relative to package `pkg`)
/// into a workspace-relative logical import path.
///
/// Relative imports are resolved against the importing file's directory;
/// anything else is already workspace-absolute and `pkg` is ignored.
pub fn to_workspace_import_path(pkg: &str, src: &str, import: &str) -> String {
    let joined = if is_relative_import(import) {
        join(&[pkg, dirname(src), import])
    } else {
        import.to_string()
    };

    let cleaned = clean(&joined);
    strip_import_extensions(&cleaned).to_string()
}

/// Collapse `.` and `..` segments and redundant separators.
///
/// `..` never climbs above the workspace root; the root itself is `""`.
pub fn clean(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Join path fragments with `/`, skipping empty ones.
pub fn join(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/")
}

/// Directory part of a `/`-separated path (`""` for a bare file name).
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Final segment of a `/`-separated path.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Remove one recognized source extension, if present.
pub fn strip_import_extensions(path: &str) -> &str {
    SOURCE_EXTENSIONS
        .iter()
        .find_map(|ext| path.strip_suffix(ext).filter(|rest| !rest.is_empty()))
        .unwrap_or(path)
}

/// Whether a file name carries an importable source extension.
pub fn has_importable_extension(name: &str) -> bool {
    SOURCE_EXTENSIONS.iter().any(|ext| name.ends_with(ext) && name.len() > ext.len())
}

/// Whether the file's base name, after stripping its extension, is the
/// reserved index name.
pub fn is_index_file(path: &str) -> bool {
    basename(strip_import_extensions(path)) == INDEX_FILE_NAME
}

/// For a logical import path of an index file (`dir/index`), return the
/// directory path it is also importable as (`dir`).
pub fn index_directory(import_path: &str) -> Option<&str> {
    if basename(import_path) != INDEX_FILE_NAME {
        return None;
    }
    Some(dirname(import_path))
}

/// Whether a file is a test source (`foo.test.ts`, `foo.spec.tsx`, ...).
pub fn is_test_file(path: &str) -> bool {
    let stem = format!("{}.", basename(strip_import_extensions(path)));
    stem.contains(".test.") || stem.contains(".spec.")
}
