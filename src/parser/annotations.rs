//! Ignore annotations in source comments.
//!
//! `// gazelle:ignore react,lodash` suppresses the named modules for the
//! file it appears in. Block (`/* */`) and hash comments are accepted too.

use std::collections::BTreeSet;

/// Annotation kind that ignores modules.
pub const IGNORE_ANNOTATION: &str = "ignore";

/// Annotations collected from one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    ignore: BTreeSet<String>,
}

impl Annotations {
    pub fn from_comments<S: AsRef<str>>(comments: &[S], prefix: &str) -> Self {
        let mut annotations = Annotations::default();

        for comment in comments {
            let Some((kind, value)) = parse_annotation(comment.as_ref(), prefix) else {
                continue;
            };
            if kind != IGNORE_ANNOTATION {
                continue;
            }
            annotations.ignore.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string),
            );
        }

        annotations
    }

    /// Whether `module` was ignored by an annotation.
    pub fn ignores(&self, module: &str) -> bool {
        self.ignore.contains(module)
    }

    pub fn is_empty(&self) -> bool {
        self.ignore.is_empty()
    }
}

fn parse_annotation<'a>(comment: &'a str, prefix: &str) -> Option<(&'a str, &'a str)> {
    let body = uncomment(comment);
    let rest = body.strip_prefix(prefix)?;
    Some(match rest.split_once(char::is_whitespace) {
        Some((kind, value)) => (kind, value.trim()),
        None => (rest, ""),
    })
}

fn uncomment(comment: &str) -> &str {
    let trimmed = comment.trim();
    let body = if let Some(rest) = trimmed.strip_prefix("//") {
        rest
    } else if let Some(rest) = trimmed.strip_prefix("/*") {
        rest.strip_suffix("*/").unwrap_or(rest)
    } else {
        trimmed.trim_start_matches('#')
    };
    body.trim_start_matches(|c: char| c == '*' || c == '/' || c.is_whitespace())
        .trim_end()
}
