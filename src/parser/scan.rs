//! In-process import scanner.
//!
//! Recognizes the import forms that matter for dependency inference:
//! `import ... from "x"`, `export ... from "x"`, `import "x"`,
//! `import("x")` and `require("x")`. Comments are collected for ignore
//! annotations and blanked out before matching so that commented-out
//! imports are not reported.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::parser::{FileRecord, ImportParser, ModuleRef, ParseRequest, ParserError};

static FROM_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?:import|export)\b[\w*{}\s,$]*?\bfrom\s*["']([^"'\n]+)["']"#).unwrap()
});

static SIDE_EFFECT_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bimport\s*["']([^"'\n]+)["']"#).unwrap());

static DYNAMIC_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bimport\s*\(\s*["']([^"'\n]+)["']\s*\)"#).unwrap());

static REQUIRE_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\brequire\s*\(\s*["']([^"'\n]+)["']\s*\)"#).unwrap());

/// Regex-based [`ImportParser`] reading files straight from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinScanner;

impl BuiltinScanner {
    pub fn new() -> Self {
        BuiltinScanner
    }

    /// Scan source text.
    pub fn scan(&self, source: &str) -> FileRecord {
        let (code, comments) = split_comments(source);

        let mut found: Vec<(usize, &str)> = Vec::new();
        for pattern in [&*FROM_CLAUSE, &*SIDE_EFFECT_IMPORT, &*DYNAMIC_IMPORT, &*REQUIRE_CALL] {
            for caps in pattern.captures_iter(&code) {
                if let Some(m) = caps.get(1) {
                    found.push((m.start(), &code[m.start()..m.end()]));
                }
            }
        }
        found.sort();

        let modules = found
            .into_iter()
            .map(|(offset, name)| ModuleRef {
                name: name.to_string(),
                line: line_of(&code, offset),
                filepath: None,
            })
            .collect();

        FileRecord { modules, comments }
    }
}

impl ImportParser for BuiltinScanner {
    fn parse(&self, request: &ParseRequest) -> Result<Vec<FileRecord>, ParserError> {
        let package_dir = Path::new(&request.repo_root).join(&request.rel_package_path);

        Ok(request
            .filenames
            .iter()
            .map(|filename| {
                let path = package_dir.join(filename);
                match std::fs::read_to_string(&path) {
                    Ok(source) => self.scan(&source),
                    Err(e) => {
                        tracing::warn!("{}: error reading source file: {}", path.display(), e);
                        FileRecord::default()
                    }
                }
            })
            .collect())
    }
}

fn line_of(text: &str, offset: usize) -> u32 {
    let newlines = text.as_bytes()[..offset]
        .iter()
        .filter(|&&b| b == b'\n')
        .count();
    u32::try_from(newlines + 1).unwrap_or(u32::MAX)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum LexState {
    Code,
    Str(char),
    LineComment,
    BlockComment,
}

/// Separate comments from code.
///
/// Returns the source with every comment replaced by spaces (newlines are
/// kept so offsets and line numbers still line up), plus the comment texts.
/// String literals are skipped so that `"http://x"` is not a comment.
fn split_comments(source: &str) -> (String, Vec<String>) {
    let mut code = String::with_capacity(source.len());
    let mut comments = Vec::new();
    let mut current = String::new();
    let mut state = LexState::Code;
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            LexState::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    state = LexState::LineComment;
                    current.push_str("//");
                    code.push_str("  ");
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = LexState::BlockComment;
                    current.push_str("/*");
                    code.push_str("  ");
                }
                '"' | '\'' | '`' => {
                    state = LexState::Str(c);
                    code.push(c);
                }
                _ => code.push(c),
            },
            LexState::Str(quote) => {
                code.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        code.push(escaped);
                    }
                } else if c == quote || (c == '\n' && quote != '`') {
                    state = LexState::Code;
                }
            }
            LexState::LineComment => {
                if c == '\n' {
                    comments.push(std::mem::take(&mut current));
                    code.push('\n');
                    state = LexState::Code;
                } else {
                    current.push(c);
                    blank(&mut code, c);
                }
            }
            LexState::BlockComment => {
                current.push(c);
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    current.push('/');
                    code.push_str("  ");
                    comments.push(std::mem::take(&mut current));
                    state = LexState::Code;
                } else if c == '\n' {
                    code.push('\n');
                } else {
                    blank(&mut code, c);
                }
            }
        }
    }

    if matches!(state, LexState::LineComment | LexState::BlockComment) && !current.is_empty() {
        comments.push(current);
    }

    (code, comments)
}

/// Push spaces occupying the same number of bytes as `c`.
fn blank(code: &mut String, c: char) {
    for _ in 0..c.len_utf8() {
        code.push(' ');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(record: &FileRecord) -> Vec<(&str, u32)> {
        record
            .modules
            .iter()
            .map(|m| (m.name.as_str(), m.line))
            .collect()
    }

    #[test]
    fn test_import_forms() {
        let source = r#"import React, { useState } from "react";
import type { Props } from './props';
import * as path from 'node:path';
import './styles.css';
export { helper } from "../lib/helper";
export * from "./types";
const lazy = () => import("./lazy");
const fs = require('fs');
import {
  a,
  b,
} from "@scope/multi";
"#;

        let record = BuiltinScanner::new().scan(source);
        assert_eq!(
            names(&record),
            vec![
                ("react", 1),
                ("./props", 2),
                ("node:path", 3),
                ("./styles.css", 4),
                ("../lib/helper", 5),
                ("./types", 6),
                ("./lazy", 7),
                ("fs", 8),
                ("@scope/multi", 12),
            ]
        );
    }

    #[test]
    fn test_commented_imports_are_skipped() {
        let source = "// import old from 'old';\n/* import gone from \"gone\"; */\nimport kept from 'kept';\n";
        let record = BuiltinScanner::new().scan(source);

        assert_eq!(names(&record), vec![("kept", 3)]);
        assert_eq!(
            record.comments,
            vec!["// import old from 'old';", "/* import gone from \"gone\"; */"]
        );
    }

    #[test]
    fn test_strings_are_not_comments() {
        let source = "const url = \"http://example.com\";\nimport x from 'x'; // gazelle:ignore x\n";
        let record = BuiltinScanner::new().scan(source);

        assert_eq!(names(&record), vec![("x", 2)]);
        assert_eq!(record.comments, vec!["// gazelle:ignore x"]);
    }

    #[test]
    fn test_identifiers_containing_keywords() {
        let source = "const reimport = 1;\nmyrequire('nope');\nimportant('nope');\n";
        assert!(BuiltinScanner::new().scan(source).modules.is_empty());
    }

    #[test]
    fn test_parse_request_reads_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("app")).unwrap();
        std::fs::write(tmp.path().join("app/main.ts"), "import x from './x';\n").unwrap();

        let request = ParseRequest::new(
            tmp.path().display().to_string(),
            "app",
            vec!["main.ts".to_string(), "missing.ts".to_string()],
        );
        let records = BuiltinScanner::new().parse(&request).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(names(&records[0]), vec![("./x", 1)]);
        assert!(records[1].modules.is_empty());
    }
}
