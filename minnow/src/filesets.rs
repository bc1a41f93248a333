// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File globbing behind the `globs` / `rglobs` / `zglobs` BUILD-file helpers.

use camino::Utf8Path;
use glob::{MatchOptions, Pattern};

/// The three glob helpers exposed to BUILD files.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GlobKind {
    /// `globs`: patterns match within the BUILD file's own directory;
    /// wildcards do not cross directory separators.
    Exact,
    /// `rglobs`: patterns match at any depth below the BUILD file's
    /// directory.
    Recursive,
    /// `zglobs`: patterns are used as written and may contain `**` segments
    /// matching zero or more directories.
    ZeroOrMore,
}

/// Expands a glob pattern relative to `dir`, returning matching *files* as
/// paths relative to `dir`, sorted.
///
/// Unreadable entries are skipped rather than failing the evaluation; an
/// invalid pattern is an error message for the BUILD-file author.
pub(crate) fn glob_files(dir: &Utf8Path, pattern: &str, kind: GlobKind) -> Result<Vec<String>, String> {
    let pattern = match kind {
        GlobKind::Exact | GlobKind::ZeroOrMore => pattern.to_owned(),
        GlobKind::Recursive => format!("**/{}", pattern),
    };

    // The directory prefix is escaped so that glob metacharacters in the
    // directory name itself are matched literally.
    let full_pattern = format!("{}/{}", Pattern::escape(dir.as_str()), pattern);
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };

    let entries = glob::glob_with(&full_pattern, options)
        .map_err(|err| format!("invalid glob pattern '{}': {}", pattern, err))?;

    let mut matches = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(_) => continue,
        };
        if !path.is_file() {
            continue;
        }
        let path = match Utf8Path::from_path(&path) {
            Some(path) => path,
            None => continue,
        };
        if let Ok(rel) = path.strip_prefix(dir) {
            matches.push(rel.as_str().to_owned());
        }
    }
    matches.sort();
    matches.dedup();
    Ok(matches)
}
