// src/util.rs

//! Small shared helpers: `%NAME%` template substitution, CLI path
//! resolution against a search list, and line-ending cleanup for relayed
//! process output.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Substitute `%NAME%` placeholders in `template` with entries from `values`.
///
/// Placeholders without a matching value are left untouched, so partial
/// substitution is visible rather than silently dropped.
pub fn trans(template: &str, values: &BTreeMap<String, String>) -> String {
    let mut out = template.to_string();
    for (name, value) in values {
        let placeholder = format!("%{name}%");
        if out.contains(&placeholder) {
            out = out.replace(&placeholder, value);
        }
    }
    out
}

/// Resolve a CLI name against a list of search paths.
///
/// If `cli` already points at an existing file it is returned as-is;
/// otherwise the first `path/cli` that exists wins. When nothing matches,
/// the original name is returned and the spawn will fail with a proper
/// OS error later.
pub fn find_cli(cli: &str, paths: &[PathBuf]) -> PathBuf {
    let direct = Path::new(cli);
    if direct.exists() {
        return direct.to_path_buf();
    }
    for base in paths {
        let candidate = base.join(cli);
        if candidate.exists() {
            return candidate;
        }
    }
    direct.to_path_buf()
}

/// Strip leading and trailing CR/LF characters (and nothing else).
pub fn clean_eol(s: &str) -> &str {
    s.trim_matches(|c| c == '\r' || c == '\n')
}
