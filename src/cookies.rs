// src/cookies.rs

//! Cookie storage and `Set-Cookie` parsing.
//!
//! The [`CookieJar`] is owned by the orchestrator and shared across every
//! HTTP worker it launches. Workers never touch it directly: they propose
//! changes via `response` control messages and read from it via `request`
//! messages, so the jar stays single-writer without any locking discipline
//! on the worker side.
//!
//! Only cookie name/value pairs are retained, keyed by domain and path.
//! Other attributes (`Domain`, `Expires`, `Secure`, ...) are parsed and
//! dropped; nothing ever expires.

use std::collections::BTreeMap;

use crate::protocol::CookieMap;

/// Cookie attributes that are recognized and discarded during parsing.
///
/// Anything else with an `=` is treated as a plain name/value cookie pair.
const IGNORED_ATTRIBUTES: [&str; 6] = [
    "domain", "expires", "max-age", "secure", "httponly", "samesite",
];

/// Domain/path-scoped store of cookie name/value pairs.
#[derive(Debug, Default)]
pub struct CookieJar {
    /// `domain -> path -> name -> value`
    entries: BTreeMap<String, CookieMap>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge path-grouped cookies for `domain`, overwriting same-named
    /// entries and never removing old ones.
    pub fn merge(&mut self, domain: &str, cookies: CookieMap) {
        let scope = self.entries.entry(domain.to_string()).or_default();
        for (path, pairs) in cookies {
            scope.entry(path).or_default().extend(pairs);
        }
    }

    /// Build a `Cookie` header value for a request to `domain`/`path`.
    ///
    /// Every stored path that is a prefix of the request path contributes
    /// its pairs; a longer (more specific) path wins when the same cookie
    /// name appears under several paths. Returns `None` when nothing
    /// matches, so callers can skip the reply entirely.
    pub fn cookie_for(&self, domain: &str, path: &str) -> Option<String> {
        let scope = self.entries.get(domain)?;

        let mut matching: Vec<(&String, &BTreeMap<String, String>)> = scope
            .iter()
            .filter(|(cookie_path, _)| path_matches(cookie_path, path))
            .collect();
        matching.sort_by_key(|(cookie_path, _)| cookie_path.len());

        let mut merged: BTreeMap<&str, &str> = BTreeMap::new();
        for (_, pairs) in matching {
            for (name, value) in pairs {
                merged.insert(name, value);
            }
        }

        if merged.is_empty() {
            return None;
        }
        Some(
            merged
                .into_iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Direct value lookup, mostly for inspection and tests.
    pub fn get(&self, domain: &str, path: &str, name: &str) -> Option<&str> {
        self.entries
            .get(domain)?
            .get(path)?
            .get(name)
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// RFC-style path scoping, without the trailing-slash subtleties: the
/// stored path must be a prefix of the request path on a path-segment
/// boundary.
fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if cookie_path == "/" || cookie_path == request_path {
        return true;
    }
    match request_path.strip_prefix(cookie_path) {
        Some(rest) => cookie_path.ends_with('/') || rest.starts_with('/'),
        None => false,
    }
}

/// Parse and group `Set-Cookie` header values by their `Path` attribute.
///
/// Each entry is split on `;`; the `path` attribute is pulled out, known
/// attributes are discarded, and whatever name/value pairs remain are
/// grouped under that path. Entries missing a usable path or any pair are
/// dropped silently: partial cookie data is discarded rather than guessed.
pub fn group_set_cookies<'a, I>(values: I) -> CookieMap
where
    I: IntoIterator<Item = &'a str>,
{
    let mut grouped = CookieMap::new();
    for entry in values {
        let mut path: Option<String> = None;
        let mut pairs: BTreeMap<String, String> = BTreeMap::new();

        for part in entry.split(';') {
            let Some((name, value)) = part.split_once('=') else {
                // Valueless attributes like `Secure` or `HttpOnly`.
                continue;
            };
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("path") {
                path = Some(value.to_string());
            } else if !is_ignored_attribute(name) {
                pairs.insert(name.to_string(), value.to_string());
            }
        }

        match path {
            Some(path) if !pairs.is_empty() => {
                grouped.entry(path).or_default().extend(pairs);
            }
            _ => {}
        }
    }
    grouped
}

fn is_ignored_attribute(name: &str) -> bool {
    IGNORED_ATTRIBUTES
        .iter()
        .any(|attr| name.eq_ignore_ascii_case(attr))
}
