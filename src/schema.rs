//! Structural validation of JSON configuration documents.
//!
//! Preset and prompt-rule files are walked once as raw [`serde_json::Value`]s
//! before typed deserialization. Every problem is recorded as a
//! `path: message` line (e.g. `hero_main.sizes[1][0]: must be a positive
//! integer`) so a single run reports all of them.

use crate::config::ConfigError;
use serde_json::{Map, Value};
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::path::Path;

/// `parent.key`, or just `key` at the root.
pub fn field(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// `parent[index]`.
pub fn item(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

/// Collected violations for one document.
#[derive(Debug, Default)]
pub struct Violations {
    items: Vec<String>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: &str, message: impl Display) {
        let path = if path.is_empty() { "(root)" } else { path };
        self.items.push(format!("{path}: {message}"));
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.items
    }

    /// `Ok` when nothing was recorded, otherwise [`ConfigError::Invalid`].
    pub fn into_result(self, file: &Path) -> Result<(), ConfigError> {
        if self.items.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid {
                file: file.to_path_buf(),
                violations: self.items,
            })
        }
    }

    pub fn object<'a>(&mut self, value: &'a Value, path: &str) -> Option<&'a Map<String, Value>> {
        let map = value.as_object();
        if map.is_none() {
            self.push(path, "must be an object");
        }
        map
    }

    /// Record every key of `map` not in `allowed`.
    pub fn known_keys(&mut self, map: &Map<String, Value>, allowed: &[&str], path: &str) {
        for key in map.keys() {
            if !allowed.contains(&key.as_str()) {
                self.push(&field(path, key), "unknown field");
            }
        }
    }

    pub fn required<'a>(
        &mut self,
        map: &'a Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Option<&'a Value> {
        let value = map.get(key);
        if value.is_none() {
            self.push(&field(path, key), "missing required field");
        }
        value
    }

    pub fn string<'a>(&mut self, value: &'a Value, path: &str) -> Option<&'a str> {
        let s = value.as_str();
        if s.is_none() {
            self.push(path, "must be a string");
        }
        s
    }

    pub fn non_empty_string<'a>(&mut self, value: &'a Value, path: &str) -> Option<&'a str> {
        match self.string(value, path) {
            Some(s) if s.trim().is_empty() => {
                self.push(path, "must not be empty");
                None
            }
            other => other,
        }
    }

    pub fn array<'a>(&mut self, value: &'a Value, path: &str) -> Option<&'a Vec<Value>> {
        let arr = value.as_array();
        if arr.is_none() {
            self.push(path, "must be an array");
        }
        arr
    }

    /// Non-empty array.
    pub fn list<'a>(&mut self, value: &'a Value, path: &str) -> Option<&'a Vec<Value>> {
        match self.array(value, path) {
            Some(arr) if arr.is_empty() => {
                self.push(path, "must not be empty");
                None
            }
            other => other,
        }
    }

    pub fn integer_in(
        &mut self,
        value: &Value,
        path: &str,
        range: RangeInclusive<u64>,
    ) -> Option<u64> {
        match value.as_u64() {
            Some(n) if range.contains(&n) => Some(n),
            Some(_) => {
                self.push(
                    path,
                    format_args!("must be between {} and {}", range.start(), range.end()),
                );
                None
            }
            None => {
                self.push(path, "must be a non-negative integer");
                None
            }
        }
    }
}
