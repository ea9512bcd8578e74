//! Per-title variable overrides
//!
//! The environment callback lets the core look up configuration variables
//! by key. The host answers from this table: each key has a default
//! value, optionally overridden for specific titles matched by game-id
//! prefix. Values are owned C strings so the pointer handed back to the
//! core stays valid for the lifetime of the installed context.

use std::collections::HashMap;
use std::ffi::{CStr, CString};

struct Entry {
    default: CString,
    /// (game-id prefix, value), first match wins
    overrides: Vec<(String, CString)>,
}

pub struct VariableTable {
    entries: HashMap<String, Entry>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// The built-in table: defaults plus fixes for known problematic
    /// titles.
    pub fn builtin() -> Self {
        let mut table = Self::new();

        // Recompilation is off by default for stability, but a handful of
        // titles hang in cutscenes without it.
        table.define("jit_enable", "disabled");
        table.define_override("jit_enable", "IRE", "enabled");
        table.define_override("jit_enable", "IRB", "enabled");

        table.define("mic_input", "blow");
        table.define("console_mode", "ds");
        table.define("boot_directly", "enabled");

        table
    }

    /// Set the default value for a key, creating the entry if needed.
    pub fn define(&mut self, key: &str, value: &str) {
        let Ok(value) = CString::new(value) else {
            tracing::warn!("Variable value for {} contains a NUL byte, ignored", key);
            return;
        };
        self.entries
            .entry(key.to_string())
            .and_modify(|e| e.default = value.clone())
            .or_insert(Entry {
                default: value,
                overrides: Vec::new(),
            });
    }

    /// Add a per-title override for a key already defined.
    pub fn define_override(&mut self, key: &str, game_id_prefix: &str, value: &str) {
        let Some(entry) = self.entries.get_mut(key) else {
            tracing::warn!("Override for undefined variable {} ignored", key);
            return;
        };
        let Ok(value) = CString::new(value) else {
            tracing::warn!("Variable value for {} contains a NUL byte, ignored", key);
            return;
        };
        entry.overrides.push((game_id_prefix.to_string(), value));
    }

    /// Resolve a key against the overrides for the given game id, falling
    /// back to the key's default. `None` for unknown keys.
    pub fn resolve(&self, key: &str, game_id: &str) -> Option<&CStr> {
        let entry = self.entries.get(key)?;
        let value = entry
            .overrides
            .iter()
            .find(|(prefix, _)| game_id.starts_with(prefix.as_str()))
            .map(|(_, value)| value)
            .unwrap_or(&entry.default);
        Some(value.as_c_str())
    }
}

impl Default for VariableTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_and_override() {
        let table = VariableTable::builtin();

        let default = table.resolve("jit_enable", "ABCD").unwrap();
        assert_eq!(default.to_str().unwrap(), "disabled");

        let fixed = table.resolve("jit_enable", "IRE0").unwrap();
        assert_eq!(fixed.to_str().unwrap(), "enabled");
    }

    #[test]
    fn test_unknown_key_is_none() {
        let table = VariableTable::builtin();
        assert!(table.resolve("no_such_key", "ABCD").is_none());
    }

    #[test]
    fn test_redefine_replaces_default_keeps_overrides() {
        let mut table = VariableTable::builtin();
        table.define("jit_enable", "enabled");

        assert_eq!(
            table.resolve("jit_enable", "ABCD").unwrap().to_str().unwrap(),
            "enabled"
        );
        assert_eq!(
            table.resolve("jit_enable", "IRB1").unwrap().to_str().unwrap(),
            "enabled"
        );
    }

    #[test]
    fn test_override_for_undefined_key_ignored() {
        let mut table = VariableTable::new();
        table.define_override("ghost", "IRE", "enabled");
        assert!(table.resolve("ghost", "IRE0").is_none());
    }
}
