//! Merge helpers for flag maps, the `--flag -> value` maps that end up on the
//! command line of kubelet and the control plane processes.
//!
//! All helpers take their inputs by reference and return a new map, so the
//! same map can safely be used as source and defaults.
use std::collections::BTreeMap;

/// Command line flags of a single process. A present key with an empty value
/// is dropped once the map is fully resolved.
pub type FlagMap = BTreeMap<String, String>;

/// Builds a [`FlagMap`] from `(flag, value)` pairs.
pub fn flag_map<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> FlagMap {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}

/// Returns `overrides` with every key of `defaults` which is absent in
/// `overrides`. An explicitly empty value counts as present.
pub fn fill_absent(overrides: &FlagMap, defaults: &FlagMap) -> FlagMap {
    let mut merged = overrides.clone();
    for (key, value) in defaults {
        merged
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }
    merged
}

/// Returns `overrides` with every key of `defaults` which is absent or empty
/// in `overrides`.
pub fn fill_blank(overrides: &FlagMap, defaults: &FlagMap) -> FlagMap {
    let mut merged = overrides.clone();
    for (key, value) in defaults {
        let entry = merged.entry(key.clone()).or_default();
        if entry.is_empty() {
            entry.clone_from(value);
        }
    }
    merged
}

/// Returns `base` with every entry of `statics` applied on top, replacing
/// whatever `base` held for those keys.
pub fn overlay(base: &FlagMap, statics: &FlagMap) -> FlagMap {
    let mut merged = base.clone();
    merged.extend(statics.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Returns `map` without the entries whose value is empty.
pub fn drop_empty(map: &FlagMap) -> FlagMap {
    map.iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Returns `map` without the given keys.
pub fn without_keys(map: &FlagMap, keys: &[&str]) -> FlagMap {
    map.iter()
        .filter(|(key, _)| !keys.contains(&key.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
