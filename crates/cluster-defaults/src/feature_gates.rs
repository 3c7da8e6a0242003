//! Merging of `--feature-gates` style `key=value,key=value` strings.
use std::collections::BTreeMap;

use itertools::Itertools;

use crate::{flag_map::FlagMap, version::is_version_ge};

pub const FEATURE_GATES_FLAG: &str = "--feature-gates";

/// Combines `key=value` lists, later inputs winning for the same key.
///
/// Tokens are split on `,` and then on the first `=`; tokens without a `=`
/// are dropped. The output is sorted by key so it is stable across runs.
pub fn combine<I, S>(inputs: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut gates = BTreeMap::new();
    for input in inputs {
        apply(&mut gates, input.as_ref());
    }
    to_string(&gates)
}

/// Returns `map` with `defaults` combined into its feature gates, provided
/// `version` is at least `min_version` (or `min_version` is empty).
///
/// The gates are normalized in every case, so the key is always present
/// afterwards, possibly with an empty value.
pub fn add_conditional(map: &FlagMap, version: &str, min_version: &str, defaults: &str) -> FlagMap {
    let current = map.get(FEATURE_GATES_FLAG).map_or("", String::as_str);
    let applies = min_version.is_empty() || is_version_ge(version, min_version);
    let combined = combine([current, if applies { defaults } else { "" }]);

    let mut result = map.clone();
    result.insert(FEATURE_GATES_FLAG.to_owned(), combined);
    result
}

/// Returns `map` with the named gates removed from its feature gates. A map
/// without feature gates is returned unchanged.
pub fn remove_gates(map: &FlagMap, names: &[&str]) -> FlagMap {
    let mut result = map.clone();
    if let Some(current) = result.get_mut(FEATURE_GATES_FLAG) {
        let mut gates = BTreeMap::new();
        apply(&mut gates, current);
        for name in names {
            gates.remove(*name);
        }
        *current = to_string(&gates);
    }
    result
}

/// Returns `true` if `map` carries the exact `key=value` gate.
pub fn has_gate(map: &FlagMap, gate: &str) -> bool {
    map.get(FEATURE_GATES_FLAG)
        .is_some_and(|gates| gates.split(',').any(|token| token.trim() == gate))
}

fn apply(gates: &mut BTreeMap<String, String>, input: &str) {
    for token in input.split(',') {
        if let Some((key, value)) = token.trim().split_once('=') {
            gates.insert(key.to_owned(), value.to_owned());
        }
    }
}

fn to_string(gates: &BTreeMap<String, String>) -> String {
    gates
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .join(",")
}
