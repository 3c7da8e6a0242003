//! Lenient Kubernetes version parsing and comparison.
//!
//! Orchestrator versions come straight from user input, so parsing accepts a
//! leading `v` and a missing patch component. Comparisons never fail: a
//! version that can't be parsed is never considered to be greater or equal to
//! anything.
use std::cmp::Ordering;

use semver::Version;

use crate::constants::DEFAULT_KUBERNETES_VERSION;

/// Parses `input` as a semantic version, accepting `v1.16.0`, `1.16` and
/// `1.16.0-beta.1` alike.
pub fn parse_version(input: &str) -> Option<Version> {
    let trimmed = input.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);

    if let Ok(version) = Version::parse(trimmed) {
        return Some(version);
    }

    // Accept `major.minor` by assuming patch 0
    let (core, pre) = match trimmed.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (trimmed, None),
    };

    if core.split('.').count() != 2 {
        return None;
    }

    let padded = match pre {
        Some(pre) => format!("{core}.0-{pre}"),
        None => format!("{core}.0"),
    };

    Version::parse(&padded).ok()
}

/// Returns `true` if `version` is at least `minimum` using semver precedence,
/// so `1.15.0-beta.1` sorts before `1.15.0`.
pub fn is_version_ge(version: &str, minimum: &str) -> bool {
    match (parse_version(version), parse_version(minimum)) {
        (Some(version), Some(minimum)) => version.cmp_precedence(&minimum) != Ordering::Less,
        _ => false,
    }
}

/// Returns `true` if `version` is strictly lower than `maximum`. Unparsable
/// input is never lower.
pub fn is_version_lt(version: &str, maximum: &str) -> bool {
    match (parse_version(version), parse_version(maximum)) {
        (Some(version), Some(maximum)) => version.cmp_precedence(&maximum) == Ordering::Less,
        _ => false,
    }
}

/// Latest patch release known for each `1.x` minor version.
const LATEST_PATCH_VERSIONS: &[(u64, &str)] = &[
    (6, "1.6.13"),
    (7, "1.7.16"),
    (8, "1.8.15"),
    (9, "1.9.11"),
    (10, "1.10.13"),
    (11, "1.11.10"),
    (12, "1.12.9"),
    (13, "1.13.12"),
    (14, "1.14.10"),
    (15, "1.15.12"),
    (16, "1.16.15"),
    (17, "1.17.17"),
];

/// Turns the user supplied orchestrator version into a full patch version.
///
/// An empty version resolves to [`DEFAULT_KUBERNETES_VERSION`] and a bare
/// release like `1.15` to the latest known patch of that release. Anything
/// else is normalized but otherwise kept, so that the catalog lookup decides
/// whether the version is usable.
pub fn resolve_orchestrator_version(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return DEFAULT_KUBERNETES_VERSION.to_owned();
    }

    let Some(version) = parse_version(trimmed) else {
        return trimmed.to_owned();
    };

    let core = trimmed.strip_prefix('v').unwrap_or(trimmed);
    let is_release = version.major == 1 && version.pre.is_empty() && core.split('.').count() == 2;
    LATEST_PATCH_VERSIONS
        .iter()
        .find(|(minor, _)| is_release && *minor == version.minor)
        .map_or_else(|| version.to_string(), |(_, patch)| (*patch).to_owned())
}

/// Returns the `major.minor` part of `version`, e.g. `1.16` for `1.16.7`.
pub fn major_minor(version: &str) -> Option<String> {
    parse_version(version).map(|v| format!("{}.{}", v.major, v.minor))
}
