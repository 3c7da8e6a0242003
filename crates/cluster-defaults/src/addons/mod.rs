//! Reconciliation of the user supplied addon list with the addon catalog.
//!
//! The catalog itself is built by [`default_addons`]; [`reconcile`] merges it
//! into whatever the user declared, filling gaps without ever replacing a
//! value the user set (container images during an upgrade are the one
//! exception). [`apply_upgrade_compat`] carries the migrations which only run
//! while upgrading an existing cluster.
use std::collections::BTreeMap;

use crate::model::{AddonSpec, ContainerSpec};

mod defaults;
mod upgrade;

pub use defaults::{AddonContext, default_addons, log_analytics_workspace_domain};
pub use upgrade::{apply_upgrade_compat, migrate_cluster_autoscaler_pools};

/// Per call knobs of [`reconcile`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReconcileOptions {
    /// Container images are refreshed from the catalog even when set.
    pub is_upgrade: bool,

    /// How an entry is treated whose enablement is unset in both the user
    /// list and the catalog.
    pub unset_means_enabled: bool,
}

/// Merges `defaults` into `existing`.
///
/// Without a user list the catalog is returned as is. Otherwise every catalog
/// entry missing from the user list is appended, and every entry present in
/// both receives the catalog values for the fields it left empty. Disabled
/// entries only get their enablement filled in.
pub fn reconcile(
    existing: Option<&[AddonSpec]>,
    defaults: &[AddonSpec],
    options: ReconcileOptions,
) -> Vec<AddonSpec> {
    let Some(existing) = existing else {
        return defaults.to_vec();
    };

    let mut reconciled: Vec<AddonSpec> = existing
        .iter()
        .map(|addon| {
            match defaults.iter().find(|default| default.name == addon.name) {
                Some(default) => overlay_addon(addon, default, options),
                None => addon.clone(),
            }
        })
        .collect();

    reconciled.extend(
        defaults
            .iter()
            .filter(|default| !existing.iter().any(|addon| addon.name == default.name))
            .cloned(),
    );

    reconciled
}

/// Fills the empty fields of `addon` from its catalog entry.
///
/// The `data` field plays no part here: an addon carrying a raw manifest
/// still gets its containers and config filled in.
pub fn overlay_addon(addon: &AddonSpec, default: &AddonSpec, options: ReconcileOptions) -> AddonSpec {
    let mut merged = addon.clone();
    merged.enabled = addon.enabled.or(default.enabled);

    if !merged.enabled.resolve(options.unset_means_enabled) {
        return merged;
    }

    if merged.mode.is_empty() {
        merged.mode.clone_from(&default.mode);
    }

    merged.containers = overlay_containers(&addon.containers, &default.containers, options.is_upgrade);

    if merged.pools.is_empty() {
        merged.pools.clone_from(&default.pools);
    }

    merged.config = overlay_config(&addon.config, &default.config);
    merged
}

/// Appends the catalog containers the user didn't declare and fills the empty
/// fields of those they did.
pub(crate) fn overlay_containers(
    existing: &[ContainerSpec],
    defaults: &[ContainerSpec],
    is_upgrade: bool,
) -> Vec<ContainerSpec> {
    let mut merged = existing.to_vec();

    for default in defaults {
        match merged.iter_mut().find(|container| container.name == default.name) {
            Some(container) => {
                if container.image.is_empty() || is_upgrade {
                    container.image.clone_from(&default.image);
                }
                fill_empty(&mut container.cpu_requests, &default.cpu_requests);
                fill_empty(&mut container.memory_requests, &default.memory_requests);
                fill_empty(&mut container.cpu_limits, &default.cpu_limits);
                fill_empty(&mut container.memory_limits, &default.memory_limits);
            }
            None => merged.push(default.clone()),
        }
    }

    merged
}

/// Fills config keys which are absent or empty.
pub(crate) fn overlay_config(
    existing: &BTreeMap<String, String>,
    defaults: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = existing.clone();
    for (key, value) in defaults {
        fill_empty(merged.entry(key.clone()).or_default(), value);
    }
    merged
}

fn fill_empty(target: &mut String, default: &str) {
    if target.is_empty() {
        default.clone_into(target);
    }
}
