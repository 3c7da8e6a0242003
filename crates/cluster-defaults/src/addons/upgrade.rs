//! Migrations of addon definitions written by older releases, applied only
//! while upgrading a cluster.
use tracing::{info, warn};

use super::{ReconcileOptions, defaults::pool_bounds, overlay_addon};
use crate::{
    constants::*,
    model::{AddonSpec, AgentPoolProfile, EnabledState, KubernetesConfig},
    version::is_version_ge,
};

const POD_SECURITY_POLICY_DATA_KEY: &str = "data";
const MIN_NODES_KEY: &str = "min-nodes";
const MAX_NODES_KEY: &str = "max-nodes";

/// Moves an enabled cluster-autoscaler without per pool configuration to one
/// pool entry per agent pool.
///
/// Every pool is pinned at its current size, except the first one which
/// inherits the legacy addon level `min-nodes`/`max-nodes` bounds. Runs
/// before the catalog is merged in, since the catalog would otherwise supply
/// the pools.
pub fn migrate_cluster_autoscaler_pools(addons: &mut [AddonSpec], agent_pools: &[AgentPoolProfile]) {
    let Some(autoscaler) = addons
        .iter_mut()
        .find(|addon| addon.name == CLUSTER_AUTOSCALER_ADDON_NAME)
    else {
        return;
    };
    if autoscaler.enabled != EnabledState::Enabled || !autoscaler.pools.is_empty() {
        return;
    }

    warn!("enabling the per pool cluster-autoscaler configuration as part of the upgrade");

    let mut pools = Vec::with_capacity(agent_pools.len());
    for (index, agent_pool) in agent_pools.iter().enumerate() {
        let mut pool = pool_bounds(&agent_pool.name, agent_pool.count);
        if index == 0 {
            for key in [MIN_NODES_KEY, MAX_NODES_KEY] {
                match autoscaler.config.remove(key) {
                    Some(legacy) if !legacy.is_empty() => {
                        pool.config.insert(key.to_owned(), legacy);
                    }
                    _ => {}
                }
            }
        }

        warn!(
            cluster_autoscaler.pool = %pool.name,
            cluster_autoscaler.min_nodes = %pool.config[MIN_NODES_KEY],
            cluster_autoscaler.max_nodes = %pool.config[MAX_NODES_KEY],
            "configured cluster-autoscaler pool"
        );
        pools.push(pool);
    }

    autoscaler.pools = pools;
}

/// Applies the migrations which run after the catalog has been merged in.
///
/// * a `pod-security-policy` addon is synthesized from the legacy
///   `podSecurityPolicyConfig.data` manifest
/// * calico is forced on and re-defaulted when calico is the network policy,
///   as its definition may have been pruned while it was disabled
/// * the azure-npm telemetry container, gone since 1.16.0, is removed
pub fn apply_upgrade_compat(
    addons: &mut Vec<AddonSpec>,
    config: &KubernetesConfig,
    version: &str,
    defaults: &[AddonSpec],
) {
    let has_psp_addon = addons
        .iter()
        .any(|addon| addon.name == POD_SECURITY_POLICY_ADDON_NAME);
    if let Some(data) = config
        .pod_security_policy_config
        .get(POD_SECURITY_POLICY_DATA_KEY)
        .filter(|_| !has_psp_addon)
    {
        info!("synthesizing the pod-security-policy addon from the legacy configuration");
        let mut psp = AddonSpec::new(POD_SECURITY_POLICY_ADDON_NAME, EnabledState::Unset);
        psp.data.clone_from(data);
        addons.push(psp);
    }

    if config.network_policy == NETWORK_POLICY_CALICO {
        let calico = addons.iter_mut().find(|addon| addon.name == CALICO_ADDON_NAME);
        let default = defaults.iter().find(|addon| addon.name == CALICO_ADDON_NAME);
        if let (Some(calico), Some(default)) = (calico, default) {
            calico.enabled = EnabledState::Enabled;
            *calico = overlay_addon(
                calico,
                default,
                ReconcileOptions {
                    is_upgrade: true,
                    unset_means_enabled: false,
                },
            );
        }
    }

    let drops_telemetry =
        config.network_policy == NETWORK_POLICY_AZURE && is_version_ge(version, "1.16.0");
    if let Some(npm) = addons
        .iter_mut()
        .find(|addon| addon.name == AZURE_NETWORK_POLICY_ADDON_NAME)
        .filter(|_| drops_telemetry)
    {
        npm.containers
            .retain(|container| container.name != AZURE_VNET_TELEMETRY_CONTAINER_NAME);
    }
}
