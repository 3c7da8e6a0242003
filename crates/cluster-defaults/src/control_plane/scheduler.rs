use super::merge;
use crate::{
    constants::KUBELET_KUBECONFIG_FILE,
    feature_gates,
    flag_map::{FlagMap, drop_empty, flag_map},
    model::Properties,
    version::is_version_ge,
};

/// Resolves the `kube-scheduler` flags.
pub fn scheduler_flags(properties: &Properties) -> FlagMap {
    let statics = flag_map([
        ("--kubeconfig", KUBELET_KUBECONFIG_FILE),
        ("--leader-elect", "true"),
    ]);
    let defaults = flag_map([("--v", "2"), ("--profiling", "false")]);

    let mut flags = merge(
        &properties.kubernetes_config().scheduler_config,
        &defaults,
        &statics,
    );
    if is_version_ge(properties.orchestrator_version(), "1.22.0-alpha.1") {
        flags = feature_gates::remove_gates(&flags, &["VolumeSnapshotDataSource"]);
    }

    drop_empty(&flags)
}
