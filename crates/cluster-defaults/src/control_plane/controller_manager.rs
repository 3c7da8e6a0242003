use crate::{
    constants::*,
    feature_gates,
    flag_map::{FlagMap, drop_empty, fill_absent, flag_map, overlay},
    model::Properties,
    version::is_version_ge,
};

/// Resolves the `kube-controller-manager` flags.
pub fn controller_manager_flags(properties: &Properties) -> FlagMap {
    let config = properties.kubernetes_config();
    let version = properties.orchestrator_version();

    let (node_monitor_grace_period, pod_eviction_timeout, route_reconciliation_period) =
        if properties.is_custom_cloud() {
            (
                AZURE_STACK_CTRL_MGR_NODE_MONITOR_GRACE_PERIOD,
                AZURE_STACK_CTRL_MGR_POD_EVICTION_TIMEOUT,
                AZURE_STACK_CTRL_MGR_ROUTE_RECONCILIATION_PERIOD,
            )
        } else {
            (
                DEFAULT_KUBERNETES_CTRL_MGR_NODE_MONITOR_GRACE_PERIOD,
                DEFAULT_KUBERNETES_CTRL_MGR_POD_EVICTION_TIMEOUT,
                DEFAULT_KUBERNETES_CTRL_MGR_ROUTE_RECONCILIATION_PERIOD,
            )
        };
    let defaults = flag_map([
        ("--node-monitor-grace-period", node_monitor_grace_period),
        ("--pod-eviction-timeout", pod_eviction_timeout),
        ("--route-reconciliation-period", route_reconciliation_period),
        (
            "--terminated-pod-gc-threshold",
            DEFAULT_KUBERNETES_CTRL_MGR_TERMINATED_POD_GC_THRESHOLD,
        ),
        ("--use-service-account-credentials", "false"),
        ("--profiling", "false"),
    ]);

    let mut statics = flag_map([
        ("--kubeconfig", KUBELET_KUBECONFIG_FILE),
        ("--cluster-cidr", properties.controller_cluster_cidr()),
        ("--root-ca-file", CA_CERT_FILE),
        ("--cluster-signing-cert-file", CA_CERT_FILE),
        ("--cluster-signing-key-file", CA_KEY_FILE),
        ("--service-account-private-key-file", APISERVER_KEY_FILE),
        ("--leader-elect", "true"),
        ("--v", "2"),
        ("--controllers", "*,bootstrapsigner,tokencleaner"),
    ]);
    statics.extend([
        (
            "--allocate-node-cidrs".to_owned(),
            (!config.is_azure_cni() || properties.is_azure_cni_dual_stack()).to_string(),
        ),
        (
            "--configure-cloud-routes".to_owned(),
            properties.requires_route_table().to_string(),
        ),
    ]);
    if let Some(master) = &properties.master_profile {
        statics.insert("--cluster-name".to_owned(), master.dns_prefix.clone());
    }
    if config.uses_cloud_controller_manager() {
        statics.insert("--cloud-provider".to_owned(), "external".to_owned());
    } else {
        statics.insert("--cloud-provider".to_owned(), "azure".to_owned());
        statics.insert("--cloud-config".to_owned(), AZURE_JSON_FILE.to_owned());
    }
    if config.is_rbac_enabled() {
        statics.insert("--use-service-account-credentials".to_owned(), "true".to_owned());
    }

    // Feature gates are combined into the user's flags before the statics
    // are applied.
    let mut flags = fill_absent(&drop_empty(&config.controller_manager_config), &defaults);
    if !is_version_ge(version, "1.19.0") {
        flags = feature_gates::add_conditional(&flags, version, "1.9.0", "ServiceNodeExclusion=true");
    }
    flags = feature_gates::add_conditional(
        &flags,
        version,
        "1.10.0",
        "LocalStorageCapacityIsolation=true",
    );
    flags = feature_gates::add_conditional(
        &flags,
        version,
        "1.24.0",
        "LegacyServiceAccountTokenNoAutoGeneration=false",
    );
    flags = overlay(&flags, &statics);
    if is_version_ge(version, "1.22.0-alpha.1") {
        flags = feature_gates::remove_gates(&flags, &["VolumeSnapshotDataSource"]);
    }

    drop_empty(&flags)
}
