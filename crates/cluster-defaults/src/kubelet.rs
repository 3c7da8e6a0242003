//! Kubelet flags of the cluster, the masters and every agent pool.
//!
//! Flags are resolved in three layers. The cluster level map is filled from
//! the version dependent defaults and then overwritten by the static flags,
//! which the user cannot change. The resolved cluster map then serves as the
//! defaults of the master map and of each pool map, the latter receiving the
//! static flags of its own OS first.
//!
//! An empty user value counts as unset. Static flags with an empty value
//! block a key from being inherited and are dropped at the end, so that no
//! resolved map carries an empty value.
use tracing::{debug, instrument};

use crate::{
    catalog::{self, ComponentImages},
    constants::*,
    feature_gates,
    flag_map::{FlagMap, drop_empty, fill_absent, flag_map, overlay, without_keys},
    model::{KubernetesConfig, Properties},
    version::is_version_ge,
};

const POD_MAX_PIDS_FLAG: &str = "--pod-max-pids";
const REGISTER_WITH_TAINTS_FLAG: &str = "--register-with-taints";
const PROTECT_KERNEL_DEFAULTS_FLAG: &str = "--protect-kernel-defaults";
const RESOLV_CONF_FLAG: &str = "--resolv-conf";

const MIN_VERSION_ROTATE_CERTS: &str = "1.11.9";
const ROTATE_SERVER_CERTIFICATE_GATE: &str = "RotateKubeletServerCertificate=true";
const SUPPORT_POD_PIDS_LIMIT_GATE: &str = "SupportPodPidsLimit=true";
const SYSTEMD_RESOLV_CONF: &str = "/run/systemd/resolve/resolv.conf";

/// Resolves the kubelet flags of the cluster, the master profile and every
/// agent pool in place.
#[instrument(
    name = "set_kubelet_config",
    skip_all,
    fields(version = %properties.orchestrator_version(), is_upgrade = is_upgrade)
)]
pub fn set_kubelet_config(properties: &mut Properties, images: Option<&ComponentImages>, is_upgrade: bool) {
    let version = properties.orchestrator_version().to_owned();
    let config = properties.kubernetes_config();

    let windows_statics = static_windows_flags(config);
    let mut linux_statics = static_linux_flags(config);
    if config.uses_cloud_controller_manager() {
        linux_statics.insert("--cloud-provider".to_owned(), "external".to_owned());
    }

    let cluster = cluster_flags(properties, images, &linux_statics, is_upgrade);
    debug!(kubelet.flags = cluster.len(), "resolved cluster kubelet flags");

    let has_linux_pools = properties.has_linux_pools();
    if let Some(master) = properties.master_profile.as_mut() {
        let mut flags = fill_absent(&drop_empty(&master.kubelet_config), &cluster);
        flags = feature_gates::add_conditional(&flags, &version, "", "");
        flags = gate_pod_max_pids(&flags, &version, is_upgrade);
        if master.is_vhd_distro() {
            flags
                .entry(PROTECT_KERNEL_DEFAULTS_FLAG.to_owned())
                .or_insert_with(|| "true".to_owned());
        }
        if master.is_ubuntu_1804() {
            flags.insert(RESOLV_CONF_FLAG.to_owned(), SYSTEMD_RESOLV_CONF.to_owned());
        }
        flags = prune(&flags, &version);
        if has_linux_pools {
            add_taint(&mut flags, MASTER_NODE_TAINT, MASTER_NODE_TAINT);
        }
        master.kubelet_config = flags;
    }

    let aad_pod_identity = properties
        .kubernetes_config()
        .is_addon_enabled(AAD_POD_IDENTITY_ADDON_NAME, false);
    let aad_taint = format!("{AAD_POD_IDENTITY_TAINT_KEY}=true:NoSchedule");

    for pool in &mut properties.agent_pool_profiles {
        let pool_version = if pool.orchestrator_version.is_empty() {
            version.as_str()
        } else {
            pool.orchestrator_version.as_str()
        };
        let statics = if pool.is_windows() {
            &windows_statics
        } else {
            &linux_statics
        };

        let mut flags = overlay(&drop_empty(&pool.kubelet_config), statics);
        flags = fill_absent(&flags, &cluster);
        flags = gate_pod_max_pids(&flags, pool_version, is_upgrade);
        if pool.is_vhd_distro() {
            flags
                .entry(PROTECT_KERNEL_DEFAULTS_FLAG.to_owned())
                .or_insert_with(|| "true".to_owned());
        }
        if pool.is_ubuntu_1804() {
            flags.insert(RESOLV_CONF_FLAG.to_owned(), SYSTEMD_RESOLV_CONF.to_owned());
        }
        flags = prune(&flags, pool_version);
        if aad_pod_identity && !pool.is_windows() {
            add_taint(&mut flags, AAD_POD_IDENTITY_TAINT_KEY, &aad_taint);
        }

        debug!(
            kubelet.pool = %pool.name,
            kubelet.version = %pool_version,
            kubelet.flags = flags.len(),
            "resolved agent pool kubelet flags"
        );
        pool.kubelet_config = flags;
    }
}

/// Resolves the cluster level map and stores it on the kubernetes config.
fn cluster_flags(
    properties: &mut Properties,
    images: Option<&ComponentImages>,
    statics: &FlagMap,
    is_upgrade: bool,
) -> FlagMap {
    let version = properties.orchestrator_version().to_owned();
    let defaults = default_flags(properties, images);
    let config = &mut properties.orchestrator_profile.kubernetes_config;

    let mut flags = fill_absent(&drop_empty(&config.kubelet_config), &defaults);
    flags = feature_gates::add_conditional(
        &flags,
        &version,
        MIN_VERSION_ROTATE_CERTS,
        ROTATE_SERVER_CERTIFICATE_GATE,
    );
    if config.network_plugin == NETWORK_PLUGIN_KUBENET && config.network_policy != NETWORK_POLICY_CALICO {
        flags.insert("--network-plugin".to_owned(), NETWORK_PLUGIN_KUBENET.to_owned());
    }
    flags = overlay(&flags, statics);
    flags = gate_pod_max_pids(&flags, &version, is_upgrade);
    flags = prune(&flags, &version);

    config.kubelet_config.clone_from(&flags);
    flags
}

/// Flags every Linux kubelet runs with, whatever the user asks for.
fn static_linux_flags(config: &KubernetesConfig) -> FlagMap {
    let mut flags = flag_map([
        ("--address", "0.0.0.0"),
        ("--allow-privileged", "true"),
        ("--authorization-mode", "Webhook"),
        ("--pod-manifest-path", "/etc/kubernetes/manifests"),
        ("--cluster-dns", config.dns_service_ip.as_str()),
        ("--cgroups-per-qos", "true"),
        ("--kubeconfig", KUBELET_KUBECONFIG_FILE),
        ("--keep-terminated-pod-volumes", "false"),
        ("--tls-cert-file", KUBELET_SERVER_CERT_FILE),
        ("--tls-private-key-file", KUBELET_SERVER_KEY_FILE),
        ("--v", "2"),
        ("--volume-plugin-dir", "/etc/kubernetes/volumeplugins"),
    ]);
    if config.is_secure_kubelet_enabled() {
        flags.extend(flag_map([
            ("--anonymous-auth", "false"),
            ("--client-ca-file", CA_CERT_FILE),
        ]));
    }
    flags
}

/// Flags every Windows kubelet runs with. Linux only paths are blanked so
/// that they are not inherited from the cluster level map.
fn static_windows_flags(config: &KubernetesConfig) -> FlagMap {
    let mut flags = static_linux_flags(config);
    for key in ["--pod-manifest-path", "--tls-cert-file", "--tls-private-key-file"] {
        flags.insert(key.to_owned(), String::new());
    }

    let client_ca = if config.is_secure_kubelet_enabled() {
        "c:\\k\\ca.crt"
    } else {
        ""
    };
    let anonymous_auth = if config.is_secure_kubelet_enabled() {
        "false"
    } else {
        ""
    };

    overlay(
        &flags,
        &flag_map([
            ("--anonymous-auth", anonymous_auth),
            ("--client-ca-file", client_ca),
            ("--azure-container-registry-config", "c:\\k\\azure.json"),
            ("--pod-infra-container-image", "kubletwin/pause"),
            ("--kubeconfig", "c:\\k\\config"),
            ("--cloud-config", "c:\\k\\azure.json"),
            ("--cgroups-per-qos", "false"),
            ("--enforce-node-allocatable", "\"\"\"\""),
            ("--system-reserved", "memory=2Gi"),
            ("--hairpin-mode", "promiscuous-bridge"),
            ("--image-pull-progress-deadline", "20m"),
            ("--resolv-conf", "\"\"\"\""),
            ("--eviction-hard", "\"\"\"\""),
        ]),
    )
}

/// Defaults the user may override, depending on version and topology.
fn default_flags(properties: &Properties, images: Option<&ComponentImages>) -> FlagMap {
    let config = properties.kubernetes_config();
    let version = properties.orchestrator_version();

    let node_status_update_frequency = if properties.is_custom_cloud() {
        AZURE_STACK_NODE_STATUS_UPDATE_FREQUENCY
    } else {
        catalog::image(images, catalog::NODE_STATUS_FREQUENCY_KEY)
    };
    let pause_image = format!(
        "{}{}",
        config.mcr_kubernetes_image_base,
        catalog::image(images, catalog::PAUSE_KEY)
    );
    let max_pods = if config.is_azure_cni() {
        DEFAULT_KUBERNETES_MAX_PODS_VNET_INTEGRATED
    } else {
        DEFAULT_KUBERNETES_MAX_PODS
    };
    let non_masquerade_cidr = if properties.is_ip_masq_agent_disabled() {
        config.cluster_subnet.as_str()
    } else {
        DEFAULT_NON_MASQUERADE_CIDR
    };

    let mut flags = flag_map([
        ("--cluster-domain", DEFAULT_KUBERNETES_CLUSTER_DOMAIN),
        ("--network-plugin", "cni"),
        ("--pod-infra-container-image", pause_image.as_str()),
        ("--eviction-hard", DEFAULT_KUBERNETES_HARD_EVICTION_THRESHOLD),
        ("--node-status-update-frequency", node_status_update_frequency),
        ("--non-masquerade-cidr", non_masquerade_cidr),
        ("--cloud-provider", "azure"),
        ("--cloud-config", AZURE_JSON_FILE),
        ("--azure-container-registry-config", AZURE_JSON_FILE),
        ("--event-qps", DEFAULT_KUBELET_EVENT_QPS),
        ("--cadvisor-port", DEFAULT_KUBELET_CADVISOR_PORT),
        ("--image-pull-progress-deadline", "30m"),
        ("--enforce-node-allocatable", "pods"),
        ("--streaming-connection-idle-timeout", "4h"),
    ]);
    flags.extend([
        ("--max-pods".to_owned(), max_pods.to_string()),
        ("--image-gc-high-threshold".to_owned(), DEFAULT_GC_HIGH_THRESHOLD.to_string()),
        ("--image-gc-low-threshold".to_owned(), DEFAULT_GC_LOW_THRESHOLD.to_string()),
        (POD_MAX_PIDS_FLAG.to_owned(), DEFAULT_KUBELET_POD_MAX_PIDS.to_string()),
    ]);

    if is_version_ge(version, "1.10.0") {
        flags.insert(
            "--tls-cipher-suites".to_owned(),
            TLS_STRONG_CIPHER_SUITES_KUBELET.to_owned(),
        );
    }
    if is_version_ge(version, MIN_VERSION_ROTATE_CERTS) {
        flags.insert("--rotate-certificates".to_owned(), "true".to_owned());
    }
    if is_version_ge(version, "1.16.0") {
        flags.insert("--authentication-token-webhook".to_owned(), "true".to_owned());
        if !properties.is_hosted_master() {
            flags.insert("--read-only-port".to_owned(), "0".to_owned());
        }
    }
    if config.is_containerd() {
        flags.extend(flag_map([
            ("--container-runtime", "remote"),
            ("--runtime-request-timeout", "15m"),
            ("--container-runtime-endpoint", "unix:///run/containerd/containerd.sock"),
        ]));
    }

    flags
}

/// Disables pod PID limits on upgrades to 1.14.0 and later, unless they were
/// explicitly opted into with a positive limit and the feature gate.
fn gate_pod_max_pids(flags: &FlagMap, version: &str, is_upgrade: bool) -> FlagMap {
    let mut gated = flags.clone();
    if !is_upgrade || !is_version_ge(version, "1.14.0") {
        return gated;
    }

    let opted_in = feature_gates::has_gate(flags, SUPPORT_POD_PIDS_LIMIT_GATE);
    let limit = flags
        .get(POD_MAX_PIDS_FLAG)
        .and_then(|value| value.trim().parse::<i64>().ok());

    match limit {
        Some(limit) if opted_in && limit > 0 => {}
        _ => {
            debug!(kubelet.version = %version, "disabling pod PID limits for the upgrade");
            gated.insert(POD_MAX_PIDS_FLAG.to_owned(), DEFAULT_KUBELET_POD_MAX_PIDS.to_string());
        }
    }
    gated
}

/// Drops the flags `version` doesn't know about and every empty value.
fn prune(flags: &FlagMap, version: &str) -> FlagMap {
    let mut unsupported = Vec::new();
    if !is_version_ge(version, "1.10.0") {
        unsupported.push(POD_MAX_PIDS_FLAG);
    }
    if is_version_ge(version, "1.12.0") {
        unsupported.push("--cadvisor-port");
    }
    if is_version_ge(version, "1.15.0-beta.1") {
        unsupported.push("--allow-privileged");
    }

    drop_empty(&without_keys(flags, &unsupported))
}

/// Appends `taint` to the registered taints unless `marker` is already part
/// of them.
fn add_taint(flags: &mut FlagMap, marker: &str, taint: &str) {
    let taints = flags.entry(REGISTER_WITH_TAINTS_FLAG.to_owned()).or_default();
    if taints.is_empty() {
        taint.clone_into(taints);
    } else if !taints.contains(marker) {
        taints.push(',');
        taints.push_str(taint);
    }
}
