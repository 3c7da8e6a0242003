//! Cluster wide defaults of the orchestrator profile and the node addressing
//! that depends on them.
//!
//! Runs right after the orchestrator version has been resolved and before
//! any catalog lookup, so everything below only reads the user's input and
//! the cloud the cluster is deployed into.
use std::net::{IpAddr, Ipv4Addr};

use tracing::{debug, instrument, warn};

use crate::{
    constants::*,
    defaults::DefaultsParams,
    flag_map::FlagMap,
    model::{EnvironmentSpec, ImageBaseFlavor, KubernetesConfig, KubernetesSpecConfig, Properties},
    version::{is_version_ge, is_version_lt, resolve_orchestrator_version},
};

const MAX_PODS_FLAG: &str = "--max-pods";

/// Fills the orchestrator profile, the master subnet and the distros of the
/// masters and Linux pools.
#[instrument(
    name = "set_orchestrator_defaults",
    skip_all,
    fields(cloud = %cloud.cloud_name, is_upgrade = params.is_upgrade, is_scale = params.is_scale)
)]
pub fn set_orchestrator_defaults(
    properties: &mut Properties,
    cloud: &EnvironmentSpec,
    params: &DefaultsParams,
) {
    let profile = &mut properties.orchestrator_profile;
    if profile.orchestrator_type.is_empty() {
        KUBERNETES.clone_into(&mut profile.orchestrator_type);
    }
    profile.orchestrator_version = resolve_orchestrator_version(&profile.orchestrator_version);

    set_network_defaults(properties);
    set_image_base_defaults(properties, &cloud.kubernetes_spec_config, params.is_upgrade);
    set_runtime_defaults(&mut properties.orchestrator_profile.kubernetes_config, params);
    set_address_defaults(properties);
    set_cloud_provider_defaults(properties);
    set_security_defaults(properties, params);
    set_load_balancer_defaults(properties);
    set_master_network_defaults(properties, params.is_upgrade);
    set_distro_defaults(properties, cloud, params.is_update());

    let config = properties.kubernetes_config();
    debug!(
        orchestrator.version = %properties.orchestrator_version(),
        orchestrator.network_plugin = %config.network_plugin,
        orchestrator.network_policy = %config.network_policy,
        orchestrator.cluster_subnet = %config.cluster_subnet,
        "resolved orchestrator defaults"
    );
}

/// Translates the network policy into a plugin, then picks a plugin for
/// clusters that still have none.
fn set_network_defaults(properties: &mut Properties) {
    let has_windows = properties.has_windows_pools();
    let config = &mut properties.orchestrator_profile.kubernetes_config;

    let plugin_unset = config.network_plugin.is_empty();
    match config.network_policy.as_str() {
        NETWORK_POLICY_AZURE if plugin_unset => {
            NETWORK_PLUGIN_AZURE.clone_into(&mut config.network_plugin);
            config.network_policy.clear();
        }
        NETWORK_POLICY_NONE => {
            NETWORK_PLUGIN_KUBENET.clone_into(&mut config.network_plugin);
            config.network_policy.clear();
        }
        NETWORK_POLICY_CALICO if plugin_unset => {
            NETWORK_PLUGIN_KUBENET.clone_into(&mut config.network_plugin);
        }
        NETWORK_POLICY_CILIUM => NETWORK_PLUGIN_CILIUM.clone_into(&mut config.network_plugin),
        NETWORK_POLICY_ANTREA if plugin_unset => {
            NETWORK_PLUGIN_AZURE.clone_into(&mut config.network_plugin);
        }
        _ => {}
    }

    if config.network_plugin.is_empty() {
        let plugin = if has_windows {
            NETWORK_PLUGIN_AZURE
        } else if config.is_addon_enabled(FLANNEL_ADDON_NAME, false) {
            NETWORK_PLUGIN_FLANNEL
        } else {
            NETWORK_PLUGIN_KUBENET
        };
        plugin.clone_into(&mut config.network_plugin);
    }
}

fn set_image_base_defaults(
    properties: &mut Properties,
    specs: &KubernetesSpecConfig,
    is_upgrade: bool,
) {
    let is_custom_cloud = properties.is_custom_cloud();
    let config = &mut properties.orchestrator_profile.kubernetes_config;
    let mcr_base = specs.mcr_kubernetes_image_base.as_str();

    if is_custom_cloud {
        if !config.kubernetes_image_base.eq_ignore_ascii_case(mcr_base) {
            warn!(
                image.base = mcr_base,
                "kubernetesImageBase is forced to the MCR image base on custom clouds"
            );
        }
        mcr_base.clone_into(&mut config.kubernetes_image_base);
        if config.image_base_flavor != Some(ImageBaseFlavor::Mcr) {
            warn!("kubernetesImageBaseType is forced to mcr on custom clouds");
        }
        config.image_base_flavor = Some(ImageBaseFlavor::Mcr);
    }

    if is_upgrade
        && config.kubernetes_image_base == specs.kubernetes_image_base
        && config.image_base_flavor == Some(ImageBaseFlavor::Gcr)
    {
        debug!(image.base = mcr_base, "migrating the GCR image base to MCR");
        mcr_base.clone_into(&mut config.kubernetes_image_base);
        config.image_base_flavor = Some(ImageBaseFlavor::Mcr);
    }

    if config.kubernetes_image_base.is_empty() {
        mcr_base.clone_into(&mut config.kubernetes_image_base);
    } else if !config.kubernetes_image_base.ends_with('/') {
        config.kubernetes_image_base.push('/');
    }
    if config.image_base_flavor.is_none() {
        config.image_base_flavor = Some(ImageBaseFlavor::Mcr);
    }
    if config.mcr_kubernetes_image_base.is_empty() {
        mcr_base.clone_into(&mut config.mcr_kubernetes_image_base);
    }
}

fn set_runtime_defaults(config: &mut KubernetesConfig, params: &DefaultsParams) {
    if config.etcd_version.is_empty() {
        DEFAULT_ETCD_VERSION.clone_into(&mut config.etcd_version);
    } else if params.is_upgrade && is_version_lt(&config.etcd_version, DEFAULT_ETCD_VERSION) {
        warn!(
            etcd.from = %config.etcd_version,
            etcd.to = DEFAULT_ETCD_VERSION,
            "etcd will be upgraded"
        );
        DEFAULT_ETCD_VERSION.clone_into(&mut config.etcd_version);
    }

    if config.container_runtime.is_empty() {
        DOCKER.clone_into(&mut config.container_runtime);
    }
    match config.container_runtime.as_str() {
        DOCKER => pin_runtime_version(&mut config.moby_version, DEFAULT_MOBY_VERSION, "moby", params),
        CONTAINERD => pin_runtime_version(
            &mut config.containerd_version,
            DEFAULT_CONTAINERD_VERSION,
            CONTAINERD,
            params,
        ),
        _ => {}
    }
}

/// Fills an empty runtime version. Upgrades and scale operations always move
/// to the default version.
fn pin_runtime_version(current: &mut String, default: &str, runtime: &str, params: &DefaultsParams) {
    if !current.is_empty() && !params.is_update() {
        return;
    }
    if current.as_str() != default {
        if params.is_upgrade {
            warn!(runtime, version = default, "container runtime will be upgraded");
        } else if params.is_scale {
            warn!(runtime, version = default, "new nodes will run a newer container runtime");
        }
    }
    default.clone_into(current);
}

fn set_address_defaults(properties: &mut Properties) {
    let dual_stack = properties.is_ipv6_dual_stack();
    let ipv6_range = if is_version_ge(properties.orchestrator_version(), "1.17.0") {
        DEFAULT_KUBERNETES_CLUSTER_SUBNET_IPV6
    } else {
        LEGACY_KUBERNETES_CLUSTER_SUBNET_IPV6
    };
    let config = &mut properties.orchestrator_profile.kubernetes_config;
    let ipv4_default = if config.is_azure_cni() {
        DEFAULT_KUBERNETES_CLUSTER_SUBNET_AZURE_CNI
    } else {
        DEFAULT_KUBERNETES_CLUSTER_SUBNET
    };

    if config.cluster_subnet.is_empty() {
        config.cluster_subnet = if dual_stack {
            format!("{ipv4_default},{ipv6_range}")
        } else {
            ipv4_default.to_owned()
        };
    } else if dual_stack && !config.cluster_subnet.contains(',') {
        config.cluster_subnet = match subnet_address(&config.cluster_subnet) {
            Some(IpAddr::V4(_)) => format!("{},{ipv6_range}", config.cluster_subnet),
            Some(IpAddr::V6(_)) => format!("{ipv4_default},{}", config.cluster_subnet),
            None => config.cluster_subnet.clone(),
        };
    }

    if config.gc_high_threshold == 0 {
        config.gc_high_threshold = DEFAULT_GC_HIGH_THRESHOLD;
    }
    if config.gc_low_threshold == 0 {
        config.gc_low_threshold = DEFAULT_GC_LOW_THRESHOLD;
    }
    fill_empty(&mut config.dns_service_ip, DEFAULT_KUBERNETES_DNS_SERVICE_IP);
    fill_empty(&mut config.docker_bridge_subnet, DEFAULT_DOCKER_BRIDGE_SUBNET);
    fill_empty(&mut config.service_cidr, DEFAULT_KUBERNETES_SERVICE_CIDR);
}

fn set_cloud_provider_defaults(properties: &mut Properties) {
    let is_custom_cloud = properties.is_custom_cloud();
    let total_nodes = properties.total_nodes();
    let modern = is_version_ge(properties.orchestrator_version(), "1.14.0");
    let config = &mut properties.orchestrator_profile.kubernetes_config;

    let mode = if modern {
        CLOUD_PROVIDER_BACKOFF_MODE_V2
    } else {
        CLOUD_PROVIDER_BACKOFF_MODE_V1
    };
    mode.clone_into(&mut config.cloud_provider_backoff_mode);
    config.cloud_provider_backoff.get_or_insert(modern);
    config.cloud_provider_rate_limit.get_or_insert(true);

    if config.etcd_disk_size_gb.is_empty() {
        let size = match total_nodes {
            21.. if is_custom_cloud => MAX_AZURE_STACK_MANAGED_DISK_SIZE,
            21.. => DEFAULT_ETCD_DISK_SIZE_GT_20_NODES,
            11.. if is_custom_cloud => MAX_AZURE_STACK_MANAGED_DISK_SIZE,
            11.. => DEFAULT_ETCD_DISK_SIZE_GT_10_NODES,
            4.. => DEFAULT_ETCD_DISK_SIZE_GT_3_NODES,
            _ => DEFAULT_ETCD_DISK_SIZE,
        };
        size.clone_into(&mut config.etcd_disk_size_gb);
    }
}

fn set_security_defaults(properties: &mut Properties, params: &DefaultsParams) {
    let is_hosted = properties.is_hosted_master();
    let is_custom_cloud = properties.is_custom_cloud();
    let version = properties.orchestrator_profile.orchestrator_version.clone();
    let config = &mut properties.orchestrator_profile.kubernetes_config;

    config.enable_rbac.get_or_insert(true);
    if !config.is_rbac_enabled() && params.is_upgrade && !is_hosted && is_version_ge(&version, "1.15.0") {
        warn!(%version, "RBAC will be enabled during the upgrade");
        config.enable_rbac = Some(true);
    }

    if config.is_rbac_enabled() {
        config.enable_aggregated_apis = Some(true);
    } else if params.is_update() && config.is_aggregated_apis_enabled() {
        config.enable_aggregated_apis = Some(false);
    }

    config.enable_secure_kubelet.get_or_insert(true);
    config.use_instance_metadata.get_or_insert(!is_custom_cloud);
}

fn set_load_balancer_defaults(properties: &mut Properties) {
    let is_custom_cloud = properties.is_custom_cloud();
    let config = &mut properties.orchestrator_profile.kubernetes_config;

    if is_custom_cloud && config.load_balancer_sku != BASIC_LOAD_BALANCER_SKU {
        if !config.load_balancer_sku.is_empty() {
            warn!(
                load_balancer.sku = BASIC_LOAD_BALANCER_SKU,
                "loadBalancerSku is forced on custom clouds"
            );
        }
        BASIC_LOAD_BALANCER_SKU.clone_into(&mut config.load_balancer_sku);
    } else if config.load_balancer_sku.is_empty() {
        DEFAULT_LOAD_BALANCER_SKU.clone_into(&mut config.load_balancer_sku);
    }

    for sku in [BASIC_LOAD_BALANCER_SKU, DEFAULT_LOAD_BALANCER_SKU] {
        if config.load_balancer_sku.eq_ignore_ascii_case(sku) {
            sku.clone_into(&mut config.load_balancer_sku);
        }
    }

    let is_standard = config.load_balancer_sku == DEFAULT_LOAD_BALANCER_SKU;
    if is_standard {
        config.exclude_master_from_standard_lb.get_or_insert(true);
        if config.outbound_rule_idle_timeout_in_minutes == 0 {
            config.outbound_rule_idle_timeout_in_minutes = DEFAULT_OUTBOUND_RULE_IDLE_TIMEOUT_IN_MINUTES;
        }
    }
    if config.maximum_load_balancer_rule_count == 0 {
        config.maximum_load_balancer_rule_count = DEFAULT_MAXIMUM_LOAD_BALANCER_RULE_COUNT;
    }
    fill_empty(&mut config.proxy_mode, DEFAULT_KUBE_PROXY_MODE);
}

/// Places the masters and the agent pools into the default subnets, unless
/// the user brings their own VNET.
fn set_master_network_defaults(properties: &mut Properties, is_upgrade: bool) {
    let config = &properties.orchestrator_profile.kubernetes_config;
    let is_azure_cni = config.is_azure_cni();
    let cluster_subnet = if properties.is_azure_cni_dual_stack() {
        config.cluster_subnet.split(',').next().unwrap_or_default().to_owned()
    } else {
        config.cluster_subnet.clone()
    };

    let Some(master) = properties.master_profile.as_mut() else {
        return;
    };

    if master.is_custom_vnet() {
        if master.is_virtual_machine_scale_sets() && !master.vnet_cidr.is_empty() {
            master.first_consecutive_static_ip = first_consecutive_static_ip(&master.vnet_cidr, true);
        }
        return;
    }

    let keep_static_ip = is_upgrade && !master.first_consecutive_static_ip.is_empty();
    master.subnet = if is_azure_cni {
        cluster_subnet
    } else {
        DEFAULT_MASTER_SUBNET.to_owned()
    };
    if !keep_static_ip {
        if master.is_virtual_machine_scale_sets() {
            DEFAULT_FIRST_CONSECUTIVE_STATIC_IP_VMSS.clone_into(&mut master.first_consecutive_static_ip);
            DEFAULT_AGENT_SUBNET_AZURE_CNI_VMSS.clone_into(&mut master.agent_subnet);
            if is_azure_cni {
                DEFAULT_MASTER_SUBNET.clone_into(&mut master.subnet);
            }
        } else if is_azure_cni {
            master.first_consecutive_static_ip = first_consecutive_static_ip(&master.subnet, false);
        } else {
            DEFAULT_FIRST_CONSECUTIVE_STATIC_IP.clone_into(&mut master.first_consecutive_static_ip);
        }
    }

    if !master.is_virtual_machine_scale_sets() {
        let subnet = master.subnet.clone();
        for pool in &mut properties.agent_pool_profiles {
            subnet.clone_into(&mut pool.subnet);
        }
    }
}

fn set_distro_defaults(properties: &mut Properties, cloud: &EnvironmentSpec, is_update: bool) {
    let default_distro = if properties.kubernetes_config().custom_hyperkube_image.is_empty() {
        DISTRO_AKS_UBUNTU_1804
    } else {
        DISTRO_UBUNTU_1804
    };
    // VHD images aren't published to the German cloud
    let is_german_cloud = cloud.cloud_name == AZURE_GERMAN_CLOUD_NAME;

    let resolve = |distro: &mut String| {
        if distro.is_empty() {
            default_distro.clone_into(distro);
        } else if is_update {
            migrate_deprecated_distro(distro);
        }
        if is_german_cloud {
            DISTRO_UBUNTU_1804.clone_into(distro);
        }
    };

    if let Some(master) = properties.master_profile.as_mut() {
        resolve(&mut master.distro);
    }
    for pool in properties
        .agent_pool_profiles
        .iter_mut()
        .filter(|pool| !pool.is_windows())
    {
        resolve(&mut pool.distro);
    }
}

fn migrate_deprecated_distro(distro: &mut String) {
    let replacement = match distro.as_str() {
        DISTRO_AKS_DOCKER_ENGINE_DEPRECATED | DISTRO_AKS_1604_DEPRECATED => DISTRO_AKS_UBUNTU_1604,
        DISTRO_AKS_1804_DEPRECATED => DISTRO_AKS_UBUNTU_1804,
        _ => return,
    };
    debug!(from = %distro, to = replacement, "migrating deprecated distro");
    replacement.clone_into(distro);
}

/// Sets how many IPs every master and pool VM reserves. Runs after the
/// kubelet flags are resolved, as Azure CNI clusters reserve one IP per pod.
pub fn set_ip_address_counts(properties: &mut Properties) {
    let is_azure_cni = properties.kubernetes_config().is_azure_cni();
    let count = |kubelet_config: &FlagMap| {
        let pods = kubelet_config
            .get(MAX_PODS_FLAG)
            .and_then(|max_pods| max_pods.parse::<u32>().ok())
            .filter(|_| is_azure_cni)
            .unwrap_or_default();
        1 + pods
    };

    if let Some(master) = properties
        .master_profile
        .as_mut()
        .filter(|master| master.ip_address_count == 0)
    {
        master.ip_address_count = count(&master.kubelet_config);
    }
    for pool in properties
        .agent_pool_profiles
        .iter_mut()
        .filter(|pool| pool.ip_address_count == 0)
    {
        pool.ip_address_count = count(&pool.kubelet_config);
    }
}

/// First static IP handed to the masters of `subnet`.
///
/// Scale set masters start at `.4` of the subnet. Availability set masters
/// use the `.5` address of the last /24 inside the subnet. Falls back to the
/// default availability set IP if `subnet` isn't an IPv4 CIDR.
pub fn first_consecutive_static_ip(subnet: &str, vmss: bool) -> String {
    let Some((address, prefix)) = parse_ipv4_cidr(subnet) else {
        return DEFAULT_FIRST_CONSECUTIVE_STATIC_IP.to_owned();
    };

    let mask = u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0);
    let network = u32::from(address) & mask;
    let ip = if vmss {
        (network & !0xff) | 4
    } else {
        ((network | !mask) & !0xff) | 5
    };

    Ipv4Addr::from(ip).to_string()
}

fn parse_ipv4_cidr(cidr: &str) -> Option<(Ipv4Addr, u8)> {
    let (address, prefix) = cidr.trim().split_once('/')?;
    let prefix = prefix.parse::<u8>().ok().filter(|prefix| *prefix <= 32)?;
    Some((address.parse().ok()?, prefix))
}

fn subnet_address(cidr: &str) -> Option<IpAddr> {
    cidr.trim().split_once('/')?.0.parse().ok()
}

fn fill_empty(target: &mut String, default: &str) {
    if target.is_empty() {
        default.clone_into(target);
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;

    use super::*;
    use crate::{
        cloud::{EnvironmentRegistry, public_cloud_spec},
        flag_map::flag_map,
        model::{
            AddonSpec, AgentPoolProfile, AvailabilityProfile, FeatureFlags, HostedMasterProfile,
            MasterProfile, OsType,
        },
    };

    fn properties() -> Properties {
        serde_yaml::from_str(indoc! {"
            orchestratorProfile:
              orchestratorVersion: 1.16.4
            masterProfile:
              count: 3
              dnsPrefix: mycluster
            agentPoolProfiles:
              - name: linuxpool
                count: 2
        "})
        .expect("valid properties")
    }

    fn resolve(properties: &mut Properties, params: &DefaultsParams) {
        set_orchestrator_defaults(properties, &public_cloud_spec(), params);
    }

    fn upgrade() -> DefaultsParams {
        DefaultsParams {
            is_upgrade: true,
            ..DefaultsParams::default()
        }
    }

    #[test]
    fn fresh_cluster_defaults() {
        let mut properties = properties();
        resolve(&mut properties, &DefaultsParams::default());

        assert_eq!(properties.orchestrator_profile.orchestrator_type, KUBERNETES);
        let config = properties.kubernetes_config();
        assert_eq!(config.network_plugin, NETWORK_PLUGIN_KUBENET);
        assert_eq!(config.kubernetes_image_base, "mcr.microsoft.com/k8s/core/");
        assert_eq!(config.image_base_flavor, Some(ImageBaseFlavor::Mcr));
        assert_eq!(config.mcr_kubernetes_image_base, "mcr.microsoft.com/k8s/core/");
        assert_eq!(config.etcd_version, DEFAULT_ETCD_VERSION);
        assert_eq!(config.container_runtime, DOCKER);
        assert_eq!(config.moby_version, DEFAULT_MOBY_VERSION);
        assert!(config.containerd_version.is_empty());
        assert_eq!(config.cluster_subnet, DEFAULT_KUBERNETES_CLUSTER_SUBNET);
        assert_eq!(config.service_cidr, DEFAULT_KUBERNETES_SERVICE_CIDR);
        assert_eq!(config.dns_service_ip, DEFAULT_KUBERNETES_DNS_SERVICE_IP);
        assert_eq!(config.docker_bridge_subnet, DEFAULT_DOCKER_BRIDGE_SUBNET);
        assert_eq!((config.gc_high_threshold, config.gc_low_threshold), (85, 80));
        assert_eq!(config.cloud_provider_backoff_mode, CLOUD_PROVIDER_BACKOFF_MODE_V2);
        assert_eq!(config.cloud_provider_backoff, Some(true));
        assert_eq!(config.cloud_provider_rate_limit, Some(true));
        assert_eq!(config.etcd_disk_size_gb, DEFAULT_ETCD_DISK_SIZE_GT_3_NODES);
        assert_eq!(config.enable_rbac, Some(true));
        assert_eq!(config.enable_aggregated_apis, Some(true));
        assert_eq!(config.enable_secure_kubelet, Some(true));
        assert_eq!(config.use_instance_metadata, Some(true));
        assert_eq!(config.load_balancer_sku, DEFAULT_LOAD_BALANCER_SKU);
        assert_eq!(config.exclude_master_from_standard_lb, Some(true));
        assert_eq!(config.maximum_load_balancer_rule_count, 250);
        assert_eq!(config.outbound_rule_idle_timeout_in_minutes, 30);
        assert_eq!(config.proxy_mode, DEFAULT_KUBE_PROXY_MODE);

        let master = properties.master_profile.as_ref().expect("master profile");
        assert_eq!(master.subnet, DEFAULT_MASTER_SUBNET);
        assert_eq!(master.first_consecutive_static_ip, DEFAULT_FIRST_CONSECUTIVE_STATIC_IP);
        assert_eq!(master.distro, DISTRO_AKS_UBUNTU_1804);
        assert_eq!(properties.agent_pool_profiles[0].subnet, DEFAULT_MASTER_SUBNET);
        assert_eq!(properties.agent_pool_profiles[0].distro, DISTRO_AKS_UBUNTU_1804);
    }

    #[test]
    fn defaults_are_idempotent() {
        let mut properties = properties();
        resolve(&mut properties, &DefaultsParams::default());
        let once = properties.clone();
        resolve(&mut properties, &DefaultsParams::default());

        assert_eq!(properties, once);
    }

    #[rstest]
    #[case(NETWORK_POLICY_AZURE, "", NETWORK_PLUGIN_AZURE, "")]
    #[case(NETWORK_POLICY_AZURE, NETWORK_PLUGIN_KUBENET, NETWORK_PLUGIN_KUBENET, NETWORK_POLICY_AZURE)]
    #[case(NETWORK_POLICY_NONE, NETWORK_PLUGIN_AZURE, NETWORK_PLUGIN_KUBENET, "")]
    #[case(NETWORK_POLICY_CALICO, "", NETWORK_PLUGIN_KUBENET, NETWORK_POLICY_CALICO)]
    #[case(NETWORK_POLICY_CALICO, NETWORK_PLUGIN_AZURE, NETWORK_PLUGIN_AZURE, NETWORK_POLICY_CALICO)]
    #[case(NETWORK_POLICY_CILIUM, NETWORK_PLUGIN_KUBENET, NETWORK_PLUGIN_CILIUM, NETWORK_POLICY_CILIUM)]
    #[case(NETWORK_POLICY_ANTREA, "", NETWORK_PLUGIN_AZURE, NETWORK_POLICY_ANTREA)]
    #[case("", "", NETWORK_PLUGIN_KUBENET, "")]
    fn network_policy_translation(
        #[case] policy: &str,
        #[case] plugin: &str,
        #[case] expected_plugin: &str,
        #[case] expected_policy: &str,
    ) {
        let mut properties = properties();
        let config = &mut properties.orchestrator_profile.kubernetes_config;
        policy.clone_into(&mut config.network_policy);
        plugin.clone_into(&mut config.network_plugin);
        set_network_defaults(&mut properties);

        let config = properties.kubernetes_config();
        assert_eq!(config.network_plugin, expected_plugin);
        assert_eq!(config.network_policy, expected_policy);
    }

    #[test]
    fn plugin_defaults_for_windows_and_flannel() {
        let mut properties = properties();
        properties.orchestrator_profile.kubernetes_config.addons =
            Some(vec![AddonSpec::new(FLANNEL_ADDON_NAME, true)]);
        set_network_defaults(&mut properties);
        assert_eq!(properties.kubernetes_config().network_plugin, NETWORK_PLUGIN_FLANNEL);

        let mut properties = properties_with_windows();
        set_network_defaults(&mut properties);
        assert_eq!(properties.kubernetes_config().network_plugin, NETWORK_PLUGIN_AZURE);
    }

    fn properties_with_windows() -> Properties {
        let mut properties = properties();
        properties.agent_pool_profiles.push(AgentPoolProfile {
            name: "winpool".to_owned(),
            count: 1,
            os_type: OsType::Windows,
            ..AgentPoolProfile::default()
        });
        properties
    }

    #[rstest]
    #[case("", None, false, "mcr.microsoft.com/k8s/core/", ImageBaseFlavor::Mcr)]
    #[case("myregistry.azurecr.io", None, false, "myregistry.azurecr.io/", ImageBaseFlavor::Mcr)]
    #[case("k8s.gcr.io/", Some(ImageBaseFlavor::Gcr), false, "k8s.gcr.io/", ImageBaseFlavor::Gcr)]
    #[case("k8s.gcr.io/", Some(ImageBaseFlavor::Gcr), true, "mcr.microsoft.com/k8s/core/", ImageBaseFlavor::Mcr)]
    #[case("myregistry.azurecr.io/", Some(ImageBaseFlavor::Gcr), true, "myregistry.azurecr.io/", ImageBaseFlavor::Gcr)]
    fn image_bases(
        #[case] base: &str,
        #[case] flavor: Option<ImageBaseFlavor>,
        #[case] is_upgrade: bool,
        #[case] expected_base: &str,
        #[case] expected_flavor: ImageBaseFlavor,
    ) {
        let mut properties = properties();
        let config = &mut properties.orchestrator_profile.kubernetes_config;
        base.clone_into(&mut config.kubernetes_image_base);
        config.image_base_flavor = flavor;
        set_image_base_defaults(
            &mut properties,
            &public_cloud_spec().kubernetes_spec_config,
            is_upgrade,
        );

        let config = properties.kubernetes_config();
        assert_eq!(config.kubernetes_image_base, expected_base);
        assert_eq!(config.image_base_flavor, Some(expected_flavor));
    }

    #[test]
    fn custom_clouds_force_mcr_and_basic_load_balancer() {
        let mut properties = properties();
        properties.custom_cloud_profile = Some(Default::default());
        let config = &mut properties.orchestrator_profile.kubernetes_config;
        "k8s.gcr.io/".clone_into(&mut config.kubernetes_image_base);
        "standard".clone_into(&mut config.load_balancer_sku);
        resolve(&mut properties, &DefaultsParams::default());

        let config = properties.kubernetes_config();
        assert_eq!(config.kubernetes_image_base, "mcr.microsoft.com/k8s/core/");
        assert_eq!(config.image_base_flavor, Some(ImageBaseFlavor::Mcr));
        assert_eq!(config.load_balancer_sku, BASIC_LOAD_BALANCER_SKU);
        assert_eq!(config.exclude_master_from_standard_lb, None);
        assert_eq!(config.outbound_rule_idle_timeout_in_minutes, 0);
        assert_eq!(config.use_instance_metadata, Some(false));
    }

    #[rstest]
    #[case("standard", DEFAULT_LOAD_BALANCER_SKU)]
    #[case("BASIC", BASIC_LOAD_BALANCER_SKU)]
    #[case("", DEFAULT_LOAD_BALANCER_SKU)]
    fn load_balancer_sku_is_normalized(#[case] sku: &str, #[case] expected: &str) {
        let mut properties = properties();
        sku.clone_into(&mut properties.orchestrator_profile.kubernetes_config.load_balancer_sku);
        set_load_balancer_defaults(&mut properties);

        assert_eq!(properties.kubernetes_config().load_balancer_sku, expected);
    }

    #[rstest]
    #[case("3.2.26", false, "3.2.26")]
    #[case("3.2.26", true, DEFAULT_ETCD_VERSION)]
    #[case("3.4.3", true, "3.4.3")]
    fn etcd_version(#[case] version: &str, #[case] is_upgrade: bool, #[case] expected: &str) {
        let mut config = KubernetesConfig {
            etcd_version: version.to_owned(),
            ..KubernetesConfig::default()
        };
        let params = DefaultsParams {
            is_upgrade,
            ..DefaultsParams::default()
        };
        set_runtime_defaults(&mut config, &params);

        assert_eq!(config.etcd_version, expected);
    }

    #[rstest]
    #[case(DOCKER, false, false, "1.2.3")]
    #[case(DOCKER, true, false, DEFAULT_MOBY_VERSION)]
    #[case(CONTAINERD, false, true, DEFAULT_CONTAINERD_VERSION)]
    #[case(CONTAINERD, false, false, "1.2.3")]
    fn runtime_versions(
        #[case] runtime: &str,
        #[case] is_upgrade: bool,
        #[case] is_scale: bool,
        #[case] expected: &str,
    ) {
        let mut config = KubernetesConfig {
            container_runtime: runtime.to_owned(),
            moby_version: "1.2.3".to_owned(),
            containerd_version: "1.2.3".to_owned(),
            ..KubernetesConfig::default()
        };
        let params = DefaultsParams {
            is_upgrade,
            is_scale,
            ..DefaultsParams::default()
        };
        set_runtime_defaults(&mut config, &params);

        let actual = if runtime == DOCKER {
            &config.moby_version
        } else {
            &config.containerd_version
        };
        assert_eq!(actual, expected);
    }

    #[rstest]
    #[case(NETWORK_PLUGIN_KUBENET, "", false, DEFAULT_KUBERNETES_CLUSTER_SUBNET)]
    #[case(NETWORK_PLUGIN_AZURE, "", false, DEFAULT_KUBERNETES_CLUSTER_SUBNET_AZURE_CNI)]
    #[case(NETWORK_PLUGIN_KUBENET, "", true, "10.244.0.0/16,fc00::/8")]
    #[case(NETWORK_PLUGIN_AZURE, "", true, "10.240.0.0/12,fc00::/8")]
    #[case(NETWORK_PLUGIN_KUBENET, "10.100.0.0/16", true, "10.100.0.0/16,fc00::/8")]
    #[case(NETWORK_PLUGIN_KUBENET, "fd00::/8", true, "10.244.0.0/16,fd00::/8")]
    #[case(NETWORK_PLUGIN_KUBENET, "10.100.0.0/16", false, "10.100.0.0/16")]
    fn cluster_subnet(
        #[case] plugin: &str,
        #[case] subnet: &str,
        #[case] dual_stack: bool,
        #[case] expected: &str,
    ) {
        let mut properties = properties();
        properties.feature_flags = Some(FeatureFlags {
            enable_ipv6_dual_stack: dual_stack,
        });
        let config = &mut properties.orchestrator_profile.kubernetes_config;
        plugin.clone_into(&mut config.network_plugin);
        subnet.clone_into(&mut config.cluster_subnet);
        set_address_defaults(&mut properties);

        assert_eq!(properties.kubernetes_config().cluster_subnet, expected);
    }

    #[test]
    fn dual_stack_uses_narrow_ipv6_range_from_1_17() {
        let mut properties = properties();
        "1.17.3".clone_into(&mut properties.orchestrator_profile.orchestrator_version);
        properties.feature_flags = Some(FeatureFlags {
            enable_ipv6_dual_stack: true,
        });
        set_address_defaults(&mut properties);

        assert_eq!(properties.kubernetes_config().cluster_subnet, "10.244.0.0/16,fc00::/48");
    }

    #[rstest]
    #[case("1.13.12", CLOUD_PROVIDER_BACKOFF_MODE_V1, false)]
    #[case("1.14.0", CLOUD_PROVIDER_BACKOFF_MODE_V2, true)]
    fn cloud_provider_backoff(#[case] version: &str, #[case] mode: &str, #[case] backoff: bool) {
        let mut properties = properties();
        version.clone_into(&mut properties.orchestrator_profile.orchestrator_version);
        set_cloud_provider_defaults(&mut properties);

        let config = properties.kubernetes_config();
        assert_eq!(config.cloud_provider_backoff_mode, mode);
        assert_eq!(config.cloud_provider_backoff, Some(backoff));
    }

    #[rstest]
    #[case(3, false, DEFAULT_ETCD_DISK_SIZE)]
    #[case(4, false, DEFAULT_ETCD_DISK_SIZE_GT_3_NODES)]
    #[case(11, false, DEFAULT_ETCD_DISK_SIZE_GT_10_NODES)]
    #[case(11, true, MAX_AZURE_STACK_MANAGED_DISK_SIZE)]
    #[case(21, false, DEFAULT_ETCD_DISK_SIZE_GT_20_NODES)]
    #[case(21, true, MAX_AZURE_STACK_MANAGED_DISK_SIZE)]
    fn etcd_disk_size(#[case] nodes: u32, #[case] custom_cloud: bool, #[case] expected: &str) {
        let mut properties = Properties {
            master_profile: Some(MasterProfile {
                count: nodes,
                ..MasterProfile::default()
            }),
            ..Properties::default()
        };
        if custom_cloud {
            properties.custom_cloud_profile = Some(Default::default());
        }
        set_cloud_provider_defaults(&mut properties);

        assert_eq!(properties.kubernetes_config().etcd_disk_size_gb, expected);
    }

    #[rstest]
    #[case("1.15.0", true, false, Some(true))]
    #[case("1.14.8", true, false, Some(false))]
    #[case("1.15.0", false, false, Some(false))]
    #[case("1.15.0", true, true, Some(false))]
    fn rbac_on_upgrade(
        #[case] version: &str,
        #[case] is_upgrade: bool,
        #[case] hosted: bool,
        #[case] expected: Option<bool>,
    ) {
        let mut properties = properties();
        version.clone_into(&mut properties.orchestrator_profile.orchestrator_version);
        properties.orchestrator_profile.kubernetes_config.enable_rbac = Some(false);
        properties.orchestrator_profile.kubernetes_config.enable_aggregated_apis = Some(true);
        if hosted {
            properties.hosted_master_profile = Some(HostedMasterProfile::default());
        }
        let params = DefaultsParams {
            is_upgrade,
            ..DefaultsParams::default()
        };
        set_security_defaults(&mut properties, &params);

        let config = properties.kubernetes_config();
        assert_eq!(config.enable_rbac, expected);
        let aggregated = if expected == Some(true) || !is_upgrade {
            Some(true)
        } else {
            Some(false)
        };
        assert_eq!(config.enable_aggregated_apis, aggregated);
    }

    #[rstest]
    #[case(NETWORK_PLUGIN_KUBENET, AvailabilityProfile::AvailabilitySet, DEFAULT_MASTER_SUBNET, "10.240.255.5", "")]
    #[case(NETWORK_PLUGIN_KUBENET, AvailabilityProfile::VirtualMachineScaleSets, DEFAULT_MASTER_SUBNET, "10.240.0.4", DEFAULT_AGENT_SUBNET_AZURE_CNI_VMSS)]
    #[case(NETWORK_PLUGIN_AZURE, AvailabilityProfile::AvailabilitySet, "10.240.0.0/12", "10.255.255.5", "")]
    #[case(NETWORK_PLUGIN_AZURE, AvailabilityProfile::VirtualMachineScaleSets, DEFAULT_MASTER_SUBNET, "10.240.0.4", DEFAULT_AGENT_SUBNET_AZURE_CNI_VMSS)]
    fn master_subnet_and_static_ip(
        #[case] plugin: &str,
        #[case] availability: AvailabilityProfile,
        #[case] subnet: &str,
        #[case] static_ip: &str,
        #[case] agent_subnet: &str,
    ) {
        let mut properties = properties();
        plugin.clone_into(&mut properties.orchestrator_profile.kubernetes_config.network_plugin);
        if let Some(master) = properties.master_profile.as_mut() {
            master.availability_profile = availability;
        }
        set_address_defaults(&mut properties);
        set_master_network_defaults(&mut properties, false);

        let master = properties.master_profile.as_ref().expect("master profile");
        assert_eq!(master.subnet, subnet);
        assert_eq!(master.first_consecutive_static_ip, static_ip);
        assert_eq!(master.agent_subnet, agent_subnet);
    }

    #[rstest]
    #[case(false, DEFAULT_FIRST_CONSECUTIVE_STATIC_IP)]
    #[case(true, "10.240.100.5")]
    fn static_ip_is_kept_on_upgrade(#[case] is_upgrade: bool, #[case] expected: &str) {
        let mut properties = properties();
        if let Some(master) = properties.master_profile.as_mut() {
            "10.240.100.5".clone_into(&mut master.first_consecutive_static_ip);
        }
        set_master_network_defaults(&mut properties, is_upgrade);

        let master = properties.master_profile.as_ref().expect("master profile");
        assert_eq!(master.first_consecutive_static_ip, expected);
    }

    #[test]
    fn custom_vnet_is_left_alone() {
        let mut properties = properties();
        if let Some(master) = properties.master_profile.as_mut() {
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet/subnets/master"
                .clone_into(&mut master.vnet_subnet_id);
            "10.239.0.0/16".clone_into(&mut master.vnet_cidr);
            "10.239.255.239".clone_into(&mut master.first_consecutive_static_ip);
        }
        set_master_network_defaults(&mut properties, false);
        let master = properties.master_profile.as_ref().expect("master profile");
        assert!(master.subnet.is_empty());
        assert_eq!(master.first_consecutive_static_ip, "10.239.255.239");

        if let Some(master) = properties.master_profile.as_mut() {
            master.availability_profile = AvailabilityProfile::VirtualMachineScaleSets;
        }
        set_master_network_defaults(&mut properties, false);
        let master = properties.master_profile.as_ref().expect("master profile");
        assert_eq!(master.first_consecutive_static_ip, "10.239.0.4");
    }

    #[rstest]
    #[case("10.240.0.0/16", false, "10.240.255.5")]
    #[case("10.240.0.0/12", false, "10.255.255.5")]
    #[case("10.240.0.0/24", false, "10.240.0.5")]
    #[case("10.239.0.0/16", true, "10.239.0.4")]
    #[case("not-a-cidr", false, DEFAULT_FIRST_CONSECUTIVE_STATIC_IP)]
    #[case("fc00::/48", true, DEFAULT_FIRST_CONSECUTIVE_STATIC_IP)]
    fn first_static_ip_of_subnet(#[case] subnet: &str, #[case] vmss: bool, #[case] expected: &str) {
        assert_eq!(first_consecutive_static_ip(subnet, vmss), expected);
    }

    #[rstest]
    #[case("", "", false, false, DISTRO_AKS_UBUNTU_1804)]
    #[case("", "myregistry/hyperkube:v1.16.4", false, false, DISTRO_UBUNTU_1804)]
    #[case(DISTRO_AKS_1604_DEPRECATED, "", false, true, DISTRO_AKS_UBUNTU_1604)]
    #[case(DISTRO_AKS_DOCKER_ENGINE_DEPRECATED, "", false, true, DISTRO_AKS_UBUNTU_1604)]
    #[case(DISTRO_AKS_1804_DEPRECATED, "", false, true, DISTRO_AKS_UBUNTU_1804)]
    #[case(DISTRO_AKS_1804_DEPRECATED, "", false, false, DISTRO_AKS_1804_DEPRECATED)]
    #[case("", "", true, false, DISTRO_UBUNTU_1804)]
    fn distros(
        #[case] distro: &str,
        #[case] hyperkube: &str,
        #[case] german: bool,
        #[case] is_update: bool,
        #[case] expected: &str,
    ) {
        let mut properties = properties_with_windows();
        hyperkube.clone_into(&mut properties.orchestrator_profile.kubernetes_config.custom_hyperkube_image);
        if let Some(master) = properties.master_profile.as_mut() {
            distro.clone_into(&mut master.distro);
        }
        distro.clone_into(&mut properties.agent_pool_profiles[0].distro);
        let registry = EnvironmentRegistry::new();
        let cloud_name = if german {
            AZURE_GERMAN_CLOUD_NAME
        } else {
            AZURE_PUBLIC_CLOUD_NAME
        };
        set_distro_defaults(&mut properties, &registry.spec_or_public(cloud_name), is_update);

        let master = properties.master_profile.as_ref().expect("master profile");
        assert_eq!(master.distro, expected);
        assert_eq!(properties.agent_pool_profiles[0].distro, expected);
        assert!(properties.agent_pool_profiles[1].distro.is_empty());
    }

    #[rstest]
    #[case(NETWORK_PLUGIN_AZURE, 31)]
    #[case(NETWORK_PLUGIN_KUBENET, 1)]
    fn ip_address_counts(#[case] plugin: &str, #[case] expected: u32) {
        let mut properties = properties();
        plugin.clone_into(&mut properties.orchestrator_profile.kubernetes_config.network_plugin);
        if let Some(master) = properties.master_profile.as_mut() {
            master.kubelet_config = flag_map([(MAX_PODS_FLAG, "30")]);
        }
        properties.agent_pool_profiles[0].kubelet_config = flag_map([(MAX_PODS_FLAG, "30")]);
        properties.agent_pool_profiles.push(AgentPoolProfile {
            name: "preset".to_owned(),
            ip_address_count: 7,
            ..AgentPoolProfile::default()
        });
        set_ip_address_counts(&mut properties);

        let master = properties.master_profile.as_ref().expect("master profile");
        assert_eq!(master.ip_address_count, expected);
        assert_eq!(properties.agent_pool_profiles[0].ip_address_count, expected);
        assert_eq!(properties.agent_pool_profiles[1].ip_address_count, 7);
    }

    #[test]
    fn upgrade_moves_gcr_clusters_and_old_runtimes() {
        let mut properties = properties();
        let config = &mut properties.orchestrator_profile.kubernetes_config;
        "k8s.gcr.io/".clone_into(&mut config.kubernetes_image_base);
        config.image_base_flavor = Some(ImageBaseFlavor::Gcr);
        "3.2.26".clone_into(&mut config.etcd_version);
        "3.0.8".clone_into(&mut config.moby_version);
        resolve(&mut properties, &upgrade());

        let config = properties.kubernetes_config();
        assert_eq!(config.kubernetes_image_base, "mcr.microsoft.com/k8s/core/");
        assert_eq!(config.etcd_version, DEFAULT_ETCD_VERSION);
        assert_eq!(config.moby_version, DEFAULT_MOBY_VERSION);
    }
}
