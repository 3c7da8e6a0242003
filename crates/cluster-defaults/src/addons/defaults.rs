use base64::{Engine, engine::general_purpose::STANDARD};

use crate::{
    catalog::{self, ComponentImages},
    constants::*,
    model::{AddonPoolSpec, AddonSpec, ContainerSpec, EnvironmentSpec, Properties},
    version::{is_version_ge, is_version_lt},
};

const DEFAULT_CLUSTER_NAME: &str = "aks-engine-cluster";
const OMS_AGENT_IMAGE: &str = "mcr.microsoft.com/azuremonitor/containerinsights/ciprod:ciprod10182019";
const OMS_AGENT_IMAGE_CHINA: &str = "dockerhub.azk8s.cn/microsoft/oms:ciprod10182019";
const CSI_PROVISIONER_IMAGE: &str = "quay.io/k8scsi/csi-provisioner:v1.0.1";
const CSI_ATTACHER_IMAGE: &str = "quay.io/k8scsi/csi-attacher:v1.0.1";
const CSI_CLUSTER_DRIVER_REGISTRAR_IMAGE: &str = "quay.io/k8scsi/csi-cluster-driver-registrar:v1.0.1";
const CSI_LIVENESS_PROBE_IMAGE: &str = "quay.io/k8scsi/livenessprobe:v1.1.0";
const CSI_NODE_DRIVER_REGISTRAR_IMAGE: &str = "quay.io/k8scsi/csi-node-driver-registrar:v1.1.0";
const AZURE_DISK_CSI_IMAGE: &str = "mcr.microsoft.com/k8s/csi/azuredisk-csi:v0.4.0";
const AZURE_FILE_CSI_IMAGE: &str = "mcr.microsoft.com/k8s/csi/azurefile-csi:v0.3.0";

/// Everything the addon catalog depends on.
#[derive(Clone, Copy, Debug)]
pub struct AddonContext<'a> {
    pub properties: &'a Properties,

    /// Spec of the cloud the cluster is deployed into.
    pub cloud: &'a EnvironmentSpec,

    /// Version catalog of the cluster, if its version is supported.
    pub images: Option<&'a ComponentImages>,
}

impl AddonContext<'_> {
    fn version(&self) -> &str {
        self.properties.orchestrator_version()
    }

    fn catalog_image(&self, key: &str) -> &str {
        catalog::image(self.images, key)
    }

    /// A catalog image below the cloud's Kubernetes image base.
    fn kubernetes_image(&self, key: &str) -> String {
        format!(
            "{}{}",
            self.cloud.kubernetes_spec_config.kubernetes_image_base,
            self.catalog_image(key)
        )
    }
}

/// Domain of the Log Analytics workspace used by container monitoring.
pub fn log_analytics_workspace_domain(cloud_name: &str) -> &'static str {
    match cloud_name {
        AZURE_CHINA_CLOUD_NAME => "opinsights.azure.cn",
        AZURE_US_GOVERNMENT_CLOUD_NAME => "opinsights.azure.us",
        _ => "opinsights.azure.com",
    }
}

/// Builds the addon catalog of the cluster, in its fixed order.
pub fn default_addons(ctx: &AddonContext<'_>) -> Vec<AddonSpec> {
    let properties = ctx.properties;
    let config = properties.kubernetes_config();
    let specs = &ctx.cloud.kubernetes_spec_config;
    let version = ctx.version();
    let is_custom_cloud = properties.is_custom_cloud();
    let has_coreos = properties.has_coreos();
    let uses_ccm = config.uses_cloud_controller_manager();

    vec![
        AddonSpec::new(HEAPSTER_ADDON_NAME, false).with_containers(vec![
            ContainerSpec::new(HEAPSTER_ADDON_NAME, ctx.kubernetes_image(HEAPSTER_ADDON_NAME))
                .with_resources("88m", "204Mi", "88m", "204Mi"),
            ContainerSpec::new("heapster-nanny", ctx.kubernetes_image(catalog::ADDON_RESIZER_KEY))
                .with_resources("88m", "204Mi", "88m", "204Mi"),
        ]),
        AddonSpec::new(TILLER_ADDON_NAME, false)
            .with_containers(vec![
                ContainerSpec::new(
                    TILLER_ADDON_NAME,
                    format!("{}{}", specs.tiller_image_base, ctx.catalog_image(TILLER_ADDON_NAME)),
                )
                .with_resources("50m", "150Mi", "50m", "150Mi"),
            ])
            .with_config([("max-history", "0")]),
        AddonSpec::new(ACI_CONNECTOR_ADDON_NAME, false)
            .with_containers(vec![
                ContainerSpec::new(
                    ACI_CONNECTOR_ADDON_NAME,
                    format!(
                        "{}{}",
                        specs.aci_connector_image_base,
                        ctx.catalog_image(ACI_CONNECTOR_ADDON_NAME)
                    ),
                )
                .with_resources("50m", "150Mi", "50m", "150Mi"),
            ])
            .with_config([
                ("region", "westus"),
                ("nodeName", "aci-connector"),
                ("os", "Linux"),
                ("taint", "azure.com/aci"),
            ]),
        cluster_autoscaler(ctx),
        AddonSpec::new(
            BLOBFUSE_FLEXVOLUME_ADDON_NAME,
            is_version_ge(version, "1.8.0") && !has_coreos && !is_custom_cloud,
        )
        .with_containers(vec![
            ContainerSpec::new(
                BLOBFUSE_FLEXVOLUME_ADDON_NAME,
                ctx.catalog_image(BLOBFUSE_FLEXVOLUME_ADDON_NAME),
            )
            .with_resources("50m", "100Mi", "50m", "100Mi"),
        ]),
        AddonSpec::new(SMB_FLEXVOLUME_ADDON_NAME, false).with_containers(vec![
            ContainerSpec::new(SMB_FLEXVOLUME_ADDON_NAME, ctx.catalog_image(SMB_FLEXVOLUME_ADDON_NAME))
                .with_resources("50m", "100Mi", "50m", "100Mi"),
        ]),
        AddonSpec::new(KEYVAULT_FLEXVOLUME_ADDON_NAME, !has_coreos && !is_custom_cloud)
            .with_containers(vec![
                ContainerSpec::new(
                    KEYVAULT_FLEXVOLUME_ADDON_NAME,
                    ctx.catalog_image(KEYVAULT_FLEXVOLUME_ADDON_NAME),
                )
                .with_resources("50m", "100Mi", "50m", "100Mi"),
            ]),
        AddonSpec::new(DASHBOARD_ADDON_NAME, false).with_containers(vec![
            ContainerSpec::new(DASHBOARD_ADDON_NAME, ctx.kubernetes_image(DASHBOARD_ADDON_NAME))
                .with_resources("300m", "150Mi", "300m", "150Mi"),
        ]),
        AddonSpec::new(RESCHEDULER_ADDON_NAME, false).with_containers(vec![
            ContainerSpec::new(RESCHEDULER_ADDON_NAME, ctx.kubernetes_image(RESCHEDULER_ADDON_NAME))
                .with_resources("10m", "100Mi", "10m", "100Mi"),
        ]),
        AddonSpec::new(METRICS_SERVER_ADDON_NAME, is_version_ge(version, "1.9.0")).with_containers(
            vec![ContainerSpec::new(
                METRICS_SERVER_ADDON_NAME,
                ctx.kubernetes_image(METRICS_SERVER_ADDON_NAME),
            )],
        ),
        AddonSpec::new(
            NVIDIA_DEVICE_PLUGIN_ADDON_NAME,
            properties.has_n_series_sku()
                && is_version_ge(version, "1.10.0")
                && !has_coreos
                && !is_custom_cloud,
        )
        .with_containers(vec![
            ContainerSpec::new(
                NVIDIA_DEVICE_PLUGIN_ADDON_NAME,
                format!(
                    "{}{}",
                    specs.nvidia_image_base,
                    ctx.catalog_image(NVIDIA_DEVICE_PLUGIN_ADDON_NAME)
                ),
            )
            .with_resources("50m", "100Mi", "50m", "100Mi"),
        ]),
        container_monitoring(ctx),
        AddonSpec::new(
            AZURE_CNI_NETWORK_MONITOR_ADDON_NAME,
            config.is_azure_cni() && config.network_policy != NETWORK_POLICY_CALICO,
        )
        .with_containers(vec![ContainerSpec::new(
            AZURE_CNI_NETWORK_MONITOR_ADDON_NAME,
            format!(
                "{}{}",
                specs.azure_cni_image_base,
                ctx.catalog_image(AZURE_CNI_NETWORK_MONITOR_ADDON_NAME)
            ),
        )]),
        azure_network_policy(ctx),
        AddonSpec::new(
            CLOUD_NODE_MANAGER_ADDON_NAME,
            is_version_ge(version, "1.16.0") && uses_ccm,
        )
        .with_containers(vec![ContainerSpec::new(
            CLOUD_NODE_MANAGER_ADDON_NAME,
            format!(
                "{}{}",
                specs.mcr_kubernetes_image_base,
                ctx.catalog_image(CLOUD_NODE_MANAGER_ADDON_NAME)
            ),
        )]),
        ip_masq_agent(ctx),
        AddonSpec::new(DNS_AUTOSCALER_ADDON_NAME, false).with_containers(vec![
            ContainerSpec::new(DNS_AUTOSCALER_ADDON_NAME, ctx.kubernetes_image(DNS_AUTOSCALER_ADDON_NAME))
                .with_resources("20m", "100Mi", "", ""),
        ]),
        AddonSpec::new(CALICO_ADDON_NAME, config.network_policy == NETWORK_POLICY_CALICO)
            .with_containers(vec![
                ContainerSpec::new(
                    catalog::CALICO_TYPHA_KEY,
                    format!("{}{}", specs.calico_image_base, ctx.catalog_image(catalog::CALICO_TYPHA_KEY)),
                ),
                ContainerSpec::new(
                    catalog::CALICO_CNI_KEY,
                    format!("{}{}", specs.calico_image_base, ctx.catalog_image(catalog::CALICO_CNI_KEY)),
                ),
                ContainerSpec::new(
                    catalog::CALICO_NODE_KEY,
                    format!("{}{}", specs.calico_image_base, ctx.catalog_image(catalog::CALICO_NODE_KEY)),
                ),
                ContainerSpec::new(
                    catalog::CALICO_POD2DAEMON_KEY,
                    format!(
                        "{}{}",
                        specs.calico_image_base,
                        ctx.catalog_image(catalog::CALICO_POD2DAEMON_KEY)
                    ),
                ),
                ContainerSpec::new(
                    catalog::CALICO_AUTOSCALER_KEY,
                    ctx.kubernetes_image(catalog::CALICO_AUTOSCALER_KEY),
                ),
            ]),
        AddonSpec::new(AAD_POD_IDENTITY_ADDON_NAME, false).with_containers(vec![
            ContainerSpec::new(NMI_CONTAINER_NAME, ctx.catalog_image(NMI_CONTAINER_NAME))
                .with_resources("100m", "300Mi", "100m", "300Mi"),
            ContainerSpec::new(MIC_CONTAINER_NAME, ctx.catalog_image(MIC_CONTAINER_NAME))
                .with_resources("100m", "300Mi", "100m", "300Mi"),
        ]),
        AddonSpec::new(APP_GATEWAY_INGRESS_ADDON_NAME, false).with_config([
            ("appgw-subnet", ""),
            ("appgw-sku", "WAF_v2"),
            ("appgw-private-ip", ""),
        ]),
        csi_driver(
            AZURE_DISK_CSI_DRIVER_ADDON_NAME,
            "azuredisk-csi",
            AZURE_DISK_CSI_IMAGE,
            ctx,
        ),
        csi_driver(
            AZURE_FILE_CSI_DRIVER_ADDON_NAME,
            "azurefile-csi",
            AZURE_FILE_CSI_IMAGE,
            ctx,
        ),
        AddonSpec::new(AZURE_POLICY_ADDON_NAME, false)
            .with_containers(vec![
                ContainerSpec::new(AZURE_POLICY_ADDON_NAME, ctx.catalog_image(AZURE_POLICY_ADDON_NAME))
                    .with_resources("30m", "50Mi", "100m", "200Mi"),
                ContainerSpec::new(GATEKEEPER_CONTAINER_NAME, ctx.catalog_image(GATEKEEPER_CONTAINER_NAME))
                    .with_resources("100m", "256Mi", "100m", "512Mi"),
            ])
            .with_config([("auditInterval", "30"), ("constraintViolationsLimit", "20")]),
    ]
}

fn cluster_autoscaler(ctx: &AddonContext<'_>) -> AddonSpec {
    let version = ctx.version();
    let mut config = vec![
        ("scan-interval", "1m"),
        ("expendable-pods-priority-cutoff", "-10"),
        ("max-autoprovisioned-node-group-count", "15"),
        ("max-empty-bulk-delete", "10"),
        ("max-failing-time", "15m0s"),
        ("max-graceful-termination-sec", "600"),
        ("max-inactivity", "10m0s"),
        ("max-node-provision-time", "15m0s"),
        ("max-nodes-total", "0"),
        ("max-total-unready-percentage", "45"),
        ("memory-total", "0:6400000"),
        ("min-replica-count", "0"),
        ("node-autoprovisioning-enabled", "false"),
        ("ok-total-unready-count", "3"),
        ("scale-down-candidates-pool-min-count", "50"),
        ("scale-down-candidates-pool-ratio", "0.1"),
        ("scale-down-delay-after-add", "10m0s"),
        ("scale-down-delay-after-delete", "1m"),
        ("scale-down-delay-after-failure", "3m0s"),
        ("scale-down-enabled", "true"),
        ("scale-down-non-empty-candidates-count", "30"),
        ("scale-down-unneeded-time", "10m0s"),
        ("scale-down-unready-time", "20m0s"),
        ("scale-down-utilization-threshold", "0.5"),
        ("skip-nodes-with-local-storage", "false"),
        ("skip-nodes-with-system-pods", "true"),
        ("stderrthreshold", "2"),
        ("v", "3"),
        ("write-status-configmap", "true"),
        ("balance-similar-node-groups", "true"),
    ];
    if is_version_ge(version, "1.12.0") {
        config.push(("unremovable-node-recheck-timeout", "5m0s"));
    }
    if is_version_ge(version, "1.13.0") {
        config.extend([
            ("new-pod-scale-up-delay", "0s"),
            ("ignore-daemonsets-utilization", "false"),
            ("ignore-mirror-pods-utilization", "false"),
        ]);
    }

    let mut addon = AddonSpec::new(CLUSTER_AUTOSCALER_ADDON_NAME, false)
        .with_mode(ADDON_MODE_ENSURE_EXISTS)
        .with_containers(vec![
            ContainerSpec::new(
                CLUSTER_AUTOSCALER_ADDON_NAME,
                ctx.kubernetes_image(CLUSTER_AUTOSCALER_ADDON_NAME),
            )
            .with_resources("100m", "300Mi", "100m", "300Mi"),
        ])
        .with_config(config);
    addon.pools = ctx
        .properties
        .agent_pool_profiles
        .iter()
        .map(|pool| pool_bounds(&pool.name, pool.count))
        .collect();
    addon
}

/// Autoscaler bounds pinning a pool at its current size.
pub(super) fn pool_bounds(name: &str, count: u32) -> AddonPoolSpec {
    let count = count.to_string();
    AddonPoolSpec {
        name: name.to_owned(),
        config: [("min-nodes", &count), ("max-nodes", &count)]
            .into_iter()
            .map(|(key, value)| (key.to_owned(), value.clone()))
            .collect(),
    }
}

fn container_monitoring(ctx: &AddonContext<'_>) -> AddonSpec {
    let properties = ctx.properties;
    let cloud_name = ctx.cloud.cloud_name.as_str();

    let cluster_name = match properties.master_profile.as_ref() {
        Some(master) if !master.dns_prefix.is_empty() => master.dns_prefix.as_str(),
        _ => DEFAULT_CLUSTER_NAME,
    };
    let workspace_domain = STANDARD.encode(log_analytics_workspace_domain(cloud_name));
    let image = if cloud_name == AZURE_CHINA_CLOUD_NAME {
        OMS_AGENT_IMAGE_CHINA
    } else {
        OMS_AGENT_IMAGE
    };

    AddonSpec::new(CONTAINER_MONITORING_ADDON_NAME, false)
        .with_config([
            ("omsAgentVersion", "1.10.0.1"),
            ("dockerProviderVersion", "7.0.0-5"),
            ("schema-versions", "v1"),
            ("clusterName", cluster_name),
            ("workspaceDomain", workspace_domain.as_str()),
        ])
        .with_containers(vec![
            ContainerSpec::new("omsagent", image).with_resources("110m", "250Mi", "150m", "600Mi"),
        ])
}

fn azure_network_policy(ctx: &AddonContext<'_>) -> AddonSpec {
    let config = ctx.properties.kubernetes_config();
    let mut containers = vec![ContainerSpec::new(
        AZURE_NETWORK_POLICY_ADDON_NAME,
        ctx.catalog_image(AZURE_NETWORK_POLICY_ADDON_NAME),
    )];
    if is_version_lt(ctx.version(), "1.16.0") {
        containers.push(ContainerSpec::new(
            AZURE_VNET_TELEMETRY_CONTAINER_NAME,
            ctx.catalog_image(AZURE_VNET_TELEMETRY_CONTAINER_NAME),
        ));
    }

    AddonSpec::new(
        AZURE_NETWORK_POLICY_ADDON_NAME,
        config.network_plugin == NETWORK_PLUGIN_AZURE && config.network_policy == NETWORK_POLICY_AZURE,
    )
    .with_containers(containers)
}

fn ip_masq_agent(ctx: &AddonContext<'_>) -> AddonSpec {
    let properties = ctx.properties;
    let config = properties.kubernetes_config();

    let non_masquerade_cidr = if properties.is_hosted_master() {
        String::new()
    } else {
        let vnet_cidr = match properties.master_profile.as_ref() {
            Some(master) if master.is_custom_vnet() => master.vnet_cidr.as_str(),
            _ => "",
        };
        config.non_masquerade_cidr(vnet_cidr)
    };
    let non_masquerade_cni_cidr = if config.is_azure_cni() {
        DEFAULT_NON_MASQUERADE_CNI_CIDR
    } else {
        ""
    };

    AddonSpec::new(
        IP_MASQ_AGENT_ADDON_NAME,
        config.network_plugin != NETWORK_PLUGIN_CILIUM,
    )
    .with_containers(vec![
        ContainerSpec::new(IP_MASQ_AGENT_ADDON_NAME, ctx.kubernetes_image(IP_MASQ_AGENT_ADDON_NAME))
            .with_resources("50m", "50Mi", "50m", "250Mi"),
    ])
    .with_config([
        ("non-masquerade-cidr", non_masquerade_cidr.as_str()),
        ("non-masq-cni-cidr", non_masquerade_cni_cidr),
        ("secondary-non-masquerade-cidr", ""),
        ("enable-ipv6", "false"),
    ])
}

fn csi_driver(name: &str, driver_container: &str, driver_image: &str, ctx: &AddonContext<'_>) -> AddonSpec {
    let config = ctx.properties.kubernetes_config();

    AddonSpec::new(
        name,
        is_version_ge(ctx.version(), "1.13.0") && config.uses_cloud_controller_manager(),
    )
    .with_containers(vec![
        ContainerSpec::new("csi-provisioner", CSI_PROVISIONER_IMAGE),
        ContainerSpec::new("csi-attacher", CSI_ATTACHER_IMAGE),
        ContainerSpec::new("csi-cluster-driver-registrar", CSI_CLUSTER_DRIVER_REGISTRAR_IMAGE),
        ContainerSpec::new("livenessprobe", CSI_LIVENESS_PROBE_IMAGE),
        ContainerSpec::new("csi-node-driver-registrar", CSI_NODE_DRIVER_REGISTRAR_IMAGE),
        ContainerSpec::new(driver_container, driver_image),
    ])
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{
        cloud::{EnvironmentRegistry, public_cloud_spec},
        model::{AgentPoolProfile, CustomCloudProfile, EnabledState, ImageBaseFlavor, MasterProfile},
    };

    fn properties(version: &str) -> Properties {
        let mut properties = Properties {
            master_profile: Some(MasterProfile {
                count: 1,
                dns_prefix: "mycluster".to_owned(),
                ..MasterProfile::default()
            }),
            agent_pool_profiles: vec![AgentPoolProfile {
                name: "agentpool1".to_owned(),
                count: 3,
                ..AgentPoolProfile::default()
            }],
            ..Properties::default()
        };
        properties.orchestrator_profile.orchestrator_version = version.to_owned();
        properties.orchestrator_profile.kubernetes_config.cluster_subnet =
            DEFAULT_KUBERNETES_CLUSTER_SUBNET.to_owned();
        properties
    }

    fn addons_for(properties: &Properties, cloud: &EnvironmentSpec) -> Vec<AddonSpec> {
        let images = catalog::component_images(properties.orchestrator_version(), ImageBaseFlavor::Gcr);
        default_addons(&AddonContext {
            properties,
            cloud,
            images: images.as_ref(),
        })
    }

    fn addon<'a>(addons: &'a [AddonSpec], name: &str) -> &'a AddonSpec {
        addons
            .iter()
            .find(|addon| addon.name == name)
            .expect("addon is part of the catalog")
    }

    #[test]
    fn catalog_order_is_fixed() {
        let addons = addons_for(&properties("1.16.4"), &public_cloud_spec());
        let names: Vec<_> = addons.iter().map(|addon| addon.name.as_str()).collect();

        assert_eq!(names, [
            HEAPSTER_ADDON_NAME,
            TILLER_ADDON_NAME,
            ACI_CONNECTOR_ADDON_NAME,
            CLUSTER_AUTOSCALER_ADDON_NAME,
            BLOBFUSE_FLEXVOLUME_ADDON_NAME,
            SMB_FLEXVOLUME_ADDON_NAME,
            KEYVAULT_FLEXVOLUME_ADDON_NAME,
            DASHBOARD_ADDON_NAME,
            RESCHEDULER_ADDON_NAME,
            METRICS_SERVER_ADDON_NAME,
            NVIDIA_DEVICE_PLUGIN_ADDON_NAME,
            CONTAINER_MONITORING_ADDON_NAME,
            AZURE_CNI_NETWORK_MONITOR_ADDON_NAME,
            AZURE_NETWORK_POLICY_ADDON_NAME,
            CLOUD_NODE_MANAGER_ADDON_NAME,
            IP_MASQ_AGENT_ADDON_NAME,
            DNS_AUTOSCALER_ADDON_NAME,
            CALICO_ADDON_NAME,
            AAD_POD_IDENTITY_ADDON_NAME,
            APP_GATEWAY_INGRESS_ADDON_NAME,
            AZURE_DISK_CSI_DRIVER_ADDON_NAME,
            AZURE_FILE_CSI_DRIVER_ADDON_NAME,
            AZURE_POLICY_ADDON_NAME,
        ]);
    }

    #[rstest]
    #[case("1.9.0", EnabledState::Enabled)]
    #[case("1.8.0", EnabledState::Disabled)]
    fn metrics_server_from_1_9(#[case] version: &str, #[case] expected: EnabledState) {
        let addons = addons_for(&properties(version), &public_cloud_spec());
        assert_eq!(addon(&addons, METRICS_SERVER_ADDON_NAME).enabled, expected);
    }

    #[test]
    fn images_use_cloud_image_bases() {
        let registry = EnvironmentRegistry::new();
        let china = registry.get(AZURE_CHINA_CLOUD_NAME).expect("built-in cloud");
        let addons = addons_for(&properties("1.16.4"), china);

        let tiller = addon(&addons, TILLER_ADDON_NAME)
            .container(TILLER_ADDON_NAME)
            .expect("tiller container");
        assert_eq!(tiller.image, "gcr.azk8s.cn/kubernetes-helm/tiller:v2.13.1");

        let oms = addon(&addons, CONTAINER_MONITORING_ADDON_NAME)
            .container("omsagent")
            .expect("omsagent container");
        assert_eq!(oms.image, OMS_AGENT_IMAGE_CHINA);

        let monitoring = addon(&addons, CONTAINER_MONITORING_ADDON_NAME);
        assert_eq!(monitoring.config["clusterName"], "mycluster");
        assert_eq!(
            monitoring.config["workspaceDomain"],
            STANDARD.encode("opinsights.azure.cn")
        );
    }

    #[test]
    fn unsupported_version_degrades_to_bare_image_bases() {
        let addons = addons_for(&properties("1.5.0"), &public_cloud_spec());
        let dashboard = addon(&addons, DASHBOARD_ADDON_NAME)
            .container(DASHBOARD_ADDON_NAME)
            .expect("dashboard container");

        assert_eq!(dashboard.image, "k8s.gcr.io/");
    }

    #[test]
    fn custom_clouds_disable_flexvolumes() {
        let mut properties = properties("1.16.4");
        let addons = addons_for(&properties, &public_cloud_spec());
        assert_eq!(addon(&addons, BLOBFUSE_FLEXVOLUME_ADDON_NAME).enabled, EnabledState::Enabled);
        assert_eq!(addon(&addons, KEYVAULT_FLEXVOLUME_ADDON_NAME).enabled, EnabledState::Enabled);

        properties.custom_cloud_profile = Some(CustomCloudProfile::default());
        let addons = addons_for(&properties, &public_cloud_spec());
        assert_eq!(addon(&addons, BLOBFUSE_FLEXVOLUME_ADDON_NAME).enabled, EnabledState::Disabled);
        assert_eq!(addon(&addons, KEYVAULT_FLEXVOLUME_ADDON_NAME).enabled, EnabledState::Disabled);
    }

    #[rstest]
    #[case(NETWORK_PLUGIN_AZURE, NETWORK_POLICY_AZURE, true, true, false)]
    #[case(NETWORK_PLUGIN_AZURE, "", true, false, false)]
    #[case(NETWORK_PLUGIN_KUBENET, NETWORK_POLICY_CALICO, false, false, true)]
    #[case(NETWORK_PLUGIN_AZURE, NETWORK_POLICY_CALICO, false, false, true)]
    fn network_addons_follow_plugin_and_policy(
        #[case] plugin: &str,
        #[case] policy: &str,
        #[case] cni_monitor: bool,
        #[case] npm: bool,
        #[case] calico: bool,
    ) {
        let mut properties = properties("1.15.7");
        let config = &mut properties.orchestrator_profile.kubernetes_config;
        plugin.clone_into(&mut config.network_plugin);
        policy.clone_into(&mut config.network_policy);

        let addons = addons_for(&properties, &public_cloud_spec());
        assert_eq!(
            addon(&addons, AZURE_CNI_NETWORK_MONITOR_ADDON_NAME).enabled,
            cni_monitor.into()
        );
        assert_eq!(addon(&addons, AZURE_NETWORK_POLICY_ADDON_NAME).enabled, npm.into());
        assert_eq!(addon(&addons, CALICO_ADDON_NAME).enabled, calico.into());
    }

    #[rstest]
    #[case("1.15.7", 2)]
    #[case("1.16.0", 1)]
    fn npm_telemetry_container_below_1_16(#[case] version: &str, #[case] containers: usize) {
        let addons = addons_for(&properties(version), &public_cloud_spec());
        assert_eq!(addon(&addons, AZURE_NETWORK_POLICY_ADDON_NAME).containers.len(), containers);
    }

    #[test]
    fn ip_masq_agent_config() {
        let mut properties = properties("1.16.4");
        let addons = addons_for(&properties, &public_cloud_spec());
        let ip_masq = addon(&addons, IP_MASQ_AGENT_ADDON_NAME);
        assert_eq!(ip_masq.enabled, EnabledState::Enabled);
        assert_eq!(ip_masq.config["non-masquerade-cidr"], DEFAULT_KUBERNETES_CLUSTER_SUBNET);
        assert_eq!(ip_masq.config["non-masq-cni-cidr"], "");

        NETWORK_PLUGIN_AZURE.clone_into(&mut properties.orchestrator_profile.kubernetes_config.network_plugin);
        let addons = addons_for(&properties, &public_cloud_spec());
        let ip_masq = addon(&addons, IP_MASQ_AGENT_ADDON_NAME);
        assert_eq!(ip_masq.config["non-masquerade-cidr"], DEFAULT_VNET_CIDR);
        assert_eq!(ip_masq.config["non-masq-cni-cidr"], DEFAULT_NON_MASQUERADE_CNI_CIDR);

        NETWORK_PLUGIN_CILIUM.clone_into(&mut properties.orchestrator_profile.kubernetes_config.network_plugin);
        let addons = addons_for(&properties, &public_cloud_spec());
        assert_eq!(addon(&addons, IP_MASQ_AGENT_ADDON_NAME).enabled, EnabledState::Disabled);
    }

    #[test]
    fn cluster_autoscaler_defaults() {
        let addons = addons_for(&properties("1.13.12"), &public_cloud_spec());
        let autoscaler = addon(&addons, CLUSTER_AUTOSCALER_ADDON_NAME);

        assert_eq!(autoscaler.mode, ADDON_MODE_ENSURE_EXISTS);
        assert_eq!(autoscaler.config["unremovable-node-recheck-timeout"], "5m0s");
        assert_eq!(autoscaler.config["new-pod-scale-up-delay"], "0s");
        assert_eq!(autoscaler.pools.len(), 1);
        assert_eq!(autoscaler.pools[0].name, "agentpool1");
        assert_eq!(autoscaler.pools[0].config["max-nodes"], "3");
        assert_eq!(
            autoscaler.containers[0].image,
            "k8s.gcr.io/cluster-autoscaler:v1.13.9"
        );

        let addons = addons_for(&properties("1.11.10"), &public_cloud_spec());
        let autoscaler = addon(&addons, CLUSTER_AUTOSCALER_ADDON_NAME);
        assert!(!autoscaler.config.contains_key("unremovable-node-recheck-timeout"));
    }

    #[rstest]
    #[case("1.16.4", true, true, true)]
    #[case("1.16.4", false, false, false)]
    #[case("1.12.8", true, false, false)]
    fn ccm_dependent_addons(
        #[case] version: &str,
        #[case] uses_ccm: bool,
        #[case] csi: bool,
        #[case] node_manager: bool,
    ) {
        let mut properties = properties(version);
        properties.orchestrator_profile.kubernetes_config.use_cloud_controller_manager = Some(uses_ccm);

        let addons = addons_for(&properties, &public_cloud_spec());
        assert_eq!(addon(&addons, AZURE_DISK_CSI_DRIVER_ADDON_NAME).enabled, csi.into());
        assert_eq!(addon(&addons, AZURE_FILE_CSI_DRIVER_ADDON_NAME).enabled, csi.into());
        assert_eq!(addon(&addons, CLOUD_NODE_MANAGER_ADDON_NAME).enabled, node_manager.into());
    }

    #[test]
    fn nvidia_plugin_needs_gpu_pools() {
        let mut properties = properties("1.16.4");
        let addons = addons_for(&properties, &public_cloud_spec());
        assert_eq!(addon(&addons, NVIDIA_DEVICE_PLUGIN_ADDON_NAME).enabled, EnabledState::Disabled);

        "Standard_NC6".clone_into(&mut properties.agent_pool_profiles[0].vm_size);
        let addons = addons_for(&properties, &public_cloud_spec());
        let nvidia = addon(&addons, NVIDIA_DEVICE_PLUGIN_ADDON_NAME);
        assert_eq!(nvidia.enabled, EnabledState::Enabled);
        assert_eq!(nvidia.containers[0].image, "nvidia/k8s-device-plugin:1.11");
    }
}
