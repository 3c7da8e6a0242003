use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::{AddonSpec, ComponentSpec, EnabledState, find_addon, is_zero};
use crate::{constants::*, flag_map::FlagMap};

/// Which registry layout the catalog image references are relative to.
#[derive(Clone, Copy, Debug, Default, Deserialize, Display, EnumString, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImageBaseFlavor {
    /// Upstream style registry, images live directly below the base.
    #[default]
    Gcr,

    /// Microsoft container registry mirror, core images live below
    /// `oss/kubernetes/`.
    Mcr,
}

/// Kubernetes specific part of the orchestrator profile.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KubernetesConfig {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kubernetes_image_base: String,

    #[serde(rename = "kubernetesImageBaseType", skip_serializing_if = "Option::is_none")]
    pub image_base_flavor: Option<ImageBaseFlavor>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub mcr_kubernetes_image_base: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub custom_hyperkube_image: String,

    #[serde(rename = "customKubeAPIServerImage", skip_serializing_if = "String::is_empty")]
    pub custom_kube_apiserver_image: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub custom_kube_controller_manager_image: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub custom_kube_scheduler_image: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub custom_ccm_image: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub network_plugin: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub network_policy: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_subnet: String,

    #[serde(rename = "serviceCidr", skip_serializing_if = "String::is_empty")]
    pub service_cidr: String,

    #[serde(rename = "dnsServiceIP", skip_serializing_if = "String::is_empty")]
    pub dns_service_ip: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub docker_bridge_subnet: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_rbac: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_secure_kubelet: Option<bool>,

    #[serde(rename = "enableAggregatedAPIs", skip_serializing_if = "Option::is_none")]
    pub enable_aggregated_apis: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_data_encryption_at_rest: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_cloud_controller_manager: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_instance_metadata: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_provider_backoff: Option<bool>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub cloud_provider_backoff_mode: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_provider_rate_limit: Option<bool>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub load_balancer_sku: String,

    #[serde(
        rename = "excludeMasterFromStandardLB",
        skip_serializing_if = "Option::is_none"
    )]
    pub exclude_master_from_standard_lb: Option<bool>,

    #[serde(skip_serializing_if = "is_zero")]
    pub maximum_load_balancer_rule_count: u32,

    #[serde(skip_serializing_if = "is_zero")]
    pub outbound_rule_idle_timeout_in_minutes: u32,

    #[serde(rename = "kubeProxyMode", skip_serializing_if = "String::is_empty")]
    pub proxy_mode: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub etcd_version: String,

    #[serde(rename = "etcdDiskSizeGB", skip_serializing_if = "String::is_empty")]
    pub etcd_disk_size_gb: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub container_runtime: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub moby_version: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub containerd_version: String,

    #[serde(rename = "gchighthreshold", skip_serializing_if = "is_zero")]
    pub gc_high_threshold: u32,

    #[serde(rename = "gclowthreshold", skip_serializing_if = "is_zero")]
    pub gc_low_threshold: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub addons: Option<Vec<AddonSpec>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<ComponentSpec>>,

    #[serde(skip_serializing_if = "FlagMap::is_empty")]
    pub kubelet_config: FlagMap,

    #[serde(skip_serializing_if = "FlagMap::is_empty")]
    pub controller_manager_config: FlagMap,

    #[serde(skip_serializing_if = "FlagMap::is_empty")]
    pub cloud_controller_manager_config: FlagMap,

    #[serde(rename = "apiServerConfig", skip_serializing_if = "FlagMap::is_empty")]
    pub apiserver_config: FlagMap,

    #[serde(skip_serializing_if = "FlagMap::is_empty")]
    pub scheduler_config: FlagMap,

    #[serde(skip_serializing_if = "FlagMap::is_empty")]
    pub pod_security_policy_config: FlagMap,
}

impl KubernetesConfig {
    pub fn image_base_flavor(&self) -> ImageBaseFlavor {
        self.image_base_flavor.unwrap_or_default()
    }

    pub fn is_rbac_enabled(&self) -> bool {
        self.enable_rbac.unwrap_or(false)
    }

    pub fn is_secure_kubelet_enabled(&self) -> bool {
        self.enable_secure_kubelet.unwrap_or(false)
    }

    pub fn is_aggregated_apis_enabled(&self) -> bool {
        self.enable_aggregated_apis.unwrap_or(false)
    }

    pub fn is_data_encryption_at_rest_enabled(&self) -> bool {
        self.enable_data_encryption_at_rest.unwrap_or(false)
    }

    pub fn uses_cloud_controller_manager(&self) -> bool {
        self.use_cloud_controller_manager.unwrap_or(false)
    }

    pub fn is_azure_cni(&self) -> bool {
        self.network_plugin == NETWORK_PLUGIN_AZURE
    }

    pub fn is_containerd(&self) -> bool {
        self.container_runtime == CONTAINERD
    }

    /// Whether an addon is enabled, resolving an unset state to the catalog
    /// default `default_enabled`.
    pub fn is_addon_enabled(&self, name: &str, default_enabled: bool) -> bool {
        self.addons
            .as_deref()
            .and_then(|addons| find_addon(addons, name))
            .map_or(default_enabled, |addon| addon.enabled.resolve(default_enabled))
    }

    /// Whether an addon is explicitly enabled by the user.
    pub fn is_addon_explicitly_enabled(&self, name: &str) -> bool {
        self.addons
            .as_deref()
            .and_then(|addons| find_addon(addons, name))
            .is_some_and(|addon| addon.enabled == EnabledState::Enabled)
    }

    pub fn addon(&self, name: &str) -> Option<&AddonSpec> {
        self.addons
            .as_deref()
            .and_then(|addons| find_addon(addons, name))
    }

    /// The non-masquerade CIDR passed to kubelet and the ip-masq-agent.
    pub fn non_masquerade_cidr(&self, vnet_cidr: &str) -> String {
        if self.is_azure_cni() {
            if vnet_cidr.is_empty() {
                DEFAULT_VNET_CIDR.to_owned()
            } else {
                vnet_cidr.to_owned()
            }
        } else {
            self.cluster_subnet.clone()
        }
    }

    /// The `-azs` style suffix appended to core images on custom clouds.
    pub fn image_suffix(is_custom_cloud: bool) -> &'static str {
        if is_custom_cloud { AZURE_STACK_SUFFIX } else { "" }
    }
}
