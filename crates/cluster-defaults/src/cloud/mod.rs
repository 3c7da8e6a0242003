//! Cloud environments the cluster can be deployed into.
//!
//! The [`EnvironmentRegistry`] holds one [`EnvironmentSpec`] per cloud. It
//! starts out with the four built-in Azure clouds; resolving a custom cloud
//! profile adds the `AzureStackCloud` entry (see [`custom`]).
use std::collections::BTreeMap;

use crate::{
    constants::*,
    model::{ClusterModel, EndpointConfig, EnvironmentSpec, KubernetesSpecConfig, Properties},
};

pub mod custom;
mod locations;
pub mod metadata;

pub use locations::AZURE_LOCATIONS;

const DEFAULT_KUBERNETES_IMAGE_BASE: &str = "k8s.gcr.io/";
const DEFAULT_TILLER_IMAGE_BASE: &str = "gcr.io/kubernetes-helm/";
const DEFAULT_ACI_CONNECTOR_IMAGE_BASE: &str = "microsoft/";
const DEFAULT_NVIDIA_IMAGE_BASE: &str = "nvidia/";
const DEFAULT_CALICO_IMAGE_BASE: &str = "calico/";
const DEFAULT_AZURE_CNI_IMAGE_BASE: &str = "mcr.microsoft.com/containernetworking/";
const DEFAULT_MCR_KUBERNETES_IMAGE_BASE: &str = "mcr.microsoft.com/k8s/core/";

/// Image bases used by every cloud except Azure China.
pub fn default_kubernetes_spec_config() -> KubernetesSpecConfig {
    KubernetesSpecConfig {
        kubernetes_image_base: DEFAULT_KUBERNETES_IMAGE_BASE.to_owned(),
        tiller_image_base: DEFAULT_TILLER_IMAGE_BASE.to_owned(),
        aci_connector_image_base: DEFAULT_ACI_CONNECTOR_IMAGE_BASE.to_owned(),
        mcr_kubernetes_image_base: DEFAULT_MCR_KUBERNETES_IMAGE_BASE.to_owned(),
        nvidia_image_base: DEFAULT_NVIDIA_IMAGE_BASE.to_owned(),
        azure_cni_image_base: DEFAULT_AZURE_CNI_IMAGE_BASE.to_owned(),
        calico_image_base: DEFAULT_CALICO_IMAGE_BASE.to_owned(),
    }
}

fn china_kubernetes_spec_config() -> KubernetesSpecConfig {
    KubernetesSpecConfig {
        kubernetes_image_base: "gcr.azk8s.cn/google_containers/".to_owned(),
        tiller_image_base: "gcr.azk8s.cn/kubernetes-helm/".to_owned(),
        aci_connector_image_base: "dockerhub.azk8s.cn/microsoft/".to_owned(),
        mcr_kubernetes_image_base: DEFAULT_MCR_KUBERNETES_IMAGE_BASE.to_owned(),
        nvidia_image_base: "dockerhub.azk8s.cn/nvidia/".to_owned(),
        azure_cni_image_base: "dockerhub.azk8s.cn/containernetworking/".to_owned(),
        calico_image_base: "dockerhub.azk8s.cn/calico/".to_owned(),
    }
}

fn environment_spec(
    cloud_name: &str,
    kubernetes_spec_config: KubernetesSpecConfig,
    vm_dns_suffix: &str,
) -> EnvironmentSpec {
    EnvironmentSpec {
        cloud_name: cloud_name.to_owned(),
        kubernetes_spec_config,
        endpoint_config: EndpointConfig {
            resource_manager_vm_dns_suffix: vm_dns_suffix.to_owned(),
        },
    }
}

/// The spec of the Azure public cloud, which custom clouds start out from.
pub fn public_cloud_spec() -> EnvironmentSpec {
    environment_spec(
        AZURE_PUBLIC_CLOUD_NAME,
        default_kubernetes_spec_config(),
        "cloudapp.azure.com",
    )
}

/// Cloud specs keyed by cloud name.
///
/// Constructed once per process and handed to the defaulting pipeline, which
/// only writes to it while resolving a custom cloud profile.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EnvironmentRegistry {
    specs: BTreeMap<String, EnvironmentSpec>,
}

impl Default for EnvironmentRegistry {
    fn default() -> Self {
        let specs = [
            public_cloud_spec(),
            environment_spec(
                AZURE_CHINA_CLOUD_NAME,
                china_kubernetes_spec_config(),
                "cloudapp.chinacloudapi.cn",
            ),
            environment_spec(
                AZURE_GERMAN_CLOUD_NAME,
                default_kubernetes_spec_config(),
                "cloudapp.microsoftazure.de",
            ),
            environment_spec(
                AZURE_US_GOVERNMENT_CLOUD_NAME,
                default_kubernetes_spec_config(),
                "cloudapp.usgovcloudapi.net",
            ),
        ]
        .into_iter()
        .map(|spec| (spec.cloud_name.clone(), spec))
        .collect();

        Self { specs }
    }
}

impl EnvironmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, cloud_name: &str) -> Option<&EnvironmentSpec> {
        self.specs.get(cloud_name)
    }

    /// Stores `spec` under its cloud name, replacing any previous entry.
    pub fn insert(&mut self, spec: EnvironmentSpec) {
        self.specs.insert(spec.cloud_name.clone(), spec);
    }

    /// Returns the spec of `cloud_name`, falling back to the public cloud for
    /// unknown names.
    pub fn spec_or_public(&self, cloud_name: &str) -> EnvironmentSpec {
        self.get(cloud_name).cloned().unwrap_or_else(public_cloud_spec)
    }

    /// Returns the spec of the cloud the cluster is deployed into.
    pub fn cloud_spec(&self, model: &ClusterModel) -> EnvironmentSpec {
        self.spec_or_public(&target_env(&model.location, &model.properties))
    }

    /// Builds the production FQDN `{prefix}.{location}.{vm dns suffix}` of
    /// the cloud `location` belongs to.
    pub fn prod_fqdn(&self, prefix: &str, location: &str, properties: &Properties) -> String {
        let spec = self.spec_or_public(&target_env(location, properties));
        format!(
            "{prefix}.{location}.{suffix}",
            suffix = spec.endpoint_config.resource_manager_vm_dns_suffix
        )
    }
}

/// Maps a location to the sovereign cloud it belongs to, or to the public
/// cloud.
pub fn cloud_target_env(location: &str) -> &'static str {
    let location: String = location
        .split_whitespace()
        .collect::<String>()
        .to_lowercase();

    match location.as_str() {
        "chinaeast" | "chinanorth" | "chinaeast2" | "chinanorth2" => AZURE_CHINA_CLOUD_NAME,
        "germanynortheast" | "germanycentral" => AZURE_GERMAN_CLOUD_NAME,
        loc if loc.starts_with("usgov") || loc.starts_with("usdod") => {
            AZURE_US_GOVERNMENT_CLOUD_NAME
        }
        _ => AZURE_PUBLIC_CLOUD_NAME,
    }
}

/// Like [`cloud_target_env`], but custom clouds always target
/// `AzureStackCloud`.
pub fn target_env(location: &str, properties: &Properties) -> String {
    if properties.is_custom_cloud() {
        AZURE_STACK_CLOUD_NAME.to_owned()
    } else {
        cloud_target_env(location).to_owned()
    }
}

/// Locations the API server certificate must be valid in: the cluster's own
/// location on custom clouds, every Azure region otherwise.
pub fn locations(model: &ClusterModel) -> Vec<String> {
    if model.properties.custom_cloud_profile.is_some() {
        vec![model.location.clone()]
    } else {
        AZURE_LOCATIONS.iter().map(|&location| location.to_owned()).collect()
    }
}
