//! The cluster model the defaulting pipeline operates on.
//!
//! The model is (de)serialized with camelCase field names. Optional values
//! which are unset are skipped on output, so that a defaulted model survives
//! a serialization round trip unchanged.
use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

mod addon;
mod certificate;
mod cloud;
mod kubernetes_config;
mod profiles;

pub use addon::*;
pub use certificate::*;
pub use cloud::*;
pub use kubernetes_config::*;
pub use profiles::*;

use crate::constants::*;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read cluster model from {path:?}"))]
    ReadModel {
        source: std::io::Error,
        path: std::path::PathBuf,
    },

    #[snafu(display("failed to parse cluster model as JSON"))]
    ParseJson { source: serde_json::Error },

    #[snafu(display("failed to parse cluster model as YAML"))]
    ParseYaml { source: serde_yaml::Error },

    #[snafu(display("failed to serialize cluster model as JSON"))]
    SerializeJson { source: serde_json::Error },

    #[snafu(display("failed to serialize cluster model as YAML"))]
    SerializeYaml { source: serde_yaml::Error },
}

/// A cluster definition: where it lives and what it consists of.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterModel {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub location: String,

    pub properties: Properties,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Properties {
    pub orchestrator_profile: OrchestratorProfile,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_profile: Option<MasterProfile>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosted_master_profile: Option<HostedMasterProfile>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub agent_pool_profiles: Vec<AgentPoolProfile>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_profile: Option<CertificateProfile>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_cloud_profile: Option<CustomCloudProfile>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aad_profile: Option<AadProfile>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_flags: Option<FeatureFlags>,
}

/// Preview features the user opted into.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct FeatureFlags {
    #[serde(rename = "enableIPv6DualStack", skip_serializing_if = "std::ops::Not::not")]
    pub enable_ipv6_dual_stack: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OrchestratorProfile {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub orchestrator_type: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub orchestrator_version: String,

    pub kubernetes_config: KubernetesConfig,
}

impl Properties {
    /// Custom clouds are identified by a custom cloud profile whose
    /// environment name is either unset or `AzureStackCloud`.
    pub fn is_custom_cloud(&self) -> bool {
        self.custom_cloud_profile.as_ref().is_some_and(|profile| {
            profile.environment.as_ref().is_none_or(|environment| {
                environment.name.is_empty()
                    || environment.name.eq_ignore_ascii_case(AZURE_STACK_CLOUD_NAME)
            })
        })
    }

    pub fn is_hosted_master(&self) -> bool {
        self.hosted_master_profile.is_some()
    }

    pub fn master_count(&self) -> u32 {
        self.master_profile.as_ref().map_or(0, |master| master.count)
    }

    /// Number of VMs across the masters and all agent pools.
    pub fn total_nodes(&self) -> u32 {
        self.master_count()
            + self
                .agent_pool_profiles
                .iter()
                .map(|pool| pool.count)
                .sum::<u32>()
    }

    pub fn has_windows_pools(&self) -> bool {
        self.agent_pool_profiles.iter().any(AgentPoolProfile::is_windows)
    }

    pub fn has_linux_pools(&self) -> bool {
        self.agent_pool_profiles.iter().any(|pool| !pool.is_windows())
    }

    pub fn has_n_series_sku(&self) -> bool {
        self.agent_pool_profiles
            .iter()
            .any(AgentPoolProfile::is_n_series_sku)
    }

    pub fn has_coreos(&self) -> bool {
        self.master_profile
            .as_ref()
            .is_some_and(|master| master.distro == DISTRO_COREOS)
            || self
                .agent_pool_profiles
                .iter()
                .any(|pool| pool.distro == DISTRO_COREOS)
    }

    pub fn is_ipv6_dual_stack(&self) -> bool {
        self.feature_flags
            .as_ref()
            .is_some_and(|flags| flags.enable_ipv6_dual_stack)
    }

    pub fn is_azure_cni_dual_stack(&self) -> bool {
        self.kubernetes_config().is_azure_cni() && self.is_ipv6_dual_stack()
    }

    /// Whether pod traffic is routed through an Azure route table, which is
    /// the case unless the network plugin handles routing itself.
    pub fn requires_route_table(&self) -> bool {
        let config = self.kubernetes_config();
        !((config.is_azure_cni() && !self.is_ipv6_dual_stack())
            || config.network_policy == NETWORK_POLICY_CILIUM
            || config.network_plugin == NETWORK_PLUGIN_FLANNEL
            || config.network_plugin == NETWORK_PLUGIN_ANTREA)
    }

    /// The cluster CIDR handed to the controller managers. Dual stack Azure
    /// CNI clusters list the IPv6 range second and use that one.
    pub fn controller_cluster_cidr(&self) -> &str {
        let subnet = self.kubernetes_config().cluster_subnet.as_str();
        if self.is_azure_cni_dual_stack() {
            subnet.split(',').nth(1).unwrap_or(subnet)
        } else {
            subnet
        }
    }

    /// Hosted control planes decide on their own; otherwise only an
    /// explicitly disabled addon counts.
    pub fn is_ip_masq_agent_disabled(&self) -> bool {
        match &self.hosted_master_profile {
            Some(hosted) => !hosted.ip_masq_agent,
            None => self
                .kubernetes_config()
                .addon(IP_MASQ_AGENT_ADDON_NAME)
                .is_some_and(|addon| addon.enabled == EnabledState::Disabled),
        }
    }

    /// DNS prefix of the master profile, or of the hosted control plane.
    pub fn dns_prefix(&self) -> &str {
        match (&self.master_profile, &self.hosted_master_profile) {
            (Some(master), _) => &master.dns_prefix,
            (None, Some(hosted)) => &hosted.dns_prefix,
            (None, None) => "",
        }
    }

    pub fn kubernetes_config(&self) -> &KubernetesConfig {
        &self.orchestrator_profile.kubernetes_config
    }

    pub fn orchestrator_version(&self) -> &str {
        &self.orchestrator_profile.orchestrator_version
    }
}

impl ClusterModel {
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input).context(ParseJsonSnafu)
    }

    pub fn from_yaml(input: &str) -> Result<Self> {
        serde_yaml::from_str(input).context(ParseYamlSnafu)
    }

    /// Reads a model from disk. Files ending in `.yaml` or `.yml` are parsed
    /// as YAML, everything else as JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).context(ReadModelSnafu { path })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml(&contents),
            _ => Self::from_json(&contents),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context(SerializeJsonSnafu)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context(SerializeYamlSnafu)
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
pub(crate) fn is_zero(value: &u32) -> bool {
    *value == 0
}
