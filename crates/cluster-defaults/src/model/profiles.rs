use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::is_zero;
use crate::{constants::*, flag_map::FlagMap};

/// How the VMs of a master or agent pool are provisioned.
#[derive(Clone, Copy, Debug, Default, Deserialize, Display, EnumString, Eq, PartialEq, Serialize)]
pub enum AvailabilityProfile {
    /// Fixed set of VMs with consecutive static IPs.
    #[default]
    AvailabilitySet,

    /// Scale set, each VM reserving a block of IPs for pod addressing.
    VirtualMachineScaleSets,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, EnumString, Eq, PartialEq, Serialize)]
pub enum OsType {
    #[default]
    Linux,
    Windows,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MasterProfile {
    pub count: u32,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub dns_prefix: String,

    #[serde(rename = "firstConsecutiveStaticIP", skip_serializing_if = "String::is_empty")]
    pub first_consecutive_static_ip: String,

    pub availability_profile: AvailabilityProfile,

    /// IPs reserved per master VM. Only meaningful on scale set masters.
    #[serde(skip_serializing_if = "is_zero")]
    pub ip_address_count: u32,

    #[serde(rename = "vnetSubnetID", skip_serializing_if = "String::is_empty")]
    pub vnet_subnet_id: String,

    #[serde(rename = "vnetCidr", skip_serializing_if = "String::is_empty")]
    pub vnet_cidr: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub subnet: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub agent_subnet: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subject_alt_names: Vec<String>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub distro: String,

    #[serde(skip_serializing_if = "FlagMap::is_empty")]
    pub kubelet_config: FlagMap,

    #[serde(skip_serializing_if = "FlagMap::is_empty")]
    pub sysctld_config: FlagMap,
}

impl MasterProfile {
    pub fn is_custom_vnet(&self) -> bool {
        !self.vnet_subnet_id.is_empty()
    }

    pub fn is_virtual_machine_scale_sets(&self) -> bool {
        self.availability_profile == AvailabilityProfile::VirtualMachineScaleSets
    }

    pub fn is_vhd_distro(&self) -> bool {
        is_vhd_distro(&self.distro)
    }

    pub fn is_ubuntu_1804(&self) -> bool {
        is_ubuntu_1804(&self.distro)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentPoolProfile {
    pub name: String,

    pub count: u32,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub vm_size: String,

    pub os_type: OsType,

    pub availability_profile: AvailabilityProfile,

    /// IPs reserved per VM, the node's own address plus one per pod with
    /// Azure CNI.
    #[serde(skip_serializing_if = "is_zero")]
    pub ip_address_count: u32,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub subnet: String,

    /// Overrides the cluster version for this pool's kubelet flags.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub orchestrator_version: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub distro: String,

    #[serde(skip_serializing_if = "FlagMap::is_empty")]
    pub kubelet_config: FlagMap,

    #[serde(skip_serializing_if = "FlagMap::is_empty")]
    pub sysctld_config: FlagMap,
}

impl AgentPoolProfile {
    pub fn is_windows(&self) -> bool {
        self.os_type == OsType::Windows
    }

    pub fn is_vhd_distro(&self) -> bool {
        is_vhd_distro(&self.distro)
    }

    pub fn is_ubuntu_1804(&self) -> bool {
        !self.is_windows() && is_ubuntu_1804(&self.distro)
    }

    /// N-series VMs carry NVIDIA GPUs.
    pub fn is_n_series_sku(&self) -> bool {
        self.vm_size.contains("Standard_N")
    }
}

/// Control plane managed by the cloud provider; there are no master VMs.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HostedMasterProfile {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dns_prefix: String,

    #[serde(rename = "fqdn", skip_serializing_if = "String::is_empty")]
    pub fqdn: String,

    /// Whether the managed control plane runs the ip-masq-agent.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub ip_masq_agent: bool,
}

/// Azure Active Directory integration of the API server.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct AadProfile {
    #[serde(rename = "clientAppID", skip_serializing_if = "String::is_empty")]
    pub client_app_id: String,

    #[serde(rename = "serverAppID", skip_serializing_if = "String::is_empty")]
    pub server_app_id: String,

    #[serde(rename = "tenantID", skip_serializing_if = "String::is_empty")]
    pub tenant_id: String,

    #[serde(rename = "adminGroupID", skip_serializing_if = "String::is_empty")]
    pub admin_group_id: String,
}

/// Distros shipped as pre-baked VHD images.
pub fn is_vhd_distro(distro: &str) -> bool {
    matches!(distro, DISTRO_AKS_UBUNTU_1604 | DISTRO_AKS_UBUNTU_1804)
}

pub fn is_ubuntu_1804(distro: &str) -> bool {
    matches!(
        distro,
        DISTRO_AKS_UBUNTU_1804 | DISTRO_UBUNTU_1804 | DISTRO_UBUNTU_1804_GEN2
    )
}
