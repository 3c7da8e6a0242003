use serde::{Deserialize, Serialize};

/// Endpoints of a cloud environment, as resolved for custom clouds.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CloudEnvironment {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(rename = "managementPortalURL", skip_serializing_if = "String::is_empty")]
    pub management_portal_url: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub service_management_endpoint: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub resource_manager_endpoint: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub active_directory_endpoint: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub gallery_endpoint: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub graph_endpoint: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub storage_endpoint_suffix: String,

    #[serde(rename = "keyVaultDNSSuffix", skip_serializing_if = "String::is_empty")]
    pub key_vault_dns_suffix: String,

    #[serde(
        rename = "resourceManagerVMDNSSuffix",
        skip_serializing_if = "String::is_empty"
    )]
    pub resource_manager_vm_dns_suffix: String,
}

/// Container image bases of a cloud environment.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KubernetesSpecConfig {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kubernetes_image_base: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub tiller_image_base: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub aci_connector_image_base: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub mcr_kubernetes_image_base: String,

    #[serde(rename = "nvidiaImageBase", skip_serializing_if = "String::is_empty")]
    pub nvidia_image_base: String,

    #[serde(rename = "azureCNIImageBase", skip_serializing_if = "String::is_empty")]
    pub azure_cni_image_base: String,

    #[serde(rename = "CalicoImageBase", skip_serializing_if = "String::is_empty")]
    pub calico_image_base: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EndpointConfig {
    #[serde(
        rename = "resourceManagerVMDNSSuffix",
        skip_serializing_if = "String::is_empty"
    )]
    pub resource_manager_vm_dns_suffix: String,
}

/// Everything the pipeline needs to know about one cloud environment.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnvironmentSpec {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cloud_name: String,

    pub kubernetes_spec_config: KubernetesSpecConfig,

    pub endpoint_config: EndpointConfig,
}

/// Cloud that isn't one of the built-in Azure clouds, e.g. Azure Stack.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomCloudProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<CloudEnvironment>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure_environment_spec_config: Option<EnvironmentSpec>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub identity_system: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub authentication_method: String,

    #[serde(rename = "portalURL", skip_serializing_if = "String::is_empty")]
    pub portal_url: String,
}
