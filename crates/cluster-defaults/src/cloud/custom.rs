//! Resolution of custom cloud profiles (Azure Stack Hub).
//!
//! A custom cloud is described either by a complete environment or by a
//! portal URL, from which the environment is derived with the help of the
//! cloud's metadata endpoint. The resolved cloud spec is stored into the
//! [`EnvironmentRegistry`] under `AzureStackCloud`.
use snafu::{ResultExt, Snafu, ensure};
use tracing::{debug, info, instrument};

use super::{
    EnvironmentRegistry,
    metadata::{self, MetadataSource},
    public_cloud_spec,
};
use crate::{
    constants::{
        AD_FS_IDENTITY_SYSTEM, AZURE_AD_IDENTITY_SYSTEM, AZURE_STACK_CLOUD_NAME,
        CLIENT_SECRET_AUTH_METHOD,
    },
    model::{CloudEnvironment, CustomCloudProfile, EnvironmentSpec, KubernetesSpecConfig},
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display(
        "portal URL {portal_url:?} does not match the expected https://portal.{location}.<domain> form"
    ))]
    InvalidPortalUrl {
        portal_url: String,
        location: String,
    },

    #[snafu(display("failed to retrieve the metadata endpoints of the custom cloud"))]
    RetrieveMetadata { source: metadata::Error },
}

/// Resolves the custom cloud profile in place and registers the resulting
/// `AzureStackCloud` spec.
///
/// The environment is only derived from the portal URL if it isn't complete
/// yet, so resolving an already resolved profile doesn't hit the network.
#[instrument(name = "resolve_custom_cloud_profile", skip_all, fields(location = %location))]
pub fn resolve_custom_cloud_profile(
    profile: &mut CustomCloudProfile,
    location: &str,
    registry: &mut EnvironmentRegistry,
    metadata_source: &impl MetadataSource,
) -> Result<()> {
    if profile.authentication_method.is_empty() {
        profile.authentication_method = CLIENT_SECRET_AUTH_METHOD.to_owned();
    }
    if profile.identity_system.is_empty() {
        profile.identity_system = AZURE_AD_IDENTITY_SYSTEM.to_owned();
    }

    let needs_environment = profile
        .environment
        .as_ref()
        .is_none_or(|environment| environment.resource_manager_endpoint.is_empty());

    if needs_environment && !profile.portal_url.is_empty() {
        let environment = derive_environment(
            &profile.portal_url,
            location,
            &profile.identity_system,
            metadata_source,
        )?;
        info!(
            cloud.resource_manager_endpoint = %environment.resource_manager_endpoint,
            "derived custom cloud environment from portal URL"
        );
        profile.environment = Some(environment);
    }

    let vm_dns_suffix = profile
        .environment
        .as_ref()
        .map(|environment| environment.resource_manager_vm_dns_suffix.clone())
        .unwrap_or_default();

    let spec = azure_stack_cloud_spec(vm_dns_suffix, profile.azure_environment_spec_config.as_ref());
    debug!(
        cloud.name = %spec.cloud_name,
        cloud.vm_dns_suffix = %spec.endpoint_config.resource_manager_vm_dns_suffix,
        "registering custom cloud spec"
    );

    profile.azure_environment_spec_config = Some(spec.clone());
    registry.insert(spec);

    Ok(())
}

/// Derives the environment of a custom cloud from its portal URL.
///
/// For `https://portal.{location}.{domain}/` the resource manager lives at
/// `https://management.{location}.{domain}/`; the remaining endpoints are
/// taken from the metadata endpoint of the resource manager.
pub fn derive_environment(
    portal_url: &str,
    location: &str,
    identity_system: &str,
    metadata_source: &impl MetadataSource,
) -> Result<CloudEnvironment> {
    let management_portal_url = if portal_url.ends_with('/') {
        portal_url.to_owned()
    } else {
        format!("{portal_url}/")
    };

    let prefix = format!("https://portal.{location}.");
    let domain = management_portal_url
        .strip_prefix(&prefix)
        .map(|rest| rest.trim_end_matches('/').to_owned())
        .unwrap_or_default();

    ensure!(
        !location.is_empty() && !domain.is_empty(),
        InvalidPortalUrlSnafu {
            portal_url,
            location
        }
    );

    let resource_manager_endpoint = format!("https://management.{location}.{domain}/");
    let endpoints = metadata_source
        .metadata_endpoints(&resource_manager_endpoint)
        .context(RetrieveMetadataSnafu)?;

    // ADFS publishes its login endpoint including the trailing `adfs` segment
    let active_directory_endpoint = match endpoints.login_endpoint.strip_suffix("adfs") {
        Some(stripped) if identity_system == AD_FS_IDENTITY_SYSTEM => stripped.to_owned(),
        _ => endpoints.login_endpoint.clone(),
    };

    Ok(CloudEnvironment {
        name: AZURE_STACK_CLOUD_NAME.to_owned(),
        management_portal_url,
        service_management_endpoint: endpoints.audience,
        resource_manager_endpoint,
        active_directory_endpoint,
        gallery_endpoint: endpoints.gallery_endpoint,
        graph_endpoint: endpoints.graph_endpoint,
        storage_endpoint_suffix: format!("{location}.{domain}"),
        key_vault_dns_suffix: format!("vault.{location}.{domain}"),
        resource_manager_vm_dns_suffix: format!("cloudapp.{domain}"),
    })
}

/// Starts from the public cloud spec, renamed to `AzureStackCloud`, and
/// applies every non-empty field of `overrides` on top. The name itself is
/// never overridden.
fn azure_stack_cloud_spec(vm_dns_suffix: String, overrides: Option<&EnvironmentSpec>) -> EnvironmentSpec {
    let mut spec = public_cloud_spec();
    spec.cloud_name = AZURE_STACK_CLOUD_NAME.to_owned();
    spec.endpoint_config.resource_manager_vm_dns_suffix = vm_dns_suffix;

    if let Some(overrides) = overrides {
        ensure_string(
            &mut spec.endpoint_config.resource_manager_vm_dns_suffix,
            &overrides.endpoint_config.resource_manager_vm_dns_suffix,
        );

        let KubernetesSpecConfig {
            kubernetes_image_base,
            tiller_image_base,
            aci_connector_image_base,
            mcr_kubernetes_image_base,
            nvidia_image_base,
            azure_cni_image_base,
            calico_image_base,
        } = &overrides.kubernetes_spec_config;
        let images = &mut spec.kubernetes_spec_config;

        ensure_string(&mut images.kubernetes_image_base, kubernetes_image_base);
        ensure_string(&mut images.tiller_image_base, tiller_image_base);
        ensure_string(&mut images.aci_connector_image_base, aci_connector_image_base);
        ensure_string(&mut images.mcr_kubernetes_image_base, mcr_kubernetes_image_base);
        ensure_string(&mut images.nvidia_image_base, nvidia_image_base);
        ensure_string(&mut images.azure_cni_image_base, azure_cni_image_base);
        ensure_string(&mut images.calico_image_base, calico_image_base);
    }

    spec
}

fn ensure_string(target: &mut String, value: &str) {
    if !value.is_empty() {
        value.clone_into(target);
    }
}
