//! The defaulting pipeline.
use snafu::{ResultExt, Snafu};
use tracing::{info, instrument};

use crate::{
    addons::{self, AddonContext, ReconcileOptions},
    catalog::{self, ComponentImages},
    certs::{self, PkiHelper},
    cloud::{
        EnvironmentRegistry,
        custom,
        metadata::{self, HttpMetadataClient, MetadataEndpoints, MetadataSource},
    },
    components::{ComponentContext, reconcile_components},
    constants::DEFAULT_PKI_KEY_SIZE,
    control_plane, kubelet,
    model::{ClusterModel, EnvironmentSpec, Properties},
    orchestrator, sysctld,
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to resolve the custom cloud profile"))]
    ResolveCustomCloud { source: custom::Error },

    #[snafu(display("failed to bootstrap the cluster certificates"))]
    BootstrapCertificates { source: certs::Error },
}

/// Per invocation knobs of [`set_properties_defaults`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DefaultsParams {
    /// The cluster is being upgraded to a new orchestrator version.
    pub is_upgrade: bool,

    /// Agent pools of an existing cluster are being scaled.
    pub is_scale: bool,

    /// Size of newly generated RSA keys in bits, `0` selects
    /// [`DEFAULT_PKI_KEY_SIZE`].
    pub pki_key_size: usize,
}

impl DefaultsParams {
    /// Upgrades and scale operations both act on an existing cluster.
    pub fn is_update(&self) -> bool {
        self.is_upgrade || self.is_scale
    }

    pub fn pki_key_size(&self) -> usize {
        if self.pki_key_size == 0 {
            DEFAULT_PKI_KEY_SIZE
        } else {
            self.pki_key_size
        }
    }
}

/// Only builds an HTTP client once a custom cloud actually needs one.
struct LazyHttpMetadataClient;

impl MetadataSource for LazyHttpMetadataClient {
    fn metadata_endpoints(&self, resource_manager_endpoint: &str) -> metadata::Result<MetadataEndpoints> {
        HttpMetadataClient::new()?.metadata_endpoints(resource_manager_endpoint)
    }
}

/// Fills every unset value of `model` and bootstraps missing certificates.
///
/// Returns whether certificates were generated. Running it again over its
/// own output leaves the model unchanged, unless `params` asks for an
/// upgrade.
pub fn set_properties_defaults(
    model: &mut ClusterModel,
    registry: &mut EnvironmentRegistry,
    pki: &dyn PkiHelper,
    params: DefaultsParams,
) -> Result<bool> {
    set_properties_defaults_with(model, registry, &LazyHttpMetadataClient, pki, params)
}

/// Like [`set_properties_defaults`], looking up the endpoints of custom
/// clouds with `metadata_source`.
#[instrument(
    name = "set_properties_defaults",
    skip_all,
    fields(location = %model.location, is_upgrade = params.is_upgrade, is_scale = params.is_scale)
)]
pub fn set_properties_defaults_with(
    model: &mut ClusterModel,
    registry: &mut EnvironmentRegistry,
    metadata_source: &impl MetadataSource,
    pki: &dyn PkiHelper,
    params: DefaultsParams,
) -> Result<bool> {
    let is_custom_cloud = model.properties.is_custom_cloud();
    if let Some(profile) = model
        .properties
        .custom_cloud_profile
        .as_mut()
        .filter(|_| is_custom_cloud)
    {
        custom::resolve_custom_cloud_profile(profile, &model.location, registry, metadata_source)
            .context(ResolveCustomCloudSnafu)?;
    }

    let cloud = registry.cloud_spec(model);
    orchestrator::set_orchestrator_defaults(&mut model.properties, &cloud, &params);

    let config = model.properties.kubernetes_config();
    let images = catalog::component_images(
        model.properties.orchestrator_version(),
        config.image_base_flavor(),
    );

    set_addons_config(&mut model.properties, &cloud, images.as_ref(), params.is_upgrade);
    set_components_config(&mut model.properties, &cloud, images.as_ref(), params.is_upgrade);
    kubelet::set_kubelet_config(&mut model.properties, images.as_ref(), params.is_upgrade);
    orchestrator::set_ip_address_counts(&mut model.properties);
    control_plane::set_control_plane_config(model);
    sysctld::set_sysctld_config(&mut model.properties);

    let outcome = certs::bootstrap_certificates(model, registry, pki, params.pki_key_size())
        .context(BootstrapCertificatesSnafu)?;
    if outcome.generated {
        info!(
            certs.san_ips = outcome.san_ips.len(),
            "generated missing cluster certificates"
        );
    }

    Ok(outcome.generated)
}

fn set_addons_config(
    properties: &mut Properties,
    cloud: &EnvironmentSpec,
    images: Option<&ComponentImages>,
    is_upgrade: bool,
) {
    let defaults = addons::default_addons(&AddonContext {
        properties,
        cloud,
        images,
    });
    let version = properties.orchestrator_version().to_owned();
    let agent_pools = properties.agent_pool_profiles.clone();
    let config = &mut properties.orchestrator_profile.kubernetes_config;

    if let Some(existing) = config.addons.as_mut().filter(|_| is_upgrade) {
        addons::migrate_cluster_autoscaler_pools(existing, &agent_pools);
    }

    let mut reconciled = addons::reconcile(
        config.addons.as_deref(),
        &defaults,
        ReconcileOptions {
            is_upgrade,
            unset_means_enabled: false,
        },
    );
    if is_upgrade {
        addons::apply_upgrade_compat(&mut reconciled, config, &version, &defaults);
    }
    config.addons = Some(reconciled);
}

fn set_components_config(
    properties: &mut Properties,
    cloud: &EnvironmentSpec,
    images: Option<&ComponentImages>,
    is_upgrade: bool,
) {
    let components = reconcile_components(
        properties.kubernetes_config().components.as_deref(),
        &ComponentContext {
            properties,
            cloud,
            images,
        },
        is_upgrade,
    );
    properties.orchestrator_profile.kubernetes_config.components = Some(components);
}
