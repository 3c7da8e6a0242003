//! Control plane components and their reconciliation with the user supplied
//! component list.
//!
//! Components follow the addon overlay rules with two short cuts: a disabled
//! component is trimmed to its name and enablement, and a component carrying
//! a raw `data` manifest is trimmed to name, enablement and data.
use tracing::debug;

use crate::{
    addons::{overlay_config, overlay_containers},
    catalog::{self, ComponentImages},
    constants::*,
    model::{ComponentSpec, ContainerSpec, EnabledState, EnvironmentSpec, KubernetesConfig, Properties},
    version::is_version_ge,
};

const COMMAND_CONFIG_KEY: &str = "command";
const HYPERKUBE_COMMAND: &str = "\"/hyperkube\"";

/// Everything the component catalog depends on.
#[derive(Clone, Copy, Debug)]
pub struct ComponentContext<'a> {
    pub properties: &'a Properties,

    /// Spec of the cloud the cluster is deployed into.
    pub cloud: &'a EnvironmentSpec,

    /// Version catalog of the cluster, if its version is supported.
    pub images: Option<&'a ComponentImages>,
}

impl ComponentContext<'_> {
    fn version(&self) -> &str {
        self.properties.orchestrator_version()
    }

    fn uses_hyperkube(&self) -> bool {
        !is_version_ge(self.version(), "1.17.0")
    }

    fn image_base(&self) -> &str {
        let base = &self.properties.kubernetes_config().kubernetes_image_base;
        if base.is_empty() {
            &self.cloud.kubernetes_spec_config.mcr_kubernetes_image_base
        } else {
            base
        }
    }

    /// The image of a core component, before custom images are applied.
    fn default_image(&self, component: &str) -> String {
        let suffix = KubernetesConfig::image_suffix(self.properties.is_custom_cloud());
        let catalog_image = |key: &str| catalog::image(self.images, key);

        match component {
            CLOUD_CONTROLLER_MANAGER_COMPONENT_NAME => {
                let base = if is_version_ge(self.version(), "1.16.0") {
                    self.properties.kubernetes_config().mcr_kubernetes_image_base.as_str()
                } else {
                    self.image_base()
                };
                format!("{base}{}{suffix}", catalog_image(catalog::CCM_KEY))
            }
            ADDON_MANAGER_COMPONENT_NAME => {
                format!("{}{}", self.image_base(), catalog_image(catalog::ADDON_MANAGER_KEY))
            }
            _ if self.uses_hyperkube() => {
                format!("{}{}{suffix}", self.image_base(), catalog_image(catalog::HYPERKUBE_KEY))
            }
            binary => format!("{}{}{suffix}", self.image_base(), catalog_image(binary)),
        }
    }

    /// The user's custom image for `component`, if any.
    fn custom_image(&self, component: &str) -> Option<&str> {
        let config = self.properties.kubernetes_config();
        let image = match component {
            CLOUD_CONTROLLER_MANAGER_COMPONENT_NAME => &config.custom_ccm_image,
            APISERVER_COMPONENT_NAME | CONTROLLER_MANAGER_COMPONENT_NAME | SCHEDULER_COMPONENT_NAME
                if self.uses_hyperkube() =>
            {
                &config.custom_hyperkube_image
            }
            APISERVER_COMPONENT_NAME => &config.custom_kube_apiserver_image,
            CONTROLLER_MANAGER_COMPONENT_NAME => &config.custom_kube_controller_manager_image,
            SCHEDULER_COMPONENT_NAME => &config.custom_kube_scheduler_image,
            _ => return None,
        };
        Some(image.as_str()).filter(|image| !image.is_empty())
    }

    fn command(&self, binary: &str) -> String {
        if self.uses_hyperkube() {
            format!("{HYPERKUBE_COMMAND}, \"{binary}\"")
        } else {
            format!("\"{binary}\"")
        }
    }
}

/// Builds the default components, in order: scheduler, controller-manager,
/// cloud-controller-manager, API server and addon-manager.
pub fn default_components(ctx: &ComponentContext<'_>) -> Vec<ComponentSpec> {
    let uses_ccm = ctx
        .properties
        .kubernetes_config()
        .uses_cloud_controller_manager();

    [
        (SCHEDULER_COMPONENT_NAME, true, Some(ctx.command(SCHEDULER_COMPONENT_NAME))),
        (
            CONTROLLER_MANAGER_COMPONENT_NAME,
            true,
            Some(ctx.command(CONTROLLER_MANAGER_COMPONENT_NAME)),
        ),
        (
            CLOUD_CONTROLLER_MANAGER_COMPONENT_NAME,
            uses_ccm,
            Some(format!("\"{CLOUD_CONTROLLER_MANAGER_COMPONENT_NAME}\"")),
        ),
        (APISERVER_COMPONENT_NAME, true, Some(ctx.command(APISERVER_COMPONENT_NAME))),
        (ADDON_MANAGER_COMPONENT_NAME, true, None),
    ]
    .into_iter()
    .map(|(name, enabled, command)| {
        let image = ctx
            .custom_image(name)
            .map_or_else(|| ctx.default_image(name), str::to_owned);

        ComponentSpec {
            name: name.to_owned(),
            enabled: enabled.into(),
            containers: vec![ContainerSpec::new(name, image)],
            config: command
                .into_iter()
                .map(|command| (COMMAND_CONFIG_KEY.to_owned(), command))
                .collect(),
            data: String::new(),
        }
    })
    .collect()
}

/// Merges the default components into `existing`, honoring the custom
/// component images of the Kubernetes config.
///
/// Unlike addons, the defaults themselves pass through the overlay as well,
/// so a disabled default component is trimmed right away.
pub fn reconcile_components(
    existing: Option<&[ComponentSpec]>,
    ctx: &ComponentContext<'_>,
    is_upgrade: bool,
) -> Vec<ComponentSpec> {
    let defaults = default_components(ctx);
    let existing = existing.unwrap_or_default();

    let mut reconciled = existing.to_vec();
    reconciled.extend(
        defaults
            .iter()
            .filter(|default| !existing.iter().any(|component| component.name == default.name))
            .cloned(),
    );

    for component in &mut reconciled {
        let Some(default) = defaults.iter().find(|default| default.name == component.name) else {
            continue;
        };

        if let (Some(image), Some(container)) =
            (ctx.custom_image(&component.name), component.containers.first_mut())
        {
            image.clone_into(&mut container.image);
        }

        *component = overlay_component(component, default, is_upgrade);
    }

    debug!(components = reconciled.len(), "reconciled components");
    reconciled
}

/// Fills the empty fields of `component` from its default.
pub fn overlay_component(component: &ComponentSpec, default: &ComponentSpec, is_upgrade: bool) -> ComponentSpec {
    let enabled = component.enabled.or(default.enabled);

    if enabled != EnabledState::Enabled {
        return ComponentSpec {
            name: component.name.clone(),
            enabled,
            ..ComponentSpec::default()
        };
    }

    if !component.data.is_empty() {
        return ComponentSpec {
            name: component.name.clone(),
            enabled,
            data: component.data.clone(),
            ..ComponentSpec::default()
        };
    }

    let mut config = overlay_config(&component.config, &default.config);
    match default.config.get(COMMAND_CONFIG_KEY) {
        Some(command) if is_upgrade => {
            config.insert(COMMAND_CONFIG_KEY.to_owned(), command.clone());
        }
        _ => {}
    }

    ComponentSpec {
        name: component.name.clone(),
        enabled,
        containers: overlay_containers(&component.containers, &default.containers, is_upgrade),
        config,
        data: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;

    use super::*;
    use crate::{
        cloud::public_cloud_spec,
        model::{CustomCloudProfile, ImageBaseFlavor},
    };

    const IMAGE_BASE: &str = "mcr.microsoft.com/";

    fn properties(version: &str) -> Properties {
        let mut properties = Properties::default();
        properties.orchestrator_profile.orchestrator_version = version.to_owned();
        let config = &mut properties.orchestrator_profile.kubernetes_config;
        IMAGE_BASE.clone_into(&mut config.kubernetes_image_base);
        "mcr.microsoft.com/k8s/core/".clone_into(&mut config.mcr_kubernetes_image_base);
        properties
    }

    fn components_for(
        properties: &Properties,
        existing: Option<&[ComponentSpec]>,
        is_upgrade: bool,
    ) -> Vec<ComponentSpec> {
        let cloud = public_cloud_spec();
        let images = catalog::component_images(
            properties.orchestrator_version(),
            properties.kubernetes_config().image_base_flavor(),
        );
        let ctx = ComponentContext {
            properties,
            cloud: &cloud,
            images: images.as_ref(),
        };
        reconcile_components(existing, &ctx, is_upgrade)
    }

    fn component<'a>(components: &'a [ComponentSpec], name: &str) -> &'a ComponentSpec {
        components
            .iter()
            .find(|component| component.name == name)
            .expect("component is present")
    }

    fn parse(input: &str) -> Vec<ComponentSpec> {
        serde_json::from_str(input).expect("valid component list")
    }

    #[test]
    fn hyperkube_components_below_1_17() {
        let components = components_for(&properties("1.16.4"), None, false);
        let names: Vec<_> = components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, [
            SCHEDULER_COMPONENT_NAME,
            CONTROLLER_MANAGER_COMPONENT_NAME,
            CLOUD_CONTROLLER_MANAGER_COMPONENT_NAME,
            APISERVER_COMPONENT_NAME,
            ADDON_MANAGER_COMPONENT_NAME,
        ]);

        let apiserver = component(&components, APISERVER_COMPONENT_NAME);
        assert_eq!(apiserver.enabled, EnabledState::Enabled);
        assert_eq!(apiserver.containers[0].image, "mcr.microsoft.com/hyperkube-amd64:v1.16.4");
        assert_eq!(apiserver.config["command"], r#""/hyperkube", "kube-apiserver""#);

        let ccm = component(&components, CLOUD_CONTROLLER_MANAGER_COMPONENT_NAME);
        assert_eq!(ccm.enabled, EnabledState::Disabled);
        assert!(ccm.containers.is_empty());

        let addon_manager = component(&components, ADDON_MANAGER_COMPONENT_NAME);
        assert!(addon_manager.config.is_empty());
        assert_eq!(
            addon_manager.containers[0].image,
            "mcr.microsoft.com/kube-addon-manager-amd64:v9.0.2"
        );
    }

    #[test]
    fn cloud_controller_manager_from_mcr_base() {
        let mut properties = properties("1.16.4");
        properties.orchestrator_profile.kubernetes_config.use_cloud_controller_manager = Some(true);
        let components = components_for(&properties, None, false);

        let ccm = component(&components, CLOUD_CONTROLLER_MANAGER_COMPONENT_NAME);
        assert_eq!(ccm.enabled, EnabledState::Enabled);
        assert_eq!(
            ccm.containers[0].image,
            "mcr.microsoft.com/k8s/core/azure-cloud-controller-manager:v0.3.0"
        );
        assert_eq!(ccm.config["command"], r#""cloud-controller-manager""#);

        "1.15.7".clone_into(&mut properties.orchestrator_profile.orchestrator_version);
        let components = components_for(&properties, None, false);
        assert_eq!(
            component(&components, CLOUD_CONTROLLER_MANAGER_COMPONENT_NAME).containers[0].image,
            "mcr.microsoft.com/cloud-controller-manager-amd64:v1.15.7"
        );
    }

    #[test]
    fn split_binaries_from_1_17() {
        let mut properties = properties("1.17.2");
        properties.orchestrator_profile.kubernetes_config.image_base_flavor = Some(ImageBaseFlavor::Mcr);
        let components = components_for(&properties, None, false);

        let scheduler = component(&components, SCHEDULER_COMPONENT_NAME);
        assert_eq!(
            scheduler.containers[0].image,
            "mcr.microsoft.com/oss/kubernetes/kube-scheduler:v1.17.2"
        );
        assert_eq!(scheduler.config["command"], r#""kube-scheduler""#);
    }

    #[test]
    fn custom_cloud_images_carry_suffix() {
        let mut properties = properties("1.15.7");
        properties.custom_cloud_profile = Some(CustomCloudProfile::default());
        let components = components_for(&properties, None, false);

        assert_eq!(
            component(&components, CONTROLLER_MANAGER_COMPONENT_NAME).containers[0].image,
            "mcr.microsoft.com/hyperkube-amd64:v1.15.7-azs"
        );
        assert_eq!(
            component(&components, ADDON_MANAGER_COMPONENT_NAME).containers[0].image,
            "mcr.microsoft.com/kube-addon-manager-amd64:v9.0.2"
        );
    }

    #[rstest]
    #[case("1.16.4", "myregistry/hyperkube:custom", "", "myregistry/hyperkube:custom")]
    #[case("1.17.2", "myregistry/hyperkube:custom", "", "mcr.microsoft.com/kube-apiserver:v1.17.2")]
    #[case("1.17.2", "", "myregistry/kube-apiserver:custom", "myregistry/kube-apiserver:custom")]
    fn custom_images_replace_defaults(
        #[case] version: &str,
        #[case] hyperkube: &str,
        #[case] apiserver: &str,
        #[case] expected: &str,
    ) {
        let mut properties = properties(version);
        let config = &mut properties.orchestrator_profile.kubernetes_config;
        hyperkube.clone_into(&mut config.custom_hyperkube_image);
        apiserver.clone_into(&mut config.custom_kube_apiserver_image);

        let existing = parse(r#"[{"name": "kube-apiserver", "containers": [{"name": "kube-apiserver", "image": "old"}]}]"#);
        for is_upgrade in [false, true] {
            let components = components_for(&properties, Some(&existing), is_upgrade);
            let image = &component(&components, APISERVER_COMPONENT_NAME).containers[0].image;
            if expected.starts_with("myregistry") || is_upgrade {
                assert_eq!(image, expected);
            } else {
                assert_eq!(image, "old");
            }
        }
    }

    #[test]
    fn disabled_components_are_trimmed() {
        let existing = parse(indoc! {r#"
            [{
                "name": "kube-scheduler",
                "enabled": false,
                "containers": [{"name": "kube-scheduler", "image": "custom"}],
                "config": {"command": "x"}
            }]
        "#});

        let components = components_for(&properties("1.16.4"), Some(&existing), false);
        assert_eq!(
            component(&components, SCHEDULER_COMPONENT_NAME),
            &ComponentSpec {
                name: SCHEDULER_COMPONENT_NAME.to_owned(),
                enabled: EnabledState::Disabled,
                ..ComponentSpec::default()
            }
        );
    }

    #[test]
    fn components_with_data_are_trimmed() {
        let existing = parse(indoc! {r#"
            [{
                "name": "kube-apiserver",
                "containers": [{"name": "kube-apiserver", "image": "custom"}],
                "config": {"command": "x"},
                "data": "YXBpVmVyc2lvbjogdjE="
            }]
        "#});

        let components = components_for(&properties("1.16.4"), Some(&existing), true);
        assert_eq!(
            component(&components, APISERVER_COMPONENT_NAME),
            &ComponentSpec {
                name: APISERVER_COMPONENT_NAME.to_owned(),
                enabled: EnabledState::Enabled,
                data: "YXBpVmVyc2lvbjogdjE=".to_owned(),
                ..ComponentSpec::default()
            }
        );
    }

    #[rstest]
    #[case(false, "\"custom\"")]
    #[case(true, r#""/hyperkube", "kube-scheduler""#)]
    fn command_is_refreshed_on_upgrade(#[case] is_upgrade: bool, #[case] expected: &str) {
        let existing = parse(r#"[{"name": "kube-scheduler", "config": {"command": "\"custom\""}}]"#);
        let components = components_for(&properties("1.16.4"), Some(&existing), is_upgrade);

        assert_eq!(component(&components, SCHEDULER_COMPONENT_NAME).config["command"], expected);
    }

    #[test]
    fn reconcile_is_idempotent() {
        let properties = properties("1.16.4");
        let once = components_for(&properties, None, false);
        let twice = components_for(&properties, Some(&once), false);

        assert_eq!(once, twice);
    }
}
