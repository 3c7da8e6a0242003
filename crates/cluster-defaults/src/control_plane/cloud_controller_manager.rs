use crate::{
    constants::*,
    flag_map::{FlagMap, drop_empty, flag_map, overlay},
    model::Properties,
    version::is_version_ge,
};

/// Resolves the `cloud-controller-manager` flags.
///
/// Every flag computed here is static, the user can only add flags.
pub fn cloud_controller_manager_flags(properties: &Properties) -> FlagMap {
    let config = properties.kubernetes_config();

    let mut statics = flag_map([
        ("--cloud-provider", "azure"),
        ("--cloud-config", AZURE_JSON_FILE),
        ("--cluster-cidr", properties.controller_cluster_cidr()),
        ("--kubeconfig", KUBELET_KUBECONFIG_FILE),
        ("--leader-elect", "true"),
        (
            "--route-reconciliation-period",
            DEFAULT_KUBERNETES_CTRL_MGR_ROUTE_RECONCILIATION_PERIOD,
        ),
        ("--v", "2"),
    ]);
    statics.extend([
        (
            "--allocate-node-cidrs".to_owned(),
            (!config.is_azure_cni() || properties.is_azure_cni_dual_stack()).to_string(),
        ),
        (
            "--configure-cloud-routes".to_owned(),
            properties.requires_route_table().to_string(),
        ),
    ]);
    if is_version_ge(properties.orchestrator_version(), "1.16.0") {
        // Node lifecycle is left to the cloud-node-manager addon
        statics.insert("--controllers".to_owned(), "*,-cloud-node".to_owned());
    }
    let cluster_name = properties.dns_prefix();
    if !cluster_name.is_empty() {
        statics.insert("--cluster-name".to_owned(), cluster_name.to_owned());
    }

    drop_empty(&overlay(&drop_empty(&config.cloud_controller_manager_config), &statics))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::model::{HostedMasterProfile, MasterProfile};

    fn properties(version: &str) -> Properties {
        let mut properties = Properties::default();
        let profile = &mut properties.orchestrator_profile;
        version.clone_into(&mut profile.orchestrator_version);
        DEFAULT_KUBERNETES_CLUSTER_SUBNET.clone_into(&mut profile.kubernetes_config.cluster_subnet);
        properties
    }

    #[rstest]
    #[case("1.15.7", None)]
    #[case("1.16.0", Some("*,-cloud-node"))]
    fn controllers_by_version(#[case] version: &str, #[case] expected: Option<&str>) {
        let flags = cloud_controller_manager_flags(&properties(version));

        assert_eq!(flags.get("--controllers").map(String::as_str), expected);
        assert_eq!(flags["--route-reconciliation-period"], "10s");
        assert_eq!(flags["--cluster-cidr"], DEFAULT_KUBERNETES_CLUSTER_SUBNET);
        assert_eq!(flags["--allocate-node-cidrs"], "true");
        assert!(!flags.contains_key("--cluster-name"));
    }

    #[test]
    fn static_flags_beat_user_flags() {
        let mut properties = properties("1.16.4");
        properties.orchestrator_profile.kubernetes_config.cloud_controller_manager_config = flag_map([
            ("--route-reconciliation-period", "1m"),
            ("--v", "4"),
            ("--node-monitor-period", "5s"),
        ]);

        let flags = cloud_controller_manager_flags(&properties);

        assert_eq!(flags["--route-reconciliation-period"], "10s");
        assert_eq!(flags["--v"], "2");
        assert_eq!(flags["--node-monitor-period"], "5s");
    }

    #[test]
    fn cluster_name_from_master_or_hosted_control_plane() {
        let mut properties = properties("1.16.4");
        properties.hosted_master_profile = Some(HostedMasterProfile {
            dns_prefix: "hosted".to_owned(),
            ..HostedMasterProfile::default()
        });
        assert_eq!(cloud_controller_manager_flags(&properties)["--cluster-name"], "hosted");

        properties.master_profile = Some(MasterProfile {
            dns_prefix: "mycluster".to_owned(),
            ..MasterProfile::default()
        });
        assert_eq!(cloud_controller_manager_flags(&properties)["--cluster-name"], "mycluster");
    }

    #[test]
    fn user_values_cannot_override_statics() {
        let mut properties = properties("1.16.4");
        properties.orchestrator_profile.kubernetes_config.cloud_controller_manager_config =
            flag_map([("--v", "6"), ("--concurrent-service-syncs", "3")]);
        let flags = cloud_controller_manager_flags(&properties);

        assert_eq!(flags["--v"], "2");
        assert_eq!(flags["--concurrent-service-syncs"], "3");
    }
}
