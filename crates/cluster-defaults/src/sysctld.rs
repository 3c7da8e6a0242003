//! Kernel parameters written to `/etc/sysctl.d` on Linux nodes.
use crate::{
    flag_map::{FlagMap, drop_empty, fill_absent, flag_map},
    model::Properties,
};

/// The parameters every Linux node starts out with.
pub fn default_sysctld_config(properties: &Properties) -> FlagMap {
    let mut config = flag_map([
        ("net.ipv4.tcp_retries2", "8"),
        ("net.core.somaxconn", "16384"),
        ("net.ipv4.tcp_max_syn_backlog", "16384"),
        ("net.core.message_cost", "40"),
        ("net.core.message_burst", "80"),
        ("net.ipv4.neigh.default.gc_thresh1", "4096"),
        ("net.ipv4.neigh.default.gc_thresh2", "8192"),
        ("net.ipv4.neigh.default.gc_thresh3", "16384"),
        ("kernel.dmesg_restrict", "0"),
    ]);
    if properties.kubernetes_config().is_containerd() {
        config.insert("net.ipv4.ip_forward".to_owned(), "1".to_owned());
    }
    config
}

/// Fills the sysctl.d parameters of the masters and every Linux pool. Blank
/// user values count as unset.
pub fn set_sysctld_config(properties: &mut Properties) {
    let defaults = default_sysctld_config(properties);

    if let Some(master) = properties.master_profile.as_mut() {
        master.sysctld_config = fill_absent(&drop_empty(&master.sysctld_config), &defaults);
    }
    for pool in properties
        .agent_pool_profiles
        .iter_mut()
        .filter(|pool| !pool.is_windows())
    {
        pool.sysctld_config = fill_absent(&drop_empty(&pool.sysctld_config), &defaults);
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::constants::CONTAINERD;

    fn properties() -> Properties {
        serde_yaml::from_str(indoc! {"
            masterProfile:
              count: 1
              sysctldConfig:
                net.core.somaxconn: '1024'
            agentPoolProfiles:
              - name: linuxpool
                count: 1
              - name: winpool
                count: 1
                osType: Windows
        "})
        .expect("valid properties")
    }

    #[test]
    fn masters_and_linux_pools_are_filled() {
        let mut properties = properties();
        set_sysctld_config(&mut properties);

        let master = properties.master_profile.as_ref().expect("master profile");
        assert_eq!(master.sysctld_config["net.core.somaxconn"], "1024");
        assert_eq!(master.sysctld_config["net.ipv4.tcp_retries2"], "8");

        let linux = &properties.agent_pool_profiles[0];
        assert_eq!(linux.sysctld_config, default_sysctld_config(&properties));
        assert!(!linux.sysctld_config.contains_key("net.ipv4.ip_forward"));
        assert!(properties.agent_pool_profiles[1].sysctld_config.is_empty());
    }

    #[test]
    fn containerd_enables_ip_forwarding() {
        let mut properties = properties();
        CONTAINERD.clone_into(&mut properties.orchestrator_profile.kubernetes_config.container_runtime);
        set_sysctld_config(&mut properties);

        assert_eq!(properties.agent_pool_profiles[0].sysctld_config["net.ipv4.ip_forward"], "1");
    }
}
