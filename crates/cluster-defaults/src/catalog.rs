//! Version indexed catalog of image references and tuning values.
//!
//! [`component_images`] maps an orchestrator version to the images of the
//! control plane and of every addon, plus a handful of timing and cloud
//! provider tuning values. Image references are relative to the Kubernetes
//! image base unless they carry their own registry.
//!
//! Versions with an unknown `major.minor` yield [`None`]. Callers treat the
//! missing catalog as empty, so image lookups resolve to empty strings.
use std::collections::BTreeMap;

use tracing::debug;

use crate::{
    constants::*,
    model::ImageBaseFlavor,
    version::parse_version,
};

/// Image references and tuning values for a single orchestrator version.
pub type ComponentImages = BTreeMap<String, String>;

// Keys which are not addon names
pub const HYPERKUBE_KEY: &str = "hyperkube";
pub const CCM_KEY: &str = "ccm";
pub const PAUSE_KEY: &str = "pause";
pub const ADDON_MANAGER_KEY: &str = "addonmanager";
pub const ADDON_RESIZER_KEY: &str = "addonresizer";
pub const EXEC_HEALTHZ_KEY: &str = "exechealthz";
pub const KUBE_DNS_KEY: &str = "kube-dns";
pub const DNSMASQ_KEY: &str = "dnsmasq";
pub const DNS_SIDECAR_KEY: &str = "k8s-dns-sidecar";
pub const WINDOWS_ZIP_KEY: &str = "windowszip";
pub const CALICO_TYPHA_KEY: &str = "calico-typha";
pub const CALICO_CNI_KEY: &str = "calico-cni";
pub const CALICO_NODE_KEY: &str = "calico-node";
pub const CALICO_POD2DAEMON_KEY: &str = "calico-pod2daemon";
pub const CALICO_AUTOSCALER_KEY: &str = "calico-cluster-proportional-autoscaler";
pub const NODE_STATUS_FREQUENCY_KEY: &str = "nodestatusfreq";
pub const NODE_GRACE_PERIOD_KEY: &str = "nodegraceperiod";
pub const POD_EVICTION_KEY: &str = "podeviction";
pub const ROUTE_PERIOD_KEY: &str = "routeperiod";

const DASHBOARD_IMAGE: &str = "kubernetes-dashboard-amd64:v1.10.1";
const EXEC_HEALTHZ_IMAGE: &str = "exechealthz-amd64:1.2";
const HEAPSTER_IMAGE: &str = "heapster-amd64:v1.5.4";
const COREDNS_IMAGE: &str = "coredns:1.6.5";
const KUBE_DNS_IMAGE: &str = "k8s-dns-kube-dns-amd64:1.15.4";
const DNSMASQ_IMAGE: &str = "k8s-dns-dnsmasq-nanny-amd64:1.15.4";
const DNS_SIDECAR_IMAGE: &str = "k8s-dns-sidecar-amd64:1.14.10";
const PAUSE_IMAGE: &str = "pause:1.2.0";
const TILLER_IMAGE: &str = "tiller:v2.13.1";
const RESCHEDULER_IMAGE: &str = "rescheduler:v0.4.0";
const VIRTUAL_KUBELET_IMAGE: &str = "virtual-kubelet:latest";
const OMS_IMAGE: &str = "oms:ciprod11012019";
const AZURE_CNI_NETWORK_MONITOR_IMAGE: &str = "networkmonitor:v0.0.6";
const NVIDIA_DEVICE_PLUGIN_IMAGE: &str = "k8s-device-plugin:1.11";
const BLOBFUSE_FLEXVOLUME_IMAGE: &str = "mcr.microsoft.com/k8s/flexvolume/blobfuse-flexvolume:1.0.8";
const SMB_FLEXVOLUME_IMAGE: &str = "mcr.microsoft.com/k8s/flexvolume/smb-flexvolume:1.0.2";
const KEYVAULT_FLEXVOLUME_IMAGE: &str =
    "mcr.microsoft.com/k8s/flexvolume/keyvault-flexvolume:v0.0.13";
const IP_MASQ_AGENT_IMAGE: &str = "ip-masq-agent-amd64:v2.5.0";
const DNS_AUTOSCALER_IMAGE: &str = "cluster-proportional-autoscaler-amd64:1.1.1";
const CALICO_TYPHA_IMAGE: &str = "typha:v3.8.0";
const CALICO_CNI_IMAGE: &str = "cni:v3.8.0";
const CALICO_NODE_IMAGE: &str = "node:v3.8.0";
const CALICO_POD2DAEMON_IMAGE: &str = "pod2daemon-flexvol:v3.8.0";
const CALICO_AUTOSCALER_IMAGE: &str = "cluster-proportional-autoscaler-amd64:1.1.2-r2";
const AZURE_NPM_IMAGE: &str = "mcr.microsoft.com/containernetworking/azure-npm:v1.0.29";
const AZURE_VNET_TELEMETRY_IMAGE: &str =
    "mcr.microsoft.com/containernetworking/azure-vnet-telemetry:v1.0.29";
const AAD_POD_IDENTITY_NMI_IMAGE: &str = "mcr.microsoft.com/k8s/aad-pod-identity/nmi:1.2";
const AAD_POD_IDENTITY_MIC_IMAGE: &str = "mcr.microsoft.com/k8s/aad-pod-identity/mic:1.2";
const AZURE_POLICY_IMAGE: &str =
    "mcr.microsoft.com/azure-policy/policy-kubernetes-addon-prod:prod_20191011.1";
const GATEKEEPER_IMAGE: &str = "quay.io/open-policy-agent/gatekeeper:v3.0.4-beta.2";
const AZURE_CLOUD_CONTROLLER_MANAGER_IMAGE: &str = "azure-cloud-controller-manager:v0.3.0";
const AZURE_CLOUD_NODE_MANAGER_IMAGE: &str = "azure-cloud-node-manager:v0.3.0";

/// Path below an MCR image base where the core Kubernetes images live.
const MCR_CORE_IMAGE_PREFIX: &str = "oss/kubernetes/";

/// Images which differ between minor versions.
fn minor_version_images(minor: u64) -> Option<&'static [(&'static str, &'static str)]> {
    let images: &'static [(&'static str, &'static str)] = match minor {
        17 => &[
            (ADDON_RESIZER_KEY, "addon-resizer:1.8.5"),
            (METRICS_SERVER_ADDON_NAME, "metrics-server-amd64:v0.3.5"),
            (ADDON_MANAGER_KEY, "kube-addon-manager-amd64:v9.0.2"),
            (CLUSTER_AUTOSCALER_ADDON_NAME, "cluster-autoscaler:v1.17.0"),
        ],
        16 => &[
            (ADDON_RESIZER_KEY, "addon-resizer:1.8.5"),
            (METRICS_SERVER_ADDON_NAME, "metrics-server-amd64:v0.3.4"),
            (ADDON_MANAGER_KEY, "kube-addon-manager-amd64:v9.0.2"),
            (CLUSTER_AUTOSCALER_ADDON_NAME, "cluster-autoscaler:v1.16.3"),
        ],
        15 => &[
            (ADDON_RESIZER_KEY, "addon-resizer:1.8.5"),
            (METRICS_SERVER_ADDON_NAME, "metrics-server-amd64:v0.2.1"),
            (ADDON_MANAGER_KEY, "kube-addon-manager-amd64:v9.0.2"),
            (CLUSTER_AUTOSCALER_ADDON_NAME, "cluster-autoscaler:v1.15.4"),
        ],
        14 => &[
            (ADDON_RESIZER_KEY, "addon-resizer:1.8.4"),
            (METRICS_SERVER_ADDON_NAME, "metrics-server-amd64:v0.2.1"),
            (ADDON_MANAGER_KEY, "kube-addon-manager-amd64:v9.0.2"),
            (CLUSTER_AUTOSCALER_ADDON_NAME, "cluster-autoscaler:v1.14.7"),
        ],
        13 => &[
            (ADDON_RESIZER_KEY, "addon-resizer:1.8.4"),
            (METRICS_SERVER_ADDON_NAME, "metrics-server-amd64:v0.2.1"),
            (ADDON_MANAGER_KEY, "kube-addon-manager-amd64:v8.9.1"),
            (CLUSTER_AUTOSCALER_ADDON_NAME, "cluster-autoscaler:v1.13.9"),
        ],
        12 => &[
            (ADDON_RESIZER_KEY, "addon-resizer:1.8.4"),
            (METRICS_SERVER_ADDON_NAME, "metrics-server-amd64:v0.2.1"),
            (ADDON_MANAGER_KEY, "kube-addon-manager-amd64:v8.9.1"),
            (CLUSTER_AUTOSCALER_ADDON_NAME, "cluster-autoscaler:v1.12.8"),
        ],
        11 => &[
            (ADDON_RESIZER_KEY, "addon-resizer:1.8.4"),
            (METRICS_SERVER_ADDON_NAME, "metrics-server-amd64:v0.2.1"),
            (ADDON_MANAGER_KEY, "kube-addon-manager-amd64:v8.9.1"),
            (CLUSTER_AUTOSCALER_ADDON_NAME, "cluster-autoscaler:v1.3.9"),
        ],
        10 => &[
            (ADDON_RESIZER_KEY, "addon-resizer:1.8.4"),
            (METRICS_SERVER_ADDON_NAME, "metrics-server-amd64:v0.2.1"),
            (ADDON_MANAGER_KEY, "kube-addon-manager-amd64:v8.9.1"),
            (RESCHEDULER_ADDON_NAME, "rescheduler:v0.3.1"),
            (CLUSTER_AUTOSCALER_ADDON_NAME, "cluster-autoscaler:v1.2.5"),
            (NVIDIA_DEVICE_PLUGIN_ADDON_NAME, "k8s-device-plugin:1.10"),
            (DNS_SIDECAR_KEY, "k8s-dns-sidecar-amd64:1.14.8"),
        ],
        9 => &[
            (ADDON_RESIZER_KEY, "addon-resizer:1.8.4"),
            (METRICS_SERVER_ADDON_NAME, "metrics-server-amd64:v0.2.1"),
            (ADDON_MANAGER_KEY, "kube-addon-manager-amd64:v8.6"),
            (RESCHEDULER_ADDON_NAME, "rescheduler:v0.3.1"),
            (CLUSTER_AUTOSCALER_ADDON_NAME, "cluster-autoscaler:v1.1.2"),
            (DNS_SIDECAR_KEY, "k8s-dns-sidecar-amd64:1.14.7"),
        ],
        8 => &[
            (ADDON_RESIZER_KEY, "addon-resizer:1.7"),
            (HEAPSTER_ADDON_NAME, "heapster-amd64:v1.5.1"),
            (METRICS_SERVER_ADDON_NAME, "metrics-server-amd64:v0.2.1"),
            (KUBE_DNS_KEY, "k8s-dns-kube-dns-amd64:1.14.13"),
            (ADDON_MANAGER_KEY, "kube-addon-manager-amd64:v8.6"),
            (DNSMASQ_KEY, "k8s-dns-dnsmasq-nanny-amd64:1.14.8"),
            (RESCHEDULER_ADDON_NAME, "rescheduler:v0.3.1"),
        ],
        7 => &[
            (DASHBOARD_ADDON_NAME, "kubernetes-dashboard-amd64:v1.6.3"),
            (ADDON_RESIZER_KEY, "addon-resizer:1.7"),
            (HEAPSTER_ADDON_NAME, "heapster-amd64:v1.5.1"),
            (METRICS_SERVER_ADDON_NAME, "metrics-server-amd64:v0.2.1"),
            (KUBE_DNS_KEY, "k8s-dns-kube-dns-amd64:1.14.5"),
            (ADDON_MANAGER_KEY, "kube-addon-manager-amd64:v8.6"),
            (DNSMASQ_KEY, "k8s-dns-dnsmasq-nanny-amd64:1.14.5"),
            (RESCHEDULER_ADDON_NAME, "rescheduler:v0.3.1"),
        ],
        6 => &[
            (DASHBOARD_ADDON_NAME, "kubernetes-dashboard-amd64:v1.6.3"),
            (ADDON_RESIZER_KEY, "addon-resizer:1.7"),
            (HEAPSTER_ADDON_NAME, "heapster-amd64:v1.3.0"),
            (METRICS_SERVER_ADDON_NAME, "metrics-server-amd64:v0.2.1"),
            (KUBE_DNS_KEY, "k8s-dns-kube-dns-amd64:1.14.5"),
            (ADDON_MANAGER_KEY, "kube-addon-manager-amd64:v6.5"),
            (DNSMASQ_KEY, "k8s-dns-dnsmasq-nanny-amd64:1.14.5"),
            (RESCHEDULER_ADDON_NAME, "rescheduler:v0.3.1"),
        ],
        _ => return None,
    };

    Some(images)
}

/// Overrides for individual patch releases.
fn patch_version_overrides(version: &str) -> &'static [(&'static str, &'static str)] {
    match version {
        "1.8.11" => &[(KUBE_DNS_KEY, "k8s-dns-kube-dns-amd64:1.14.9")],
        "1.8.9" => &[(WINDOWS_ZIP_KEY, "v1.8.9-2int.zip")],
        "1.8.6" => &[(WINDOWS_ZIP_KEY, "v1.8.6-2int.zip")],
        "1.8.2" => &[(WINDOWS_ZIP_KEY, "v1.8.2-2int.zip")],
        "1.8.1" => &[(WINDOWS_ZIP_KEY, "v1.8.1-2int.zip")],
        "1.8.0" => &[(WINDOWS_ZIP_KEY, "v1.8.0-2int.zip")],
        "1.7.16" => &[(WINDOWS_ZIP_KEY, "v1.7.16-1int.zip")],
        "1.7.15" => &[(WINDOWS_ZIP_KEY, "v1.7.15-1int.zip")],
        "1.7.14" => &[(WINDOWS_ZIP_KEY, "v1.7.14-1int.zip")],
        "1.7.13" => &[(WINDOWS_ZIP_KEY, "v1.7.13-1int.zip")],
        "1.7.12" => &[(WINDOWS_ZIP_KEY, "v1.7.12-2int.zip")],
        "1.7.10" => &[(WINDOWS_ZIP_KEY, "v1.7.10-1int.zip")],
        "1.7.9" => &[(WINDOWS_ZIP_KEY, "v1.7.9-2int.zip")],
        "1.7.7" => &[(WINDOWS_ZIP_KEY, "v1.7.7-2int.zip")],
        "1.7.5" => &[(WINDOWS_ZIP_KEY, "v1.7.5-4int.zip")],
        "1.7.4" => &[(WINDOWS_ZIP_KEY, "v1.7.4-2int.zip")],
        "1.7.2" => &[(WINDOWS_ZIP_KEY, "v1.7.2-1int.zip")],
        _ => &[],
    }
}

/// Returns the catalog for `version`, or [`None`] if its `major.minor` is
/// not supported.
pub fn component_images(version: &str, flavor: ImageBaseFlavor) -> Option<ComponentImages> {
    let parsed = parse_version(version)?;
    if parsed.major != 1 {
        return None;
    }

    let minor = parsed.minor;
    let per_minor = minor_version_images(minor)?;
    let version = format!("{}.{}.{}", parsed.major, parsed.minor, parsed.patch);

    let mut images = ComponentImages::new();
    let mut set = |key: &str, value: &str| {
        images.insert(key.to_owned(), value.to_owned());
    };

    if minor >= 17 {
        for binary in [
            APISERVER_COMPONENT_NAME,
            CONTROLLER_MANAGER_COMPONENT_NAME,
            SCHEDULER_COMPONENT_NAME,
            KUBE_PROXY_ADDON_NAME,
        ] {
            set(binary, &format!("{binary}:v{version}"));
        }
    } else {
        set(HYPERKUBE_KEY, &format!("hyperkube-amd64:v{version}"));
        set(KUBE_PROXY_ADDON_NAME, &format!("hyperkube-amd64:v{version}"));
    }

    if minor >= 16 {
        set(CCM_KEY, AZURE_CLOUD_CONTROLLER_MANAGER_IMAGE);
        set(CLOUD_NODE_MANAGER_ADDON_NAME, AZURE_CLOUD_NODE_MANAGER_IMAGE);
    } else if minor >= 8 {
        set(CCM_KEY, &format!("cloud-controller-manager-amd64:v{version}"));
    }

    if minor >= 8 {
        set(WINDOWS_ZIP_KEY, &format!("v{version}-1int.zip"));
    }

    set(DASHBOARD_ADDON_NAME, DASHBOARD_IMAGE);
    set(EXEC_HEALTHZ_KEY, EXEC_HEALTHZ_IMAGE);
    set(HEAPSTER_ADDON_NAME, HEAPSTER_IMAGE);
    set(KUBE_DNS_KEY, KUBE_DNS_IMAGE);
    set(DNSMASQ_KEY, DNSMASQ_IMAGE);
    set(PAUSE_KEY, PAUSE_IMAGE);
    set(TILLER_ADDON_NAME, TILLER_IMAGE);
    set(RESCHEDULER_ADDON_NAME, RESCHEDULER_IMAGE);
    set(ACI_CONNECTOR_ADDON_NAME, VIRTUAL_KUBELET_IMAGE);
    set(AZURE_CNI_NETWORK_MONITOR_ADDON_NAME, AZURE_CNI_NETWORK_MONITOR_IMAGE);

    if minor >= 7 {
        set(CONTAINER_MONITORING_ADDON_NAME, OMS_IMAGE);
    }

    if minor >= 8 {
        set(BLOBFUSE_FLEXVOLUME_ADDON_NAME, BLOBFUSE_FLEXVOLUME_IMAGE);
        set(SMB_FLEXVOLUME_ADDON_NAME, SMB_FLEXVOLUME_IMAGE);
        set(KEYVAULT_FLEXVOLUME_ADDON_NAME, KEYVAULT_FLEXVOLUME_IMAGE);
        set(IP_MASQ_AGENT_ADDON_NAME, IP_MASQ_AGENT_IMAGE);
        set(DNS_AUTOSCALER_ADDON_NAME, DNS_AUTOSCALER_IMAGE);
        set(AZURE_NETWORK_POLICY_ADDON_NAME, AZURE_NPM_IMAGE);
        set(AZURE_VNET_TELEMETRY_CONTAINER_NAME, AZURE_VNET_TELEMETRY_IMAGE);
        set(CALICO_TYPHA_KEY, CALICO_TYPHA_IMAGE);
        set(CALICO_CNI_KEY, CALICO_CNI_IMAGE);
        set(CALICO_NODE_KEY, CALICO_NODE_IMAGE);
        set(CALICO_POD2DAEMON_KEY, CALICO_POD2DAEMON_IMAGE);
        set(CALICO_AUTOSCALER_KEY, CALICO_AUTOSCALER_IMAGE);
        set(NMI_CONTAINER_NAME, AAD_POD_IDENTITY_NMI_IMAGE);
        set(MIC_CONTAINER_NAME, AAD_POD_IDENTITY_MIC_IMAGE);
        set(AZURE_POLICY_ADDON_NAME, AZURE_POLICY_IMAGE);
        set(GATEKEEPER_CONTAINER_NAME, GATEKEEPER_IMAGE);
    }

    if minor >= 9 {
        set(DNS_SIDECAR_KEY, DNS_SIDECAR_IMAGE);
    }

    if minor >= 10 {
        set(NVIDIA_DEVICE_PLUGIN_ADDON_NAME, NVIDIA_DEVICE_PLUGIN_IMAGE);
    }

    if minor >= 12 {
        set(COREDNS_ADDON_NAME, COREDNS_IMAGE);
    }

    set(NODE_STATUS_FREQUENCY_KEY, DEFAULT_KUBERNETES_NODE_STATUS_UPDATE_FREQUENCY);
    set(NODE_GRACE_PERIOD_KEY, DEFAULT_KUBERNETES_CTRL_MGR_NODE_MONITOR_GRACE_PERIOD);
    set(POD_EVICTION_KEY, DEFAULT_KUBERNETES_CTRL_MGR_POD_EVICTION_TIMEOUT);
    set(ROUTE_PERIOD_KEY, DEFAULT_KUBERNETES_CTRL_MGR_ROUTE_RECONCILIATION_PERIOD);
    set("backoffretries", &DEFAULT_CLOUD_PROVIDER_BACKOFF_RETRIES.to_string());
    set("backoffjitter", &DEFAULT_CLOUD_PROVIDER_BACKOFF_JITTER.to_string());
    set("backoffduration", &DEFAULT_CLOUD_PROVIDER_BACKOFF_DURATION.to_string());
    set("backoffexponent", &DEFAULT_CLOUD_PROVIDER_BACKOFF_EXPONENT.to_string());
    set("ratelimitqps", &DEFAULT_CLOUD_PROVIDER_RATE_LIMIT_QPS.to_string());
    set("ratelimitqpswrite", &DEFAULT_CLOUD_PROVIDER_RATE_LIMIT_QPS_WRITE.to_string());
    set("ratelimitbucket", &DEFAULT_CLOUD_PROVIDER_RATE_LIMIT_BUCKET.to_string());
    set("ratelimitbucketwrite", &DEFAULT_CLOUD_PROVIDER_RATE_LIMIT_BUCKET_WRITE.to_string());
    set("gchighthreshold", &DEFAULT_GC_HIGH_THRESHOLD.to_string());
    set("gclowthreshold", &DEFAULT_GC_LOW_THRESHOLD.to_string());

    for (key, value) in per_minor
        .iter()
        .chain(patch_version_overrides(&version))
    {
        set(key, value);
    }

    if flavor == ImageBaseFlavor::Mcr {
        for key in [
            HYPERKUBE_KEY,
            APISERVER_COMPONENT_NAME,
            CONTROLLER_MANAGER_COMPONENT_NAME,
            SCHEDULER_COMPONENT_NAME,
            KUBE_PROXY_ADDON_NAME,
            PAUSE_KEY,
        ] {
            if let Some(image) = images.get_mut(key) {
                image.insert_str(0, MCR_CORE_IMAGE_PREFIX);
            }
        }
    }

    debug!(
        catalog.version = %version,
        catalog.entries = images.len(),
        "resolved version catalog"
    );

    Some(images)
}

/// Looks up `key`, resolving a missing catalog or key to an empty string.
pub fn image<'a>(images: Option<&'a ComponentImages>, key: &str) -> &'a str {
    images
        .and_then(|images| images.get(key))
        .map_or("", String::as_str)
}
